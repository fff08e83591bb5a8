/// The result of a [`Vessel::preload`](crate::Vessel::preload) call.
///
/// Errors here do not mean the preload failed entirely — every record that
/// could be loaded was loaded into the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Number of records installed into the cache.
    pub loaded: usize,

    /// Type names whose payload the codec could not parse at all.
    ///
    /// This happens when a record was written by a different codec, or the
    /// payload was damaged outside the store's framing checks. A record
    /// whose Rust type definition changed still parses here and surfaces
    /// as a decode error on `get` instead; see `replace`, which migrates a
    /// stored type to a new one without hitting this case.
    pub decode_errors: Vec<String>,

    /// True if the preload deadline was exceeded. Records loaded before
    /// the deadline remain cached.
    pub timed_out: bool,
}

impl PreloadReport {
    /// True if anything went wrong: decode errors or a timeout.
    pub fn errors_occurred(&self) -> bool {
        self.timed_out || !self.decode_errors.is_empty()
    }
}
