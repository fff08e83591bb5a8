type Hook = Box<dyn Fn() + Send + Sync>;

/// Optional notifications for vessel lifecycle events.
///
/// ```
/// use vessel_runtime::VesselCallback;
///
/// let callback = VesselCallback::new().on_closed(|| println!("closed"));
/// ```
#[derive(Default)]
pub struct VesselCallback {
    pub(crate) on_open: Option<Hook>,
    pub(crate) on_closed: Option<Hook>,
    pub(crate) on_cleared: Option<Hook>,
}

impl VesselCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the vessel is built and its store is ready.
    pub fn on_open(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Called when the vessel is closed.
    pub fn on_closed(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_closed = Some(Box::new(hook));
        self
    }

    /// Called after `clear` has removed every record.
    pub fn on_cleared(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cleared = Some(Box::new(hook));
        self
    }

    pub(crate) fn fire_open(&self) {
        if let Some(hook) = &self.on_open {
            hook();
        }
    }

    pub(crate) fn fire_closed(&self) {
        if let Some(hook) = &self.on_closed {
            hook();
        }
    }

    pub(crate) fn fire_cleared(&self) {
        if let Some(hook) = &self.on_cleared {
            hook();
        }
    }
}

impl std::fmt::Debug for VesselCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VesselCallback")
            .field("on_open", &self.on_open.is_some())
            .field("on_closed", &self.on_closed.is_some())
            .field("on_cleared", &self.on_cleared.is_some())
            .finish()
    }
}
