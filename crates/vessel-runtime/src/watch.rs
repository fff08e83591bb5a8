use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use vessel_codec::Codec;
use vessel_types::TypeKey;

use crate::error::{VesselError, VesselResult};
use crate::profiler::Worker;
use crate::vessel::VesselInner;

/// A change to the stored data, broadcast to watchers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Change {
    /// The record for one key was written, replaced, or deleted.
    Key(TypeKey),
    /// Every record was removed, or the vessel closed.
    All,
}

/// Observes the stored value for one type.
///
/// The first call to [`changed`](Watch::changed) yields the current value;
/// each later call waits for the next *distinct* value (`None` after a
/// delete or clear). Writes that do not change the encoded payload are not
/// delivered.
pub struct Watch<T, C: Codec> {
    inner: Arc<VesselInner<C>>,
    rx: broadcast::Receiver<Change>,
    key: TypeKey,
    // Last payload delivered; None until the first delivery.
    last: Option<Option<Vec<u8>>>,
    _value: PhantomData<fn() -> T>,
}

impl<T, C> Watch<T, C>
where
    T: DeserializeOwned,
    C: Codec,
{
    pub(crate) fn new(inner: Arc<VesselInner<C>>, rx: broadcast::Receiver<Change>) -> Self {
        Self {
            inner,
            rx,
            key: TypeKey::of::<T>(),
            last: None,
            _value: PhantomData,
        }
    }

    /// The key this watch observes.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Wait for the next distinct value.
    ///
    /// Fails with [`VesselError::Closed`] once the vessel has been closed.
    pub async fn changed(&mut self) -> VesselResult<Option<T>> {
        loop {
            if self.last.is_some() {
                match self.rx.recv().await {
                    Ok(Change::Key(key)) if key == self.key => {}
                    Ok(Change::All) => {}
                    Ok(_) => continue,
                    // Missed events only mean we re-read sooner than needed.
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(VesselError::Closed {
                            name: self.inner.name().to_string(),
                        });
                    }
                }
            }

            let bytes = self.inner.get_raw(&self.key, Worker::task()).await?;
            if self.last.as_ref() == Some(&bytes) {
                continue;
            }
            self.last = Some(bytes.clone());
            return match bytes {
                None => Ok(None),
                Some(bytes) => Ok(Some(self.inner.decode(&bytes)?)),
            };
        }
    }
}
