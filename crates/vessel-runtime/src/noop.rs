use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::VesselResult;
use crate::preload::PreloadReport;
use crate::profiler::ProfileData;

/// Inert vessel with the same method surface as [`Vessel`](crate::Vessel).
///
/// Every read is absent, every mutation succeeds without effect, and
/// watches never yield. Useful as a stand-in where persistence should be
/// disabled, e.g. in tests of code that takes a vessel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpVessel;

impl NoOpVessel {
    pub fn new() -> Self {
        Self
    }

    pub fn type_name_of<T: ?Sized>(&self, _value: &T) -> String {
        "no-op".to_string()
    }

    pub async fn get<T: DeserializeOwned>(&self) -> VesselResult<Option<T>> {
        Ok(None)
    }

    pub async fn set<T: Serialize>(&self, _value: &T) -> VesselResult<()> {
        Ok(())
    }

    pub async fn delete<T>(&self) -> VesselResult<()> {
        Ok(())
    }

    pub async fn replace<Old, New: Serialize>(&self, _new: &New) -> VesselResult<()> {
        Ok(())
    }

    pub async fn clear(&self) -> VesselResult<()> {
        Ok(())
    }

    pub async fn preload(&self, _timeout: Option<Duration>) -> VesselResult<PreloadReport> {
        Ok(PreloadReport::default())
    }

    pub fn get_blocking<T: DeserializeOwned>(&self) -> VesselResult<Option<T>> {
        Ok(None)
    }

    pub fn set_blocking<T: Serialize>(&self, _value: &T) -> VesselResult<()> {
        Ok(())
    }

    pub fn delete_blocking<T>(&self) -> VesselResult<()> {
        Ok(())
    }

    pub fn replace_blocking<Old, New: Serialize>(&self, _new: &New) -> VesselResult<()> {
        Ok(())
    }

    pub fn clear_blocking(&self) -> VesselResult<()> {
        Ok(())
    }

    pub fn preload_blocking(&self, _timeout: Option<Duration>) -> VesselResult<PreloadReport> {
        Ok(PreloadReport::default())
    }

    pub fn profile_data(&self) -> Option<ProfileData> {
        None
    }

    pub fn watch<T>(&self) -> NoOpWatch<T> {
        NoOpWatch {
            _value: PhantomData,
        }
    }

    pub fn close(&self) {}
}

/// A watch that never yields.
pub struct NoOpWatch<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> NoOpWatch<T> {
    /// Pends forever.
    pub async fn changed(&mut self) -> VesselResult<Option<T>> {
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_are_absent_and_writes_succeed() {
        let vessel = NoOpVessel::new();
        vessel.set(&"hello".to_string()).await.unwrap();
        assert_eq!(vessel.get::<String>().await.unwrap(), None);
        vessel.delete::<String>().await.unwrap();
        assert_eq!(vessel.type_name_of(&1u32), "no-op");
    }

    #[test]
    fn blocking_surface_matches() {
        let vessel = NoOpVessel::new();
        vessel.set_blocking(&42u32).unwrap();
        assert_eq!(vessel.get_blocking::<u32>().unwrap(), None);
        assert!(vessel.profile_data().is_none());
        assert!(!vessel
            .preload_blocking(None)
            .unwrap()
            .errors_occurred());
    }
}
