use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use vessel_codec::{Codec, JsonCodec};
use vessel_store::{FileRecordStore, InMemoryRecordStore, RecordStore};
use vessel_types::{StoredRecord, TypeKey};

use crate::blocking::BlockingBridge;
use crate::cache::{CacheSlot, VesselCache};
use crate::callback::VesselCallback;
use crate::error::{VesselError, VesselResult};
use crate::preload::PreloadReport;
use crate::profiler::{NoopProfiler, ProfileData, ProfileEvent, Profiler, ProfilerImpl, Span, Worker};
use crate::watch::{Change, Watch};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Shared state behind a [`Vessel`] and its watches.
pub(crate) struct VesselInner<C: Codec> {
    name: String,
    store: Arc<dyn RecordStore>,
    codec: C,
    cache: Option<Box<dyn VesselCache>>,
    callback: VesselCallback,
    profiler: Box<dyn Profiler>,
    changes: broadcast::Sender<Change>,
    closed: AtomicBool,
}

impl<C: Codec> VesselInner<C> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> VesselResult<T> {
        Ok(self.codec.decode(bytes)?)
    }

    fn ensure_open(&self) -> VesselResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(VesselError::Closed {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn find_cached(&self, key: &TypeKey) -> Option<CacheSlot> {
        self.cache.as_ref()?.get(key)
    }

    fn cache_insert(&self, key: TypeKey, slot: CacheSlot) {
        if let Some(cache) = &self.cache {
            cache.insert(key, slot);
        }
    }

    fn notify(&self, change: Change) {
        // No receivers is fine; watches are optional.
        let _ = self.changes.send(change);
    }

    /// Read the encoded payload for `key`, consulting the cache first.
    pub(crate) async fn get_raw(
        &self,
        key: &TypeKey,
        worker: Worker,
    ) -> VesselResult<Option<Vec<u8>>> {
        self.ensure_open()?;

        if let Some(slot) = self.find_cached(key) {
            self.profiler.count(worker, ProfileEvent::CacheHitRead);
            return Ok(slot.into_bytes());
        }

        let start = Instant::now();
        let record = self.store.get(key).await?;
        self.profiler.record(worker, Span::ReadFromDb, start.elapsed());

        let bytes = record.map(|r| r.data);
        let slot = match &bytes {
            Some(bytes) => CacheSlot::Present(bytes.clone()),
            None => CacheSlot::Missing,
        };
        self.cache_insert(key.clone(), slot);
        Ok(bytes)
    }

    /// Write `bytes` as the record for `key`.
    async fn set_raw(&self, key: TypeKey, bytes: Vec<u8>, worker: Worker) -> VesselResult<()> {
        self.ensure_open()?;

        // A cached identical payload means the store already holds this
        // exact value; skip the write.
        if let Some(CacheSlot::Present(cached)) = self.find_cached(&key) {
            if cached == bytes {
                self.profiler.count(worker, ProfileEvent::CacheHitWrite);
                return Ok(());
            }
        }

        debug!(key = %key, bytes = bytes.len(), "set");
        let record = StoredRecord::new(key.clone(), bytes.clone());
        let start = Instant::now();
        self.store.put(record).await?;
        self.profiler.record(worker, Span::WriteToDb, start.elapsed());

        self.cache_insert(key.clone(), CacheSlot::Present(bytes));
        self.notify(Change::Key(key));
        Ok(())
    }

    /// Delete the record for `key`. Deleting an absent key is a no-op.
    async fn delete_raw(&self, key: TypeKey, worker: Worker) -> VesselResult<()> {
        self.ensure_open()?;

        if let Some(CacheSlot::Missing) = self.find_cached(&key) {
            self.profiler.count(worker, ProfileEvent::CacheHitDelete);
            return Ok(());
        }

        debug!(key = %key, "delete");
        let start = Instant::now();
        self.store.delete(&key).await?;
        self.profiler
            .record(worker, Span::DeleteFromDb, start.elapsed());

        self.cache_insert(key.clone(), CacheSlot::Missing);
        self.notify(Change::Key(key));
        Ok(())
    }

    /// Atomically remove `old`'s record and write `bytes` under `new`.
    async fn replace_raw(
        &self,
        old: TypeKey,
        new: TypeKey,
        bytes: Vec<u8>,
        worker: Worker,
    ) -> VesselResult<()> {
        self.ensure_open()?;

        if old == new {
            return self.set_raw(new, bytes, worker).await;
        }

        let new_unchanged = matches!(
            self.find_cached(&new), Some(CacheSlot::Present(cached)) if cached == bytes
        );
        if new_unchanged && matches!(self.find_cached(&old), Some(CacheSlot::Missing)) {
            self.profiler.count(worker, ProfileEvent::CacheHitReplace);
            return Ok(());
        }

        debug!(old = %old, new = %new, "replace");
        let record = StoredRecord::new(new.clone(), bytes.clone());
        let start = Instant::now();
        self.store.replace(&old, record).await?;
        self.profiler
            .record(worker, Span::ReplaceInDb, start.elapsed());

        // Safe to cache: the store either applied both halves or neither.
        self.cache_insert(old.clone(), CacheSlot::Missing);
        self.cache_insert(new.clone(), CacheSlot::Present(bytes));
        self.notify(Change::Key(old));
        self.notify(Change::Key(new));
        Ok(())
    }

    /// Remove every record and drop the cache.
    async fn clear_raw(&self, worker: Worker) -> VesselResult<()> {
        self.ensure_open()?;

        if let Some(cache) = &self.cache {
            cache.clear();
        }

        debug!("clear");
        let start = Instant::now();
        self.store.clear().await?;
        self.profiler.record(worker, Span::ClearDb, start.elapsed());

        self.notify(Change::All);
        self.callback.fire_cleared();
        Ok(())
    }

    /// Bulk-load every record's payload into the cache.
    async fn preload_raw(
        &self,
        timeout: Option<Duration>,
        worker: Worker,
    ) -> VesselResult<PreloadReport> {
        self.ensure_open()?;

        let mut report = PreloadReport::default();
        if self.cache.is_none() {
            return Ok(report);
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let start = Instant::now();

        let records = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match tokio::time::timeout(remaining, self.store.list()).await {
                    Ok(records) => records?,
                    Err(_) => {
                        report.timed_out = true;
                        return Ok(report);
                    }
                }
            }
            None => self.store.list().await?,
        };

        for record in records {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    report.timed_out = true;
                    break;
                }
            }
            if let Err(err) = self.codec.probe(&record.data) {
                debug!(key = %record.key, %err, "preload: unreadable payload");
                report.decode_errors.push(record.key.name().to_string());
                continue;
            }
            self.cache_insert(record.key, CacheSlot::Present(record.data));
            report.loaded += 1;
        }

        self.profiler
            .record(worker, Span::PreloadFromDb, start.elapsed());
        Ok(report)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(name = %self.name, "vessel closed");
            self.notify(Change::All);
            self.callback.fire_closed();
        }
    }
}

/// A container for your data: one stored value per Rust type.
///
/// Values are addressed by [`TypeKey`], encoded by the configured
/// [`Codec`], and persisted through the injected [`RecordStore`]. All
/// operations exist in two flavors: native `async`, and `_blocking`
/// wrappers for callers outside an async runtime.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use vessel_runtime::Vessel;
///
/// #[derive(Serialize, Deserialize)]
/// struct Settings {
///     volume: u8,
/// }
///
/// let vessel = Vessel::builder("app-data").build().unwrap();
/// vessel.set_blocking(&Settings { volume: 7 }).unwrap();
/// let settings: Option<Settings> = vessel.get_blocking().unwrap();
/// assert_eq!(settings.unwrap().volume, 7);
/// ```
pub struct Vessel<C: Codec = JsonCodec> {
    inner: Arc<VesselInner<C>>,
    bridge: BlockingBridge,
    allow_blocking_in_async: bool,
}

impl Vessel<JsonCodec> {
    /// Start building a vessel with the default JSON codec and an
    /// in-memory store.
    pub fn builder(name: impl Into<String>) -> VesselBuilder<JsonCodec> {
        VesselBuilder::new(name)
    }
}

impl<C: Codec> Vessel<C> {
    /// This vessel's name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The type name used as the storage key for `value`.
    ///
    /// Built-in types resolve to their canonical platform name:
    /// `type_name_of("")` is `alloc::string::String`'s name only when the
    /// value is a `String`; a `&str` is its own type.
    pub fn type_name_of<T: ?Sized>(&self, value: &T) -> String {
        TypeKey::of_val(value).name().to_string()
    }

    /// The key under which a value of type `T` is stored.
    pub fn type_key<T: ?Sized>(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    // ---- async accessors ----

    /// Get the stored value of type `T`, or `Ok(None)` if there is none.
    pub async fn get<T: DeserializeOwned>(&self) -> VesselResult<Option<T>> {
        let key = TypeKey::of::<T>();
        match self.inner.get_raw(&key, Worker::task()).await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(self.inner.decode(&bytes)?)),
        }
    }

    /// Store `value`, replacing any previous value of the same type.
    pub async fn set<T: Serialize>(&self, value: &T) -> VesselResult<()> {
        let bytes = self.inner.codec.encode(value)?;
        self.inner
            .set_raw(TypeKey::of::<T>(), bytes, Worker::task())
            .await
    }

    /// Delete the stored value of type `T`. Succeeds even if none exists.
    pub async fn delete<T>(&self) -> VesselResult<()> {
        self.inner
            .delete_raw(TypeKey::of::<T>(), Worker::task())
            .await
    }

    /// Atomically remove the value of type `Old` and store `new`.
    ///
    /// The usual migration path when a type's definition changes: define
    /// the successor type and replace the stored predecessor with it.
    pub async fn replace<Old, New: Serialize>(&self, new: &New) -> VesselResult<()> {
        let bytes = self.inner.codec.encode(new)?;
        self.inner
            .replace_raw(
                TypeKey::of::<Old>(),
                TypeKey::of::<New>(),
                bytes,
                Worker::task(),
            )
            .await
    }

    /// Remove every stored value.
    pub async fn clear(&self) -> VesselResult<()> {
        self.inner.clear_raw(Worker::task()).await
    }

    /// Read the entire store into the cache in one pass.
    ///
    /// Does nothing if no cache was configured. One bulk read is often
    /// cheaper than many random reads; use [`profile_data`](Self::profile_data)
    /// to judge the tradeoff for your access pattern. With a `timeout`,
    /// loading stops at the deadline and the report says so.
    pub async fn preload(&self, timeout: Option<Duration>) -> VesselResult<PreloadReport> {
        self.inner.preload_raw(timeout, Worker::task()).await
    }

    /// Observe the stored value of type `T`; see [`Watch`].
    pub fn watch<T: DeserializeOwned>(&self) -> Watch<T, C> {
        Watch::new(Arc::clone(&self.inner), self.inner.changes.subscribe())
    }

    // ---- blocking accessors ----

    /// Blocking [`get`](Self::get). Waits until the operation completes.
    pub fn get_blocking<T: DeserializeOwned>(&self) -> VesselResult<Option<T>> {
        let inner = Arc::clone(&self.inner);
        let key = TypeKey::of::<T>();
        let worker = Worker::thread();
        let bytes = self
            .bridge
            .run(self.allow_blocking_in_async, async move {
                inner.get_raw(&key, worker).await
            })?;
        match bytes {
            None => Ok(None),
            Some(bytes) => Ok(Some(self.inner.decode(&bytes)?)),
        }
    }

    /// Blocking [`set`](Self::set).
    pub fn set_blocking<T: Serialize>(&self, value: &T) -> VesselResult<()> {
        let bytes = self.inner.codec.encode(value)?;
        let inner = Arc::clone(&self.inner);
        let key = TypeKey::of::<T>();
        let worker = Worker::thread();
        self.bridge.run(self.allow_blocking_in_async, async move {
            inner.set_raw(key, bytes, worker).await
        })
    }

    /// Blocking [`delete`](Self::delete).
    pub fn delete_blocking<T>(&self) -> VesselResult<()> {
        let inner = Arc::clone(&self.inner);
        let key = TypeKey::of::<T>();
        let worker = Worker::thread();
        self.bridge.run(self.allow_blocking_in_async, async move {
            inner.delete_raw(key, worker).await
        })
    }

    /// Blocking [`replace`](Self::replace).
    pub fn replace_blocking<Old, New: Serialize>(&self, new: &New) -> VesselResult<()> {
        let bytes = self.inner.codec.encode(new)?;
        let inner = Arc::clone(&self.inner);
        let old = TypeKey::of::<Old>();
        let key = TypeKey::of::<New>();
        let worker = Worker::thread();
        self.bridge.run(self.allow_blocking_in_async, async move {
            inner.replace_raw(old, key, bytes, worker).await
        })
    }

    /// Blocking [`clear`](Self::clear).
    pub fn clear_blocking(&self) -> VesselResult<()> {
        let inner = Arc::clone(&self.inner);
        let worker = Worker::thread();
        self.bridge.run(self.allow_blocking_in_async, async move {
            inner.clear_raw(worker).await
        })
    }

    /// Blocking [`preload`](Self::preload).
    pub fn preload_blocking(&self, timeout: Option<Duration>) -> VesselResult<PreloadReport> {
        let inner = Arc::clone(&self.inner);
        let worker = Worker::thread();
        self.bridge.run(self.allow_blocking_in_async, async move {
            inner.preload_raw(timeout, worker).await
        })
    }

    // ---- lifecycle / introspection ----

    /// Profiling data, if profiling was enabled at build time.
    pub fn profile_data(&self) -> Option<ProfileData> {
        if self.inner.profiler.enabled() {
            Some(self.inner.profiler.snapshot())
        } else {
            None
        }
    }

    /// Close the vessel. Later operations fail with
    /// [`VesselError::Closed`]; pending watches are woken and fail the
    /// same way.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl<C: Codec> std::fmt::Debug for Vessel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vessel")
            .field("name", &self.inner.name)
            .field("codec", &self.inner.codec.name())
            .field("cached", &self.inner.cache.is_some())
            .finish()
    }
}

/// Builder for [`Vessel`]. It is recommended to use one instance per name.
pub struct VesselBuilder<C: Codec = JsonCodec> {
    name: String,
    store: Option<Arc<dyn RecordStore>>,
    codec: C,
    cache: Option<Box<dyn VesselCache>>,
    callback: VesselCallback,
    profile: bool,
    allow_blocking_in_async: bool,
    runtime: Option<tokio::runtime::Handle>,
}

impl VesselBuilder<JsonCodec> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: None,
            codec: JsonCodec::new(),
            cache: None,
            callback: VesselCallback::default(),
            profile: false,
            allow_blocking_in_async: false,
            runtime: None,
        }
    }
}

impl<C: Codec> VesselBuilder<C> {
    /// Use a custom record store.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Keep records in memory only (the default).
    pub fn in_memory(self) -> Self {
        self.store(Arc::new(InMemoryRecordStore::new()))
    }

    /// Persist records under `dir`.
    pub fn on_disk(self, dir: impl AsRef<Path>) -> VesselResult<Self> {
        let store = FileRecordStore::open(dir.as_ref())?;
        Ok(self.store(Arc::new(store)))
    }

    /// Use a different payload codec. Existing records must have been
    /// written with the same codec.
    pub fn codec<D: Codec>(self, codec: D) -> VesselBuilder<D> {
        VesselBuilder {
            name: self.name,
            store: self.store,
            codec,
            cache: self.cache,
            callback: self.callback,
            profile: self.profile,
            allow_blocking_in_async: self.allow_blocking_in_async,
            runtime: self.runtime,
        }
    }

    /// Cache encoded payloads in memory; see [`VesselCache`].
    pub fn cache(mut self, cache: impl VesselCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Receive lifecycle notifications.
    pub fn callback(mut self, callback: VesselCallback) -> Self {
        self.callback = callback;
        self
    }

    /// Track operation timings and cache hits.
    pub fn profile(mut self, enabled: bool) -> Self {
        self.profile = enabled;
        self
    }

    /// Permit blocking accessors to be called from inside an async
    /// runtime. Off by default because it parks an executor thread.
    pub fn allow_blocking_in_async(mut self, allow: bool) -> Self {
        self.allow_blocking_in_async = allow;
        self
    }

    /// Drive blocking accessors on an existing runtime instead of a
    /// dedicated single-worker one.
    ///
    /// Combined with [`allow_blocking_in_async`](Self::allow_blocking_in_async),
    /// a blocking accessor called from a task on this same runtime parks
    /// the worker that would drive the operation — on a single-worker
    /// runtime that is a deadlock. Pass a handle with spare workers, or
    /// keep the default dedicated runtime.
    pub fn runtime_handle(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the vessel and open its store.
    pub fn build(self) -> VesselResult<Vessel<C>> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new()));
        let profiler: Box<dyn Profiler> = if self.profile {
            Box::new(ProfilerImpl::new())
        } else {
            Box::new(NoopProfiler)
        };
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let bridge = match self.runtime {
            Some(handle) => BlockingBridge::with_handle(handle),
            None => BlockingBridge::new()?,
        };

        let inner = Arc::new(VesselInner {
            name: self.name,
            store,
            codec: self.codec,
            cache: self.cache,
            callback: self.callback,
            profiler,
            changes,
            closed: AtomicBool::new(false),
        });
        debug!(name = %inner.name, codec = inner.codec.name(), "vessel opened");
        inner.callback.fire_open();

        Ok(Vessel {
            inner,
            bridge,
            allow_blocking_in_async: self.allow_blocking_in_async,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use serde::Deserialize;

    use crate::cache::DefaultCache;
    use vessel_store::StoreResult;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct SimpleData {
        name: String,
        number: i32,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct OtherData {
        flag: bool,
    }

    fn alice() -> SimpleData {
        SimpleData {
            name: "Alice".into(),
            number: 42,
        }
    }

    /// Store wrapper that counts reads, for cache assertions.
    struct CountingStore {
        backing: InMemoryRecordStore,
        gets: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                backing: InMemoryRecordStore::new(),
                gets: AtomicUsize::new(0),
            }
        }

        fn get_count(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn get(&self, key: &TypeKey) -> StoreResult<Option<StoredRecord>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.backing.get(key).await
        }

        async fn put(&self, record: StoredRecord) -> StoreResult<()> {
            self.backing.put(record).await
        }

        async fn delete(&self, key: &TypeKey) -> StoreResult<bool> {
            self.backing.delete(key).await
        }

        async fn replace(&self, old: &TypeKey, new: StoredRecord) -> StoreResult<()> {
            self.backing.replace(old, new).await
        }

        async fn list(&self) -> StoreResult<Vec<StoredRecord>> {
            self.backing.list().await
        }

        async fn clear(&self) -> StoreResult<()> {
            self.backing.clear().await
        }
    }

    // -----------------------------------------------------------------------
    // Core semantics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), Some(alice()));
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let vessel = Vessel::builder("test").build().unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_is_last_write_wins() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        let bob = SimpleData {
            name: "Bob".into(),
            number: 7,
        };
        vessel.set(&bob).await.unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), Some(bob));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.delete::<SimpleData>().await.unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);

        vessel.set(&alice()).await.unwrap();
        vessel.delete::<SimpleData>().await.unwrap();
        vessel.delete::<SimpleData>().await.unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);
    }

    #[tokio::test]
    async fn types_are_isolated() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        vessel.set(&OtherData { flag: true }).await.unwrap();

        vessel.delete::<SimpleData>().await.unwrap();
        assert_eq!(
            vessel.get::<OtherData>().await.unwrap(),
            Some(OtherData { flag: true })
        );
    }

    #[tokio::test]
    async fn replace_migrates_between_types() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();

        vessel
            .replace::<SimpleData, _>(&OtherData { flag: true })
            .await
            .unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);
        assert_eq!(
            vessel.get::<OtherData>().await.unwrap(),
            Some(OtherData { flag: true })
        );
    }

    #[tokio::test]
    async fn replace_same_type_is_set() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        let bob = SimpleData {
            name: "Bob".into(),
            number: 1,
        };
        vessel.replace::<SimpleData, _>(&bob).await.unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), Some(bob));
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        vessel.set(&OtherData { flag: false }).await.unwrap();

        vessel.clear().await.unwrap();
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);
        assert_eq!(vessel.get::<OtherData>().await.unwrap(), None);
    }

    #[tokio::test]
    async fn type_name_resolution() {
        let vessel = Vessel::builder("test").build().unwrap();
        assert_eq!(
            vessel.type_name_of(&String::new()),
            "alloc::string::String"
        );
        assert_eq!(
            vessel.type_name_of(&alice()),
            TypeKey::of::<SimpleData>().name()
        );
    }

    // -----------------------------------------------------------------------
    // Blocking accessors
    // -----------------------------------------------------------------------

    #[test]
    fn blocking_scenario_set_get_delete() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set_blocking(&alice()).unwrap();

        let read: Option<SimpleData> = vessel.get_blocking().unwrap();
        let read = read.expect("should exist");
        assert_eq!(read.name, "Alice");
        assert_eq!(read.number, 42);

        vessel.delete_blocking::<SimpleData>().unwrap();
        assert_eq!(vessel.get_blocking::<SimpleData>().unwrap(), None);
    }

    #[test]
    fn blocking_replace_and_clear() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set_blocking(&alice()).unwrap();
        vessel
            .replace_blocking::<SimpleData, _>(&OtherData { flag: true })
            .unwrap();
        assert_eq!(vessel.get_blocking::<SimpleData>().unwrap(), None);

        vessel.clear_blocking().unwrap();
        assert_eq!(vessel.get_blocking::<OtherData>().unwrap(), None);
    }

    #[tokio::test]
    async fn blocking_from_async_context_is_refused() {
        let vessel = Vessel::builder("test").build().unwrap();
        assert!(matches!(
            vessel.get_blocking::<SimpleData>(),
            Err(VesselError::Bridge(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_from_async_context_can_be_allowed() {
        let vessel = Vessel::builder("test")
            .allow_blocking_in_async(true)
            .build()
            .unwrap();
        vessel.set_blocking(&alice()).unwrap();
        assert_eq!(vessel.get_blocking::<SimpleData>().unwrap(), Some(alice()));
    }

    #[test]
    fn blocking_preserves_error_kind() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.close();
        assert!(matches!(
            vessel.get_blocking::<SimpleData>(),
            Err(VesselError::Closed { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Closed vessel
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn closed_vessel_rejects_operations() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        vessel.close();

        assert!(matches!(
            vessel.get::<SimpleData>().await,
            Err(VesselError::Closed { .. })
        ));
        assert!(matches!(
            vessel.set(&alice()).await,
            Err(VesselError::Closed { .. })
        ));
    }

    #[test]
    fn close_is_idempotent_and_fires_callback_once() {
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);
        let vessel = Vessel::builder("test")
            .callback(VesselCallback::new().on_closed(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        vessel.close();
        vessel.close();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn open_and_cleared_callbacks_fire() {
        let opened = Arc::new(AtomicUsize::new(0));
        let cleared = Arc::new(AtomicUsize::new(0));
        let opened_c = Arc::clone(&opened);
        let cleared_c = Arc::clone(&cleared);

        let vessel = Vessel::builder("test")
            .callback(
                VesselCallback::new()
                    .on_open(move || {
                        opened_c.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_cleared(move || {
                        cleared_c.fetch_add(1, Ordering::SeqCst);
                    }),
            )
            .build()
            .unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        vessel.clear_blocking().unwrap();
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    // -----------------------------------------------------------------------
    // Cache behavior
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cached_read_skips_the_store() {
        let store = Arc::new(CountingStore::new());
        let vessel = Vessel::builder("test")
            .store(Arc::clone(&store) as Arc<dyn RecordStore>)
            .cache(DefaultCache::new())
            .build()
            .unwrap();

        vessel.set(&alice()).await.unwrap();
        // set populated the cache; neither read should hit the store.
        vessel.get::<SimpleData>().await.unwrap();
        vessel.get::<SimpleData>().await.unwrap();
        assert_eq!(store.get_count(), 0);
    }

    #[tokio::test]
    async fn known_absent_read_skips_the_store() {
        let store = Arc::new(CountingStore::new());
        let vessel = Vessel::builder("test")
            .store(Arc::clone(&store) as Arc<dyn RecordStore>)
            .cache(DefaultCache::new())
            .build()
            .unwrap();

        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), None);
        // Only the first miss consulted the store.
        assert_eq!(store.get_count(), 1);
    }

    #[tokio::test]
    async fn profiler_counts_cache_hits() {
        let vessel = Vessel::builder("test")
            .cache(DefaultCache::new())
            .profile(true)
            .build()
            .unwrap();

        vessel.set(&alice()).await.unwrap();
        vessel.get::<SimpleData>().await.unwrap();
        vessel.set(&alice()).await.unwrap(); // identical payload

        let data = vessel.profile_data().expect("profiling enabled");
        assert_eq!(data.event_hits(ProfileEvent::CacheHitRead), 1);
        assert_eq!(data.event_hits(ProfileEvent::CacheHitWrite), 1);
        assert_eq!(data.span_hits(Span::WriteToDb), 1);
    }

    #[test]
    fn profile_data_absent_when_disabled() {
        let vessel = Vessel::builder("test").build().unwrap();
        assert!(vessel.profile_data().is_none());
    }

    // -----------------------------------------------------------------------
    // Preload
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn preload_fills_the_cache() {
        let store = Arc::new(CountingStore::new());
        store
            .put(StoredRecord::new(
                TypeKey::of::<SimpleData>(),
                serde_json::to_vec(&alice()).unwrap(),
            ))
            .await
            .unwrap();

        let vessel = Vessel::builder("test")
            .store(Arc::clone(&store) as Arc<dyn RecordStore>)
            .cache(DefaultCache::new())
            .build()
            .unwrap();

        let report = vessel.preload(None).await.unwrap();
        assert_eq!(report.loaded, 1);
        assert!(!report.errors_occurred());

        // Served from the cache now.
        assert_eq!(vessel.get::<SimpleData>().await.unwrap(), Some(alice()));
        assert_eq!(store.get_count(), 0);
    }

    #[tokio::test]
    async fn preload_without_cache_is_a_no_op() {
        let vessel = Vessel::builder("test").build().unwrap();
        vessel.set(&alice()).await.unwrap();
        let report = vessel.preload(None).await.unwrap();
        assert_eq!(report.loaded, 0);
        assert!(!report.errors_occurred());
    }

    #[tokio::test]
    async fn preload_reports_unreadable_payloads() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .put(StoredRecord::new(
                TypeKey::from_name("app::Gone").unwrap(),
                b"\x00\x01 definitely not json".to_vec(),
            ))
            .await
            .unwrap();

        let vessel = Vessel::builder("test")
            .store(Arc::clone(&store) as Arc<dyn RecordStore>)
            .cache(DefaultCache::new())
            .build()
            .unwrap();

        let report = vessel.preload(None).await.unwrap();
        assert_eq!(report.loaded, 0);
        assert_eq!(report.decode_errors, vec!["app::Gone".to_string()]);
        assert!(report.errors_occurred());
    }

    #[tokio::test]
    async fn preload_honors_the_deadline() {
        let vessel = Vessel::builder("test")
            .cache(DefaultCache::new())
            .build()
            .unwrap();
        vessel.set(&alice()).await.unwrap();

        let report = vessel.preload(Some(Duration::ZERO)).await.unwrap();
        assert!(report.timed_out);
        assert!(report.errors_occurred());
    }

    // -----------------------------------------------------------------------
    // Watch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn watch_yields_current_then_distinct_values() {
        let vessel = Vessel::builder("test").build().unwrap();
        let mut watch = vessel.watch::<SimpleData>();

        // Current value first.
        assert_eq!(watch.changed().await.unwrap(), None);

        vessel.set(&alice()).await.unwrap();
        assert_eq!(watch.changed().await.unwrap(), Some(alice()));

        // An identical write is suppressed; the next distinct one arrives.
        vessel.set(&alice()).await.unwrap();
        let bob = SimpleData {
            name: "Bob".into(),
            number: 7,
        };
        vessel.set(&bob).await.unwrap();
        assert_eq!(watch.changed().await.unwrap(), Some(bob));

        vessel.delete::<SimpleData>().await.unwrap();
        assert_eq!(watch.changed().await.unwrap(), None);
    }

    #[tokio::test]
    async fn watch_ignores_other_types() {
        let vessel = Vessel::builder("test").build().unwrap();
        let mut watch = vessel.watch::<SimpleData>();
        assert_eq!(watch.changed().await.unwrap(), None);

        vessel.set(&OtherData { flag: true }).await.unwrap();
        vessel.set(&alice()).await.unwrap();
        // The OtherData write is skipped entirely.
        assert_eq!(watch.changed().await.unwrap(), Some(alice()));
    }

    #[tokio::test]
    async fn watch_fails_after_close() {
        let vessel = Vessel::builder("test").build().unwrap();
        let mut watch = vessel.watch::<SimpleData>();
        vessel.close();
        assert!(matches!(
            watch.changed().await,
            Err(VesselError::Closed { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Durable storage end to end
    // -----------------------------------------------------------------------

    #[test]
    fn values_survive_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let vessel = Vessel::builder("persist")
                .on_disk(dir.path())
                .unwrap()
                .build()
                .unwrap();
            vessel.set_blocking(&alice()).unwrap();
        }

        let vessel = Vessel::builder("persist")
            .on_disk(dir.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(vessel.get_blocking::<SimpleData>().unwrap(), Some(alice()));
    }
}
