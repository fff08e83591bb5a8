//! Opt-in operation profiling.
//!
//! When enabled, the vessel tracks time spent in store I/O per span and
//! counts cache hits, broken down by the worker (async task or OS thread)
//! that performed the operation. Useful for deciding whether preloading or
//! caching pays off for a given access pattern.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A store operation over which time is measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Span {
    ReadFromDb,
    WriteToDb,
    PreloadFromDb,
    DeleteFromDb,
    ReplaceInDb,
    ClearDb,
}

impl Span {
    pub const ALL: [Span; 6] = [
        Span::ReadFromDb,
        Span::WriteToDb,
        Span::PreloadFromDb,
        Span::DeleteFromDb,
        Span::ReplaceInDb,
        Span::ClearDb,
    ];

    /// Friendly name: "read", "write", ...
    pub fn nice_name(&self) -> &'static str {
        match self {
            Span::ReadFromDb => "read",
            Span::WriteToDb => "write",
            Span::PreloadFromDb => "preload",
            Span::DeleteFromDb => "delete",
            Span::ReplaceInDb => "replace",
            Span::ClearDb => "clear",
        }
    }
}

/// A cache hit that let the vessel skip store I/O entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileEvent {
    CacheHitRead,
    CacheHitWrite,
    CacheHitDelete,
    CacheHitReplace,
}

impl ProfileEvent {
    pub const ALL: [ProfileEvent; 4] = [
        ProfileEvent::CacheHitRead,
        ProfileEvent::CacheHitWrite,
        ProfileEvent::CacheHitDelete,
        ProfileEvent::CacheHitReplace,
    ];

    /// Friendly name: "read", "write", ...
    pub fn nice_name(&self) -> &'static str {
        match self {
            ProfileEvent::CacheHitRead => "read",
            ProfileEvent::CacheHitWrite => "write",
            ProfileEvent::CacheHitDelete => "delete",
            ProfileEvent::CacheHitReplace => "replace",
        }
    }
}

/// Where work was performed: an async task or an OS thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Task,
    Thread,
}

/// One unit of execution using the vessel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Worker {
    pub kind: WorkerKind,
    pub name: String,
}

impl Worker {
    /// The current async task (call from async operations).
    pub fn task() -> Self {
        let name = tokio::task::try_id()
            .map(|id| format!("task-{id}"))
            .unwrap_or_else(|| "outside-task".to_string());
        Self {
            kind: WorkerKind::Task,
            name,
        }
    }

    /// The current OS thread (call from blocking operations).
    pub fn thread() -> Self {
        let current = std::thread::current();
        let name = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));
        Self {
            kind: WorkerKind::Thread,
            name,
        }
    }
}

/// Accumulated time for one span.
#[derive(Clone, Debug, Default)]
pub struct SpanData {
    pub hit_count: u64,
    pub total_duration: Duration,
}

/// Everything one worker did through the vessel.
#[derive(Clone, Debug)]
pub struct WorkerData {
    pub worker: Worker,
    pub spans: HashMap<Span, SpanData>,
    pub events: HashMap<ProfileEvent, u64>,
}

impl WorkerData {
    fn new(worker: Worker) -> Self {
        Self {
            worker,
            spans: HashMap::new(),
            events: HashMap::new(),
        }
    }

    /// Total time this worker spent in store I/O, across all spans.
    pub fn total_duration(&self) -> Duration {
        self.spans.values().map(|s| s.total_duration).sum()
    }
}

/// Snapshot of all profiling data, across all workers.
#[derive(Clone, Debug)]
pub struct ProfileData {
    workers: Vec<WorkerData>,
}

impl ProfileData {
    fn new(mut workers: Vec<WorkerData>) -> Self {
        workers.sort_by(|a, b| b.total_duration().cmp(&a.total_duration()));
        Self { workers }
    }

    /// Per-worker data, sorted by total time spent (descending).
    pub fn workers(&self) -> &[WorkerData] {
        &self.workers
    }

    /// Total time spent in `span` across all workers.
    pub fn time_in(&self, span: Span) -> Duration {
        self.workers
            .iter()
            .filter_map(|w| w.spans.get(&span))
            .map(|s| s.total_duration)
            .sum()
    }

    /// Number of times `span` was entered, across all workers.
    pub fn span_hits(&self, span: Span) -> u64 {
        self.workers
            .iter()
            .filter_map(|w| w.spans.get(&span))
            .map(|s| s.hit_count)
            .sum()
    }

    /// Number of times `event` occurred, across all workers.
    pub fn event_hits(&self, event: ProfileEvent) -> u64 {
        self.workers
            .iter()
            .filter_map(|w| w.events.get(&event))
            .sum()
    }

    /// Textual summary for manual inspection.
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_millis().to_string();

        let mut spans = Span::ALL.to_vec();
        spans.sort_by(|a, b| self.time_in(*b).cmp(&self.time_in(*a)));
        let mut events = ProfileEvent::ALL.to_vec();
        events.sort_by(|a, b| self.event_hits(*b).cmp(&self.event_hits(*a)));

        let span_table = table(
            &["span", "count", "time"],
            spans
                .iter()
                .map(|s| {
                    vec![
                        s.nice_name().to_string(),
                        self.span_hits(*s).to_string(),
                        ms(self.time_in(*s)),
                    ]
                })
                .collect(),
            Some(vec![
                String::new(),
                spans.iter().map(|s| self.span_hits(*s)).sum::<u64>().to_string(),
                ms(spans.iter().map(|s| self.time_in(*s)).sum()),
            ]),
        );

        let event_table = table(
            &["event", "count"],
            events
                .iter()
                .map(|e| vec![e.nice_name().to_string(), self.event_hits(*e).to_string()])
                .collect(),
            Some(vec![
                String::new(),
                events
                    .iter()
                    .map(|e| self.event_hits(*e))
                    .sum::<u64>()
                    .to_string(),
            ]),
        );

        let mut worker_headings = vec!["kind".to_string(), "name".to_string()];
        worker_headings.extend(spans.iter().map(|s| s.nice_name().to_string()));
        worker_headings.push("total".to_string());
        let worker_rows = self
            .workers
            .iter()
            .map(|w| {
                let mut row = vec![format!("{:?}", w.worker.kind), w.worker.name.clone()];
                row.extend(spans.iter().map(|s| {
                    ms(w.spans
                        .get(s)
                        .map(|d| d.total_duration)
                        .unwrap_or_default())
                }));
                row.push(ms(w.total_duration()));
                row
            })
            .collect();
        let heading_refs: Vec<&str> = worker_headings.iter().map(String::as_str).collect();
        let worker_table = table(&heading_refs, worker_rows, None);

        format!(
            "Store I/O times, sorted by time spent\n{span_table}\n\n\
             Cache hits, sorted by hit count\n{event_table}\n\n\
             Store I/O times, by worker, sorted by time spent\n{worker_table}\n\n\
             * all times in ms\n"
        )
    }
}

/// Render a text table with aligned columns and an optional summary row.
fn table(headings: &[&str], rows: Vec<Vec<String>>, summary: Option<Vec<String>>) -> String {
    let all_rows: Vec<Vec<String>> = std::iter::once(headings.iter().map(|h| h.to_string()).collect())
        .chain(rows.iter().cloned())
        .chain(summary.iter().cloned())
        .collect();

    let width = all_rows.iter().map(Vec::len).max().unwrap_or(0);
    let col_widths: Vec<usize> = (0..width)
        .map(|col| {
            all_rows
                .iter()
                .map(|row| row.get(col).map(String::len).unwrap_or(0))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let text_row = |row: &[String]| {
        row.iter()
            .enumerate()
            .map(|(col, item)| format!(" {:>width$} ", item, width = col_widths[col]))
            .collect::<Vec<_>>()
            .join("|")
    };
    let divider = |line: &str| {
        col_widths
            .iter()
            .map(|w| line.repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    };

    let mut out = Vec::new();
    out.push(text_row(&all_rows[0]));
    out.push(divider("="));
    for row in &rows {
        out.push(text_row(row));
    }
    if let Some(summary) = &summary {
        out.push(divider("-"));
        out.push(text_row(summary));
    }
    out.join("\n")
}

/// Sink for profiling samples.
pub(crate) trait Profiler: Send + Sync {
    fn record(&self, worker: Worker, span: Span, elapsed: Duration);
    fn count(&self, worker: Worker, event: ProfileEvent);
    fn snapshot(&self) -> ProfileData;
    fn enabled(&self) -> bool;
}

/// Discards every sample. Used when profiling is off.
pub(crate) struct NoopProfiler;

impl Profiler for NoopProfiler {
    fn record(&self, _worker: Worker, _span: Span, _elapsed: Duration) {}

    fn count(&self, _worker: Worker, _event: ProfileEvent) {}

    fn snapshot(&self) -> ProfileData {
        ProfileData::new(Vec::new())
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Accumulating profiler.
pub(crate) struct ProfilerImpl {
    workers: Mutex<HashMap<Worker, WorkerData>>,
}

impl ProfilerImpl {
    pub(crate) fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }
}

impl Profiler for ProfilerImpl {
    fn record(&self, worker: Worker, span: Span, elapsed: Duration) {
        let mut workers = self.workers.lock().expect("lock poisoned");
        let data = workers
            .entry(worker.clone())
            .or_insert_with(|| WorkerData::new(worker));
        let span_data = data.spans.entry(span).or_default();
        span_data.hit_count += 1;
        span_data.total_duration += elapsed;
    }

    fn count(&self, worker: Worker, event: ProfileEvent) {
        let mut workers = self.workers.lock().expect("lock poisoned");
        let data = workers
            .entry(worker.clone())
            .or_insert_with(|| WorkerData::new(worker));
        *data.events.entry(event).or_insert(0) += 1;
    }

    fn snapshot(&self) -> ProfileData {
        let workers = self.workers.lock().expect("lock poisoned");
        ProfileData::new(workers.values().cloned().collect())
    }

    fn enabled(&self) -> bool {
        true
    }
}
