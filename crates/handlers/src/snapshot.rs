//! SnapshotCache - generation-consistent exposition buffer
//!
//! Three independently locked tables:
//! - working: source -> open flag + records of the generation in progress
//! - published: source -> serialized body of the last closed generation
//! - types: sanitized name -> kind of the most recently published sample
//!
//! Serialization runs with no lock held. Readers only clone `Arc<str>`
//! bodies under the published lock, so scrapes never wait on a collector
//! and never see half of a generation.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{MetricKind, MetricRecord};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::exposition::{self, render_generation, render_type_line};

#[derive(Debug, Default)]
struct WorkingGeneration {
    open: bool,
    records: Vec<MetricRecord>,
}

/// Outcome of closing a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub samples: usize,
    pub invalid: usize,
}

pub struct SnapshotCache {
    handler: String,
    working: Mutex<HashMap<String, WorkingGeneration>>,
    published: Mutex<BTreeMap<String, Arc<str>>>,
    types: Mutex<BTreeMap<String, MetricKind>>,
    /// Records that arrived with no open generation
    orphaned: AtomicU64,
    timestamps: bool,
}

impl SnapshotCache {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            working: Mutex::new(HashMap::new()),
            published: Mutex::new(BTreeMap::new()),
            types: Mutex::new(BTreeMap::new()),
            orphaned: AtomicU64::new(0),
            timestamps: true,
        }
    }

    /// Render samples without the trailing timestamp
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Open a generation for `source`
    ///
    /// A begin for an already open generation keeps what was collected.
    pub fn begin_generation(&self, source: &str) {
        let mut working = self.working.lock();
        let entry = working.entry(source.to_string()).or_default();
        if entry.open {
            warn!(
                handler = %self.handler,
                source,
                pending = entry.records.len(),
                "Generation already open, keeping its records"
            );
        }
        entry.open = true;
    }

    /// Append to the open generation; false if none is open
    pub fn append(&self, source: &str, record: MetricRecord) -> bool {
        {
            let mut working = self.working.lock();
            if let Some(entry) = working.get_mut(source).filter(|entry| entry.open) {
                entry.records.push(record);
                return true;
            }
        }

        self.orphaned.fetch_add(1, Ordering::Relaxed);
        warn!(
            handler = %self.handler,
            source,
            metric = %record.name,
            "No open generation, record dropped"
        );
        false
    }

    /// Close and publish the open generation of `source`
    ///
    /// The published body replaces the previous one, even when empty.
    /// Returns `None` if no generation was open.
    pub fn end_generation(&self, source: &str) -> Option<PublishReport> {
        let taken = {
            let mut working = self.working.lock();
            working
                .get_mut(source)
                .filter(|entry| entry.open)
                .map(|entry| {
                    entry.open = false;
                    std::mem::take(&mut entry.records)
                })
        };
        let Some(records) = taken else {
            warn!(handler = %self.handler, source, "No open generation to close");
            return None;
        };

        let timestamp = self.timestamps.then(exposition::now_millis);
        let rendered = render_generation(&records, timestamp);

        {
            let mut types = self.types.lock();
            for (name, kind) in rendered.types {
                types.insert(name, kind);
            }
        }
        self.published
            .lock()
            .insert(source.to_string(), Arc::from(rendered.body));

        debug!(
            handler = %self.handler,
            source,
            samples = rendered.samples,
            invalid = rendered.invalid,
            "Generation published"
        );
        observability::record_generation_published(&self.handler, source, rendered.samples);
        observability::record_records_dropped(&self.handler, "invalid_name", rendered.invalid as u64);

        Some(PublishReport {
            samples: rendered.samples,
            invalid: rendered.invalid,
        })
    }

    /// Full exposition payload
    ///
    /// Type lines sorted by name, then every published body sorted by source.
    pub fn render(&self) -> String {
        assemble(&self.types(), &self.bodies())
    }

    /// Payload of several caches
    ///
    /// Type tables are merged with the later cache winning, so each name
    /// gets a single type line ahead of every body.
    pub fn render_all(caches: &[Arc<SnapshotCache>]) -> String {
        let mut types = BTreeMap::new();
        let mut bodies = Vec::new();
        for cache in caches {
            types.extend(cache.types());
            bodies.extend(cache.bodies());
        }
        assemble(&types, &bodies)
    }

    /// Sanitized name -> kind of every published sample
    pub fn types(&self) -> BTreeMap<String, MetricKind> {
        self.types.lock().clone()
    }

    /// Published bodies, sorted by source
    pub fn bodies(&self) -> Vec<Arc<str>> {
        self.published.lock().values().cloned().collect()
    }

    /// Published body of one source
    pub fn published(&self, source: &str) -> Option<Arc<str>> {
        self.published.lock().get(source).cloned()
    }

    pub fn published_sources(&self) -> Vec<String> {
        self.published.lock().keys().cloned().collect()
    }

    pub fn is_open(&self, source: &str) -> bool {
        self.working
            .lock()
            .get(source)
            .is_some_and(|entry| entry.open)
    }

    /// Total records dropped for arriving outside a generation
    pub fn orphaned(&self) -> u64 {
        self.orphaned.load(Ordering::Relaxed)
    }
}

fn assemble(types: &BTreeMap<String, MetricKind>, bodies: &[Arc<str>]) -> String {
    let type_lines: Vec<String> = types
        .iter()
        .map(|(name, kind)| render_type_line(name, *kind))
        .collect();

    let capacity = type_lines.iter().map(String::len).sum::<usize>()
        + bodies.iter().map(|b| b.len()).sum::<usize>();
    let mut payload = String::with_capacity(capacity);
    for line in &type_lines {
        payload.push_str(line);
    }
    for body in bodies {
        payload.push_str(body);
    }
    payload
}
