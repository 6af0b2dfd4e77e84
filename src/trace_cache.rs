//! # Trace Cache
//!
//! Session-scoped cache of decoded route traces (and their gradient
//! segments), keyed by route id.
//!
//! Concurrent requests for the same uncached route share one fetch+decode:
//! the first caller starts a shared future and later callers await the same
//! future. Failures are handed to every waiter and leave nothing behind, so
//! a later request retries. Entries are never evicted; the route catalog is
//! small and traces are immutable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};

use crate::config::GradientConfig;
use crate::error::Result;
use crate::gradient::compute_segments;
use crate::store::TrackSource;
use crate::track::decode_track;
use crate::{RouteRecord, Segment, Trace};

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Trace>>>>;

enum Slot {
    Ready(Arc<Trace>),
    Loading { load_id: u64, load: SharedLoad },
}

#[derive(Debug, Default)]
struct Counters {
    fetches: AtomicU32,
    hits: AtomicU32,
    failures: AtomicU32,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Decoded traces held
    pub trace_count: u32,
    /// Gradient segment sets held
    pub segment_count: u32,
    /// Loads currently in flight
    pub in_flight: u32,
    /// Raw track fetches started
    pub fetches: u32,
    /// Requests answered from a ready entry
    pub hits: u32,
    /// Fetches or decodes that failed
    pub failures: u32,
}

/// Decoded trace cache owned by a map session.
pub struct TraceCache {
    source: Arc<dyn TrackSource>,
    gradient: GradientConfig,
    entries: Mutex<HashMap<String, Slot>>,
    segments: Mutex<HashMap<String, Arc<Vec<Segment>>>>,
    next_load_id: AtomicU64,
    counters: Arc<Counters>,
}

impl TraceCache {
    /// Create an empty cache over a track source.
    pub fn new(source: Arc<dyn TrackSource>, gradient: GradientConfig) -> Self {
        Self {
            source,
            gradient,
            entries: Mutex::new(HashMap::new()),
            segments: Mutex::new(HashMap::new()),
            next_load_id: AtomicU64::new(1),
            counters: Arc::new(Counters::default()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn segment_map(&self) -> MutexGuard<'_, HashMap<String, Arc<Vec<Segment>>>> {
        self.segments.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get the decoded trace for a route, fetching and decoding it once.
    pub async fn get(&self, route: &RouteRecord) -> Result<Arc<Trace>> {
        let (load_id, load) = {
            let mut entries = self.entries();
            match entries.get(&route.id) {
                Some(Slot::Ready(trace)) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(trace));
                }
                Some(Slot::Loading { load_id, load }) => {
                    debug!("[TraceCache] Joining in-flight load for '{}'", route.id);
                    (*load_id, load.clone())
                }
                None => {
                    let load_id = self.next_load_id.fetch_add(1, Ordering::Relaxed);
                    let load = self.start_load(route);
                    entries.insert(
                        route.id.clone(),
                        Slot::Loading {
                            load_id,
                            load: load.clone(),
                        },
                    );
                    (load_id, load)
                }
            }
        };

        let result = load.await;
        self.settle(&route.id, load_id, &result);
        result
    }

    /// Get gradient segments for a route, computing them from the cached
    /// trace on first request.
    pub async fn get_segments(&self, route: &RouteRecord) -> Result<Arc<Vec<Segment>>> {
        if let Some(segments) = self.segment_map().get(&route.id) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(segments));
        }

        let trace = self.get(route).await?;
        let computed = Arc::new(compute_segments(&trace, &self.gradient));

        let mut segments = self.segment_map();
        let entry = segments.entry(route.id.clone()).or_insert(computed);
        Ok(Arc::clone(entry))
    }

    fn start_load(&self, route: &RouteRecord) -> SharedLoad {
        let source = Arc::clone(&self.source);
        let counters = Arc::clone(&self.counters);
        let route_id = route.id.clone();
        let reference = route.track_ref.clone();

        async move {
            counters.fetches.fetch_add(1, Ordering::Relaxed);
            debug!("[TraceCache] Fetching '{}' for route '{}'", reference, route_id);

            let outcome = match source.fetch_raw_track(&reference).await {
                Ok(bytes) => decode_track(&route_id, &bytes).map(Arc::new),
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("[TraceCache] Load failed for route '{}': {}", route_id, e);
            }
            outcome
        }
        .boxed()
        .shared()
    }

    /// Replace the loading slot with its outcome. Only the load that created
    /// the slot may settle it; a retry started after a failure owns its own.
    fn settle(&self, route_id: &str, load_id: u64, result: &Result<Arc<Trace>>) {
        let mut entries = self.entries();
        let owns_slot = matches!(
            entries.get(route_id),
            Some(Slot::Loading { load_id: current, .. }) if *current == load_id
        );
        if !owns_slot {
            return;
        }
        match result {
            Ok(trace) => {
                entries.insert(route_id.to_string(), Slot::Ready(Arc::clone(trace)));
            }
            Err(_) => {
                entries.remove(route_id);
            }
        }
    }

    /// Check whether a decoded trace is ready for a route.
    pub fn contains(&self, route_id: &str) -> bool {
        matches!(self.entries().get(route_id), Some(Slot::Ready(_)))
    }

    /// Drop everything. Called when the owning session ends.
    pub fn clear(&self) {
        self.entries().clear();
        self.segment_map().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        let in_flight = entries
            .values()
            .filter(|slot| matches!(slot, Slot::Loading { .. }))
            .count();

        CacheStats {
            trace_count: (entries.len() - in_flight) as u32,
            segment_count: self.segment_map().len() as u32,
            in_flight: in_flight as u32,
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}
