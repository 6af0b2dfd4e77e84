//! Collaborator interfaces.
//!
//! The record store and the raw track source live outside the engine. They
//! return boxed futures so implementations can be swapped (HTTP, bundled
//! assets, in-memory fixtures) without the engine depending on a runtime.

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;

use crate::error::Result;
use crate::{Link, Poi, RouteRecord};

/// Bagged summit ids per person id.
pub type BaggedSets = HashMap<String, HashSet<String>>;

/// Source of raw track files.
///
/// Failures are returned as-is; the engine never retries on its own.
pub trait TrackSource: Send + Sync + 'static {
    /// Fetch the raw bytes behind a route's track reference.
    fn fetch_raw_track(&self, reference: &str) -> BoxFuture<'static, Result<Vec<u8>>>;
}

/// Read access to the summit/route catalog and social bagging data.
pub trait RecordStore: Send + Sync + 'static {
    fn fetch_pois(&self) -> BoxFuture<'static, Result<Vec<Poi>>>;

    fn fetch_routes(&self) -> BoxFuture<'static, Result<Vec<RouteRecord>>>;

    fn fetch_links(&self) -> BoxFuture<'static, Result<Vec<Link>>>;

    /// Bagged summit ids for each requested person. Persons without any
    /// record may be absent from the map.
    fn fetch_social_bagged_sets(&self, person_ids: &[String]) -> BoxFuture<'static, Result<BaggedSets>>;
}
