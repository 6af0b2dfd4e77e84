//! R-tree of summit positions for viewport queries.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::{Bounds, Poi};

/// A summit position with its index into the owning slice.
#[derive(Debug, Clone, Copy)]
struct IndexedPoi {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoi {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

impl PointDistance for IndexedPoi {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlng = self.lng - point[0];
        let dlat = self.lat - point[1];
        dlng * dlng + dlat * dlat
    }
}

/// Spatial index over a summit list.
pub struct PoiIndex {
    pois: Vec<Poi>,
    tree: RTree<IndexedPoi>,
}

impl PoiIndex {
    /// Bulk-load an index. Summits with invalid coordinates are not indexed.
    pub fn new(pois: Vec<Poi>) -> Self {
        let indexed: Vec<IndexedPoi> = pois
            .iter()
            .enumerate()
            .filter(|(_, p)| p.position().is_valid())
            .map(|(idx, p)| IndexedPoi {
                idx,
                lat: p.latitude,
                lng: p.longitude,
            })
            .collect();

        Self {
            pois,
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Summits inside the viewport (edges inclusive), in input order.
    pub fn query_viewport(&self, bounds: &Bounds) -> Vec<&Poi> {
        let search_bounds = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope(&search_bounds)
            .map(|p| p.idx)
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|idx| &self.pois[idx]).collect()
    }

    /// Closest summit to a point, by degree distance.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<&Poi> {
        self.tree
            .nearest_neighbor(&[longitude, latitude])
            .map(|p| &self.pois[p.idx])
    }
}
