//! # Summit Filtering
//!
//! A summit survives when the social predicate (if any) holds for it and at
//! least one of its linked routes matches every route criterion. Summits
//! with no linked route never survive.
//!
//! [`apply_filter`] is pure; it borrows its inputs and returns the surviving
//! summits in input order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::store::BaggedSets;
use crate::{Difficulty, Link, Poi, RouteRecord, RouteStyle};

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range that accepts every finite value.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for NumericRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// How the listed people's bagged sets constrain a summit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SocialMode {
    AllHaveVisited,
    NoneHaveVisited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialFilter {
    pub person_ids: Vec<String>,
    pub mode: SocialMode,
}

/// Filter criteria. `None` for style or difficulty means "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub route_style: Option<RouteStyle>,
    pub difficulty: Option<Difficulty>,
    /// Route length in kilometers
    pub length_km: NumericRange,
    /// Route ascent in meters
    pub ascent_m: NumericRange,
    pub social: Option<SocialFilter>,
}

impl FilterCriteria {
    /// Whether a route satisfies every route criterion.
    pub fn matches_route(&self, route: &RouteRecord) -> bool {
        self.route_style.map_or(true, |style| route.style == style)
            && self.difficulty.map_or(true, |d| route.difficulty == d)
            && self.length_km.contains(route.length_km)
            && self.ascent_m.contains(route.ascent_m)
    }
}

impl SocialFilter {
    /// People missing from `bagged_sets` count as having bagged nothing.
    pub fn matches(&self, poi_id: &str, bagged_sets: &BaggedSets) -> bool {
        let mut visited = self.person_ids.iter().map(|person| {
            bagged_sets
                .get(person)
                .is_some_and(|set| set.contains(poi_id))
        });
        match self.mode {
            SocialMode::AllHaveVisited => visited.all(|v| v),
            SocialMode::NoneHaveVisited => !visited.any(|v| v),
        }
    }
}

/// Summits that pass `criteria`.
///
/// # Example
/// ```
/// use munro_map::{apply_filter, FilterCriteria};
///
/// let kept = apply_filter(&FilterCriteria::default(), &[], &[], &[], &Default::default());
/// assert!(kept.is_empty());
/// ```
pub fn apply_filter(
    criteria: &FilterCriteria,
    pois: &[Poi],
    routes: &[RouteRecord],
    links: &[Link],
    bagged_sets: &BaggedSets,
) -> Vec<Poi> {
    let matching_routes: HashSet<&str> = routes
        .iter()
        .filter(|r| criteria.matches_route(r))
        .map(|r| r.id.as_str())
        .collect();

    let mut routes_by_poi: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in links {
        routes_by_poi
            .entry(link.poi_id.as_str())
            .or_default()
            .push(link.route_id.as_str());
    }

    pois.iter()
        .filter(|poi| {
            criteria
                .social
                .as_ref()
                .map_or(true, |social| social.matches(&poi.id, bagged_sets))
        })
        .filter(|poi| {
            routes_by_poi
                .get(poi.id.as_str())
                .is_some_and(|ids| ids.iter().any(|id| matching_routes.contains(id)))
        })
        .cloned()
        .collect()
}
