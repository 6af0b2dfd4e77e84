//! # Map Session
//!
//! Owns every per-view component and routes surface events to them. A
//! session lives exactly as long as the map view; [`MapSession::teardown`]
//! removes everything it put on the surface, detaches view-state listeners
//! and flips the session's [`Liveness`] so late async completions are
//! dropped instead of painting onto a dead view.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, info};

use crate::camera::CameraController;
use crate::config::{LineStyle, MapConfig};
use crate::error::{MapError, OptionExt, Result};
use crate::filter::{apply_filter, FilterCriteria};
use crate::markers::{MarkerLifecycleManager, NavigationRequest};
use crate::poi_index::PoiIndex;
use crate::route_layer::{RouteLayerManager, RouteRender};
use crate::store::{BaggedSets, RecordStore, TrackSource};
use crate::surface::{MapSurface, SurfaceEvent};
use crate::trace_cache::{CacheStats, TraceCache};
use crate::view_state::ViewState;
use crate::{Bounds, Link, Poi, RenderMode, RouteRecord};

/// Shared flag telling async work whether its consumer is still around.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    /// Mark the consumer as gone. Irreversible.
    pub fn end(&self) {
        self.0.set(false);
    }

    /// `Err(SessionClosed)` once ended.
    pub fn check(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(MapError::SessionClosed)
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Records supplied by the record store for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub pois: Vec<Poi>,
    pub routes: Vec<RouteRecord>,
    pub links: Vec<Link>,
    /// Bagged sets of the people a social filter may reference
    pub social: BaggedSets,
}

impl Catalog {
    /// Fetch every record set concurrently. The first failure is returned.
    pub async fn load(store: &dyn RecordStore, person_ids: &[String]) -> Result<Self> {
        let (pois, routes, links, social) = futures::try_join!(
            store.fetch_pois(),
            store.fetch_routes(),
            store.fetch_links(),
            store.fetch_social_bagged_sets(person_ids),
        )?;

        info!(
            "[MapSession] Catalog loaded: {} summits, {} routes, {} links",
            pois.len(),
            routes.len(),
            links.len()
        );
        Ok(Self {
            pois,
            routes,
            links,
            social,
        })
    }

    pub fn route(&self, route_id: &str) -> Option<&RouteRecord> {
        self.routes.iter().find(|r| r.id == route_id)
    }

    pub fn poi(&self, poi_id: &str) -> Option<&Poi> {
        self.pois.iter().find(|p| p.id == poi_id)
    }
}

/// One live map view.
pub struct MapSession {
    config: MapConfig,
    view: ViewState,
    catalog: Catalog,
    index: PoiIndex,
    cache: TraceCache,
    layers: RouteLayerManager,
    markers: MarkerLifecycleManager,
    camera: CameraController,
    liveness: Liveness,
}

impl MapSession {
    pub fn new(
        config: MapConfig,
        catalog: Catalog,
        source: Arc<dyn TrackSource>,
        view: ViewState,
        viewport_width_px: f64,
    ) -> Self {
        let index = PoiIndex::new(catalog.pois.clone());
        let cache = TraceCache::new(source, config.gradient.clone());
        let markers =
            MarkerLifecycleManager::new(config.markers.clone(), viewport_width_px, view.clone());
        let camera = CameraController::new(config.camera.clone(), view.clone());

        Self {
            config,
            view,
            catalog,
            index,
            cache,
            layers: RouteLayerManager::new(),
            markers,
            camera,
            liveness: Liveness::new(),
        }
    }

    /// Route a surface event to the component that owns it.
    pub fn dispatch<S: MapSurface + ?Sized>(&mut self, surface: &mut S, event: SurfaceEvent) {
        if !self.liveness.is_alive() {
            return;
        }
        match &event {
            SurfaceEvent::StyleLoad => self.layers.handle_style_load(surface),
            SurfaceEvent::EaseEnd { .. }
            | SurfaceEvent::MoveEnd { .. }
            | SurfaceEvent::ZoomEnd { .. } => self.camera.handle_event(&event),
            SurfaceEvent::MarkerAnimationEnd { poi_id, token } => {
                self.markers.handle_animation_end(surface, poi_id, *token)
            }
            SurfaceEvent::PopupAnimationEnd { popup } => {
                self.markers.handle_popup_animation_end(surface, *popup)
            }
            SurfaceEvent::Resize { width_px } => self.markers.set_viewport_width(surface, *width_px),
        }
    }

    // ========================================================================
    // Routes
    // ========================================================================

    /// Resolve render data for a route through the trace cache.
    ///
    /// Fails with `SessionClosed` if the session ends while the fetch is in
    /// flight, so the result is never painted.
    pub async fn load_route(&self, route_id: &str, mode: RenderMode) -> Result<RouteRender> {
        self.liveness.check()?;
        let route = self.catalog.route(route_id).ok_or_unknown_route(route_id)?;

        let render = match mode {
            RenderMode::Flat => RouteRender::Flat(self.cache.get(route).await?),
            RenderMode::Gradient => RouteRender::Gradient(self.cache.get_segments(route).await?),
        };

        self.liveness.check()?;
        Ok(render)
    }

    /// Paint a loaded route with the session's flat-mode style.
    pub fn show_route<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        route_id: &str,
        render: RouteRender,
    ) -> Result<()> {
        let style = self.config.route_style.clone();
        self.show_route_with_style(surface, route_id, render, &style)
    }

    /// Paint a loaded route with a caller-supplied flat-mode style.
    pub fn show_route_with_style<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        route_id: &str,
        render: RouteRender,
        style: &LineStyle,
    ) -> Result<()> {
        if let Err(e) = self.liveness.check() {
            debug!("[MapSession] Dropping late render for '{}'", route_id);
            return Err(e);
        }
        self.layers.show(surface, route_id, render, style);
        Ok(())
    }

    /// Load and paint a route in one step.
    pub async fn display_route<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        route_id: &str,
        mode: RenderMode,
    ) -> Result<()> {
        let render = self.load_route(route_id, mode).await?;
        self.show_route(surface, route_id, render)
    }

    pub fn hide_route<S: MapSurface + ?Sized>(&mut self, surface: &mut S, route_id: &str) {
        self.layers.hide(surface, route_id);
    }

    pub fn route_mode(&self, route_id: &str) -> Option<RenderMode> {
        self.layers.mode(route_id)
    }

    // ========================================================================
    // Summits
    // ========================================================================

    /// Summits passing the current criteria, optionally narrowed to a
    /// viewport.
    pub fn visible_pois(&self, viewport: Option<&Bounds>) -> Vec<Poi> {
        let criteria = self.view.read(|s| s.criteria.clone());
        let filtered = apply_filter(
            &criteria,
            &self.catalog.pois,
            &self.catalog.routes,
            &self.catalog.links,
            &self.catalog.social,
        );

        match viewport {
            Some(bounds) => {
                let in_view: HashSet<&str> = self
                    .index
                    .query_viewport(bounds)
                    .into_iter()
                    .map(|p| p.id.as_str())
                    .collect();
                filtered
                    .into_iter()
                    .filter(|p| in_view.contains(p.id.as_str()))
                    .collect()
            }
            None => filtered,
        }
    }

    /// Reconcile markers with the visible summit set.
    pub fn sync_markers<S: MapSurface + ?Sized>(&mut self, surface: &mut S, viewport: Option<&Bounds>) {
        if !self.liveness.is_alive() {
            return;
        }
        let visible = self.visible_pois(viewport);
        let bagged = self.view.read(|s| s.bagged.clone());
        self.markers.sync(surface, &visible, &bagged);
    }

    pub fn set_criteria(&self, criteria: FilterCriteria) {
        self.view.update(|s| s.criteria = criteria);
    }

    /// Replace the bagged sets social filters are evaluated against. Takes
    /// effect on the next [`MapSession::sync_markers`].
    pub fn set_social_bagged_sets(&mut self, social: BaggedSets) {
        debug!("[MapSession] Social bagged sets replaced ({} people)", social.len());
        self.catalog.social = social;
    }

    /// Re-fetch bagged sets for `person_ids`, e.g. after the social filter's
    /// people changed. On failure the previous sets stay in place.
    pub async fn refresh_social_bagged_sets(
        &mut self,
        store: &dyn RecordStore,
        person_ids: &[String],
    ) -> Result<()> {
        self.liveness.check()?;
        let social = store.fetch_social_bagged_sets(person_ids).await?;
        self.liveness.check()?;
        self.set_social_bagged_sets(social);
        Ok(())
    }

    /// Navigation target changed: update shared state, marker emphasis and
    /// the camera target. Unknown ids clear the selection.
    pub fn select_poi<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: Option<&str>) {
        if !self.liveness.is_alive() {
            return;
        }
        let poi = poi_id.and_then(|id| self.catalog.poi(id)).cloned();
        let active = poi.as_ref().map(|p| p.id.clone());

        self.view.update(|s| s.active_poi = active.clone());
        self.markers.set_selected(surface, active.as_deref());
        self.camera.set_target(surface, poi.as_ref());
    }

    pub fn recenter<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        if self.liveness.is_alive() {
            self.camera.recenter(surface);
        }
    }

    pub fn pointer_enter<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) -> bool {
        self.liveness.is_alive() && self.markers.pointer_enter(surface, poi_id)
    }

    pub fn pointer_leave<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) {
        if self.liveness.is_alive() {
            self.markers.pointer_leave(surface, poi_id);
        }
    }

    pub fn click_marker(&self, poi_id: &str) -> Option<NavigationRequest> {
        if !self.liveness.is_alive() {
            return None;
        }
        self.markers.click(poi_id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// End the session. Safe to call more than once.
    pub fn teardown<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        if !self.liveness.is_alive() {
            return;
        }
        self.liveness.end();

        self.layers.hide_all(surface);
        self.markers.teardown(surface);
        self.camera.detach();
        self.view.clear_subscribers();
        self.cache.clear();

        info!("[MapSession] Torn down");
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn markers(&self) -> &MarkerLifecycleManager {
        &self.markers
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
