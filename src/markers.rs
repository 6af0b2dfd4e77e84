//! # Summit Markers
//!
//! Each summit marker runs `absent -> entering -> present -> exiting ->
//! absent`. Transitions out of `entering` and `exiting` happen only when the
//! surface reports the animation's completion, so an exit animation is never
//! cut short by removing the marker early. A summit that comes back while
//! exiting re-enters on the same marker; there is never more than one live
//! state per summit.
//!
//! Hover exists on pointer devices only. On touch form factors markers are
//! created without hover handlers and hover calls are ignored.
//!
//! Clicking requests navigation; the `selected` flag follows the active
//! navigation target through [`MarkerLifecycleManager::set_selected`].

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::MarkerConfig;
use crate::surface::{MapSurface, MarkerAppearance, MarkerSpec, PopupId, PopupSpec};
use crate::view_state::ViewState;
use crate::Poi;

/// Animation phase of a live marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerPhase {
    Entering,
    Present,
    Exiting,
}

/// Input form factor, derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFactor {
    Pointer,
    Touch,
}

impl FormFactor {
    pub fn from_viewport_width(width_px: f64, config: &MarkerConfig) -> Self {
        if width_px < config.touch_breakpoint_px {
            FormFactor::Touch
        } else {
            FormFactor::Pointer
        }
    }
}

/// Live state of one summit marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    pub poi: Poi,
    pub phase: MarkerPhase,
    pub bagged: bool,
    pub hovered: bool,
    pub selected: bool,
    /// Token of the animation in progress. Completion events carrying any
    /// other token are stale.
    pub animation: u64,
    popup: Option<PopupId>,
}

impl MarkerState {
    /// Exiting markers still exist but are not part of the visible set.
    pub fn is_visible(&self) -> bool {
        self.phase != MarkerPhase::Exiting
    }

    pub fn popup(&self) -> Option<PopupId> {
        self.popup
    }

    fn appearance(&self) -> MarkerAppearance {
        MarkerAppearance {
            phase: self.phase,
            bagged: self.bagged,
            hovered: self.hovered,
            selected: self.selected,
            animation: self.animation,
        }
    }
}

/// Detail view requested by a marker click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub poi_id: String,
    pub path: String,
}

/// Creates, animates and destroys summit markers.
pub struct MarkerLifecycleManager {
    config: MarkerConfig,
    form_factor: FormFactor,
    view: ViewState,
    markers: HashMap<String, MarkerState>,
    /// Popups detached from their marker, waiting for their exit animation
    closing_popups: HashMap<PopupId, String>,
    next_popup: u64,
    next_animation: u64,
    active_poi: Option<String>,
}

impl MarkerLifecycleManager {
    pub fn new(config: MarkerConfig, viewport_width_px: f64, view: ViewState) -> Self {
        let form_factor = FormFactor::from_viewport_width(viewport_width_px, &config);
        Self {
            config,
            form_factor,
            view,
            markers: HashMap::new(),
            closing_popups: HashMap::new(),
            next_popup: 1,
            next_animation: 1,
            active_poi: None,
        }
    }

    pub fn form_factor(&self) -> FormFactor {
        self.form_factor
    }

    /// Reconcile live markers against the visible summit set.
    ///
    /// New summits start entering, missing ones start exiting; both are
    /// applied to the surface before this returns.
    pub fn sync<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        visible: &[Poi],
        bagged: &HashSet<String>,
    ) {
        let visible_ids: HashSet<&str> = visible.iter().map(|p| p.id.as_str()).collect();
        let hover_handlers = self.form_factor == FormFactor::Pointer;

        for poi in visible {
            let is_bagged = bagged.contains(&poi.id);
            let selected = self.active_poi.as_deref() == Some(poi.id.as_str());

            match self.markers.get_mut(&poi.id) {
                Some(state) => {
                    let before = state.appearance();
                    if state.phase == MarkerPhase::Exiting {
                        state.phase = MarkerPhase::Entering;
                        state.animation = self.next_animation;
                        self.next_animation += 1;
                    }
                    state.bagged = is_bagged;
                    state.selected = selected;
                    if state.appearance() != before {
                        surface.set_marker_appearance(&poi.id, state.appearance());
                    }
                }
                None => {
                    let state = MarkerState {
                        poi: poi.clone(),
                        phase: MarkerPhase::Entering,
                        bagged: is_bagged,
                        hovered: false,
                        selected,
                        animation: self.next_animation,
                        popup: None,
                    };
                    self.next_animation += 1;
                    surface.add_marker(MarkerSpec {
                        poi_id: poi.id.clone(),
                        position: poi.position(),
                        label: poi.name.clone(),
                        hover_handlers,
                        appearance: state.appearance(),
                    });
                    self.markers.insert(poi.id.clone(), state);
                }
            }
        }

        let leaving: Vec<String> = self
            .markers
            .iter()
            .filter(|(id, state)| state.is_visible() && !visible_ids.contains(id.as_str()))
            .map(|(id, _)| id.clone())
            .collect();

        for poi_id in &leaving {
            self.begin_exit(surface, poi_id);
        }

        debug!(
            "[Markers] Synced {} visible, {} exiting, {} live",
            visible.len(),
            leaving.len(),
            self.markers.len()
        );
    }

    fn begin_exit<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) {
        self.detach_popup(surface, poi_id);
        let was_hovered = match self.markers.get_mut(poi_id) {
            Some(state) => {
                state.phase = MarkerPhase::Exiting;
                state.animation = self.next_animation;
                self.next_animation += 1;
                let was_hovered = state.hovered;
                state.hovered = false;
                surface.set_marker_appearance(poi_id, state.appearance());
                was_hovered
            }
            None => return,
        };
        if was_hovered {
            self.clear_hovered(poi_id);
        }
    }

    /// A marker's enter or exit animation finished. `token` must match the
    /// animation currently running on the marker; anything else belongs to
    /// a superseded transition and is dropped.
    pub fn handle_animation_end<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        poi_id: &str,
        token: u64,
    ) {
        let Some(state) = self.markers.get_mut(poi_id) else {
            return;
        };
        if state.animation != token {
            debug!(
                "[Markers] Ignoring stale animation end for '{}' (token {}, current {})",
                poi_id, token, state.animation
            );
            return;
        }
        let phase = state.phase;
        match phase {
            MarkerPhase::Entering => {
                state.phase = MarkerPhase::Present;
                surface.set_marker_appearance(poi_id, state.appearance());
            }
            MarkerPhase::Exiting => {
                surface.remove_marker(poi_id);
                self.markers.remove(poi_id);
            }
            // Late duplicate event
            MarkerPhase::Present => {}
        }
    }

    /// Pointer entered a marker. Returns whether hover was applied.
    pub fn pointer_enter<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) -> bool {
        if self.form_factor == FormFactor::Touch {
            return false;
        }
        match self.markers.get_mut(poi_id) {
            Some(state) if state.is_visible() => {
                state.hovered = true;
                surface.set_marker_appearance(poi_id, state.appearance());
            }
            _ => return false,
        }

        self.open_popup(surface, poi_id);
        let id = poi_id.to_string();
        self.view.update(|s| s.hovered_poi = Some(id));
        true
    }

    /// Pointer left a marker.
    pub fn pointer_leave<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) {
        if self.form_factor == FormFactor::Touch {
            return;
        }
        if let Some(state) = self.markers.get_mut(poi_id) {
            if state.hovered {
                state.hovered = false;
                surface.set_marker_appearance(poi_id, state.appearance());
            }
        }
        self.detach_popup(surface, poi_id);
        self.clear_hovered(poi_id);
    }

    fn clear_hovered(&self, poi_id: &str) {
        self.view.update(|s| {
            if s.hovered_poi.as_deref() == Some(poi_id) {
                s.hovered_poi = None;
            }
        });
    }

    /// Attach a fresh popup to a marker, sending any existing one through
    /// its exit animation first.
    pub fn open_popup<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) -> Option<PopupId> {
        if !self.markers.get(poi_id).is_some_and(MarkerState::is_visible) {
            return None;
        }
        self.detach_popup(surface, poi_id);

        let id = PopupId(self.next_popup);
        self.next_popup += 1;

        let units = self.view.read(|s| s.units);
        let state = self.markers.get_mut(poi_id)?;
        surface.open_popup(PopupSpec {
            id,
            poi_id: poi_id.to_string(),
            position: state.poi.position(),
            title: state.poi.name.clone(),
            subtitle: units.format_elevation(state.poi.elevation),
        });
        state.popup = Some(id);
        Some(id)
    }

    fn detach_popup<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi_id: &str) {
        let Some(state) = self.markers.get_mut(poi_id) else {
            return;
        };
        if let Some(popup) = state.popup.take() {
            surface.close_popup(popup);
            self.closing_popups.insert(popup, poi_id.to_string());
        }
    }

    /// A popup's exit animation finished.
    pub fn handle_popup_animation_end<S: MapSurface + ?Sized>(&mut self, surface: &mut S, popup: PopupId) {
        if self.closing_popups.remove(&popup).is_some() {
            surface.remove_popup(popup);
        }
    }

    /// Marker clicked: request the summit's detail view.
    pub fn click(&self, poi_id: &str) -> Option<NavigationRequest> {
        let state = self.markers.get(poi_id).filter(|s| s.is_visible())?;
        Some(NavigationRequest {
            poi_id: poi_id.to_string(),
            path: format!("/munros/{}", state.poi.slug),
        })
    }

    /// Follow the active navigation target.
    pub fn set_selected<S: MapSurface + ?Sized>(&mut self, surface: &mut S, active_poi: Option<&str>) {
        self.active_poi = active_poi.map(str::to_string);
        for (poi_id, state) in self.markers.iter_mut() {
            let selected = active_poi == Some(poi_id.as_str());
            if state.selected != selected {
                state.selected = selected;
                surface.set_marker_appearance(poi_id, state.appearance());
            }
        }
    }

    /// Viewport resized. Crossing the touch breakpoint re-creates markers so
    /// hover handlers are attached or dropped accordingly.
    pub fn set_viewport_width<S: MapSurface + ?Sized>(&mut self, surface: &mut S, width_px: f64) {
        let form_factor = FormFactor::from_viewport_width(width_px, &self.config);
        if form_factor == self.form_factor {
            return;
        }
        debug!("[Markers] Form factor changed to {:?}", form_factor);
        self.form_factor = form_factor;

        let ids: Vec<String> = self.markers.keys().cloned().collect();
        for poi_id in &ids {
            self.detach_popup(surface, poi_id);
        }
        if let Some(hovered) = self.view.read(|s| s.hovered_poi.clone()) {
            self.clear_hovered(&hovered);
        }

        let hover_handlers = form_factor == FormFactor::Pointer;
        for state in self.markers.values_mut() {
            state.hovered = false;
            surface.remove_marker(&state.poi.id);
            surface.add_marker(MarkerSpec {
                poi_id: state.poi.id.clone(),
                position: state.poi.position(),
                label: state.poi.name.clone(),
                hover_handlers,
                appearance: state.appearance(),
            });
        }
    }

    /// Remove every marker and popup immediately (view unmount).
    pub fn teardown<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        for (poi_id, state) in self.markers.drain() {
            if let Some(popup) = state.popup {
                surface.remove_popup(popup);
            }
            surface.remove_marker(&poi_id);
        }
        for (popup, _) in self.closing_popups.drain() {
            surface.remove_popup(popup);
        }
    }

    pub fn state(&self, poi_id: &str) -> Option<&MarkerState> {
        self.markers.get(poi_id)
    }

    /// Number of live marker states, exiting ones included.
    pub fn live_count(&self) -> usize {
        self.markers.len()
    }

    /// Ids of markers that count as visible, sorted.
    pub fn visible_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .markers
            .values()
            .filter(|s| s.is_visible())
            .map(|s| s.poi.id.clone())
            .collect();
        ids.sort();
        ids
    }
}
