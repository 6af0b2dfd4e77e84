//! Rendering surface abstraction.
//!
//! The engine never talks to a concrete map widget. It issues commands
//! through [`MapSurface`] and is fed [`SurfaceEvent`]s by the host's event
//! loop. Animations are only considered finished when the surface reports
//! their completion event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::markers::MarkerPhase;
use crate::GpsPoint;

/// Identifier of a popup opened on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PopupId(pub u64);

/// Paint for a line layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinePaint {
    /// One color for the whole path
    Flat {
        color: String,
        width: f64,
        opacity: f64,
    },
    /// Color interpolated over each feature's `slope` property.
    /// Stops are `(slope_percent, "#rrggbb")`.
    Gradient {
        stops: Vec<(f64, String)>,
        width: f64,
        opacity: f64,
    },
}

/// A line layer drawing one GeoJSON source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLayer {
    pub id: String,
    pub source: String,
    pub paint: LinePaint,
}

/// Camera position reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub center: GpsPoint,
    pub zoom: f64,
}

/// Animated camera move. The surface echoes `token` in
/// [`SurfaceEvent::EaseEnd`] once the animation has finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EaseCommand {
    pub center: GpsPoint,
    pub zoom: f64,
    pub duration_ms: u32,
    pub token: u64,
}

/// Visual state of a summit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerAppearance {
    pub phase: MarkerPhase,
    pub bagged: bool,
    pub hovered: bool,
    pub selected: bool,
    /// Token of the running enter/exit animation, echoed back in
    /// [`SurfaceEvent::MarkerAnimationEnd`]
    pub animation: u64,
}

/// A summit marker to place on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub poi_id: String,
    pub position: GpsPoint,
    pub label: String,
    /// Whether pointer enter/leave handlers are attached. Off on touch
    /// devices.
    pub hover_handlers: bool,
    pub appearance: MarkerAppearance,
}

/// A transient popup next to a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupSpec {
    pub id: PopupId,
    pub poi_id: String,
    pub position: GpsPoint,
    pub title: String,
    pub subtitle: String,
}

/// Events the host forwards from the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Base style (re)loaded; custom sources and layers are gone
    StyleLoad,
    /// A camera ease finished
    EaseEnd { token: u64 },
    /// The camera stopped moving
    MoveEnd { view: CameraView },
    /// The camera stopped zooming
    ZoomEnd { view: CameraView },
    /// A marker's enter or exit animation finished
    MarkerAnimationEnd { poi_id: String, token: u64 },
    /// A popup's exit animation finished
    PopupAnimationEnd { popup: PopupId },
    /// The viewport was resized
    Resize { width_px: f64 },
}

/// Command interface of the live map.
pub trait MapSurface {
    /// Whether sources and layers may be added right now.
    fn is_style_loaded(&self) -> bool;

    fn add_source(&mut self, id: &str, data: Value);
    fn remove_source(&mut self, id: &str);
    fn has_source(&self, id: &str) -> bool;

    fn add_layer(&mut self, layer: LineLayer);
    fn remove_layer(&mut self, id: &str);
    fn has_layer(&self, id: &str) -> bool;

    /// Start an animated camera move.
    fn ease_to(&mut self, command: EaseCommand);

    fn add_marker(&mut self, marker: MarkerSpec);
    fn set_marker_appearance(&mut self, poi_id: &str, appearance: MarkerAppearance);
    fn remove_marker(&mut self, poi_id: &str);

    fn open_popup(&mut self, popup: PopupSpec);
    /// Begin a popup's exit animation.
    fn close_popup(&mut self, id: PopupId);
    /// Detach a popup immediately.
    fn remove_popup(&mut self, id: PopupId);
}

pub mod headless {
    //! In-memory surface for tests and server-side use. Records every
    //! command; animations complete only when the caller feeds the
    //! matching event.

    use std::collections::BTreeMap;

    use serde_json::Value;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct HeadlessPopup {
        pub spec: PopupSpec,
        pub closing: bool,
    }

    #[derive(Debug, Clone)]
    pub struct HeadlessSurface {
        pub style_loaded: bool,
        pub sources: BTreeMap<String, Value>,
        pub layers: Vec<LineLayer>,
        pub markers: BTreeMap<String, MarkerSpec>,
        pub popups: BTreeMap<PopupId, HeadlessPopup>,
        pub eases: Vec<EaseCommand>,
        /// Adds for an id that already existed
        pub conflicts: u32,
    }

    impl HeadlessSurface {
        /// A surface whose style is already loaded.
        pub fn new() -> Self {
            Self {
                style_loaded: true,
                sources: BTreeMap::new(),
                layers: Vec::new(),
                markers: BTreeMap::new(),
                popups: BTreeMap::new(),
                eases: Vec::new(),
                conflicts: 0,
            }
        }

        /// A surface still loading its style.
        pub fn loading() -> Self {
            Self {
                style_loaded: false,
                ..Self::new()
            }
        }

        /// Simulate a base style switch: custom sources and layers vanish.
        pub fn reload_style(&mut self) {
            self.sources.clear();
            self.layers.clear();
            self.style_loaded = true;
        }

        pub fn layer(&self, id: &str) -> Option<&LineLayer> {
            self.layers.iter().find(|l| l.id == id)
        }

        pub fn last_ease(&self) -> Option<&EaseCommand> {
            self.eases.last()
        }
    }

    impl Default for HeadlessSurface {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MapSurface for HeadlessSurface {
        fn is_style_loaded(&self) -> bool {
            self.style_loaded
        }

        fn add_source(&mut self, id: &str, data: Value) {
            if self.sources.insert(id.to_string(), data).is_some() {
                self.conflicts += 1;
            }
        }

        fn remove_source(&mut self, id: &str) {
            self.sources.remove(id);
        }

        fn has_source(&self, id: &str) -> bool {
            self.sources.contains_key(id)
        }

        fn add_layer(&mut self, layer: LineLayer) {
            if self.has_layer(&layer.id) {
                self.conflicts += 1;
                return;
            }
            self.layers.push(layer);
        }

        fn remove_layer(&mut self, id: &str) {
            self.layers.retain(|l| l.id != id);
        }

        fn has_layer(&self, id: &str) -> bool {
            self.layers.iter().any(|l| l.id == id)
        }

        fn ease_to(&mut self, command: EaseCommand) {
            self.eases.push(command);
        }

        fn add_marker(&mut self, marker: MarkerSpec) {
            if self.markers.insert(marker.poi_id.clone(), marker).is_some() {
                self.conflicts += 1;
            }
        }

        fn set_marker_appearance(&mut self, poi_id: &str, appearance: MarkerAppearance) {
            if let Some(marker) = self.markers.get_mut(poi_id) {
                marker.appearance = appearance;
            }
        }

        fn remove_marker(&mut self, poi_id: &str) {
            self.markers.remove(poi_id);
        }

        fn open_popup(&mut self, popup: PopupSpec) {
            let id = popup.id;
            let entry = HeadlessPopup {
                spec: popup,
                closing: false,
            };
            if self.popups.insert(id, entry).is_some() {
                self.conflicts += 1;
            }
        }

        fn close_popup(&mut self, id: PopupId) {
            if let Some(popup) = self.popups.get_mut(&id) {
                popup.closing = true;
            }
        }

        fn remove_popup(&mut self, id: PopupId) {
            self.popups.remove(&id);
        }
    }

}
