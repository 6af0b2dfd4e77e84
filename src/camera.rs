//! # Camera Following
//!
//! Eases the camera onto the targeted summit and tracks whether the user has
//! since panned or zoomed away from it.
//!
//! Every target change bumps a generation counter that doubles as the ease
//! token. A completion event carrying an older token belongs to a superseded
//! target and is dropped, so `initial_settled` can only be set by the ease
//! issued for the current target.

use log::debug;

use crate::config::CameraConfig;
use crate::geo_utils::planar_distance_meters;
use crate::surface::{CameraView, EaseCommand, MapSurface, SurfaceEvent};
use crate::view_state::ViewState;
use crate::Poi;

/// The summit the camera is currently following.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraIntent {
    pub poi: Poi,
    /// Incremented on every target change
    pub generation: u64,
}

/// Drives recentering and off-center detection.
pub struct CameraController {
    config: CameraConfig,
    view: ViewState,
    intent: Option<CameraIntent>,
    generation: u64,
    initial_settled: bool,
    off_center: bool,
    attached: bool,
}

impl CameraController {
    pub fn new(config: CameraConfig, view: ViewState) -> Self {
        Self {
            config,
            view,
            intent: None,
            generation: 0,
            initial_settled: false,
            off_center: false,
            attached: true,
        }
    }

    /// Replace the camera target. `None` stops following.
    pub fn set_target<S: MapSurface + ?Sized>(&mut self, surface: &mut S, poi: Option<&Poi>) {
        self.generation += 1;
        self.initial_settled = false;
        self.set_off_center(false);

        self.intent = poi.map(|p| CameraIntent {
            poi: p.clone(),
            generation: self.generation,
        });

        if let Some(intent) = &self.intent {
            debug!(
                "[Camera] Targeting '{}' (generation {})",
                intent.poi.id, intent.generation
            );
        }
        self.ease(surface);
    }

    /// Ease back onto the current target. The intent is unchanged.
    pub fn recenter<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        self.ease(surface);
    }

    fn ease<S: MapSurface + ?Sized>(&self, surface: &mut S) {
        if !self.attached {
            return;
        }
        if let Some(intent) = &self.intent {
            surface.ease_to(EaseCommand {
                center: intent.poi.position(),
                zoom: self.config.target_zoom,
                duration_ms: self.config.ease_duration_ms,
                token: intent.generation,
            });
        }
    }

    /// Feed a surface event. Events unrelated to the camera are ignored.
    pub fn handle_event(&mut self, event: &SurfaceEvent) {
        if !self.attached {
            return;
        }
        match event {
            SurfaceEvent::EaseEnd { token } => self.handle_ease_end(*token),
            SurfaceEvent::MoveEnd { view } | SurfaceEvent::ZoomEnd { view } => {
                self.handle_camera_moved(view)
            }
            _ => {}
        }
    }

    fn handle_ease_end(&mut self, token: u64) {
        match &self.intent {
            Some(intent) if intent.generation == token => {
                if !self.initial_settled {
                    debug!("[Camera] Settled on '{}'", intent.poi.id);
                }
                self.initial_settled = true;
            }
            _ => {
                debug!(
                    "[Camera] Ignoring stale ease completion (token {}, current {})",
                    token, self.generation
                );
            }
        }
    }

    fn handle_camera_moved(&mut self, view: &CameraView) {
        if !self.initial_settled {
            return;
        }
        let Some(intent) = &self.intent else {
            return;
        };

        let drift_m = planar_distance_meters(&view.center, &intent.poi.position());
        let zoom_drift = (view.zoom - self.config.target_zoom).abs();
        let off_center = drift_m > self.config.off_center_distance_m
            || zoom_drift > self.config.off_center_zoom_delta;

        self.set_off_center(off_center);
    }

    fn set_off_center(&mut self, off_center: bool) {
        self.off_center = off_center;
        self.view.update(|s| s.camera_off_center = off_center);
    }

    /// Stop reacting to surface events (view unmount).
    pub fn detach(&mut self) {
        self.attached = false;
        self.intent = None;
        self.initial_settled = false;
        self.set_off_center(false);
    }

    pub fn intent(&self) -> Option<&CameraIntent> {
        self.intent.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the ease for the current target has completed.
    pub fn initial_settled(&self) -> bool {
        self.initial_settled
    }

    /// Whether the recenter affordance should be shown.
    pub fn off_center(&self) -> bool {
        self.off_center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::headless::HeadlessSurface;
    use crate::GpsPoint;

    fn poi(id: &str, latitude: f64, longitude: f64) -> Poi {
        Poi {
            id: id.to_string(),
            name: id.to_string(),
            latitude,
            longitude,
            elevation: 1000.0,
            region: "Cairngorms".to_string(),
            slug: id.to_string(),
        }
    }

    fn controller() -> (CameraController, ViewState) {
        let view = ViewState::new();
        (CameraController::new(CameraConfig::default(), view.clone()), view)
    }

    fn view_at(latitude: f64, longitude: f64, zoom: f64) -> CameraView {
        CameraView {
            center: GpsPoint::new(latitude, longitude),
            zoom,
        }
    }

    #[test]
    fn test_set_target_eases_with_config() {
        let (mut camera, _) = controller();
        let mut surface = HeadlessSurface::new();
        let target = poi("cairn-gorm", 57.1170, -3.6440);

        camera.set_target(&mut surface, Some(&target));

        let ease = surface.last_ease().unwrap();
        assert_eq!(ease.center, target.position());
        assert_eq!(ease.zoom, 13.0);
        assert_eq!(ease.duration_ms, 1200);
        assert!(!camera.initial_settled());
    }

    #[test]
    fn test_settles_only_on_completion_event() {
        let (mut camera, _) = controller();
        let mut surface = HeadlessSurface::new();
        camera.set_target(&mut surface, Some(&poi("p", 57.0, -3.0)));

        // Movement during the ease is not evaluated
        camera.handle_event(&SurfaceEvent::MoveEnd {
            view: view_at(58.0, -3.0, 13.0),
        });
        assert!(!camera.off_center());

        let token = surface.last_ease().unwrap().token;
        camera.handle_event(&SurfaceEvent::EaseEnd { token });
        assert!(camera.initial_settled());
    }

    #[test]
    fn test_stale_completion_ignored() {
        let (mut camera, _) = controller();
        let mut surface = HeadlessSurface::new();

        camera.set_target(&mut surface, Some(&poi("p", 57.0, -3.0)));
        let stale = surface.last_ease().unwrap().token;
        camera.set_target(&mut surface, Some(&poi("q", 56.5, -4.0)));

        camera.handle_event(&SurfaceEvent::EaseEnd { token: stale });
        assert!(!camera.initial_settled());
        assert_eq!(camera.intent().unwrap().poi.id, "q");

        let current = surface.last_ease().unwrap().token;
        camera.handle_event(&SurfaceEvent::EaseEnd { token: current });
        assert!(camera.initial_settled());
    }

    #[test]
    fn test_rapid_retargeting_uses_generations() {
        let (mut camera, _) = controller();
        let mut surface = HeadlessSurface::new();
        let p = poi("p", 57.0, -3.0);

        camera.set_target(&mut surface, Some(&p));
        camera.set_target(&mut surface, Some(&p));

        let first = surface.eases[0].token;
        camera.handle_event(&SurfaceEvent::EaseEnd { token: first });
        assert!(!camera.initial_settled());
        assert_eq!(camera.generation(), 2);
    }

    #[test]
    fn test_off_center_thresholds() {
        let (mut camera, view) = controller();
        let mut surface = HeadlessSurface::new();
        let target = poi("p", 57.0, -3.0);
        camera.set_target(&mut surface, Some(&target));
        let token = surface.last_ease().unwrap().token;
        camera.handle_event(&SurfaceEvent::EaseEnd { token });

        camera.handle_event(&SurfaceEvent::MoveEnd {
            view: view_at(57.0, -3.0, 13.0),
        });
        assert!(!camera.off_center());

        // ~111 m north
        camera.handle_event(&SurfaceEvent::MoveEnd {
            view: view_at(57.001, -3.0, 13.0),
        });
        assert!(camera.off_center());
        assert!(view.snapshot().camera_off_center);

        // ~11 m is within the threshold
        camera.handle_event(&SurfaceEvent::MoveEnd {
            view: view_at(57.0001, -3.0, 13.0),
        });
        assert!(!camera.off_center());

        camera.handle_event(&SurfaceEvent::ZoomEnd {
            view: view_at(57.0, -3.0, 14.0),
        });
        assert!(camera.off_center());
    }

    #[test]
    fn test_recenter_keeps_intent() {
        let (mut camera, _) = controller();
        let mut surface = HeadlessSurface::new();
        camera.set_target(&mut surface, Some(&poi("p", 57.0, -3.0)));
        let generation = camera.generation();

        camera.recenter(&mut surface);

        assert_eq!(surface.eases.len(), 2);
        assert_eq!(surface.eases[1].token, generation);
        assert_eq!(camera.generation(), generation);
    }

    #[test]
    fn test_new_target_resets_off_center() {
        let (mut camera, view) = controller();
        let mut surface = HeadlessSurface::new();
        camera.set_target(&mut surface, Some(&poi("p", 57.0, -3.0)));
        let token = surface.last_ease().unwrap().token;
        camera.handle_event(&SurfaceEvent::EaseEnd { token });
        camera.handle_event(&SurfaceEvent::MoveEnd {
            view: view_at(57.5, -3.0, 13.0),
        });
        assert!(camera.off_center());

        camera.set_target(&mut surface, Some(&poi("q", 56.0, -4.0)));
        assert!(!camera.off_center());
        assert!(!camera.initial_settled());
        assert!(!view.snapshot().camera_off_center);
    }

    #[test]
    fn test_clear_target_and_detach() {
        let (mut camera, _) = controller();
        let mut surface = HeadlessSurface::new();
        camera.set_target(&mut surface, None);
        assert!(surface.eases.is_empty());
        assert!(camera.intent().is_none());

        camera.set_target(&mut surface, Some(&poi("p", 57.0, -3.0)));
        let token = surface.last_ease().unwrap().token;
        camera.detach();
        camera.handle_event(&SurfaceEvent::EaseEnd { token });
        assert!(!camera.initial_settled());

        camera.recenter(&mut surface);
        assert_eq!(surface.eases.len(), 1);
    }

    #[test]
    fn test_detach_clears_shared_off_center() {
        let (mut camera, view) = controller();
        let mut surface = HeadlessSurface::new();
        camera.set_target(&mut surface, Some(&poi("p", 57.0, -3.0)));
        let token = surface.last_ease().unwrap().token;
        camera.handle_event(&SurfaceEvent::EaseEnd { token });
        camera.handle_event(&SurfaceEvent::MoveEnd {
            view: view_at(57.5, -3.0, 13.0),
        });
        assert!(view.snapshot().camera_off_center);

        camera.detach();

        assert!(!camera.off_center());
        assert!(!view.snapshot().camera_off_center);
    }
}
