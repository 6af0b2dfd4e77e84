//! Shared view state.
//!
//! Components never hold references to each other. Anything that needs the
//! hovered summit, the navigation target, the camera's off-center flag or
//! the active filter reads it here and subscribes to changes.
//!
//! The engine runs on the UI thread only, so the service is an `Rc` handle
//! over a `RefCell`; cloning the handle shares the state.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::filter::FilterCriteria;
use crate::units::UnitSystem;

/// Everything observable about the current view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
    /// Summit under the pointer (never set on touch devices)
    pub hovered_poi: Option<String>,
    /// Summit matching the active navigation target
    pub active_poi: Option<String>,
    /// Whether the camera has drifted from the targeted summit
    pub camera_off_center: bool,
    pub criteria: FilterCriteria,
    /// Summits the current user has bagged
    pub bagged: HashSet<String>,
    pub units: UnitSystem,
}

/// Handle returned by [`ViewState::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&ViewSnapshot)>;

struct Inner {
    snapshot: ViewSnapshot,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

/// Injectable view-state service.
#[derive(Clone)]
pub struct ViewState {
    inner: Rc<RefCell<Inner>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::with_snapshot(ViewSnapshot::default())
    }

    pub fn with_snapshot(snapshot: ViewSnapshot) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                snapshot,
                listeners: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.inner.borrow().snapshot.clone()
    }

    /// Read one value without cloning the whole snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&ViewSnapshot) -> R) -> R {
        f(&self.inner.borrow().snapshot)
    }

    /// Mutate the state and notify listeners if anything changed.
    ///
    /// Listeners run after the state borrow is released, so they may read or
    /// update the service themselves.
    pub fn update(&self, f: impl FnOnce(&mut ViewSnapshot)) {
        let (changed, snapshot, listeners) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.snapshot.clone();
            f(&mut inner.snapshot);
            if inner.snapshot == before {
                (false, before, Vec::new())
            } else {
                let listeners: Vec<Listener> =
                    inner.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
                (true, inner.snapshot.clone(), listeners)
            }
        };

        if changed {
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }

    /// Register a change listener.
    pub fn subscribe(&self, listener: impl Fn(&ViewSnapshot) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Detach a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
    }

    /// Detach every listener.
    pub fn clear_subscribers(&self) {
        self.inner.borrow_mut().listeners.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_update_notifies_on_change_only() {
        let view = ViewState::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        view.subscribe(move |_| counter.set(counter.get() + 1));

        view.update(|s| s.hovered_poi = Some("ben-nevis".to_string()));
        view.update(|s| s.hovered_poi = Some("ben-nevis".to_string()));

        assert_eq!(calls.get(), 1);
        assert_eq!(view.read(|s| s.hovered_poi.clone()), Some("ben-nevis".to_string()));
    }

    #[test]
    fn test_unsubscribe() {
        let view = ViewState::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = view.subscribe(move |_| counter.set(counter.get() + 1));

        view.unsubscribe(id);
        view.update(|s| s.camera_off_center = true);

        assert_eq!(calls.get(), 0);
        assert_eq!(view.subscriber_count(), 0);
    }

    #[test]
    fn test_listener_may_read_back() {
        let view = ViewState::new();
        let seen = Rc::new(Cell::new(false));
        let (handle, flag) = (view.clone(), Rc::clone(&seen));
        view.subscribe(move |_| flag.set(handle.read(|s| s.camera_off_center)));

        view.update(|s| s.camera_off_center = true);

        assert!(seen.get());
    }

    #[test]
    fn test_clones_share_state() {
        let view = ViewState::new();
        let other = view.clone();
        other.update(|s| s.active_poi = Some("schiehallion".to_string()));
        assert_eq!(view.snapshot().active_poi.as_deref(), Some("schiehallion"));
    }
}
