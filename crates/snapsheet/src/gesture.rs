//! Drag gesture tracking
//!
//! [`GestureTracker`] turns raw pointer and touch events into a drag session
//! with a running vertical velocity estimate:
//!
//! - a press on the drag surface starts a session and fires `on_drag_start`
//! - every move updates the velocity and fires `on_drag` with the raw `y`
//! - release fires `on_drag_end` with the velocity in px/s and the last `y`
//!
//! Move and release listeners are registered on the document only while a
//! session is active, so a drag keeps tracking after the pointer leaves the
//! surface it started on.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use snapsheet_core::events::event_types;
use snapsheet_core::{
    Event, EventDispatcher, EventType, ListenerId, ListenerOptions, ListenerTarget, PointerSource,
    SurfaceId,
};

/// Callbacks fired over the life of a drag
#[derive(Clone, Default)]
pub struct GestureHandlers {
    pub on_drag_start: Option<Rc<dyn Fn()>>,
    /// Raw pointer `y` of every move
    pub on_drag: Option<Rc<dyn Fn(f32)>>,
    /// `(velocity_px_per_s, last_y)`
    pub on_drag_end: Option<Rc<dyn Fn(f32, f32)>>,
}

impl GestureHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_drag_start<F: Fn() + 'static>(mut self, handler: F) -> Self {
        self.on_drag_start = Some(Rc::new(handler));
        self
    }

    pub fn on_drag<F: Fn(f32) + 'static>(mut self, handler: F) -> Self {
        self.on_drag = Some(Rc::new(handler));
        self
    }

    pub fn on_drag_end<F: Fn(f32, f32) + 'static>(mut self, handler: F) -> Self {
        self.on_drag_end = Some(Rc::new(handler));
        self
    }
}

/// Per-drag tracking state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSession {
    pub start_y: f32,
    pub last_y: f32,
    /// Host timestamp (ms) of the last accepted sample
    pub last_timestamp: u64,
    /// Most recent instantaneous velocity in px/ms
    pub velocity: f32,
    pub source: PointerSource,
}

impl GestureSession {
    pub fn begin(y: f32, timestamp: u64, source: PointerSource) -> Self {
        Self {
            start_y: y,
            last_y: y,
            last_timestamp: timestamp,
            velocity: 0.0,
            source,
        }
    }

    /// Record a move sample
    ///
    /// Samples with no elapsed time since the last accepted one leave the
    /// session untouched.
    pub fn sample(&mut self, y: f32, timestamp: u64) {
        let dt = timestamp.saturating_sub(self.last_timestamp);
        if dt > 0 {
            self.velocity = (y - self.last_y) / dt as f32;
            self.last_y = y;
            self.last_timestamp = timestamp;
        }
    }

    /// Velocity in px/s, positive when moving down
    pub fn release_velocity(&self) -> f32 {
        self.velocity * 1000.0
    }

    /// Distance travelled since the press
    pub fn displacement(&self) -> f32 {
        self.last_y - self.start_y
    }
}

struct TrackerInner {
    dispatcher: EventDispatcher,
    surface: Option<SurfaceId>,
    enabled: bool,
    handlers: GestureHandlers,
    session: Option<GestureSession>,
    /// Press listeners on the drag surface
    start_listeners: SmallVec<[ListenerId; 2]>,
    /// Document move/release listeners, present only during a session
    session_listeners: SmallVec<[ListenerId; 4]>,
}

impl TrackerInner {
    fn remove_listeners(&mut self, session_only: bool) {
        for id in self.session_listeners.drain(..) {
            self.dispatcher.unlisten(id);
        }
        if !session_only {
            for id in self.start_listeners.drain(..) {
                self.dispatcher.unlisten(id);
            }
        }
    }
}

/// Tracks drags starting on one surface
///
/// Dropping the tracker removes every listener it registered.
pub struct GestureTracker {
    inner: Rc<RefCell<TrackerInner>>,
}

impl GestureTracker {
    pub fn new(
        dispatcher: &EventDispatcher,
        surface: Option<SurfaceId>,
        handlers: GestureHandlers,
        enabled: bool,
    ) -> Self {
        let tracker = Self {
            inner: Rc::new(RefCell::new(TrackerInner {
                dispatcher: dispatcher.clone(),
                surface,
                enabled,
                handlers,
                session: None,
                start_listeners: SmallVec::new(),
                session_listeners: SmallVec::new(),
            })),
        };
        if enabled {
            Self::attach(&tracker.inner);
        }
        tracker
    }

    /// Enable or disable drag tracking
    ///
    /// Disabling during a drag ends the session as if the pointer were
    /// released, so the owner always sees a matching `on_drag_end`.
    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.enabled == enabled {
                return;
            }
            inner.enabled = enabled;
        }
        tracing::debug!(enabled, "drag tracking toggled");
        if enabled {
            Self::attach(&self.inner);
        } else {
            self.inner.borrow_mut().remove_listeners(false);
            Self::end_session(&self.inner);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    pub fn is_dragging(&self) -> bool {
        self.inner.borrow().session.is_some()
    }

    /// Snapshot of the active session
    pub fn session(&self) -> Option<GestureSession> {
        self.inner.borrow().session
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.inner.borrow().surface
    }

    /// Remove every listener and drop any session without firing callbacks
    pub fn detach(&self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.remove_listeners(false);
            inner.session = None;
        }
    }

    fn attach(this: &Rc<RefCell<TrackerInner>>) {
        let (dispatcher, surface) = {
            let inner = this.borrow();
            if !inner.start_listeners.is_empty() {
                return;
            }
            let Some(surface) = inner.surface else {
                tracing::debug!("no drag surface, drag tracking inactive");
                return;
            };
            (inner.dispatcher.clone(), surface)
        };

        let ids: SmallVec<[ListenerId; 2]> = [event_types::TOUCH_START, event_types::POINTER_DOWN]
            .into_iter()
            .map(|event_type| {
                listen(
                    &dispatcher,
                    ListenerTarget::Surface(surface),
                    event_type,
                    Rc::downgrade(this),
                    Self::on_press,
                )
            })
            .collect();
        this.borrow_mut().start_listeners = ids;
    }

    fn on_press(this: &Rc<RefCell<TrackerInner>>, event: &mut Event) {
        let on_drag_start = {
            let mut inner = this.borrow_mut();
            if !inner.enabled || inner.session.is_some() {
                return;
            }
            let (Some(y), Some(source)) = (event.pointer_y(), event.pointer_source()) else {
                return;
            };
            if source == PointerSource::Mouse {
                // Keep the host from starting a text selection
                event.prevent_default();
            }
            inner.session = Some(GestureSession::begin(y, event.timestamp, source));

            let dispatcher = inner.dispatcher.clone();
            let weak = Rc::downgrade(this);
            inner.session_listeners = [
                (event_types::TOUCH_MOVE, Self::on_move as Handler),
                (event_types::POINTER_MOVE, Self::on_move),
                (event_types::TOUCH_END, Self::on_release),
                (event_types::POINTER_UP, Self::on_release),
            ]
            .into_iter()
            .map(|(event_type, handler)| {
                listen(
                    &dispatcher,
                    ListenerTarget::Document,
                    event_type,
                    weak.clone(),
                    handler,
                )
            })
            .collect();

            tracing::debug!(y, ?source, "drag start");
            inner.handlers.on_drag_start.clone()
        };
        if let Some(handler) = on_drag_start {
            handler();
        }
    }

    fn on_move(this: &Rc<RefCell<TrackerInner>>, event: &mut Event) {
        let (y, on_drag) = {
            let mut inner = this.borrow_mut();
            let Some(y) = event.pointer_y() else {
                return;
            };
            let Some(session) = inner.session.as_mut() else {
                return;
            };
            session.sample(y, event.timestamp);
            (y, inner.handlers.on_drag.clone())
        };
        if let Some(handler) = on_drag {
            handler(y);
        }
    }

    fn on_release(this: &Rc<RefCell<TrackerInner>>, _event: &mut Event) {
        Self::end_session(this);
    }

    fn end_session(this: &Rc<RefCell<TrackerInner>>) {
        let (session, on_drag_end) = {
            let mut inner = this.borrow_mut();
            let Some(session) = inner.session.take() else {
                return;
            };
            inner.remove_listeners(true);
            (session, inner.handlers.on_drag_end.clone())
        };
        let velocity = session.release_velocity();
        tracing::debug!(
            velocity,
            y = session.last_y,
            displacement = session.displacement(),
            "drag end"
        );
        if let Some(handler) = on_drag_end {
            handler(velocity, session.last_y);
        }
    }
}

impl Drop for GestureTracker {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for GestureTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("GestureTracker")
            .field("surface", &inner.surface)
            .field("enabled", &inner.enabled)
            .field("session", &inner.session)
            .finish()
    }
}

type Handler = fn(&Rc<RefCell<TrackerInner>>, &mut Event);

/// Register a non-passive listener that forwards to `handler` while the tracker lives
fn listen(
    dispatcher: &EventDispatcher,
    target: ListenerTarget,
    event_type: EventType,
    tracker: Weak<RefCell<TrackerInner>>,
    handler: Handler,
) -> ListenerId {
    dispatcher.listen(target, event_type, ListenerOptions::ACTIVE, move |event| {
        if let Some(strong) = tracker.upgrade() {
            handler(&strong, event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsheet_core::PointerPhase;
    use std::cell::Cell;

    const HANDLE: SurfaceId = SurfaceId(7);

    #[derive(Default)]
    struct Log {
        starts: Cell<u32>,
        moves: RefCell<Vec<f32>>,
        ends: RefCell<Vec<(f32, f32)>>,
    }

    fn tracker(dispatcher: &EventDispatcher, enabled: bool) -> (GestureTracker, Rc<Log>) {
        let log = Rc::new(Log::default());
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let handlers = GestureHandlers::new()
            .on_drag_start(move || a.starts.set(a.starts.get() + 1))
            .on_drag(move |y| b.moves.borrow_mut().push(y))
            .on_drag_end(move |v, y| c.ends.borrow_mut().push((v, y)));
        (
            GestureTracker::new(dispatcher, Some(HANDLE), handlers, enabled),
            log,
        )
    }

    fn send(
        dispatcher: &EventDispatcher,
        phase: PointerPhase,
        source: PointerSource,
        y: f32,
        t: u64,
    ) -> Event {
        let target = match phase {
            PointerPhase::Down => Some(HANDLE),
            _ => None,
        };
        let mut event = Event::pointer(phase, source, target, 0.0, y, t);
        dispatcher.dispatch(&mut event);
        event
    }

    #[test]
    fn test_session_sample_velocity() {
        let mut session = GestureSession::begin(100.0, 0, PointerSource::Touch);
        session.sample(130.0, 100);

        assert_eq!(session.velocity, 0.3);
        assert_eq!(session.release_velocity(), 300.0);
        assert_eq!(session.displacement(), 30.0);
        assert_eq!(session.last_timestamp, 100);
    }

    #[test]
    fn test_velocity_from_last_sample() {
        let dispatcher = EventDispatcher::new();
        let (tracker, log) = tracker(&dispatcher, true);

        send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 400.0, 0);
        assert!(tracker.is_dragging());
        send(&dispatcher, PointerPhase::Move, PointerSource::Touch, 401.0, 10);
        send(&dispatcher, PointerPhase::Move, PointerSource::Touch, 404.0, 20);
        send(&dispatcher, PointerPhase::Up, PointerSource::Touch, 0.0, 30);

        assert_eq!(log.starts.get(), 1);
        assert_eq!(*log.moves.borrow(), vec![401.0, 404.0]);
        let ends = log.ends.borrow();
        assert_eq!(ends.len(), 1);
        let (velocity, y) = ends[0];
        assert!((velocity - 300.0).abs() < 1e-3, "velocity {velocity}");
        assert_eq!(y, 404.0);
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn test_zero_dt_sample_keeps_previous_velocity() {
        let mut session = GestureSession::begin(100.0, 0, PointerSource::Mouse);
        session.sample(110.0, 10);
        session.sample(500.0, 10);
        assert_eq!(session.velocity, 1.0);
        assert_eq!(session.last_y, 110.0);

        // Out-of-order timestamps are ignored too
        session.sample(90.0, 5);
        assert_eq!(session.last_y, 110.0);
    }

    #[test]
    fn test_move_without_dt_still_reports_position() {
        let dispatcher = EventDispatcher::new();
        let (_tracker, log) = tracker(&dispatcher, true);

        send(&dispatcher, PointerPhase::Down, PointerSource::Mouse, 400.0, 0);
        send(&dispatcher, PointerPhase::Move, PointerSource::Mouse, 420.0, 0);
        assert_eq!(*log.moves.borrow(), vec![420.0]);
    }

    #[test]
    fn test_mouse_press_prevents_default() {
        let dispatcher = EventDispatcher::new();
        let (_tracker, _log) = tracker(&dispatcher, true);

        let mouse = send(&dispatcher, PointerPhase::Down, PointerSource::Mouse, 0.0, 0);
        assert!(mouse.default_prevented);
        send(&dispatcher, PointerPhase::Up, PointerSource::Mouse, 0.0, 1);

        let touch = send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 0.0, 2);
        assert!(!touch.default_prevented);
    }

    #[test]
    fn test_session_listeners_only_during_drag() {
        let dispatcher = EventDispatcher::new();
        let (_tracker, log) = tracker(&dispatcher, true);
        assert_eq!(dispatcher.listener_count(), 2);

        // Moves before a press are not tracked
        send(&dispatcher, PointerPhase::Move, PointerSource::Mouse, 10.0, 0);
        assert!(log.moves.borrow().is_empty());

        send(&dispatcher, PointerPhase::Down, PointerSource::Mouse, 0.0, 1);
        assert_eq!(dispatcher.listener_count(), 6);
        send(&dispatcher, PointerPhase::Up, PointerSource::Mouse, 0.0, 2);
        assert_eq!(dispatcher.listener_count(), 2);
    }

    #[test]
    fn test_press_during_session_is_ignored() {
        let dispatcher = EventDispatcher::new();
        let (_tracker, log) = tracker(&dispatcher, true);

        send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 100.0, 0);
        send(&dispatcher, PointerPhase::Down, PointerSource::Mouse, 200.0, 5);
        assert_eq!(log.starts.get(), 1);
        assert_eq!(dispatcher.listener_count(), 6);
    }

    #[test]
    fn test_disabled_tracker_ignores_press() {
        let dispatcher = EventDispatcher::new();
        let (tracker, log) = tracker(&dispatcher, false);
        assert_eq!(dispatcher.listener_count(), 0);

        send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 100.0, 0);
        assert_eq!(log.starts.get(), 0);

        tracker.set_enabled(true);
        send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 100.0, 0);
        assert_eq!(log.starts.get(), 1);
    }

    #[test]
    fn test_disable_mid_drag_ends_session() {
        let dispatcher = EventDispatcher::new();
        let (tracker, log) = tracker(&dispatcher, true);

        send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 100.0, 0);
        send(&dispatcher, PointerPhase::Move, PointerSource::Touch, 150.0, 10);
        tracker.set_enabled(false);

        assert_eq!(*log.ends.borrow(), vec![(5000.0, 150.0)]);
        assert!(!tracker.is_dragging());
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn test_drop_removes_listeners() {
        let dispatcher = EventDispatcher::new();
        let (tracker, log) = tracker(&dispatcher, true);
        send(&dispatcher, PointerPhase::Down, PointerSource::Touch, 100.0, 0);
        drop(tracker);

        assert_eq!(dispatcher.listener_count(), 0);
        send(&dispatcher, PointerPhase::Up, PointerSource::Touch, 0.0, 10);
        assert!(log.ends.borrow().is_empty());
    }

    #[test]
    fn test_no_surface_registers_nothing() {
        let dispatcher = EventDispatcher::new();
        let tracker = GestureTracker::new(&dispatcher, None, GestureHandlers::new(), true);
        assert_eq!(dispatcher.listener_count(), 0);
        assert!(tracker.is_enabled());
    }
}
