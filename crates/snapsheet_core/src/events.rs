//! Event dispatch system
//!
//! Host input (mouse, touch, keyboard, viewport resize) arrives as [`Event`]s and is
//! routed to listeners registered either on a specific surface or on the whole
//! document. The dispatcher is single-threaded and re-entrant: a handler may add or
//! remove listeners while an event is being dispatched.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

/// Event type identifier
pub type EventType = u32;

/// Common event types
pub mod event_types {
    use super::EventType;

    /// Mouse button pressed
    pub const POINTER_DOWN: EventType = 1;
    /// Mouse button released
    pub const POINTER_UP: EventType = 2;
    /// Mouse moved
    pub const POINTER_MOVE: EventType = 3;
    pub const TOUCH_START: EventType = 4;
    pub const TOUCH_END: EventType = 5;
    pub const TOUCH_MOVE: EventType = 6;
    pub const KEY_DOWN: EventType = 20;
    /// Viewport size changed
    pub const RESIZE: EventType = 40;
}

/// Opaque handle for a host surface (panel, drag handle, ...)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Where a pointer event came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerSource {
    #[default]
    Mouse,
    Touch,
}

/// A UI event with associated data
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    /// Surface the event is addressed to, `None` for document-level events
    pub target: Option<SurfaceId>,
    pub data: EventData,
    /// Host timestamp in milliseconds
    pub timestamp: u64,
    pub propagation_stopped: bool,
    pub default_prevented: bool,
    /// Set by the dispatcher while a passive listener runs
    passive: bool,
}

/// Event-specific data
#[derive(Clone, Debug)]
pub enum EventData {
    Pointer {
        x: f32,
        y: f32,
        button: u8,
        pressure: f32,
        source: PointerSource,
    },
    Key {
        /// Virtual key code (use KeyCode constants)
        key: KeyCode,
        /// Whether this is a repeat event
        repeat: bool,
    },
    Resize {
        width: u32,
        height: u32,
    },
    None,
}

/// Virtual key codes (platform-agnostic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);

    // Arrow keys
    pub const UP: KeyCode = KeyCode(0x26);
    pub const DOWN: KeyCode = KeyCode(0x28);

    // Unknown/unmapped key
    pub const UNKNOWN: KeyCode = KeyCode(0);

    /// Map a DOM-style key name (`"Escape"`, `"ArrowUp"`, `" "`) to a key code
    pub fn from_name(name: &str) -> KeyCode {
        match name {
            "Enter" => KeyCode::ENTER,
            "Escape" | "Esc" => KeyCode::ESCAPE,
            " " | "Space" | "Spacebar" => KeyCode::SPACE,
            "ArrowUp" | "Up" => KeyCode::UP,
            "ArrowDown" | "Down" => KeyCode::DOWN,
            _ => KeyCode::UNKNOWN,
        }
    }
}

impl Event {
    /// Create an event with no payload
    pub fn new(event_type: EventType, target: Option<SurfaceId>, timestamp: u64) -> Self {
        Self {
            event_type,
            target,
            data: EventData::None,
            timestamp,
            propagation_stopped: false,
            default_prevented: false,
            passive: false,
        }
    }

    /// Mouse or touch event at vertical position `y`
    ///
    /// The event type is derived from `source`: mouse events use the
    /// `POINTER_*` family, touch events the `TOUCH_*` family.
    pub fn pointer(
        phase: PointerPhase,
        source: PointerSource,
        target: Option<SurfaceId>,
        x: f32,
        y: f32,
        timestamp: u64,
    ) -> Self {
        use event_types::*;
        let event_type = match (source, phase) {
            (PointerSource::Mouse, PointerPhase::Down) => POINTER_DOWN,
            (PointerSource::Mouse, PointerPhase::Move) => POINTER_MOVE,
            (PointerSource::Mouse, PointerPhase::Up) => POINTER_UP,
            (PointerSource::Touch, PointerPhase::Down) => TOUCH_START,
            (PointerSource::Touch, PointerPhase::Move) => TOUCH_MOVE,
            (PointerSource::Touch, PointerPhase::Up) => TOUCH_END,
        };
        Self {
            data: EventData::Pointer {
                x,
                y,
                button: 0,
                pressure: if source == PointerSource::Touch { 1.0 } else { 0.0 },
                source,
            },
            ..Self::new(event_type, target, timestamp)
        }
    }

    /// Key press addressed to `target` (the focused surface, if any)
    pub fn key_down(target: Option<SurfaceId>, key: KeyCode, timestamp: u64) -> Self {
        Self {
            data: EventData::Key { key, repeat: false },
            ..Self::new(event_types::KEY_DOWN, target, timestamp)
        }
    }

    /// Viewport resize, always document-level
    pub fn resize(width: u32, height: u32, timestamp: u64) -> Self {
        Self {
            data: EventData::Resize { width, height },
            ..Self::new(event_types::RESIZE, None, timestamp)
        }
    }

    /// Vertical pointer position, if this is a pointer event
    pub fn pointer_y(&self) -> Option<f32> {
        match self.data {
            EventData::Pointer { y, .. } => Some(y),
            _ => None,
        }
    }

    /// Pointer source, if this is a pointer event
    pub fn pointer_source(&self) -> Option<PointerSource> {
        match self.data {
            EventData::Pointer { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<KeyCode> {
        match self.data {
            EventData::Key { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Suppress the host's default action for this event
    ///
    /// Has no effect while a passive listener is handling the event.
    pub fn prevent_default(&mut self) {
        if self.passive {
            tracing::trace!(
                event_type = self.event_type,
                "prevent_default ignored in passive listener"
            );
            return;
        }
        self.default_prevented = true;
    }
}

/// Phase of a pointer interaction, independent of input source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

new_key_type! {
    /// Identifier of a registered listener
    pub struct ListenerId;
}

/// Scope a listener is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// Only events addressed to this surface
    Surface(SurfaceId),
    /// Every event of the registered type
    Document,
}

/// Listener registration options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Passive listeners cannot prevent the default action
    pub passive: bool,
}

impl ListenerOptions {
    pub const ACTIVE: ListenerOptions = ListenerOptions { passive: false };
    pub const PASSIVE: ListenerOptions = ListenerOptions { passive: true };
}

/// Event handler function type
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

struct Listener {
    target: ListenerTarget,
    event_type: EventType,
    options: ListenerOptions,
    handler: EventHandler,
}

#[derive(Default)]
struct DispatcherInner {
    listeners: SlotMap<ListenerId, Listener>,
    index: FxHashMap<(ListenerTarget, EventType), SmallVec<[ListenerId; 4]>>,
}

impl DispatcherInner {
    fn remove(&mut self, id: ListenerId) -> bool {
        let Some(listener) = self.listeners.remove(id) else {
            return false;
        };
        let key = (listener.target, listener.event_type);
        if let Some(ids) = self.index.get_mut(&key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.index.remove(&key);
            }
        }
        true
    }
}

/// Dispatches events to registered handlers
///
/// Cloning yields another handle to the same listener registry.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Rc<RefCell<DispatcherInner>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler for a target and event type
    pub fn listen<F>(
        &self,
        target: ListenerTarget,
        event_type: EventType,
        options: ListenerOptions,
        handler: F,
    ) -> ListenerId
    where
        F: Fn(&mut Event) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.listeners.insert(Listener {
            target,
            event_type,
            options,
            handler: Rc::new(handler),
        });
        inner.index.entry((target, event_type)).or_default().push(id);
        id
    }

    /// Register a handler that is removed when the returned guard is dropped
    pub fn subscribe<F>(
        &self,
        target: ListenerTarget,
        event_type: EventType,
        options: ListenerOptions,
        handler: F,
    ) -> Subscription
    where
        F: Fn(&mut Event) + 'static,
    {
        let id = self.listen(target, event_type, options, handler);
        Subscription {
            dispatcher: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().remove(id)
    }

    /// Total number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Dispatch an event to all matching handlers
    ///
    /// Surface listeners run before document listeners, each group in
    /// registration order. Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &mut Event) -> usize {
        let queued: SmallVec<[ListenerId; 8]> = {
            let inner = self.inner.borrow();
            let surface = event
                .target
                .and_then(|id| inner.index.get(&(ListenerTarget::Surface(id), event.event_type)));
            let document = inner
                .index
                .get(&(ListenerTarget::Document, event.event_type));
            surface
                .into_iter()
                .chain(document)
                .flat_map(|ids| ids.iter().copied())
                .collect()
        };

        let mut invoked = 0;
        for id in queued {
            if event.propagation_stopped {
                break;
            }
            // A previous handler may have removed this listener
            let Some((handler, options)) = self
                .inner
                .borrow()
                .listeners
                .get(id)
                .map(|l| (l.handler.clone(), l.options))
            else {
                continue;
            };
            event.passive = options.passive;
            handler(event);
            event.passive = false;
            invoked += 1;
        }
        invoked
    }
}

/// RAII guard for a listener registered with [`EventDispatcher::subscribe`]
pub struct Subscription {
    dispatcher: Weak<RefCell<DispatcherInner>>,
    id: ListenerId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.dispatcher.upgrade() {
            inner.borrow_mut().remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const HANDLE: SurfaceId = SurfaceId(7);
    const OTHER: SurfaceId = SurfaceId(8);

    fn mouse_down(target: Option<SurfaceId>) -> Event {
        Event::pointer(PointerPhase::Down, PointerSource::Mouse, target, 0.0, 10.0, 0)
    }

    #[test]
    fn test_surface_listener_only_sees_its_target() {
        let dispatcher = EventDispatcher::new();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        dispatcher.listen(
            ListenerTarget::Surface(HANDLE),
            event_types::POINTER_DOWN,
            ListenerOptions::ACTIVE,
            move |_| hits_clone.set(hits_clone.get() + 1),
        );

        dispatcher.dispatch(&mut mouse_down(Some(OTHER)));
        dispatcher.dispatch(&mut mouse_down(None));
        assert_eq!(hits.get(), 0);

        dispatcher.dispatch(&mut mouse_down(Some(HANDLE)));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_document_listener_sees_everything() {
        let dispatcher = EventDispatcher::new();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        dispatcher.listen(
            ListenerTarget::Document,
            event_types::POINTER_DOWN,
            ListenerOptions::ACTIVE,
            move |_| hits_clone.set(hits_clone.get() + 1),
        );

        dispatcher.dispatch(&mut mouse_down(Some(OTHER)));
        dispatcher.dispatch(&mut mouse_down(None));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_surface_before_document() {
        let dispatcher = EventDispatcher::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let doc_order = order.clone();
        dispatcher.listen(
            ListenerTarget::Document,
            event_types::POINTER_DOWN,
            ListenerOptions::ACTIVE,
            move |_| doc_order.borrow_mut().push("document"),
        );
        let surface_order = order.clone();
        dispatcher.listen(
            ListenerTarget::Surface(HANDLE),
            event_types::POINTER_DOWN,
            ListenerOptions::ACTIVE,
            move |_| surface_order.borrow_mut().push("surface"),
        );

        dispatcher.dispatch(&mut mouse_down(Some(HANDLE)));
        assert_eq!(*order.borrow(), vec!["surface", "document"]);
    }

    #[test]
    fn test_passive_listener_cannot_prevent_default() {
        let dispatcher = EventDispatcher::new();
        dispatcher.listen(
            ListenerTarget::Document,
            event_types::TOUCH_MOVE,
            ListenerOptions::PASSIVE,
            |event| event.prevent_default(),
        );
        let mut event = Event::pointer(PointerPhase::Move, PointerSource::Touch, None, 0.0, 1.0, 0);
        dispatcher.dispatch(&mut event);
        assert!(!event.default_prevented);

        dispatcher.listen(
            ListenerTarget::Document,
            event_types::TOUCH_MOVE,
            ListenerOptions::ACTIVE,
            |event| event.prevent_default(),
        );
        dispatcher.dispatch(&mut event);
        assert!(event.default_prevented);
    }

    #[test]
    fn test_handler_can_remove_later_listener() {
        let dispatcher = EventDispatcher::new();
        let second_ran = Rc::new(Cell::new(false));
        let victim = Rc::new(Cell::new(None::<ListenerId>));

        let remover = dispatcher.clone();
        let victim_clone = victim.clone();
        dispatcher.listen(
            ListenerTarget::Document,
            event_types::POINTER_UP,
            ListenerOptions::ACTIVE,
            move |_| {
                if let Some(id) = victim_clone.get() {
                    remover.unlisten(id);
                }
            },
        );
        let second_clone = second_ran.clone();
        victim.set(Some(dispatcher.listen(
            ListenerTarget::Document,
            event_types::POINTER_UP,
            ListenerOptions::ACTIVE,
            move |_| second_clone.set(true),
        )));

        let mut event = Event::pointer(PointerPhase::Up, PointerSource::Mouse, None, 0.0, 0.0, 0);
        assert_eq!(dispatcher.dispatch(&mut event), 1);
        assert!(!second_ran.get());
        assert_eq!(dispatcher.listener_count(), 1);
    }

    #[test]
    fn test_listener_added_during_dispatch_waits_for_next_event() {
        let dispatcher = EventDispatcher::new();
        let late_hits = Rc::new(Cell::new(0));

        let registrar = dispatcher.clone();
        let late_clone = late_hits.clone();
        dispatcher.listen(
            ListenerTarget::Document,
            event_types::POINTER_MOVE,
            ListenerOptions::ACTIVE,
            move |_| {
                let late = late_clone.clone();
                registrar.listen(
                    ListenerTarget::Document,
                    event_types::POINTER_MOVE,
                    ListenerOptions::ACTIVE,
                    move |_| late.set(late.get() + 1),
                );
            },
        );

        let mut event = Event::pointer(PointerPhase::Move, PointerSource::Mouse, None, 0.0, 0.0, 0);
        dispatcher.dispatch(&mut event);
        assert_eq!(late_hits.get(), 0);
        dispatcher.dispatch(&mut event);
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_subscription_unregisters_on_drop() {
        let dispatcher = EventDispatcher::new();
        let subscription = dispatcher.subscribe(
            ListenerTarget::Document,
            event_types::KEY_DOWN,
            ListenerOptions::ACTIVE,
            |_| {},
        );
        assert_eq!(dispatcher.listener_count(), 1);
        drop(subscription);
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn test_stop_propagation() {
        let dispatcher = EventDispatcher::new();
        let hits = Rc::new(Cell::new(0));
        dispatcher.listen(
            ListenerTarget::Surface(HANDLE),
            event_types::KEY_DOWN,
            ListenerOptions::ACTIVE,
            |event| event.stop_propagation(),
        );
        let hits_clone = hits.clone();
        dispatcher.listen(
            ListenerTarget::Document,
            event_types::KEY_DOWN,
            ListenerOptions::ACTIVE,
            move |_| hits_clone.set(hits_clone.get() + 1),
        );

        dispatcher.dispatch(&mut Event::key_down(Some(HANDLE), KeyCode::ENTER, 0));
        assert_eq!(hits.get(), 0);
        dispatcher.dispatch(&mut Event::key_down(None, KeyCode::ENTER, 0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(KeyCode::from_name("Escape"), KeyCode::ESCAPE);
        assert_eq!(KeyCode::from_name("ArrowUp"), KeyCode::UP);
        assert_eq!(KeyCode::from_name(" "), KeyCode::SPACE);
        assert_eq!(KeyCode::from_name("F13"), KeyCode::UNKNOWN);
    }
}
