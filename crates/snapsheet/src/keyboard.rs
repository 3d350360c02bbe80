//! Keyboard control
//!
//! | Key              | Scope    | Action                          |
//! |------------------|----------|---------------------------------|
//! | Escape           | document | close                           |
//! | ArrowUp          | document | one step toward `Full`          |
//! | ArrowDown        | document | one step toward `Closed`        |
//! | Enter / Space    | handle   | cycle, default action prevented |

use smallvec::SmallVec;
use snapsheet_core::events::event_types;
use snapsheet_core::fsm::EventId;
use snapsheet_core::{
    EventDispatcher, KeyCode, ListenerOptions, ListenerTarget, Subscription, SurfaceId,
};

use crate::snap::snap_events;

/// What a key press asks the sheet to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Close,
    StepUp,
    StepDown,
    Cycle,
}

impl KeyAction {
    /// Action for a key pressed anywhere in the document
    pub fn for_document_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ESCAPE => Some(KeyAction::Close),
            KeyCode::UP => Some(KeyAction::StepUp),
            KeyCode::DOWN => Some(KeyAction::StepDown),
            _ => None,
        }
    }

    /// Action for a key pressed while the handle has focus
    pub fn for_handle_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ENTER | KeyCode::SPACE => Some(KeyAction::Cycle),
            _ => None,
        }
    }

    /// Snap point transition event this action drives
    pub fn snap_event(self) -> EventId {
        match self {
            KeyAction::Close => snap_events::CLOSE,
            KeyAction::StepUp => snap_events::STEP_UP,
            KeyAction::StepDown => snap_events::STEP_DOWN,
            KeyAction::Cycle => snap_events::CYCLE,
        }
    }
}

/// Subscribe `on_action` to the sheet's key bindings
///
/// The handle binding is skipped when there is no handle surface.
pub(crate) fn subscribe<F>(
    dispatcher: &EventDispatcher,
    handle: Option<SurfaceId>,
    on_action: F,
) -> SmallVec<[Subscription; 2]>
where
    F: Fn(KeyAction) + Clone + 'static,
{
    let mut subscriptions = SmallVec::new();

    let document_action = on_action.clone();
    subscriptions.push(dispatcher.subscribe(
        ListenerTarget::Document,
        event_types::KEY_DOWN,
        ListenerOptions::ACTIVE,
        move |event| {
            if let Some(action) = event.key().and_then(KeyAction::for_document_key) {
                document_action(action);
            }
        },
    ));

    if let Some(handle) = handle {
        subscriptions.push(dispatcher.subscribe(
            ListenerTarget::Surface(handle),
            event_types::KEY_DOWN,
            ListenerOptions::ACTIVE,
            move |event| {
                if let Some(action) = event.key().and_then(KeyAction::for_handle_key) {
                    // Space would otherwise scroll the page
                    event.prevent_default();
                    on_action(action);
                }
            },
        ));
    }

    subscriptions
}
