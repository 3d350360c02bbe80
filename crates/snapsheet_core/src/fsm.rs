//! Discrete state transitions
//!
//! Widgets describe their discrete states as plain enums and map events to
//! transitions by implementing [`StateTransitions`]. Returning `None` from
//! [`StateTransitions::on_event`] means the event does not apply in the current
//! state, which is also how boundaries are expressed (a "next" event on the last
//! state simply has no transition).

use std::fmt::Debug;
use std::hash::Hash;

/// Identifier for a transition event
pub type EventId = u32;

/// Trait for user-defined state types that can handle event transitions
///
/// # Example
///
/// ```
/// use snapsheet_core::fsm::{EventId, StateTransitions};
///
/// const TOGGLE: EventId = 1;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Light {
///     Off,
///     On,
/// }
///
/// impl StateTransitions for Light {
///     fn on_event(&self, event: EventId) -> Option<Self> {
///         match (self, event) {
///             (Light::Off, TOGGLE) => Some(Light::On),
///             (Light::On, TOGGLE) => Some(Light::Off),
///             _ => None,
///         }
///     }
/// }
///
/// assert_eq!(Light::Off.on_event(TOGGLE), Some(Light::On));
/// assert_eq!(Light::Off.on_event(99), None);
/// ```
pub trait StateTransitions: Clone + Copy + PartialEq + Eq + Hash + Debug + 'static {
    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: EventId) -> Option<Self>;

    /// Apply an event, staying in the current state when it has no transition
    fn apply(&self, event: EventId) -> Self {
        self.on_event(event).unwrap_or(*self)
    }
}
