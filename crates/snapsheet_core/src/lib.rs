//! Snapsheet Core Runtime
//!
//! This crate provides the foundational primitives shared by the Snapsheet crates:
//!
//! - **Event Dispatch**: Mouse, touch, keyboard and resize events routed to
//!   surface-scoped or document-scoped listeners
//! - **State Transitions**: Event-driven transitions for discrete widget states
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use snapsheet_core::events::{event_types, ListenerOptions, ListenerTarget};
//! use snapsheet_core::{Event, EventDispatcher, KeyCode};
//!
//! let dispatcher = EventDispatcher::new();
//! let escapes = Rc::new(Cell::new(0));
//!
//! let counter = escapes.clone();
//! let _subscription = dispatcher.subscribe(
//!     ListenerTarget::Document,
//!     event_types::KEY_DOWN,
//!     ListenerOptions::ACTIVE,
//!     move |event| {
//!         if event.key() == Some(KeyCode::ESCAPE) {
//!             counter.set(counter.get() + 1);
//!         }
//!     },
//! );
//!
//! dispatcher.dispatch(&mut Event::key_down(None, KeyCode::ESCAPE, 0));
//! assert_eq!(escapes.get(), 1);
//! ```

pub mod events;
pub mod fsm;

pub use events::{
    Event, EventData, EventDispatcher, EventType, KeyCode, ListenerId, ListenerOptions,
    ListenerTarget, PointerPhase, PointerSource, Subscription, SurfaceId,
};
pub use fsm::{EventId, StateTransitions};
