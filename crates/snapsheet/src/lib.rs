//! Snapsheet
//!
//! A draggable bottom sheet that rests at one of three snap points and moves
//! between them with spring physics.
//!
//! - [`snap`]: snap points, the pixel table, and release resolution
//! - [`gesture`]: pointer/touch drag tracking with velocity estimation
//! - [`sheet`]: the coordinator tying gestures, keyboard, and the spring together
//! - [`surface`]: host surfaces and the offset sink
//!
//! Everything runs on one thread. Time only advances when the host calls
//! [`FrameScheduler::tick`](snapsheet_animation::FrameScheduler::tick), and input only
//! arrives through [`EventDispatcher::dispatch`](snapsheet_core::EventDispatcher::dispatch).

pub mod config;
pub mod error;
pub mod gesture;
pub mod keyboard;
pub mod sheet;
pub mod snap;
pub mod surface;

pub use config::SheetConfig;
pub use error::{ConfigError, ParseSnapPointError};
pub use gesture::{GestureHandlers, GestureSession, GestureTracker};
pub use keyboard::KeyAction;
pub use sheet::{BottomSheet, BottomSheetBuilder, SnapChangeCallback, BACKDROP_MAX_OPACITY};
pub use snap::{
    resolve_release, SnapPoint, SnapTable, DRAG_BOUND_FRACTION, SNAP_POINT_PERCENTAGES,
    VELOCITY_THRESHOLD,
};
pub use surface::{NullRenderer, RecordingRenderer, SheetRenderer, SheetSurfaces};

// Re-exported so hosts need only this crate
pub use snapsheet_animation::{FrameScheduler, SpringConfig};
pub use snapsheet_core::{Event, EventDispatcher, KeyCode, PointerPhase, PointerSource, SurfaceId};
