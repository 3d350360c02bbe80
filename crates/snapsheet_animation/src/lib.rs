//! Snapsheet Animation System
//!
//! Spring physics driven by animation frames.
//!
//! # Features
//!
//! - **Spring Physics**: tension/friction springs integrated with bounded sub-steps
//! - **Frame Scheduling**: host-driven, cancellable one-shot frame callbacks
//! - **Integrator**: frame loop with update/complete callbacks and exact settling
//!
//! # Example
//!
//! ```rust
//! use snapsheet_animation::{FrameScheduler, SpringConfig, SpringIntegrator};
//!
//! let scheduler = FrameScheduler::new();
//! let integrator = SpringIntegrator::new(&scheduler, 0.0, SpringConfig::default());
//! integrator.start(120.0, 0.0);
//!
//! let mut now = 0.0;
//! while scheduler.has_pending_frames() {
//!     now += 16.0;
//!     scheduler.tick(now);
//! }
//! assert_eq!(integrator.value(), 120.0);
//! ```

pub mod integrator;
pub mod scheduler;
pub mod spring;

pub use integrator::SpringIntegrator;
pub use scheduler::{FrameId, FrameScheduler};
pub use spring::{Spring, SpringConfig, SpringStep};
