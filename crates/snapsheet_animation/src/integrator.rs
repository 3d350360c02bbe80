//! Frame-driven spring integrator
//!
//! Drives a [`Spring`] from [`FrameScheduler`] frames and reports every new value
//! through `on_update`, then `on_complete` once the spring comes to rest. At most
//! one frame callback is outstanding per integrator: `start` cancels the pending
//! frame before scheduling a new one.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scheduler::{FrameId, FrameScheduler};
use crate::spring::{Spring, SpringConfig, SpringStep, MAX_FRAME_DT};

/// Callback receiving each animated value
pub type UpdateCallback = Rc<dyn Fn(f32)>;
/// Callback invoked when the spring comes to rest
pub type CompleteCallback = Rc<dyn Fn()>;

struct IntegratorInner {
    spring: Spring,
    scheduler: FrameScheduler,
    /// Outstanding frame callback, if any
    frame: Option<FrameId>,
    /// Timestamp of the previous frame; `None` until the first frame after `start`
    last_time: Option<f64>,
    animating: bool,
    on_update: Option<UpdateCallback>,
    on_complete: Option<CompleteCallback>,
}

impl IntegratorInner {
    fn cancel_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.scheduler.cancel_frame(frame);
        }
    }
}

/// Animates a scalar toward a target, one scheduler frame at a time
pub struct SpringIntegrator {
    inner: Rc<RefCell<IntegratorInner>>,
}

impl SpringIntegrator {
    pub fn new(scheduler: &FrameScheduler, initial_value: f32, config: SpringConfig) -> Self {
        if !config.is_convergent() {
            tracing::warn!(?config, "spring configuration may never come to rest");
        }
        Self {
            inner: Rc::new(RefCell::new(IntegratorInner {
                spring: Spring::new(config, initial_value),
                scheduler: scheduler.clone(),
                frame: None,
                last_time: None,
                animating: false,
                on_update: None,
                on_complete: None,
            })),
        }
    }

    /// Set the per-frame value callback
    pub fn on_update<F: Fn(f32) + 'static>(self, callback: F) -> Self {
        self.inner.borrow_mut().on_update = Some(Rc::new(callback));
        self
    }

    /// Set the rest callback
    pub fn on_complete<F: Fn() + 'static>(self, callback: F) -> Self {
        self.inner.borrow_mut().on_complete = Some(Rc::new(callback));
        self
    }

    /// Begin animating toward `target`, or retarget a running animation
    pub fn start(&self, target: f32, initial_velocity: f32) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.cancel_frame();
            inner.spring.retarget(target, initial_velocity);
            inner.animating = true;
            inner.last_time = None;
            tracing::trace!(
                from = inner.spring.value(),
                target,
                initial_velocity,
                "spring start"
            );
        }
        Self::schedule_frame(&self.inner);
    }

    /// Halt the animation, leaving the last emitted value in place
    pub fn stop(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.animating {
            tracing::trace!(value = inner.spring.value(), "spring stop");
        }
        inner.animating = false;
        inner.cancel_frame();
    }

    /// Move the value without animating or notifying
    pub fn set_value(&self, value: f32) {
        self.inner.borrow_mut().spring.set_value(value);
    }

    pub fn set_config(&self, config: SpringConfig) {
        self.inner.borrow_mut().spring.set_config(config);
    }

    pub fn config(&self) -> SpringConfig {
        self.inner.borrow().spring.config()
    }

    pub fn value(&self) -> f32 {
        self.inner.borrow().spring.value()
    }

    pub fn target(&self) -> f32 {
        self.inner.borrow().spring.target()
    }

    pub fn velocity(&self) -> f32 {
        self.inner.borrow().spring.velocity()
    }

    pub fn is_animating(&self) -> bool {
        self.inner.borrow().animating
    }

    fn schedule_frame(this: &Rc<RefCell<IntegratorInner>>) {
        let scheduler = {
            let inner = this.borrow();
            if inner.frame.is_some() {
                return;
            }
            inner.scheduler.clone()
        };
        let weak = Rc::downgrade(this);
        let frame = scheduler.request_frame(move |timestamp| {
            if let Some(strong) = weak.upgrade() {
                Self::on_frame(&strong, timestamp);
            }
        });
        this.borrow_mut().frame = Some(frame);
    }

    fn on_frame(this: &Rc<RefCell<IntegratorInner>>, timestamp: f64) {
        let (value, settled, on_update, on_complete) = {
            let mut inner = this.borrow_mut();
            inner.frame = None;
            if !inner.animating {
                return;
            }

            let dt = match inner.last_time {
                Some(last) => ((timestamp - last) / 1000.0).clamp(0.0, MAX_FRAME_DT as f64) as f32,
                None => 0.0,
            };
            inner.last_time = Some(timestamp);

            if dt == 0.0 {
                drop(inner);
                Self::schedule_frame(this);
                return;
            }

            let settled = inner.spring.step(dt) == SpringStep::Settled;
            if settled {
                inner.animating = false;
                tracing::trace!(value = inner.spring.value(), "spring settled");
            }
            (
                inner.spring.value(),
                settled,
                inner.on_update.clone(),
                inner.on_complete.clone(),
            )
        };

        // Schedule before notifying so a callback that calls `start` or `stop`
        // replaces or cancels this frame.
        if !settled {
            Self::schedule_frame(this);
        }

        if let Some(on_update) = on_update {
            on_update(value);
        }
        if settled {
            if let Some(on_complete) = on_complete {
                on_complete();
            }
        }
    }
}

impl Drop for SpringIntegrator {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.animating = false;
            inner.cancel_frame();
        }
    }
}

impl std::fmt::Debug for SpringIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SpringIntegrator")
            .field("spring", &inner.spring)
            .field("animating", &inner.animating)
            .field("frame", &inner.frame)
            .finish()
    }
}
