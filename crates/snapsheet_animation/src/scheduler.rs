//! Animation frame scheduler
//!
//! A host-driven stand-in for the platform's "request animation frame" facility.
//! Animations request a one-shot callback for the next frame; the host calls
//! [`FrameScheduler::tick`] once per display frame with the frame timestamp.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle of a requested frame callback
    pub struct FrameId;
}

type FrameCallback = Box<dyn FnOnce(f64)>;

#[derive(Default)]
struct SchedulerInner {
    callbacks: SlotMap<FrameId, FrameCallback>,
}

/// Single-threaded animation frame scheduler
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `callback` to run on the next tick with that tick's timestamp (ms)
    pub fn request_frame<F>(&self, callback: F) -> FrameId
    where
        F: FnOnce(f64) + 'static,
    {
        self.inner.borrow_mut().callbacks.insert(Box::new(callback))
    }

    /// Cancel a pending frame. Returns false if it already ran or was cancelled.
    pub fn cancel_frame(&self, id: FrameId) -> bool {
        self.inner.borrow_mut().callbacks.remove(id).is_some()
    }

    /// Number of frame callbacks waiting for the next tick
    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    pub fn has_pending_frames(&self) -> bool {
        self.pending_frames() > 0
    }

    /// Run one frame
    ///
    /// Every callback pending when the tick starts runs once, unless cancelled by
    /// an earlier callback of the same tick. Callbacks requested during the tick
    /// run on the next one. Returns the number of callbacks invoked.
    pub fn tick(&self, timestamp_ms: f64) -> usize {
        let due: Vec<FrameId> = self.inner.borrow().callbacks.keys().collect();

        let mut invoked = 0;
        for id in due {
            let callback = self.inner.borrow_mut().callbacks.remove(id);
            if let Some(callback) = callback {
                callback(timestamp_ms);
                invoked += 1;
            }
        }

        tracing::trace!(timestamp_ms, invoked, "frame tick");
        invoked
    }
}
