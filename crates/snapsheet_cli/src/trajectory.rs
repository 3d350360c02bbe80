//! Spring trajectories for `snapsheet spring`

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use serde::Serialize;
use snapsheet::{FrameScheduler, SpringConfig};
use snapsheet_animation::SpringIntegrator;

/// One emitted integrator value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub frame: usize,
    pub time_ms: f64,
    pub value: f32,
    pub velocity: f32,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>5}  {:>9.1}ms  value {:>10.3}  velocity {:>10.3}",
            self.frame, self.time_ms, self.value, self.velocity
        )
    }
}

/// Animate from `from` to `to` until rest, one sample per emitted value
pub fn trajectory(
    from: f32,
    to: f32,
    config: SpringConfig,
    frame_ms: f64,
    max_frames: usize,
) -> Result<Vec<Sample>> {
    if !config.is_convergent() {
        anyhow::bail!("spring {config:?} never comes to rest");
    }
    if !(frame_ms.is_finite() && frame_ms > 0.0) {
        anyhow::bail!("frame interval must be positive, got {frame_ms}");
    }

    let scheduler = FrameScheduler::new();
    let values = Rc::new(RefCell::new(Vec::new()));
    let integrator = SpringIntegrator::new(&scheduler, from, config).on_update({
        let values = values.clone();
        move |value| values.borrow_mut().push(value)
    });
    integrator.start(to, 0.0);

    let mut samples = Vec::new();
    let mut frame = 0;
    while scheduler.has_pending_frames() {
        if frame >= max_frames {
            anyhow::bail!("spring did not come to rest within {max_frames} frames");
        }
        frame += 1;
        let time_ms = frame as f64 * frame_ms;
        scheduler.tick(time_ms);
        for value in values.borrow_mut().drain(..) {
            samples.push(Sample {
                frame,
                time_ms,
                value,
                velocity: integrator.velocity(),
            });
        }
    }
    tracing::debug!(frames = frame, samples = samples.len(), "spring at rest");
    Ok(samples)
}
