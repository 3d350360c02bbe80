//! Spring physics
//!
//! A scalar spring-damper: a restoring force proportional to the displacement from
//! the target (`tension`) and an opposing force proportional to velocity
//! (`friction`), integrated with semi-implicit Euler.

use serde::{Deserialize, Serialize};

/// Largest frame delta fed into the integration, in seconds
///
/// Longer gaps (tab resume, stalled frames) are treated as this long.
pub const MAX_FRAME_DT: f32 = 0.064;

/// Largest single integration step, in seconds
///
/// A frame delta is split into equal sub-steps no longer than this. One explicit
/// step of [`MAX_FRAME_DT`] diverges for the default configuration.
pub const MAX_SUB_STEP: f32 = 0.016;

/// Most sub-steps a single frame is split into
pub const MAX_SUB_STEPS: u32 = 256;

/// Spring configuration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Restoring force per pixel of displacement
    pub tension: f32,
    /// Damping force per pixel/second of velocity
    pub friction: f32,
    /// Displacement and velocity below which the spring is at rest
    pub precision: f32,
}

impl SpringConfig {
    pub const fn new(tension: f32, friction: f32, precision: f32) -> Self {
        Self {
            tension,
            friction,
            precision,
        }
    }

    /// Soft and slow
    pub const fn gentle() -> Self {
        Self::new(120.0, 14.0, 0.01)
    }

    /// Quick with minimal overshoot
    pub const fn stiff() -> Self {
        Self::new(210.0, 20.0, 0.01)
    }

    /// Visible bounce
    pub const fn wobbly() -> Self {
        Self::new(180.0, 12.0, 0.01)
    }

    /// Damping ratio (1.0 = critically damped for unit mass)
    pub fn damping_ratio(&self) -> f32 {
        self.friction / (2.0 * self.tension.sqrt())
    }

    /// Longest integration step that stays stable for this configuration
    ///
    /// Semi-implicit Euler is stable while `h * friction <= 1` and
    /// `h * h * tension <= 1`.
    pub fn stable_step(&self) -> f32 {
        MAX_SUB_STEP
            .min(1.0 / self.friction)
            .min(1.0 / self.tension.sqrt())
    }

    /// Sub-steps needed to integrate a frame of `dt` seconds
    pub fn sub_steps(&self, dt: f32) -> u32 {
        let steps = (dt / self.stable_step()).ceil();
        if steps.is_nan() {
            return 1;
        }
        steps.clamp(1.0, MAX_SUB_STEPS as f32) as u32
    }

    /// Whether a spring with this configuration is guaranteed to come to rest
    ///
    /// Zero friction oscillates forever and zero precision never satisfies the
    /// rest test. Springs too stiff or too damped to integrate a
    /// [`MAX_FRAME_DT`] frame within [`MAX_SUB_STEPS`] stable steps are rejected.
    pub fn is_convergent(&self) -> bool {
        let positive = [self.tension, self.friction, self.precision]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);
        positive && MAX_FRAME_DT / self.stable_step() <= MAX_SUB_STEPS as f32
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::new(170.0, 26.0, 0.01)
    }
}

/// Result of advancing a spring
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpringStep {
    /// Still in motion
    Moving,
    /// Came to rest; the value now equals the target exactly
    Settled,
}

/// State of a single spring: value, target, velocity and configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Spring {
    value: f32,
    target: f32,
    velocity: f32,
    config: SpringConfig,
}

impl Spring {
    /// Create a spring resting at `initial`
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            value: initial,
            target: initial,
            velocity: 0.0,
            config,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Velocity in units per second
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config;
    }

    /// Change the target, keeping the current velocity
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Change the target and reset velocity
    pub fn retarget(&mut self, target: f32, velocity: f32) {
        self.target = target;
        self.velocity = velocity;
    }

    /// Move the value without animating
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    /// Whether displacement and velocity are both within precision
    pub fn is_settled(&self) -> bool {
        (self.target - self.value).abs() < self.config.precision
            && self.velocity.abs() < self.config.precision
    }

    /// Advance the spring by `dt` seconds
    ///
    /// `dt` is clamped to [`MAX_FRAME_DT`] and integrated in equal sub-steps no
    /// longer than [`SpringConfig::stable_step`]. A non-positive `dt` leaves the
    /// state untouched.
    pub fn step(&mut self, dt: f32) -> SpringStep {
        if dt.is_nan() || dt <= 0.0 {
            return SpringStep::Moving;
        }
        let dt = dt.min(MAX_FRAME_DT);
        let sub_steps = self.config.sub_steps(dt);
        let h = dt / sub_steps as f32;

        let SpringConfig {
            tension,
            friction,
            precision,
        } = self.config;

        for _ in 0..sub_steps {
            let displacement = self.target - self.value;
            let spring_force = tension * displacement;
            let damping_force = -friction * self.velocity;
            self.velocity += (spring_force + damping_force) * h;
            self.value += self.velocity * h;

            if displacement.abs() < precision && self.velocity.abs() < precision {
                self.value = self.target;
                self.velocity = 0.0;
                return SpringStep::Settled;
            }
        }

        SpringStep::Moving
    }
}
