//! Snap points and their pixel projection
//!
//! A sheet rests at one of three discrete [`SnapPoint`]s. Each point maps to a
//! vertical offset (`translateY`) derived from the container height, recomputed
//! whenever the height changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snapsheet_core::fsm::{EventId, StateTransitions};

use crate::error::ParseSnapPointError;

/// How open the sheet is, as a percentage of the container height
pub const SNAP_POINT_PERCENTAGES: [f32; 3] = [5.0, 50.0, 95.0];

/// Live drag positions are kept within this fraction of either container edge
pub const DRAG_BOUND_FRACTION: f32 = 0.05;

/// Release speed (px/s) above which a release counts as a flick
pub const VELOCITY_THRESHOLD: f32 = 300.0;

/// Transition events understood by [`SnapPoint`]
pub mod snap_events {
    use snapsheet_core::fsm::EventId;

    /// One step toward `Full`
    pub const STEP_UP: EventId = 1;
    /// One step toward `Closed`
    pub const STEP_DOWN: EventId = 2;
    /// Closed -> Half -> Full -> Closed
    pub const CYCLE: EventId = 3;
    /// Straight to `Closed`, from any point
    pub const CLOSE: EventId = 4;
}

/// Resting position of the sheet
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SnapPoint {
    #[default]
    Closed = 0,
    Half = 1,
    Full = 2,
}

impl SnapPoint {
    /// All points in enumeration order
    pub const ALL: [SnapPoint; 3] = [SnapPoint::Closed, SnapPoint::Half, SnapPoint::Full];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Next point in the Closed -> Half -> Full -> Closed cycle
    pub fn next_cycle(self) -> Self {
        match self {
            SnapPoint::Closed => SnapPoint::Half,
            SnapPoint::Half => SnapPoint::Full,
            SnapPoint::Full => SnapPoint::Closed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnapPoint::Closed => "closed",
            SnapPoint::Half => "half",
            SnapPoint::Full => "full",
        }
    }
}

impl StateTransitions for SnapPoint {
    fn on_event(&self, event: EventId) -> Option<Self> {
        use snap_events::*;
        match (self, event) {
            (SnapPoint::Closed, STEP_UP) => Some(SnapPoint::Half),
            (SnapPoint::Half, STEP_UP) => Some(SnapPoint::Full),
            (SnapPoint::Full, STEP_DOWN) => Some(SnapPoint::Half),
            (SnapPoint::Half, STEP_DOWN) => Some(SnapPoint::Closed),
            (_, CYCLE) => Some(self.next_cycle()),
            (_, CLOSE) => Some(SnapPoint::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for SnapPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapPoint {
    type Err = ParseSnapPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" | "0" => Ok(SnapPoint::Closed),
            "half" | "1" => Ok(SnapPoint::Half),
            "full" | "2" => Ok(SnapPoint::Full),
            _ => Err(ParseSnapPointError(s.to_string())),
        }
    }
}

/// Pixel offsets of every snap point for one container height
///
/// An unknown (zero, negative or non-finite) height yields an all-zero table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTable {
    container_height: f32,
    offsets: [f32; 3],
}

impl SnapTable {
    pub fn new(container_height: f32) -> Self {
        let height = if container_height.is_finite() && container_height > 0.0 {
            container_height
        } else {
            0.0
        };
        Self {
            container_height: height,
            offsets: SNAP_POINT_PERCENTAGES.map(|percentage| height - height * percentage / 100.0),
        }
    }

    pub fn container_height(&self) -> f32 {
        self.container_height
    }

    pub fn offsets(&self) -> [f32; 3] {
        self.offsets
    }

    pub fn offset(&self, point: SnapPoint) -> f32 {
        self.offsets[point.index()]
    }

    pub fn closed_offset(&self) -> f32 {
        self.offset(SnapPoint::Closed)
    }

    pub fn full_offset(&self) -> f32 {
        self.offset(SnapPoint::Full)
    }

    /// Snap point whose offset is nearest to `y`; exact ties go to the lower point
    pub fn nearest(&self, y: f32) -> SnapPoint {
        let mut closest = SnapPoint::Closed;
        let mut closest_distance = f32::INFINITY;
        for point in SnapPoint::ALL {
            let distance = (self.offset(point) - y).abs();
            if distance < closest_distance {
                closest_distance = distance;
                closest = point;
            }
        }
        closest
    }

    /// How open the sheet is at `offset`, clamped to `[0, 1]`
    ///
    /// `None` when the table is degenerate (no measured height).
    pub fn progress(&self, offset: f32) -> Option<f32> {
        let closed = self.closed_offset();
        let range = closed - self.full_offset();
        if range > 0.0 {
            Some(((closed - offset) / range).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// `(min, max)` offsets a live drag is clamped to
    ///
    /// Fixed at 5% / 95% of the container, independent of the snap percentages.
    pub fn drag_bounds(&self) -> (f32, f32) {
        let h = self.container_height;
        (h * DRAG_BOUND_FRACTION, h - h * DRAG_BOUND_FRACTION)
    }

    pub fn clamp_drag(&self, y: f32) -> f32 {
        let (min, max) = self.drag_bounds();
        y.max(min).min(max)
    }
}

/// Pick the snap point a released drag settles on
///
/// A flick (`|velocity| > VELOCITY_THRESHOLD`) moves exactly one step from
/// `current`: down (toward `Closed`) for positive velocity, up for negative,
/// clamped at the ends. Slower releases pick the point nearest to `y`.
pub fn resolve_release(current: SnapPoint, velocity: f32, y: f32, table: &SnapTable) -> SnapPoint {
    if velocity.abs() > VELOCITY_THRESHOLD {
        let event = if velocity > 0.0 {
            snap_events::STEP_DOWN
        } else {
            snap_events::STEP_UP
        };
        current.apply(event)
    } else {
        table.nearest(y)
    }
}
