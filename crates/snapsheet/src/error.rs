use thiserror::Error;

/// Rejected [`SheetConfig`](crate::config::SheetConfig) values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("spring tension must be positive and finite, got {0}")]
    Tension(f32),

    #[error("spring friction must be positive and finite, got {0}")]
    Friction(f32),

    #[error("spring precision must be positive and finite, got {0}")]
    Precision(f32),

    #[error(
        "spring with tension {tension} and friction {friction} needs more than \
         {max} integration steps per frame",
        max = snapsheet_animation::spring::MAX_SUB_STEPS
    )]
    Stiffness { tension: f32, friction: f32 },

    #[error("container height must be finite and non-negative, got {0}")]
    ContainerHeight(f32),
}

/// A string that names no snap point
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown snap point `{0}` (expected closed, half or full)")]
pub struct ParseSnapPointError(pub String);
