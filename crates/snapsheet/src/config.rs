//! Sheet configuration

use serde::{Deserialize, Serialize};
use snapsheet_animation::SpringConfig;

use crate::error::ConfigError;
use crate::snap::SnapPoint;

/// Everything needed to build a sheet, minus host handles and callbacks
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub initial_snap_point: SnapPoint,
    pub spring: SpringConfig,
    /// Known container height in px, `0` until measured
    pub container_height: f32,
    pub enable_drag: bool,
    pub enable_keyboard: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            initial_snap_point: SnapPoint::Closed,
            spring: SpringConfig::default(),
            container_height: 0.0,
            enable_drag: true,
            enable_keyboard: true,
        }
    }
}

impl SheetConfig {
    /// Reject springs that cannot settle and heights that cannot be laid out
    pub fn validate(&self) -> Result<(), ConfigError> {
        let SpringConfig {
            tension,
            friction,
            precision,
        } = self.spring;
        if !(tension.is_finite() && tension > 0.0) {
            return Err(ConfigError::Tension(tension));
        }
        if !(friction.is_finite() && friction > 0.0) {
            return Err(ConfigError::Friction(friction));
        }
        if !(precision.is_finite() && precision > 0.0) {
            return Err(ConfigError::Precision(precision));
        }
        if !self.spring.is_convergent() {
            return Err(ConfigError::Stiffness { tension, friction });
        }
        if !(self.container_height.is_finite() && self.container_height >= 0.0) {
            return Err(ConfigError::ContainerHeight(self.container_height));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SheetConfig::default();
        assert_eq!(config.initial_snap_point, SnapPoint::Closed);
        assert_eq!(config.spring, SpringConfig::new(170.0, 26.0, 0.01));
        assert!(config.enable_drag && config.enable_keyboard);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_partial_toml() {
        let config: SheetConfig = toml::from_str(
            r#"
            initial_snap_point = "half"
            container_height = 800.0

            [spring]
            tension = 210.0
            "#,
        )
        .unwrap();
        assert_eq!(config.initial_snap_point, SnapPoint::Half);
        assert_eq!(config.container_height, 800.0);
        assert_eq!(config.spring, SpringConfig::new(210.0, 26.0, 0.01));
        assert!(config.enable_drag);
    }

    #[test]
    fn test_rejects_non_convergent_spring() {
        let mut config = SheetConfig::default();
        config.spring.friction = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::Friction(0.0)));

        let mut config = SheetConfig::default();
        config.spring.tension = f32::INFINITY;
        assert_eq!(config.validate(), Err(ConfigError::Tension(f32::INFINITY)));
    }

    #[test]
    fn test_stiffness_limit() {
        let mut config = SheetConfig::default();
        config.spring.friction = 200.0;
        assert_eq!(config.validate(), Ok(()));

        config.spring.friction = 10_000.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Stiffness {
                tension: 170.0,
                friction: 10_000.0
            })
        );
    }

    #[test]
    fn test_rejects_negative_height() {
        let config = SheetConfig {
            container_height: -1.0,
            ..SheetConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ContainerHeight(-1.0)));
    }
}
