//! Scaffolding for `snapsheet init`

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{SnapsheetConfig, CONFIG_FILE};

/// Name of the sample trace written next to the config
pub const SAMPLE_TRACE: &str = "trace.json";

/// Write a default `snapsheet.toml` and a sample trace into `path`
///
/// Existing files are left alone unless `force` is set.
pub fn init_project(path: &Path, container_height: f32, force: bool) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    let config = SnapsheetConfig::new(container_height);
    fs::write(&config_path, config.to_toml()?)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let trace_path = path.join(SAMPLE_TRACE);
    if !trace_path.exists() || force {
        fs::write(&trace_path, sample_trace())
            .with_context(|| format!("Failed to write {}", trace_path.display()))?;
    }

    tracing::info!("Initialized snapsheet config in {}", path.display());
    Ok(())
}

fn sample_trace() -> &'static str {
    r#"{
  "initial_snap_point": "half",
  "steps": [
    { "type": "wait", "ms": 200 },
    { "type": "press", "y": 400, "source": "touch" },
    { "type": "wait", "ms": 16 },
    { "type": "move", "y": 430 },
    { "type": "wait", "ms": 16 },
    { "type": "move", "y": 470 },
    { "type": "release" },
    { "type": "settle" },
    { "type": "key", "key": "ArrowUp" },
    { "type": "settle" },
    { "type": "resize", "height": 1000 },
    { "type": "settle" },
    { "type": "key", "key": "Enter", "target": "handle" }
  ]
}
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::Trace;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_files() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path(), 800.0, false).unwrap();

        let config = SnapsheetConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.sheet.container_height, 800.0);

        let trace = Trace::load(&dir.path().join(SAMPLE_TRACE)).unwrap();
        assert!(!trace.steps.is_empty());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path(), 800.0, false).unwrap();
        assert!(init_project(dir.path(), 600.0, false).is_err());

        init_project(dir.path(), 600.0, true).unwrap();
        let config = SnapsheetConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.sheet.container_height, 600.0);
    }
}
