use crate::{
    constants::{DANCE_DOUBLE, DANCE_SINGLE, DEFAULT_OUTPUT_DIR},
    error::{ParityError, Result},
    geometry::StageLayout,
    parity::{CostCategory, Weights},
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, str::FromStr};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Cost-category name to multiplier, e.g. `DOUBLESTEP = 850`
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_layout")]
    pub layout: String, // "dance-single" | "dance-double"
    #[serde(default = "default_true")]
    pub use_overrides: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub pretty: bool,
    #[serde(default)]
    pub include_graph: bool,
}

fn default_layout() -> String {
    DANCE_SINGLE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            use_overrides: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pretty: false,
            include_graph: false,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ParityError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        StageLayout::from_name(&self.analysis.layout).map_err(|_| {
            ParityError::Config(format!(
                "Invalid layout: {}. Must be '{}' or '{}'",
                self.analysis.layout, DANCE_SINGLE, DANCE_DOUBLE
            ))
        })?;

        if self.export.output_dir.trim().is_empty() {
            return Err(ParityError::Config(
                "export.output_dir cannot be empty".to_string(),
            ));
        }

        // bad weights are only skipped
        for (name, value) in &self.weights {
            if CostCategory::from_str(name).is_err() {
                warn!("Unknown weight '{}' in config will be ignored", name);
            } else if !value.is_finite() || *value <= 0.0 {
                warn!("Weight {} = {} must be positive, keeping default", name, value);
            }
        }
        Ok(())
    }

    /// Defaults with the configured weights applied
    pub fn resolved_weights(&self) -> Weights {
        let mut weights = Weights::default();
        weights.update_from_map(&self.weights);
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.layout, "dance-single");
        assert!(config.analysis.use_overrides);
        assert_eq!(config.export.output_dir, "parity");
        assert!(config.validate().is_ok());
        assert_eq!(config.resolved_weights(), Weights::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[analysis]
layout = "dance-double"

[weights]
JUMP = 45.0
NOT_A_WEIGHT = 3.0
"#,
        )
        .unwrap();
        assert_eq!(config.analysis.layout, "dance-double");
        assert!(config.analysis.use_overrides);
        assert!(!config.export.pretty);
        assert!(config.validate().is_ok());

        let weights = config.resolved_weights();
        assert_eq!(weights.get(CostCategory::Jump), 45.0);
        assert_eq!(weights.get(CostCategory::Doublestep), 850.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[export]\noutput_dir = \"out\"\npretty = true\ninclude_graph = true"
        )
        .unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.export.output_dir, "out");
        assert!(config.export.pretty && config.export.include_graph);
    }

    #[test]
    fn test_invalid_configs() {
        let config = Config::from_toml_str("[analysis]\nlayout = \"pump-single\"").unwrap();
        assert!(matches!(config.validate(), Err(ParityError::Config(_))));

        let config = Config::from_toml_str("[export]\noutput_dir = \"  \"").unwrap();
        assert!(config.validate().is_err());

        assert!(Config::from_toml_str("[analysis\nlayout =").is_err());
        assert!(Config::load_from_file(Path::new("/nonexistent/step_parity.toml")).is_err());
    }
}
