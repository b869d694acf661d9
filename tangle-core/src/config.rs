use std::path::Path;

use serde::{Deserialize, Serialize};
use tangle_graphs::{CouplingOptions, ExternalPolicy};

use crate::error::ConfigError;

/// Directory under the analysed root holding config and database.
pub const TANGLE_DIR: &str = ".tangle";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "tangle.db";

/// Top-level tangle configuration, matching `.tangle/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TangleConfig {
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub coupling: CouplingSection,
    #[serde(default)]
    pub inspectors: InspectorsSection,
}

impl TangleConfig {
    /// Load `.tangle/config.toml` under `root`, falling back to defaults
    /// when the file does not exist.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(TANGLE_DIR).join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::NotFound(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.max_passes == 0 {
            return Err(ConfigError::Invalid(
                "analysis.max_passes must be at least 1".to_string(),
            ));
        }
        if self.discovery.include_patterns.is_empty() {
            return Err(ConfigError::Invalid(
                "discovery.include_patterns must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn coupling_options(&self) -> CouplingOptions {
        CouplingOptions {
            platform_prefixes: self.coupling.platform_prefixes.clone(),
            platform_policy: self.coupling.platform_policy,
        }
    }

    pub fn is_enabled(&self, inspector_id: &str) -> bool {
        !self.inspectors.disabled.iter().any(|d| d == inspector_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Upper bound on fixpoint passes per item kind.
    pub max_passes: u32,
    /// Process the items of one pass on the rayon pool.
    pub parallel_items: bool,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            max_passes: 16,
            parallel_items: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*.java".into(), "**/*.class".into()],
            exclude_patterns: vec![
                "**/.git/**".into(),
                "**/node_modules/**".into(),
                "**/.tangle/**".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingSection {
    pub platform_prefixes: Vec<String>,
    /// Edges into the platform library: dropped, or kept with a
    /// placeholder node.
    pub platform_policy: ExternalPolicy,
    /// Edges whose target has no class node in the analysed code.
    pub unresolved_policy: ExternalPolicy,
}

impl Default for CouplingSection {
    fn default() -> Self {
        let defaults = CouplingOptions::default();
        Self {
            platform_prefixes: defaults.platform_prefixes,
            platform_policy: defaults.platform_policy,
            unresolved_policy: ExternalPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectorsSection {
    /// Inspector ids to leave out of the registry.
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TangleConfig::default();
        config.validate().unwrap();
        assert_eq!(config.analysis.max_passes, 16);
        assert!(!config.analysis.parallel_items);
        assert_eq!(config.coupling.unresolved_policy, ExternalPolicy::Drop);
        assert!(config.coupling_options().is_platform("java.util.List"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = TangleConfig::from_toml_str(
            r#"
[analysis]
max_passes = 4
parallel_items = true

[coupling]
platform_prefixes = ["java."]
platform_policy = "placeholder"
unresolved_policy = "placeholder"

[inspectors]
disabled = ["generic-complexity"]
"#,
        )
        .unwrap();
        assert_eq!(config.analysis.max_passes, 4);
        assert!(config.analysis.parallel_items);
        assert_eq!(config.coupling.platform_policy, ExternalPolicy::Placeholder);
        assert_eq!(config.discovery, DiscoverySection::default());
        assert!(!config.is_enabled("generic-complexity"));
        assert!(config.is_enabled("coupling"));
    }

    #[test]
    fn zero_passes_is_rejected() {
        let err = TangleConfig::from_toml_str("[analysis]\nmax_passes = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_includes_are_rejected() {
        let err = TangleConfig::from_toml_str(
            "[discovery]\ninclude_patterns = []\nexclude_patterns = []\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("include_patterns"));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = TangleConfig::from_toml_str("[analysis").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TangleConfig::load(dir.path()).unwrap();
        assert_eq!(config, TangleConfig::default());
    }

    #[test]
    fn toml_round_trip() {
        let config = TangleConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(TangleConfig::from_toml_str(&text).unwrap(), config);
    }
}
