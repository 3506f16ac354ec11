//! `hctx.toml` loading and flag overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use hctx_core::error::{HctxError, Result};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "hctx.toml";
/// Database used when neither the file nor the flags name one.
pub const DEFAULT_DATABASE: &str = "hctx.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported to MCP clients.
    pub name: Option<String>,
}

/// Contents of `hctx.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub project: Option<String>,
    pub version: Option<String>,
    pub server: ServerConfig,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| HctxError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HctxError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::parse(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` (which must exist), else `hctx.toml` in `dir` if
    /// present, else the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub project: Option<String>,
    pub version: Option<String>,
}

/// Effective settings after merging the file with the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub project: Option<String>,
    pub version: Option<String>,
    pub server_name: Option<String>,
}

impl Settings {
    #[must_use]
    pub fn merge(config: Config, overrides: Overrides) -> Self {
        Self {
            database: overrides
                .database
                .or(config.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            project: overrides.project.or(config.project),
            version: overrides.version.or(config.version),
            server_name: config.server.name,
        }
    }

    /// The configured project id.
    pub fn require_project(&self) -> Result<&str> {
        self.project.as_deref().ok_or_else(|| {
            HctxError::Config(
                "no project configured; pass --project or set `project` in hctx.toml".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_full_file() {
        let config = Config::parse(
            r#"
database = "data/knowledge.db"
project = "01J0000000000000000000000"
version = "draft"

[server]
name = "docs-server"
"#,
        )
        .unwrap();
        assert_eq!(config.database, Some(PathBuf::from("data/knowledge.db")));
        assert_eq!(config.version.as_deref(), Some("draft"));
        assert_eq!(config.server.name.as_deref(), Some("docs-server"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::parse("databse = \"x.db\"").unwrap_err();
        assert!(matches!(err, HctxError::Config(_)));
    }

    #[test]
    fn flags_override_file() {
        let config = Config {
            database: Some(PathBuf::from("file.db")),
            project: Some("from-file".to_string()),
            version: Some("draft".to_string()),
            server: ServerConfig::default(),
        };
        let settings = Settings::merge(
            config,
            Overrides {
                project: Some("from-flag".to_string()),
                ..Overrides::default()
            },
        );
        assert_eq!(settings.database, PathBuf::from("file.db"));
        assert_eq!(settings.project.as_deref(), Some("from-flag"));
        assert_eq!(settings.version.as_deref(), Some("draft"));
    }

    #[test]
    fn defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        let settings = Settings::merge(config, Overrides::default());
        assert_eq!(settings.database, PathBuf::from(DEFAULT_DATABASE));
        assert!(settings.require_project().is_err());
    }

    #[test]
    fn discovers_file_in_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "project = \"p1\"").unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.project.as_deref(), Some("p1"));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::discover(Some(&missing), dir.path()).is_err());
    }
}
