//! Repository configuration stored in `.fit/config`.

use std::path::Path;

use fit_index::TreeLayout;
use fit_protocol::DEFAULT_PORT;
use fit_store::DEFAULT_COMPRESSION_LEVEL;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Author recorded when neither the config nor `$USER` names one.
pub const FALLBACK_AUTHOR: &str = "unknown";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub user: UserConfig,
    pub core: CoreConfig,
    pub remote: RemoteConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// zstd level for new loose objects.
    pub compression_level: i32,
    pub tree_layout: TreeLayout,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            tree_layout: TreeLayout::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Port assumed when a remote is given without one.
    pub default_port: u16,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
        }
    }
}

impl RepoConfig {
    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Author name for new commits: `[user] name`, then `$USER`, then
    /// [`FALLBACK_AUTHOR`].
    pub fn author(&self) -> String {
        self.author_with_env(std::env::var("USER").ok())
    }

    fn author_with_env(&self, env_user: Option<String>) -> String {
        self.user
            .name
            .clone()
            .or(env_user)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_AUTHOR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RepoConfig::load(&dir.path().join("config")).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.core.compression_level, 3);
        assert_eq!(config.core.tree_layout, TreeLayout::Nested);
        assert_eq!(config.remote.default_port, 9418);
    }

    #[test]
    fn parses_all_sections() {
        let text = r#"
            [user]
            name = "Ada Lovelace"

            [core]
            compression_level = 19
            tree_layout = "flat"

            [remote]
            default_port = 7000
        "#;
        let config: RepoConfig = toml::from_str(text).unwrap();
        assert_eq!(config.user.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(config.core.compression_level, 19);
        assert_eq!(config.core.tree_layout, TreeLayout::Flat);
        assert_eq!(config.remote.default_port, 7000);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let mut config = RepoConfig::default();
        config.user.name = Some("bob".into());
        config.core.tree_layout = TreeLayout::Flat;
        config.save(&path).unwrap();
        assert_eq!(RepoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[core]\ntree_layout = \"sideways\"\n").unwrap();
        assert!(matches!(RepoConfig::load(&path), Err(SdkError::Config(_))));
    }

    #[test]
    fn author_fallbacks() {
        let mut config = RepoConfig::default();
        assert_eq!(config.author_with_env(Some("envuser".into())), "envuser");
        assert_eq!(config.author_with_env(None), FALLBACK_AUTHOR);
        config.user.name = Some("Configured Name".into());
        assert_eq!(config.author_with_env(Some("envuser".into())), "Configured Name");
    }
}
