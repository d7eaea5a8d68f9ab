use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use fit_protocol::{DEFAULT_MAX_PACK_SIZE, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Daemon settings, loadable from a TOML file. Missing keys take defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Working directory of the served repository (holds `.fit`).
    pub repo_root: PathBuf,
    /// Largest pack accepted from a client, in bytes.
    pub max_pack_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            repo_root: PathBuf::from("."),
            max_pack_size: DEFAULT_MAX_PACK_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    /// Same config listening on `port` instead.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:9418".parse::<SocketAddr>().unwrap());
        assert_eq!(c.max_pack_size, 100 * 1024 * 1024);
        assert_eq!(c.repo_root, PathBuf::from("."));
    }

    #[test]
    fn load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.toml");
        std::fs::write(
            &path,
            "bind_addr = \"127.0.0.1:7000\"\nmax_pack_size = 1024\n",
        )
        .unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr.port(), 7000);
        assert_eq!(c.max_pack_size, 1024);
        assert_eq!(c.repo_root, PathBuf::from("."));
    }

    #[test]
    fn load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.toml");
        std::fs::write(&path, "bind_addr = 12").unwrap();
        assert!(matches!(
            ServerConfig::load(&path),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn with_port_overrides() {
        assert_eq!(ServerConfig::default().with_port(1234).bind_addr.port(), 1234);
    }
}
