use std::fmt;

use fit_protocol::DEFAULT_PORT;
use fit_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Address of a fit daemon.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Remote {
    pub host: String,
    pub port: u16,
}

impl Remote {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port` or `[v6addr]:port`, defaulting to port 9418.
    pub fn parse(s: &str) -> SyncResult<Self> {
        Self::parse_with_default(s, DEFAULT_PORT)
    }

    /// Like [`Remote::parse`] with a caller-chosen default port.
    pub fn parse_with_default(s: &str, default_port: u16) -> SyncResult<Self> {
        let invalid = || SyncError::InvalidRemote(s.to_string());
        let s = s.trim();
        let parse_port = |p: &str| p.parse::<u16>().map_err(|_| invalid());

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => default_port,
                _ => parse_port(tail.strip_prefix(':').ok_or_else(invalid)?)?,
            };
            (host, port)
        } else {
            match s.split_once(':') {
                // A second colon means a bare IPv6 address.
                Some((_, tail)) if tail.contains(':') => (s, default_port),
                Some((host, port)) => (host, parse_port(port)?),
                None => (s, default_port),
            }
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Outcome of a push.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub branch: String,
    pub tip: ObjectId,
    pub objects_sent: usize,
    pub bytes_transferred: u64,
}

/// Outcome of fetching a branch's objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    /// Remote tip, `None` when the remote does not have the branch.
    pub tip: Option<ObjectId>,
    pub objects_received: usize,
    /// Records whose transmitted hash did not match their content.
    pub mismatched: usize,
    pub bytes_transferred: u64,
}

/// Outcome of a pull.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullResult {
    pub branch: String,
    pub fetch: FetchResult,
    /// Local branch value before the pull.
    pub previous: Option<ObjectId>,
    pub tip: ObjectId,
}

impl PullResult {
    /// Whether the local branch already pointed at the remote tip.
    pub fn up_to_date(&self) -> bool {
        self.previous == Some(self.tip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_only_uses_default_port() {
        assert_eq!(Remote::parse("example.com").unwrap(), Remote::new("example.com", 9418));
    }

    #[test]
    fn parse_host_and_port() {
        assert_eq!(
            Remote::parse("10.0.0.7:7000").unwrap(),
            Remote::new("10.0.0.7", 7000)
        );
        assert_eq!(
            Remote::parse_with_default("box", 1234).unwrap(),
            Remote::new("box", 1234)
        );
    }

    #[test]
    fn parse_ipv6() {
        assert_eq!(Remote::parse("[::1]:9000").unwrap(), Remote::new("::1", 9000));
        assert_eq!(Remote::parse("[::1]").unwrap(), Remote::new("::1", 9418));
        assert_eq!(Remote::parse("fe80::2").unwrap(), Remote::new("fe80::2", 9418));
        assert_eq!(Remote::new("::1", 9000).to_string(), "[::1]:9000");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ":9418", "host:", "host:port", "host:70000", "[::1", "[::1]x"] {
            assert!(
                matches!(Remote::parse(bad), Err(SyncError::InvalidRemote(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_roundtrips() {
        let remote = Remote::new("localhost", 9418);
        assert_eq!(remote.to_string(), "localhost:9418");
        assert_eq!(Remote::parse(&remote.to_string()).unwrap(), remote);
    }

    #[test]
    fn pull_up_to_date() {
        let tip = ObjectId::digest(b"tip");
        let result = PullResult {
            branch: "main".into(),
            fetch: FetchResult::default(),
            previous: Some(tip),
            tip,
        };
        assert!(result.up_to_date());
    }
}
