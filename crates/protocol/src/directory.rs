//! Directory (naming service) interface and locators

use crate::{DirectoryError, RemoteObject};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parsed `scheme://host[:port]/name` address of a remote object
///
/// Scheme and host are case-insensitive and stored lowercase; the object
/// name is kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub name: String,
}

impl Locator {
    /// Parse a locator string
    pub fn parse(s: &str) -> Result<Self, DirectoryError> {
        let malformed = |why: &str| DirectoryError::MalformedLocator(format!("{} ({})", s, why));

        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| malformed("missing scheme"))?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(malformed("invalid scheme"));
        }

        let (authority, name) = rest
            .split_once('/')
            .ok_or_else(|| malformed("missing object name"))?;
        if name.is_empty() || name.contains('/') {
            return Err(malformed("invalid object name"));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| malformed("invalid port"))?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return Err(malformed("missing host"));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port,
            name: name.to_string(),
        })
    }
}

impl FromStr for Locator {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}/{}", self.scheme, self.host, port, self.name),
            None => write!(f, "{}://{}/{}", self.scheme, self.host, self.name),
        }
    }
}

/// Resolves locators to live remote objects
#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup(&self, locator: &Locator) -> Result<RemoteObject, DirectoryError>;
}
