//! Shared types for the atoll workspace.
//!
//! The model is small: a [`ServerAddr`] is a resolved transport endpoint, a
//! [`ServerRef`] is the handle callers get back from a lookup (identity
//! string plus endpoint), and a [`ServerEntry`] pairs a server with the
//! capacity weight it is declared with at ring construction time.
//!
//! Server identity is the *string*, not the endpoint. Two [`ServerRef`]s
//! with the same name compare equal even if their endpoints differ, and the
//! name is the value fed to ring point generation, so it is what every
//! client of the same cluster must agree on.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while resolving a server address.
#[derive(Debug, thiserror::Error)]
pub enum AddrError {
    /// The address string could not be resolved to a transport endpoint.
    #[error("cannot resolve server address {addr:?}: {source}")]
    Resolution {
        /// The address string as it appeared in the input.
        addr: String,
        /// The underlying resolver error.
        #[source]
        source: io::Error,
    },

    /// The address string resolved, but to an empty endpoint set.
    #[error("server address {addr:?} resolved to no endpoints")]
    NoAddress {
        /// The address string as it appeared in the input.
        addr: String,
    },
}

// ---------------------------------------------------------------------------
// ServerAddr
// ---------------------------------------------------------------------------

/// A resolved transport endpoint for a backend server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerAddr {
    /// TCP endpoint.
    Tcp(SocketAddr),
    /// Unix-domain socket path.
    Unix(PathBuf),
}

impl ServerAddr {
    /// Resolve an address string into a transport endpoint.
    ///
    /// Strings containing a `/` are taken as unix socket paths and are not
    /// validated further. Anything else is resolved as a `host:port` pair;
    /// hostnames go through the system resolver and the first result wins.
    pub fn resolve(addr: &str) -> Result<Self, AddrError> {
        if addr.contains('/') {
            return Ok(ServerAddr::Unix(PathBuf::from(addr)));
        }

        let mut endpoints = addr
            .to_socket_addrs()
            .map_err(|source| AddrError::Resolution {
                addr: addr.to_string(),
                source,
            })?;

        match endpoints.next() {
            Some(endpoint) => Ok(ServerAddr::Tcp(endpoint)),
            None => Err(AddrError::NoAddress {
                addr: addr.to_string(),
            }),
        }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerAddr::Tcp(endpoint) => write!(f, "{endpoint}"),
            ServerAddr::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerRef
// ---------------------------------------------------------------------------

/// A handle to one backend server.
///
/// Holds the serialized identity string and the resolved endpoint. Equality,
/// ordering, and hashing consider the identity string only; the endpoint is
/// opaque payload for whoever opens the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRef {
    name: String,
    addr: ServerAddr,
}

impl ServerRef {
    /// Resolve an address string into a server handle.
    ///
    /// The identity string is the canonical display form of the resolved
    /// endpoint (e.g. `"10.0.1.1:11211"`), so a hostname and the address it
    /// resolves to produce the same ring placement.
    pub fn resolve(addr: &str) -> Result<Self, AddrError> {
        Ok(Self::from_addr(ServerAddr::resolve(addr)?))
    }

    /// Build a server handle from an already-resolved endpoint.
    pub fn from_addr(addr: ServerAddr) -> Self {
        Self {
            name: addr.to_string(),
            addr,
        }
    }

    /// Build a server handle with an explicit identity string.
    ///
    /// For clusters whose ring identities are not the canonical endpoint
    /// form, e.g. rings keyed on hostnames rather than resolved addresses.
    pub fn with_name(name: impl Into<String>, addr: ServerAddr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }

    /// The identity string fed to ring point generation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved transport endpoint.
    pub fn addr(&self) -> &ServerAddr {
        &self.addr
    }
}

impl PartialEq for ServerRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ServerRef {}

impl Hash for ServerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for ServerRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for ServerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// ServerEntry
// ---------------------------------------------------------------------------

/// One server plus its declared capacity weight.
///
/// Entries are supplied once, at ring construction time. Weight is a
/// relative unit with no intrinsic meaning; a list where every weight is
/// zero selects the equal-distribution scheme instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// The server this entry describes.
    pub server: ServerRef,
    /// Relative capacity weight.
    pub weight: u64,
}

impl ServerEntry {
    /// Create an entry for `server` with the given weight.
    pub fn new(server: ServerRef, weight: u64) -> Self {
        Self { server, weight }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
