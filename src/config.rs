//! Server configuration.
//!
//! Provides [`ServerConfig`] and a fluent [`ServerConfigBuilder`] that
//! validates before handing out a config.
//!
//! # Example
//!
//! ```ignore
//! use chat_relay::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .port(0)
//!     .chat_path("/chat")
//!     .build()?;
//! ```
//!
//! # Defaults
//!
//! | Setting | Default |
//! |---------|---------|
//! | `bind_ip` | `127.0.0.1` |
//! | `port` | `3000` |
//! | `chat_path` | `/chat` |
//! | `presence_path` | `/users` |
//! | `users_path` | `/ws` |

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upgrade path of the chat endpoint.
pub const DEFAULT_CHAT_PATH: &str = "/chat";

/// Default upgrade path of the presence endpoint.
pub const DEFAULT_PRESENCE_PATH: &str = "/users";

/// Default upgrade path of the user-records endpoint.
pub const DEFAULT_USERS_PATH: &str = "/ws";

// ============================================================================
// ServerConfig
// ============================================================================

/// Validated server configuration.
///
/// Use [`ServerConfig::builder()`] to create one with custom settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    bind_ip: IpAddr,
    port: u16,
    chat_path: String,
    presence_path: String,
    users_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: DEFAULT_BIND_IP,
            port: DEFAULT_PORT,
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            presence_path: DEFAULT_PRESENCE_PATH.to_string(),
            users_path: DEFAULT_USERS_PATH.to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a builder starting from the defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Address to bind.
    #[inline]
    #[must_use]
    pub fn bind_ip(&self) -> IpAddr {
        self.bind_ip
    }

    /// Port to bind; `0` lets the OS choose.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Upgrade path of the chat endpoint.
    #[inline]
    #[must_use]
    pub fn chat_path(&self) -> &str {
        &self.chat_path
    }

    /// Upgrade path of the presence endpoint.
    #[inline]
    #[must_use]
    pub fn presence_path(&self) -> &str {
        &self.presence_path
    }

    /// Upgrade path of the user-records endpoint.
    #[inline]
    #[must_use]
    pub fn users_path(&self) -> &str {
        &self.users_path
    }
}

// ============================================================================
// ServerConfigBuilder
// ============================================================================

/// Builder for [`ServerConfig`].
#[derive(Debug, Default, Clone)]
pub struct ServerConfigBuilder {
    bind_ip: Option<IpAddr>,
    port: Option<u16>,
    chat_path: Option<String>,
    presence_path: Option<String>,
    users_path: Option<String>,
}

impl ServerConfigBuilder {
    /// Creates a builder with nothing overridden.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address.
    #[inline]
    #[must_use]
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = Some(ip);
        self
    }

    /// Sets the port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the chat endpoint path.
    #[inline]
    #[must_use]
    pub fn chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = Some(path.into());
        self
    }

    /// Sets the presence endpoint path.
    #[inline]
    #[must_use]
    pub fn presence_path(mut self, path: impl Into<String>) -> Self {
        self.presence_path = Some(path.into());
        self
    }

    /// Sets the user-records endpoint path.
    #[inline]
    #[must_use]
    pub fn users_path(mut self, path: impl Into<String>) -> Self {
        self.users_path = Some(path.into());
        self
    }

    /// Builds the config with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a path does not start with `/`
    /// - [`Error::Config`] if two endpoints share a path
    pub fn build(self) -> Result<ServerConfig> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            bind_ip: self.bind_ip.unwrap_or(defaults.bind_ip),
            port: self.port.unwrap_or(defaults.port),
            chat_path: self.chat_path.unwrap_or(defaults.chat_path),
            presence_path: self.presence_path.unwrap_or(defaults.presence_path),
            users_path: self.users_path.unwrap_or(defaults.users_path),
        };

        validate_paths(&config)?;
        Ok(config)
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_paths(config: &ServerConfig) -> Result<()> {
    let paths = [
        ("chat", config.chat_path()),
        ("presence", config.presence_path()),
        ("users", config.users_path()),
    ];

    for (name, path) in paths {
        if !path.starts_with('/') {
            return Err(Error::config(format!(
                "{name} path must start with '/', got {path:?}"
            )));
        }
        if path.contains('?') {
            return Err(Error::config(format!(
                "{name} path must not contain a query string, got {path:?}"
            )));
        }
    }

    for (i, (first, a)) in paths.iter().enumerate() {
        for (second, b) in &paths[i + 1..] {
            if a == b {
                return Err(Error::config(format!(
                    "{first} and {second} endpoints share the path {a:?}"
                )));
            }
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
