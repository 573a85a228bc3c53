use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_LISTEN: &str = "0.0.0.0:1080";

/// What the client sees when a request fails after method negotiation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
pub enum ReplyMode {
    /// Close the connection without a reply.
    #[default]
    Silent,
    /// Send the RFC 1928 failure reply, then close.
    Rfc1928,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub reply_mode: ReplyMode,
    /// Seconds.
    #[serde(default)]
    pub connect_timeout: Option<u64>,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            reply_mode: ReplyMode::default(),
            connect_timeout: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }
}
