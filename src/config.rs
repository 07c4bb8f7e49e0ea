use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // Network configuration
    pub listen_address: String,
    pub port: u16,
    pub backlog_size: i32,

    // Size of the single read performed on each accepted connection
    pub read_buffer_size: usize,

    // Static file serving, used by the binary as the default handler
    pub static_root: Option<PathBuf>,
    pub static_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            port: 8080,
            backlog_size: 1024,

            read_buffer_size: 64 * 1024, // 64 KB

            static_root: None,
            static_prefix: String::new(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address and port to listen on
    pub fn with_address(mut self, address: &str, port: u16) -> Self {
        self.listen_address = address.to_string();
        self.port = port;
        self
    }

    /// Set only the port, keeping the listen address
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_backlog_size(mut self, backlog: i32) -> Self {
        self.backlog_size = backlog;
        self
    }

    /// Set the read buffer size for connections
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Serve files below `root`, mounted under the URL `prefix`
    pub fn with_static_root<P: Into<PathBuf>>(mut self, root: P, prefix: &str) -> Self {
        self.static_root = Some(root.into());
        self.static_prefix = prefix.to_string();
        self
    }

    /// Get the full address string (address:port)
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    /// Reject values the acceptor cannot work with
    pub fn validate(&self) -> ServerResult<()> {
        if self.read_buffer_size == 0 {
            return Err(ServerError::Config(
                "read_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.backlog_size <= 0 {
            return Err(ServerError::Config(
                "backlog_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, path: P) -> ServerResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
