//! Proxy configuration.

use serde::{Deserialize, Serialize};

/// Proxy server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Single origin allowed by CORS.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    /// Include panic messages in 500 responses (development only).
    #[serde(default)]
    pub expose_error_details: bool,
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            expose_error_details: false,
        }
    }
}
