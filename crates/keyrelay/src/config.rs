//! Relay configuration, loaded from TOML.
//!
//! ```toml
//! bind_addr = "0.0.0.0:8080"
//!
//! [session]
//! handshake_timeout_secs = 10
//! mailbox_capacity = 256
//! greeting = "hi from the server"
//! require_challenge_binding = true
//!
//! [[users]]
//! username = "alice_w"
//! public_key = """
//! -----BEGIN PGP PUBLIC KEY BLOCK-----
//! ...
//! -----END PGP PUBLIC KEY BLOCK-----
//! """
//! ```
//!
//! Every key is optional.

use std::path::Path;

use keyrelay_auth::UserDirectory;
use keyrelay_auth::registration::{self, RegisterRequest, RegistrationError};
use keyrelay_session::SessionConfig;
use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    pub session: SessionConfig,

    /// Users registered in the directory at startup.
    pub users: Vec<RegisterRequest>,
}

impl RelayConfig {
    /// Reads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Registers the configured users, applying the usual registration
    /// rules. Returns how many were added.
    pub async fn seed_directory<D: UserDirectory>(
        &self,
        directory: &D,
    ) -> Result<usize, RegistrationError> {
        for user in &self.users {
            let identity = registration::register(directory, user.clone()).await?;
            tracing::debug!(user_id = %identity.id, username = %identity.username, "seeded user");
        }
        Ok(self.users.len())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session: SessionConfig::default(),
            users: Vec::new(),
        }
    }
}
