//! # keyrelay
//!
//! A realtime relay that signs clients in with public-key
//! challenge-response and keeps a live registry of their sessions.
//!
//! A client connects over WebSocket, names itself, signs the challenge the
//! relay sends back, and from then on receives every message enqueued for
//! it through the [`ConnectionRegistry`](prelude::ConnectionRegistry).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyrelay::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! keyrelay::init_tracing();
//!
//! let config = RelayConfig::load("relay.toml")?;
//! let directory = MemoryDirectory::new();
//! config.seed_directory(&directory).await?;
//!
//! let server = RelayServerBuilder::from_config(&config)
//!     .build(directory, PgpVerifier)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::RelayConfig;
pub use error::{ConfigError, RelayError};
pub use server::{RelayServer, RelayServerBuilder};

pub use keyrelay_auth as auth;
pub use keyrelay_protocol as protocol;
pub use keyrelay_session as session;
pub use keyrelay_transport as transport;

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Does nothing
/// if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Everything needed to run a relay and talk to its sessions.
pub mod prelude {
    pub use crate::{ConfigError, RelayConfig, RelayError, RelayServer, RelayServerBuilder};
    pub use keyrelay_auth::{
        Identity, MemoryDirectory, PgpVerifier, SignatureVerifier, UserDirectory, UserId,
    };
    pub use keyrelay_protocol::{OutboundMessage, notice};
    pub use keyrelay_session::{
        ConnectionRegistry, SessionConfig, SessionError, SessionHandle, SessionState,
    };
}
