//! Authenticated session management for keyrelay.
//!
//! This crate takes a freshly upgraded connection all the way to a live,
//! registered session and back down again:
//!
//! 1. **Handshake**: proving who the peer is ([`Session::authenticate`])
//! 2. **Registration**: recording the live session ([`ConnectionRegistry`])
//! 3. **Loops**: reading inbound frames, draining the outbound mailbox
//!    ([`Session::establish`])
//! 4. **Teardown**: deregistering and closing, exactly once
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)   ← accepts connections, hands each one to a Session
//!     ↕
//! Session Layer (this crate)   ← handshake, registry, per-session loops
//!     ↕
//! Auth / Protocol / Transport (below)
//! ```

mod config;
mod error;
mod handle;
mod handshake;
mod mailbox;
mod registry;
mod session;
mod state;

pub use config::SessionConfig;
pub use error::{BoxError, HandshakeError, SessionError, TransitionError};
pub use handle::SessionHandle;
pub use registry::ConnectionRegistry;
pub use session::{EstablishedSession, Session};
pub use state::SessionState;
