//! # Position Relay Server Library
//!
//! This library provides the server half of a real-time multiplayer
//! position-synchronization service. Clients report where their own actor
//! is and which way it faces; the server records that in an in-memory
//! registry and relays every change to all other connected clients.
//!
//! The server is a relay, not an arbiter: reported positions are accepted
//! as-is, with no speed, bounds or collision checks.
//!
//! ## Connection Lifecycle
//!
//! Each connection moves through three states:
//! - **Connected**: transport established, no actor yet
//! - **Active**: the client sent `clientReady`; its actor is spawned, it gets
//!   a roster of everyone else and everyone else learns about it
//! - **Disconnected**: the transport is gone; if the connection was active,
//!   its actor is removed and peers are told
//!
//! Movement and stop intents are only honoured while active. Anything else
//! is dropped without telling the sender.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! The authoritative table of active actors and their last reported state.
//!
//! ### Lifecycle Module (`lifecycle`)
//! The per-connection state machine. Pure: it takes events attributed to a
//! connection and returns the messages they produce.
//!
//! ### Broadcast Module (`broadcast`)
//! Resolves who a message goes to and pushes it into per-connection queues
//! without ever waiting on a slow recipient.
//!
//! ### Network Module (`network`)
//! WebSocket accept loop, per-connection reader and writer tasks, and the
//! single event hub that owns all mutable server state.
//!
//! ### Config and Spawn Modules (`config`, `spawn`)
//! Command line / environment settings, the browser origin allow-list, and
//! the spawn point (fixed, or read from a Tiled map).
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let server = Server::bind(&config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod registry;
pub mod spawn;
