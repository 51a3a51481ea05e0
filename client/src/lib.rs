//! # Position Relay Client Library
//!
//! Client-side half of the position-synchronization service. A client
//! reports its own actor's movement to the server and keeps a local shadow
//! of every other actor, smoothed for display.
//!
//! ## Module Organization
//!
//! ### Sampler Module (`sampler`)
//! Turns per-frame local state into outgoing intents:
//! - movement updates rate limited to one per send interval
//! - unchanged state is never resent
//! - exactly one stop message when the actor comes to rest
//!
//! ### Reconciler Module (`reconciler`)
//! Applies server events to a table of remote actors and interpolates their
//! displayed positions towards the last reported ones.
//!
//! ### Network Module (`network`)
//! WebSocket session tying the two together: inbound frames feed the shadow
//! table, local intents go out through the sampler, and a render tick
//! publishes the current view.
//!
//! ### Walker Module (`walker`)
//! Seeded random walk used by the headless client in place of a keyboard.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientSettings};
//! use client::sampler::LocalIntent;
//! use tokio::sync::{mpsc, watch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("ws://127.0.0.1:3000", ClientSettings::default()).await?;
//!
//!     let (intent_tx, intent_rx) = mpsc::channel::<LocalIntent>(64);
//!     let (view_tx, _view_rx) = watch::channel(Default::default());
//!
//!     // Feed intent_tx from input handling, read _view_rx when drawing
//!     drop(intent_tx);
//!     client.run(intent_rx, view_tx).await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod reconciler;
pub mod sampler;
pub mod walker;
