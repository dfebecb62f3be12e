//! Broadcast relay server for the kodou live heartbeat display.
//!
//! Maintains the set of connected viewers, stores submitted danmaku, and
//! fans every typed event out to all connections so that independently
//! rendering clients stay in lockstep.

mod handler;
pub mod registry;
pub mod relay;
pub mod router;
mod runner;
mod signal;
pub mod state;
pub mod store;

pub use runner::{app, run_server};
pub use state::AppState;
