//! Shared library for kodou, a live heartbeat display with danmaku overlay.
//!
//! Everything both sides of the wire need: the JSON event protocol, logging
//! setup, and time utilities.

pub mod logger;
pub mod protocol;
pub mod time;
