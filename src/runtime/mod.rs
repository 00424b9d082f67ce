//! # Runtime Module
//!
//! Runtime components for the MinIO operator: the event model and dispatch
//! table, initialization, and the watch loop that turns cluster changes into
//! events.

pub mod events;
pub mod initialization;
pub mod watch_loop;

pub use events::*;
pub use initialization::*;
pub use watch_loop::*;
