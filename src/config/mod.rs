//! # Configuration
//!
//! Two layers of configuration:
//!
//! - [`OperatorConfig`] - the workload settings an operator edits (`access-key`,
//!   `secret-key`, `port`). Owned by the runtime and read-only to the controller.
//! - [`ControllerConfig`] - where the controller itself runs (namespace, application
//!   name, pod identity, object names), loaded from environment variables.

mod controller;
mod operator;

pub use controller::ControllerConfig;
pub use operator::{ConfigError, OperatorConfig, PortValue};
