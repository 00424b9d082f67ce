//! # Reconciler
//!
//! Recomputes and applies the desired workload on every triggering event.
//!
//! ## Sub-modules
//!
//! - `preconditions` - leadership, interface and image checks
//! - `publisher` - connection data for relation consumers
//! - `pod_spec` - the desired specification and its builder
//! - `reconcile` - the orchestrating entry point
//! - `status` - classified check failures and their statuses
//! - `types` - reconciler context and state machine
//! - `error` - unclassified failures

mod error;
mod pod_spec;
mod preconditions;
mod publisher;
mod reconcile;
mod status;
mod types;

pub use error::ReconcileError;
pub use pod_spec::{build_pod_spec, ContainerPortSpec, ContainerSpec, PodSpec};
pub use preconditions::{CheckOutcome, PreconditionChecker, Validated};
pub use publisher::{object_storage_data, publish};
pub use reconcile::SETTING_POD_SPEC;
pub use status::CheckFailed;
pub use types::{ReconcileOutcome, ReconcilePhase, Reconciler};
