//! # MinIO Operator
//!
//! A Kubernetes controller that runs a single MinIO object-storage server and
//! shares its connection data with the applications related to it.
//!
//! ## Overview
//!
//! On every lifecycle or relation event the controller:
//!
//! 1. **Checks preconditions** - leadership, relation schema versions, container image
//! 2. **Publishes connection data** - access key, secret key, port, namespace and service
//!    to every consumer on the `object-storage` relation
//! 3. **Applies the workload** - builds the desired pod spec and converges it onto a
//!    `Deployment`
//!
//! A failed precondition is reported as a status (`waiting` or `blocked`) and the
//! next event retries.
//!
//! ## Modules
//!
//! - [`controller`] - reconciliation and the metrics/health server
//! - [`runtime`] - events, initialization and the watch loop
//! - [`kubernetes`] - Kubernetes-backed collaborators
//! - [`config`], [`state`], [`image`], [`relation`], [`host`] - collaborator contracts

pub mod config;
pub mod constants;
pub mod controller;
pub mod host;
pub mod image;
pub mod kubernetes;
pub mod observability;
pub mod relation;
pub mod runtime;
pub mod state;
