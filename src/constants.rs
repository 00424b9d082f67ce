//! # Constants
//!
//! Names and defaults shared across the controller.

/// Name of the workload container and of its exposed port
pub const WORKLOAD_NAME: &str = "minio";

/// Arguments passed to the MinIO server binary
pub const WORKLOAD_ARGS: [&str; 2] = ["server", "/data"];

/// Pod spec schema version submitted to the workload-spec sink
pub const POD_SPEC_VERSION: u32 = 3;

/// The only relation this controller provides
pub const OBJECT_STORAGE_RELATION: &str = "object-storage";

/// Logical name of the container image resource
pub const OCI_IMAGE_RESOURCE: &str = "oci-image";

/// Schema versions of `object-storage` this side can speak, oldest first
pub const OBJECT_STORAGE_VERSIONS: &[&str] = &["v1"];

/// Relation data key under which each side advertises its schema versions
pub const SUPPORTED_VERSIONS_KEY: &str = "_supported_versions";

/// Relation data key holding the serialized relation record
pub const RELATION_DATA_KEY: &str = "data";

/// Key of the generated secret in persisted controller state
pub const STATE_SECRET_KEY: &str = "secret_key";

/// Key holding the operator version that last completed startup
pub const STATE_OPERATOR_VERSION_KEY: &str = "operator_version";

/// Length of the generated secret key
pub const SECRET_KEY_LENGTH: usize = 30;

/// Alphabet the generated secret key is drawn from (uppercase letters and digits)
pub const SECRET_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Environment variable names injected into the workload container
pub const ENV_ACCESS_KEY: &str = "MINIO_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "MINIO_SECRET_KEY";

/// Operator configuration defaults
pub const DEFAULT_ACCESS_KEY: &str = "minio";
pub const DEFAULT_PORT: i64 = 9000;

/// Controller runtime defaults
pub const DEFAULT_APP_NAME: &str = "minio";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_METRICS_PORT: u16 = 5000;
pub const DEFAULT_OCI_IMAGE_RESOURCE_PATH: &str = "/var/run/minio-operator/oci-image.yaml";
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "minio-operator";

/// Labels identifying relation config maps written by consumers
pub const LABEL_RELATION: &str = "minio.operator/relation";
pub const LABEL_APP: &str = "minio.operator/app";

/// HTTP server startup polling
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
