//! # Lease Leadership
//!
//! Leader election on a `coordination.k8s.io/v1` `Lease`.
//!
//! The first replica to create the lease holds it. The lease is owned by the
//! holder's pod, so it is garbage-collected with that pod; a replica that finds
//! the lease held by a pod that no longer exists takes it over.

use super::{is_conflict, is_not_found, owned_labels};
use crate::config::ControllerConfig;
use crate::host::{HostError, Leadership};
use async_trait::async_trait;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, ObjectMeta, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use tracing::{debug, info};

pub struct LeaseLeadership {
    leases: Api<Lease>,
    pods: Api<Pod>,
    lease_name: String,
    app_name: String,
    pod_name: String,
    pod_uid: Option<String>,
}

impl std::fmt::Debug for LeaseLeadership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseLeadership")
            .field("lease_name", &self.lease_name)
            .finish_non_exhaustive()
    }
}

impl LeaseLeadership {
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self {
            leases: Api::namespaced(client.clone(), &config.namespace),
            pods: Api::namespaced(client, &config.namespace),
            lease_name: config.lease_name(),
            app_name: config.app_name.clone(),
            pod_name: config.pod_name.clone(),
            pod_uid: config.pod_uid.clone(),
        }
    }

    fn owner_references(&self) -> Option<Vec<OwnerReference>> {
        self.pod_uid.as_ref().map(|uid| {
            vec![OwnerReference {
                api_version: "v1".to_string(),
                kind: "Pod".to_string(),
                name: self.pod_name.clone(),
                uid: uid.clone(),
                ..Default::default()
            }]
        })
    }

    fn desired_lease(&self) -> Lease {
        Lease {
            metadata: ObjectMeta {
                name: Some(self.lease_name.clone()),
                labels: Some(owned_labels(&self.app_name)),
                owner_references: self.owner_references(),
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.pod_name.clone()),
                ..Default::default()
            }),
        }
    }

    /// Fetch the lease, creating it with this pod as holder when absent
    async fn current_lease(&self) -> Result<Lease, kube::Error> {
        match self.leases.get(&self.lease_name).await {
            Ok(lease) => Ok(lease),
            Err(e) if is_not_found(&e) => {
                match self.leases.create(&PostParams::default(), &self.desired_lease()).await {
                    Ok(lease) => {
                        info!(
                            lease = %self.lease_name,
                            holder = %self.pod_name,
                            "Created leader lease"
                        );
                        Ok(lease)
                    }
                    // Another replica won the race
                    Err(e) if is_conflict(&e) => self.leases.get(&self.lease_name).await,
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn holder_is_gone(&self, holder: &str) -> Result<bool, kube::Error> {
        match self.pods.get(holder).await {
            Ok(_) => Ok(false),
            Err(e) if is_not_found(&e) => Ok(true),
            Err(e) => Err(e),
        }
    }

    async fn take_over(&self, resource_version: Option<String>) -> Result<bool, kube::Error> {
        // Guarded by resourceVersion so two replicas cannot both win
        let patch = json!({
            "metadata": {
                "resourceVersion": resource_version,
                "ownerReferences": self.owner_references(),
            },
            "spec": { "holderIdentity": self.pod_name },
        });
        match self
            .leases
            .patch(&self.lease_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                info!(lease = %self.lease_name, holder = %self.pod_name, "Took over leader lease");
                Ok(true)
            }
            Err(e) if is_conflict(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Leadership for LeaseLeadership {
    async fn is_leader(&self) -> Result<bool, HostError> {
        let lease = self.current_lease().await?;
        let holder = lease.spec.as_ref().and_then(|spec| spec.holder_identity.clone());

        match holder {
            Some(holder) if holder == self.pod_name => Ok(true),
            Some(holder) => {
                if self.holder_is_gone(&holder).await? {
                    Ok(self.take_over(lease.metadata.resource_version).await?)
                } else {
                    debug!(
                        lease = %self.lease_name,
                        holder = %holder,
                        "Lease held by another replica"
                    );
                    Ok(false)
                }
            }
            None => Ok(self.take_over(lease.metadata.resource_version).await?),
        }
    }
}
