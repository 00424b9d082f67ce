//! # Precondition Checks
//!
//! Leadership, interface negotiation and image resolution, run in that order. The
//! first failing check ends the chain; later checks are not invoked.

use super::error::ReconcileError;
use super::status::CheckFailed;
use crate::host::Leadership;
use crate::image::{ImageDetails, ImageResolver};
use crate::relation::{Interfaces, NegotiationError, SchemaNegotiator};
use tracing::{debug, info};

/// Inputs validated by a passing check chain
#[derive(Debug)]
pub struct Validated {
    pub interfaces: Interfaces,
    pub image_details: ImageDetails,
}

/// Result of running the check chain
#[derive(Debug)]
pub enum CheckOutcome {
    Passed(Validated),
    Failed(CheckFailed),
}

/// Runs the checks against borrowed collaborators
pub struct PreconditionChecker<'a> {
    leadership: &'a dyn Leadership,
    negotiator: &'a dyn SchemaNegotiator,
    image_resolver: &'a dyn ImageResolver,
}

impl std::fmt::Debug for PreconditionChecker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreconditionChecker").finish_non_exhaustive()
    }
}

impl<'a> PreconditionChecker<'a> {
    pub fn new(
        leadership: &'a dyn Leadership,
        negotiator: &'a dyn SchemaNegotiator,
        image_resolver: &'a dyn ImageResolver,
    ) -> Self {
        Self {
            leadership,
            negotiator,
            image_resolver,
        }
    }

    /// Run every check in order
    ///
    /// Classified failures come back as [`CheckOutcome::Failed`]; collaborator
    /// errors that fit no class are returned as `Err`.
    pub async fn check(&self) -> Result<CheckOutcome, ReconcileError> {
        if let Err(failed) = self.check_leader().await? {
            return Ok(CheckOutcome::Failed(failed));
        }

        let interfaces = match self.check_interfaces().await? {
            Ok(interfaces) => interfaces,
            Err(failed) => return Ok(CheckOutcome::Failed(failed)),
        };

        let image_details = match self.check_image_details().await {
            Ok(details) => details,
            Err(failed) => return Ok(CheckOutcome::Failed(failed)),
        };

        Ok(CheckOutcome::Passed(Validated {
            interfaces,
            image_details,
        }))
    }

    async fn check_leader(&self) -> Result<Result<(), CheckFailed>, ReconcileError> {
        if self.leadership.is_leader().await? {
            Ok(Ok(()))
        } else {
            info!("Not a leader, skipping pod spec update");
            Ok(Err(CheckFailed::NotLeader))
        }
    }

    async fn check_interfaces(&self) -> Result<Result<Interfaces, CheckFailed>, ReconcileError> {
        match self.negotiator.get_interfaces().await {
            Ok(interfaces) => {
                debug!(?interfaces, "Negotiated interfaces");
                Ok(Ok(interfaces))
            }
            Err(err @ NegotiationError::NoVersionsListed { .. }) => {
                Ok(Err(CheckFailed::InterfacesUnversioned(err.to_string())))
            }
            Err(err @ NegotiationError::NoCompatibleVersions { .. }) => {
                Ok(Err(CheckFailed::InterfacesIncompatible(err.to_string())))
            }
            Err(err @ NegotiationError::Relation(_)) => Err(ReconcileError::Negotiation(err)),
        }
    }

    async fn check_image_details(&self) -> Result<ImageDetails, CheckFailed> {
        self.image_resolver
            .fetch()
            .await
            .map_err(|e| CheckFailed::ImageUnresolvable {
                message: format!("{}: {}", e.status_message, self.image_resolver.resource_name()),
                status: e.status,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::StaticLeadership;
    use crate::host::StatusKind;
    use crate::image::{ImageResolveError, StaticImageResolver};
    use crate::relation::{InMemoryRelationBus, VersionNegotiator};
    use std::sync::Arc;

    fn checker_parts(
        leader: bool,
        image: StaticImageResolver,
    ) -> (StaticLeadership, Arc<InMemoryRelationBus>, VersionNegotiator, StaticImageResolver) {
        let bus = Arc::new(InMemoryRelationBus::new());
        let negotiator = VersionNegotiator::new(bus.clone());
        (StaticLeadership::new(leader), bus, negotiator, image)
    }

    #[tokio::test]
    async fn test_not_leader_short_circuits() {
        let (leadership, bus, negotiator, image) =
            checker_parts(false, StaticImageResolver::resolving(ImageDetails::new("minio")));
        let checker = PreconditionChecker::new(&leadership, &negotiator, &image);

        let outcome = checker.check().await.unwrap();
        assert!(matches!(outcome, CheckOutcome::Failed(CheckFailed::NotLeader)));
        assert_eq!(bus.advertised("object-storage"), None);
        assert_eq!(image.calls(), 0);
    }

    #[tokio::test]
    async fn test_unversioned_interfaces_skip_image() {
        let (leadership, bus, negotiator, image) =
            checker_parts(true, StaticImageResolver::resolving(ImageDetails::new("minio")));
        bus.relate("object-storage", "pipelines", None);
        let checker = PreconditionChecker::new(&leadership, &negotiator, &image);

        let outcome = checker.check().await.unwrap();
        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckFailed::InterfacesUnversioned(_))
        ));
        assert_eq!(image.calls(), 0);
    }

    #[tokio::test]
    async fn test_image_failure_appends_resource_name() {
        let (leadership, _bus, negotiator, image) =
            checker_parts(true, StaticImageResolver::failing(ImageResolveError::missing()));
        let checker = PreconditionChecker::new(&leadership, &negotiator, &image);

        let outcome = checker.check().await.unwrap();
        match outcome {
            CheckOutcome::Failed(CheckFailed::ImageUnresolvable { message, status }) => {
                assert_eq!(message, "Missing resource: oci-image");
                assert_eq!(status, StatusKind::Blocked);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let (leadership, bus, negotiator, image) =
            checker_parts(true, StaticImageResolver::resolving(ImageDetails::new("minio")));
        bus.relate("object-storage", "pipelines", Some(&["v1"]));
        let checker = PreconditionChecker::new(&leadership, &negotiator, &image);

        let CheckOutcome::Passed(validated) = checker.check().await.unwrap() else {
            panic!("checks should pass");
        };
        assert_eq!(validated.image_details, ImageDetails::new("minio"));
        assert!(validated.interfaces.get("object-storage").is_some());
    }
}
