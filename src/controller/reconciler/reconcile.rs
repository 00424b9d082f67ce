//! # Reconciliation
//!
//! The entry point run for every triggering event:
//!
//! 1. Run the precondition checks; a failure is reported as its status and ends here.
//! 2. Resolve the effective secret key and publish connection data to consumers.
//! 3. Report `Maintenance`, build the desired pod spec and hand it to the runtime.
//! 4. Report `Active`.
//!
//! Consumers see connection data no later than the workload is (re)applied.

use super::error::ReconcileError;
use super::pod_spec::build_pod_spec;
use super::preconditions::{CheckOutcome, PreconditionChecker};
use super::publisher;
use super::types::{ReconcileOutcome, ReconcilePhase, Reconciler};
use crate::host::{ControllerStatus, StatusKind};
use crate::observability::metrics;
use crate::runtime::TriggerEvent;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Status message shown while the pod spec is being applied
pub const SETTING_POD_SPEC: &str = "Setting pod spec";

impl Reconciler {
    /// Run one reconciliation for `trigger`
    ///
    /// Routine check failures are converted into a status and returned as `Ok`.
    /// Anything else is returned as `Err` without touching the status.
    pub async fn reconcile(
        &self,
        trigger: &TriggerEvent,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let span = tracing::info_span!(
            "controller.reconcile",
            trigger = %trigger,
            app = %self.model.app_name,
        );
        let start = Instant::now();
        metrics::increment_reconciliations();

        let result = self.run().instrument(span).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => metrics::increment_reconciliation_outcome(outcome.status.kind()),
            Err(_) => metrics::increment_reconciliation_errors(),
        }
        result
    }

    async fn run(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let mut phases = vec![ReconcilePhase::Idle, ReconcilePhase::Checking];
        let checker = PreconditionChecker::new(
            self.leadership.as_ref(),
            self.negotiator.as_ref(),
            self.image_resolver.as_ref(),
        );
        let validated = match checker.check().await? {
            CheckOutcome::Passed(validated) => validated,
            CheckOutcome::Failed(failed) => {
                let status = failed.status();
                if status.kind() == StatusKind::Active {
                    debug!(reason = failed.reason(), "Reconciliation skipped");
                } else {
                    warn!(reason = failed.reason(), "Precondition failed: {}", failed);
                }
                self.status_sink.set_status(&status).await?;
                return Ok(finish(phases, status));
            }
        };

        phases.push(ReconcilePhase::Publishing);
        let config = self.config_provider.config().await?;
        let generated = self.secret_store.get_or_create_secret().await?;
        let secret_key = config.effective_secret_key(&generated);
        publisher::publish(&validated.interfaces, &config, &self.model, secret_key).await?;

        phases.push(ReconcilePhase::Applying);
        self.status_sink
            .set_status(&ControllerStatus::Maintenance(SETTING_POD_SPEC.to_string()))
            .await?;
        let spec = build_pod_spec(&config, &generated, &validated.image_details)?;
        self.workload.set_spec(&spec).await?;

        let status = ControllerStatus::Active;
        self.status_sink.set_status(&status).await?;
        info!(image = %validated.image_details.image_path, "Pod spec applied");
        Ok(finish(phases, status))
    }
}

fn finish(mut phases: Vec<ReconcilePhase>, status: ControllerStatus) -> ReconcileOutcome {
    phases.push(ReconcilePhase::Terminal(status.kind()));
    ReconcileOutcome { status, phases }
}
