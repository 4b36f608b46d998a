//! CDQ state machine
//!
//! Pending → Processing → Completed (success or failure). A spec change after
//! the terminal condition deletes the CDQ together with its side objects;
//! results are never recomputed in place.

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument, warn};

use super::error::ControllerError;
use super::status::{update_status, StatusWrite};
use super::Context;
use crate::api::conditions::PROCESSING;
use crate::api::{CdqCondition, ComponentDescriptor, ComponentDetectionQuery, TerminalOutcome};
use crate::bridge::WorkerResult;
use crate::error::DetectionError;
use crate::git::GitHubRepo;
use crate::resolver::{build_components, AnalysisOutput};
use crate::runner::RunMode;

#[instrument(skip_all, fields(namespace = %cdq.namespace().unwrap_or_default(), name = %cdq.name_any()))]
pub async fn reconcile(
    cdq: Arc<ComponentDetectionQuery>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let namespace = cdq
        .namespace()
        .ok_or(ControllerError::MissingField("metadata.namespace"))?;
    let name = cdq.name_any();

    if cdq.is_being_deleted() {
        debug!("Being deleted, removing side objects");
        ctx.runner.cleanup(&namespace, &name).await?;
        return Ok(Action::await_change());
    }

    if cdq.spec_changed_since_terminal() {
        info!("Spec changed after completion, deleting");
        ctx.runner.cleanup(&namespace, &name).await?;
        ctx.cluster.cdqs.delete(&namespace, &name).await?;
        return Ok(Action::await_change());
    }

    if cdq.terminal_condition().is_some() {
        return Ok(Action::await_change());
    }

    let generation = cdq.metadata.generation.unwrap_or_default();
    let cdq = if cdq.processing_condition().is_some() {
        cdq
    } else {
        let write = update_status(
            ctx.cluster.cdqs.as_ref(),
            &namespace,
            &name,
            ctx.settings.status_update_retries,
            |status| {
                if status.conditions.iter().any(|c| c.type_ == PROCESSING) {
                    return false;
                }
                status.conditions.push(CdqCondition::processing(generation));
                true
            },
        )
        .await?;
        match write {
            StatusWrite::Written(updated) => {
                info!("Processing");
                Arc::new(updated)
            }
            StatusWrite::Unchanged(current) => Arc::new(current),
            StatusWrite::Gone => return cancel(&ctx, &namespace, &name).await,
        }
    };

    let result = ctx.runner.run(&cdq).await?;
    let (outcome, components) = match result {
        WorkerResult::Pending => {
            debug!("Waiting for analysis worker");
            return Ok(Action::requeue(ctx.settings.worker_poll_interval));
        }
        WorkerResult::Succeeded(output) => succeeded(&cdq, &output),
        WorkerResult::Failed(err) => failed(err),
    };

    match ctx.cluster.cdqs.get(&namespace, &name).await? {
        Some(current) if !current.is_being_deleted() => {}
        _ => return cancel(&ctx, &namespace, &name).await,
    }

    // Results belong to the spec seen when processing started
    let analysed_generation = cdq
        .processing_condition()
        .and_then(|c| c.observed_generation)
        .unwrap_or(generation);
    let terminal = CdqCondition::terminal(analysed_generation, &outcome);
    let write = update_status(
        ctx.cluster.cdqs.as_ref(),
        &namespace,
        &name,
        ctx.settings.status_update_retries,
        |status| {
            if status.conditions.iter().any(CdqCondition::is_terminal) {
                return false;
            }
            status.conditions.push(terminal.clone());
            status.component_detected = components.clone();
            true
        },
    )
    .await?;

    match write {
        StatusWrite::Written(_) => {
            match &outcome {
                TerminalOutcome::Succeeded { components } => {
                    info!(components, "ComponentDetectionQuery completed")
                }
                TerminalOutcome::Failed { tag, message } => {
                    info!(reason = %tag, "ComponentDetectionQuery failed: {}", message)
                }
            }
            ctx.metrics.record_outcome(&namespace, &outcome).await;
        }
        StatusWrite::Unchanged(_) => debug!("Terminal condition already recorded"),
        StatusWrite::Gone => return cancel(&ctx, &namespace, &name).await,
    }

    if ctx.runner.mode_for(&cdq) == RunMode::Offloaded {
        ctx.runner.cleanup(&namespace, &name).await?;
    }
    Ok(Action::await_change())
}

/// Requeue after a failed reconcile
pub fn error_policy(
    cdq: Arc<ComponentDetectionQuery>,
    err: &ControllerError,
    ctx: Arc<Context>,
) -> Action {
    warn!(
        namespace = %cdq.namespace().unwrap_or_default(),
        name = %cdq.name_any(),
        kind = err.metric_label(),
        "Reconcile failed: {}",
        err
    );
    Action::requeue(ctx.settings.error_requeue_interval)
}

/// The CDQ disappeared mid-flight: drop side objects and write nothing
async fn cancel(ctx: &Context, namespace: &str, name: &str) -> Result<Action, ControllerError> {
    info!("Deleted during analysis, cancelling");
    ctx.runner.cleanup(namespace, name).await?;
    Ok(Action::await_change())
}

fn succeeded(
    cdq: &ComponentDetectionQuery,
    output: &AnalysisOutput,
) -> (TerminalOutcome, BTreeMap<String, ComponentDescriptor>) {
    match GitHubRepo::parse(&cdq.spec.url) {
        Ok(repo) => {
            let components = build_components(output, &repo);
            (
                TerminalOutcome::Succeeded {
                    components: components.len(),
                },
                components,
            )
        }
        Err(err) => failed(err.into()),
    }
}

fn failed(err: DetectionError) -> (TerminalOutcome, BTreeMap<String, ComponentDescriptor>) {
    if !err.tag().is_user_error() {
        error!("Detection failed: {}", err.developer_message());
    }
    (
        TerminalOutcome::Failed {
            tag: err.tag(),
            message: err.message().to_string(),
        },
        BTreeMap::new(),
    )
}
