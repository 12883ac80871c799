// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Content Gate Use Case
//!
//! Acts on a separately owned content item once a workflow finishes.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Collaborators:** WorkflowRepository, ContentRepository, EventBus, ApprovalPolicy
//!
//! # Flow (`on_workflow_completed`)
//!
//! 1. Load the workflow; it must have completed with the approved status
//! 2. Re-check the approval ledger against the policy
//! 3. Load the referenced content; a missing item is reported, not raised
//! 4. Publish, save, then harvest the content's events onto the bus
//!
//! [`run_completion_listener`] drives the gate from `WorkflowCompleted` events
//! so orchestrators only need to call `Workflow::complete`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use atrium_core::domain::aggregate::AggregateRoot;
use atrium_core::domain::content::ContentStatus;
use atrium_core::domain::events::WorkflowEvent;
use atrium_core::domain::ids::{ContentId, WorkflowId};
use atrium_core::domain::repository::{ContentRepository, WorkflowRepository};
use atrium_core::domain::workflow::{Workflow, WorkflowStatus};
use atrium_core::infrastructure::event_bus::{EventBus, EventBusError, EventReceiver, PlatformEvent};

use crate::domain::{ApprovalPolicy, PolicyDecision};

/// What the gate did with a finished workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    Published { content_id: ContentId, version: u32 },
    /// The workflow is still running
    NotReady { status: WorkflowStatus },
    /// The workflow finished without permission to publish
    Declined { reason: String },
    /// The referenced content no longer exists
    ContentMissing { content_id: ContentId },
    AlreadyPublished { content_id: ContentId },
}

#[async_trait]
pub trait ContentGate: Send + Sync {
    /// Whether the recorded approvals would let an orchestrator complete the workflow
    async fn evaluate_completion(&self, workflow_id: &WorkflowId) -> Result<PolicyDecision>;

    /// Publish the workflow's content if the workflow completed approved
    async fn on_workflow_completed(&self, workflow_id: &WorkflowId, actor: &str) -> Result<GateOutcome>;
}

pub struct StandardContentGate {
    workflows: Arc<dyn WorkflowRepository>,
    contents: Arc<dyn ContentRepository>,
    event_bus: Arc<EventBus>,
    policy: ApprovalPolicy,
}

impl StandardContentGate {
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        contents: Arc<dyn ContentRepository>,
        event_bus: Arc<EventBus>,
        policy: ApprovalPolicy,
    ) -> Self {
        Self {
            workflows,
            contents,
            event_bus,
            policy,
        }
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    async fn load_workflow(&self, workflow_id: &WorkflowId) -> Result<Workflow> {
        self.workflows
            .find_by_id(workflow_id)
            .await
            .with_context(|| format!("Failed to load workflow {}", workflow_id))?
            .ok_or_else(|| anyhow!("Workflow {} not found", workflow_id))
    }

    fn check_workflow(&self, workflow: &Workflow) -> Option<GateOutcome> {
        match workflow.status() {
            WorkflowStatus::Completed => {}
            WorkflowStatus::Cancelled => {
                return Some(GateOutcome::Declined {
                    reason: "workflow was cancelled".to_string(),
                })
            }
            status => return Some(GateOutcome::NotReady { status }),
        }

        if !self.policy.is_approved_completion(workflow) {
            return Some(GateOutcome::Declined {
                reason: format!("workflow completed with status '{}'", workflow.final_status()),
            });
        }

        match self.policy.evaluate(workflow.approvals()) {
            PolicyDecision::Satisfied => None,
            PolicyDecision::Pending { missing_levels } => Some(GateOutcome::Declined {
                reason: format!("no approval recorded for {}", missing_levels.join(", ")),
            }),
            PolicyDecision::Blocked { level, rejected_by, .. } => Some(GateOutcome::Declined {
                reason: format!("level {} rejected by {}", level, rejected_by),
            }),
        }
    }
}

#[async_trait]
impl ContentGate for StandardContentGate {
    async fn evaluate_completion(&self, workflow_id: &WorkflowId) -> Result<PolicyDecision> {
        let workflow = self.load_workflow(workflow_id).await?;
        let decision = self.policy.evaluate(workflow.approvals());
        debug!(workflow_id = %workflow_id, ?decision, "Evaluated approval policy");
        Ok(decision)
    }

    async fn on_workflow_completed(&self, workflow_id: &WorkflowId, actor: &str) -> Result<GateOutcome> {
        let workflow = self.load_workflow(workflow_id).await?;
        if let Some(outcome) = self.check_workflow(&workflow) {
            info!(workflow_id = %workflow_id, ?outcome, "Content gate closed");
            return Ok(outcome);
        }

        let content_id = workflow.content_id().clone();
        let mut content = match self
            .contents
            .find_by_id(&content_id)
            .await
            .with_context(|| format!("Failed to load content {}", content_id))?
        {
            Some(content) => content,
            None => {
                warn!(workflow_id = %workflow_id, content_id = %content_id, "Approved workflow references missing content");
                return Ok(GateOutcome::ContentMissing { content_id });
            }
        };

        match content.status() {
            ContentStatus::Published => return Ok(GateOutcome::AlreadyPublished { content_id }),
            ContentStatus::Archived => {
                return Ok(GateOutcome::Declined {
                    reason: format!("content {} is archived", content_id),
                })
            }
            ContentStatus::Draft | ContentStatus::Unpublished => {}
        }

        content
            .publish(actor, Some(workflow_id))
            .with_context(|| format!("Failed to publish content {}", content_id))?;
        self.contents
            .save(&content)
            .await
            .with_context(|| format!("Failed to persist content {}", content_id))?;
        self.event_bus.publish_content_events(content.take_events());

        let version = content.current_version();
        info!(workflow_id = %workflow_id, content_id = %content_id, version, "Published content");
        Ok(GateOutcome::Published { content_id, version })
    }
}

/// Subscribe `gate` to `event_bus` on a background task.
pub fn spawn_completion_listener(gate: Arc<dyn ContentGate>, event_bus: &EventBus) -> JoinHandle<()> {
    let receiver = event_bus.subscribe();
    tokio::spawn(run_completion_listener(gate, receiver))
}

/// Feed `WorkflowCompleted` events from `receiver` into `gate` until the bus closes.
///
/// The completing actor is recorded as the publisher. Gate failures are logged
/// and do not stop the listener.
pub async fn run_completion_listener(gate: Arc<dyn ContentGate>, mut receiver: EventReceiver) {
    info!("Content gate listener started");
    let mut completions_handled = 0u64;
    let mut failures = 0u64;

    loop {
        match receiver.recv().await {
            Ok(PlatformEvent::Workflow(WorkflowEvent::WorkflowCompleted {
                workflow_id,
                completed_by,
                ..
            })) => {
                completions_handled += 1;
                match gate.on_workflow_completed(&workflow_id, &completed_by).await {
                    Ok(outcome) => debug!(workflow_id = %workflow_id, ?outcome, "Handled workflow completion"),
                    Err(e) => {
                        failures += 1;
                        error!(workflow_id = %workflow_id, error = ?e, "Content gate failed");
                    }
                }
            }
            Ok(_) => continue,
            Err(EventBusError::Lagged(n)) => {
                warn!("Content gate listener lagged by {} events, some completions were skipped", n);
            }
            Err(EventBusError::Closed) | Err(EventBusError::Empty) => break,
        }
    }

    info!(
        "Content gate listener stopped (handled {} completions, {} failures)",
        completions_handled, failures
    );
}
