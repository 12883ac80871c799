// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workflow Command Service
//!
//! Application service driving the [`Workflow`] aggregate on behalf of callers
//! (admin API handlers, schedulers, the publishing gate).
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Load → one guarded aggregate operation → save → harvest events
//! - **Collaborators:**
//!   - Domain: Workflow aggregate, WorkflowApproval, WorkflowStage
//!   - Infrastructure: WorkflowRepository, EventBus
//!
//! # Flow (every command)
//!
//! 1. Load the aggregate from the repository
//! 2. Apply the operation; a domain error aborts before anything is saved
//! 3. Persist the aggregate; a save from a stale copy fails with
//!    `RepositoryError::Conflict` and publishes nothing
//! 4. Drain the buffered events and publish them in order
//!
//! Approval decisions also land in the approval ledger so policies can be
//! evaluated later without replaying events.
//!
//! # Error Handling
//!
//! Returns anyhow::Error with context. The root cause is the domain error
//! (`WorkflowError`) or `RepositoryError`, reachable with `downcast_ref`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::aggregate::AggregateRoot;
use crate::domain::approval::WorkflowApproval;
use crate::domain::ids::{AccountId, ApprovalId, StageId, WorkflowId};
use crate::domain::platform_config::WorkflowDefaults;
use crate::domain::repository::WorkflowRepository;
use crate::domain::workflow::{Workflow, WorkflowError};
use crate::infrastructure::event_bus::EventBus;

/// Input for [`WorkflowService::start_workflow`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    /// Generated when absent
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub content_id: String,
    pub account_id: String,
    /// Falls back to the configured default workflow type
    #[serde(default)]
    pub workflow_type: Option<String>,
    pub initiated_by: String,
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Generated when absent
    #[serde(default)]
    pub stage_id: Option<String>,
    pub name: String,
    pub order: u32,
}

impl StageDefinition {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            stage_id: None,
            name: name.into(),
            order,
        }
    }
}

/// Workflow command use cases
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Start a workflow and optionally define its stages in the same save
    async fn start_workflow(&self, request: StartWorkflowRequest) -> Result<Workflow>;

    async fn define_stages(&self, workflow_id: &WorkflowId, stages: Vec<StageDefinition>) -> Result<Workflow>;

    /// Announce a finished stage and mark the first open owned stage with that name
    async fn complete_stage(&self, workflow_id: &WorkflowId, stage_name: &str, actor: &str) -> Result<Workflow>;

    async fn approve(&self, workflow_id: &WorkflowId, actor: &str, level: &str, comments: &str) -> Result<Workflow>;

    async fn reject(
        &self,
        workflow_id: &WorkflowId,
        actor: &str,
        level: &str,
        reason: &str,
        comments: &str,
    ) -> Result<Workflow>;

    /// Hand the workflow from its current assignee to `new_assignee`
    async fn reassign(&self, workflow_id: &WorkflowId, new_assignee: &str, actor: &str) -> Result<Workflow>;

    async fn complete(&self, workflow_id: &WorkflowId, actor: &str, final_status: &str) -> Result<Workflow>;

    async fn cancel(&self, workflow_id: &WorkflowId, actor: &str, reason: &str) -> Result<Workflow>;

    async fn get_workflow(&self, workflow_id: &WorkflowId) -> Result<Workflow>;

    async fn list_workflows(&self, account_id: &AccountId) -> Result<Vec<Workflow>>;
}

/// Standard implementation of WorkflowService
pub struct StandardWorkflowService {
    repository: Arc<dyn WorkflowRepository>,
    event_bus: Arc<EventBus>,
    defaults: WorkflowDefaults,
}

impl StandardWorkflowService {
    pub fn new(
        repository: Arc<dyn WorkflowRepository>,
        event_bus: Arc<EventBus>,
        defaults: WorkflowDefaults,
    ) -> Self {
        Self {
            repository,
            event_bus,
            defaults,
        }
    }

    async fn load(&self, workflow_id: &WorkflowId) -> Result<Workflow> {
        self.repository
            .find_by_id(workflow_id)
            .await
            .with_context(|| format!("Failed to load workflow {}", workflow_id))?
            .ok_or_else(|| anyhow!("Workflow {} not found", workflow_id))
    }

    /// Save, then publish whatever the aggregate buffered.
    async fn commit(&self, mut workflow: Workflow) -> Result<Workflow> {
        self.repository
            .save(&workflow)
            .await
            .with_context(|| format!("Failed to persist workflow {}", workflow.id()))?;
        workflow.mark_saved();

        let events = workflow.take_events();
        debug!(workflow_id = %workflow.id(), count = events.len(), "Publishing workflow events");
        self.event_bus.publish_workflow_events(events);
        Ok(workflow)
    }

    async fn mutate<F>(&self, workflow_id: &WorkflowId, operation: &'static str, apply: F) -> Result<Workflow>
    where
        F: FnOnce(&mut Workflow) -> Result<(), WorkflowError> + Send,
    {
        let mut workflow = self.load(workflow_id).await?;
        apply(&mut workflow).with_context(|| format!("Failed to {} workflow {}", operation, workflow_id))?;
        self.commit(workflow).await
    }
}

fn apply_stage_definitions(workflow: &mut Workflow, stages: Vec<StageDefinition>) -> Result<(), WorkflowError> {
    for definition in stages {
        let stage_id = match definition.stage_id {
            Some(id) => id,
            None => StageId::generate().to_string(),
        };
        workflow.define_stage(&stage_id, &definition.name, definition.order)?;
    }
    Ok(())
}

fn record_decision(
    workflow: &mut Workflow,
    actor: &str,
    level: &str,
    is_approved: bool,
    comments: &str,
    reason: Option<&str>,
) -> Result<(), WorkflowError> {
    // Built first so a bad record cannot leave a buffered notification behind
    let approval = WorkflowApproval::new(
        ApprovalId::generate().to_string(),
        workflow.id().as_str(),
        actor,
        level,
        is_approved,
        comments,
        reason,
    )?;

    match reason {
        Some(reason) if !is_approved => workflow.reject(actor, reason, comments)?,
        _ => workflow.approve(actor, level, comments)?,
    }
    workflow.record_approval(approval)
}

#[async_trait]
impl WorkflowService for StandardWorkflowService {
    async fn start_workflow(&self, request: StartWorkflowRequest) -> Result<Workflow> {
        let workflow_id = request
            .workflow_id
            .unwrap_or_else(|| WorkflowId::generate().to_string());
        let workflow_type = request
            .workflow_type
            .unwrap_or_else(|| self.defaults.default_workflow_type.clone());

        info!(
            workflow_id = %workflow_id,
            content_id = %request.content_id,
            workflow_type = %workflow_type,
            "Starting workflow"
        );

        let mut workflow = Workflow::new(
            workflow_id,
            request.content_id,
            request.account_id,
            workflow_type,
            request.initiated_by,
        )
        .context("Failed to start workflow")?;

        apply_stage_definitions(&mut workflow, request.stages)
            .context("Failed to define workflow stages")?;

        self.commit(workflow).await
    }

    async fn define_stages(&self, workflow_id: &WorkflowId, stages: Vec<StageDefinition>) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, count = stages.len(), "Defining workflow stages");
        self.mutate(workflow_id, "define stages for", |workflow| {
            apply_stage_definitions(workflow, stages)
        })
        .await
    }

    async fn complete_stage(&self, workflow_id: &WorkflowId, stage_name: &str, actor: &str) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, stage = stage_name, actor, "Completing workflow stage");
        self.mutate(workflow_id, "complete stage of", |workflow| {
            workflow.complete_stage(stage_name, actor)?;

            let open_stage = workflow
                .stages()
                .iter()
                .find(|s| s.name() == stage_name && !s.is_completed())
                .map(|s| s.id().clone());
            match open_stage {
                Some(stage_id) => workflow.complete_stage_entry(&stage_id, actor),
                None => Ok(()),
            }
        })
        .await
    }

    async fn approve(&self, workflow_id: &WorkflowId, actor: &str, level: &str, comments: &str) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, actor, level, "Approving workflow");
        self.mutate(workflow_id, "approve", |workflow| {
            record_decision(workflow, actor, level, true, comments, None)
        })
        .await
    }

    async fn reject(
        &self,
        workflow_id: &WorkflowId,
        actor: &str,
        level: &str,
        reason: &str,
        comments: &str,
    ) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, actor, level, "Rejecting workflow");
        self.mutate(workflow_id, "reject", |workflow| {
            record_decision(workflow, actor, level, false, comments, Some(reason))
        })
        .await
    }

    async fn reassign(&self, workflow_id: &WorkflowId, new_assignee: &str, actor: &str) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, new_assignee, actor, "Reassigning workflow");
        self.mutate(workflow_id, "reassign", |workflow| {
            let previous = workflow.current_assignee().to_string();
            workflow.reassign(&previous, new_assignee, actor)
        })
        .await
    }

    async fn complete(&self, workflow_id: &WorkflowId, actor: &str, final_status: &str) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, actor, final_status, "Completing workflow");
        self.mutate(workflow_id, "complete", |workflow| workflow.complete(actor, final_status))
            .await
    }

    async fn cancel(&self, workflow_id: &WorkflowId, actor: &str, reason: &str) -> Result<Workflow> {
        info!(workflow_id = %workflow_id, actor, reason, "Cancelling workflow");
        self.mutate(workflow_id, "cancel", |workflow| workflow.cancel(actor, reason))
            .await
    }

    async fn get_workflow(&self, workflow_id: &WorkflowId) -> Result<Workflow> {
        self.load(workflow_id).await
    }

    async fn list_workflows(&self, account_id: &AccountId) -> Result<Vec<Workflow>> {
        self.repository
            .list_by_account(account_id)
            .await
            .with_context(|| format!("Failed to list workflows for account {}", account_id))
    }
}
