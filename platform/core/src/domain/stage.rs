// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow stage ledger entry.
//!
//! A stage is a named, ordered sub-step owned by one [`crate::domain::workflow::Workflow`].
//! It is a plain record: completing it emits no event. Notifying about stage
//! progress is the caller's job via `Workflow::complete_stage`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregate::{require_at_least, require_non_empty, InvalidArgument};
use crate::domain::ids::{StageId, WorkflowId};

/// Ordered sub-step of a workflow.
///
/// # Invariants
/// - `order >= 1`, fixed at creation and never renumbered
/// - `completed_at` and `completed_by` are set together, exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStage {
    id: StageId,
    workflow_id: WorkflowId,
    name: String,
    order: u32,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    completed_by: Option<String>,
}

impl WorkflowStage {
    pub fn new(
        stage_id: impl Into<String>,
        workflow_id: impl Into<String>,
        name: impl Into<String>,
        order: u32,
    ) -> Result<Self, StageError> {
        let id = StageId::new(stage_id)?;
        let workflow_id = WorkflowId::new(workflow_id)?;
        let name = name.into();
        require_non_empty("stage_name", &name)?;
        require_at_least("stage_order", order, 1)?;

        Ok(Self {
            id,
            workflow_id,
            name,
            order,
            is_completed: false,
            completed_at: None,
            completed_by: None,
        })
    }

    /// Mark the stage as done by `actor`.
    ///
    /// A stage completes once; a second call fails with [`StageError::AlreadyCompleted`].
    pub fn complete(&mut self, actor: &str) -> Result<(), StageError> {
        require_non_empty("actor", actor)?;
        if self.is_completed {
            return Err(StageError::AlreadyCompleted(self.id.clone()));
        }

        self.is_completed = true;
        self.completed_at = Some(Utc::now());
        self.completed_by = Some(actor.to_string());
        Ok(())
    }

    pub fn id(&self) -> &StageId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn completed_by(&self) -> Option<&str> {
        self.completed_by.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    #[error("Stage '{0}' is already completed")]
    AlreadyCompleted(StageId),
}
