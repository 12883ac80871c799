// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Domain Model
//!
//! Multi-stage approval workflow that gates an external action (publishing a
//! content item) without owning that action's entity.
//!
//! # Architectural Context
//!
//! - **Bounded Context:** Content Governance Context
//! - **Aggregate Root:** Workflow
//! - **Owned Entities:** [`WorkflowStage`], [`WorkflowApproval`]
//!
//! # State Machine
//!
//! ```text
//! Started ──(stage / decision activity)──▶ InProgress ──complete──▶ Completed
//!    │                                         │
//!    └────────────────cancel───────────────────┴──────cancel──────▶ Cancelled
//! ```
//!
//! Only the terminal states are stored (`completed_at` / `cancelled_at`);
//! `Started` and `InProgress` are inferred by [`Workflow::status`].
//!
//! # Design Principles
//!
//! 1. **Approval is a notification:** `approve` / `reject` buffer a record but never
//!    decide completion. How many approvals at which levels finish a workflow is
//!    policy owned by the orchestration layer, which then calls `complete`.
//! 2. **Terminal means terminal:** once `is_completed()` is true every mutator
//!    fails with [`WorkflowError::AlreadyTerminal`].
//! 3. **Weak content reference:** only the [`ContentId`] is stored. The content
//!    item is never loaded, validated or mutated from here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregate::{require_non_empty, AggregateRoot, EventBuffer, InvalidArgument};
use crate::domain::approval::{ApprovalError, WorkflowApproval};
use crate::domain::events::WorkflowEvent;
use crate::domain::ids::{AccountId, ApprovalId, ContentId, StageId, WorkflowId};
use crate::domain::stage::{StageError, WorkflowStage};

// ============================================================================
// Value Objects
// ============================================================================

/// Lifecycle position of a workflow, derived from its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created, no activity yet
    Started,
    /// A stage completed, a decision was recorded or the workflow was reassigned
    InProgress,
    /// Terminal: finished with a caller-supplied final status
    Completed,
    /// Terminal: abandoned
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Started => "started",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

// ============================================================================
// Aggregate Root: Workflow
// ============================================================================

/// Workflow Aggregate Root
///
/// # Invariants
/// - `id`, `started_at`, `content_id`, `account_id`, `workflow_type`, `initiated_by` never change
/// - at most one of `completed_at` / `cancelled_at` is ever set, and never reset
/// - `is_completed` is true iff one of them is set
/// - stage ids and stage orders are unique within the workflow
/// - every owned stage and approval points back at this workflow
///
/// Deserialization re-checks these invariants, so a corrupted stored record
/// fails to load instead of producing an inconsistent aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "WorkflowRecord")]
pub struct Workflow {
    id: WorkflowId,
    content_id: ContentId,
    account_id: AccountId,
    workflow_type: String,
    initiated_by: String,
    current_assignee: String,
    /// Empty until a stage completes
    current_stage: String,
    /// Empty until completed
    final_status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    is_completed: bool,
    stages: Vec<WorkflowStage>,
    approvals: Vec<WorkflowApproval>,
    /// Number of successful saves; repositories reject a save from a stale copy
    version: u64,
    #[serde(skip)]
    events: EventBuffer<WorkflowEvent>,
}

impl Workflow {
    /// Start a new workflow for a content item.
    ///
    /// Buffers exactly one `WorkflowStarted` event. The initiator becomes the
    /// current assignee.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::InvalidArgument`] naming the first empty argument, checked in
    /// parameter order.
    pub fn new(
        workflow_id: impl Into<String>,
        content_id: impl Into<String>,
        account_id: impl Into<String>,
        workflow_type: impl Into<String>,
        initiated_by: impl Into<String>,
    ) -> Result<Self, WorkflowError> {
        let id = WorkflowId::new(workflow_id)?;
        let content_id = ContentId::new(content_id)?;
        let account_id = AccountId::new(account_id)?;
        let workflow_type = workflow_type.into();
        require_non_empty("workflow_type", &workflow_type)?;
        let initiated_by = initiated_by.into();
        require_non_empty("initiated_by", &initiated_by)?;

        let started_at = Utc::now();
        let mut workflow = Self {
            id,
            content_id,
            account_id,
            workflow_type,
            current_assignee: initiated_by.clone(),
            initiated_by,
            current_stage: String::new(),
            final_status: String::new(),
            started_at,
            completed_at: None,
            cancelled_at: None,
            is_completed: false,
            stages: Vec::new(),
            approvals: Vec::new(),
            version: 0,
            events: EventBuffer::new(),
        };

        workflow.events.record(WorkflowEvent::WorkflowStarted {
            workflow_id: workflow.id.clone(),
            content_id: workflow.content_id.clone(),
            account_id: workflow.account_id.clone(),
            workflow_type: workflow.workflow_type.clone(),
            initiated_by: workflow.initiated_by.clone(),
            started_at,
        });

        Ok(workflow)
    }

    // ========================================================================
    // Aggregate Commands (State Mutations)
    // ========================================================================

    /// Record that the named stage finished. Sets `current_stage`.
    ///
    /// Owned [`WorkflowStage`] entries are not touched; complete those through
    /// [`Workflow::complete_stage_entry`].
    pub fn complete_stage(&mut self, stage_name: &str, actor: &str) -> Result<(), WorkflowError> {
        require_non_empty("stage_name", stage_name)?;
        require_non_empty("actor", actor)?;
        self.ensure_active("complete a stage")?;

        self.current_stage = stage_name.to_string();
        self.events.record(WorkflowEvent::WorkflowStageCompleted {
            workflow_id: self.id.clone(),
            stage_name: stage_name.to_string(),
            completed_by: actor.to_string(),
            completed_at: Utc::now(),
        });
        Ok(())
    }

    /// Buffer an approval at `level`. Does not change workflow state.
    pub fn approve(&mut self, actor: &str, level: &str, comments: &str) -> Result<(), WorkflowError> {
        require_non_empty("actor", actor)?;
        require_non_empty("level", level)?;
        self.ensure_active("approve")?;

        self.events.record(WorkflowEvent::WorkflowApproved {
            workflow_id: self.id.clone(),
            approved_by: actor.to_string(),
            level: level.to_string(),
            comments: comments.to_string(),
            approved_at: Utc::now(),
        });
        Ok(())
    }

    /// Buffer a rejection. Does not change workflow state; the orchestrator
    /// decides whether a rejection ends the workflow (usually via `cancel`).
    pub fn reject(&mut self, actor: &str, reason: &str, comments: &str) -> Result<(), WorkflowError> {
        require_non_empty("actor", actor)?;
        require_non_empty("reason", reason)?;
        self.ensure_active("reject")?;

        self.events.record(WorkflowEvent::WorkflowRejected {
            workflow_id: self.id.clone(),
            rejected_by: actor.to_string(),
            reason: reason.to_string(),
            comments: comments.to_string(),
            rejected_at: Utc::now(),
        });
        Ok(())
    }

    /// Hand the workflow to `new_assignee`.
    pub fn reassign(
        &mut self,
        previous_assignee: &str,
        new_assignee: &str,
        actor: &str,
    ) -> Result<(), WorkflowError> {
        require_non_empty("previous_assignee", previous_assignee)?;
        require_non_empty("new_assignee", new_assignee)?;
        require_non_empty("actor", actor)?;
        self.ensure_active("reassign")?;

        self.current_assignee = new_assignee.to_string();
        self.events.record(WorkflowEvent::WorkflowReassigned {
            workflow_id: self.id.clone(),
            previous_assignee: previous_assignee.to_string(),
            new_assignee: new_assignee.to_string(),
            reassigned_by: actor.to_string(),
            reassigned_at: Utc::now(),
        });
        Ok(())
    }

    /// Finish the workflow with `final_status` (e.g. "Approved").
    pub fn complete(&mut self, actor: &str, final_status: &str) -> Result<(), WorkflowError> {
        require_non_empty("actor", actor)?;
        require_non_empty("final_status", final_status)?;
        self.ensure_active("complete")?;

        let completed_at = Utc::now();
        self.is_completed = true;
        self.completed_at = Some(completed_at);
        self.final_status = final_status.to_string();

        self.events.record(WorkflowEvent::WorkflowCompleted {
            workflow_id: self.id.clone(),
            completed_by: actor.to_string(),
            final_status: final_status.to_string(),
            duration_ms: (completed_at - self.started_at).num_milliseconds(),
            completed_at,
        });
        Ok(())
    }

    /// Abandon the workflow.
    pub fn cancel(&mut self, actor: &str, reason: &str) -> Result<(), WorkflowError> {
        require_non_empty("actor", actor)?;
        require_non_empty("reason", reason)?;
        self.ensure_active("cancel")?;

        let cancelled_at = Utc::now();
        self.is_completed = true;
        self.cancelled_at = Some(cancelled_at);

        self.events.record(WorkflowEvent::WorkflowCancelled {
            workflow_id: self.id.clone(),
            cancelled_by: actor.to_string(),
            reason: reason.to_string(),
            duration_ms: (cancelled_at - self.started_at).num_milliseconds(),
            cancelled_at,
        });
        Ok(())
    }

    // ========================================================================
    // Owned Ledgers
    // ========================================================================

    /// Add a stage to the stage ledger.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::Stage`] for invalid stage arguments (including `order == 0`)
    /// - [`WorkflowError::DuplicateStage`] / [`WorkflowError::DuplicateStageOrder`]
    /// - [`WorkflowError::AlreadyTerminal`]
    pub fn define_stage(
        &mut self,
        stage_id: &str,
        name: &str,
        order: u32,
    ) -> Result<&WorkflowStage, WorkflowError> {
        let stage = WorkflowStage::new(stage_id, self.id.as_str(), name, order)?;
        self.ensure_active("define a stage")?;

        if self.stages.iter().any(|s| s.id() == stage.id()) {
            return Err(WorkflowError::DuplicateStage(stage.id().clone()));
        }
        if self.stages.iter().any(|s| s.order() == order) {
            return Err(WorkflowError::DuplicateStageOrder(order));
        }

        let position = self.stages.partition_point(|s| s.order() < order);
        self.stages.insert(position, stage);
        Ok(&self.stages[position])
    }

    /// Append a decision to the approval ledger.
    ///
    /// The record must belong to this workflow and its id must be new.
    pub fn record_approval(&mut self, approval: WorkflowApproval) -> Result<(), WorkflowError> {
        if approval.workflow_id() != &self.id {
            return Err(WorkflowError::ForeignRecord {
                expected: self.id.clone(),
                actual: approval.workflow_id().clone(),
            });
        }
        self.ensure_active("record an approval")?;
        if self.approvals.iter().any(|a| a.id() == approval.id()) {
            return Err(WorkflowError::DuplicateApproval(approval.id().clone()));
        }

        self.approvals.push(approval);
        Ok(())
    }

    /// Stages in ascending order.
    pub fn stages(&self) -> &[WorkflowStage] {
        &self.stages
    }

    pub fn stage(&self, stage_id: &StageId) -> Option<&WorkflowStage> {
        self.stages.iter().find(|s| s.id() == stage_id)
    }

    /// First stage carrying `name`.
    pub fn stage_by_name(&self, name: &str) -> Option<&WorkflowStage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Mark an owned stage as done by `actor`.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::AlreadyTerminal`]
    /// - [`WorkflowError::StageNotFound`]
    /// - [`WorkflowError::Stage`] when the stage already completed
    pub fn complete_stage_entry(&mut self, stage_id: &StageId, actor: &str) -> Result<(), WorkflowError> {
        require_non_empty("actor", actor)?;
        self.ensure_active("complete a stage entry")?;

        let stage = self
            .stages
            .iter_mut()
            .find(|s| s.id() == stage_id)
            .ok_or_else(|| WorkflowError::StageNotFound(stage_id.clone()))?;
        stage.complete(actor)?;
        Ok(())
    }

    /// Decisions in the order they were recorded.
    pub fn approvals(&self) -> &[WorkflowApproval] {
        &self.approvals
    }

    pub fn approvals_at_level<'a>(
        &'a self,
        level: &'a str,
    ) -> impl Iterator<Item = &'a WorkflowApproval> + 'a {
        self.approvals.iter().filter(move |a| a.level() == level)
    }

    // ========================================================================
    // Aggregate Queries (State Inspection)
    // ========================================================================

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn workflow_type(&self) -> &str {
        &self.workflow_type
    }

    pub fn initiated_by(&self) -> &str {
        &self.initiated_by
    }

    pub fn current_assignee(&self) -> &str {
        &self.current_assignee
    }

    pub fn current_stage(&self) -> &str {
        &self.current_stage
    }

    pub fn final_status(&self) -> &str {
        &self.final_status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Persistence version this copy was loaded at (0 before the first save).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Advance the version after a successful save.
    ///
    /// Repositories call this on the copy they store; application services
    /// call it on the copy they keep.
    pub fn mark_saved(&mut self) {
        self.version += 1;
    }

    /// Wall-clock time from start to whichever terminal timestamp fired.
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at
            .or(self.cancelled_at)
            .map(|ended_at| ended_at - self.started_at)
    }

    pub fn status(&self) -> WorkflowStatus {
        if self.cancelled_at.is_some() {
            WorkflowStatus::Cancelled
        } else if self.completed_at.is_some() {
            WorkflowStatus::Completed
        } else if !self.current_stage.is_empty()
            || !self.approvals.is_empty()
            || self.current_assignee != self.initiated_by
            || self.stages.iter().any(WorkflowStage::is_completed)
        {
            WorkflowStatus::InProgress
        } else {
            WorkflowStatus::Started
        }
    }

    fn ensure_active(&self, operation: &'static str) -> Result<(), WorkflowError> {
        if self.is_completed {
            return Err(WorkflowError::AlreadyTerminal {
                workflow_id: self.id.clone(),
                status: self.status(),
                operation,
            });
        }
        Ok(())
    }
}

/// Stored shape of a [`Workflow`], validated on the way in.
#[derive(Deserialize)]
struct WorkflowRecord {
    id: WorkflowId,
    content_id: ContentId,
    account_id: AccountId,
    workflow_type: String,
    initiated_by: String,
    current_assignee: String,
    current_stage: String,
    final_status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    is_completed: bool,
    #[serde(default)]
    stages: Vec<WorkflowStage>,
    #[serde(default)]
    approvals: Vec<WorkflowApproval>,
    #[serde(default)]
    version: u64,
}

impl TryFrom<WorkflowRecord> for Workflow {
    type Error = WorkflowError;

    fn try_from(record: WorkflowRecord) -> Result<Self, Self::Error> {
        let inconsistent = |detail: &'static str| WorkflowError::InconsistentState {
            workflow_id: record.id.clone(),
            detail,
        };

        if record.completed_at.is_some() && record.cancelled_at.is_some() {
            return Err(inconsistent("both completed_at and cancelled_at are set"));
        }
        let terminal = record.completed_at.is_some() || record.cancelled_at.is_some();
        if record.is_completed != terminal {
            return Err(inconsistent("is_completed disagrees with the terminal timestamps"));
        }
        if record.completed_at.is_none() && !record.final_status.is_empty() {
            return Err(inconsistent("final_status is set on a workflow that never completed"));
        }
        if record.stages.iter().any(|s| s.workflow_id() != &record.id)
            || record.approvals.iter().any(|a| a.workflow_id() != &record.id)
        {
            return Err(inconsistent("ledger entry belongs to another workflow"));
        }
        if record.stages.windows(2).any(|pair| pair[0].order() >= pair[1].order()) {
            return Err(inconsistent("stage orders are not unique and ascending"));
        }
        let mut stage_ids: Vec<&StageId> = record.stages.iter().map(WorkflowStage::id).collect();
        stage_ids.sort();
        stage_ids.dedup();
        if stage_ids.len() != record.stages.len() {
            return Err(inconsistent("stage ids are not unique"));
        }

        Ok(Self {
            id: record.id,
            content_id: record.content_id,
            account_id: record.account_id,
            workflow_type: record.workflow_type,
            initiated_by: record.initiated_by,
            current_assignee: record.current_assignee,
            current_stage: record.current_stage,
            final_status: record.final_status,
            started_at: record.started_at,
            completed_at: record.completed_at,
            cancelled_at: record.cancelled_at,
            is_completed: record.is_completed,
            stages: record.stages,
            approvals: record.approvals,
            version: record.version,
            events: EventBuffer::new(),
        })
    }
}

impl AggregateRoot for Workflow {
    type Id = WorkflowId;
    type Event = WorkflowEvent;

    fn id(&self) -> &WorkflowId {
        &self.id
    }

    fn events(&self) -> &[WorkflowEvent] {
        self.events.as_slice()
    }

    fn clear_events(&mut self) {
        self.events.clear();
    }

    fn take_events(&mut self) -> Vec<WorkflowEvent> {
        self.events.take()
    }
}

// ============================================================================
// Domain Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    #[error("Workflow '{workflow_id}' is already {status}; cannot {operation}")]
    AlreadyTerminal {
        workflow_id: WorkflowId,
        status: WorkflowStatus,
        operation: &'static str,
    },

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error("Stage '{0}' is already defined")]
    DuplicateStage(StageId),

    #[error("Stage order {0} is already taken")]
    DuplicateStageOrder(u32),

    #[error("Stage '{0}' not found in workflow")]
    StageNotFound(StageId),

    #[error("Approval '{0}' is already recorded")]
    DuplicateApproval(ApprovalId),

    #[error("Record belongs to workflow '{actual}', expected '{expected}'")]
    ForeignRecord {
        expected: WorkflowId,
        actual: WorkflowId,
    },

    #[error("Stored workflow '{workflow_id}' is inconsistent: {detail}")]
    InconsistentState {
        workflow_id: WorkflowId,
        detail: &'static str,
    },
}

impl WorkflowError {
    /// Name of the offending parameter for invalid-argument failures.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument(e)
            | Self::Stage(StageError::InvalidArgument(e))
            | Self::Approval(ApprovalError::InvalidArgument(e)) => Some(e.parameter),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregate::DomainEvent;

    fn started() -> Workflow {
        Workflow::new("wf-1", "c-1", "acc-1", "ContentPublishing", "alice").unwrap()
    }

    fn event_types(workflow: &Workflow) -> Vec<&'static str> {
        workflow.events().iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_new_workflow_defaults() {
        let workflow = started();

        assert_eq!(workflow.id().as_str(), "wf-1");
        assert_eq!(workflow.content_id().as_str(), "c-1");
        assert_eq!(workflow.account_id().as_str(), "acc-1");
        assert_eq!(workflow.workflow_type(), "ContentPublishing");
        assert_eq!(workflow.initiated_by(), "alice");
        assert_eq!(workflow.current_assignee(), "alice");
        assert_eq!(workflow.current_stage(), "");
        assert_eq!(workflow.final_status(), "");
        assert!(!workflow.is_completed());
        assert!(workflow.completed_at().is_none());
        assert!(workflow.cancelled_at().is_none());
        assert!(workflow.duration().is_none());
        assert_eq!(workflow.status(), WorkflowStatus::Started);
        assert_eq!(event_types(&workflow), vec!["workflow_started"]);
    }

    #[test]
    fn test_new_workflow_names_first_empty_argument() {
        let cases = [
            (["", "c", "a", "t", "u"], "workflow_id"),
            (["w", "", "a", "t", "u"], "content_id"),
            (["w", "c", " ", "t", "u"], "account_id"),
            (["w", "c", "a", "", "u"], "workflow_type"),
            (["w", "c", "a", "t", ""], "initiated_by"),
        ];
        for ([w, c, a, t, u], parameter) in cases {
            let err = Workflow::new(w, c, a, t, u).unwrap_err();
            assert_eq!(err.parameter(), Some(parameter));
        }
    }

    #[test]
    fn test_complete_stage_sets_current_stage_only() {
        let mut workflow = started();
        workflow.define_stage("st-1", "Review", 1).unwrap();

        workflow.complete_stage("Review", "alice").unwrap();

        assert_eq!(workflow.current_stage(), "Review");
        assert!(!workflow.stages()[0].is_completed());
        assert_eq!(workflow.status(), WorkflowStatus::InProgress);
        assert_eq!(
            event_types(&workflow),
            vec!["workflow_started", "workflow_stage_completed"]
        );
    }

    #[test]
    fn test_failed_operation_buffers_nothing() {
        let mut workflow = started();

        assert!(workflow.complete_stage("", "alice").is_err());
        assert!(workflow.approve("bob", "", "ok").is_err());
        assert!(workflow.reject("bob", " ", "").is_err());
        assert!(workflow.reassign("alice", "", "alice").is_err());
        assert!(workflow.complete("", "Approved").is_err());
        assert!(workflow.cancel("bob", "").is_err());

        assert_eq!(workflow.events().len(), 1);
        assert_eq!(workflow.current_assignee(), "alice");
        assert!(!workflow.is_completed());
    }

    #[test]
    fn test_approve_and_reject_do_not_change_state() {
        let mut workflow = started();

        workflow.approve("bob", "L1", "looks fine").unwrap();
        workflow.reject("carol", "policy violation", "").unwrap();

        assert!(!workflow.is_completed());
        assert_eq!(workflow.current_stage(), "");
        assert_eq!(workflow.status(), WorkflowStatus::Started);
        assert_eq!(
            event_types(&workflow),
            vec!["workflow_started", "workflow_approved", "workflow_rejected"]
        );
    }

    #[test]
    fn test_reassign_updates_assignee() {
        let mut workflow = started();
        workflow.reassign("alice", "bob", "alice").unwrap();

        assert_eq!(workflow.current_assignee(), "bob");
        assert_eq!(workflow.initiated_by(), "alice");
        match workflow.events().last() {
            Some(WorkflowEvent::WorkflowReassigned {
                previous_assignee,
                new_assignee,
                reassigned_by,
                ..
            }) => {
                assert_eq!(previous_assignee, "alice");
                assert_eq!(new_assignee, "bob");
                assert_eq!(reassigned_by, "alice");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_complete_sets_terminal_fields() {
        let mut workflow = started();
        workflow.complete("bob", "Approved").unwrap();

        assert!(workflow.is_completed());
        assert_eq!(workflow.final_status(), "Approved");
        assert_eq!(workflow.status(), WorkflowStatus::Completed);
        let completed_at = workflow.completed_at().unwrap();
        assert!(workflow.cancelled_at().is_none());
        assert_eq!(workflow.duration(), Some(completed_at - workflow.started_at()));
        assert!(workflow.duration().unwrap() >= Duration::zero());
    }

    #[test]
    fn test_cancel_sets_terminal_fields() {
        let mut workflow = started();
        workflow.cancel("bob", "abandoned").unwrap();

        assert!(workflow.is_completed());
        assert_eq!(workflow.final_status(), "");
        assert_eq!(workflow.status(), WorkflowStatus::Cancelled);
        let cancelled_at = workflow.cancelled_at().unwrap();
        assert!(workflow.completed_at().is_none());
        assert_eq!(workflow.duration(), Some(cancelled_at - workflow.started_at()));
    }

    #[test]
    fn test_terminal_workflow_rejects_every_mutator() {
        let mut workflow = started();
        workflow.complete("bob", "Approved").unwrap();
        let completed_at = workflow.completed_at();
        let buffered = workflow.events().len();

        let results = [
            workflow.complete_stage("Review", "bob"),
            workflow.approve("bob", "L2", ""),
            workflow.reject("bob", "late", ""),
            workflow.reassign("bob", "carol", "bob"),
            workflow.complete("bob", "Approved"),
            workflow.cancel("bob", "oops"),
        ];
        for result in results {
            assert!(matches!(
                result,
                Err(WorkflowError::AlreadyTerminal {
                    status: WorkflowStatus::Completed,
                    ..
                })
            ));
        }
        assert!(workflow.define_stage("st-9", "Late", 9).is_err());

        assert_eq!(workflow.completed_at(), completed_at);
        assert!(workflow.cancelled_at().is_none());
        assert_eq!(workflow.events().len(), buffered);
    }

    #[test]
    fn test_define_stage_keeps_order_and_uniqueness() {
        let mut workflow = started();
        workflow.define_stage("st-3", "Publish", 3).unwrap();
        workflow.define_stage("st-1", "Draft", 1).unwrap();
        workflow.define_stage("st-2", "Review", 2).unwrap();

        let names: Vec<&str> = workflow.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Draft", "Review", "Publish"]);

        assert_eq!(
            workflow.define_stage("st-1", "Again", 4).unwrap_err(),
            WorkflowError::DuplicateStage(StageId::new("st-1").unwrap())
        );
        assert_eq!(
            workflow.define_stage("st-4", "Clash", 2).unwrap_err(),
            WorkflowError::DuplicateStageOrder(2)
        );
        assert_eq!(
            workflow.define_stage("st-5", "Zero", 0).unwrap_err().parameter(),
            Some("stage_order")
        );
        // Defining stages is a ledger operation, not an event.
        assert_eq!(workflow.events().len(), 1);
    }

    #[test]
    fn test_complete_stage_entry_marks_owned_stage() {
        let mut workflow = started();
        workflow.define_stage("st-1", "Review", 1).unwrap();
        let stage_id = StageId::new("st-1").unwrap();

        workflow.complete_stage_entry(&stage_id, "bob").unwrap();

        let stage = workflow.stage(&stage_id).unwrap();
        assert!(stage.is_completed());
        assert_eq!(stage.completed_by(), Some("bob"));
        assert_eq!(workflow.status(), WorkflowStatus::InProgress);
        assert!(workflow.stage_by_name("Review").is_some());

        assert!(matches!(
            workflow.complete_stage_entry(&stage_id, "carol"),
            Err(WorkflowError::Stage(StageError::AlreadyCompleted(_)))
        ));
        let unknown = StageId::new("st-9").unwrap();
        assert_eq!(
            workflow.complete_stage_entry(&unknown, "bob").unwrap_err(),
            WorkflowError::StageNotFound(unknown)
        );
        assert_eq!(
            workflow.complete_stage_entry(&stage_id, " ").unwrap_err().parameter(),
            Some("actor")
        );
    }

    #[test]
    fn test_terminal_workflow_rejects_stage_entry_completion() {
        for cancelled in [false, true] {
            let mut workflow = started();
            workflow.define_stage("st-1", "Review", 1).unwrap();
            if cancelled {
                workflow.cancel("bob", "abandoned").unwrap();
            } else {
                workflow.complete("bob", "Approved").unwrap();
            }
            let stage_id = StageId::new("st-1").unwrap();

            assert!(matches!(
                workflow.complete_stage_entry(&stage_id, "mallory"),
                Err(WorkflowError::AlreadyTerminal { .. })
            ));

            let stage = workflow.stage(&stage_id).unwrap();
            assert!(!stage.is_completed());
            assert_eq!(stage.completed_by(), None);
        }
    }

    #[test]
    fn test_record_approval_guards_ownership_and_duplicates() {
        let mut workflow = started();
        let approval =
            WorkflowApproval::new("ap-1", "wf-1", "bob", "L1", true, "ok", None).unwrap();
        workflow.record_approval(approval.clone()).unwrap();

        assert_eq!(
            workflow.record_approval(approval).unwrap_err(),
            WorkflowError::DuplicateApproval(ApprovalId::new("ap-1").unwrap())
        );

        let foreign =
            WorkflowApproval::new("ap-2", "wf-2", "bob", "L1", true, "ok", None).unwrap();
        assert!(matches!(
            workflow.record_approval(foreign),
            Err(WorkflowError::ForeignRecord { .. })
        ));

        let l2 = WorkflowApproval::new("ap-3", "wf-1", "dan", "L2", true, "", None).unwrap();
        workflow.record_approval(l2).unwrap();
        assert_eq!(workflow.approvals().len(), 2);
        assert_eq!(workflow.approvals_at_level("L2").count(), 1);
    }

    #[test]
    fn test_take_events_drains_buffer() {
        let mut workflow = started();
        workflow.approve("bob", "L1", "").unwrap();

        let drained = workflow.take_events();
        assert_eq!(drained.len(), 2);
        assert!(workflow.events().is_empty());
    }

    #[test]
    fn test_serde_roundtrip_drops_pending_events() {
        let mut workflow = started();
        workflow.define_stage("st-1", "Review", 1).unwrap();
        workflow.reassign("alice", "bob", "alice").unwrap();

        let json = serde_json::to_string(&workflow).unwrap();
        let reloaded: Workflow = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded.id(), workflow.id());
        assert_eq!(reloaded.current_assignee(), "bob");
        assert_eq!(reloaded.stages().len(), 1);
        assert!(reloaded.events().is_empty());
    }

    #[test]
    fn test_version_advances_on_mark_saved() {
        let mut workflow = started();
        assert_eq!(workflow.version(), 0);
        workflow.mark_saved();
        workflow.mark_saved();

        let json = serde_json::to_string(&workflow).unwrap();
        let reloaded: Workflow = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.version(), 2);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_terminal_state() {
        let mut workflow = started();
        workflow.complete("bob", "Approved").unwrap();
        let stored = serde_json::to_value(&workflow).unwrap();

        let mut both = stored.clone();
        both["cancelled_at"] = stored["completed_at"].clone();
        let err = serde_json::from_value::<Workflow>(both).unwrap_err();
        assert!(err.to_string().contains("both completed_at and cancelled_at"));

        let mut reopened = stored.clone();
        reopened["is_completed"] = serde_json::json!(false);
        let err = serde_json::from_value::<Workflow>(reopened).unwrap_err();
        assert!(err.to_string().contains("is_completed"));

        let reloaded: Workflow = serde_json::from_value(stored).unwrap();
        assert_eq!(reloaded.status(), WorkflowStatus::Completed);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_stage_ledger() {
        let mut workflow = started();
        workflow.define_stage("st-1", "Draft", 1).unwrap();
        workflow.define_stage("st-2", "Review", 2).unwrap();
        let stored = serde_json::to_value(&workflow).unwrap();

        let mut clashing = stored.clone();
        clashing["stages"][1]["order"] = serde_json::json!(1);
        assert!(serde_json::from_value::<Workflow>(clashing).is_err());

        let mut duplicated = stored.clone();
        duplicated["stages"][1]["id"] = serde_json::json!("st-1");
        assert!(serde_json::from_value::<Workflow>(duplicated).is_err());

        let mut foreign = stored;
        foreign["stages"][0]["workflow_id"] = serde_json::json!("wf-2");
        let err = serde_json::from_value::<Workflow>(foreign).unwrap_err();
        assert!(err.to_string().contains("another workflow"));
    }
}
