// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow approval ledger entry.
//!
//! One record per approve/reject decision. Records are immutable once built;
//! a correction is a new record, so the ledger keeps the full decision history
//! across levels and resubmissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregate::{require_non_empty, InvalidArgument};
use crate::domain::ids::{ApprovalId, WorkflowId};

/// Outcome of a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

/// Immutable approve/reject decision at a named level (e.g. "L1", "L2").
///
/// `rejection_reason` is only ever populated for rejections. A reason passed
/// alongside an approval is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowApproval {
    id: ApprovalId,
    workflow_id: WorkflowId,
    approver: String,
    level: String,
    is_approved: bool,
    comments: String,
    rejection_reason: Option<String>,
    decided_at: DateTime<Utc>,
}

impl WorkflowApproval {
    /// Build a decision record.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::InvalidArgument`] when an identifier, the approver or the
    /// level is empty, or when a rejection carries no reason.
    pub fn new(
        approval_id: impl Into<String>,
        workflow_id: impl Into<String>,
        approver: impl Into<String>,
        level: impl Into<String>,
        is_approved: bool,
        comments: impl Into<String>,
        rejection_reason: Option<&str>,
    ) -> Result<Self, ApprovalError> {
        let id = ApprovalId::new(approval_id)?;
        let workflow_id = WorkflowId::new(workflow_id)?;
        let approver = approver.into();
        require_non_empty("approver", &approver)?;
        let level = level.into();
        require_non_empty("level", &level)?;

        let rejection_reason = if is_approved {
            None
        } else {
            let reason = rejection_reason.unwrap_or_default();
            require_non_empty("rejection_reason", reason)?;
            Some(reason.to_string())
        };

        Ok(Self {
            id,
            workflow_id,
            approver,
            level,
            is_approved,
            comments: comments.into(),
            rejection_reason,
            decided_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &ApprovalId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn approver(&self) -> &str {
        &self.approver
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn is_approved(&self) -> bool {
        self.is_approved
    }

    pub fn decision(&self) -> Decision {
        if self.is_approved {
            Decision::Approved
        } else {
            Decision::Rejected
        }
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn decided_at(&self) -> DateTime<Utc> {
        self.decided_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
}
