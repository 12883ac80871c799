// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Approval Policy
//!
//! Decides whether a workflow's approval ledger is enough to publish.
//!
//! Only the standing (most recently recorded) decision at each level counts,
//! so a rejection can be overturned by a later approval at the same level and
//! vice versa.

use serde::{Deserialize, Serialize};

use atrium_core::domain::approval::WorkflowApproval;
use atrium_core::domain::platform_config::PublishingConfig;
use atrium_core::domain::workflow::{Workflow, WorkflowStatus};

/// Levels that must stand approved, plus the final status that marks an
/// approved completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub required_levels: Vec<String>,
    pub approved_status: String,
}

/// Result of evaluating a ledger against an [`ApprovalPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    /// Every required level stands approved
    Satisfied,
    /// No rejection stands, but some levels have no decision yet
    Pending { missing_levels: Vec<String> },
    /// A required level's standing decision is a rejection
    Blocked {
        level: String,
        rejected_by: String,
        reason: String,
    },
}

impl PolicyDecision {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

impl ApprovalPolicy {
    pub fn new(required_levels: impl IntoIterator<Item = impl Into<String>>, approved_status: impl Into<String>) -> Self {
        Self {
            required_levels: required_levels.into_iter().map(Into::into).collect(),
            approved_status: approved_status.into(),
        }
    }

    pub fn from_config(config: &PublishingConfig) -> Self {
        Self {
            required_levels: config.required_levels.clone(),
            approved_status: config.approved_status.clone(),
        }
    }

    /// Evaluate an approval ledger in recorded order.
    ///
    /// Rejections are checked before missing levels: a blocked workflow reports
    /// `Blocked` even when other levels are still open.
    pub fn evaluate(&self, approvals: &[WorkflowApproval]) -> PolicyDecision {
        let mut missing_levels = Vec::new();

        for level in &self.required_levels {
            match standing_decision(approvals, level) {
                Some(approval) if approval.is_approved() => {}
                Some(approval) => {
                    return PolicyDecision::Blocked {
                        level: level.clone(),
                        rejected_by: approval.approver().to_string(),
                        reason: approval.rejection_reason().unwrap_or_default().to_string(),
                    };
                }
                None => missing_levels.push(level.clone()),
            }
        }

        if missing_levels.is_empty() {
            PolicyDecision::Satisfied
        } else {
            PolicyDecision::Pending { missing_levels }
        }
    }

    /// True when the workflow completed with the approved status.
    pub fn is_approved_completion(&self, workflow: &Workflow) -> bool {
        workflow.status() == WorkflowStatus::Completed
            && workflow.final_status() == self.approved_status
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self::from_config(&PublishingConfig::default())
    }
}

fn standing_decision<'a>(approvals: &'a [WorkflowApproval], level: &str) -> Option<&'a WorkflowApproval> {
    approvals.iter().rev().find(|a| a.level() == level)
}
