// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events buffered by the platform aggregates.
//!
//! Events are a side channel for audit trail entries, webhook deliveries and
//! notifications. Aggregate state is never rebuilt from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregate::DomainEvent;
use crate::domain::ids::{AccountId, ContentId, WorkflowId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    WorkflowStarted {
        workflow_id: WorkflowId,
        content_id: ContentId,
        account_id: AccountId,
        workflow_type: String,
        initiated_by: String,
        started_at: DateTime<Utc>,
    },
    WorkflowStageCompleted {
        workflow_id: WorkflowId,
        stage_name: String,
        completed_by: String,
        completed_at: DateTime<Utc>,
    },
    WorkflowApproved {
        workflow_id: WorkflowId,
        approved_by: String,
        level: String,
        comments: String,
        approved_at: DateTime<Utc>,
    },
    WorkflowRejected {
        workflow_id: WorkflowId,
        rejected_by: String,
        reason: String,
        comments: String,
        rejected_at: DateTime<Utc>,
    },
    WorkflowReassigned {
        workflow_id: WorkflowId,
        previous_assignee: String,
        new_assignee: String,
        reassigned_by: String,
        reassigned_at: DateTime<Utc>,
    },
    WorkflowCompleted {
        workflow_id: WorkflowId,
        completed_by: String,
        final_status: String,
        duration_ms: i64,
        completed_at: DateTime<Utc>,
    },
    WorkflowCancelled {
        workflow_id: WorkflowId,
        cancelled_by: String,
        reason: String,
        duration_ms: i64,
        cancelled_at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    pub fn workflow_id(&self) -> &WorkflowId {
        match self {
            WorkflowEvent::WorkflowStarted { workflow_id, .. }
            | WorkflowEvent::WorkflowStageCompleted { workflow_id, .. }
            | WorkflowEvent::WorkflowApproved { workflow_id, .. }
            | WorkflowEvent::WorkflowRejected { workflow_id, .. }
            | WorkflowEvent::WorkflowReassigned { workflow_id, .. }
            | WorkflowEvent::WorkflowCompleted { workflow_id, .. }
            | WorkflowEvent::WorkflowCancelled { workflow_id, .. } => workflow_id,
        }
    }

    /// The user the event is attributed to.
    pub fn actor(&self) -> &str {
        match self {
            WorkflowEvent::WorkflowStarted { initiated_by, .. } => initiated_by,
            WorkflowEvent::WorkflowStageCompleted { completed_by, .. } => completed_by,
            WorkflowEvent::WorkflowApproved { approved_by, .. } => approved_by,
            WorkflowEvent::WorkflowRejected { rejected_by, .. } => rejected_by,
            WorkflowEvent::WorkflowReassigned { reassigned_by, .. } => reassigned_by,
            WorkflowEvent::WorkflowCompleted { completed_by, .. } => completed_by,
            WorkflowEvent::WorkflowCancelled { cancelled_by, .. } => cancelled_by,
        }
    }

    /// True for the two events that end a workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::WorkflowCompleted { .. } | WorkflowEvent::WorkflowCancelled { .. }
        )
    }
}

impl DomainEvent for WorkflowEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::WorkflowStarted { .. } => "workflow_started",
            WorkflowEvent::WorkflowStageCompleted { .. } => "workflow_stage_completed",
            WorkflowEvent::WorkflowApproved { .. } => "workflow_approved",
            WorkflowEvent::WorkflowRejected { .. } => "workflow_rejected",
            WorkflowEvent::WorkflowReassigned { .. } => "workflow_reassigned",
            WorkflowEvent::WorkflowCompleted { .. } => "workflow_completed",
            WorkflowEvent::WorkflowCancelled { .. } => "workflow_cancelled",
        }
    }

    fn aggregate_id(&self) -> &str {
        self.workflow_id().as_str()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WorkflowEvent::WorkflowStarted { started_at, .. } => *started_at,
            WorkflowEvent::WorkflowStageCompleted { completed_at, .. } => *completed_at,
            WorkflowEvent::WorkflowApproved { approved_at, .. } => *approved_at,
            WorkflowEvent::WorkflowRejected { rejected_at, .. } => *rejected_at,
            WorkflowEvent::WorkflowReassigned { reassigned_at, .. } => *reassigned_at,
            WorkflowEvent::WorkflowCompleted { completed_at, .. } => *completed_at,
            WorkflowEvent::WorkflowCancelled { cancelled_at, .. } => *cancelled_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentEvent {
    ContentCreated {
        content_id: ContentId,
        account_id: AccountId,
        content_type: String,
        title: String,
        created_by: String,
        created_at: DateTime<Utc>,
    },
    ContentRevised {
        content_id: ContentId,
        version: u32,
        revised_by: String,
        revised_at: DateTime<Utc>,
    },
    ContentPublished {
        content_id: ContentId,
        version: u32,
        published_by: String,
        /// Workflow whose completion authorised the publish, if any.
        workflow_id: Option<WorkflowId>,
        published_at: DateTime<Utc>,
    },
    ContentUnpublished {
        content_id: ContentId,
        unpublished_by: String,
        reason: String,
        unpublished_at: DateTime<Utc>,
    },
    ContentArchived {
        content_id: ContentId,
        archived_by: String,
        reason: String,
        archived_at: DateTime<Utc>,
    },
    ContentVersionRestored {
        content_id: ContentId,
        restored_version: u32,
        new_version: u32,
        restored_by: String,
        restored_at: DateTime<Utc>,
    },
}

impl ContentEvent {
    pub fn content_id(&self) -> &ContentId {
        match self {
            ContentEvent::ContentCreated { content_id, .. }
            | ContentEvent::ContentRevised { content_id, .. }
            | ContentEvent::ContentPublished { content_id, .. }
            | ContentEvent::ContentUnpublished { content_id, .. }
            | ContentEvent::ContentArchived { content_id, .. }
            | ContentEvent::ContentVersionRestored { content_id, .. } => content_id,
        }
    }
}

impl DomainEvent for ContentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ContentEvent::ContentCreated { .. } => "content_created",
            ContentEvent::ContentRevised { .. } => "content_revised",
            ContentEvent::ContentPublished { .. } => "content_published",
            ContentEvent::ContentUnpublished { .. } => "content_unpublished",
            ContentEvent::ContentArchived { .. } => "content_archived",
            ContentEvent::ContentVersionRestored { .. } => "content_version_restored",
        }
    }

    fn aggregate_id(&self) -> &str {
        self.content_id().as_str()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ContentEvent::ContentCreated { created_at, .. } => *created_at,
            ContentEvent::ContentRevised { revised_at, .. } => *revised_at,
            ContentEvent::ContentPublished { published_at, .. } => *published_at,
            ContentEvent::ContentUnpublished { unpublished_at, .. } => *unpublished_at,
            ContentEvent::ContentArchived { archived_at, .. } => *archived_at,
            ContentEvent::ContentVersionRestored { restored_at, .. } => *restored_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── WorkflowEvent ─────────────────────────────────────────────────────────

    #[test]
    fn test_workflow_event_tagged_serialization() {
        let event = WorkflowEvent::WorkflowApproved {
            workflow_id: WorkflowId::new("wf-1").unwrap(),
            approved_by: "bob".to_string(),
            level: "L1".to_string(),
            comments: "ok".to_string(),
            approved_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "workflow_approved");
        assert_eq!(json["workflow_id"], "wf-1");
        assert_eq!(json["level"], "L1");

        let deserialized: WorkflowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_workflow_event_accessors() {
        let at = Utc::now();
        let event = WorkflowEvent::WorkflowCancelled {
            workflow_id: WorkflowId::new("wf-9").unwrap(),
            cancelled_by: "carol".to_string(),
            reason: "abandoned".to_string(),
            duration_ms: 10,
            cancelled_at: at,
        };
        assert_eq!(event.event_type(), "workflow_cancelled");
        assert_eq!(event.aggregate_id(), "wf-9");
        assert_eq!(event.actor(), "carol");
        assert_eq!(event.occurred_at(), at);
        assert!(event.is_terminal());
    }

    // ── ContentEvent ──────────────────────────────────────────────────────────

    #[test]
    fn test_content_event_published_carries_workflow() {
        let event = ContentEvent::ContentPublished {
            content_id: ContentId::new("c-1").unwrap(),
            version: 3,
            published_by: "bob".to_string(),
            workflow_id: Some(WorkflowId::new("wf-1").unwrap()),
            published_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"content_published\""));
        assert!(json.contains("wf-1"));
        assert_eq!(event.aggregate_id(), "c-1");
    }
}
