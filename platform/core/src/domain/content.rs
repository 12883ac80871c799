// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Content Domain Model
//!
//! The publishable item a [`crate::domain::workflow::Workflow`] gates. Workflows
//! refer to content by id only; the publishing layer loads both and decides.
//!
//! # State Machine
//!
//! ```text
//! Draft ──publish──▶ Published ──unpublish──▶ Unpublished
//!   │                    ▲                        │
//!   │                    └─────────publish────────┘
//!   └──────────── archive (from any state) ──────────▶ Archived
//! ```
//!
//! Every revision is kept. `restore_version` never rewrites history; it copies
//! an old revision into a new head version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregate::{
    require_at_least, require_non_empty, AggregateRoot, EventBuffer, InvalidArgument,
};
use crate::domain::events::ContentEvent;
use crate::domain::ids::{AccountId, ContentId, WorkflowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Unpublished,
    Archived,
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Unpublished => "unpublished",
            Self::Archived => "archived",
        };
        write!(f, "{}", label)
    }
}

/// One saved version of the title and body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRevision {
    pub version: u32,
    pub title: String,
    pub body: String,
    pub revised_by: String,
    pub revised_at: DateTime<Utc>,
}

/// Content Aggregate Root
///
/// # Invariants
/// - `revisions` is never empty and versions run 1..=n without gaps
/// - `published_version` is set while `status == Published`
/// - `Archived` is terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    id: ContentId,
    account_id: AccountId,
    content_type: String,
    status: ContentStatus,
    revisions: Vec<ContentRevision>,
    published_version: Option<u32>,
    published_by: Option<String>,
    published_at: Option<DateTime<Utc>>,
    /// Workflow whose completion authorised the last publish.
    publishing_workflow: Option<WorkflowId>,
    archived_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: EventBuffer<ContentEvent>,
}

impl Content {
    /// Create a draft at version 1. Buffers `ContentCreated`.
    pub fn new(
        content_id: impl Into<String>,
        account_id: impl Into<String>,
        content_type: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        author: impl Into<String>,
    ) -> Result<Self, ContentError> {
        let id = ContentId::new(content_id)?;
        let account_id = AccountId::new(account_id)?;
        let content_type = content_type.into();
        require_non_empty("content_type", &content_type)?;
        let title = title.into();
        require_non_empty("title", &title)?;
        let author = author.into();
        require_non_empty("author", &author)?;

        let now = Utc::now();
        let mut content = Self {
            id,
            account_id,
            content_type,
            status: ContentStatus::Draft,
            revisions: vec![ContentRevision {
                version: 1,
                title: title.clone(),
                body: body.into(),
                revised_by: author.clone(),
                revised_at: now,
            }],
            published_version: None,
            published_by: None,
            published_at: None,
            publishing_workflow: None,
            archived_at: None,
            created_by: author.clone(),
            created_at: now,
            updated_at: now,
            events: EventBuffer::new(),
        };

        content.events.record(ContentEvent::ContentCreated {
            content_id: content.id.clone(),
            account_id: content.account_id.clone(),
            content_type: content.content_type.clone(),
            title,
            created_by: author,
            created_at: now,
        });

        Ok(content)
    }

    /// Save a new version. The published version, if any, stays live until the
    /// next publish.
    pub fn revise(&mut self, title: &str, body: &str, actor: &str) -> Result<u32, ContentError> {
        require_non_empty("title", title)?;
        require_non_empty("actor", actor)?;
        self.ensure_not_archived("revise")?;

        let now = Utc::now();
        let version = self.push_revision(title, body, actor, now);
        self.events.record(ContentEvent::ContentRevised {
            content_id: self.id.clone(),
            version,
            revised_by: actor.to_string(),
            revised_at: now,
        });
        Ok(version)
    }

    /// Publish the head version. Allowed from `Draft` and `Unpublished`.
    pub fn publish(
        &mut self,
        actor: &str,
        workflow_id: Option<&WorkflowId>,
    ) -> Result<(), ContentError> {
        require_non_empty("actor", actor)?;
        match self.status {
            ContentStatus::Draft | ContentStatus::Unpublished => {}
            from => return Err(self.invalid_transition(from, "publish")),
        }

        let now = Utc::now();
        let version = self.current_version();
        self.status = ContentStatus::Published;
        self.published_version = Some(version);
        self.published_by = Some(actor.to_string());
        self.published_at = Some(now);
        self.publishing_workflow = workflow_id.cloned();
        self.updated_at = now;

        self.events.record(ContentEvent::ContentPublished {
            content_id: self.id.clone(),
            version,
            published_by: actor.to_string(),
            workflow_id: workflow_id.cloned(),
            published_at: now,
        });
        Ok(())
    }

    pub fn unpublish(&mut self, actor: &str, reason: &str) -> Result<(), ContentError> {
        require_non_empty("actor", actor)?;
        require_non_empty("reason", reason)?;
        if self.status != ContentStatus::Published {
            return Err(self.invalid_transition(self.status, "unpublish"));
        }

        let now = Utc::now();
        self.status = ContentStatus::Unpublished;
        self.published_version = None;
        self.updated_at = now;

        self.events.record(ContentEvent::ContentUnpublished {
            content_id: self.id.clone(),
            unpublished_by: actor.to_string(),
            reason: reason.to_string(),
            unpublished_at: now,
        });
        Ok(())
    }

    pub fn archive(&mut self, actor: &str, reason: &str) -> Result<(), ContentError> {
        require_non_empty("actor", actor)?;
        require_non_empty("reason", reason)?;
        self.ensure_not_archived("archive")?;

        let now = Utc::now();
        self.status = ContentStatus::Archived;
        self.published_version = None;
        self.archived_at = Some(now);
        self.updated_at = now;

        self.events.record(ContentEvent::ContentArchived {
            content_id: self.id.clone(),
            archived_by: actor.to_string(),
            reason: reason.to_string(),
            archived_at: now,
        });
        Ok(())
    }

    /// Copy revision `version` into a new head version and return its number.
    pub fn restore_version(&mut self, version: u32, actor: &str) -> Result<u32, ContentError> {
        require_at_least("version", version, 1)?;
        require_non_empty("actor", actor)?;
        let source = self
            .revision(version)
            .cloned()
            .ok_or_else(|| InvalidArgument::new("version", format!("revision {} does not exist", version)))?;
        self.ensure_not_archived("restore a version")?;

        let now = Utc::now();
        let new_version = self.push_revision(&source.title, &source.body, actor, now);
        self.events.record(ContentEvent::ContentVersionRestored {
            content_id: self.id.clone(),
            restored_version: version,
            new_version,
            restored_by: actor.to_string(),
            restored_at: now,
        });
        Ok(new_version)
    }

    fn push_revision(&mut self, title: &str, body: &str, actor: &str, at: DateTime<Utc>) -> u32 {
        let version = self.current_version() + 1;
        self.revisions.push(ContentRevision {
            version,
            title: title.to_string(),
            body: body.to_string(),
            revised_by: actor.to_string(),
            revised_at: at,
        });
        self.updated_at = at;
        version
    }

    fn ensure_not_archived(&self, operation: &'static str) -> Result<(), ContentError> {
        if self.status == ContentStatus::Archived {
            return Err(self.invalid_transition(ContentStatus::Archived, operation));
        }
        Ok(())
    }

    fn invalid_transition(&self, from: ContentStatus, operation: &'static str) -> ContentError {
        ContentError::InvalidTransition {
            content_id: self.id.clone(),
            from,
            operation,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn status(&self) -> ContentStatus {
        self.status
    }

    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }

    pub fn current_version(&self) -> u32 {
        self.revisions.last().map(|r| r.version).unwrap_or(0)
    }

    pub fn head(&self) -> Option<&ContentRevision> {
        self.revisions.last()
    }

    pub fn title(&self) -> &str {
        self.head().map(|r| r.title.as_str()).unwrap_or_default()
    }

    pub fn body(&self) -> &str {
        self.head().map(|r| r.body.as_str()).unwrap_or_default()
    }

    pub fn revision(&self, version: u32) -> Option<&ContentRevision> {
        self.revisions.iter().find(|r| r.version == version)
    }

    pub fn revisions(&self) -> &[ContentRevision] {
        &self.revisions
    }

    pub fn published_version(&self) -> Option<u32> {
        self.published_version
    }

    pub fn published_by(&self) -> Option<&str> {
        self.published_by.as_deref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn publishing_workflow(&self) -> Option<&WorkflowId> {
        self.publishing_workflow.as_ref()
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl AggregateRoot for Content {
    type Id = ContentId;
    type Event = ContentEvent;

    fn id(&self) -> &ContentId {
        &self.id
    }

    fn events(&self) -> &[ContentEvent] {
        self.events.as_slice()
    }

    fn clear_events(&mut self) {
        self.events.clear();
    }

    fn take_events(&mut self) -> Vec<ContentEvent> {
        self.events.take()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    #[error("Content '{content_id}' is {from}; cannot {operation}")]
    InvalidTransition {
        content_id: ContentId,
        from: ContentStatus,
        operation: &'static str,
    },
}
