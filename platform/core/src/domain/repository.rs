// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root: one repository per aggregate,
//! interface defined here, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `WorkflowRepository` | `Workflow` | `InMemoryWorkflowRepository` |
//! | `ContentRepository` | `Content` | `InMemoryContentRepository` |
//!
//! Repositories store aggregate state only. Pending domain events are never
//! persisted; callers drain them with `AggregateRoot::take_events` after a
//! successful `save`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::content::Content;
use crate::domain::ids::{AccountId, ContentId, WorkflowId};
use crate::domain::workflow::Workflow;

/// Repository interface for Workflow aggregates
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Save workflow (create or update).
    ///
    /// Succeeds only when the stored version equals `workflow.version()` (0 for
    /// a workflow that was never saved); the stored copy advances by one.
    /// Otherwise fails with [`RepositoryError::Conflict`].
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError>;

    /// Workflows of one tenant, oldest first
    async fn list_by_account(&self, account_id: &AccountId) -> Result<Vec<Workflow>, RepositoryError>;

    /// Workflows gating a given content item
    async fn list_by_content(&self, content_id: &ContentId) -> Result<Vec<Workflow>, RepositoryError>;

    async fn delete(&self, id: &WorkflowId) -> Result<(), RepositoryError>;
}

/// Repository interface for Content aggregates
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Save content (create or update)
    async fn save(&self, content: &Content) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<Content>, RepositoryError>;

    /// Content of one tenant, oldest first
    async fn list_by_account(&self, account_id: &AccountId) -> Result<Vec<Content>, RepositoryError>;

    async fn delete(&self, id: &ContentId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Concurrent update of {entity}: expected version {expected}, found {actual}")]
    Conflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
