// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! [`crate::domain::repository`].
//!
//! ## In-Memory Repositories
//!
//! Thread-safe `HashMap`-backed storage for development and tests:
//! - **InMemoryWorkflowRepository**
//! - **InMemoryContentRepository**
//!
//! Aggregates are cloned in and out. The clone carries no pending events
//! because callers drain the buffer before or right after `save`, and a
//! stored copy must never re-emit them.
//!
//! Workflow saves are version-checked: a save from a copy loaded before
//! another writer's save fails with `RepositoryError::Conflict`.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::aggregate::AggregateRoot;
use crate::domain::content::Content;
use crate::domain::ids::{AccountId, ContentId, WorkflowId};
use crate::domain::repository::{ContentRepository, RepositoryError, WorkflowRepository};
use crate::domain::workflow::Workflow;

#[derive(Clone, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<RwLock<HashMap<WorkflowId, Workflow>>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        // Check and insert under one write lock
        let mut workflows = self.workflows.write();
        let current = workflows.get(workflow.id()).map(Workflow::version).unwrap_or(0);
        if current != workflow.version() {
            return Err(RepositoryError::Conflict {
                entity: format!("workflow {}", workflow.id()),
                expected: workflow.version(),
                actual: current,
            });
        }

        let mut stored = workflow.clone();
        stored.clear_events();
        stored.mark_saved();
        workflows.insert(workflow.id().clone(), stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        Ok(self.workflows.read().get(id).cloned())
    }

    async fn list_by_account(&self, account_id: &AccountId) -> Result<Vec<Workflow>, RepositoryError> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .read()
            .values()
            .filter(|w| w.account_id() == account_id)
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.started_at());
        Ok(workflows)
    }

    async fn list_by_content(&self, content_id: &ContentId) -> Result<Vec<Workflow>, RepositoryError> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .read()
            .values()
            .filter(|w| w.content_id() == content_id)
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.started_at());
        Ok(workflows)
    }

    async fn delete(&self, id: &WorkflowId) -> Result<(), RepositoryError> {
        match self.workflows.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(format!("workflow {}", id))),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryContentRepository {
    items: Arc<RwLock<HashMap<ContentId, Content>>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn save(&self, content: &Content) -> Result<(), RepositoryError> {
        let mut stored = content.clone();
        stored.clear_events();
        self.items.write().insert(content.id().clone(), stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<Content>, RepositoryError> {
        Ok(self.items.read().get(id).cloned())
    }

    async fn list_by_account(&self, account_id: &AccountId) -> Result<Vec<Content>, RepositoryError> {
        let mut items: Vec<Content> = self
            .items
            .read()
            .values()
            .filter(|c| c.account_id() == account_id)
            .cloned()
            .collect();
        items.sort_by_key(|c| c.created_at());
        Ok(items)
    }

    async fn delete(&self, id: &ContentId) -> Result<(), RepositoryError> {
        match self.items.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(format!("content {}", id))),
        }
    }
}
