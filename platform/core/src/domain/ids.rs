// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identifier value objects.
//!
//! Identifiers are opaque, non-empty strings assigned by the caller (the
//! persistence layer usually hands out UUIDs, see `generate()`). Cross-aggregate
//! references such as a workflow's `ContentId` are plain identifiers: no object
//! is loaded and nothing cascades.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregate::{require_non_empty, InvalidArgument};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $parameter:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a caller-supplied identifier. Empty or whitespace-only values are rejected.
            pub fn new(value: impl Into<String>) -> Result<Self, InvalidArgument> {
                let value = value.into();
                require_non_empty($parameter, &value)?;
                Ok(Self(value))
            }

            /// Generate a fresh random identifier (UUID v4).
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(
    /// Identity of a [`crate::domain::workflow::Workflow`] instance.
    WorkflowId,
    "workflow_id"
);
opaque_id!(
    /// Identity of a [`crate::domain::content::Content`] item.
    ContentId,
    "content_id"
);
opaque_id!(
    /// Tenant account that owns workflows and content.
    AccountId,
    "account_id"
);
opaque_id!(
    /// Identity of a [`crate::domain::stage::WorkflowStage`].
    StageId,
    "stage_id"
);
opaque_id!(
    /// Identity of a [`crate::domain::approval::WorkflowApproval`].
    ApprovalId,
    "approval_id"
);
