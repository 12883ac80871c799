// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure domain types. No I/O; the only ambient dependency is the wall clock,
//! read once per aggregate operation.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`aggregate`] | `EventBuffer`, `AggregateRoot`, `DomainEvent`, `InvalidArgument` |
//! | [`ids`] | `WorkflowId`, `ContentId`, `AccountId`, `StageId`, `ApprovalId` |
//! | [`workflow`] | `Workflow` aggregate root, `WorkflowStatus`, `WorkflowError` |
//! | [`stage`] | `WorkflowStage` |
//! | [`approval`] | `WorkflowApproval` |
//! | [`content`] | `Content` aggregate root |
//! | [`events`] | `WorkflowEvent`, `ContentEvent` |
//! | [`repository`] | `WorkflowRepository`, `ContentRepository` |
//! | [`platform_config`] | `PlatformConfigManifest` |

pub mod aggregate;
pub mod approval;
pub mod content;
pub mod events;
pub mod ids;
pub mod platform_config;
pub mod repository;
pub mod stage;
pub mod workflow;
