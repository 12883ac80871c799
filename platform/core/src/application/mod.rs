// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod workflow_service;

pub use workflow_service::{
    StageDefinition, StandardWorkflowService, StartWorkflowRequest, WorkflowService,
};
