// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `atrium-core` — Aggregate & Approval Workflow Core
//!
//! Every mutable business entity of the Atrium administration platform follows
//! one discipline: state changes happen only through guarded operations that
//! validate their inputs, mutate the aggregate and buffer an immutable domain
//! event describing the change. Callers persist the aggregate, harvest the
//! buffered events (audit rows, webhooks, notifications) and then clear them.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `EventBuffer`, `Workflow`, `WorkflowStage`, `WorkflowApproval`, `Content`, events, repository traits, configuration |
//! | [`application`] | Application | `WorkflowService` command use-cases |
//! | [`infrastructure`] | Infrastructure | `EventBus`, in-memory repositories, logging bootstrap |

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
