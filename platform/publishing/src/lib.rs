// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `atrium-publishing` — Content Publication Gate
//!
//! Interprets workflow outcomes as permission to publish content. The
//! `Workflow` aggregate only records decisions; this crate owns the policy that
//! says which decisions are enough, and the action taken once a workflow
//! finishes.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `ApprovalPolicy`, `PolicyDecision` |
//! | [`application`] | Application | `ContentGate` use-case trait, `StandardContentGate`, completion listener |
//!
//! ## Key Concepts
//!
//! - **Standing decision**: the most recent approval or rejection recorded at a level.
//! - **Gate**: a completed workflow publishes its content only when it finished
//!   with the approved status and every required level stands approved.
//! - **Missing content** is an outcome, not an error. Content may be deleted
//!   while its workflow is still running.

pub mod application;
pub mod domain;

pub use domain::*;
