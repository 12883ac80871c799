// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Publishing Domain Layer
//!
//! Pure policy types. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`policy`] | `ApprovalPolicy`, `PolicyDecision` |

pub mod policy;

pub use policy::*;
