// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Aggregate Framework
//!
//! The discipline shared by every mutable aggregate of the platform:
//!
//! 1. A mutator validates all of its inputs with the guards in this module
//!    and fails fast, before any field is touched.
//! 2. On success it mutates the aggregate and appends the event(s) describing
//!    the change to the aggregate's private [`EventBuffer`].
//! 3. The caller persists the aggregate, harvests the buffer through
//!    [`AggregateRoot::events`] / [`AggregateRoot::take_events`] and clears it
//!    only after the commit is durable.
//!
//! Buffers are owned by a single in-memory aggregate instance. There is no
//! ambient event bus at this layer and nothing here is shared across threads.
//!
//! ```text
//! load ──▶ aggregate.op(..)? ──▶ repository.save(&aggregate) ──▶ aggregate.take_events() ──▶ publish
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Invariant Guards
// ============================================================================

/// A required argument was empty or violated a numeric invariant.
///
/// Always attributable to exactly one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid argument '{parameter}': {reason}")]
pub struct InvalidArgument {
    pub parameter: &'static str,
    pub reason: String,
}

impl InvalidArgument {
    pub fn new(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Reject empty and whitespace-only strings.
pub fn require_non_empty(parameter: &'static str, value: &str) -> Result<(), InvalidArgument> {
    if value.trim().is_empty() {
        return Err(InvalidArgument::new(parameter, "must not be empty"));
    }
    Ok(())
}

/// Reject values below `min`.
pub fn require_at_least<T>(parameter: &'static str, value: T, min: T) -> Result<(), InvalidArgument>
where
    T: PartialOrd + fmt::Display,
{
    if value < min {
        return Err(InvalidArgument::new(
            parameter,
            format!("must be at least {}, got {}", min, value),
        ));
    }
    Ok(())
}

// ============================================================================
// Domain Events
// ============================================================================

/// An immutable record of one state change, buffered by an aggregate.
pub trait DomainEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// Stable snake_case event name (e.g. `workflow_started`).
    fn event_type(&self) -> &'static str;

    /// Identifier of the aggregate instance that emitted the event.
    fn aggregate_id(&self) -> &str;

    /// When the change happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Append-only, per-aggregate buffer of pending domain events.
///
/// Events keep invocation order. Nothing is ever removed or reordered except
/// by [`EventBuffer::clear`] / [`EventBuffer::take`], which the persistence
/// caller invokes after a durable commit.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBuffer<E> {
    pending: Vec<E>,
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<E: DomainEvent> EventBuffer<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Only the owning aggregate holds a `&mut` to its buffer.
    pub fn record(&mut self, event: E) {
        debug!(
            event_type = event.event_type(),
            aggregate_id = event.aggregate_id(),
            "Buffered domain event"
        );
        self.pending.push(event);
    }

    pub fn as_slice(&self) -> &[E] {
        &self.pending
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drain every pending event, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Read side of the aggregate discipline.
///
/// Mutation is never part of this trait: each aggregate exposes its own named,
/// guarded operations instead of setters.
pub trait AggregateRoot {
    type Id: Clone + Eq + fmt::Debug + fmt::Display;
    type Event: DomainEvent;

    fn id(&self) -> &Self::Id;

    /// Pending events in invocation order.
    fn events(&self) -> &[Self::Event];

    /// Empty the buffer. Call only after the matching state is committed.
    fn clear_events(&mut self);

    /// Copy out and clear the pending events in one step.
    fn take_events(&mut self) -> Vec<Self::Event> {
        let drained = self.events().to_vec();
        self.clear_events();
        drained
    }
}
