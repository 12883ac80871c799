// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Harvested Domain Events
//
// Application services drain an aggregate's buffered events after a successful
// save and publish them here. Audit writers, webhook dispatchers and
// notification senders subscribe. In-memory only: events not consumed before a
// restart are gone, which is acceptable because aggregate state never depends
// on them.

use crate::domain::events::{ContentEvent, WorkflowEvent};
use crate::domain::ids::WorkflowId;
use crate::domain::platform_config::EventBusConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Envelope for every event kind the bus carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stream", content = "event", rename_all = "snake_case")]
pub enum PlatformEvent {
    Workflow(WorkflowEvent),
    Content(ContentEvent),
}

/// Event bus for publishing and subscribing to platform events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<PlatformEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Subscribers that fall more than `capacity` events behind lose the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::from_config(&EventBusConfig::default())
    }

    /// Create an event bus sized by `spec.event_bus`
    pub fn from_config(config: &EventBusConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn publish_workflow_event(&self, event: WorkflowEvent) {
        self.publish(PlatformEvent::Workflow(event));
    }

    pub fn publish_content_event(&self, event: ContentEvent) {
        self.publish(PlatformEvent::Content(event));
    }

    /// Publish a drained batch in buffer order
    pub fn publish_workflow_events(&self, events: impl IntoIterator<Item = WorkflowEvent>) {
        for event in events {
            self.publish_workflow_event(event);
        }
    }

    pub fn publish_content_events(&self, events: impl IntoIterator<Item = ContentEvent>) {
        for event in events {
            self.publish_content_event(event);
        }
    }

    fn publish(&self, event: PlatformEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all platform events
    pub fn subscribe(&self) -> EventReceiver {
        let receiver = self.sender.subscribe();
        EventReceiver { receiver }
    }

    /// Subscribe to the events of a single workflow
    pub fn subscribe_workflow(&self, workflow_id: WorkflowId) -> WorkflowEventReceiver {
        let receiver = self.sender.subscribe();
        WorkflowEventReceiver {
            receiver,
            workflow_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all platform events
pub struct EventReceiver {
    receiver: broadcast::Receiver<PlatformEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<PlatformEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<PlatformEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one workflow's events (filtered)
pub struct WorkflowEventReceiver {
    receiver: broadcast::Receiver<PlatformEvent>,
    workflow_id: WorkflowId,
}

impl WorkflowEventReceiver {
    /// Receive the next event for the subscribed workflow, skipping all others
    pub async fn recv(&mut self) -> Result<WorkflowEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;

            if let PlatformEvent::Workflow(workflow_event) = event {
                if workflow_event.workflow_id() == &self.workflow_id {
                    return Ok(workflow_event);
                }
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
