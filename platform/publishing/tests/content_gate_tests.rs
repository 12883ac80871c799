// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use atrium_core::application::{StageDefinition, StandardWorkflowService, StartWorkflowRequest, WorkflowService};
use atrium_core::domain::aggregate::AggregateRoot;
use atrium_core::domain::content::{Content, ContentStatus};
use atrium_core::domain::events::ContentEvent;
use atrium_core::domain::ids::{ContentId, WorkflowId};
use atrium_core::domain::platform_config::WorkflowDefaults;
use atrium_core::domain::repository::ContentRepository;
use atrium_core::domain::workflow::WorkflowStatus;
use atrium_core::infrastructure::event_bus::{EventBus, PlatformEvent};
use atrium_core::infrastructure::repositories::{InMemoryContentRepository, InMemoryWorkflowRepository};
use atrium_publishing::application::{spawn_completion_listener, ContentGate, GateOutcome, StandardContentGate};
use atrium_publishing::domain::{ApprovalPolicy, PolicyDecision};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

struct Harness {
    workflows: StandardWorkflowService,
    contents: Arc<InMemoryContentRepository>,
    gate: Arc<StandardContentGate>,
    bus: Arc<EventBus>,
}

async fn harness(required_levels: &[&str]) -> Harness {
    let bus = Arc::new(EventBus::new(64));
    let workflow_repo = Arc::new(InMemoryWorkflowRepository::new());
    let contents = Arc::new(InMemoryContentRepository::new());

    let content = Content::new("c-1", "acc-1", "article", "Launch notes", "Body", "alice").unwrap();
    contents.save(&content).await.unwrap();

    let workflows = StandardWorkflowService::new(workflow_repo.clone(), bus.clone(), WorkflowDefaults::default());
    let gate = Arc::new(StandardContentGate::new(
        workflow_repo,
        contents.clone(),
        bus.clone(),
        ApprovalPolicy::new(required_levels.iter().copied(), "Approved"),
    ));

    Harness {
        workflows,
        contents,
        gate,
        bus,
    }
}

async fn start(h: &Harness) -> WorkflowId {
    let workflow = assert_ok!(
        h.workflows
            .start_workflow(StartWorkflowRequest {
                workflow_id: Some("wf-1".to_string()),
                content_id: "c-1".to_string(),
                account_id: "acc-1".to_string(),
                workflow_type: None,
                initiated_by: "alice".to_string(),
                stages: vec![StageDefinition::new("Review", 1)],
            })
            .await
    );
    workflow.id().clone()
}

#[tokio::test]
async fn test_approved_workflow_publishes_content() {
    let h = harness(&["L1", "L2"]).await;
    let id = start(&h).await;
    let mut receiver = h.bus.subscribe();

    h.workflows.approve(&id, "bob", "L1", "").await.unwrap();
    assert_eq!(
        h.gate.evaluate_completion(&id).await.unwrap(),
        PolicyDecision::Pending {
            missing_levels: vec!["L2".to_string()]
        }
    );

    h.workflows.approve(&id, "carol", "L2", "").await.unwrap();
    assert!(h.gate.evaluate_completion(&id).await.unwrap().is_satisfied());
    h.workflows.complete(&id, "carol", "Approved").await.unwrap();

    let outcome = h.gate.on_workflow_completed(&id, "carol").await.unwrap();
    assert_eq!(
        outcome,
        GateOutcome::Published {
            content_id: ContentId::new("c-1").unwrap(),
            version: 1
        }
    );

    let content = h.contents.find_by_id(&ContentId::new("c-1").unwrap()).await.unwrap().unwrap();
    assert_eq!(content.status(), ContentStatus::Published);
    assert_eq!(content.publishing_workflow(), Some(&id));

    // Drain the workflow events, then expect the content publication
    let mut saw_published = false;
    while let Ok(event) = receiver.try_recv() {
        if let PlatformEvent::Content(ContentEvent::ContentPublished { workflow_id, .. }) = event {
            assert_eq!(workflow_id, Some(id.clone()));
            saw_published = true;
        }
    }
    assert!(saw_published);

    // A second run is a no-op
    assert!(matches!(
        h.gate.on_workflow_completed(&id, "carol").await.unwrap(),
        GateOutcome::AlreadyPublished { .. }
    ));
}

#[tokio::test]
async fn test_running_workflow_is_not_ready() {
    let h = harness(&["L1"]).await;
    let id = start(&h).await;

    assert_eq!(
        h.gate.on_workflow_completed(&id, "bob").await.unwrap(),
        GateOutcome::NotReady {
            status: WorkflowStatus::Started
        }
    );
}

#[tokio::test]
async fn test_cancelled_or_rejected_workflow_is_declined() {
    let h = harness(&["L1"]).await;
    let id = start(&h).await;
    h.workflows
        .reject(&id, "bob", "L1", "policy violation", "needs rework")
        .await
        .unwrap();
    assert!(matches!(
        h.gate.evaluate_completion(&id).await.unwrap(),
        PolicyDecision::Blocked { .. }
    ));

    // Completing despite a standing rejection still does not publish
    h.workflows.complete(&id, "bob", "Approved").await.unwrap();
    assert!(matches!(
        h.gate.on_workflow_completed(&id, "bob").await.unwrap(),
        GateOutcome::Declined { .. }
    ));

    let h = harness(&["L1"]).await;
    let id = start(&h).await;
    h.workflows.cancel(&id, "bob", "abandoned").await.unwrap();
    assert!(matches!(
        h.gate.on_workflow_completed(&id, "bob").await.unwrap(),
        GateOutcome::Declined { .. }
    ));
    let content = h.contents.find_by_id(&ContentId::new("c-1").unwrap()).await.unwrap().unwrap();
    assert_eq!(content.status(), ContentStatus::Draft);
}

#[tokio::test]
async fn test_missing_content_is_reported_not_raised() {
    let h = harness(&["L1"]).await;
    let id = start(&h).await;
    h.workflows.approve(&id, "bob", "L1", "").await.unwrap();
    h.workflows.complete(&id, "bob", "Approved").await.unwrap();
    h.contents.delete(&ContentId::new("c-1").unwrap()).await.unwrap();

    assert_eq!(
        h.gate.on_workflow_completed(&id, "bob").await.unwrap(),
        GateOutcome::ContentMissing {
            content_id: ContentId::new("c-1").unwrap()
        }
    );
}

#[tokio::test]
async fn test_archived_content_is_declined() {
    let h = harness(&["L1"]).await;
    let content_id = ContentId::new("c-1").unwrap();
    let mut content = h.contents.find_by_id(&content_id).await.unwrap().unwrap();
    content.archive("alice", "superseded").unwrap();
    h.contents.save(&content).await.unwrap();

    let id = start(&h).await;
    h.workflows.approve(&id, "bob", "L1", "").await.unwrap();
    h.workflows.complete(&id, "bob", "Approved").await.unwrap();
    let mut receiver = h.bus.subscribe();

    match h.gate.on_workflow_completed(&id, "bob").await.unwrap() {
        GateOutcome::Declined { reason } => assert!(reason.contains("archived"), "{reason}"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let stored = h.contents.find_by_id(&content_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), ContentStatus::Archived);
    assert!(stored.publishing_workflow().is_none());
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_unknown_workflow_is_an_error() {
    let h = harness(&["L1"]).await;
    assert!(h
        .gate
        .on_workflow_completed(&WorkflowId::new("nope").unwrap(), "bob")
        .await
        .is_err());
}

#[tokio::test]
async fn test_listener_publishes_on_completion_event() {
    let h = harness(&["L1"]).await;
    let listener = spawn_completion_listener(h.gate.clone(), &h.bus);
    let id = start(&h).await;

    h.workflows.approve(&id, "bob", "L1", "").await.unwrap();
    h.workflows.complete(&id, "bob", "Approved").await.unwrap();

    let content_id = ContentId::new("c-1").unwrap();
    let published = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let content = h.contents.find_by_id(&content_id).await.unwrap().unwrap();
            if content.is_published() {
                return content;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("content was not published by the listener");

    assert_eq!(published.published_by(), Some("bob"));
    listener.abort();
}
