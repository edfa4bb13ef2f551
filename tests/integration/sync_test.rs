//! Offline sync integration tests

use pretty_assertions::assert_eq;
use serde_json::json;

use taskmesh::shared::event::EventType;
use taskmesh::shared::sync::{SyncChange, SyncChangeType, SyncRequest};

use crate::assert_ok;
use crate::common::*;

fn change(change_type: SyncChangeType, resource_id: Option<&str>, payload: serde_json::Value) -> SyncChange {
    SyncChange {
        change_type,
        resource_id: resource_id.map(str::to_string),
        payload,
    }
}

#[tokio::test]
async fn test_denied_change_is_skipped_and_the_rest_applies() {
    let app = TestApp::new();
    let alice = principal("alice");

    let mine = app.create_task("alice", "Water seedlings").await;
    app.touch("alice", &mine.id, 5).await;
    let old = app.create_task("alice", "Untouched task").await;
    let foreign = app.create_task("mallory", "Not yours").await;

    let request = SyncRequest {
        last_pulled_version: 5,
        changes: vec![
            change(SyncChangeType::Update, Some(&mine.id), json!({ "title": "Water all seedlings" })),
            change(SyncChangeType::Delete, Some(&foreign.id), json!({})),
        ],
    };
    let response = assert_ok!(app.state.sync.sync(&alice, request).await);

    assert_eq!(response.synced_count, 1);
    assert_eq!(response.new_resources.len(), 1);
    assert_eq!(response.new_resources[0].id, mine.id);
    assert_eq!(response.new_resources[0].version, 7);
    assert_eq!(response.new_resources[0].title, "Water all seedlings");
    assert!(response.new_resources.iter().all(|t| t.id != old.id));

    let untouched = assert_ok!(app.state.tasks.tracker().get(&foreign.id).await);
    assert_eq!(untouched.version, 1);
    assert!(!untouched.is_deleted());
    assert_eq!(assert_ok!(app.state.tasks.tracker().events(&foreign.id).await).len(), 1);
}

#[tokio::test]
async fn test_offline_create_keeps_client_id() {
    let app = TestApp::new();
    let alice = principal("alice");

    let request = SyncRequest {
        last_pulled_version: 0,
        changes: vec![
            change(SyncChangeType::Create, Some("phone-42"), json!({ "title": "Fix the gate", "priority": "High" })),
            change(SyncChangeType::Update, Some("phone-42"), json!({ "status": "Done" })),
        ],
    };
    let response = assert_ok!(app.state.sync.sync(&alice, request).await);

    assert_eq!(response.synced_count, 2);
    assert_eq!(response.new_resources.len(), 1);
    let task = &response.new_resources[0];
    assert_eq!(task.id, "phone-42");
    assert_eq!(task.owner_id, "alice");
    assert_eq!(task.version, 2);
    assert_eq!(task.clock.get("alice"), 2);
}

#[tokio::test]
async fn test_bad_changes_do_not_stop_the_batch() {
    let app = TestApp::new();
    let alice = principal("alice");
    app.create_task("alice", "Existing").await;
    assert_ok!(
        app.state
            .tasks
            .create(&alice, Some("taken".into()), taskmesh::shared::task::CreateTaskRequest::new("Taken id"))
            .await
    );

    let request = SyncRequest {
        last_pulled_version: 0,
        changes: vec![
            change(SyncChangeType::Create, Some("taken"), json!({ "title": "Collides" })),
            change(SyncChangeType::Update, None, json!({ "title": "No target" })),
            change(SyncChangeType::Create, None, json!({ "title": 42 })),
            change(SyncChangeType::Update, Some("missing"), json!({ "title": "Nowhere" })),
            change(SyncChangeType::Create, None, json!({ "title": "Survivor" })),
        ],
    };
    let response = assert_ok!(app.state.sync.sync(&alice, request).await);

    assert_eq!(response.synced_count, 1);
    assert_eq!(response.new_resources.len(), 3);
    assert!(response.new_resources.iter().any(|t| t.title == "Survivor"));
}

#[tokio::test]
async fn test_synced_changes_are_broadcast() {
    let app = TestApp::new();
    let alice = principal("alice");
    let task = app.create_task("alice", "Muck out stables").await;
    let (_, mut device) = app.state.hub.register("alice").await;

    let request = SyncRequest {
        last_pulled_version: 1,
        changes: vec![change(SyncChangeType::Delete, Some(&task.id), json!(null))],
    };
    let response = assert_ok!(app.state.sync.sync(&alice, request).await);
    assert_eq!(response.synced_count, 1);
    assert!(response.new_resources[0].is_deleted());

    let message = next_message(&mut device).await;
    assert_eq!(message.event_type, EventType::TaskDeleted);
    assert_eq!(message.resource_id.as_deref(), Some(task.id.as_str()));
}

#[tokio::test]
async fn test_sync_request_wire_format() {
    let request: SyncRequest = serde_json::from_value(json!({
        "last_pulled_version": 3,
        "changes": [
            { "type": "UPDATE", "resource_id": "t1", "payload": { "title": "New" } },
            { "type": "create", "payload": { "title": "Fresh" } }
        ]
    }))
    .unwrap();

    assert_eq!(request.last_pulled_version, 3);
    assert_eq!(request.changes[0].change_type, SyncChangeType::Update);
    assert_eq!(request.changes[1].change_type, SyncChangeType::Create);
    assert_eq!(request.changes[1].resource_id, None);
}
