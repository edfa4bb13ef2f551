//! Task lifecycle integration tests
//!
//! Covers the ACL-gated write path end to end: authorization, version and
//! clock bookkeeping, the event log, and the live messages each mutation
//! produces.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use taskmesh::shared::acl::Resource;
use taskmesh::shared::event::EventType;
use taskmesh::shared::permission::PermissionSet;
use taskmesh::shared::task::{CreateTaskRequest, TaskEventType, TaskMutation, TaskStatus};

use crate::common::*;
use crate::{assert_ok, assert_status};

fn rename(title: &str) -> TaskMutation {
    TaskMutation {
        title: Some(title.to_string()),
        ..TaskMutation::default()
    }
}

#[tokio::test]
async fn test_editor_update_reaches_owner_devices_and_room() {
    let app = TestApp::new();
    let hub = &app.state.hub;
    let task = app.create_task("alice", "Plant tomatoes").await;
    assert_eq!(task.version, 1);
    assert_eq!(task.clock.get("alice"), 1);

    let (_, mut laptop) = hub.register("alice").await;
    let (_, mut phone) = hub.register("alice").await;
    let (watcher, mut watching) = hub.register("carol").await;
    assert!(hub.join_room(watcher, &task.id).await);

    app.grant_user("alice", &Resource::task(&task.id), "bob", PermissionSet::EDITOR)
        .await;
    let updated = assert_ok!(
        app.state
            .tasks
            .update(&principal("bob"), &task.id, rename("Plant cherry tomatoes"))
            .await
    );

    assert_eq!(updated.version, 2);
    assert_eq!(updated.clock.get("alice"), 1);
    assert_eq!(updated.clock.get("bob"), 1);
    assert_eq!(updated.clock.len(), 2);

    for rx in [&mut laptop, &mut phone, &mut watching] {
        let message = next_message(rx).await;
        assert_eq!(message.event_type, EventType::TaskUpdated);
        assert_eq!(message.resource_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(message.user_id, "bob");
        assert_eq!(message.payload["title"], "Plant cherry tomatoes");
        assert_eq!(message.payload["version"], 2);
    }
}

#[tokio::test]
async fn test_editor_update_names_editor_and_reaches_their_devices() {
    let app = TestApp::new();
    let hub = &app.state.hub;
    let task = app.create_task("alice", "Sharpen the scythe").await;
    app.grant_user("alice", &Resource::task(&task.id), "bob", PermissionSet::EDITOR)
        .await;

    let (_, mut bob_tablet) = hub.register("bob").await;
    let (_, mut alice_phone) = hub.register("alice").await;
    let (_, mut bystander) = hub.register("dave").await;

    assert_ok!(
        app.state
            .tasks
            .update(&principal("bob"), &task.id, rename("Sharpen and oil the scythe"))
            .await
    );

    let seen_by_bob = next_message(&mut bob_tablet).await;
    assert_eq!(seen_by_bob.user_id, "bob");
    assert_eq!(seen_by_bob.payload["owner_id"], "alice");
    assert_eq!(seen_by_bob.payload["version"], 2);

    let seen_by_alice = next_message(&mut alice_phone).await;
    assert_eq!(seen_by_alice, seen_by_bob);

    assert_no_message(&mut bob_tablet);
    assert_no_message(&mut alice_phone);
    assert_no_message(&mut bystander);
}

#[tokio::test]
async fn test_owner_update_is_delivered_once_per_device() {
    let app = TestApp::new();
    let hub = &app.state.hub;
    let task = app.create_task("alice", "Oil the hinges").await;
    let (_, mut device) = hub.register("alice").await;

    assert_ok!(
        app.state
            .tasks
            .update(&principal("alice"), &task.id, rename("Oil every hinge"))
            .await
    );

    let message = next_message(&mut device).await;
    assert_eq!(message.user_id, "alice");
    assert_no_message(&mut device);
}

#[tokio::test]
async fn test_viewer_update_is_denied_without_side_effects() {
    let app = TestApp::new();
    let hub = &app.state.hub;
    let task = app.create_task("alice", "Check the bees").await;
    let (_, mut device) = hub.register("alice").await;

    app.grant_user("alice", &Resource::task(&task.id), "bob", PermissionSet::VIEWER)
        .await;
    assert_status!(
        app.state
            .tasks
            .update(&principal("bob"), &task.id, rename("Sell the bees"))
            .await,
        StatusCode::FORBIDDEN
    );

    let stored = assert_ok!(app.state.tasks.tracker().get(&task.id).await);
    assert_eq!(stored.version, 1);
    assert_eq!(stored.title, "Check the bees");
    assert_no_message(&mut device);

    let events = assert_ok!(app.state.tasks.events(&principal("bob"), &task.id).await);
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_delete_is_terminal_and_owner_only() {
    let app = TestApp::new();
    let task = app.create_task("alice", "Clear the gutters").await;

    // A DELETE grant does not let a non-owner past the row check
    app.grant_user("alice", &Resource::task(&task.id), "bob", PermissionSet::OWNER)
        .await;
    assert_status!(
        app.state.tasks.delete(&principal("bob"), &task.id).await,
        StatusCode::NOT_FOUND
    );

    let deleted = assert_ok!(app.state.tasks.delete(&principal("alice"), &task.id).await);
    assert!(deleted.is_deleted());
    assert_eq!(deleted.version, 2);
    assert_eq!(deleted.clock.get("alice"), 2);

    assert_status!(
        app.state.tasks.get(&principal("alice"), &task.id).await,
        StatusCode::NOT_FOUND
    );
    assert!(app
        .state
        .tasks
        .update(&principal("bob"), &task.id, rename("Too late"))
        .await
        .is_err());
    assert!(assert_ok!(app.state.tasks.list(&principal("alice")).await).is_empty());
}

#[tokio::test]
async fn test_event_log_follows_the_lifecycle() {
    let app = TestApp::new();
    let alice = principal("alice");
    let task = app.create_task("alice", "Prune the roses").await;

    let mutation = TaskMutation {
        status: Some(TaskStatus::InProgress),
        ..TaskMutation::default()
    };
    assert_ok!(app.state.tasks.update(&alice, &task.id, mutation).await);
    assert_ok!(app.state.tasks.delete(&alice, &task.id).await);

    let events = assert_ok!(app.state.tasks.tracker().events(&task.id).await);
    let kinds: Vec<TaskEventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![TaskEventType::Created, TaskEventType::Updated, TaskEventType::Deleted]
    );
    let versions: Vec<i64> = events.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert!(events
        .windows(2)
        .all(|pair| pair[0].sequence_number < pair[1].sequence_number));
}

#[tokio::test]
async fn test_changes_since_orders_by_version() {
    let app = TestApp::new();
    let alice = principal("alice");
    let quiet = app.create_task("alice", "Quiet task").await;
    let busy = app.create_task("alice", "Busy task").await;
    let gone = app.create_task("alice", "Gone task").await;
    let theirs = app.create_task("bob", "Someone else's").await;

    app.touch("alice", &busy.id, 4).await;
    app.touch("alice", &gone.id, 1).await;
    assert_ok!(app.state.tasks.delete(&alice, &gone.id).await);
    app.touch("bob", &theirs.id, 5).await;

    let changed = assert_ok!(app.state.tasks.changes_since(&alice, 2).await);
    let ids: Vec<&str> = changed.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![gone.id.as_str(), busy.id.as_str()]);
    assert!(changed[0].is_deleted());
    assert!(!ids.contains(&quiet.id.as_str()));

    let all = assert_ok!(app.state.tasks.changes_since(&alice, 0).await);
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|pair| pair[0].version <= pair[1].version));
}

#[tokio::test]
async fn test_client_chosen_id_collision_conflicts() {
    let app = TestApp::new();
    let alice = principal("alice");

    let task = assert_ok!(
        app.state
            .tasks
            .create(&alice, Some("offline-1".into()), CreateTaskRequest::new("From the field"))
            .await
    );
    assert_eq!(task.id, "offline-1");

    assert_status!(
        app.state
            .tasks
            .create(&principal("bob"), Some("offline-1".into()), CreateTaskRequest::new("Duplicate"))
            .await,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let app = TestApp::new();
    let alice = principal("alice");

    assert_status!(
        app.state
            .tasks
            .create(&alice, None, CreateTaskRequest::new("ab"))
            .await,
        StatusCode::BAD_REQUEST
    );

    let task = app.create_task("alice", "Valid title").await;
    assert_status!(
        app.state.tasks.update(&alice, &task.id, rename(" x ")).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_reading_requires_read() {
    let app = TestApp::new();
    let task = app.create_task("alice", "Private notes").await;

    assert_status!(
        app.state.tasks.get(&principal("bob"), &task.id).await,
        StatusCode::FORBIDDEN
    );
    assert_status!(
        app.state.tasks.get(&principal("bob"), "missing-task").await,
        StatusCode::NOT_FOUND
    );
}
