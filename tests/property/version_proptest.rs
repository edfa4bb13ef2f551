//! Property-based tests for the version tracker
//!
//! Drives random update sequences through the store-backed tracker and
//! checks version monotonicity and the `changes_since` window.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use taskmesh::backend::store::MemoryStore;
use taskmesh::backend::tasks::VersionClockTracker;
use taskmesh::shared::task::{CreateTaskRequest, TaskMutation};

const ACTORS: [&str; 3] = ["alice", "bob", "carol"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn tracker() -> VersionClockTracker {
    VersionClockTracker::new(Arc::new(MemoryStore::new()), Duration::from_secs(1))
}

fn edit(n: usize) -> TaskMutation {
    TaskMutation {
        description: Some(format!("edit {}", n)),
        ..TaskMutation::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn versions_step_by_one(actors in prop::collection::vec(0usize..3, 1..25)) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let tracker = tracker();
            let (task, _) = tracker.create("alice", None, CreateTaskRequest::new("Tracked")).await.unwrap();
            let mut version = task.version;
            let mut ticks = [1i64, 0, 0];

            for (n, actor) in actors.iter().enumerate() {
                let (updated, event) = tracker.apply_update(&task.id, ACTORS[*actor], edit(n)).await.unwrap();
                ticks[*actor] += 1;
                prop_assert_eq!(updated.version, version + 1);
                prop_assert_eq!(event.version, updated.version);
                prop_assert_eq!(updated.clock.get(ACTORS[*actor]), ticks[*actor]);
                version = updated.version;
            }

            let events = tracker.events(&task.id).await.unwrap();
            prop_assert_eq!(events.len(), actors.len() + 1);
            Ok(())
        });
        result?;
    }

    #[test]
    fn changes_since_is_exactly_the_newer_tasks(
        edits in prop::collection::vec(0usize..6, 1..6),
        floor in 0i64..6,
    ) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let tracker = tracker();
            let mut expected = Vec::new();

            for (n, count) in edits.iter().enumerate() {
                let (task, _) = tracker
                    .create("alice", None, CreateTaskRequest::new(format!("Task {}", n)))
                    .await
                    .unwrap();
                for i in 0..*count {
                    tracker.apply_update(&task.id, "alice", edit(i)).await.unwrap();
                }
                let version = 1 + *count as i64;
                if version > floor {
                    expected.push((task.id.clone(), version));
                }
            }

            let changed = tracker.changes_since("alice", floor).await.unwrap();
            prop_assert!(changed.iter().all(|t| t.version > floor));
            prop_assert!(changed.windows(2).all(|pair| pair[0].version <= pair[1].version));

            let mut got: Vec<(String, i64)> = changed.into_iter().map(|t| (t.id, t.version)).collect();
            got.sort();
            expected.sort();
            prop_assert_eq!(got, expected);
            Ok(())
        });
        result?;
    }
}
