//! Restore against real git repositories.

use std::path::Path;
use std::sync::Arc;
use yamltrail_core::{
    extract, Config, ContainerShape, Document, EntityHistory, EntityIdentity, EntityKind,
    HistoryError, Identifier, MergeAction, VersionOrigin,
};
use yamltrail_test_utils::assertions::{assert_file_equals, assert_no_temp_files, assert_yaml_eq};
use yamltrail_test_utils::builders::{automation, script, with_field};
use yamltrail_test_utils::{DocumentBuilder, TestRepo};

const AUTOMATIONS: &str = "automations.yaml";
const SCRIPTS: &str = "scripts.yaml";

fn service(repo: &TestRepo) -> EntityHistory {
    EntityHistory::new(repo.shared_store(), repo.path(), Config::default())
}

fn automation_id(id: &str) -> EntityIdentity {
    EntityIdentity::new(AUTOMATIONS, EntityKind::Automation, Identifier::parse(id))
}

fn wrapped(entities: &[serde_yaml::Value]) -> String {
    entities
        .iter()
        .fold(DocumentBuilder::wrapped_list("automation"), |b, e| {
            b.entity(e.clone())
        })
        .build()
}

/// Restoring a value and extracting it again yields the same value.
#[tokio::test]
async fn test_round_trip() {
    let repo = TestRepo::new();
    let old = repo
        .commit(AUTOMATIONS, &wrapped(&[automation("1", "Old")]), "old")
        .await;
    repo.commit(AUTOMATIONS, &wrapped(&[automation("1", "New")]), "new")
        .await;

    let history = service(&repo);
    let identity = automation_id("1");
    let expected = history.entity_at(&identity, &old.hash).await.unwrap();

    let outcome = history.restore_entity(&identity, &old.hash).await.unwrap();
    assert_eq!(outcome.action, MergeAction::Replaced);
    assert_eq!(
        outcome.shape,
        ContainerShape::WrappedArray {
            key: "automation".into()
        }
    );

    let live = Document::parse(&repo.read(AUTOMATIONS)).unwrap();
    let restored = extract(&live, EntityKind::Automation, &identity.identifier).unwrap();
    assert_eq!(restored, expected);
    assert_no_temp_files(repo.path());
}

/// Restoring one entity never changes another.
#[tokio::test]
async fn test_sibling_isolation() {
    let repo = TestRepo::new();
    let old = repo
        .commit(
            AUTOMATIONS,
            &wrapped(&[automation("1", "A"), automation("2", "B old")]),
            "old",
        )
        .await;
    let siblings = [
        with_field(automation("1", "A"), "mode", "restart"),
        automation("2", "B new"),
        automation("3", "C"),
    ];
    repo.commit(AUTOMATIONS, &wrapped(&siblings), "new").await;

    let before = Document::parse(&repo.read(AUTOMATIONS)).unwrap();
    service(&repo)
        .restore_entity(&automation_id("2"), &old.hash)
        .await
        .unwrap();
    let after = Document::parse(&repo.read(AUTOMATIONS)).unwrap();

    for id in ["1", "3"] {
        let identifier = Identifier::parse(id);
        assert_eq!(
            extract(&before, EntityKind::Automation, &identifier),
            extract(&after, EntityKind::Automation, &identifier),
            "sibling {id} changed"
        );
    }
    let order: Vec<String> = after
        .entities(EntityKind::Automation)
        .into_iter()
        .map(|e| e.identifier.text())
        .collect();
    assert_eq!(order, vec!["1", "2", "3"]);
}

/// A deleted entity is appended back at the end.
#[tokio::test]
async fn test_resurrect_deleted_entity() {
    let repo = TestRepo::new();
    let old = repo
        .commit(
            AUTOMATIONS,
            &wrapped(&[automation("1", "A"), automation("2", "B")]),
            "both",
        )
        .await;
    repo.commit(AUTOMATIONS, &wrapped(&[automation("2", "B")]), "remove 1")
        .await;

    let outcome = service(&repo)
        .restore_entity(&automation_id("1"), &old.hash)
        .await
        .unwrap();

    assert_eq!(outcome.action, MergeAction::Appended);
    assert_yaml_eq(
        &repo.read(AUTOMATIONS),
        &wrapped(&[automation("2", "B"), automation("1", "A")]),
    );
}

#[tokio::test]
async fn test_restore_keyed_script_preserves_map_order() {
    let repo = TestRepo::new();
    let doc = |morning: &str| {
        DocumentBuilder::root_map()
            .keyed("morning", script(morning))
            .keyed("evening", script("Evening"))
            .build()
    };
    let old = repo.commit(SCRIPTS, &doc("Morning"), "old").await;
    repo.commit(SCRIPTS, &doc("Morning v2"), "new").await;

    let identity = EntityIdentity::new(
        SCRIPTS,
        EntityKind::Script,
        Identifier::Keyed("morning".into()),
    );
    let outcome = service(&repo).restore_entity(&identity, &old.hash).await.unwrap();

    assert_eq!(outcome.shape, ContainerShape::RootMap);
    assert_eq!(outcome.action, MergeAction::Replaced);
    assert_file_equals(&repo.file(SCRIPTS), &doc("Morning"));
}

#[tokio::test]
async fn test_restore_recreates_missing_file() {
    let repo = TestRepo::new();
    let old = repo
        .commit(AUTOMATIONS, &wrapped(&[automation("1", "A")]), "create")
        .await;
    repo.remove(AUTOMATIONS, "delete").await;

    let outcome = service(&repo)
        .restore_entity(&automation_id("1"), &old.hash)
        .await
        .unwrap();

    assert_eq!(outcome.action, MergeAction::Appended);
    assert_file_equals(&repo.file(AUTOMATIONS), &wrapped(&[automation("1", "A")]));
}

#[tokio::test]
async fn test_unreadable_live_document() {
    let repo = TestRepo::new();
    let old = repo
        .commit(AUTOMATIONS, &wrapped(&[automation("1", "A")]), "create")
        .await;
    repo.write(AUTOMATIONS, "automation: [\n");

    let err = service(&repo)
        .restore_entity(&automation_id("1"), &old.hash)
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryError::DocumentUnreadable { .. }));
    assert_file_equals(&repo.file(AUTOMATIONS), "automation: [\n");

    let config = Config::parse(r#"{ "restore": { "replace_unreadable": true } }"#, "test").unwrap();
    let lenient = EntityHistory::new(repo.shared_store(), repo.path(), config);
    lenient
        .restore_entity(&automation_id("1"), &old.hash)
        .await
        .unwrap();
    assert_file_equals(&repo.file(AUTOMATIONS), &wrapped(&[automation("1", "A")]));
}

#[tokio::test]
async fn test_entity_absent_at_target() {
    let repo = TestRepo::new();
    let c1 = repo
        .commit(AUTOMATIONS, &wrapped(&[automation("1", "A")]), "create")
        .await;

    let err = service(&repo)
        .restore_entity(&automation_id("9"), &c1.hash)
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryError::EntityNotFound { .. }));
}

#[tokio::test]
async fn test_unknown_target_commit() {
    let repo = TestRepo::new();
    repo.commit(AUTOMATIONS, &wrapped(&[automation("1", "A")]), "create")
        .await;

    let err = service(&repo)
        .restore_entity(&automation_id("1"), "deadbeef")
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryError::UnknownCommit(_)));
}

/// A restore is itself a new point in history once recorded.
#[tokio::test]
async fn test_recorded_restore_becomes_new_version() {
    let repo = TestRepo::new();
    let old = repo
        .commit(AUTOMATIONS, &wrapped(&[automation("1", "A")]), "a")
        .await;
    repo.commit(AUTOMATIONS, &wrapped(&[automation("1", "B")]), "b")
        .await;

    let history = service(&repo);
    let identity = automation_id("1");
    history.restore_entity(&identity, &old.hash).await.unwrap();
    let restore_commit = repo.record(AUTOMATIONS, "restore").await;

    let versions = history.reconstruct_history(&identity).await.unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].commit.hash, restore_commit.hash);
    assert_eq!(versions[0].origin, VersionOrigin::Modified);
    assert_eq!(versions[0].value, versions[2].value);
}

/// Concurrent restores on one document never lose each other's writes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_restores_are_serialized() {
    let repo = TestRepo::new();
    let ids: Vec<String> = (1..=6).map(|i| i.to_string()).collect();
    let all: Vec<_> = ids.iter().map(|id| automation(id, "original")).collect();
    let old = repo.commit(AUTOMATIONS, &wrapped(&all), "all").await;
    repo.commit(AUTOMATIONS, &wrapped(&[]), "cleared").await;

    let history = Arc::new(service(&repo));
    let tasks: Vec<_> = ids
        .iter()
        .map(|id| {
            let history = history.clone();
            let identity = automation_id(id);
            let commit = old.hash.clone();
            tokio::spawn(async move { history.restore_entity(&identity, &commit).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let live = Document::parse(&repo.read(AUTOMATIONS)).unwrap();
    let mut restored: Vec<String> = live
        .entities(EntityKind::Automation)
        .into_iter()
        .map(|e| e.identifier.text())
        .collect();
    restored.sort();
    assert_eq!(restored, ids);
    assert_no_temp_files(repo.path());
}

#[tokio::test]
async fn test_absolute_document_path() {
    let repo = TestRepo::new();
    let old = repo
        .commit(AUTOMATIONS, &wrapped(&[automation("1", "A")]), "a")
        .await;
    repo.commit(AUTOMATIONS, &wrapped(&[automation("1", "B")]), "b")
        .await;

    let identity = EntityIdentity::new(
        repo.file(AUTOMATIONS),
        EntityKind::Automation,
        Identifier::parse("1"),
    );
    let outcome = service(&repo).restore_entity(&identity, &old.hash).await.unwrap();
    assert_eq!(outcome.identity.document_path, Path::new(AUTOMATIONS));
    assert_eq!(outcome.path, repo.file(AUTOMATIONS));
}
