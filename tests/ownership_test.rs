mod common;

use anyhow::Result;
use common::create_test_db;
use hiproc_lib::core::{Recorder, Retriever, Searcher};
use hiproc_lib::db::{NewCommand, NewExecution};

#[tokio::test]
async fn test_personal_command_invisible_to_others() -> Result<()> {
    let (db, _dir) = create_test_db().await?;
    let recorder = Recorder::new(db.clone());
    let retriever = Retriever::new(db.clone());

    let saved = recorder
        .save(&NewCommand::new("cat ~/.ssh/config", "ssh", "me").user("alice"))
        .await?;
    let id = saved.command.id;
    let missing = id + 100;

    // Same answer as for an id that never existed
    for target in [id, missing] {
        assert!(retriever.get_by_id(target, "bob").await?.is_none());
        assert!(retriever.update_text(target, "bob", "rm -rf /").await?.is_none());
        assert!(retriever.rename(target, "bob", "x", "y").await?.is_none());
        assert!(retriever.track_execution(target, "bob").await?.is_none());
        assert!(retriever.delete(target, "bob").await?.is_none());
    }

    let mut exec = NewExecution::new(id);
    exec.user = Some("bob".to_string());
    assert!(recorder.record_execution(&exec).await?.is_none());

    let searcher = Searcher::new(db.clone());
    assert!(searcher.find(Some("bob"), "ssh", 10).await?.is_empty());

    let stored = db.get_command_by_id(id).await?.expect("untouched");
    assert_eq!(stored.command_string, "cat ~/.ssh/config");
    assert_eq!(stored.use_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_shared_command_usable_by_anyone() -> Result<()> {
    let (db, _dir) = create_test_db().await?;
    let recorder = Recorder::new(db.clone());
    let retriever = Retriever::new(db.clone());

    let saved = recorder
        .save(&NewCommand::new("kubectl rollout status", "rollout", "k8s").user("alice").scope("platform"))
        .await?;
    let id = saved.command.id;

    assert!(retriever.get_by_id(id, "bob").await?.is_some());
    let cmd = retriever.track_execution(id, "bob").await?.expect("shared");
    assert_eq!(cmd.use_count, 1);

    let mut exec = NewExecution::new(id);
    exec.user = Some("bob".to_string());
    assert!(recorder.record_execution(&exec).await?.is_some());

    // Editing stays with the owner even when shared
    assert!(retriever.update_text(id, "bob", "kubectl delete").await?.is_none());
    assert!(retriever.update_text(id, "alice", "kubectl rollout status -w").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_delete_cascades_history() -> Result<()> {
    let (db, _dir) = create_test_db().await?;
    let recorder = Recorder::new(db.clone());
    let retriever = Retriever::new(db.clone());

    let saved = recorder
        .save(&NewCommand::new("docker system prune", "prune", "docker").user("alice"))
        .await?;
    let id = saved.command.id;

    let mut exec = NewExecution::new(id);
    exec.user = Some("alice".to_string());
    recorder.record_execution(&exec).await?;
    recorder.record_execution(&exec).await?;
    assert_eq!(db.executions_for(id).await?.len(), 2);

    retriever.delete(id, "alice").await?.expect("deleted");
    assert!(db.executions_for(id).await?.is_empty());
    assert_eq!(db.stats().await?.total_executions, 0);
    Ok(())
}

#[test]
fn test_recall_from_sync_context() {
    tokio_test::block_on(async {
        let db = std::sync::Arc::new(hiproc_lib::Database::new_test().await.unwrap());
        let recorder = Recorder::new(db.clone());
        let saved = recorder
            .save(&NewCommand::new("date -u", "utc", "time"))
            .await
            .unwrap();
        assert!(saved.is_new);
    });
}
