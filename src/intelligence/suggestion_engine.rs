/// Suggestion engine
///
/// Contextual suggestions and command similarity. Nothing here mutates
/// usage stats.

use crate::core::project_detector::dir_name;
use crate::db::{Command, Database, SuggestionsRequest};
use crate::error::Result;
use crate::intelligence::Scorer;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Suggestion engine
pub struct SuggestionEngine {
    db: Arc<Database>,
}

impl SuggestionEngine {
    /// Create a new suggestion engine
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Commands worth suggesting for the caller's context
    ///
    /// Candidates come from three sources in priority order: commands
    /// executed in similarly named directories, the caller's own most used
    /// commands, then the most used shared commands. Each source only fills
    /// the slots the previous ones left. An empty user counts as no user.
    pub async fn suggestions(&self, req: &SuggestionsRequest) -> Result<Vec<Command>> {
        let limit = req.limit;
        let mut candidates: Vec<Command> = Vec::new();

        if limit == 0 {
            return Ok(candidates);
        }

        if let Some(key) = req.cwd.as_deref().and_then(dir_name) {
            let near = self.db.commands_executed_near(key, limit as i64).await?;
            debug!(dir = key, found = near.len(), "directory suggestions");
            candidates.extend(near);
        }

        if let Some(user) = req.user.as_deref().filter(|u| !u.is_empty()) {
            if candidates.len() < limit {
                let remaining = (limit - candidates.len()) as i64;
                candidates.extend(self.db.most_used_by_user(user, remaining).await?);
            }
        }

        if candidates.len() < limit {
            let remaining = (limit - candidates.len()) as i64;
            candidates.extend(self.db.most_used_shared(remaining).await?);
        }

        Ok(dedup_by_id(candidates, limit))
    }

    /// Commands similar to the one with `id`
    ///
    /// Same-namespace commands come first, most used first. Remaining slots
    /// go to commands sharing words with this one. Unknown ids give an
    /// empty list.
    pub async fn similar_to(&self, id: i64, limit: usize) -> Result<Vec<Command>> {
        let Some(base) = self.db.get_command_by_id(id).await? else {
            return Ok(Vec::new());
        };

        let peers = self.db.namespace_peers(id, &base.namespace, limit as i64).await?;
        if peers.len() >= limit {
            return Ok(peers);
        }

        let others = self.db.commands_except(id).await?;
        let ranked = Scorer::rank_by_overlap(&base.command_string, others);
        debug!(id, peers = peers.len(), overlapping = ranked.len(), "similarity candidates");

        let mut similar = peers;
        similar.extend(ranked.into_iter().map(|(_, cmd)| cmd));

        Ok(dedup_by_id(similar, limit))
    }
}

/// Drop repeated ids keeping the first occurrence, then cap at `limit`
fn dedup_by_id(commands: Vec<Command>, limit: usize) -> Vec<Command> {
    let mut seen = HashSet::new();
    commands
        .into_iter()
        .filter(|cmd| seen.insert(cmd.id))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewCommand, NewExecution};
    use crate::core::Recorder;

    async fn setup() -> (SuggestionEngine, Arc<Database>) {
        let db = Arc::new(Database::new_test().await.unwrap());
        (SuggestionEngine::new(Arc::clone(&db)), db)
    }

    async fn save(db: &Database, cmd: NewCommand) -> i64 {
        db.create_command(&cmd).await.unwrap().command.id
    }

    #[tokio::test]
    async fn test_suggestions_tier_order_and_dedup() {
        let (engine, db) = setup().await;
        let recorder = Recorder::new(Arc::clone(&db));

        let built = save(&db, NewCommand::new("make", "build", "web").user("alice")).await;
        let tested = save(&db, NewCommand::new("make test", "test", "web").user("alice")).await;
        let shared = save(&db, NewCommand::new("kubectl get pods", "pods", "k8s").scope("team")).await;

        for _ in 0..2 {
            let mut exec = NewExecution::new(tested);
            exec.user = Some("alice".to_string());
            exec.cwd = Some("/home/alice/webapp".to_string());
            recorder.record_execution(&exec).await.unwrap().unwrap();
        }
        db.track_execution(built, "alice").await.unwrap();

        let req = SuggestionsRequest {
            user: Some("alice".to_string()),
            cwd: Some("/srv/webapp".to_string()),
            limit: 5,
            ..SuggestionsRequest::default()
        };
        let ids: Vec<i64> = engine
            .suggestions(&req)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();

        // `tested` shows up in both the directory and user sources
        assert_eq!(ids, vec![tested, built, shared]);
    }

    #[tokio::test]
    async fn test_suggestions_respect_limit() {
        let (engine, db) = setup().await;

        for i in 0..6 {
            save(&db, NewCommand::new(format!("echo {}", i), format!("e{}", i), "ns").scope("team")).await;
        }

        let req = SuggestionsRequest {
            limit: 3,
            ..SuggestionsRequest::default()
        };
        assert_eq!(engine.suggestions(&req).await.unwrap().len(), 3);

        let req = SuggestionsRequest {
            limit: 0,
            ..SuggestionsRequest::default()
        };
        assert!(engine.suggestions(&req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_similar_unknown_id() {
        let (engine, _db) = setup().await;
        assert!(engine.similar_to(42, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_similar_namespace_fills_limit() {
        let (engine, db) = setup().await;

        let base = save(&db, NewCommand::new("git pull", "pull", "git")).await;
        let a = save(&db, NewCommand::new("git push", "push", "git")).await;
        let b = save(&db, NewCommand::new("git fetch", "fetch", "git")).await;
        save(&db, NewCommand::new("git pull --rebase", "pr", "other")).await;

        let similar = engine.similar_to(base, 2).await.unwrap();
        let ids: Vec<i64> = similar.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_similar_falls_back_to_word_overlap() {
        let (engine, db) = setup().await;

        let base = save(&db, NewCommand::new("docker compose up -d", "up", "compose")).await;
        let peer = save(&db, NewCommand::new("ls", "ls", "compose")).await;
        let weak = save(&db, NewCommand::new("docker ps", "ps", "docker")).await;
        let strong = save(&db, NewCommand::new("docker compose down", "down", "docker")).await;
        save(&db, NewCommand::new("htop", "top", "system")).await;

        let similar = engine.similar_to(base, 5).await.unwrap();
        let ids: Vec<i64> = similar.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![peer, strong, weak]);
    }

    #[tokio::test]
    async fn test_similar_lists_namespace_peer_once() {
        let (engine, db) = setup().await;

        let base = save(&db, NewCommand::new("git pull", "pull", "git")).await;
        // Same namespace and shares a word, so it qualifies twice
        let peer = save(&db, NewCommand::new("git push", "push", "git")).await;
        let log = save(&db, NewCommand::new("git log", "log", "history")).await;

        let similar = engine.similar_to(base, 5).await.unwrap();
        let ids: Vec<i64> = similar.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![peer, log]);
    }

    #[tokio::test]
    async fn test_directory_suggestions_ignore_case() {
        let (engine, db) = setup().await;
        let recorder = Recorder::new(Arc::clone(&db));

        let id = save(&db, NewCommand::new("make", "build", "web").user("alice")).await;
        let mut exec = NewExecution::new(id);
        exec.user = Some("alice".to_string());
        exec.cwd = Some("/home/alice/WebApp".to_string());
        recorder.record_execution(&exec).await.unwrap().unwrap();

        let req = SuggestionsRequest {
            cwd: Some("/srv/webapp".to_string()),
            ..SuggestionsRequest::default()
        };
        let ids: Vec<i64> = engine.suggestions(&req).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![id]);
    }

    #[tokio::test]
    async fn test_empty_user_skips_owner_source() {
        let (engine, db) = setup().await;

        let blank = save(&db, NewCommand::new("whoami", "me", "sys").user("")).await;
        let shared = save(&db, NewCommand::new("date", "now", "sys").scope("team")).await;
        db.track_execution(blank, "").await.unwrap();

        let req = SuggestionsRequest {
            user: Some(String::new()),
            ..SuggestionsRequest::default()
        };
        let ids: Vec<i64> = engine.suggestions(&req).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![shared]);
    }
}
