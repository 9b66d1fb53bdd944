/// Command retriever
///
/// Contextual recall plus the identifier-addressed operations. Every call
/// here gates on ownership: a command the caller may not see is reported
/// as `None`, exactly like one that does not exist.

use crate::core::tiers::{first_match, recall_by_name_tiers, recall_tiers, Tier};
use crate::db::queries::bump_usage;
use crate::db::{Command, Database, RecallByNameRequest, RecallRequest};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Handles command retrieval operations
pub struct Retriever {
    db: Arc<Database>,
}

impl Retriever {
    /// Create a new retriever instance
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Best command for an exact name and namespace
    ///
    /// Usage stats of the match are updated before it is returned.
    pub async fn recall_command(&self, req: &RecallRequest) -> Result<Option<Command>> {
        self.recall(&recall_tiers(req)).await
    }

    /// Best command for a name, guided by whatever context is available
    pub async fn recall_by_name(&self, req: &RecallByNameRequest) -> Result<Option<Command>> {
        self.recall(&recall_by_name_tiers(req)).await
    }

    async fn recall(&self, tiers: &[Tier]) -> Result<Option<Command>> {
        let mut tx = self.db.begin_write().await?;

        let Some((tier, matched)) = first_match(&mut tx, tiers).await? else {
            return Ok(None);
        };
        let command = bump_usage(&mut tx, matched.id).await?;

        tx.commit().await?;
        info!(id = command.id, name = %command.name, tier, "command recalled");

        Ok(Some(command))
    }

    /// Get command by ID
    pub async fn get_by_id(&self, id: i64, user: &str) -> Result<Option<Command>> {
        self.db.get_accessible_command(id, user).await
    }

    /// Replace the command text; owners only
    pub async fn update_text(
        &self,
        id: i64,
        user: &str,
        command_string: &str,
    ) -> Result<Option<Command>> {
        self.db.update_command_text(id, user, command_string).await
    }

    /// Move a command to a new name and namespace; owners only
    pub async fn rename(
        &self,
        id: i64,
        user: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Command>> {
        self.db.rename_command(id, user, name, namespace).await
    }

    /// Delete a command and its history; owners only
    pub async fn delete(&self, id: i64, user: &str) -> Result<Option<Command>> {
        let deleted = self.db.delete_command(id, user).await?;
        if let Some(command) = &deleted {
            info!(id = command.id, "command deleted");
        }
        Ok(deleted)
    }

    /// Count one use of a command the caller may see
    pub async fn track_execution(&self, id: i64, user: &str) -> Result<Option<Command>> {
        self.db.track_execution(id, user).await
    }
}
