// Saves commands and records executions
//
// Validation happens here so the store only ever sees usable input.

use crate::db::queries::{accessible_command, insert_execution};
use crate::db::{Database, ExecutionRecord, NewCommand, NewExecution, QuickSave, SavedCommand};
use crate::error::{RecallError, Result};
use crate::intelligence::ContextDetector;
use std::sync::Arc;
use tracing::{debug, info};

// Nobody needs a 10KB command.
const MAX_COMMAND_LENGTH: usize = 10_000;

// Namespace for quick-saves made outside any directory
const QUICK_SAVE_NAMESPACE: &str = "quick-save";

const FALLBACK_NAME: &str = "command";

pub struct Recorder {
    db: Arc<Database>,
}

impl Recorder {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // Validate, clean up and store. Saving the same thing twice hands back
    // the first record.
    pub async fn save(&self, input: &NewCommand) -> Result<SavedCommand> {
        let mut input = input.clone();
        input.command_string = self.sanitize_command(&input.command_string);
        input.name = input.name.trim().to_string();
        input.namespace = input.namespace.trim().to_string();

        self.validate(&input)?;

        self.db.create_command(&input).await
    }

    // Save with whatever the caller left out filled in: the name comes from
    // the command itself, the namespace from the project the cwd belongs to.
    pub async fn quick_save(&self, input: &QuickSave) -> Result<SavedCommand> {
        let name = match non_empty(&input.name) {
            Some(name) => name.to_string(),
            None => derive_name(&input.command_string),
        };

        let namespace = match (non_empty(&input.namespace), non_empty(&input.cwd)) {
            (Some(namespace), _) => namespace.to_string(),
            (None, Some(cwd)) => self.namespace_for(cwd, input.user.as_deref()).await?,
            (None, None) => QUICK_SAVE_NAMESPACE.to_string(),
        };
        debug!(name = %name, namespace = %namespace, "quick-save resolved");

        let mut cmd = NewCommand::new(input.command_string.clone(), name, namespace);
        cmd.user = input.user.clone();
        cmd.cwd = input.cwd.clone();
        cmd.hostname = input.hostname.clone();
        if let Some(scope) = non_empty(&input.scope) {
            cmd.scope = scope.to_string();
        }

        self.save(&cmd).await
    }

    async fn namespace_for(&self, cwd: &str, user: Option<&str>) -> Result<String> {
        let detector = ContextDetector::new(Arc::clone(&self.db));
        let context = detector.detect_project_context(cwd, user).await?;

        Ok(context
            .detected_namespace
            .unwrap_or_else(|| QUICK_SAVE_NAMESPACE.to_string()))
    }

    // Append one row of execution history for a command the caller may see.
    // Usage stats are left alone.
    pub async fn record_execution(&self, input: &NewExecution) -> Result<Option<ExecutionRecord>> {
        let mut tx = self.db.begin_write().await?;

        if accessible_command(&mut tx, input.command_id, input.user.as_deref())
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let record = insert_execution(&mut tx, input).await?;
        tx.commit().await?;

        info!(
            command_id = record.command_id,
            method = %record.execution_method,
            "execution recorded"
        );
        Ok(Some(record))
    }

    fn validate(&self, input: &NewCommand) -> Result<()> {
        if input.command_string.is_empty() {
            return Err(RecallError::InvalidCommand("empty command".to_string()));
        }

        if input.command_string.chars().count() > MAX_COMMAND_LENGTH {
            return Err(RecallError::CommandTooLong(MAX_COMMAND_LENGTH));
        }

        if input.name.is_empty() {
            return Err(RecallError::InvalidCommand("empty name".to_string()));
        }

        if input.namespace.is_empty() {
            return Err(RecallError::InvalidCommand("empty namespace".to_string()));
        }

        if input.scope.trim().is_empty() {
            return Err(RecallError::InvalidCommand("empty scope".to_string()));
        }

        Ok(())
    }

    /// Strip null bytes and surrounding whitespace
    ///
    /// Inner whitespace is kept; it can matter inside quotes.
    fn sanitize_command(&self, command: &str) -> String {
        command.replace('\0', "").trim().to_string()
    }
}

/// Name for a command from its program word
///
/// `/usr/local/bin/docker-compose up` becomes `docker-compose`.
pub fn derive_name(command: &str) -> String {
    let program = command.split_whitespace().next().unwrap_or_default();
    let program = program.rsplit('/').next().unwrap_or(program);

    let name: String = program
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
