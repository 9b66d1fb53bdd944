/// Data models for database entities
///
/// Row types map to database tables and use sqlx for type-safe queries.
/// Request types carry the caller's optional context; an absent field means
/// "skip whatever needs it", never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scope value that marks a command as private to its owner
pub const PERSONAL_SCOPE: &str = "personal";

/// Default number of suggestions returned
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Default analytics window in days
pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;

fn default_scope() -> String {
    PERSONAL_SCOPE.to_string()
}

fn default_execution_method() -> String {
    "unknown".to_string()
}

fn default_suggestion_limit() -> usize {
    DEFAULT_SUGGESTION_LIMIT
}

/// Represents a saved command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Command {
    pub id: i64,
    pub command_string: String,
    pub name: String,
    pub namespace: String,
    pub user: Option<String>,
    pub cwd: Option<String>,
    pub hostname: Option<String>,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub use_count: i64,
}

/// Input for saving a new command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCommand {
    pub command_string: String,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl NewCommand {
    /// Personal command with no context attached
    pub fn new(
        command_string: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            command_string: command_string.into(),
            name: name.into(),
            namespace: namespace.into(),
            user: None,
            cwd: None,
            hostname: None,
            scope: default_scope(),
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// Result of a save: the stored record and whether it was just inserted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCommand {
    #[serde(flatten)]
    pub command: Command,
    pub is_new: bool,
}

/// Input for quick-save, where name and namespace may be derived
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickSave {
    pub command_string: String,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub user: Option<String>,
    pub cwd: Option<String>,
    pub hostname: Option<String>,
    pub scope: Option<String>,
}

/// Recall by exact name and namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallRequest {
    pub name: String,
    pub namespace: String,
    pub user: Option<String>,
    pub hostname: Option<String>,
    pub cwd: Option<String>,
}

/// Recall by name alone, guided by optional hints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallByNameRequest {
    pub name: String,
    pub user: Option<String>,
    pub hostname: Option<String>,
    pub cwd: Option<String>,
    pub namespace_hint: Option<String>,
    pub scope_hint: Option<String>,
}

/// Context for suggestion lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default = "default_suggestion_limit")]
    pub limit: usize,
}

impl Default for SuggestionsRequest {
    fn default() -> Self {
        Self {
            user: None,
            hostname: None,
            cwd: None,
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

/// Filters for listing the catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandFilter {
    /// Substring of the command text
    pub q: Option<String>,
    pub namespace: Option<String>,
    pub user: Option<String>,
    pub scope: Option<String>,
}

/// One tracked invocation of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExecutionRecord {
    pub id: i64,
    pub command_id: i64,
    pub user: Option<String>,
    pub hostname: Option<String>,
    pub cwd: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub arguments: Option<String>, // opaque, usually JSON
    pub execution_method: String,
    pub duration_ms: Option<i64>,
    pub exit_code: Option<i32>,
}

/// Input for recording an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExecution {
    pub command_id: i64,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default = "default_execution_method")]
    pub execution_method: String,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl NewExecution {
    pub fn new(command_id: i64) -> Self {
        Self {
            command_id,
            user: None,
            hostname: None,
            cwd: None,
            arguments: None,
            execution_method: default_execution_method(),
            duration_ms: None,
            exit_code: None,
        }
    }
}

/// Learned association between a directory name and a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProjectContext {
    pub id: i64,
    pub directory_pattern: String,
    pub detected_namespace: String,
    pub project_type: String,
    pub confidence_score: i64,
    pub last_detected: DateTime<Utc>,
    pub usage_count: i64,
}

/// Outcome of project-context detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContextResponse {
    pub detected_namespace: Option<String>,
    pub project_type: Option<String>,
    pub confidence_score: i64,
    pub similar_commands: Vec<String>,
}

/// Execution count for one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CommandUsage {
    pub name: String,
    pub namespace: String,
    pub execution_count: i64,
}

/// Execution count for one resolution method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MethodCount {
    pub execution_method: String,
    pub count: i64,
}

/// Aggregated execution statistics over a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAnalytics {
    pub total_executions: i64,
    pub unique_commands: i64,
    pub average_executions_per_day: f64,
    pub most_used_commands: Vec<CommandUsage>,
    /// Ordered by count, highest first
    pub execution_methods: Vec<MethodCount>,
}

impl ExecutionAnalytics {
    /// Count for a given method tag, if it appeared in the window
    pub fn method_count(&self, method: &str) -> Option<i64> {
        self.execution_methods
            .iter()
            .find(|m| m.execution_method == method)
            .map(|m| m.count)
    }
}
