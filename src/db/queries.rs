/// SQL query functions for database operations
///
/// The store side of the engine: point lookups, filtered scans, grouped
/// aggregations and single-row atomic updates. Functions taking a
/// `SqliteConnection` run inside a caller-owned transaction; the
/// `impl Database` methods open and commit their own.

use crate::db::models::*;
use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info};

/// Increment usage stats on one command and return the updated row
///
/// `last_used_at` never moves backwards, even if the clock does.
pub(crate) async fn bump_usage(conn: &mut SqliteConnection, id: i64) -> Result<Command> {
    let now = Utc::now();
    let command = sqlx::query_as::<_, Command>(
        r#"
        UPDATE commands SET
            use_count = use_count + 1,
            last_used_at = CASE
                WHEN last_used_at IS NOT NULL AND last_used_at > ? THEN last_used_at
                ELSE ?
            END
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    debug!(id, use_count = command.use_count, "usage stats updated");
    Ok(command)
}

/// Fetch a command the caller may see: owned by `user`, or shared
///
/// `user` compares null-safely, so an anonymous caller sees owner-less
/// personal commands as well as shared ones.
pub(crate) async fn accessible_command(
    conn: &mut SqliteConnection,
    id: i64,
    user: Option<&str>,
) -> Result<Option<Command>> {
    let command = sqlx::query_as::<_, Command>(
        "SELECT * FROM commands WHERE id = ? AND (user IS ? OR scope != ?)",
    )
    .bind(id)
    .bind(user)
    .bind(PERSONAL_SCOPE)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(command)
}

pub(crate) async fn insert_execution(
    conn: &mut SqliteConnection,
    input: &NewExecution,
) -> Result<ExecutionRecord> {
    let record = sqlx::query_as::<_, ExecutionRecord>(
        r#"
        INSERT INTO execution_history
            (command_id, user, hostname, cwd, executed_at, arguments, execution_method, duration_ms, exit_code)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(input.command_id)
    .bind(&input.user)
    .bind(&input.hostname)
    .bind(&input.cwd)
    .bind(Utc::now())
    .bind(&input.arguments)
    .bind(&input.execution_method)
    .bind(input.duration_ms)
    .bind(input.exit_code)
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}

pub(crate) async fn find_project_context(
    conn: &mut SqliteConnection,
    directory_pattern: &str,
) -> Result<Option<ProjectContext>> {
    let context = sqlx::query_as::<_, ProjectContext>(
        "SELECT * FROM project_contexts WHERE directory_pattern = ?",
    )
    .bind(directory_pattern)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(context)
}

/// Record a repeat detection: one more use, five more confidence (max 100)
pub(crate) async fn touch_project_context(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<ProjectContext> {
    let context = sqlx::query_as::<_, ProjectContext>(
        r#"
        UPDATE project_contexts SET
            usage_count = usage_count + 1,
            confidence_score = MIN(100, confidence_score + 5),
            last_detected = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(context)
}

pub(crate) async fn insert_project_context(
    conn: &mut SqliteConnection,
    directory_pattern: &str,
    detected_namespace: &str,
    project_type: &str,
    confidence_score: i64,
) -> Result<ProjectContext> {
    let context = sqlx::query_as::<_, ProjectContext>(
        r#"
        INSERT INTO project_contexts
            (directory_pattern, detected_namespace, project_type, confidence_score, last_detected, usage_count)
        VALUES (?, ?, ?, ?, ?, 1)
        RETURNING *
        "#,
    )
    .bind(directory_pattern)
    .bind(detected_namespace)
    .bind(project_type)
    .bind(confidence_score)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(context)
}

pub(crate) async fn command_names_in_namespace(
    conn: &mut SqliteConnection,
    namespace: &str,
    limit: i64,
) -> Result<Vec<String>> {
    let names: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM commands WHERE namespace = ? ORDER BY id LIMIT ?")
            .bind(namespace)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

    Ok(names.into_iter().map(|(name,)| name).collect())
}

impl Database {
    /// Save a command unless an identical one already exists
    ///
    /// Identity is the full tuple of text, name, namespace, user, cwd,
    /// hostname and scope. A match is returned untouched with `is_new`
    /// false.
    pub async fn create_command(&self, input: &NewCommand) -> Result<SavedCommand> {
        let mut tx = self.begin_write().await?;

        let existing = sqlx::query_as::<_, Command>(
            r#"
            SELECT * FROM commands
            WHERE command_string = ? AND name = ? AND namespace = ?
              AND user IS ? AND cwd IS ? AND hostname IS ? AND scope = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(&input.command_string)
        .bind(&input.name)
        .bind(&input.namespace)
        .bind(&input.user)
        .bind(&input.cwd)
        .bind(&input.hostname)
        .bind(&input.scope)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(command) = existing {
            tx.commit().await?;
            debug!(id = command.id, "identical command already saved");
            return Ok(SavedCommand {
                command,
                is_new: false,
            });
        }

        let command = sqlx::query_as::<_, Command>(
            r#"
            INSERT INTO commands
                (command_string, name, namespace, user, cwd, hostname, scope, created_at, use_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(&input.command_string)
        .bind(&input.name)
        .bind(&input.namespace)
        .bind(&input.user)
        .bind(&input.cwd)
        .bind(&input.hostname)
        .bind(&input.scope)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id = command.id, name = %command.name, namespace = %command.namespace, "command saved");

        Ok(SavedCommand {
            command,
            is_new: true,
        })
    }

    /// Get command by ID without any ownership check
    pub async fn get_command_by_id(&self, id: i64) -> Result<Option<Command>> {
        let command = sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(command)
    }

    /// Get a command if `user` owns it or it is shared
    pub async fn get_accessible_command(&self, id: i64, user: &str) -> Result<Option<Command>> {
        let mut conn = self.pool().acquire().await?;
        accessible_command(&mut conn, id, Some(user)).await
    }

    /// Replace the command text of a command owned by `user`
    pub async fn update_command_text(
        &self,
        id: i64,
        user: &str,
        command_string: &str,
    ) -> Result<Option<Command>> {
        let command = sqlx::query_as::<_, Command>(
            "UPDATE commands SET command_string = ? WHERE id = ? AND user = ? RETURNING *",
        )
        .bind(command_string)
        .bind(id)
        .bind(user)
        .fetch_optional(self.pool())
        .await?;

        Ok(command)
    }

    /// Change name and namespace of a command owned by `user`
    pub async fn rename_command(
        &self,
        id: i64,
        user: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Command>> {
        let command = sqlx::query_as::<_, Command>(
            "UPDATE commands SET name = ?, namespace = ? WHERE id = ? AND user = ? RETURNING *",
        )
        .bind(name)
        .bind(namespace)
        .bind(id)
        .bind(user)
        .fetch_optional(self.pool())
        .await?;

        Ok(command)
    }

    /// Delete a command owned by `user`
    ///
    /// Its execution history goes with it through the foreign key cascade.
    pub async fn delete_command(&self, id: i64, user: &str) -> Result<Option<Command>> {
        let command = sqlx::query_as::<_, Command>(
            "DELETE FROM commands WHERE id = ? AND user = ? RETURNING *",
        )
        .bind(id)
        .bind(user)
        .fetch_optional(self.pool())
        .await?;

        Ok(command)
    }

    /// Bump usage stats on a command visible to `user`
    pub async fn track_execution(&self, id: i64, user: &str) -> Result<Option<Command>> {
        let mut tx = self.begin_write().await?;

        let command = match accessible_command(&mut tx, id, Some(user)).await? {
            Some(command) => bump_usage(&mut tx, command.id).await?,
            None => return Ok(None),
        };

        tx.commit().await?;
        Ok(Some(command))
    }

    /// List commands matching every filter that is set
    pub async fn list_commands(&self, filter: &CommandFilter) -> Result<Vec<Command>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM commands WHERE 1 = 1");

        if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
            query.push(" AND instr(command_string, ").push_bind(q.to_string()).push(") > 0");
        }
        if let Some(namespace) = &filter.namespace {
            query.push(" AND namespace = ").push_bind(namespace.clone());
        }
        if let Some(user) = &filter.user {
            query.push(" AND user = ").push_bind(user.clone());
        }
        if let Some(scope) = &filter.scope {
            query.push(" AND scope = ").push_bind(scope.clone());
        }
        query.push(" ORDER BY id");

        let commands = query
            .build_query_as::<Command>()
            .fetch_all(self.pool())
            .await?;

        Ok(commands)
    }

    /// All commands owned by a user
    pub async fn user_commands(&self, user: &str) -> Result<Vec<Command>> {
        self.list_commands(&CommandFilter {
            user: Some(user.to_string()),
            ..CommandFilter::default()
        })
        .await
    }

    /// Commands a user can see: their own plus every shared one
    pub async fn visible_commands(&self, user: Option<&str>) -> Result<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE user IS ? OR scope != ? ORDER BY use_count DESC, id",
        )
        .bind(user)
        .bind(PERSONAL_SCOPE)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Distinct namespaces, sorted
    pub async fn namespaces(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT namespace FROM commands ORDER BY namespace")
                .fetch_all(self.pool())
                .await?;

        Ok(rows.into_iter().map(|(ns,)| ns).collect())
    }

    /// Commands executed in directories whose path contains `dir_key`
    /// (ASCII case ignored), most executions first
    pub async fn commands_executed_near(&self, dir_key: &str, limit: i64) -> Result<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>(
            r#"
            SELECT c.* FROM commands c
            JOIN execution_history e ON e.command_id = c.id
            WHERE instr(lower(e.cwd), lower(?)) > 0
            GROUP BY c.id
            ORDER BY COUNT(e.id) DESC, c.id
            LIMIT ?
            "#,
        )
        .bind(dir_key)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Most used commands owned by a user
    pub async fn most_used_by_user(&self, user: &str, limit: i64) -> Result<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE user = ? ORDER BY use_count DESC, id LIMIT ?",
        )
        .bind(user)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Most used commands in any shared scope
    pub async fn most_used_shared(&self, limit: i64) -> Result<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE scope != ? ORDER BY use_count DESC, id LIMIT ?",
        )
        .bind(PERSONAL_SCOPE)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Other commands in the same namespace, most used first
    pub async fn namespace_peers(
        &self,
        id: i64,
        namespace: &str,
        limit: i64,
    ) -> Result<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE namespace = ? AND id != ? ORDER BY use_count DESC, id LIMIT ?",
        )
        .bind(namespace)
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Every command except one, in storage order
    pub async fn commands_except(&self, id: i64) -> Result<Vec<Command>> {
        let commands = sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id != ? ORDER BY id")
            .bind(id)
            .fetch_all(self.pool())
            .await?;

        Ok(commands)
    }

    /// Total executions and distinct commands executed since `since`
    pub async fn execution_totals(
        &self,
        since: DateTime<Utc>,
        user: Option<&str>,
    ) -> Result<(i64, i64)> {
        let totals: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(e.id), COUNT(DISTINCT c.id)
            FROM execution_history e
            LEFT JOIN commands c ON c.id = e.command_id
            WHERE e.executed_at >= ? AND (? IS NULL OR e.user = ?)
            "#,
        )
        .bind(since)
        .bind(user)
        .bind(user)
        .fetch_one(self.pool())
        .await?;

        Ok(totals)
    }

    /// Most executed commands since `since`
    pub async fn most_executed(
        &self,
        since: DateTime<Utc>,
        user: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CommandUsage>> {
        let usage = sqlx::query_as::<_, CommandUsage>(
            r#"
            SELECT c.name AS name, c.namespace AS namespace, COUNT(e.id) AS execution_count
            FROM execution_history e
            JOIN commands c ON c.id = e.command_id
            WHERE e.executed_at >= ? AND (? IS NULL OR e.user = ?)
            GROUP BY c.id, c.name, c.namespace
            ORDER BY execution_count DESC, c.id
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(user)
        .bind(user)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(usage)
    }

    /// Execution counts per resolution method since `since`
    pub async fn execution_method_counts(
        &self,
        since: DateTime<Utc>,
        user: Option<&str>,
    ) -> Result<Vec<MethodCount>> {
        let counts = sqlx::query_as::<_, MethodCount>(
            r#"
            SELECT execution_method, COUNT(id) AS count
            FROM execution_history
            WHERE executed_at >= ? AND (? IS NULL OR user = ?)
            GROUP BY execution_method
            ORDER BY count DESC, execution_method
            "#,
        )
        .bind(since)
        .bind(user)
        .bind(user)
        .fetch_all(self.pool())
        .await?;

        Ok(counts)
    }

    /// Execution history of one command, newest first
    pub async fn executions_for(&self, command_id: i64) -> Result<Vec<ExecutionRecord>> {
        let records = sqlx::query_as::<_, ExecutionRecord>(
            "SELECT * FROM execution_history WHERE command_id = ? ORDER BY executed_at DESC, id DESC",
        )
        .bind(command_id)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    /// Learned context for a directory name, if any
    pub async fn get_project_context(&self, directory_pattern: &str) -> Result<Option<ProjectContext>> {
        let mut conn = self.pool().acquire().await?;
        find_project_context(&mut conn, directory_pattern).await
    }
}
