/// Execution analytics
///
/// Aggregates execution history over a trailing window of days.

use crate::db::{Database, ExecutionAnalytics};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Size of the most-executed list
const TOP_COMMANDS: i64 = 10;

/// Main analyzer
pub struct Analyzer {
    db: Arc<Database>,
}

impl Analyzer {
    /// Create a new analyzer
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Summarize executions from the last `days` days, optionally for one user
    ///
    /// An empty user name means everyone.
    pub async fn analytics(&self, user: Option<&str>, days: i64) -> Result<ExecutionAnalytics> {
        let user = user.filter(|u| !u.is_empty());
        let since = Duration::try_days(days.max(0))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let (total_executions, unique_commands) = self.db.execution_totals(since, user).await?;
        let most_used_commands = self.db.most_executed(since, user, TOP_COMMANDS).await?;
        let execution_methods = self.db.execution_method_counts(since, user).await?;

        let average_executions_per_day = if days > 0 {
            total_executions as f64 / days as f64
        } else {
            0.0
        };

        Ok(ExecutionAnalytics {
            total_executions,
            unique_commands,
            average_executions_per_day,
            most_used_commands,
            execution_methods,
        })
    }
}
