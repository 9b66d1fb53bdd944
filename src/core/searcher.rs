/// Command searcher with fuzzy matching
///
/// Provides fuzzy search capabilities for finding commands.

use crate::db::{Command, Database};
use crate::error::Result;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::sync::Arc;

/// A fuzzy match and its score
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub command: Command,
    pub score: i64,
}

/// Handles command searching with fuzzy matching
pub struct Searcher {
    db: Arc<Database>,
    matcher: SkimMatcherV2,
}

impl Searcher {
    /// Create a new searcher instance
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Fuzzy-find among the commands `user` can see
    ///
    /// Matches against namespace, name and command text together. An empty
    /// query lists candidates by use count.
    ///
    /// # Returns
    /// * `Ok(Vec<SearchResult>)` - Search results sorted by score
    pub async fn find(
        &self,
        user: Option<&str>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let commands = self.db.visible_commands(user).await?;
        let query = query.trim();

        if query.is_empty() {
            return Ok(commands
                .into_iter()
                .take(limit)
                .map(|command| SearchResult { command, score: 0 })
                .collect());
        }

        let mut results: Vec<SearchResult> = commands
            .into_iter()
            .filter_map(|cmd| {
                let haystack = format!("{} {} {}", cmd.namespace, cmd.name, cmd.command_string);
                self.matcher
                    .fuzzy_match(&haystack, query)
                    .map(|score| SearchResult {
                        command: cmd,
                        score,
                    })
            })
            .collect();

        // Highest score first; stable, so use-count order breaks ties
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(limit);

        Ok(results)
    }
}
