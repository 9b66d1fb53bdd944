/// Scoring for command similarity
///
/// Commands are compared as sets of lowercase whitespace-separated words.

use crate::db::Command;
use std::collections::HashSet;

/// Scorer for word-overlap similarity
pub struct Scorer;

impl Scorer {
    /// Lowercase word set of a command text
    pub fn word_set(text: &str) -> HashSet<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    /// Number of words two sets share
    pub fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> usize {
        a.intersection(b).count()
    }

    /// Rank candidates by overlap with `base`, highest first
    ///
    /// Candidates sharing no word are dropped. Equal overlaps keep their
    /// input order.
    pub fn rank_by_overlap(base: &str, candidates: Vec<Command>) -> Vec<(usize, Command)> {
        let base_words = Self::word_set(base);

        let mut ranked: Vec<(usize, Command)> = candidates
            .into_iter()
            .filter_map(|cmd| {
                let score = Self::overlap(&base_words, &Self::word_set(&cmd.command_string));
                (score > 0).then_some((score, cmd))
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked
    }
}
