/// Intelligence module
///
/// Suggestions, similarity, project context learning and analytics.

pub mod analyzer;
pub mod context_detector;
pub mod scorer;
pub mod suggestion_engine;

pub use analyzer::Analyzer;
pub use context_detector::ContextDetector;
pub use scorer::Scorer;
pub use suggestion_engine::SuggestionEngine;
