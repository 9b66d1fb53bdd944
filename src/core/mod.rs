/// Core functionality modules
///
/// Contains the main business logic for saving, recall,
/// searching, and project detection.

pub mod project_detector;
pub mod recorder;
pub mod retriever;
pub mod searcher;
pub mod tiers;

pub use project_detector::ProjectDetector;
pub use recorder::Recorder;
pub use retriever::Retriever;
pub use searcher::{SearchResult, Searcher};
