/// Project context detection
///
/// Learns which namespace belongs to a directory. A directory is keyed by
/// its last path segment; the first sighting probes the filesystem for
/// project markers, later sightings reuse and reinforce what was stored.

use crate::core::project_detector::{dir_name, ProjectDetector};
use crate::db::queries::{
    command_names_in_namespace, find_project_context, insert_project_context,
    touch_project_context,
};
use crate::db::{Database, ProjectContext, ProjectContextResponse};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence when no marker is found
const BASE_CONFIDENCE: i64 = 50;
/// Confidence when a marker is found
const MARKER_CONFIDENCE: i64 = 80;
/// Confidence when the manifest also names the project
const NAMED_CONFIDENCE: i64 = 90;
/// Same-namespace command names returned for a known directory
const SIMILAR_COMMANDS: i64 = 5;
/// Stored project type when no marker matched
const UNKNOWN_TYPE: &str = "unknown";

/// Context detector
pub struct ContextDetector {
    db: Arc<Database>,
}

impl ContextDetector {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Detect or recall the namespace for a directory
    pub async fn detect_project_context(
        &self,
        directory: &str,
        user: Option<&str>,
    ) -> Result<ProjectContextResponse> {
        let directory = directory.trim();
        if directory.is_empty() {
            return Ok(ProjectContextResponse::default());
        }
        let pattern = dir_name(directory).unwrap_or(directory);

        let mut tx = self.db.begin_write().await?;

        let response = match find_project_context(&mut tx, pattern).await? {
            Some(seen) => {
                let context = touch_project_context(&mut tx, seen.id).await?;
                let similar =
                    command_names_in_namespace(&mut tx, &context.detected_namespace, SIMILAR_COMMANDS)
                        .await?;
                debug!(pattern, usage = context.usage_count, ?user, "known project directory");
                response_for(context, similar)
            }
            None => {
                let (namespace, detector, confidence) = Self::probe(directory, pattern);
                let project_type = detector.map_or(UNKNOWN_TYPE, ProjectDetector::project_type);
                let context =
                    insert_project_context(&mut tx, pattern, &namespace, project_type, confidence)
                        .await?;
                info!(pattern, namespace = %namespace, project_type, confidence, "learned project directory");
                response_for(context, Vec::new())
            }
        };

        tx.commit().await?;
        Ok(response)
    }

    /// Guess namespace, project type and confidence from the filesystem
    fn probe(directory: &str, pattern: &str) -> (String, Option<ProjectDetector>, i64) {
        let dir = Path::new(directory);

        let Some(detector) = ProjectDetector::probe(dir) else {
            return (pattern.to_string(), None, BASE_CONFIDENCE);
        };

        match detector.project_name(dir) {
            Some(name) => (name, Some(detector), NAMED_CONFIDENCE),
            None => (pattern.to_string(), Some(detector), MARKER_CONFIDENCE),
        }
    }
}

fn response_for(context: ProjectContext, similar_commands: Vec<String>) -> ProjectContextResponse {
    let project_type = Some(context.project_type).filter(|t| t != UNKNOWN_TYPE);

    ProjectContextResponse {
        detected_namespace: Some(context.detected_namespace),
        project_type,
        confidence_score: context.confidence_score,
        similar_commands,
    }
}
