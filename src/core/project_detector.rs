/// Project detection from filesystem markers
///
/// Each detector is keyed by the marker file that identifies its project
/// type. Detectors that know their manifest format can also pull a project
/// name out of it; that part is best effort and never fails the caller.

use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Known project types, one per marker file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectDetector {
    Npm,
    Cargo,
    Python,
    Maven,
    Git,
    Pip,
    Go,
    Docker,
}

impl ProjectDetector {
    /// Probe order; the first marker present wins
    pub const ALL: [ProjectDetector; 8] = [
        ProjectDetector::Npm,
        ProjectDetector::Cargo,
        ProjectDetector::Python,
        ProjectDetector::Maven,
        ProjectDetector::Git,
        ProjectDetector::Pip,
        ProjectDetector::Go,
        ProjectDetector::Docker,
    ];

    /// File or directory whose presence identifies the project type
    pub fn marker(self) -> &'static str {
        match self {
            ProjectDetector::Npm => "package.json",
            ProjectDetector::Cargo => "Cargo.toml",
            ProjectDetector::Python => "pyproject.toml",
            ProjectDetector::Maven => "pom.xml",
            ProjectDetector::Git => ".git",
            ProjectDetector::Pip => "requirements.txt",
            ProjectDetector::Go => "go.mod",
            ProjectDetector::Docker => "Dockerfile",
        }
    }

    /// Type tag stored with a learned project context
    pub fn project_type(self) -> &'static str {
        match self {
            ProjectDetector::Npm => "npm",
            ProjectDetector::Cargo => "cargo",
            ProjectDetector::Python => "python",
            ProjectDetector::Maven => "maven",
            ProjectDetector::Git => "git",
            ProjectDetector::Pip => "pip",
            ProjectDetector::Go => "go",
            ProjectDetector::Docker => "docker",
        }
    }

    pub fn is_present<P: AsRef<Path>>(self, dir: P) -> bool {
        dir.as_ref().join(self.marker()).exists()
    }

    /// First detector whose marker exists directly in `dir`
    pub fn probe<P: AsRef<Path>>(dir: P) -> Option<ProjectDetector> {
        let dir = dir.as_ref();
        Self::ALL.into_iter().find(|detector| detector.is_present(dir))
    }

    /// Project name declared in the manifest, if this type has one
    ///
    /// Unreadable or malformed manifests yield `None`.
    pub fn project_name<P: AsRef<Path>>(self, dir: P) -> Option<String> {
        let parse: fn(&str) -> Option<String> = match self {
            ProjectDetector::Npm => parse_package_json,
            ProjectDetector::Cargo => parse_cargo_toml,
            ProjectDetector::Python => parse_pyproject,
            ProjectDetector::Go => parse_go_mod,
            _ => return None,
        };

        let path = dir.as_ref().join(self.marker());
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read project manifest");
                return None;
            }
        };

        let name = parse(&contents).filter(|name| !name.trim().is_empty());
        if name.is_none() {
            debug!(path = %path.display(), "no project name in manifest");
        }
        name
    }
}

/// Last path segment of a directory path
///
/// `None` for paths with no final component, like `/`.
pub fn dir_name(path: &str) -> Option<&str> {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
}

fn parse_package_json(contents: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(contents)
        .map_err(|e| warn!(error = %e, "malformed package.json"))
        .ok()?;
    value.get("name")?.as_str().map(str::to_string)
}

fn parse_cargo_toml(contents: &str) -> Option<String> {
    let value: toml::Value = toml::from_str(contents)
        .map_err(|e| warn!(error = %e, "malformed Cargo.toml"))
        .ok()?;
    value.get("package")?.get("name")?.as_str().map(str::to_string)
}

fn parse_pyproject(contents: &str) -> Option<String> {
    let value: toml::Value = toml::from_str(contents)
        .map_err(|e| warn!(error = %e, "malformed pyproject.toml"))
        .ok()?;

    let pep621 = value.get("project").and_then(|p| p.get("name"));
    let poetry = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("name"));

    pep621.or(poetry)?.as_str().map(str::to_string)
}

fn parse_go_mod(contents: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^module\s+(\S+)").ok()?;
    let module = re.captures(contents)?.get(1)?.as_str();
    module.rsplit('/').next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_probe_order() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join("Dockerfile"), "FROM alpine").unwrap();
        assert_eq!(ProjectDetector::probe(temp.path()), Some(ProjectDetector::Git));

        fs::write(temp.path().join("Cargo.toml"), "").unwrap();
        assert_eq!(ProjectDetector::probe(temp.path()), Some(ProjectDetector::Cargo));
    }

    #[test]
    fn test_probe_nothing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(ProjectDetector::probe(temp.path()), None);
    }

    #[test]
    fn test_package_json_name() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"name": "web-frontend", "version": "1.0.0"}"#,
        )
        .unwrap();

        let name = ProjectDetector::Npm.project_name(temp.path());
        assert_eq!(name.as_deref(), Some("web-frontend"));
    }

    #[test]
    fn test_malformed_manifest_is_none() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), "{ not json").unwrap();
        assert_eq!(ProjectDetector::Npm.project_name(temp.path()), None);

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\nmembers = []\n").unwrap();
        assert_eq!(ProjectDetector::Cargo.project_name(temp.path()), None);
    }

    #[test]
    fn test_cargo_and_pyproject_names() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("Cargo.toml"),
            "[package]\nname = \"ripwalk\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("pyproject.toml"),
            "[tool.poetry]\nname = \"datakit\"\n",
        )
        .unwrap();

        assert_eq!(ProjectDetector::Cargo.project_name(temp.path()).as_deref(), Some("ripwalk"));
        assert_eq!(ProjectDetector::Python.project_name(temp.path()).as_deref(), Some("datakit"));
    }

    #[test]
    fn test_go_mod_last_segment() {
        assert_eq!(
            parse_go_mod("module github.com/acme/widget\n\ngo 1.22\n").as_deref(),
            Some("widget")
        );
        assert_eq!(parse_go_mod("go 1.22\n"), None);
    }

    #[test]
    fn test_markerless_types_have_no_name() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        assert_eq!(ProjectDetector::Git.project_name(temp.path()), None);
    }

    #[test]
    fn test_dir_name() {
        assert_eq!(dir_name("/home/user/my-awesome-project"), Some("my-awesome-project"));
        assert_eq!(dir_name("/home/user/proj/"), Some("proj"));
        assert_eq!(dir_name("/"), None);
    }
}
