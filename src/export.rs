//! Delivery of the exported history to the user's machine.

use crate::model::Application;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create export directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Hands an export payload to the user. Returns where it ended up.
pub trait Exporter: Send {
    fn deliver(&self, payload: &str, filename: &str) -> Result<PathBuf, ExportError>;
}

#[derive(Debug, Clone)]
enum Target {
    Directory(PathBuf),
    File(PathBuf),
}

/// Writes exports to disk, either as `filename` inside a directory or to one fixed path.
#[derive(Debug, Clone)]
pub struct FileExporter {
    target: Target,
}

impl FileExporter {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Directory(dir.into()),
        }
    }

    /// Ignore the suggested file name and always write to `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::File(path.into()),
        }
    }

    /// The user's download directory, falling back to the working directory.
    pub fn default_dir() -> PathBuf {
        dirs::download_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn destination(&self, filename: &str) -> PathBuf {
        match &self.target {
            Target::Directory(dir) => dir.join(filename),
            Target::File(path) => path.clone(),
        }
    }
}

impl Exporter for FileExporter {
    fn deliver(&self, payload: &str, filename: &str) -> Result<PathBuf, ExportError> {
        let path = self.destination(filename);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, payload).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

const CSV_HEADER: [&str; 7] = [
    "Job Title",
    "Company",
    "Location",
    "Salary",
    "Status",
    "URL",
    "Applied At",
];

/// Render history locally in the same layout the service's `/export` produces.
///
/// Used when the service export is unavailable; every data field is quoted.
pub fn history_csv(applications: &[Application]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for app in applications {
        let fields = [
            app.title.as_str(),
            app.company.as_str(),
            app.location.as_str(),
            app.salary.as_str(),
            app.status.as_str(),
            app.url.as_deref().unwrap_or(""),
            app.applied_at.as_str(),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApplicationId, ApplicationStatus};
    use pretty_assertions::assert_eq;

    fn sample() -> Application {
        Application {
            id: ApplicationId::Number(1),
            title: "Senior \"Rust\" Engineer".into(),
            company: "Acme, Inc".into(),
            location: "Remote".into(),
            salary: "$150K".into(),
            status: ApplicationStatus::Successful,
            applied_at: "2024-05-01 10:00:00".into(),
            url: Some("https://jobs.example/1".into()),
            keywords: None,
            job_type: None,
        }
    }

    #[test]
    fn csv_quotes_every_field() {
        let csv = history_csv(&[sample()]);
        assert_eq!(
            csv,
            "Job Title,Company,Location,Salary,Status,URL,Applied At\n\
             \"Senior \"\"Rust\"\" Engineer\",\"Acme, Inc\",\"Remote\",\"$150K\",\"successful\",\
             \"https://jobs.example/1\",\"2024-05-01 10:00:00\"\n"
        );
    }

    #[test]
    fn empty_history_is_header_only() {
        assert_eq!(
            history_csv(&[]),
            "Job Title,Company,Location,Salary,Status,URL,Applied At\n"
        );
    }

    #[test]
    fn directory_exporter_uses_suggested_name() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileExporter::in_dir(dir.path().join("nested"));
        let path = exporter.deliver("a,b\n", "history.csv").unwrap();
        assert_eq!(path, dir.path().join("nested").join("history.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }

    #[test]
    fn file_exporter_ignores_suggested_name() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.csv");
        let path = FileExporter::at_path(&target)
            .deliver("x\n", "history.csv")
            .unwrap();
        assert_eq!(path, target);
    }
}
