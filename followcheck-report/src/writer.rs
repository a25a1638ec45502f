use crate::compare::Comparison;
use followcheck_common::{FollowcheckError, Result};
use std::path::{Path, PathBuf};

/// Where a comparison gets written.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    pub dir: PathBuf,
    pub fans_file: String,
    pub not_following_back_file: String,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            fans_file: "fans.txt".into(),
            not_following_back_file: "not_following_back.txt".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub fans: PathBuf,
    pub not_following_back: PathBuf,
}

/// File body for a list: one entry per line, every line newline-terminated.
pub fn render_lines(names: &[String]) -> String {
    let mut out = String::with_capacity(names.iter().map(|n| n.len() + 1).sum());
    for name in names {
        out.push_str(name);
        out.push('\n');
    }
    out
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn paths(&self) -> ReportPaths {
        ReportPaths {
            fans: self.dir.join(&self.fans_file),
            not_following_back: self.dir.join(&self.not_following_back_file),
        }
    }

    /// Create the output directory and overwrite both files.
    pub fn write(&self, cmp: &Comparison) -> Result<ReportPaths> {
        std::fs::create_dir_all(&self.dir).map_err(|e| FollowcheckError::io(&self.dir, e))?;
        let paths = self.paths();
        write_list(&paths.not_following_back, &cmp.not_following_back)?;
        write_list(&paths.fans, &cmp.fans)?;
        tracing::info!(
            dir = %self.dir.display(),
            fans = cmp.fans.len(),
            not_following_back = cmp.not_following_back.len(),
            "report.written"
        );
        Ok(paths)
    }
}

fn write_list(path: &Path, names: &[String]) -> Result<()> {
    std::fs::write(path, render_lines(names)).map_err(|e| FollowcheckError::io(path, e))
}
