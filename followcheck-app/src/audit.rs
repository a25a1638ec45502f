use anyhow::{Context, Result};
use followcheck_report::{Comparison, Relationships, ReportPaths, ReportWriter};
use followcheck_social::SocialGraph;
use std::fmt::Write as _;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Wait after each full list fetch.
    pub pause: Duration,
    pub writer: ReportWriter,
}

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub followers: usize,
    pub following: usize,
    pub comparison: Comparison,
    pub paths: ReportPaths,
}

impl AuditOutcome {
    pub fn summary(&self) -> String {
        let mut out = String::from("TXT files saved:\n");
        let _ = writeln!(
            out,
            "   - {} not following you back -> {}",
            self.comparison.not_following_back.len(),
            self.paths.not_following_back.display()
        );
        let _ = writeln!(
            out,
            "   - {} you're not following back -> {}",
            self.comparison.fans.len(),
            self.paths.fans.display()
        );
        let _ = writeln!(out, "   - {} mutual", self.comparison.mutual_count);
        out
    }
}

/// Fetch both lists for `username`, compare them and write the report.
pub async fn run_audit(
    graph: &dyn SocialGraph,
    username: &str,
    settings: &AuditSettings,
) -> Result<AuditOutcome> {
    let user_id = graph.user_id_from_username(username).await?;

    tracing::info!(%username, %user_id, "Fetching followers...");
    let followers = graph
        .followers(&user_id)
        .await
        .context("fetching followers")?;
    pause(settings.pause).await;

    tracing::info!(%username, %user_id, "Fetching following...");
    let following = graph
        .following(&user_id)
        .await
        .context("fetching following")?;
    pause(settings.pause).await;

    let rel = Relationships::new(
        followers.iter().map(|u| u.username.as_str()),
        following.iter().map(|u| u.username.as_str()),
    );
    let comparison = Comparison::between(&rel);
    let paths = settings.writer.write(&comparison)?;

    Ok(AuditOutcome {
        followers: rel.followers.len(),
        following: rel.following.len(),
        comparison,
        paths,
    })
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}
