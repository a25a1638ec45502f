//! Building blocks of the `followcheck` binary: CLI flags, the login flow and
//! the follower audit itself.
pub mod audit;
pub mod cli;
pub mod login;

use followcheck_config::FollowcheckConfig;
use followcheck_report::ReportWriter;
use followcheck_social::instagram::ApiSettings;
use std::time::Duration;

pub fn api_settings(cfg: &FollowcheckConfig) -> ApiSettings {
    ApiSettings {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        app_id: cfg.api.app_id.clone(),
        timeout: Duration::from_secs(cfg.api.timeout_secs),
        retries: cfg.api.retries,
        page_size: cfg.fetch.page_size,
        page_pause: Duration::from_millis(cfg.fetch.page_pause_ms),
    }
}

pub fn audit_settings(cfg: &FollowcheckConfig) -> audit::AuditSettings {
    audit::AuditSettings {
        pause: Duration::from_secs(cfg.fetch.pause_secs),
        writer: ReportWriter {
            dir: cfg.output.dir.clone(),
            fans_file: cfg.output.fans.clone(),
            not_following_back_file: cfg.output.not_following_back.clone(),
        },
    }
}
