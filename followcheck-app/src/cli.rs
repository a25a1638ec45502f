use clap::Parser;
use followcheck_common::observability::LogFormat;
use followcheck_config::FollowcheckConfig;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "followcheck.yaml";

/// Compare who you follow on Instagram with who follows you back.
#[derive(Debug, Parser)]
#[command(name = "followcheck", version, about)]
pub struct Cli {
    /// Config file; when omitted `followcheck.yaml` is read if present.
    #[arg(short, long, env = "FOLLOWCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// dotenv file holding IG_USERNAME / IG_PASSWORD (default: .env lookup).
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Directory for fans.txt and not_following_back.txt.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Session cache file.
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Ignore any saved session and log in with the password.
    #[arg(long)]
    pub fresh: bool,

    /// Seconds to wait after each list fetch.
    #[arg(long)]
    pub pause_secs: Option<u64>,

    #[arg(long, value_name = "text|json")]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Command-line flags win over file and environment settings.
    pub fn apply(&self, cfg: &mut FollowcheckConfig) {
        if let Some(dir) = &self.output_dir {
            cfg.output.dir = dir.clone();
        }
        if let Some(path) = &self.session {
            cfg.session.path = path.clone();
        }
        if let Some(secs) = self.pause_secs {
            cfg.fetch.pause_secs = secs;
        }
        if let Some(format) = self.log_format {
            cfg.logging.format = format;
        }
    }
}
