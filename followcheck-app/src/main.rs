use anyhow::{Context, Result};
use clap::Parser;
use followcheck_app::audit::run_audit;
use followcheck_app::cli::{Cli, DEFAULT_CONFIG_FILE};
use followcheck_app::login::{TerminalPrompt, login_with_session};
use followcheck_app::{api_settings, audit_settings};
use followcheck_common::observability::{LogConfig, init_logging};
use followcheck_config::{FollowcheckConfigLoader, load_env_file};
use followcheck_social::{InstagramApi, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) .env first so `${IG_USERNAME}`-style placeholders resolve
    let env_file = load_env_file(cli.env_file.as_deref())?;

    // 2) Config: file, then FOLLOWCHECK__* env, then CLI flags
    let loader = FollowcheckConfigLoader::new();
    let loader = match &cli.config {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("failed to load configuration")?;
    cli.apply(&mut cfg);

    let log_path = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::debug!(
        log = %log_path.display(),
        env_file = ?env_file,
        session = %cfg.session.path.display(),
        "followcheck.start"
    );

    let creds = cfg.account.credentials()?;
    let api = InstagramApi::new(api_settings(&cfg))?;
    let store = SessionStore::new(&cfg.session.path);

    let (api, kind) = login_with_session(api, &store, &creds, &TerminalPrompt, cli.fresh).await?;
    println!("{}", kind.message());

    let outcome = run_audit(&api, &creds.username, &audit_settings(&cfg)).await?;
    print!("{}", outcome.summary());
    tracing::info!(
        followers = outcome.followers,
        following = outcome.following,
        mutuals = outcome.comparison.mutual_count,
        "followcheck.done"
    );
    Ok(())
}
