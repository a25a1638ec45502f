//! Session reuse, password login and the interactive two-factor step.
use anyhow::{Context, Result};
use followcheck_config::Credentials;
use followcheck_social::instagram::TwoFactorChallenge;
use followcheck_social::{InstagramApi, LoginError, SessionStore};

/// Source of the two-factor verification code.
pub trait CodePrompt: Send + Sync {
    fn verification_code(&self, challenge: &TwoFactorChallenge) -> Result<String>;
}

/// Asks on the controlling terminal.
pub struct TerminalPrompt;

impl CodePrompt for TerminalPrompt {
    fn verification_code(&self, challenge: &TwoFactorChallenge) -> Result<String> {
        let code: String = dialoguer::Input::new()
            .with_prompt(format!(
                "Enter the 2FA code sent to your device ({})",
                challenge.delivery
            ))
            .interact_text()
            .context("failed to read the verification code")?;
        Ok(code.trim().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginKind {
    SavedSession,
    Fresh,
    TwoFactor,
}

impl LoginKind {
    pub fn message(self) -> &'static str {
        match self {
            LoginKind::SavedSession => "Logged in using saved session",
            LoginKind::Fresh => "Logged in fresh and session saved",
            LoginKind::TwoFactor => "Logged in with 2FA successfully",
        }
    }
}

/// Log in, preferring the cached session.
///
/// A saved session that fails to load or validate is deleted and replaced by
/// a fresh login. Any failure of the fresh login aborts.
pub async fn login_with_session(
    api: InstagramApi,
    store: &SessionStore,
    creds: &Credentials,
    prompt: &dyn CodePrompt,
    fresh: bool,
) -> Result<(InstagramApi, LoginKind)> {
    if !fresh {
        match reuse_saved_session(&api, store, creds).await {
            Ok(Some(authed)) => {
                tracing::info!(path = %store.path().display(), "login.session_reused");
                return Ok((authed, LoginKind::SavedSession));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "login.session_rejected");
                store.remove()?;
            }
        }
    }

    let (session, kind) = match api.login(&creds.username, &creds.password).await {
        Ok(session) => (session, LoginKind::Fresh),
        Err(LoginError::TwoFactorRequired(challenge)) => {
            let code = prompt.verification_code(&challenge)?;
            let session = api
                .two_factor_login(&challenge, &code)
                .await
                .context("two-factor login failed")?;
            (session, LoginKind::TwoFactor)
        }
        Err(e) => return Err(e).context("login failed"),
    };

    store.save(&session)?;
    Ok((api.with_session(session), kind))
}

async fn reuse_saved_session(
    api: &InstagramApi,
    store: &SessionStore,
    creds: &Credentials,
) -> Result<Option<InstagramApi>> {
    let Some(session) = store.load()? else {
        return Ok(None);
    };
    if !session.username.eq_ignore_ascii_case(&creds.username) {
        anyhow::bail!(
            "saved session belongs to {}, not {}",
            session.username,
            creds.username
        );
    }
    let authed = api.clone().with_session(session);
    authed
        .validate_session()
        .await
        .context("saved session is no longer valid")?;
    Ok(Some(authed))
}
