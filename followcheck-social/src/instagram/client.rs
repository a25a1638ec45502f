//! Wrapper around the Instagram private API with followcheck defaults.
//!
//! Handles the password and two-factor login steps, attaches the session
//! token to later calls, and walks `max_id` pagination for follower lists.
use crate::graph::{Relationship, SocialGraph};
use crate::instagram::session::Session;
use crate::instagram::types::{
    FriendshipsPage, LoginFailure, LoginResponse, StatusResponse, TwoFactorChallenge, UserShort,
    WebProfileInfo,
};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use followcheck_http::{Auth, HttpClient, HttpError, JsonResponse, RequestOpts};
use followcheck_http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::json;
use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const AUTH_HEADER: &str = "ig-set-authorization";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub user_agent: String,
    pub app_id: String,
    pub timeout: Duration,
    pub retries: usize,
    pub page_size: u32,
    /// Pause between pages of the same list.
    pub page_pause: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://i.instagram.com".into(),
            user_agent: "Instagram 269.0.0.18.75 Android".into(),
            app_id: "567067343352427".into(),
            timeout: Duration::from_secs(15),
            retries: 2,
            page_size: 200,
            page_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("two-factor authentication required ({})", .0.delivery)]
    TwoFactorRequired(TwoFactorChallenge),
    #[error("login rejected: {message}")]
    Rejected {
        message: String,
        error_type: Option<String>,
    },
    #[error("login response missing {0}")]
    Incomplete(&'static str),
    #[error(transparent)]
    Http(#[from] HttpError),
}

#[derive(Clone)]
pub struct InstagramApi {
    http: HttpClient,
    settings: ApiSettings,
    device_id: String,
    uuid: String,
    session: Option<Session>,
}

impl std::fmt::Debug for InstagramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramApi")
            .field("base_url", &self.settings.base_url)
            .field("device_id", &self.device_id)
            .field("user", &self.session.as_ref().map(|s| s.username.as_str()))
            .finish_non_exhaustive()
    }
}

impl InstagramApi {
    pub fn new(settings: ApiSettings) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&settings.user_agent)?);
        headers.insert(
            HeaderName::from_static("x-ig-app-id"),
            header_value(&settings.app_id)?,
        );
        let http = HttpClient::new(&settings.base_url)?
            .with_timeout(settings.timeout)
            .with_retries(settings.retries)
            .with_default_headers(headers);

        let uuid = Uuid::new_v4();
        let device_id = format!("android-{}", &uuid.simple().to_string()[..16]);
        Ok(Self {
            http,
            settings,
            device_id,
            uuid: uuid.to_string(),
            session: None,
        })
    }

    /// Reuse a saved session, including the device identity it was created with.
    pub fn with_session(mut self, session: Session) -> Self {
        self.device_id = session.device_id.clone();
        self.uuid = session.uuid.clone();
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Password login. A pending two-factor challenge comes back as
    /// [`LoginError::TwoFactorRequired`]; finish it with [`InstagramApi::two_factor_login`].
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, LoginError> {
        let data = json!({
            "username": username,
            "enc_password": format!("#PWD_INSTAGRAM:0:{}:{}", Utc::now().timestamp(), password),
            "device_id": self.device_id,
            "guid": self.uuid,
            "phone_id": self.uuid,
            "login_attempt_count": "0",
        });
        tracing::info!(%username, "instagram.login.start");
        let resp = self.post_signed("api/v1/accounts/login/", &data).await;
        self.finish_login(resp, username)
    }

    pub async fn two_factor_login(
        &self,
        challenge: &TwoFactorChallenge,
        code: &str,
    ) -> Result<Session, LoginError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LoginError::Rejected {
                message: "empty verification code".into(),
                error_type: None,
            });
        }
        let data = json!({
            "verification_code": code,
            "two_factor_identifier": challenge.identifier,
            "username": challenge.username,
            "device_id": self.device_id,
            "guid": self.uuid,
            "trust_this_device": "1",
            "verification_method": if challenge.totp { "3" } else { "1" },
        });
        tracing::info!(username = %challenge.username, "instagram.login.two_factor");
        let resp = self
            .post_signed("api/v1/accounts/two_factor_login/", &data)
            .await;
        self.finish_login(resp, &challenge.username)
    }

    /// Cheap authenticated call used to check that a saved session still works.
    pub async fn validate_session(&self) -> Result<()> {
        let opts = self.authed_opts()?;
        let resp: StatusResponse = self.http.get_json("api/v1/feed/timeline/", opts).await?;
        match resp.status.as_deref() {
            Some("ok") | None => Ok(()),
            Some(other) => bail!("timeline check returned status {other}"),
        }
    }

    async fn post_signed(
        &self,
        path: &str,
        data: &serde_json::Value,
    ) -> Result<JsonResponse<LoginResponse>, HttpError> {
        let form = [("signed_body", Cow::Owned(format!("SIGNATURE.{data}")))];
        // Login is not idempotent from the server's point of view; never retry it.
        let opts = RequestOpts {
            retries: Some(0),
            ..Default::default()
        };
        self.http.post_form_with_headers(path, &form, opts).await
    }

    fn finish_login(
        &self,
        resp: Result<JsonResponse<LoginResponse>, HttpError>,
        username: &str,
    ) -> Result<Session, LoginError> {
        let resp = resp.map_err(|err| classify_login_error(err, username))?;
        let authorization = resp
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().trim_start_matches("Bearer ").trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(LoginError::Incomplete("ig-set-authorization header"))?;

        let user = resp.body.logged_in_user;
        tracing::info!(user_id = %user.pk, username = %user.username, "instagram.login.ok");
        Ok(Session {
            user_id: user.pk,
            username: user.username,
            authorization,
            device_id: self.device_id.clone(),
            uuid: self.uuid.clone(),
            created_at: Utc::now(),
        })
    }

    fn authed_opts(&self) -> Result<RequestOpts<'_>> {
        let session = self
            .session
            .as_ref()
            .context("not logged in: no session attached")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("ig-u-ds-user-id"),
            header_value(&session.user_id)?,
        );
        Ok(RequestOpts {
            auth: Some(Auth::Bearer(&session.authorization)),
            headers: Some(headers),
            ..Default::default()
        })
    }

    async fn fetch_page(
        &self,
        user_id: &str,
        kind: Relationship,
        max_id: Option<&str>,
    ) -> Result<FriendshipsPage> {
        let mut opts = self.authed_opts()?;
        let mut query = vec![("count", Cow::Owned(self.settings.page_size.to_string()))];
        if let Some(cursor) = max_id {
            query.push(("max_id", Cow::Borrowed(cursor)));
        }
        opts.query = Some(query);
        let path = format!("api/v1/friendships/{user_id}/{kind}/");
        let page = self
            .http
            .get_json(&path, opts)
            .await
            .with_context(|| format!("fetching {kind} of {user_id}"))?;
        Ok(page)
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(raw).map_err(|e| HttpError::Build(format!("invalid header value: {e}")))
}

fn classify_login_error(err: HttpError, username: &str) -> LoginError {
    let failure = match &err {
        HttpError::Api { body, .. } => serde_json::from_str::<LoginFailure>(body).ok(),
        _ => None,
    };
    let Some(failure) = failure else {
        return LoginError::Http(err);
    };

    if failure.two_factor_required {
        if let Some(info) = failure.two_factor_info {
            let delivery = if info.totp_two_factor_on {
                "authenticator app".to_string()
            } else {
                match info.obfuscated_phone_number {
                    Some(n) if !n.is_empty() => format!("SMS to ***{n}"),
                    _ => "SMS".to_string(),
                }
            };
            return LoginError::TwoFactorRequired(TwoFactorChallenge {
                identifier: info.two_factor_identifier,
                username: info.username.unwrap_or_else(|| username.to_string()),
                delivery,
                totp: info.totp_two_factor_on,
            });
        }
    }
    if failure.message.is_empty() {
        return LoginError::Http(err);
    }
    LoginError::Rejected {
        message: failure.message,
        error_type: failure.error_type,
    }
}

#[async_trait::async_trait]
impl SocialGraph for InstagramApi {
    async fn user_id_from_username(&self, username: &str) -> Result<String> {
        let mut opts = self.authed_opts()?;
        opts.query = Some(vec![("username", Cow::Borrowed(username))]);
        let info: WebProfileInfo = self
            .http
            .get_json("api/v1/users/web_profile_info/", opts)
            .await
            .with_context(|| format!("looking up user id of {username}"))?;
        match info.data.user {
            Some(user) => {
                tracing::debug!(%username, user_id = %user.id, "instagram.user_id");
                Ok(user.id)
            }
            None => bail!("user {username} not found"),
        }
    }

    async fn relationship(&self, user_id: &str, kind: Relationship) -> Result<Vec<UserShort>> {
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        let mut page_no = 0usize;

        loop {
            page_no += 1;
            let page = self.fetch_page(user_id, kind, cursor.as_deref()).await?;
            tracing::debug!(
                %kind,
                page = page_no,
                got = page.users.len(),
                next = ?page.next_max_id,
                "instagram.friendships.page"
            );
            users.extend(page.users);

            // Any cursor seen before means the server is cycling.
            match page.next_max_id {
                Some(next) if !seen.insert(next.clone()) => {
                    tracing::warn!(%kind, cursor = %next, "instagram.friendships.cursor_repeated");
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
            if !self.settings.page_pause.is_zero() {
                tokio::time::sleep(self.settings.page_pause).await;
            }
        }

        tracing::info!(%kind, total = users.len(), pages = page_no, "instagram.friendships.done");
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{
        body_string_contains, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_api(server: &MockServer) -> InstagramApi {
        InstagramApi::new(ApiSettings {
            base_url: server.uri(),
            retries: 0,
            page_size: 2,
            page_pause: Duration::ZERO,
            ..Default::default()
        })
        .unwrap()
    }

    fn session() -> Session {
        Session {
            user_id: "99".into(),
            username: "me".into(),
            authorization: "IGT:2:token".into(),
            device_id: "android-0011223344556677".into(),
            uuid: "2b1c2b1c-0000-4000-8000-000000000000".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn login_success_builds_session_from_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/login/"))
            .and(header("x-ig-app-id", "567067343352427"))
            .and(body_string_contains("signed_body=SIGNATURE."))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ig-set-authorization", "Bearer IGT:2:fresh")
                    .set_body_json(serde_json::json!({
                        "logged_in_user": { "pk": 99, "username": "me" },
                        "status": "ok"
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = test_api(&server);
        let session = api.login("me", "pw").await.unwrap();
        assert_eq!(session.user_id, "99");
        assert_eq!(session.username, "me");
        assert_eq!(session.authorization, "IGT:2:fresh");
        assert!(session.device_id.starts_with("android-"));
    }

    #[tokio::test]
    async fn login_without_token_header_is_incomplete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "logged_in_user": { "pk": 99, "username": "me" }
            })))
            .mount(&server)
            .await;

        let err = test_api(&server).login("me", "pw").await.unwrap_err();
        assert!(matches!(err, LoginError::Incomplete(_)));
    }

    #[tokio::test]
    async fn login_reports_two_factor_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/login/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "",
                "two_factor_required": true,
                "two_factor_info": {
                    "two_factor_identifier": "tfid",
                    "username": "me",
                    "obfuscated_phone_number": "42",
                    "totp_two_factor_on": false
                },
                "status": "fail"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_api(&server).login("me", "pw").await.unwrap_err();
        match err {
            LoginError::TwoFactorRequired(ch) => {
                assert_eq!(ch.identifier, "tfid");
                assert_eq!(ch.username, "me");
                assert_eq!(ch.delivery, "SMS to ***42");
                assert!(!ch.totp);
            }
            other => panic!("expected two-factor challenge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_password_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/login/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "The password you entered is incorrect.",
                "error_type": "bad_password",
                "status": "fail"
            })))
            .mount(&server)
            .await;

        let err = test_api(&server).login("me", "wrong").await.unwrap_err();
        match err {
            LoginError::Rejected {
                message,
                error_type,
            } => {
                assert!(message.contains("incorrect"));
                assert_eq!(error_type.as_deref(), Some("bad_password"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn two_factor_login_sends_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/two_factor_login/"))
            .and(body_string_contains("123456"))
            .and(body_string_contains("tfid"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ig-set-authorization", "Bearer IGT:2:after2fa")
                    .set_body_json(serde_json::json!({
                        "logged_in_user": { "pk": "99", "username": "me" }
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let challenge = TwoFactorChallenge {
            identifier: "tfid".into(),
            username: "me".into(),
            delivery: "SMS".into(),
            totp: false,
        };
        let session = test_api(&server)
            .two_factor_login(&challenge, " 123456\n")
            .await
            .unwrap();
        assert_eq!(session.authorization, "IGT:2:after2fa");
    }

    #[tokio::test]
    async fn empty_code_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        let challenge = TwoFactorChallenge {
            identifier: "tfid".into(),
            username: "me".into(),
            delivery: "SMS".into(),
            totp: false,
        };
        let err = test_api(&server)
            .two_factor_login(&challenge, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Rejected { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn validate_session_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/feed/timeline/"))
            .and(header("authorization", "Bearer IGT:2:token"))
            .and(header("ig-u-ds-user-id", "99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = test_api(&server).with_session(session());
        api.validate_session().await.unwrap();
    }

    #[tokio::test]
    async fn expired_session_fails_validation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/feed/timeline/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "login_required",
                "status": "fail"
            })))
            .mount(&server)
            .await;

        let api = test_api(&server).with_session(session());
        assert!(api.validate_session().await.is_err());
    }

    #[tokio::test]
    async fn reads_require_a_session() {
        let server = MockServer::start().await;
        let err = test_api(&server)
            .user_id_from_username("me")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not logged in"));
    }

    #[tokio::test]
    async fn resolves_user_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/web_profile_info/"))
            .and(query_param("username", "me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "user": { "id": "99", "username": "me" } },
                "status": "ok"
            })))
            .mount(&server)
            .await;

        let api = test_api(&server).with_session(session());
        assert_eq!(api.user_id_from_username("me").await.unwrap(), "99");
    }

    #[tokio::test]
    async fn followers_walk_every_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/friendships/99/followers/"))
            .and(query_param("count", "2"))
            .and(query_param_is_missing("max_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [
                    { "pk": 1, "username": "alice" },
                    { "pk": 2, "username": "bob" }
                ],
                "next_max_id": "2",
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/friendships/99/followers/"))
            .and(query_param("max_id", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [ { "pk": 3, "username": "carol" } ],
                "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = test_api(&server).with_session(session());
        let users = api.followers("99").await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn repeated_cursor_stops_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/friendships/99/following/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [ { "pk": 1, "username": "alice" } ],
                "next_max_id": "same"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let api = test_api(&server).with_session(session());
        let users = api.following("99").await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn cycling_cursors_stop_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/friendships/99/followers/"))
            .and(query_param("max_id", "A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [ { "pk": 2, "username": "bob" } ],
                "next_max_id": "B"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/friendships/99/followers/"))
            .and(query_param("max_id", "B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [ { "pk": 3, "username": "carol" } ],
                "next_max_id": "A"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/friendships/99/followers/"))
            .and(query_param_is_missing("max_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [ { "pk": 1, "username": "alice" } ],
                "next_max_id": "A"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = test_api(&server).with_session(session());
        let users = tokio::time::timeout(Duration::from_secs(5), api.followers("99"))
            .await
            .expect("paging terminates")
            .unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }
}
