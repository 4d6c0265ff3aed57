//! Scada-LTS adapter using the HTTP API.
//!
//! The server authenticates with a form login that answers with a session
//! cookie. The cookie is cached by [`SessionManager`] and attached to every
//! value read made by [`ScadaClient`].
//!
//! ## Endpoints
//!
//! - `POST {base}/login` with form fields `username`, `password`, `submit=Login`.
//!   A 2xx answer carries the session in `Set-Cookie`.
//! - `GET {base}/point_value/getValue/{register}` with the session in `Cookie`.
//!   A 200 answer carries `{"value": <number-or-null>, ...}`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use fieldgate_adapters::scada::ScadaClient;
//! use fieldgate_adapters::ValueSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ScadaClient::builder()
//!         .base_url("http://localhost:8080/Scada-LTS/api")
//!         .credentials("admin", "admin")
//!         .session_ttl(Duration::from_secs(1800))
//!         .build()?;
//!
//!     let value = client.fetch_value("DP_1001").await;
//!     println!("{:?}", value);
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{redirect, Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use fieldgate_types::SessionToken;

use crate::{AdapterError, ValueSource};

/// Default lifetime of a session cookie.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Caches one upstream session token and renews it when it expires.
///
/// The cache sits behind an async mutex that is held across the login
/// request, so at most one renewal is in flight and concurrent callers wait
/// for its result.
#[derive(Debug)]
pub struct SessionManager {
    client: Client,
    login_url: String,
    username: String,
    password: String,
    ttl: Duration,
    cache: Mutex<Option<SessionToken>>,
    logins: AtomicU64,
}

impl SessionManager {
    fn new(client: Client, base_url: &str, username: String, password: String, ttl: Duration) -> Self {
        Self {
            client,
            login_url: format!("{}/login", base_url),
            username,
            password,
            ttl,
            cache: Mutex::new(None),
            logins: AtomicU64::new(0),
        }
    }

    /// Return the cached token, logging in again if it is missing or expired.
    ///
    /// Returns `None` when the login fails; the failure is logged.
    pub async fn get_valid_token(&self) -> Option<SessionToken> {
        let mut cache = self.cache.lock().await;
        let now = Instant::now().into_std();

        if let Some(token) = cache.as_ref() {
            if token.is_valid_at(now) {
                return Some(token.clone());
            }
            debug!("Session token expired, renewing");
        }

        match self.login().await {
            Ok(cookie) => {
                let token = SessionToken::issued(cookie, now, self.ttl);
                *cache = Some(token.clone());
                info!(ttl_secs = self.ttl.as_secs(), "Authenticated with upstream server");
                Some(token)
            }
            Err(e) => {
                *cache = None;
                warn!(error = %e, "Upstream login failed");
                None
            }
        }
    }

    /// Drop the cached token so the next call logs in again.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Number of login requests made so far.
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    async fn login(&self) -> Result<String, AdapterError> {
        self.logins.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .post(&self.login_url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
                ("submit", "Login"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::Auth(format!(
                "login returned status {}",
                response.status()
            )));
        }

        let header = response
            .headers()
            .get(SET_COOKIE)
            .ok_or_else(|| AdapterError::Auth("login response has no Set-Cookie".to_string()))?;

        let header = header
            .to_str()
            .map_err(|e| AdapterError::Parse(format!("Set-Cookie is not text: {}", e)))?;

        parse_session_cookie(header)
            .ok_or_else(|| AdapterError::Parse(format!("malformed Set-Cookie '{}'", header)))
    }
}

/// Extract the `name=value` pair from a `Set-Cookie` header value.
pub fn parse_session_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    match pair.split_once('=') {
        Some((name, _)) if !name.trim().is_empty() => Some(pair.to_string()),
        _ => None,
    }
}

/// Reads register values from the upstream server.
#[derive(Debug, Clone)]
pub struct ScadaClient {
    client: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ScadaClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ScadaClientBuilder {
        ScadaClientBuilder::default()
    }

    /// The session manager shared by this client.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    async fn read_value(&self, register_id: &str, token: &SessionToken) -> Result<Value, AdapterError> {
        let url = format!(
            "{}/point_value/getValue/{}",
            self.base_url,
            urlencoding::encode(register_id)
        );

        let response = self
            .client
            .get(&url)
            .header(COOKIE, &token.value)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.session.invalidate().await;
                return Err(AdapterError::Auth(format!(
                    "value read returned status {}",
                    response.status()
                )));
            }
            status => {
                return Err(AdapterError::Http(format!(
                    "value read returned status {}",
                    status
                )));
            }
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        body.get("value")
            .cloned()
            .ok_or_else(|| AdapterError::Parse("response has no 'value' field".to_string()))
    }
}

#[async_trait]
impl ValueSource for ScadaClient {
    async fn fetch_value(&self, register_id: &str) -> Option<Value> {
        let token = self.session.get_valid_token().await?;

        match self.read_value(register_id, &token).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(register_id, error = %e, "Upstream value read failed");
                None
            }
        }
    }

    async fn reauthenticate(&self) -> bool {
        self.session.invalidate().await;
        self.session.get_valid_token().await.is_some()
    }
}

/// Builder for ScadaClient.
#[derive(Debug, Default)]
pub struct ScadaClientBuilder {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    session_ttl: Option<Duration>,
    timeout: Option<Duration>,
}

impl ScadaClientBuilder {
    /// Set the API base URL (e.g., "http://localhost:8080/Scada-LTS/api").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the login username and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set how long a session cookie is reused (default: 1 hour).
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ScadaClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        // The session cookie is only visible on the login response itself.
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AdapterError::InvalidConfig(e.to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://localhost:8080/Scada-LTS/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let session = SessionManager::new(
            client.clone(),
            &base_url,
            self.username.unwrap_or_else(|| "admin".to_string()),
            self.password.unwrap_or_else(|| "admin".to_string()),
            self.session_ttl.unwrap_or(DEFAULT_SESSION_TTL),
        );

        Ok(ScadaClient {
            client,
            base_url,
            session: Arc::new(session),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Form, Json, Router};
    use serde_json::json;

    const COOKIE_VALUE: &str = "JSESSIONID=abc123";

    struct FakeUpstream {
        logins: AtomicUsize,
        login_status: AxumStatus,
        set_cookie: Option<&'static str>,
    }

    impl FakeUpstream {
        fn healthy() -> Self {
            Self {
                logins: AtomicUsize::new(0),
                login_status: AxumStatus::OK,
                set_cookie: Some("JSESSIONID=abc123; Path=/Scada-LTS; HttpOnly"),
            }
        }
    }

    async fn login(
        State(upstream): State<Arc<FakeUpstream>>,
        Form(form): Form<std::collections::HashMap<String, String>>,
    ) -> Response {
        upstream.logins.fetch_add(1, Ordering::SeqCst);
        assert_eq!(form.get("submit").map(String::as_str), Some("Login"));

        match upstream.set_cookie {
            Some(cookie) => {
                (upstream.login_status, [(header::SET_COOKIE, cookie)], "ok").into_response()
            }
            None => (upstream.login_status, "ok").into_response(),
        }
    }

    async fn get_value(Path(id): Path<String>, headers: HeaderMap) -> Response {
        let authorized = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == COOKIE_VALUE)
            .unwrap_or(false);
        if !authorized {
            return AxumStatus::UNAUTHORIZED.into_response();
        }

        match id.as_str() {
            "S1" => Json(json!({ "value": 12.5, "xid": "S1" })).into_response(),
            "NULL" => Json(json!({ "value": null })).into_response(),
            "NOFIELD" => Json(json!({ "xid": "NOFIELD" })).into_response(),
            "GARBAGE" => (AxumStatus::OK, "<html>not json</html>").into_response(),
            "line 4/bay 2" => Json(json!({ "value": 7 })).into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn spawn_upstream(upstream: Arc<FakeUpstream>) -> String {
        let app = Router::new()
            .route("/login", post(login))
            .route("/point_value/getValue/{id}", get(get_value))
            .with_state(upstream);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: &str) -> ScadaClient {
        ScadaClient::builder()
            .base_url(base_url)
            .credentials("admin", "secret")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = ScadaClient::builder().build().unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/Scada-LTS/api");
        assert_eq!(client.session.username, "admin");
        assert_eq!(client.session.password, "admin");
        assert_eq!(client.session.ttl, DEFAULT_SESSION_TTL);
        assert_eq!(
            client.session.login_url,
            "http://localhost:8080/Scada-LTS/api/login"
        );
    }

    #[test]
    fn test_builder_custom() {
        let client = ScadaClient::builder()
            .base_url("http://scada.local/api/")
            .credentials("operator", "pw")
            .session_ttl(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(client.base_url, "http://scada.local/api");
        assert_eq!(client.session.username, "operator");
        assert_eq!(client.session.ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_session_cookie() {
        assert_eq!(
            parse_session_cookie("JSESSIONID=abc; Path=/; HttpOnly"),
            Some("JSESSIONID=abc".to_string())
        );
        assert_eq!(
            parse_session_cookie("  token=x=y "),
            Some("token=x=y".to_string())
        );
        assert_eq!(parse_session_cookie("no-equals-sign"), None);
        assert_eq!(parse_session_cookie("=orphan; Path=/"), None);
        assert_eq!(parse_session_cookie(""), None);
    }

    #[tokio::test]
    async fn token_is_reused_within_ttl() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream.clone()).await;
        let client = client_for(&base);

        let first = client.session().get_valid_token().await.unwrap();
        let second = client.session().get_valid_token().await.unwrap();

        assert_eq!(first.value, COOKIE_VALUE);
        assert_eq!(first, second);
        assert_eq!(upstream.logins.load(Ordering::SeqCst), 1);
        assert_eq!(client.session().login_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_login() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream.clone()).await;
        let client = client_for(&base);
        let session = client.session().clone();

        let calls = (0..8).map(|_| {
            let session = session.clone();
            tokio::spawn(async move { session.get_valid_token().await })
        });
        for call in calls.collect::<Vec<_>>() {
            assert!(call.await.unwrap().is_some());
        }

        assert_eq!(upstream.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_is_renewed() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream.clone()).await;
        let client = ScadaClient::builder()
            .base_url(&base)
            .session_ttl(Duration::from_millis(50))
            .build()
            .unwrap();

        client.session().get_valid_token().await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        client.session().get_valid_token().await.unwrap();

        assert_eq!(upstream.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_login_yields_no_token() {
        let upstream = Arc::new(FakeUpstream {
            login_status: AxumStatus::UNAUTHORIZED,
            ..FakeUpstream::healthy()
        });
        let base = spawn_upstream(upstream.clone()).await;
        let client = client_for(&base);

        assert!(client.session().get_valid_token().await.is_none());
        assert!(client.fetch_value("S1").await.is_none());
        // Nothing was cached, so every call tries again
        assert_eq!(upstream.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn login_without_cookie_yields_no_token() {
        let upstream = Arc::new(FakeUpstream {
            set_cookie: None,
            ..FakeUpstream::healthy()
        });
        let base = spawn_upstream(upstream).await;
        let client = client_for(&base);

        assert!(client.session().get_valid_token().await.is_none());
    }

    #[tokio::test]
    async fn fetch_value_reads_value_field() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream).await;
        let client = client_for(&base);

        assert_eq!(client.fetch_value("S1").await, Some(json!(12.5)));
        assert_eq!(client.fetch_value("NULL").await, Some(Value::Null));
    }

    #[tokio::test]
    async fn fetch_value_degrades_on_bad_responses() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream).await;
        let client = client_for(&base);

        assert_eq!(client.fetch_value("UNKNOWN").await, None);
        assert_eq!(client.fetch_value("NOFIELD").await, None);
        assert_eq!(client.fetch_value("GARBAGE").await, None);
    }

    #[tokio::test]
    async fn register_id_is_sent_as_one_path_segment() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream).await;
        let client = client_for(&base);

        assert_eq!(client.fetch_value("line 4/bay 2").await, Some(json!(7)));
        // Control characters must not collapse into another register's id
        assert_eq!(client.fetch_value("S\t1").await, None);
        assert_eq!(client.fetch_value("S\n1").await, None);
    }

    #[tokio::test]
    async fn fetch_value_on_unreachable_server_is_none() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr));
        assert_eq!(client.fetch_value("S1").await, None);
    }

    #[tokio::test]
    async fn rejected_session_is_dropped() {
        let upstream = Arc::new(FakeUpstream {
            set_cookie: Some("JSESSIONID=stale; Path=/"),
            ..FakeUpstream::healthy()
        });
        let base = spawn_upstream(upstream.clone()).await;
        let client = client_for(&base);

        assert_eq!(client.fetch_value("S1").await, None);
        assert_eq!(client.fetch_value("S1").await, None);
        // 401 drops the cached cookie, so each read logs in again
        assert_eq!(upstream.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reauthenticate_forces_fresh_login() {
        let upstream = Arc::new(FakeUpstream::healthy());
        let base = spawn_upstream(upstream.clone()).await;
        let client = client_for(&base);

        client.session().get_valid_token().await.unwrap();
        assert!(client.reauthenticate().await);
        assert_eq!(upstream.logins.load(Ordering::SeqCst), 2);
    }
}
