use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, info};
use url::Url;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

use super::token::TokenSet;
use super::token_store::TokenStore;

const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const OAUTH_CALLBACK_TIMEOUT_SECS: u64 = 180;
const OAUTH_SCOPES: &str = "https://www.googleapis.com/auth/gmail.modify https://www.googleapis.com/auth/gmail.send openid email";

#[derive(Debug, Serialize)]
pub struct AuthLoginResult {
    pub profile: String,
    pub opened_browser: bool,
    pub authorization_url: String,
    pub email: Option<String>,
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub profile: String,
    pub logged_in: bool,
    pub email: Option<String>,
    pub expired: Option<bool>,
    pub expires_in_seconds: Option<i64>,
    pub has_refresh_token: Option<bool>,
    pub note: Option<String>,
}

impl AuthStatus {
    pub fn logged_out(profile: &str, note: impl Into<String>) -> Self {
        Self {
            profile: profile.to_string(),
            logged_in: false,
            email: None,
            expired: None,
            expires_in_seconds: None,
            has_refresh_token: None,
            note: Some(note.into()),
        }
    }

    pub fn from_store<S: TokenStore + ?Sized>(profile: &str, store: &S) -> AppResult<Self> {
        let Some(token) = store.load(profile)? else {
            return Ok(Self::logged_out(profile, "no token found"));
        };

        let now = SystemTime::now();
        Ok(Self {
            profile: profile.to_string(),
            logged_in: true,
            email: token.email.clone(),
            expired: Some(token.is_expired(now)),
            expires_in_seconds: token.expires_in_seconds(now),
            has_refresh_token: Some(token.has_refresh_token()),
            note: Some("token loaded from local store".to_string()),
        })
    }
}

/// Installed-app OAuth client (authorization code + PKCE over a loopback redirect).
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
}

/// A completed interactive login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: TokenSet,
    pub authorization_url: String,
    pub opened_browser: bool,
}

impl OAuthClient {
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            client_id: settings.client_id()?.to_string(),
            client_secret: settings.client_secret().map(ToOwned::to_owned),
            redirect_uri: settings.redirect_uri(),
        })
    }

    pub async fn login(&self) -> AppResult<LoginOutcome> {
        let state = random_token(32);
        let code_verifier = random_token(96);
        let authorization_url = self.authorization_url(&state, &code_verifier)?;

        let opened_browser = open_browser(&authorization_url);
        if !opened_browser {
            eprintln!("open this URL in your browser to continue login:\n{authorization_url}");
        }

        let code = wait_for_auth_callback(
            &self.redirect_uri,
            &state,
            Duration::from_secs(OAUTH_CALLBACK_TIMEOUT_SECS),
        )
        .await?;

        let mut form = self.base_form("authorization_code");
        form.insert("code", code);
        form.insert("redirect_uri", self.redirect_uri.clone());
        form.insert("code_verifier", code_verifier);

        let mut token = self.exchange(form).await?;
        token.email = self.fetch_email(&token.access_token).await;
        info!(email = ?token.email, "oauth login completed");

        Ok(LoginOutcome {
            token,
            authorization_url,
            opened_browser,
        })
    }

    /// Exchanges the refresh token of `current` for a fresh access token.
    pub async fn refresh(&self, current: &TokenSet) -> AppResult<TokenSet> {
        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            AppError::Authorization("access token expired and no refresh token is stored".to_string())
        })?;

        let mut form = self.base_form("refresh_token");
        form.insert("refresh_token", refresh_token.clone());

        let mut token = self.exchange(form).await?;
        token.refresh_token.get_or_insert(refresh_token);
        if current.email.is_some() {
            token.email = current.email.clone();
        } else {
            token.email = self.fetch_email(&token.access_token).await;
        }

        debug!("refreshed oauth access token");
        Ok(token)
    }

    fn authorization_url(&self, state: &str, code_verifier: &str) -> AppResult<String> {
        let mut url = Url::parse(GOOGLE_AUTH_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", OAUTH_SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state)
            .append_pair("code_challenge", &pkce_challenge(code_verifier))
            .append_pair("code_challenge_method", "S256");
        Ok(url.to_string())
    }

    fn base_form(&self, grant_type: &str) -> HashMap<&'static str, String> {
        let mut form = HashMap::from([
            ("grant_type", grant_type.to_string()),
            ("client_id", self.client_id.clone()),
        ]);
        if let Some(client_secret) = &self.client_secret {
            form.insert("client_secret", client_secret.clone());
        }
        form
    }

    async fn exchange(&self, form: HashMap<&'static str, String>) -> AppResult<TokenSet> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_ENDPOINT)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_token_response(status, &body)
    }

    async fn fetch_email(&self, access_token: &str) -> Option<String> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        response.json::<UserInfoResponse>().await.ok()?.email
    }
}

/// Asks the provider to invalidate `token` and every grant derived from it.
pub async fn revoke_token(token: &str) -> AppResult<()> {
    let response = reqwest::Client::new()
        .post(GOOGLE_REVOKE_ENDPOINT)
        .form(&HashMap::from([("token", token.to_string())]))
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    Err(AppError::network(
        status.as_u16(),
        format!("revoke endpoint returned {status}"),
    ))
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: Option<String>,
}

fn parse_token_response(status: reqwest::StatusCode, body: &str) -> AppResult<TokenSet> {
    if status.is_success() {
        let payload: OAuthTokenResponse = serde_json::from_str(body)?;
        return Ok(TokenSet {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at_unix: expires_at_unix(payload.expires_in),
            token_type: payload.token_type,
            scope: payload.scope,
            email: None,
        });
    }

    let detail = match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(payload) => format!(
            "{} ({})",
            payload.error.as_deref().unwrap_or("unknown_oauth_error"),
            payload.error_description.as_deref().unwrap_or("no description")
        ),
        Err(_) => body.trim().to_string(),
    };

    Err(AppError::Authorization(format!(
        "oauth token exchange failed ({status}): {detail}"
    )))
}

fn expires_at_unix(expires_in: Option<u64>) -> Option<u64> {
    let expires_in = expires_in?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(now.saturating_add(expires_in))
}

async fn wait_for_auth_callback(
    redirect_uri: &str,
    expected_state: &str,
    timeout: Duration,
) -> AppResult<String> {
    let redirect = Url::parse(redirect_uri)?;
    if redirect.scheme() != "http" {
        return Err(AppError::Config(
            "redirect_uri must use http for local callback capture".to_string(),
        ));
    }

    let host = redirect
        .host_str()
        .ok_or_else(|| AppError::Config("redirect_uri is missing host".to_string()))?;
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| AppError::Config("redirect_uri is missing port".to_string()))?;

    let listener = TcpListener::bind((host, port)).await.map_err(|err| {
        AppError::Authorization(format!(
            "failed to bind oauth callback listener on {host}:{port}: {err}"
        ))
    })?;

    time::timeout(timeout, accept_callback(listener, redirect.path(), expected_state))
        .await
        .map_err(|_| AppError::Authorization("timed out waiting for oauth callback".to_string()))?
}

async fn accept_callback(
    listener: TcpListener,
    expected_path: &str,
    expected_state: &str,
) -> AppResult<String> {
    let (mut stream, _) = listener.accept().await?;

    let mut buf = vec![0_u8; 8192];
    let size = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..size]);
    let mut request_line = request.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let target = request_line.next().unwrap_or_default();

    if method != "GET" {
        write_callback_response(&mut stream, "405 Method Not Allowed", "oauth callback only accepts GET requests").await?;
        return Err(AppError::Authorization(
            "oauth callback received non-GET request".to_string(),
        ));
    }

    match extract_callback_code(target, expected_path, expected_state) {
        Ok(code) => {
            write_callback_response(
                &mut stream,
                "200 OK",
                "pgpmail auth complete. you can return to the terminal.",
            )
            .await?;
            Ok(code)
        }
        Err(err) => {
            let _ = write_callback_response(
                &mut stream,
                "400 Bad Request",
                &format!("oauth callback error: {err}"),
            )
            .await;
            Err(err)
        }
    }
}

fn extract_callback_code(
    target: &str,
    expected_path: &str,
    expected_state: &str,
) -> AppResult<String> {
    let callback_url = Url::parse(&format!("http://localhost{target}"))?;
    if callback_url.path() != expected_path {
        return Err(AppError::Authorization(format!(
            "oauth callback path mismatch: expected {expected_path}, got {}",
            callback_url.path()
        )));
    }

    let params: HashMap<String, String> = callback_url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or("no description");
        return Err(AppError::Authorization(format!(
            "oauth authorization failed: {error} ({description})"
        )));
    }

    match params.get("state") {
        Some(state) if state == expected_state => {}
        Some(_) => {
            return Err(AppError::Authorization(
                "oauth state mismatch; aborting login".to_string(),
            ));
        }
        None => {
            return Err(AppError::Authorization(
                "oauth callback missing state parameter".to_string(),
            ));
        }
    }

    params.get("code").cloned().ok_or_else(|| {
        AppError::Authorization("oauth callback missing code parameter".to_string())
    })
}

async fn write_callback_response(
    stream: &mut TcpStream,
    status: &str,
    message: &str,
) -> AppResult<()> {
    let body = format!(
        "<!doctype html><html><body><p>{}</p></body></html>",
        html_escape::encode_text(message)
    );

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn open_browser(url: &str) -> bool {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        std::process::Command::new("xdg-open")
    };

    command
        .arg(url)
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_callback_code() {
        let code = extract_callback_code("/callback?code=abc123&state=xyz", "/callback", "xyz")
            .expect("callback should parse");
        assert_eq!(code, "abc123");
    }

    #[test]
    fn rejects_state_mismatch() {
        let result =
            extract_callback_code("/callback?code=abc123&state=wrong", "/callback", "expected");
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[test]
    fn surfaces_provider_error_from_callback() {
        let result = extract_callback_code(
            "/callback?error=access_denied&error_description=nope&state=xyz",
            "/callback",
            "xyz",
        );
        match result {
            Err(AppError::Authorization(message)) => assert!(message.contains("access_denied")),
            other => panic!("expected authorization error, got {other:?}"),
        }
    }

    #[test]
    fn pkce_challenge_is_url_safe_sha256() {
        let challenge = pkce_challenge("test_verifier_value");
        assert_eq!(challenge.len(), 43);
        assert!(!challenge.contains('+') && !challenge.contains('/'));
    }

    #[test]
    fn token_error_body_becomes_authorization_error() {
        let result = parse_token_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        );
        match result {
            Err(AppError::Authorization(message)) => {
                assert!(message.contains("invalid_grant"));
                assert!(message.contains("expired or revoked"));
            }
            other => panic!("expected authorization error, got {other:?}"),
        }
    }
}
