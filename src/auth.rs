use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::{self, Config};
use crate::error::{Error, Result};

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Skew applied before the real expiry so a token is refreshed rather than
/// rejected mid-call.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub local_id: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }

    /// The path segment this user's collection lives under.
    pub fn collection_owner(&self) -> String {
        safe_email(&self.email)
    }
}

/// The store keys user collections by email with path-hostile characters
/// replaced by underscores.
pub fn safe_email(email: &str) -> String {
    email
        .chars()
        .map(|c| match c {
            '.' | '#' | '$' | '[' | ']' => '_',
            other => other,
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

// The secure-token endpoint answers in snake_case, unlike the identity one.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    error: ApiErrorDetail,
}

pub struct AuthClient {
    config: Config,
    client: reqwest::blocking::Client,
}

impl AuthClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.password_grant("signInWithPassword", email, password)
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.password_grant("signUp", email, password)
    }

    fn password_grant(&self, action: &str, email: &str, password: &str) -> Result<Session> {
        let url = format!(
            "{}/accounts:{}?key={}",
            IDENTITY_BASE_URL, action, self.config.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&PasswordCredentials {
                email,
                password,
                return_secure_token: true,
            })
            .send()?;

        if !response.status().is_success() {
            return Err(identity_failure(action, response));
        }

        let body: SignInResponse = response.json()?;
        tracing::debug!(email = %body.email, "identity provider accepted credentials");
        Ok(Session {
            email: body.email,
            local_id: body.local_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in),
        })
    }

    pub fn refresh(&self, session: &Session) -> Result<Session> {
        let url = format!("{}?key={}", TOKEN_URL, self.config.api_key);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()?;

        if !response.status().is_success() {
            return Err(identity_failure("token refresh", response));
        }

        let body: RefreshResponse = response.json()?;
        Ok(Session {
            email: session.email.clone(),
            local_id: body.user_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in),
        })
    }

    /// Loads the cached session, refreshing it when close to expiry. This is
    /// the gate in front of every store call: without a cached sign-in it
    /// fails instead of proceeding.
    pub fn ensure_session(&self) -> Result<Session> {
        let path = config::session_path();
        let Some(mut session) = load_session(&path)? else {
            return Err(Error::Auth(
                "Please sign in to access your applications (run 'applied login')".to_string(),
            ));
        };
        if session.is_expired(Utc::now()) {
            session = self.refresh(&session)?;
            save_session(&path, &session)?;
        }
        Ok(session)
    }
}

fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let seconds = expires_in.parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}

fn identity_failure(action: &str, response: reqwest::blocking::Response) -> Error {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    Error::Auth(format!("{} failed ({}): {}", action, status, message))
}

// --- Session cache ---

pub fn load_session(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(session) => Ok(Some(session)),
        Err(err) => {
            // A corrupt cache means signed-out, not a hard failure.
            tracing::warn!(error = %err, path = %path.display(), "ignoring unreadable session cache");
            Ok(None)
        }
    }
}

pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

/// Removes the cached session; returns whether one existed.
pub fn clear_session(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            email: "me@example.com".to_string(),
            local_id: "uid1".to_string(),
            id_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_safe_email_replaces_path_hostile_characters() {
        assert_eq!(safe_email("me@example.com"), "me@example_com");
        assert_eq!(safe_email("a.b#c$d[e]f@g.h"), "a_b_c_d_e_f@g_h");
        assert_eq!(safe_email("plain@nodots"), "plain@nodots");
    }

    #[test]
    fn test_is_expired_applies_margin() {
        let now = Utc::now();
        let mut s = session();
        s.expires_at = now + Duration::seconds(30);
        assert!(s.is_expired(now));
        s.expires_at = now + Duration::seconds(120);
        assert!(!s.is_expired(now));
        s.expires_at = now - Duration::hours(1);
        assert!(s.is_expired(now));
    }

    #[test]
    fn test_session_cache_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "applied-session-roundtrip-{}.json",
            std::process::id()
        ));
        let original = session();
        save_session(&path, &original).unwrap();
        let loaded = load_session(&path).unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(clear_session(&path).unwrap());
        assert!(!clear_session(&path).unwrap());
    }

    #[test]
    fn test_corrupt_session_cache_reads_as_signed_out() {
        let path = std::env::temp_dir().join(format!(
            "applied-session-corrupt-{}.json",
            std::process::id()
        ));
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_session(&path).unwrap(), None);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_session_cache_reads_as_signed_out() {
        let path = std::env::temp_dir().join("applied-session-never-written.json");
        assert_eq!(load_session(&path).unwrap(), None);
    }
}
