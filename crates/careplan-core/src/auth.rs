//! Staff sign-in and self-registration against the backend's auth endpoint.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use careplan_db::config::AuthConfig;

use crate::fixtures::DEMO_USER_ID;
use crate::mode::OperatingMode;

pub const DEMO_EMAIL: &str = "test@example.com";
pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_FULL_NAME: &str = "山田 花子";
pub const DEMO_ROLE: &str = "看護師";

/// Role stored for self-registered staff.
pub const DEFAULT_SIGNUP_ROLE: &str = "user";

pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("メールアドレスまたはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("認証に失敗しました。テスト用アカウントを使用してください。")]
    Unavailable,

    #[error("cannot reach auth service: {0}")]
    Network(String),

    #[error("unexpected auth response: {0}")]
    Response(String),

    #[error("not signed in (run `careplan login`)")]
    NotSignedIn,

    #[error("デモモードではアカウントを作成できません。テスト用アカウントでログインしてください。")]
    SignupUnavailable,

    #[error("{0}")]
    InvalidSignup(&'static str),

    #[error("このメールアドレスは既に登録されています")]
    AlreadyRegistered,
}

/// Name and role shown for the signed-in staff member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: String,
}

impl StaffProfile {
    fn demo() -> Self {
        Self {
            full_name: DEMO_FULL_NAME.to_owned(),
            role: DEMO_ROLE.to_owned(),
        }
    }
}

/// A signed-in staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub profile: StaffProfile,
    /// Bearer token from the backend. Absent for the demo user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub demo: bool,
}

impl Session {
    pub fn demo() -> Self {
        Self {
            user_id: DEMO_USER_ID.to_owned(),
            email: DEMO_EMAIL.to_owned(),
            profile: StaffProfile::demo(),
            access_token: None,
            demo: true,
        }
    }
}

/// A self-registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let fields = [&self.email, &self.password, &self.full_name, &self.role];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AuthError::InvalidSignup("すべての項目を入力してください"));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::InvalidSignup(
                "パスワードは6文字以上で入力してください",
            ));
        }
        if self.email.trim() == DEMO_EMAIL {
            return Err(AuthError::AlreadyRegistered);
        }
        Ok(())
    }

    fn body(&self) -> SignupBody<'_> {
        SignupBody {
            email: self.email.trim(),
            password: &self.password,
            data: ProfileFields {
                full_name: self.full_name.trim(),
                role: self.role.trim(),
            },
        }
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    pub user_id: String,
    /// The backend wants the address confirmed before the first sign-in.
    pub confirmation_required: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct ProfileFields<'a> {
    full_name: &'a str,
    role: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
    /// Stored by the backend as the user's metadata.
    data: ProfileFields<'a>,
}

#[derive(Serialize)]
struct ProfileRow<'a> {
    id: &'a str,
    #[serde(flatten)]
    fields: ProfileFields<'a>,
}

/// Signup answers with a full token when no confirmation is needed and
/// with the bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Session(TokenResponse),
    User(TokenUser),
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: StaffProfile,
}

impl TokenResponse {
    fn into_session(self, fallback_email: &str) -> Session {
        Session {
            user_id: self.user.id,
            email: self.user.email.unwrap_or_else(|| fallback_email.to_owned()),
            profile: self.user.user_metadata,
            access_token: Some(self.access_token),
            demo: false,
        }
    }
}

/// Holds the current session for the lifetime of a run.
pub struct AuthContext {
    config: Option<AuthConfig>,
    http: reqwest::Client,
    mode: OperatingMode,
    session: Option<Session>,
}

impl AuthContext {
    pub fn new(mode: OperatingMode, config: Option<AuthConfig>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            mode,
            session: None,
        }
    }

    /// Resume a session persisted by an earlier run.
    pub fn restore(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user_id(&self) -> Result<&str, AuthError> {
        self.session
            .as_ref()
            .map(|s| s.user_id.as_str())
            .ok_or(AuthError::NotSignedIn)
    }

    /// Sign in. The demo credential always succeeds without a network call;
    /// anything else needs a reachable auth endpoint.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Session, AuthError> {
        let email = email.trim();
        let session = if email == DEMO_EMAIL && password == DEMO_PASSWORD {
            Session::demo()
        } else {
            match (&self.config, self.mode.uses_remote_auth()) {
                (Some(config), true) => {
                    let mut session = self.password_grant(config, email, password).await?;
                    if let Some(profile) = self.fetch_profile(config, &session).await {
                        session.profile = profile;
                    }
                    session
                }
                _ => return Err(AuthError::Unavailable),
            }
        };
        info!(user_id = %session.user_id, demo = session.demo, "signed in");
        Ok(&*self.session.insert(session))
    }

    async fn password_grant(
        &self,
        config: &AuthConfig,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(config.token_url())
            .header("apikey", &config.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Response(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Response(e.to_string()))?;
        Ok(token.into_session(email))
    }

    /// Read the staff member's row from the `profiles` table. Any failure
    /// is logged and answered with `None`; the token's metadata then stands.
    async fn fetch_profile(&self, config: &AuthConfig, session: &Session) -> Option<StaffProfile> {
        let token = session.access_token.as_deref()?;
        let result = async {
            self.http
                .get(config.profiles_url())
                .query(&[
                    ("id", format!("eq.{}", session.user_id)),
                    ("select", "full_name,role".to_owned()),
                ])
                .header("apikey", &config.anon_key)
                .bearer_auth(token)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<StaffProfile>>()
                .await
        }
        .await;

        match result {
            Ok(rows) => rows.into_iter().next(),
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "profile lookup failed");
                None
            }
        }
    }

    /// Register a new staff account. The name and role travel as user
    /// metadata and, when the backend signs the user in at once, are also
    /// written to `profiles`. Does not sign in.
    pub async fn sign_up(&self, request: &SignupRequest) -> Result<SignupOutcome, AuthError> {
        let config = match (&self.config, self.mode.uses_remote_auth()) {
            (Some(config), true) => config,
            _ => return Err(AuthError::SignupUnavailable),
        };
        request.validate()?;

        let response = self
            .http
            .post(config.signup_url())
            .header("apikey", &config.anon_key)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("already registered") {
                return Err(AuthError::AlreadyRegistered);
            }
            return Err(AuthError::Response(format!("HTTP {status}: {body}")));
        }

        let parsed: SignupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Response(e.to_string()))?;
        let outcome = match parsed {
            SignupResponse::Session(token) => {
                self.insert_profile(config, &token.user.id, &token.access_token, request)
                    .await;
                SignupOutcome {
                    user_id: token.user.id,
                    confirmation_required: false,
                }
            }
            SignupResponse::User(user) => SignupOutcome {
                user_id: user.id,
                confirmation_required: true,
            },
        };
        info!(
            user_id = %outcome.user_id,
            confirmation_required = outcome.confirmation_required,
            "staff account registered"
        );
        Ok(outcome)
    }

    async fn insert_profile(
        &self,
        config: &AuthConfig,
        user_id: &str,
        token: &str,
        request: &SignupRequest,
    ) {
        let row = ProfileRow {
            id: user_id,
            fields: request.body().data,
        };
        let result = self
            .http
            .post(config.profiles_url())
            .header("apikey", &config.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(token)
            .json(&[row])
            .send()
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = result {
            warn!(user_id, error = %e, "profile insert failed");
        }
    }

    /// Drop the session. A failed backend logout is logged; the local
    /// session is cleared either way.
    pub async fn sign_out(&mut self) -> Option<Session> {
        let session = self.session.take()?;
        let remote = self.config.as_ref().filter(|_| self.mode.uses_remote_auth());
        if let (Some(config), Some(token)) = (remote, &session.access_token) {
            let result = self
                .http
                .post(config.logout_url())
                .header("apikey", &config.anon_key)
                .bearer_auth(token)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            if let Err(e) = result {
                warn!(user_id = %session.user_id, error = %e, "backend logout failed");
            }
        }
        info!(user_id = %session.user_id, "signed out");
        Some(session)
    }
}
