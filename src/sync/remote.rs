use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Google identity-toolkit base used by the production backend. Tests point
/// this at an in-process mock instead.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the remote backend lives. The database is a Firebase-style document
/// store: whole-value `set`/`get` under `users/{uid}/...`, nothing more.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub api_key: String,
    pub identity_url: String,
    pub database_url: String,
}

impl SyncConfig {
    pub fn new(api_key: impl Into<String>, database_url: impl Into<String>) -> Self {
        SyncConfig {
            api_key: api_key.into(),
            identity_url: DEFAULT_IDENTITY_URL.into(),
            database_url: database_url.into(),
        }
    }
}

/// Identity bound after a successful login or registration. The user id
/// namespaces every remote read/write.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthSession {
    #[serde(rename = "localId")]
    pub user_id: String,
    #[serde(rename = "idToken")]
    pub id_token: String,
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct IdentityError {
    error: IdentityErrorInner,
}

#[derive(Deserialize)]
struct IdentityErrorInner {
    message: String,
}

/// Raw REST access to the identity provider and the document store. All
/// calls share one client with a bounded timeout — a timeout is a reportable
/// failure, never silently retried.
pub struct RemoteStore {
    http: reqwest::Client,
    config: SyncConfig,
}

impl RemoteStore {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(RemoteStore { http, config })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, SyncError> {
        self.identity_call("accounts:signUp", email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, SyncError> {
        self.identity_call("accounts:signInWithPassword", email, password)
            .await
    }

    async fn identity_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SyncError> {
        let url = format!(
            "{}/{}?key={}",
            self.config.identity_url, endpoint, self.config.api_key
        );
        // an unreachable or timed-out identity backend is an auth failure,
        // same as a rejection — the caller cannot log in either way
        let resp = self
            .http
            .post(&url)
            .json(&CredentialsBody {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let message = match resp.json::<IdentityError>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            return Err(SyncError::Auth(message));
        }
        resp.json::<AuthSession>()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))
    }

    /// Whole-document overwrite of `users/{uid}/{doc}` — last writer wins.
    pub async fn put_document<T: Serialize + ?Sized>(
        &self,
        session: &AuthSession,
        doc: &str,
        value: &T,
    ) -> Result<(), SyncError> {
        let resp = self
            .http
            .put(self.document_url(session, doc))
            .json(value)
            .send()
            .await?;
        check_db_response(resp).await?;
        Ok(())
    }

    /// Whole-document fetch. Remote `null` (never written) comes back `None`.
    pub async fn get_document<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        doc: &str,
    ) -> Result<Option<T>, SyncError> {
        let resp = self.http.get(self.document_url(session, doc)).send().await?;
        let resp = check_db_response(resp).await?;
        Ok(resp.json::<Option<T>>().await?)
    }

    fn document_url(&self, session: &AuthSession, doc: &str) -> String {
        format!(
            "{}/users/{}/{}.json?auth={}",
            self.config.database_url, session.user_id, doc, session.id_token
        )
    }
}

async fn check_db_response(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(SyncError::Remote { status, message })
}
