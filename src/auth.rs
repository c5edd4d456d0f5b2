use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};

use crate::types::{Credentials, TokenSet};
use crate::{Error, Result};

/// Cognito user pool the vendor's own apps authenticate against.
pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_CLIENT_ID: &str = "3rl4i0ajrmtdm8sbre54p9dvd9";

const AMZ_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const TARGET_RESPOND_TO_CHALLENGE: &str =
    "AWSCognitoIdentityProviderService.RespondToAuthChallenge";

#[derive(Clone, Copy)]
enum Flow {
    Login,
    Refresh,
}

pub struct AuthenticatorBuilder {
    client_id: String,
    region: String,
    endpoint: Option<String>,
    timeout: Duration,
}

impl AuthenticatorBuilder {
    pub fn new() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Override the identity-provider URL entirely (tests, proxies).
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Authenticator {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("failed to build HTTP client");
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", self.region));
        Authenticator {
            http,
            endpoint,
            client_id: self.client_id,
        }
    }
}

impl Default for AuthenticatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Token lifecycle against the hosted identity provider: username/password
/// login (with an optional one-time MFA code) and refresh-token exchange.
#[derive(Clone)]
pub struct Authenticator {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
}

impl Authenticator {
    pub fn builder() -> AuthenticatorBuilder {
        AuthenticatorBuilder::new()
    }

    /// Exchange credentials for a fresh token set.
    ///
    /// Fails with [`Error::MfaRequired`] when the pool demands a one-time
    /// code and none was supplied, and [`Error::MfaInvalid`] when the
    /// supplied code is rejected.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenSet> {
        debug!(username = %credentials.username, "logging in");
        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "USERNAME": credentials.username,
                "PASSWORD": credentials.password,
            },
        });
        let response = self.call(TARGET_INITIATE_AUTH, &body, Flow::Login).await?;

        if let Some(challenge) = response.get("ChallengeName").and_then(|v| v.as_str()) {
            let code = match credentials.mfa_code.as_deref() {
                Some(code) => code,
                None => return Err(Error::MfaRequired),
            };
            return self.answer_challenge(credentials, challenge, &response, code).await;
        }

        parse_authentication_result(&response, None)
    }

    /// Mint a new token set from a stored refresh token.
    ///
    /// Fails with [`Error::TokenExpired`] once the refresh token itself is no
    /// longer accepted; the caller must log in again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        debug!("refreshing tokens");
        let body = json!({
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "REFRESH_TOKEN": refresh_token,
            },
        });
        let response = self.call(TARGET_INITIATE_AUTH, &body, Flow::Refresh).await?;
        parse_authentication_result(&response, Some(refresh_token))
    }

    async fn answer_challenge(
        &self,
        credentials: &Credentials,
        challenge: &str,
        initiate_response: &Value,
        code: &str,
    ) -> Result<TokenSet> {
        let code_key = match challenge {
            "SMS_MFA" => "SMS_MFA_CODE",
            "SOFTWARE_TOKEN_MFA" => "SOFTWARE_TOKEN_MFA_CODE",
            other => return Err(Error::Protocol(format!("unsupported auth challenge: {other}"))),
        };
        let session = initiate_response
            .get("Session")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Protocol("challenge without a session token".to_string()))?;

        let mut responses = Map::new();
        responses.insert(
            "USERNAME".to_string(),
            Value::String(credentials.username.clone()),
        );
        responses.insert(code_key.to_string(), Value::String(code.to_string()));

        let body = json!({
            "ChallengeName": challenge,
            "ClientId": self.client_id,
            "Session": session,
            "ChallengeResponses": responses,
        });
        let response = self
            .call(TARGET_RESPOND_TO_CHALLENGE, &body, Flow::Login)
            .await?;
        parse_authentication_result(&response, None)
    }

    async fn call(&self, target: &str, body: &Value, flow: Flow) -> Result<Value> {
        trace!(target, "identity provider request");
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", AMZ_CONTENT_TYPE)
            .header("X-Amz-Target", target)
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if (200..300).contains(&status) {
            return serde_json::from_str(&text)
                .map_err(|e| Error::Protocol(format!("identity provider response: {e}")));
        }
        Err(map_fault(flow, status, &text))
    }
}

/// Map a Cognito fault document onto the crate's error taxonomy. Faults we
/// have no mapping for surface as plain HTTP errors.
fn map_fault(flow: Flow, status: u16, body: &str) -> Error {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let fault = parsed
        .get("__type")
        .and_then(|v| v.as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t))
        .unwrap_or("");
    let message = parsed
        .get("message")
        .or_else(|| parsed.get("Message"))
        .and_then(|v| v.as_str())
        .unwrap_or(body)
        .to_string();

    match (flow, fault) {
        (Flow::Login, "NotAuthorizedException" | "UserNotFoundException") => Error::BadCredentials,
        (Flow::Refresh, "NotAuthorizedException") => Error::TokenExpired,
        (_, "CodeMismatchException" | "ExpiredCodeException") => Error::MfaInvalid,
        _ => Error::Http { status, message },
    }
}

fn parse_authentication_result(response: &Value, prior_refresh: Option<&str>) -> Result<TokenSet> {
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct AuthenticationResult {
        id_token: String,
        access_token: String,
        #[serde(default)]
        refresh_token: Option<String>,
        expires_in: i64,
    }

    let result = response
        .get("AuthenticationResult")
        .ok_or_else(|| Error::Protocol("response without AuthenticationResult".to_string()))?;
    let result: AuthenticationResult = serde_json::from_value(result.clone())
        .map_err(|e| Error::Protocol(format!("malformed AuthenticationResult: {e}")))?;

    // A refresh grant omits RefreshToken; the old one stays valid.
    let refresh_token = result
        .refresh_token
        .or_else(|| prior_refresh.map(str::to_string))
        .ok_or_else(|| Error::Protocol("login response carried no refresh token".to_string()))?;

    Ok(TokenSet {
        id_token: result.id_token,
        access_token: result.access_token,
        refresh_token,
        expires_at: Utc::now() + chrono::Duration::seconds(result.expires_in),
    })
}
