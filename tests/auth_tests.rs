use hive_schedule::{Authenticator, Credentials, Error};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const RESPOND_TO_CHALLENGE: &str = "AWSCognitoIdentityProviderService.RespondToAuthChallenge";

fn authenticator(server: &MockServer) -> Authenticator {
    Authenticator::builder()
        .endpoint(server.uri())
        .client_id("test-client")
        .build()
}

fn auth_result(id: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut result = json!({
        "IdToken": id,
        "AccessToken": format!("access-{id}"),
        "ExpiresIn": 3600,
        "TokenType": "Bearer",
    });
    if let Some(refresh) = refresh {
        result["RefreshToken"] = json!(refresh);
    }
    json!({"AuthenticationResult": result, "ChallengeParameters": {}})
}

fn cognito_fault(fault: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({"__type": fault, "message": message}))
}

#[tokio::test]
async fn login_returns_token_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .and(body_string_contains("USER_PASSWORD_AUTH"))
        .and(body_string_contains("alice@example.com"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_result("id-1", Some("refresh-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let tokens = auth
        .login(&Credentials::new("alice@example.com", "hunter2"))
        .await
        .expect("login should succeed");

    assert_eq!(tokens.id_token, "id-1");
    assert_eq!(tokens.access_token, "access-id-1");
    assert_eq!(tokens.refresh_token, "refresh-1");
    assert!(!tokens.is_expired());
}

#[tokio::test]
async fn login_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .respond_with(cognito_fault(
            "NotAuthorizedException",
            "Incorrect username or password.",
        ))
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let err = auth
        .login(&Credentials::new("alice@example.com", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadCredentials), "got {err:?}");
}

#[tokio::test]
async fn login_without_code_when_mfa_demanded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ChallengeName": "SMS_MFA",
            "Session": "challenge-session-1",
            "ChallengeParameters": {"CODE_DELIVERY_DESTINATION": "+44*****1234"},
        })))
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let err = auth
        .login(&Credentials::new("alice@example.com", "hunter2"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MfaRequired), "got {err:?}");
}

#[tokio::test]
async fn login_completes_mfa_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ChallengeName": "SMS_MFA",
            "Session": "challenge-session-1",
            "ChallengeParameters": {},
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", RESPOND_TO_CHALLENGE))
        .and(body_string_contains("challenge-session-1"))
        .and(body_string_contains("654321"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_result("id-mfa", Some("refresh-mfa"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let tokens = auth
        .login(&Credentials::new("alice@example.com", "hunter2").with_mfa_code("654321"))
        .await
        .expect("mfa login should succeed");
    assert_eq!(tokens.id_token, "id-mfa");
}

#[tokio::test]
async fn login_with_wrong_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ChallengeName": "SMS_MFA",
            "Session": "challenge-session-1",
            "ChallengeParameters": {},
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", RESPOND_TO_CHALLENGE))
        .respond_with(cognito_fault("CodeMismatchException", "Invalid code received"))
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let err = auth
        .login(&Credentials::new("alice@example.com", "hunter2").with_mfa_code("000000"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MfaInvalid), "got {err:?}");
}

#[tokio::test]
async fn refresh_keeps_old_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .and(body_string_contains("REFRESH_TOKEN_AUTH"))
        .and(body_string_contains("refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_result("id-2", None)))
        .expect(1)
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let tokens = auth.refresh("refresh-1").await.expect("refresh should succeed");
    assert_eq!(tokens.id_token, "id-2");
    assert_eq!(tokens.refresh_token, "refresh-1");
}

#[tokio::test]
async fn refresh_with_dead_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", INITIATE_AUTH))
        .respond_with(cognito_fault("NotAuthorizedException", "Refresh Token has expired"))
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    let err = auth.refresh("refresh-1").await.unwrap_err();
    assert!(matches!(err, Error::TokenExpired), "got {err:?}");
}
