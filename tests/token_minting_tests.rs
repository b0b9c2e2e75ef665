use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use device_gateway::GatewayError;
use device_gateway::google_oauth::ServiceAccountSigner;
use device_gateway::google_oauth::credentials::ServiceAccountKey;
use device_gateway::google_oauth::service::{AccessTokenProvider, CredentialSource};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const PRIVATE_KEY: &str = include_str!("fixtures/test_service_account_key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/test_service_account_pub.pem");
const CLIENT_EMAIL: &str = "gateway@lamp-demo.iam.gserviceaccount.com";

/// Token endpoint that fails the first `failures` hits with `fail_status`.
struct TokenEndpoint {
    hits: AtomicUsize,
    failures: usize,
    fail_status: StatusCode,
    expires_in: i64,
    forms: Mutex<Vec<HashMap<String, String>>>,
}

async fn issue(
    State(ep): State<Arc<TokenEndpoint>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = ep.hits.fetch_add(1, Ordering::SeqCst) + 1;
    ep.forms.lock().unwrap().push(form);
    if n <= ep.failures {
        return (ep.fail_status, Json(json!({"error": "try later"}))).into_response();
    }
    Json(json!({
        "access_token": format!("tok{n}"),
        "expires_in": ep.expires_in,
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn spawn_token_endpoint(
    failures: usize,
    fail_status: StatusCode,
    expires_in: i64,
) -> (String, Arc<TokenEndpoint>) {
    let ep = Arc::new(TokenEndpoint {
        hits: AtomicUsize::new(0),
        failures,
        fail_status,
        expires_in,
        forms: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/token", post(issue))
        .with_state(ep.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/token"), ep)
}

fn provider(token_uri: &str) -> AccessTokenProvider {
    let key = ServiceAccountKey {
        project_id: Some("lamp-demo".into()),
        private_key_id: Some("key-1".into()),
        private_key: PRIVATE_KEY.to_string(),
        client_email: CLIENT_EMAIL.to_string(),
        token_uri: token_uri.to_string(),
    };
    let signer = ServiceAccountSigner::new(key).expect("test key should parse");
    AccessTokenProvider::new(
        CredentialSource::ServiceAccount(signer),
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn transient_failure_is_retried_then_cached() {
    let (uri, ep) = spawn_token_endpoint(1, StatusCode::SERVICE_UNAVAILABLE, 3600).await;
    let provider = provider(&uri);

    assert_eq!(provider.access_token().await.unwrap(), "tok2");
    assert_eq!(ep.hits.load(Ordering::SeqCst), 2);

    assert_eq!(provider.access_token().await.unwrap(), "tok2");
    assert_eq!(ep.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn token_inside_refresh_margin_is_minted_again() {
    let (uri, ep) = spawn_token_endpoint(0, StatusCode::OK, 120).await;
    let provider = provider(&uri);

    assert_eq!(provider.access_token().await.unwrap(), "tok1");
    assert_eq!(provider.access_token().await.unwrap(), "tok2");
    assert_eq!(ep.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let (uri, ep) = spawn_token_endpoint(usize::MAX, StatusCode::BAD_REQUEST, 3600).await;
    let provider = provider(&uri);

    let err = provider.access_token().await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::TokenEndpoint { status, .. } if status == StatusCode::BAD_REQUEST
    ));
    assert_eq!(ep.hits.load(Ordering::SeqCst), 1);
}

#[derive(Debug, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[tokio::test]
async fn assertion_is_a_signed_jwt_bearer_grant() {
    let (uri, ep) = spawn_token_endpoint(0, StatusCode::OK, 3600).await;
    provider(&uri).access_token().await.unwrap();

    let form = ep.forms.lock().unwrap()[0].clone();
    assert_eq!(
        form.get("grant_type").map(String::as_str),
        Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    );
    let assertion = form.get("assertion").expect("assertion field");

    let header = jsonwebtoken::decode_header(assertion).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some("key-1"));

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[uri.as_str()]);
    validation.set_issuer(&[CLIENT_EMAIL]);
    let claims = jsonwebtoken::decode::<Claims>(
        assertion,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;

    assert_eq!(claims.iss, CLIENT_EMAIL);
    assert_eq!(claims.aud, uri);
    assert_eq!(
        claims.scope,
        "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email"
    );
    assert_eq!(claims.exp - claims.iat, 3600);
}
