use crate::config::{FIREBASE_SCOPES, GOOGLE_TOKEN_URI, METADATA_TOKEN_URI};
use crate::error::GatewayError;
use crate::google_oauth::credentials::{AuthorizedUser, ServiceAccountKey};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oauth2::{
    ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken, Scope, TokenResponse,
    TokenUrl, basic::BasicClient,
};
use serde::{Deserialize, Serialize};
use tracing::info;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Bearer token plus the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: String, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        Self {
            secret,
            expires_at: now + ChronoDuration::seconds(expires_in_secs),
        }
    }

    /// Usable if it outlives `now` by at least `margin`.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: ChronoDuration) -> bool {
        self.expires_at - margin > now
    }
}

/// Service-account key with its private key already parsed.
#[derive(Clone)]
pub struct ServiceAccountSigner {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
}

impl ServiceAccountSigner {
    pub fn new(key: ServiceAccountKey) -> Result<Self, GatewayError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self { key, encoding_key })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, GatewayError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: FIREBASE_SCOPES.join(" "),
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Stateless Google token endpoints.
pub(super) struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Exchange a signed service-account assertion for an access token.
    pub(super) async fn exchange_jwt_assertion(
        signer: &ServiceAccountSigner,
        http_client: reqwest::Client,
    ) -> Result<AccessToken, GatewayError> {
        let now = Utc::now();
        let assertion = signer.assertion(now)?;
        let resp = http_client
            .post(signer.key.token_uri.as_str())
            .header("Accept", "application/json")
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let token = read_token_response(resp, now).await?;
        info!(
            client_email = %signer.client_email(),
            "service account access token minted"
        );
        Ok(token)
    }

    /// Refresh an access token for an authorized-user credential.
    pub(super) async fn refresh_access_token(
        user: &AuthorizedUser,
        http_client: reqwest::Client,
    ) -> Result<AccessToken, GatewayError> {
        let now = Utc::now();
        let client = build_oauth2_client(user)?;
        let token_result = client
            .exchange_refresh_token(&RefreshToken::new(user.refresh_token.clone()))
            .add_scopes(FIREBASE_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .request_async(&http_client)
            .await?;
        let expires_in = token_result
            .expires_in()
            .map(|d| d.as_secs() as i64)
            .unwrap_or(ASSERTION_LIFETIME_SECS);
        info!(client_id = %user.client_id, "authorized user access token refreshed");
        Ok(AccessToken::new(
            token_result.access_token().secret().clone(),
            expires_in,
            now,
        ))
    }

    /// Ask the GCE metadata server for the default service account's token.
    pub(super) async fn fetch_metadata_token(
        http_client: reqwest::Client,
    ) -> Result<AccessToken, GatewayError> {
        let now = Utc::now();
        let resp = http_client
            .get(METADATA_TOKEN_URI.as_str())
            .query(&[("scopes", FIREBASE_SCOPES.join(","))])
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        let token = read_token_response(resp, now).await?;
        info!("metadata server access token fetched");
        Ok(token)
    }
}

async fn read_token_response(
    resp: reqwest::Response,
    now: DateTime<Utc>,
) -> Result<AccessToken, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::TokenEndpoint { status, body });
    }
    let payload: TokenEndpointResponse = resp.json().await?;
    Ok(AccessToken::new(payload.access_token, payload.expires_in, now))
}

type TokenOnlyClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Build the OAuth2 client for the refresh-token grant.
fn build_oauth2_client(user: &AuthorizedUser) -> Result<TokenOnlyClient, GatewayError> {
    let client = BasicClient::new(ClientId::new(user.client_id.clone()))
        .set_client_secret(ClientSecret::new(user.client_secret.clone()))
        .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_URI.as_str().to_string())?);
    Ok(client)
}
