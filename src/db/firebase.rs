use crate::db::RealtimeStore;
use crate::error::GatewayError;
use crate::google_oauth::service::AccessTokenProvider;
use crate::types::DeviceValue;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// How requests to the database are authorized.
#[derive(Clone)]
pub enum DatabaseAuth {
    /// No credentials; only works against public rules.
    Anonymous,
    /// Local emulator, which accepts the fixed `owner` token.
    Emulator,
    Token(Arc<AccessTokenProvider>),
}

impl DatabaseAuth {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Emulator => "emulator",
            Self::Token(provider) => provider.source().kind(),
        }
    }
}

/// Error body the REST API sends alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct RestError {
    error: String,
}

/// Handle to one Realtime Database instance, spoken to over its REST surface.
pub struct RealtimeDatabase {
    base: Url,
    namespace: Option<String>,
    auth: DatabaseAuth,
    http_client: reqwest::Client,
}

impl RealtimeDatabase {
    /// Build a handle for `database_url`.
    ///
    /// With an emulator host the requests go to `http://<host>` and carry the
    /// database namespace as the `ns` query parameter.
    pub fn connect(
        database_url: &str,
        emulator_host: Option<&str>,
        auth: DatabaseAuth,
        http_client: reqwest::Client,
    ) -> Result<Self, GatewayError> {
        let parsed = Url::parse(database_url)
            .map_err(|e| GatewayError::InvalidDatabaseUrl(format!("{database_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidDatabaseUrl(format!(
                "{database_url}: scheme must be http or https"
            )));
        }
        let host = parsed.host_str().ok_or_else(|| {
            GatewayError::InvalidDatabaseUrl(format!("{database_url}: missing host"))
        })?;

        let explicit_ns = parsed
            .query_pairs()
            .find(|(k, _)| k == "ns")
            .map(|(_, v)| v.into_owned());

        let (mut base, namespace, auth) = match emulator_host {
            Some(emulator) => {
                let namespace = explicit_ns.or_else(|| host.split('.').next().map(str::to_string));
                let base = Url::parse(&format!("http://{emulator}")).map_err(|e| {
                    GatewayError::InvalidDatabaseUrl(format!("emulator host {emulator}: {e}"))
                })?;
                (base, namespace, DatabaseAuth::Emulator)
            }
            None => (parsed.clone(), explicit_ns, auth),
        };
        base.set_query(None);
        base.set_fragment(None);

        debug!(base = %base, namespace = ?namespace, auth = auth.describe(), "realtime database handle built");
        Ok(Self {
            base,
            namespace,
            auth,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// REST URL for `path`: each segment percent-encoded, `.json` appended.
    pub fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        match segments.last_mut() {
            Some(last) => last.push_str(".json"),
            None => segments.push(".json".to_string()),
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidDatabaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if let Some(ns) = &self.namespace {
            url.query_pairs_mut().append_pair("ns", ns);
        }
        Ok(url)
    }

    async fn authorize(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        Ok(match &self.auth {
            DatabaseAuth::Anonymous => req,
            DatabaseAuth::Emulator => req.bearer_auth("owner"),
            DatabaseAuth::Token(provider) => req.bearer_auth(provider.access_token().await?),
        })
    }
}

#[async_trait]
impl RealtimeStore for RealtimeDatabase {
    async fn get(&self, path: &str) -> Result<DeviceValue, GatewayError> {
        let url = self.endpoint(path)?;
        let resp = self
            .authorize(self.http_client.get(url))
            .await?
            .send()
            .await
            .map_err(transport)?;
        let resp = check_status(resp).await?;
        resp.json::<DeviceValue>().await.map_err(transport)
    }

    async fn set(&self, path: &str, value: &DeviceValue) -> Result<(), GatewayError> {
        let url = self.endpoint(path)?;
        let resp = self
            .authorize(self.http_client.put(url).json(value))
            .await?
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?;
        Ok(())
    }
}

/// Database transport failures reach the caller with reqwest's own message.
fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Backend(e.to_string())
}

/// Turn a non-2xx response into a backend error carrying the database's message.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<RestError>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| status.to_string());
    Err(GatewayError::Backend(message))
}
