//! etcd v3 client over the JSON gateway.
//!
//! etcd exposes its gRPC KV service as JSON under `/v3/*`. Keys and values
//! are base64 on the wire and 64-bit integers are encoded as strings.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::traits::StoreClient;

/// Connection settings for [`EtcdClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdConfig {
    endpoints: Vec<String>,
    request_timeout: Duration,
}

impl EtcdConfig {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Creates a configuration for the given endpoints.
    ///
    /// Trailing slashes are stripped; empty entries are dropped.
    pub fn new(endpoints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let endpoints = endpoints
            .into_iter()
            .map(Into::into)
            .map(|e: String| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .collect();

        Self {
            endpoints,
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the endpoints in failover order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Returns the per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Store client for etcd v3.
///
/// Endpoints are tried in order; a transport failure on one endpoint moves
/// on to the next. An HTTP answer of any status ends the failover.
pub struct EtcdClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
}

impl EtcdClient {
    /// Builds a client without contacting the cluster.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if no endpoint is configured or the
    /// HTTP client cannot be built.
    pub fn new(config: EtcdConfig) -> Result<Self, StoreError> {
        if config.endpoints.is_empty() {
            return Err(StoreError::InvalidConfig(
                "at least one etcd endpoint is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints: config.endpoints,
        })
    }

    /// Builds a client and checks that the cluster answers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if no endpoint is healthy.
    pub async fn connect(config: EtcdConfig) -> Result<Self, StoreError> {
        let client = Self::new(config)?;
        client.ping().await?;
        Ok(client)
    }

    /// Returns the configured endpoints.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, StoreError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            let url = format!("{}{}", endpoint, path);
            match self.http.post(&url).json(body).send().await {
                Ok(response) => return Self::decode(response).await,
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "etcd endpoint unreachable");
                    last_error = Some(e.to_string());
                },
            }
        }

        Err(StoreError::unavailable(
            last_error.unwrap_or_else(|| "no endpoints".to_string()),
        ))
    }

    async fn decode<Resp: DeserializeOwned>(response: reqwest::Response) -> Result<Resp, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl StoreClient for EtcdClient {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let response: RangeResponse = self
            .post(
                "/v3/kv/range",
                &RangeRequest {
                    key: BASE64.encode(key),
                    keys_only: true,
                },
            )
            .await?;

        Ok(response.count > 0 || !response.kvs.is_empty())
    }

    async fn create(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let encoded_key = BASE64.encode(key);
        let request = TxnRequest {
            compare: vec![Compare {
                key: encoded_key.clone(),
                result: "EQUAL",
                target: "CREATE",
                create_revision: "0",
            }],
            success: vec![RequestOp {
                request_put: PutRequest {
                    key: encoded_key,
                    value: BASE64.encode(value),
                },
            }],
        };

        let response: TxnResponse = self.post("/v3/kv/txn", &request).await?;
        if response.succeeded {
            Ok(())
        } else {
            Err(StoreError::KeyExists(key.to_string()))
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let _: serde_json::Value = self
            .post(
                "/v3/kv/put",
                &PutRequest {
                    key: BASE64.encode(key),
                    value: BASE64.encode(value),
                },
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let response: DeleteRangeResponse = self
            .post(
                "/v3/kv/deleterange",
                &DeleteRangeRequest {
                    key: BASE64.encode(key),
                },
            )
            .await?;

        if response.deleted > 0 {
            Ok(())
        } else {
            Err(StoreError::KeyNotFound(key.to_string()))
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            let url = format!("{}/health", endpoint);
            let result = match self.http.get(&url).send().await {
                Ok(response) => Self::decode::<HealthResponse>(response).await,
                Err(e) => Err(StoreError::unavailable(e.to_string())),
            };

            match result {
                Ok(health) if health.is_healthy() => return Ok(()),
                Ok(health) => {
                    last_error = Some(format!("{} reports unhealthy: {}", endpoint, health.reason))
                },
                Err(e) => last_error = Some(format!("{}: {}", endpoint, e)),
            }
        }

        Err(StoreError::unavailable(
            last_error.unwrap_or_else(|| "no endpoints".to_string()),
        ))
    }

    fn name(&self) -> &str {
        "etcd"
    }
}

impl std::fmt::Debug for EtcdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdClient")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    keys_only: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "int64")]
    count: i64,
}

#[derive(Debug, Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct Compare {
    key: String,
    result: &'static str,
    target: &'static str,
    create_revision: &'static str,
}

#[derive(Debug, Serialize)]
struct RequestOp {
    request_put: PutRequest,
}

#[derive(Debug, Serialize)]
struct TxnRequest {
    compare: Vec<Compare>,
    success: Vec<RequestOp>,
}

#[derive(Debug, Deserialize)]
struct TxnResponse {
    #[serde(default)]
    succeeded: bool,
}

#[derive(Debug, Serialize)]
struct DeleteRangeRequest {
    key: String,
}

#[derive(Debug, Deserialize)]
struct DeleteRangeResponse {
    #[serde(default, deserialize_with = "int64")]
    deleted: i64,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    health: String,
    #[serde(default)]
    reason: String,
}

impl HealthResponse {
    fn is_healthy(&self) -> bool {
        self.health == "true"
    }
}

/// Accepts int64 fields encoded either as JSON strings or numbers.
fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Str(String),
        Num(i64),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Num(n) => Ok(n),
        Int64::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
