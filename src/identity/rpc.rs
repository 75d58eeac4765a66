/// Upstream RPC client - ENS name resolution over Ethereum JSON-RPC
///
/// Each endpoint resolves names with two `eth_call`s: the ENS registry's
/// `resolver(bytes32)` for the name's namehash, then `addr(bytes32)` on the
/// returned resolver. `FallbackResolver` queries endpoints in priority order
/// and accepts the first definitive answer.
use crate::{
    error::{ProofError, ProofResult},
    identity::{
        resolver::{NameResolver, UpstreamError, RPC_URL_MISSING_MESSAGE},
        retry::RateLimitSignal,
        Address,
    },
};
use async_trait::async_trait;
use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::time::Duration;
use tracing::{debug, warn};

/// ENS registry, same address on mainnet and the public testnets
pub const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// `resolver(bytes32)`
const RESOLVER_SELECTOR: &str = "0178b8bf";
/// `addr(bytes32)`
const ADDR_SELECTOR: &str = "3b3b57de";

/// Default per-endpoint stall timeout
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Keccak-256 of arbitrary bytes
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// ENS namehash
///
/// `namehash("") = 0x00..00`, `namehash(label.rest) = keccak(namehash(rest) ++ keccak(label))`.
/// Names are lowercased; full UTS-46 normalization is not applied.
pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return node;
    }

    for label in normalized.rsplit('.') {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&keccak256(label.as_bytes()));
        node = keccak256(&buf);
    }
    node
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Single JSON-RPC endpoint
#[derive(Clone)]
pub struct EnsRpcClient {
    url: String,
    http_client: reqwest::Client,
}

impl EnsRpcClient {
    pub fn new(url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http_client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolve a name against this endpoint only
    pub async fn resolve(&self, name: &str) -> Result<Option<Address>, UpstreamError> {
        let node = hex::encode(namehash(name));

        let resolver_word = self
            .eth_call(ENS_REGISTRY, &format!("0x{}{}", RESOLVER_SELECTOR, node))
            .await?;
        let resolver = match decode_address_word(&resolver_word)? {
            Some(resolver) => resolver,
            None => return Ok(None),
        };

        let addr_word = self
            .eth_call(
                &resolver.to_canonical(),
                &format!("0x{}{}", ADDR_SELECTOR, node),
            )
            .await?;
        decode_address_word(&addr_word)
    }

    /// `eth_call` at `latest`, returning the raw hex result
    async fn eth_call(&self, to: &str, data: &str) -> Result<String, UpstreamError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "method": "eth_call",
                "params": [{ "to": to, "data": data }, "latest"],
                "id": 1
            }))
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("RPC request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::server(
                status.as_u16(),
                format!("RPC endpoint returned HTTP {}: {}", status, body.trim()),
            ));
        }

        let payload: RpcResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::invalid_response(format!("Invalid RPC response: {}", e)))?;

        if let Some(err) = payload.error {
            return Err(UpstreamError::rpc(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }

        match payload.result {
            Some(Value::String(hex)) => Ok(hex),
            other => Err(UpstreamError::invalid_response(format!(
                "Unexpected eth_call result: {:?}",
                other
            ))),
        }
    }
}

/// Decode an ABI-encoded address word; empty or zero means "no address"
fn decode_address_word(word: &str) -> Result<Option<Address>, UpstreamError> {
    let digits = word.strip_prefix("0x").unwrap_or(word);
    if digits.is_empty() {
        return Ok(None);
    }

    let bytes = hex::decode(digits)
        .map_err(|e| UpstreamError::invalid_response(format!("Invalid hex in eth_call result: {}", e)))?;
    if bytes.len() < 32 {
        return Err(UpstreamError::invalid_response(format!(
            "eth_call result too short: {} bytes",
            bytes.len()
        )));
    }

    let mut raw = [0u8; 20];
    raw.copy_from_slice(&bytes[12..32]);
    let address = Address::from_bytes(raw);

    Ok((!address.is_zero()).then_some(address))
}

/// Priority-ordered endpoints with stall fallback
///
/// The first endpoint starts immediately. The next one starts when every
/// running endpoint has failed, or when the stall timeout elapses with no
/// answer. The first `Ok`, including "not found", wins.
pub struct FallbackResolver {
    endpoints: Vec<EnsRpcClient>,
    stall_timeout: Duration,
}

impl FallbackResolver {
    pub fn new(endpoints: Vec<EnsRpcClient>, stall_timeout: Duration) -> ProofResult<Self> {
        if endpoints.is_empty() {
            return Err(ProofError::RpcUrlMissing(RPC_URL_MISSING_MESSAGE.to_string()));
        }

        Ok(Self {
            endpoints,
            stall_timeout,
        })
    }

    /// Build from the primary and secondary endpoint URLs; both are required
    pub fn from_urls(
        primary: Option<&str>,
        secondary: Option<&str>,
        stall_timeout: Duration,
    ) -> ProofResult<Self> {
        let (primary, secondary) = match (primary, secondary) {
            (Some(p), Some(s)) if !p.trim().is_empty() && !s.trim().is_empty() => (p, s),
            _ => {
                return Err(ProofError::RpcUrlMissing(
                    RPC_URL_MISSING_MESSAGE.to_string(),
                ))
            }
        };

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("ens-proof/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProofError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Self::new(
            vec![
                EnsRpcClient::new(primary.trim(), http_client.clone()),
                EnsRpcClient::new(secondary.trim(), http_client),
            ],
            stall_timeout,
        )
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

#[async_trait]
impl NameResolver for FallbackResolver {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, UpstreamError> {
        let mut pending = self.endpoints.iter().enumerate();
        let mut in_flight: FuturesUnordered<BoxFuture<'_, (usize, Result<Option<Address>, UpstreamError>)>> =
            FuturesUnordered::new();
        let mut errors: Vec<UpstreamError> = Vec::new();

        let start = |(idx, endpoint): (usize, &EnsRpcClient)| {
            let name = name.to_string();
            let endpoint = endpoint.clone();
            async move { (idx, endpoint.resolve(&name).await) }.boxed()
        };

        if let Some(first) = pending.next() {
            in_flight.push(start(first));
        }

        loop {
            let stall = tokio::time::sleep(self.stall_timeout);
            tokio::pin!(stall);

            tokio::select! {
                finished = in_flight.next() => {
                    let Some((idx, outcome)) = finished else {
                        break;
                    };

                    match outcome {
                        Ok(answer) => {
                            debug!(endpoint = self.endpoints[idx].url(), %name, found = answer.is_some(), "RPC endpoint answered");
                            return Ok(answer);
                        }
                        Err(err) => {
                            warn!(endpoint = self.endpoints[idx].url(), %name, "RPC endpoint failed: {}", err);
                            errors.push(err);
                            if in_flight.is_empty() {
                                match pending.next() {
                                    Some(next) => in_flight.push(start(next)),
                                    None => break,
                                }
                            }
                        }
                    }
                }
                _ = &mut stall, if pending.len() > 0 => {
                    if let Some(next) = pending.next() {
                        debug!(endpoint = next.1.url(), %name, "RPC endpoint stalled, starting fallback");
                        in_flight.push(start(next));
                    }
                }
            }
        }

        // Prefer a rate-limit failure so the retry policy can act on it
        let preferred = errors
            .iter()
            .position(|e| e.is_rate_limited())
            .unwrap_or_else(|| errors.len().saturating_sub(1));

        Err(errors
            .into_iter()
            .nth(preferred)
            .unwrap_or_else(|| UpstreamError::transport("No RPC endpoint available")))
    }
}
