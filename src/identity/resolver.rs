/// Identity Resolver - Orchestrates name resolution with caching and retry
use crate::{
    error::{ProofError, ProofResult},
    identity::{
        retry::{is_rate_limit_message, RateLimitSignal},
        Address, Identifier, InputSource, NameCache, RetryPolicy,
    },
    metrics,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub const RPC_URL_MISSING_MESSAGE: &str =
    "RPC_URL_1 and RPC_URL_2 are required to resolve ENS names.";

/// Kind of failure reported by an upstream endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Non-success HTTP response; carries the status
    ServerError,
    /// JSON-RPC error object in an otherwise successful response
    Rpc,
    /// Connection, TLS or timeout failure
    Transport,
    /// Response that could not be decoded
    InvalidResponse,
}

/// Failure talking to an upstream RPC endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl UpstreamError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::ServerError,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn rpc(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Rpc,
            message: message.into(),
            status: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Transport,
            message: message.into(),
            status: None,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::InvalidResponse,
            message: message.into(),
            status: None,
        }
    }
}

impl RateLimitSignal for UpstreamError {
    fn is_rate_limited(&self) -> bool {
        is_rate_limit_message(&self.message)
            || (self.kind == UpstreamErrorKind::ServerError && self.status == Some(429))
    }
}

/// "Given a name, return an address or nothing, or fail"
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, UpstreamError>;
}

/// Address resolved from caller input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub address: Address,
    pub source: InputSource,
}

/// Main identity resolver - combines caching and retry with upstream resolution
#[derive(Clone)]
pub struct IdentityResolver {
    cache: NameCache,
    upstream: Option<Arc<dyn NameResolver>>,
    retry: RetryPolicy,
}

impl IdentityResolver {
    /// Create a new identity resolver
    ///
    /// `upstream` is `None` when no RPC endpoints are configured; addresses
    /// still resolve, names fail with `RPC_URL_MISSING`.
    pub fn new(
        cache: NameCache,
        upstream: Option<Arc<dyn NameResolver>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            upstream,
            retry,
        }
    }

    pub fn cache(&self) -> &NameCache {
        &self.cache
    }

    /// Classify raw input and resolve it to an address
    pub async fn resolve(&self, raw: &str) -> ProofResult<ResolvedInput> {
        let identifier = Identifier::classify(raw)?;
        let address = self.resolve_identifier(&identifier).await?;

        Ok(ResolvedInput {
            address,
            source: identifier.source(),
        })
    }

    /// Resolve an already classified identifier
    pub async fn resolve_identifier(&self, identifier: &Identifier) -> ProofResult<Address> {
        match identifier {
            Identifier::Address(address) => Ok(*address),
            Identifier::Name(name) => self.resolve_name(name).await,
        }
    }

    /// Resolve a name to an address with caching
    ///
    /// Resolution order:
    /// 1. Check cache first (fast path)
    /// 2. Query upstream, retrying rate-limited failures
    /// 3. Cache successful resolution
    pub async fn resolve_name(&self, name: &str) -> ProofResult<Address> {
        let upstream = self
            .upstream
            .as_ref()
            .ok_or_else(|| ProofError::RpcUrlMissing(RPC_URL_MISSING_MESSAGE.to_string()))?;

        self.cache
            .resolve_cached(name, |name| lookup(upstream, &self.retry, name))
            .await
    }
}

/// Single upstream lookup wrapped in the retry policy
async fn lookup(
    upstream: &Arc<dyn NameResolver>,
    retry: &RetryPolicy,
    name: String,
) -> ProofResult<Address> {
    let outcome = retry.execute(|| upstream.resolve_name(&name)).await;

    match outcome {
        Ok(Some(address)) => {
            metrics::record_name_resolution("resolved");
            tracing::debug!(%name, %address, "Resolved ENS name");
            Ok(address)
        }
        Ok(None) => {
            metrics::record_name_resolution("not_found");
            Err(ProofError::NotFound("ENS name not found.".to_string()))
        }
        Err(err) if err.is_rate_limited() => {
            metrics::record_name_resolution("rate_limited");
            Err(ProofError::RateLimited(format!(
                "ENS resolution rate limited: {}",
                err
            )))
        }
        Err(err) => {
            metrics::record_name_resolution("failed");
            tracing::warn!(%name, "ENS resolution failed: {}", err);
            Err(ProofError::ResolveFailed(format!(
                "ENS resolution failed: {}",
                err
            )))
        }
    }
}
