/// Application context and dependency injection
use crate::{
    batch::{BatchProcessor, LaneConfig},
    config::ServerConfig,
    error::ProofResult,
    identity::{FallbackResolver, IdentityResolver, NameCache, NameResolver, RetryPolicy},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub identity_resolver: Arc<IdentityResolver>,
    pub batch_processor: Arc<BatchProcessor>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> ProofResult<Self> {
        // Validate configuration
        config.validate()?;

        // Missing endpoints only break name resolution, so keep serving
        // address requests and report RPC_URL_MISSING per name lookup
        let upstream: Option<Arc<dyn NameResolver>> = match FallbackResolver::from_urls(
            config.rpc.primary_url.as_deref(),
            config.rpc.secondary_url.as_deref(),
            config.stall_timeout(),
        ) {
            Ok(resolver) => {
                tracing::info!(
                    "ENS resolution enabled with {} RPC endpoint(s)",
                    resolver.endpoint_count()
                );
                Some(Arc::new(resolver))
            }
            Err(e) => {
                tracing::warn!("ENS resolution disabled: {}", e);
                None
            }
        };

        Ok(Self::with_upstream(config, upstream))
    }

    /// Create a context around an explicit upstream resolver
    pub fn with_upstream(config: ServerConfig, upstream: Option<Arc<dyn NameResolver>>) -> Self {
        let cache = NameCache::new(config.cache_ttl());
        tracing::debug!("Name cache TTL: {:?}", cache.ttl());
        let identity_resolver = Arc::new(IdentityResolver::new(
            cache,
            upstream,
            RetryPolicy::default(),
        ));

        let lanes = LaneConfig {
            name_lane: config.batch.name_lane_limit,
            address_lane: config.batch.address_lane_limit,
        };
        let batch_processor = Arc::new(BatchProcessor::new(identity_resolver.clone(), lanes));

        Self {
            config: Arc::new(config),
            identity_resolver,
            batch_processor,
        }
    }

    /// Chain id for a request, falling back to the configured default
    pub fn chain_id_or_default(&self, requested: Option<&str>) -> String {
        requested
            .filter(|id| !id.is_empty())
            .unwrap_or(self.config.service.default_chain_id.as_str())
            .to_string()
    }
}
