use crate::{context::AppContext, identity::NameCache, metrics};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("Starting background job scheduler");

        let handles = vec![tokio::spawn(Self::name_cache_sweep_job(Arc::clone(&self)))];

        info!("Background jobs started");
        handles
    }

    /// Sweep expired name cache entries (every ENS_CACHE_SWEEP_SECS)
    async fn name_cache_sweep_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.sweep_interval();
        let cache = scheduler.context.identity_resolver.cache();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep_name_cache(cache).await;
        }
    }
}

/// Run one sweep and record it
pub async fn sweep_name_cache(cache: &NameCache) -> usize {
    let evicted = cache.sweep_expired().await;
    let remaining = cache.len().await;
    metrics::record_cache_sweep(evicted, remaining);

    if evicted > 0 {
        info!("Swept {} expired name cache entries ({} remaining)", evicted, remaining);
    } else {
        debug!("Name cache sweep: nothing expired");
    }

    evicted
}
