//! Many-service builds on a bounded tokio worker pool.
//!
//! # Design Decisions
//! - One task per service; a semaphore caps how many run at once
//! - Registry and discovery cache are shared read-only across tasks
//! - Results come back in input order regardless of completion order
//! - A failed build never affects its siblings

use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::{BatchConfig, DashboardConfig};
use crate::context::ServiceInput;
use crate::dashboard::pipeline::{build_dashboard, BuildOutput};
use crate::discovery::{DiscoveryCache, DiscoveryClient, DiscoveryOutcome};
use crate::error::{BuildError, BuildResult};
use crate::templates::TemplateRegistry;

#[derive(Clone)]
pub struct BatchRunner {
    registry: &'static TemplateRegistry,
    config: Arc<DashboardConfig>,
    client: Option<Arc<DiscoveryClient>>,
    cache: DiscoveryCache,
    limit: Arc<Semaphore>,
}

impl BatchRunner {
    /// `client` of `None` disables discovery for every build.
    pub fn new(config: DashboardConfig, batch: &BatchConfig, client: Option<DiscoveryClient>) -> Self {
        Self {
            registry: TemplateRegistry::global(),
            config: Arc::new(config),
            client: client.map(Arc::new),
            cache: DiscoveryCache::new(),
            limit: Arc::new(Semaphore::new(batch.max_concurrency.max(1))),
        }
    }

    pub fn cache(&self) -> &DiscoveryCache {
        &self.cache
    }

    /// Discovery outcome for `service`, shared through the cache.
    pub async fn discover(&self, service: &str) -> DiscoveryOutcome {
        match &self.client {
            Some(client) => self.cache.get_or_discover(client, service).await,
            None => DiscoveryOutcome::skipped(),
        }
    }

    /// Build a single dashboard, discovery included. An invalid service
    /// fails before any backend request.
    pub async fn build(&self, input: &ServiceInput) -> BuildResult<BuildOutput> {
        input.service.validate()?;
        let discovery = self.discover(&input.service.name).await;
        build_dashboard(input, &discovery, self.registry, &self.config)
    }

    /// Build every input concurrently; one result per input, same order.
    pub async fn run(&self, inputs: Vec<ServiceInput>) -> Vec<BuildResult<BuildOutput>> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            services = inputs.len(),
            available_permits = self.limit.available_permits(),
            "Batch started"
        );

        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let runner = self.clone();
                tokio::spawn(async move {
                    match runner.limit.clone().acquire_owned().await {
                        Ok(_permit) => runner.build(&input).await,
                        Err(e) => Err(BuildError::Task(e.to_string())),
                    }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(BuildError::Task(e.to_string())),
            };
            if let Err(e) = &result {
                tracing::warn!(run_id = %run_id, error = %e, "Build failed");
            }
            results.push(result);
        }

        let built = results.iter().filter(|r| r.is_ok()).count();
        tracing::info!(
            run_id = %run_id,
            built,
            failed = results.len() - built,
            cached_selectors = self.cache.len(),
            "Batch finished"
        );
        results
    }
}
