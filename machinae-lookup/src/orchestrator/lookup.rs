//! Core lookup orchestrator: per-target bounded fan-out, collect, reorder.
//!
//! For each target the orchestrator filters the registry, tags every
//! applicable source with its registry position, runs one task per source in
//! a pool scoped to that target, collects completions in whatever order they
//! arrive, and sorts them back into registry order before emitting.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::LookupConfig;
use crate::error::LookupError;
use crate::registry::Registry;
use crate::runner::{run_task, TaskContext, TaskOutcome};
use crate::source::{Credentials, ProxyConfig, SourceFactory};
use crate::types::{ErrorKind, ErrorResult, ResultSet, SiteOutcome, SourceDescriptor, TargetInfo};

/// Runs every applicable source for a target and reassembles the outcomes.
pub struct Orchestrator {
    registry: Registry,
    factory: Arc<dyn SourceFactory>,
    credentials: Arc<Credentials>,
    proxies: Arc<ProxyConfig>,
    config: LookupConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sources", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with no credentials and no proxies.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] if `config` is invalid.
    pub fn new(
        registry: Registry,
        factory: Arc<dyn SourceFactory>,
        config: LookupConfig,
    ) -> Result<Self, LookupError> {
        config.validate()?;
        Ok(Self {
            registry,
            factory,
            credentials: Arc::new(Credentials::default()),
            proxies: Arc::new(ProxyConfig::default()),
            config,
        })
    }

    /// Share `credentials` with every source.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Route source traffic through `proxies`.
    pub fn with_proxies(mut self, proxies: ProxyConfig) -> Self {
        self.proxies = Arc::new(proxies);
        self
    }

    /// The registry this orchestrator dispatches over.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The lookup knobs in effect.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Look up one target across every applicable source.
    ///
    /// # Pipeline
    ///
    /// 1. Filter the registry to sources supporting the target's otype,
    ///    keeping registry order; bail out with an empty set if none apply
    /// 2. Tag each source with its position in the filtered list
    /// 3. Size the pool as `min(max_workers, applicable)`
    /// 4. Spawn one task per source; a semaphore admits `pool size` at a time
    /// 5. Collect completions in arrival order, dropping skips
    /// 6. Sort by the position tag and build the [`ResultSet`]
    ///
    /// The pool lives only for this call. Dropping the returned future aborts
    /// every in-flight task of the wave.
    pub async fn lookup(&self, target_info: TargetInfo) -> ResultSet {
        // 1. Filter, preserving registry order.
        let applicable: Arc<[SourceDescriptor]> = self
            .registry
            .applicable(&target_info.otype)
            .cloned()
            .collect();

        if applicable.is_empty() {
            tracing::debug!(
                observable = %target_info.target,
                otype = %target_info.otype,
                "no applicable sources"
            );
            return ResultSet::new(target_info, Vec::new());
        }

        // 3. Never more workers than work.
        let pool_size = self.config.pool_size(applicable.len());
        tracing::debug!(
            observable = %target_info.target,
            otype = %target_info.otype,
            sources = applicable.len(),
            pool_size,
            "dispatching wave"
        );

        let ctx = Arc::new(TaskContext {
            target_info: target_info.clone(),
            credentials: Arc::clone(&self.credentials),
            proxies: Arc::clone(&self.proxies),
            factory: Arc::clone(&self.factory),
            verbose: self.config.verbose,
            timeout: self.config.timeout(),
            delay: self.config.delay(),
        });

        // 2 + 4. Each task carries its position so order can be restored.
        let admission = Arc::new(Semaphore::new(pool_size));
        let mut pool = JoinSet::new();
        for position in 0..applicable.len() {
            let applicable = Arc::clone(&applicable);
            let ctx = Arc::clone(&ctx);
            let admission = Arc::clone(&admission);
            pool.spawn(async move {
                let _permit = admission.acquire_owned().await.ok();
                let outcome = run_task(&applicable[position], &ctx).await;
                (position, outcome)
            });
        }

        // 5. Arrival order.
        let mut reported = vec![false; applicable.len()];
        let mut collected: Vec<(usize, SiteOutcome)> = Vec::with_capacity(applicable.len());
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok((position, outcome)) => {
                    reported[position] = true;
                    if let Some(outcome) = outcome_of(outcome) {
                        collected.push((position, outcome));
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "lookup task did not complete");
                }
            }
        }

        // A task the runtime lost still owes its source an entry.
        for (position, done) in reported.iter().enumerate() {
            if !done {
                collected.push((
                    position,
                    SiteOutcome::Error(ErrorResult {
                        target_info: target_info.clone(),
                        descriptor: applicable[position].clone(),
                        error: ErrorKind::SourceFault("lookup task aborted".into()),
                    }),
                ));
            }
        }

        // 6. Restore registry order.
        collected.sort_by_key(|(position, _)| *position);
        let entries = collected.into_iter().map(|(_, outcome)| outcome).collect();

        ResultSet::new(target_info, entries)
    }

    /// Look up each target in turn, yielding one [`ResultSet`] per target in
    /// input order.
    ///
    /// Targets are processed strictly one at a time and nothing is yielded
    /// for a target until all of its sources have finished or failed.
    pub fn results<'a, I>(&'a self, targets: I) -> impl Stream<Item = ResultSet> + Send + 'a
    where
        I: IntoIterator<Item = TargetInfo>,
        I::IntoIter: Send + 'a,
    {
        let targets = targets.into_iter();
        async_stream::stream! {
            for target_info in targets {
                yield self.lookup(target_info).await;
            }
        }
    }
}

fn outcome_of(outcome: TaskOutcome) -> Option<SiteOutcome> {
    if outcome == TaskOutcome::Skipped {
        tracing::debug!("discarding skipped task");
    }
    outcome.into_outcome()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FindingStream, Source};
    use crate::types::RawFinding;
    use futures::StreamExt;
    use serde_json::Map;
    use std::time::Duration;

    struct InstantSource(&'static str);

    impl Source for InstantSource {
        fn run(&mut self) -> FindingStream<'_> {
            futures::stream::iter(vec![Ok(RawFinding::from(self.0))]).boxed()
        }
    }

    fn instant_factory() -> Arc<dyn SourceFactory> {
        Arc::new(
            |desc: &SourceDescriptor,
             _: &Credentials,
             _: &ProxyConfig|
             -> Result<Box<dyn crate::source::Source>, LookupError> {
                let value: &'static str = if desc.name == "a" { "from-a" } else { "other" };
                Ok(Box::new(InstantSource(value)))
            },
        )
    }

    fn registry() -> Registry {
        Registry::new(vec![
            SourceDescriptor::new("a", ["ipv4"], Map::new()),
            SourceDescriptor::new("b", ["ipv4", "fqdn"], Map::new()),
            SourceDescriptor::new("c", ["fqdn"], Map::new()),
        ])
        .expect("valid registry")
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = LookupConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(Orchestrator::new(registry(), instant_factory(), config).is_err());
    }

    #[tokio::test]
    async fn lookup_filters_by_otype() {
        let orchestrator =
            Orchestrator::new(registry(), instant_factory(), LookupConfig::default())
                .expect("valid");
        let set = orchestrator
            .lookup(TargetInfo::new("example.com", "fqdn", true))
            .await;
        assert_eq!(set.names(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn lookup_without_applicable_sources_is_empty() {
        let orchestrator =
            Orchestrator::new(registry(), instant_factory(), LookupConfig::default())
                .expect("valid");
        let target = TargetInfo::new("aa:bb:cc:dd:ee:ff", "mac", true);
        let set = orchestrator.lookup(target.clone()).await;
        assert_eq!(set.target_info, target);
        assert!(set.entries.is_empty());
    }

    #[tokio::test]
    async fn results_stream_follows_input_order() {
        let orchestrator =
            Orchestrator::new(registry(), instant_factory(), LookupConfig::default())
                .expect("valid");
        let targets = vec![
            TargetInfo::new("example.com", "fqdn", true),
            TargetInfo::new("1.2.3.4", "ipv4", true),
        ];
        let sets: Vec<ResultSet> = orchestrator.results(targets).collect().await;
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].target_info.target, "example.com");
        assert_eq!(sets[1].target_info.target, "1.2.3.4");
        assert_eq!(sets[1].names(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_lookup_discards_wave() {
        struct Hang;
        impl Source for Hang {
            fn run(&mut self) -> FindingStream<'_> {
                futures::stream::pending().boxed()
            }
        }
        let factory: Arc<dyn SourceFactory> = Arc::new(
            |_: &SourceDescriptor,
             _: &Credentials,
             _: &ProxyConfig|
             -> Result<Box<dyn Source>, LookupError> { Ok(Box::new(Hang)) },
        );
        let orchestrator =
            Orchestrator::new(registry(), factory, LookupConfig::default()).expect("valid");
        let interrupted = tokio::time::timeout(
            Duration::from_secs(1),
            orchestrator.lookup(TargetInfo::new("1.2.3.4", "ipv4", true)),
        )
        .await;
        assert!(interrupted.is_err(), "no partial result set is produced");
    }
}
