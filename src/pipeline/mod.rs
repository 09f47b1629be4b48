//! Fetch orchestration: fan out (source, keyword) units, fan records back in.
//!
//! Every unit runs as its own tokio task, bounded per upstream by a
//! semaphore and by a per-unit deadline. Results are collected in declared
//! order (source-major, then keyword), so the combined sequence is the same
//! no matter which request finishes first. A failing, hanging or panicking
//! unit contributes zero records and never stops the run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::HttpConfig;
use crate::models::{Record, SourceKind};
use crate::sources::{Source, SourceError, SourceRegistry};

/// Limits applied to every unit of work
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Deadline for one adapter call
    pub request_timeout: Duration,
    /// Maximum in-flight units per upstream source
    pub max_concurrent_per_source: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for OrchestratorConfig {
    fn from(http: &HttpConfig) -> Self {
        Self {
            request_timeout: http.timeout(),
            max_concurrent_per_source: http.max_concurrent_per_source.max(1),
        }
    }
}

/// Why a unit of work produced no records
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    /// The adapter reported a transport or parse error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The adapter did not finish before the deadline
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The task running the adapter panicked or was cancelled
    #[error("aborted: {0}")]
    Aborted(String),
}

/// Result of one (source, keyword) unit of work
#[derive(Debug)]
pub struct UnitOutcome {
    pub source: SourceKind,
    pub keyword: String,
    pub result: Result<Vec<Record>, FetchFailure>,
}

/// A failed unit, kept for the run summary
#[derive(Debug)]
pub struct UnitFailure {
    pub source: SourceKind,
    pub keyword: String,
    pub failure: FetchFailure,
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct HarvestReport {
    /// All records, source-major then keyword-major, in adapter emission order
    pub records: Vec<Record>,
    /// Units that completed successfully (possibly with zero records)
    pub units_succeeded: usize,
    /// Units that failed, timed out or aborted
    pub failures: Vec<UnitFailure>,
    /// Requested source names with no matching adapter
    pub skipped_sources: Vec<String>,
}

impl HarvestReport {
    /// Fold one unit's outcome into the report
    fn absorb(&mut self, outcome: UnitOutcome) {
        match outcome.result {
            Ok(records) => {
                tracing::info!(
                    "Fetched {} records from {} for '{}'",
                    records.len(),
                    outcome.source,
                    outcome.keyword
                );
                self.units_succeeded += 1;
                self.records.extend(records);
            }
            Err(failure) => {
                tracing::error!(
                    "Failed to fetch from {} for '{}': {}",
                    outcome.source,
                    outcome.keyword,
                    failure
                );
                self.failures.push(UnitFailure {
                    source: outcome.source,
                    keyword: outcome.keyword,
                    failure,
                });
            }
        }
    }

    /// Total number of units dispatched
    pub fn units_total(&self) -> usize {
        self.units_succeeded + self.failures.len()
    }

    /// True when no unit produced a single record
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Drives every requested (source, keyword) pair through its adapter
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: SourceRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(registry: SourceRegistry, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    /// Run all pairs and collect their records.
    ///
    /// Unknown source names are logged and skipped. Adapter failures become
    /// [`UnitFailure`]s in the report.
    pub async fn run(&self, sources: &[String], keywords: &[String]) -> HarvestReport {
        let mut report = HarvestReport::default();
        let mut limiters: HashMap<SourceKind, Arc<Semaphore>> = HashMap::new();
        let mut pending = Vec::new();

        for name in sources {
            let Some(source) = self.registry.get(name) else {
                tracing::warn!("Source '{}' is not supported and will be skipped.", name);
                report.skipped_sources.push(name.clone());
                continue;
            };

            let limiter = limiters
                .entry(source.kind())
                .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_concurrent_per_source)))
                .clone();

            for keyword in keywords {
                let handle = tokio::spawn(run_unit(
                    Arc::clone(source),
                    keyword.clone(),
                    Arc::clone(&limiter),
                    self.config.request_timeout,
                ));
                pending.push((source.kind(), keyword.clone(), handle));
            }
        }

        let (units, handles): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .map(|(source, keyword, handle)| ((source, keyword), handle))
            .unzip();

        // join_all keeps input order; only this loop touches the accumulator
        let joined = join_all(handles).await;
        for ((source, keyword), joined) in units.into_iter().zip(joined) {
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(FetchFailure::Aborted(e.to_string())),
            };
            report.absorb(UnitOutcome {
                source,
                keyword,
                result,
            });
        }

        if report.is_empty() {
            tracing::warn!("No records retrieved from any source.");
        }

        report
    }
}

async fn run_unit(
    source: Arc<dyn Source>,
    keyword: String,
    limiter: Arc<Semaphore>,
    deadline: Duration,
) -> Result<Vec<Record>, FetchFailure> {
    let _permit = limiter
        .acquire_owned()
        .await
        .map_err(|e| FetchFailure::Aborted(e.to_string()))?;

    match timeout(deadline, source.search(&keyword)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(FetchFailure::TimedOut(deadline)),
    }
}
