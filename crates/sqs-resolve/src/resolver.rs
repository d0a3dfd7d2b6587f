use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use sqs_access::CallerPermissions;
use sqs_query::{normalize, validate_and_partition, RawClause};
use sqs_store::DescendantLookup;
use sqs_types::{ClauseBranch, ResolvedQuery, StoreId, StreamId, StreamState};
use tracing::Instrument;

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::stages::{
    compile_all, compile_predicate, expand_clauses, reduce_clauses, resolve_permissions,
    StreamPredicate,
};

// ---------------------------------------------------------------------------
// ResolveRequest
// ---------------------------------------------------------------------------

/// The request-scoped inputs of one resolution.
#[derive(Clone, Debug, Default)]
pub struct ResolveRequest {
    /// The raw `streams` parameter; `None` when it was not sent.
    pub streams: Option<Value>,
    /// Requested visibility of trashed streams.
    pub state: StreamState,
    /// Translate legacy-prefixed ids before resolving.
    pub legacy: bool,
}

impl ResolveRequest {
    pub fn new(streams: Option<Value>) -> Self {
        Self {
            streams,
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: StreamState) -> Self {
        self.state = state;
        self
    }

    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }
}

// ---------------------------------------------------------------------------
// ResolveReport
// ---------------------------------------------------------------------------

/// Wall-clock time spent in one pipeline stage.
#[derive(Clone, Debug, Serialize)]
pub struct StageTiming {
    pub stage_name: String,
    pub elapsed: Duration,
}

/// The outcome of a successful resolution.
#[derive(Clone, Debug, Serialize)]
pub struct ResolveReport {
    /// The resolved scope. Empty means nothing is readable.
    pub query: ResolvedQuery,
    /// Per-stage timings in evaluation order.
    pub stages: Vec<StageTiming>,
    /// Total wall-clock time for the pipeline.
    pub elapsed: Duration,
}

impl ResolveReport {
    /// The resolved scope as a single predicate.
    pub fn predicate(&self) -> StreamPredicate {
        compile_predicate(&self.query)
    }

    /// The resolved scope as one predicate per store.
    pub fn predicates(&self) -> BTreeMap<StoreId, StreamPredicate> {
        compile_all(&self.query)
    }
}

/// Collects stage timings while the pipeline runs.
struct Timings {
    started: Instant,
    stage_started: Instant,
    stages: Vec<StageTiming>,
}

impl Timings {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            stage_started: now,
            stages: Vec::with_capacity(5),
        }
    }

    fn finish_stage(&mut self, stage_name: &str) {
        let elapsed = self.stage_started.elapsed();
        tracing::trace!(stage = stage_name, ?elapsed, "stage finished");
        self.stages.push(StageTiming {
            stage_name: stage_name.to_string(),
            elapsed,
        });
        self.stage_started = Instant::now();
    }
}

// ---------------------------------------------------------------------------
// StreamQueryResolver
// ---------------------------------------------------------------------------

/// Turns a raw `streams` parameter into the exact scope a caller may read.
///
/// Stages run strictly in order, each consuming the previous one's output:
///
/// normalize -> validate -> permissions -> expand -> algebra
///
/// The pipeline is fail-fast: the first error aborts the request and no
/// partially resolved query is returned. The resolver holds no state across
/// calls and can be shared between concurrent requests.
pub struct StreamQueryResolver {
    config: ResolverConfig,
    default_clauses: Vec<RawClause>,
    lookup: Arc<dyn DescendantLookup>,
}

impl StreamQueryResolver {
    /// Create a resolver, validating the configured default query.
    pub fn new(config: ResolverConfig, lookup: Arc<dyn DescendantLookup>) -> ResolveResult<Self> {
        let default_clauses = config.default_clauses()?;
        validate_and_partition(&config.param_name, &default_clauses, &config.conventions)?;
        Ok(Self {
            config,
            default_clauses,
            lookup,
        })
    }

    /// The current configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a request on behalf of `caller`.
    ///
    /// Fails with [`ResolveError::Timeout`] when the pipeline does not
    /// finish within the configured timeout; expansion stops there.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
        caller: &dyn CallerPermissions,
    ) -> ResolveResult<ResolveReport> {
        let span = tracing::info_span!(
            "resolve_streams_query",
            state = %request.state,
            legacy = request.legacy,
            stores = tracing::field::Empty,
        );
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.run(request, caller).instrument(span)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?timeout, "streams query resolution timed out");
                Err(ResolveError::Timeout(timeout))
            }
        }
    }

    async fn run(
        &self,
        request: &ResolveRequest,
        caller: &dyn CallerPermissions,
    ) -> ResolveResult<ResolveReport> {
        let conventions = &self.config.conventions;
        let param = self.config.param_name.as_str();
        let mut timings = Timings::start();

        let raw = normalize(
            param,
            request.streams.as_ref(),
            &self.default_clauses,
            conventions,
            request.legacy,
        )
        .inspect_err(|e| tracing::warn!(error = %e, "streams query rejected"))?;
        timings.finish_stage("normalize");

        let clauses = validate_and_partition(param, &raw, conventions)
            .inspect_err(|e| tracing::warn!(error = %e, "streams query rejected"))?;
        timings.finish_stage("validate");

        let stores: Vec<&str> = clauses.iter().map(|c| c.store_id.as_str()).collect();
        tracing::Span::current().record("stores", tracing::field::display(stores.join(",")));

        let clauses =
            resolve_permissions(clauses, caller, self.lookup.as_ref(), conventions).await?;
        timings.finish_stage("permissions");

        let expanded =
            expand_clauses(&clauses, self.lookup.as_ref(), conventions, request.state).await?;
        timings.finish_stage("expand");

        let query = reduce_clauses(expanded);
        timings.finish_stage("algebra");

        tracing::debug!(
            clauses = query.len(),
            elapsed = ?timings.started.elapsed(),
            "streams query resolved"
        );
        Ok(ResolveReport {
            query,
            elapsed: timings.started.elapsed(),
            stages: timings.stages,
        })
    }

    /// Rewrite default-store ids of a resolved query to their legacy form,
    /// for responses to callers that opted into backward compatibility.
    pub fn to_legacy(&self, query: &ResolvedQuery) -> ResolvedQuery {
        let conventions = &self.config.conventions;
        let Some(prefixes) = conventions.legacy() else {
            return query.clone();
        };
        let marker = conventions.no_expand_marker();
        let rewrite = |ids: &[StreamId]| -> Vec<StreamId> {
            ids.iter()
                .map(|id| StreamId::from(prefixes.to_legacy(id.as_str(), marker)))
                .collect()
        };

        let mut out = query.clone();
        for clause in &mut out.clauses {
            if clause.store_id != *conventions.default_store() {
                continue;
            }
            if let Some(any) = &mut clause.any {
                *any = rewrite(any);
            }
            for branch in &mut clause.and {
                match branch {
                    ClauseBranch::Any(ids) | ClauseBranch::Not(ids) => *ids = rewrite(ids),
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for StreamQueryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamQueryResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
