//! The orchestrator: one full engine cycle.
//!
//! Sources are processed sequentially in declaration order; a failing
//! source never stops the fleet. After the last source the orchestrator
//! derives the global cursor, validates every document against the feed
//! invariants, and only then publishes: per-source feeds unconditionally,
//! the global feed only on change, fleet state last. An invariant
//! violation aborts the cycle with nothing written.

use std::time::Instant;

use tracing::{debug, info, warn};

use diffdelta_adapters::{create_adapter, FetchOutcome, HttpClient, NormalizedItem, SourceAdapter};
use diffdelta_config::{FleetConfig, SourceConfig};
use diffdelta_emit::{
    fetch_failed_issue, run_id, update_known_issues, write_json_document, write_telemetry,
    EmitTelemetry, FetchTelemetry, StateTelemetry, TelemetryDoc, TelemetryRecord,
};
use diffdelta_engine::assemble::{global_feed, source_feed};
use diffdelta_engine::cursor::Cursor;
use diffdelta_engine::diff::{
    dedup_first_by_id, disabled_result, error_result, global_cursor, process_cycle, SourceCycle,
};
use diffdelta_engine::validate::validate_feed;
use diffdelta_engine::{Buckets, FeedDocument, PerSourceResult, SourceStatus};
use diffdelta_state::{FleetStateStore, GlobalState, StateDelta};
use diffdelta_utils::error::DiffDeltaError;
use diffdelta_utils::paths::OutputLayout;
use diffdelta_utils::time::{now_utc, to_rfc3339_utc};

/// Aggregate outcome of one cycle, for the summary line and exit status.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub generated_at: String,
    pub global_changed: bool,
    pub sources_total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub new: usize,
    pub updated: usize,
    pub removed: usize,
    pub flagged: usize,
}

impl CycleReport {
    /// The one-line cycle summary printed on stdout.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "OK: changed={} sources={} success={} errors={} new={} updated={} flagged={}",
            self.global_changed,
            self.sources_total,
            self.success_count,
            self.error_count,
            self.new,
            self.updated,
            self.flagged,
        )
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

struct SourceOutcome {
    result: PerSourceResult,
    delta: StateDelta,
    fetch: FetchTelemetry,
}

/// Drives one batch cycle over a configured fleet.
pub struct Orchestrator {
    config: FleetConfig,
    layout: OutputLayout,
    http: HttpClient,
}

impl Orchestrator {
    pub fn new(config: FleetConfig, layout: OutputLayout) -> anyhow::Result<Self> {
        let http = HttpClient::new()?;
        Ok(Self {
            config,
            layout,
            http,
        })
    }

    /// Run one full cycle: fetch, diff, validate, publish, persist.
    pub async fn run_cycle(&self) -> Result<CycleReport, DiffDeltaError> {
        let state_store = FleetStateStore::new(self.layout.fleet_state());
        let mut state = state_store.load()?;

        let mut results: Vec<(String, PerSourceResult)> = Vec::new();
        let mut outcomes: Vec<SourceOutcome> = Vec::new();

        for (name, source_config) in self.config.sources() {
            let prev = state.source(name).cloned();
            let outcome = self
                .process_source(name, source_config, prev.as_ref())
                .await;

            match &outcome.result.status {
                SourceStatus::Ok => info!(
                    source = %name,
                    changed = outcome.result.changed,
                    "source processed"
                ),
                SourceStatus::Disabled => debug!(source = %name, "source disabled"),
                SourceStatus::Error => warn!(
                    source = %name,
                    error = outcome.result.error.as_deref().unwrap_or(""),
                    "source failed"
                ),
            }

            results.push((name.clone(), outcome.result.clone()));
            outcomes.push(outcome);
        }

        let generated_at = to_rfc3339_utc(now_utc());

        // Global cursor: recomputed only when something changed, otherwise
        // pinned to the previous value by the stability invariant.
        let global_changed = results.iter().any(|(_, r)| r.changed);
        let prev_global_cursor =
            Cursor::from_stored(state.global.as_ref().map(|g| g.last_cursor.as_str()));
        let final_global_cursor = if global_changed {
            global_cursor(&results)?
        } else {
            prev_global_cursor.clone()
        };

        let global_doc = global_feed(
            &results,
            final_global_cursor.clone(),
            prev_global_cursor,
            global_changed,
            &generated_at,
        );

        // Validate everything before publishing anything.
        validate_feed("global", &global_doc)?;
        let mut source_docs: Vec<(String, FeedDocument)> = Vec::new();
        for ((name, result), source_config) in
            results.iter().zip(self.config.sources().iter().map(|(_, c)| c))
        {
            let doc = source_feed(name, result, &generated_at);
            validate_feed(name, &doc)?;
            if let Some(latest) = source_config.paths.latest.as_deref() {
                source_docs.push((latest.to_string(), doc));
            }
        }

        // Publication. Per-source feeds always; the global feed only on
        // change, so pollers' caches stay warm through quiet cycles.
        for (latest, doc) in &source_docs {
            write_json_document(&self.layout.source_feed(latest), doc)?;
        }
        if global_changed {
            write_json_document(&self.layout.global_feed(), &global_doc)?;
        }

        // Fleet state is written last: a crash before this point replays
        // the cycle, never skips it.
        for ((name, _), outcome) in results.iter().zip(&outcomes) {
            state.apply(name, &outcome.delta);
        }
        state.global = Some(GlobalState {
            last_cursor: final_global_cursor.as_str().to_string(),
            last_run_at: generated_at.clone(),
        });
        state_store.save(&state)?;

        self.emit_telemetry(&generated_at, &results, &outcomes)?;
        self.emit_known_issues(&generated_at, &results)?;

        let merged = merged_buckets(&results);
        let report = CycleReport {
            generated_at,
            global_changed,
            sources_total: results.len(),
            success_count: results
                .iter()
                .filter(|(_, r)| r.status == SourceStatus::Ok)
                .count(),
            error_count: results
                .iter()
                .filter(|(_, r)| r.status == SourceStatus::Error)
                .count(),
            new: merged.new.len(),
            updated: merged.updated.len(),
            removed: merged.removed.len(),
            flagged: merged.flagged.len(),
        };
        Ok(report)
    }

    async fn process_source(
        &self,
        name: &str,
        source_config: &SourceConfig,
        prev: Option<&diffdelta_state::SourceState>,
    ) -> SourceOutcome {
        let ttl_sec = source_config.config.ttl_sec;
        let no_fetch = FetchTelemetry {
            ok: false,
            status_code: 0,
            duration_ms: 0,
            items_fetched: 0,
        };

        if !source_config.enabled {
            return SourceOutcome {
                result: disabled_result(prev, ttl_sec),
                delta: StateDelta::default(),
                fetch: no_fetch,
            };
        }

        let now = to_rfc3339_utc(now_utc());

        let Some(tag) = source_config.adapter.as_deref() else {
            let (result, delta) =
                error_result(prev, ttl_sec, "No adapter specified".to_string(), &now);
            return SourceOutcome {
                result,
                delta,
                fetch: no_fetch,
            };
        };

        let Some(kind) = source_config.adapter_kind() else {
            let (result, delta) =
                error_result(prev, ttl_sec, format!("Unknown adapter type: {tag}"), &now);
            return SourceOutcome {
                result,
                delta,
                fetch: no_fetch,
            };
        };

        if source_config.paths.latest.is_none() {
            let (result, delta) = error_result(
                prev,
                ttl_sec,
                "No paths.latest configured for enabled source".to_string(),
                &now,
            );
            return SourceOutcome {
                result,
                delta,
                fetch: no_fetch,
            };
        }

        let adapter = create_adapter(kind, name, &source_config.config);

        let started = Instant::now();
        let outcome = adapter.fetch(&self.http).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let fetch = FetchTelemetry {
            ok: outcome.is_ok(),
            status_code: outcome.status,
            duration_ms,
            items_fetched: outcome.items.len(),
        };

        if !outcome.is_ok() {
            let message = outcome
                .error
                .clone()
                .unwrap_or_else(|| format!("HTTP {}", outcome.status));
            let error_at = to_rfc3339_utc(now_utc());
            let (result, delta) = error_result(prev, ttl_sec, message, &error_at);
            return SourceOutcome {
                result,
                delta,
                fetch,
            };
        }

        match self.diff_fetched(name, adapter.as_ref(), &outcome, ttl_sec, prev) {
            Ok((result, delta)) => SourceOutcome {
                result,
                delta,
                fetch,
            },
            // Canonical encoding failures are invariant-grade, but they
            // surface per-source so the rest of the fleet still publishes.
            Err(e) => {
                let error_at = to_rfc3339_utc(now_utc());
                let (result, delta) = error_result(prev, ttl_sec, e.to_string(), &error_at);
                SourceOutcome {
                    result,
                    delta,
                    fetch,
                }
            }
        }
    }

    fn diff_fetched(
        &self,
        name: &str,
        adapter: &dyn SourceAdapter,
        outcome: &FetchOutcome,
        ttl_sec: u64,
        prev: Option<&diffdelta_state::SourceState>,
    ) -> Result<(PerSourceResult, StateDelta), diffdelta_utils::error::EngineError> {
        let fetched_at_dt = now_utc();
        let fetched_at = to_rfc3339_utc(fetched_at_dt);

        let max_items = adapter.max_items();
        let mut items: Vec<NormalizedItem> = Vec::new();
        let mut payloads: Vec<Option<serde_json::Value>> = Vec::new();
        for raw in outcome.items.iter().take(max_items) {
            items.push(adapter.normalize(raw, fetched_at_dt));
            payloads.push(adapter.source_payload(raw));
        }

        let (items, payloads) = dedup_first_by_id(items, payloads);
        let source_hash = adapter.source_hash(&items)?;

        let cycle = SourceCycle {
            source: name,
            ttl_sec,
            fetched_at: &fetched_at,
            http_status: outcome.status,
            items: &items,
            payloads: &payloads,
            prev,
        };
        process_cycle(&cycle, &source_hash)
    }

    fn emit_telemetry(
        &self,
        generated_at: &str,
        results: &[(String, PerSourceResult)],
        outcomes: &[SourceOutcome],
    ) -> Result<(), DiffDeltaError> {
        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        let id = run_id(generated_at, &names);

        let records = results
            .iter()
            .zip(outcomes)
            .map(|((name, result), outcome)| {
                let buckets = result.buckets.clone().unwrap_or_default();
                TelemetryRecord {
                    run_id: id.clone(),
                    source: name.clone(),
                    fetch: outcome.fetch.clone(),
                    emit: EmitTelemetry {
                        changed: result.changed,
                        new: buckets.new.len(),
                        updated: buckets.updated.len(),
                        removed: buckets.removed.len(),
                        flagged: buckets.flagged.len(),
                    },
                    state: StateTelemetry {
                        cursor: result.cursor.as_str().to_string(),
                        prev_cursor: result.prev_cursor.as_str().to_string(),
                    },
                }
            })
            .collect();

        let doc = TelemetryDoc::new(id, generated_at, records);
        write_telemetry(&self.layout.telemetry(), &doc)?;
        Ok(())
    }

    fn emit_known_issues(
        &self,
        generated_at: &str,
        results: &[(String, PerSourceResult)],
    ) -> Result<(), DiffDeltaError> {
        let issues = results
            .iter()
            .filter(|(_, r)| r.status == SourceStatus::Error)
            .map(|(name, result)| {
                fetch_failed_issue(
                    name,
                    result.error.as_deref().unwrap_or("Unknown error"),
                    generated_at,
                )
            })
            .collect();

        update_known_issues(&self.layout.known_issues(), issues, generated_at)?;
        Ok(())
    }
}

fn merged_buckets(results: &[(String, PerSourceResult)]) -> Buckets {
    let mut merged = Buckets::default();
    for (_, result) in results {
        if result.changed {
            if let Some(buckets) = &result.buckets {
                merged.extend_from(buckets);
            }
        }
    }
    merged
}
