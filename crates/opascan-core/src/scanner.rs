//! Scan orchestration.
//!
//! One scan runs these steps in order:
//!
//! 1. confirm every rule location exists
//! 2. list and decode the input documents
//! 3. resolve the dialect and transform each document
//! 4. substitute parameters and merge fragments into one canonical input
//! 5. collect rule modules and the dialect's libraries
//! 6. evaluate through the gateway and decode the bindings

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use opascan_storage::{NamePattern, SourceKind, SourceRouter, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::dialect::{DecodedDocument, Dialect, DialectRunner, RunnerRegistry};
use crate::domain::{Result, ScanError, ScanResult};
use crate::gateway::{EvaluationGateway, EvaluationRequest};
use crate::libraries;
use crate::merge::{merge_with_policy, MergePolicy};
use crate::obs;
use crate::parameters::ParameterSet;
use crate::result_parser::parse_bindings;
use crate::substitution::{substitute, SubstitutionMode};
use crate::verdict::ScanVerdict;

/// Caller-selected behaviour for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Force a dialect instead of sniffing the input.
    pub dialect: Option<Dialect>,
    pub substitution: SubstitutionMode,
    pub merge_policy: MergePolicy,
    /// Upper bound for the whole scan.
    pub timeout: Option<Duration>,
}

/// Everything one scan needs. Built per invocation and never mutated.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub input: String,
    pub rules: Vec<String>,
    pub parameters: ParameterSet,
    pub options: ScanOptions,
}

impl ScanRequest {
    pub fn new(input: impl Into<String>, rules: Vec<String>) -> Self {
        Self {
            input: input.into(),
            rules,
            parameters: ParameterSet::default(),
            options: ScanOptions::default(),
        }
    }

    /// Build from the raw entrypoint strings: a comma separated rule list
    /// and a parameter string.
    pub fn from_raw(input: &str, rules: &str, parameters: &str) -> Result<Self> {
        Ok(Self::new(input, split_rules(rules)).with_parameters(ParameterSet::parse(parameters)?))
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }
}

/// Split a comma separated rule list, dropping empty entries.
pub fn split_rules(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of a successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub dialect: Dialect,
    pub document_count: usize,
    /// SHA-256 of the serialized canonical input.
    pub input_digest: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: ScanResult,
}

impl ScanReport {
    pub fn verdict(&self) -> ScanVerdict {
        ScanVerdict::from_result(&self.result)
    }
}

/// Runs scans against a fixed set of storage backends and one engine.
pub struct Scanner {
    router: SourceRouter,
    gateway: Arc<dyn EvaluationGateway>,
    registry: RunnerRegistry,
}

impl Scanner {
    pub fn new(router: SourceRouter, gateway: Arc<dyn EvaluationGateway>) -> Self {
        Self {
            router,
            gateway,
            registry: RunnerRegistry::default(),
        }
    }

    pub fn with_registry(mut self, registry: RunnerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn router(&self) -> &SourceRouter {
        &self.router
    }

    /// Run one scan, bounded by `request.options.timeout` when set.
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanReport> {
        let scan_id = Uuid::new_v4().to_string();
        let span = obs::scan_span(&scan_id);

        let scan = self.run(&scan_id, request).instrument(span);
        match request.options.timeout {
            Some(limit) => tokio::time::timeout(limit, scan)
                .await
                .map_err(|_| ScanError::Timeout(limit))?,
            None => scan.await,
        }
    }

    async fn run(&self, scan_id: &str, request: &ScanRequest) -> Result<ScanReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        obs::emit_scan_started(scan_id, &request.input, request.rules.len());

        let outcome = self.execute(scan_id, request, started_at, start).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(report) => obs::emit_scan_finished(scan_id, duration_ms, report.result.len(), true),
            Err(e) => {
                warn!(scan_id = %scan_id, error = %e, "Scan aborted");
                obs::emit_scan_finished(scan_id, duration_ms, 0, false);
            }
        }
        outcome
    }

    async fn execute(
        &self,
        scan_id: &str,
        request: &ScanRequest,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> Result<ScanReport> {
        self.check_rule_sources(&request.rules).await?;

        let documents = self.load_input(request).await?;
        let document_count = documents.len();

        let dialect = self.registry.resolve(&documents)?;
        let runner = self.registry.runner(dialect)?;
        info!(dialect = %dialect, documents = document_count, "Resolved input dialect");

        let canonical = build_canonical_input(runner, documents, request)?;
        let input_digest = digest(&canonical)?;

        let modules = self.collect_modules(runner, &request.rules).await?;
        obs::emit_documents_loaded(scan_id, dialect, document_count, modules.len());

        let evaluation = EvaluationRequest::new(canonical, modules);
        let bindings = self.gateway.evaluate(&evaluation).await?;
        let result = parse_bindings(&bindings)?;

        Ok(ScanReport {
            scan_id: scan_id.to_string(),
            dialect,
            document_count,
            input_digest,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            result,
        })
    }

    async fn check_rule_sources(&self, rules: &[String]) -> Result<()> {
        for uri in rules {
            let source = self.router.for_uri(uri)?;
            if !source.exists(uri).await? {
                return Err(ScanError::NotFound(missing_location(uri)));
            }
        }
        Ok(())
    }

    async fn load_input(&self, request: &ScanRequest) -> Result<Vec<DecodedDocument>> {
        let source = self.router.for_uri(&request.input)?;
        let raw = source
            .list(&request.input, &NamePattern::json(), true)
            .await?;

        let override_hint = request.options.dialect.map(|d| d.to_string());
        raw.into_iter()
            .map(|doc| {
                let value: Value =
                    serde_json::from_str(&doc.content).map_err(|e| ScanError::Decode {
                        uri: doc.source_uri.clone(),
                        reason: e.to_string(),
                    })?;
                if !value.is_object() {
                    return Err(ScanError::Decode {
                        uri: doc.source_uri,
                        reason: "document is not a JSON object".to_string(),
                    });
                }
                debug!(uri = %doc.source_uri, "Decoded input document");
                Ok(DecodedDocument {
                    hint: doc.dialect_hint.or_else(|| override_hint.clone()),
                    uri: doc.source_uri,
                    value,
                })
            })
            .collect()
    }

    /// Rule modules keyed by source URI, including those in nested
    /// directories, then the runner's libraries keyed by library name.
    async fn collect_modules(
        &self,
        runner: &dyn DialectRunner,
        rules: &[String],
    ) -> Result<BTreeMap<String, String>> {
        let mut modules = BTreeMap::new();
        let pattern = NamePattern::rego();

        for uri in rules {
            let source = self.router.for_uri(uri)?;
            for doc in source.list(uri, &pattern, true).await? {
                debug!(module = %doc.source_uri, "Loaded rule module");
                modules.insert(doc.source_uri, doc.content);
            }
        }

        for name in runner.dependencies() {
            modules.insert(name.to_string(), libraries::library(name)?.to_string());
        }

        Ok(modules)
    }
}

/// Transform, substitute and merge every document in input order.
pub fn build_canonical_input(
    runner: &dyn DialectRunner,
    documents: Vec<DecodedDocument>,
    request: &ScanRequest,
) -> Result<Value> {
    let mut canonical = Map::new();

    for doc in documents {
        let fragment = runner.transform(&doc.uri, doc.value)?;
        let fragment = if runner.accepts_parameters() {
            substitute(
                fragment,
                &request.parameters,
                request.options.substitution,
                &doc.uri,
            )?
        } else {
            fragment
        };

        let Value::Object(fragment) = fragment else {
            return Err(ScanError::Decode {
                uri: doc.uri,
                reason: "transformed document is not a JSON object".to_string(),
            });
        };
        merge_with_policy(&mut canonical, fragment, request.options.merge_policy)?;
    }

    Ok(Value::Object(canonical))
}

fn digest(input: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(input).map_err(|e| ScanError::Decode {
        uri: "canonical input".to_string(),
        reason: e.to_string(),
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn missing_location(uri: &str) -> StorageError {
    match SourceKind::from_uri(uri) {
        SourceKind::Local => StorageError::PathNotFound {
            path: uri.to_string(),
        },
        SourceKind::ObjectStorage => StorageError::NoObjectsMatched {
            uri: uri.to_string(),
        },
    }
}
