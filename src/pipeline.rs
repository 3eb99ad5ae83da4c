use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Entity, RawPhenotypeRecord, Resolved};
use crate::error::IngressError;
use crate::fetch::{PageSource, fetch_all};
use crate::graph::{GraphLoader, GraphStore, LoadSummary};
use crate::reference::ReferenceTables;
use crate::resolve::{EntityResolver, PhenotypeResolver};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub limit: Option<usize>,
    pub workers: usize,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: None,
            workers: 1,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub entities: Vec<Entity>,
    pub resolved: usize,
    pub unresolved: usize,
    pub malformed: usize,
    pub errored: usize,
}

impl Normalized {
    pub fn phenotype_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|entity| matches!(entity, Entity::Phenotype(_)))
            .count()
    }

    pub fn study_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|entity| matches!(entity, Entity::Study(_)))
            .count()
    }

    fn absorb(&mut self, record: &RawPhenotypeRecord, outcome: Result<Option<Resolved>, IngressError>) {
        match outcome {
            Ok(Some(resolved)) => {
                self.resolved += 1;
                self.entities.extend(resolved.into_entities());
            }
            Ok(None) => self.unresolved += 1,
            Err(err @ IngressError::MalformedKey { .. }) => {
                debug!(error = %err, "dropping malformed record");
                self.malformed += 1;
            }
            Err(err) => {
                warn!(key = %record.phenotype_key, error = %err, "failed to resolve record");
                self.errored += 1;
            }
        }
    }
}

pub struct Normalizer<R: EntityResolver> {
    resolver: R,
    workers: usize,
}

impl<'a> Normalizer<PhenotypeResolver<'a>> {
    pub fn from_tables(tables: &'a ReferenceTables, workers: usize) -> Self {
        Self::new(PhenotypeResolver::new(tables), workers)
    }
}

impl<R: EntityResolver> Normalizer<R> {
    pub fn new(resolver: R, workers: usize) -> Self {
        Self {
            resolver,
            workers: workers.max(1),
        }
    }

    /// Resolves every record, dropping the ones without reference data.
    /// Entities keep the order of the input records.
    pub fn normalize(&self, records: &[RawPhenotypeRecord]) -> Normalized {
        let outcomes = if self.workers > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    records
                        .par_iter()
                        .map(|record| self.resolver.resolve(record))
                        .collect::<Vec<_>>()
                }),
                Err(err) => {
                    warn!(error = %err, "worker pool unavailable, resolving inline");
                    self.resolve_inline(records)
                }
            }
        } else {
            self.resolve_inline(records)
        };

        let mut normalized = Normalized::default();
        for (record, outcome) in records.iter().zip(outcomes) {
            normalized.absorb(record, outcome);
        }
        normalized
    }

    fn resolve_inline(
        &self,
        records: &[RawPhenotypeRecord],
    ) -> Vec<Result<Option<Resolved>, IngressError>> {
        records
            .iter()
            .map(|record| self.resolver.resolve(record))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub malformed: usize,
    pub errored: usize,
    pub phenotypes: usize,
    pub studies: usize,
    pub loaded: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Pipeline<P: PageSource> {
    source: P,
    tables: ReferenceTables,
}

impl<P: PageSource> Pipeline<P> {
    pub fn new(source: P, tables: ReferenceTables) -> Self {
        Self { source, tables }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn fetch(&self, sink: &dyn ProgressSink) -> Result<Vec<RawPhenotypeRecord>, IngressError> {
        let started = Instant::now();
        fetch_all(&self.source, |page, total| {
            sink.event(ProgressEvent {
                message: format!("phase=Fetch; page {page}, {total} records"),
                elapsed: Some(started.elapsed()),
            });
        })
    }

    pub fn run<S: GraphStore>(
        &self,
        store: &mut S,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, IngressError> {
        let started_at = Utc::now();
        let started = Instant::now();

        let mut records = self.fetch(sink)?;
        let fetched = records.len();
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }
        info!(fetched, kept = records.len(), "fetched phenotype records");

        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {} records", records.len()),
            elapsed: Some(started.elapsed()),
        });
        let normalized = Normalizer::from_tables(&self.tables, options.workers).normalize(&records);
        info!(
            resolved = normalized.resolved,
            unresolved = normalized.unresolved,
            malformed = normalized.malformed,
            errored = normalized.errored,
            entities = normalized.entities.len(),
            "normalized phenotype records"
        );

        let summary = if options.dry_run {
            LoadSummary::default()
        } else {
            sink.event(ProgressEvent {
                message: format!("phase=Load; {} entities", normalized.entities.len()),
                elapsed: Some(started.elapsed()),
            });
            GraphLoader::new(store).load(&normalized.entities)
        };
        info!(loaded = summary.loaded, failed = summary.failed, "merged entities into graph");

        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(started.elapsed()),
        });

        Ok(RunReport {
            fetched,
            resolved: normalized.resolved,
            unresolved: normalized.unresolved,
            malformed: normalized.malformed,
            errored: normalized.errored,
            phenotypes: normalized.phenotype_count(),
            studies: normalized.study_count(),
            loaded: summary.loaded,
            failed: summary.failed,
            dry_run: options.dry_run,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
