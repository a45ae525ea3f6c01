//! Indexing sessions
//!
//! A session owns the store handle, the configuration and the dedup memo for
//! one run. Repositories are independent: each one runs validate, bucket,
//! tree, existence check and persist on its own, and a failure is reported
//! for that repository alone.

use crate::bucket::Bucketer;
use crate::config::IndexerConfig;
use crate::dedup::DedupCache;
use crate::error::{RepoFailure, Stage};
use crate::keys::document_key;
use crate::model::PreparedRepo;
use crate::persist::{Persister, StoreSummary};
use crate::tree::TreeBuilder;
use crate::{IndexError, Result, ValidationError};
use repoprint_store::{IndexStore, Key};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// Commit object id widths: git SHA-1 and SHA-256 repositories
const COMMIT_WIDTHS: [usize; 2] = [20, 32];

/// What happened to one repository
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The index was written
    Indexed(StoreSummary),
    /// The document already existed and nothing was written
    Skipped { document: Key },
}

/// Per-repository results of [`IndexSession::index_all`], in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<std::result::Result<IndexOutcome, RepoFailure>>,
}

impl BatchReport {
    /// Repositories whose index was written
    pub fn indexed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Ok(IndexOutcome::Indexed(_))))
            .count()
    }

    /// Repositories skipped as already indexed
    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Ok(IndexOutcome::Skipped { .. })))
            .count()
    }

    /// Failed repositories
    pub fn failures(&self) -> impl Iterator<Item = &RepoFailure> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    /// Number of failed repositories
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// Check if every repository was indexed or skipped
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }
}

/// One indexing run over a shared store
pub struct IndexSession<S: IndexStore> {
    config: IndexerConfig,
    bucketer: Bucketer,
    tree_builder: TreeBuilder,
    dedup: DedupCache<S>,
    persister: Persister<S>,
}

impl<S: IndexStore> IndexSession<S> {
    /// Start a session; fails if `config` is unusable
    pub fn new(store: Arc<S>, config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        let algorithm = config.hash_algorithm;
        Ok(Self {
            bucketer: Bucketer::new(config.bucket_size, algorithm),
            tree_builder: TreeBuilder::new(config.branching_factor, algorithm)
                .with_max_height(config.max_height),
            dedup: DedupCache::new(Arc::clone(&store)),
            persister: Persister::new(store),
            config,
        })
    }

    /// Get the session configuration
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Get the session's dedup memo
    pub fn dedup(&self) -> &DedupCache<S> {
        &self.dedup
    }

    /// Index one prepared repository
    #[instrument(skip_all, fields(address = %prepared.repo.address, commit = %prepared.repo.commit))]
    pub async fn index_repo(
        &self,
        prepared: &PreparedRepo,
    ) -> std::result::Result<IndexOutcome, RepoFailure> {
        let repo = &prepared.repo;
        let algorithm = self.config.hash_algorithm;
        let fail = |stage: Stage, error: IndexError| RepoFailure {
            address: repo.address.clone(),
            commit: repo.commit.to_hex(),
            stage,
            error,
        };

        self.validate(prepared).map_err(|e| fail(Stage::Validate, e))?;
        let buckets = self.bucketer.split(&prepared.files);
        let tree = self.tree_builder.build(&buckets);

        if !self.config.force {
            match self.dedup.exists(&repo.address, algorithm, &repo.commit).await {
                Ok(true) => {
                    let document = document_key(&repo.address, algorithm, &repo.commit);
                    info!(document = document.name(), "already indexed, skipping");
                    return Ok(IndexOutcome::Skipped { document });
                }
                Ok(false) => {}
                Err(e) if self.config.proceed_on_check_failure => {
                    warn!(error = %e, "existence check failed, indexing anyway");
                }
                Err(e) => return Err(fail(Stage::ExistenceCheck, e)),
            }
        }

        let summary = self
            .persister
            .store(repo, algorithm, &buckets, &tree)
            .await
            .map_err(|e| fail(Stage::Persist, e))?;
        self.dedup.record_key(&summary.document);
        info!(
            files = prepared.files.len(),
            height = tree.height().unwrap_or(0),
            records = summary.records(),
            "indexed repository"
        );
        Ok(IndexOutcome::Indexed(summary))
    }

    fn validate(&self, prepared: &PreparedRepo) -> Result<()> {
        let repo = &prepared.repo;
        if repo.address.is_empty() {
            return Err(ValidationError::EmptyAddress.into());
        }
        if !COMMIT_WIDTHS.contains(&repo.commit.len()) {
            return Err(ValidationError::CommitWidth(repo.commit.len()).into());
        }
        if let Some(unreadable) = prepared.unreadable.first() {
            return Err(IndexError::HashComputation {
                path: unreadable.path.clone(),
                reason: unreadable.reason.clone(),
            });
        }
        self.bucketer.validate(&prepared.files)?;
        Ok(())
    }
}

impl<S: IndexStore + 'static> IndexSession<S> {
    /// Index every repository on a pool of `workers` concurrent tasks.
    ///
    /// A failing repository is reported in the batch and never stops the
    /// others.
    pub async fn index_all(self: &Arc<Self>, repos: Vec<PreparedRepo>) -> BatchReport {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let total = repos.len();

        let mut handles = Vec::with_capacity(total);
        for prepared in repos {
            let address = prepared.repo.address.clone();
            let commit = prepared.repo.commit.to_hex();
            let session = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                session.index_repo(&prepared).await
            });
            handles.push((address, commit, handle));
        }

        let mut report = BatchReport {
            results: Vec::with_capacity(total),
        };
        for (address, commit, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => Err(RepoFailure {
                    address,
                    commit,
                    stage: Stage::Queue,
                    error: IndexError::Interrupted(e.to_string()),
                }),
            };
            if let Err(failure) = &result {
                warn!(error = %failure, retryable = failure.is_retryable(), "repository failed");
            }
            report.results.push(result);
        }

        info!(
            total,
            indexed = report.indexed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch complete"
        );
        report
    }
}
