//! Subcommands of the `repoprint` binary

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use clap::{Args, Subcommand, ValueEnum};
use repoprint_core::keys::document_key;
use repoprint_core::{
    DedupCache, IndexOutcome, IndexReader, IndexSession, IndexerConfig, Persister, PreparedRepo,
};
use repoprint_hash::{Digest, HashAlgorithm};
use repoprint_store::{BulkRemover, Kind, MemoryIndexStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index every repository in a prepared JSON manifest
    Index(IndexArgs),
    /// Check whether a repository commit is indexed
    Exists(LookupArgs),
    /// Print a stored document and its record counts
    Show(LookupArgs),
    /// Delete one repository commit and all of its records
    Delete(LookupArgs),
    /// Remove every record of one kind in throttled batches
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// JSON array of prepared repositories
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Files per leaf bucket
    #[arg(long)]
    pub bucket_size: Option<usize>,

    /// Children per tree node
    #[arg(long)]
    pub branching_factor: Option<usize>,

    /// Do not build layers above this height
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Algorithm the manifest's file hashes were produced with
    #[arg(long)]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Repositories indexed concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Re-index commits that are already stored
    #[arg(long)]
    pub force: bool,
}

impl IndexArgs {
    fn apply(&self, config: &mut IndexerConfig) {
        if let Some(bucket_size) = self.bucket_size {
            config.bucket_size = bucket_size;
        }
        if let Some(branching_factor) = self.branching_factor {
            config.branching_factor = branching_factor;
        }
        if self.max_height.is_some() {
            config.max_height = self.max_height;
        }
        if let Some(algorithm) = self.hash_algorithm {
            config.hash_algorithm = algorithm;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.force |= self.force;
    }
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Repository address
    #[arg(short, long)]
    pub address: String,

    /// Commit object id in hex
    #[arg(short, long)]
    pub commit: String,

    /// Algorithm the repository was indexed with
    #[arg(long)]
    pub hash_algorithm: Option<HashAlgorithm>,
}

#[derive(Args, Clone, Debug)]
pub struct RemoveArgs {
    /// Record kind to remove
    #[arg(short, long, value_enum)]
    pub kind: KindArg,

    /// Keys deleted per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Pause between batches, in milliseconds
    #[arg(long)]
    pub wait_ms: Option<u64>,

    /// Concurrent removal workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Confirm the removal
    #[arg(long)]
    pub yes: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Document,
    Bucket,
    Tree,
}

impl From<KindArg> for Kind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Document => Kind::Document,
            KindArg::Bucket => Kind::BucketResult,
            KindArg::Tree => Kind::TreeNode,
        }
    }
}

/// Run `command` against the snapshot named in `config`
pub async fn run(command: Command, mut config: CliConfig) -> Result<()> {
    let store = Arc::new(MemoryIndexStore::open_or_new(&config.snapshot).await?);
    info!(snapshot = %config.snapshot.display(), records = store.len(), "opened index");

    match command {
        Command::Index(args) => {
            args.apply(&mut config.indexer);
            index(&args, &config, store).await
        }
        Command::Exists(args) => exists(&args, &config, store).await,
        Command::Show(args) => show(&args, &config, store).await,
        Command::Delete(args) => delete(&args, &config, store).await,
        Command::Remove(args) => remove(&args, &config, store).await,
    }
}

async fn index(args: &IndexArgs, config: &CliConfig, store: Arc<MemoryIndexStore>) -> Result<()> {
    let manifest_error = |reason: String| CliError::Manifest {
        path: args.manifest.clone(),
        reason,
    };
    let bytes = tokio::fs::read(&args.manifest)
        .await
        .map_err(|e| manifest_error(e.to_string()))?;
    let repos: Vec<PreparedRepo> =
        serde_json::from_slice(&bytes).map_err(|e| manifest_error(e.to_string()))?;
    let total = repos.len();

    let session = Arc::new(IndexSession::new(Arc::clone(&store), config.indexer.clone())?);
    let report = session.index_all(repos).await;
    let saved = store.save_snapshot(&config.snapshot).await?;

    for result in &report.results {
        match result {
            Ok(IndexOutcome::Indexed(summary)) => println!(
                "indexed  {} ({} bucket results, {} tree nodes)",
                summary.document.name(),
                summary.bucket_results,
                summary.tree_nodes
            ),
            Ok(IndexOutcome::Skipped { document }) => println!("skipped  {}", document.name()),
            Err(failure) => println!("failed   {}", failure),
        }
    }
    println!(
        "{} indexed, {} skipped, {} failed; {} records in {}",
        report.indexed(),
        report.skipped(),
        report.failed(),
        saved,
        config.snapshot.display()
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::BatchFailed {
            failed: report.failed(),
            total,
        })
    }
}

fn lookup(args: &LookupArgs, config: &CliConfig) -> Result<(HashAlgorithm, Digest)> {
    let algorithm = args.hash_algorithm.unwrap_or(config.indexer.hash_algorithm);
    Ok((algorithm, Digest::from_hex(&args.commit)?))
}

async fn exists(args: &LookupArgs, config: &CliConfig, store: Arc<MemoryIndexStore>) -> Result<()> {
    let (algorithm, commit) = lookup(args, config)?;
    let found = DedupCache::new(store)
        .exists(&args.address, algorithm, &commit)
        .await?;
    println!("{}", found);
    Ok(())
}

async fn show(args: &LookupArgs, config: &CliConfig, store: Arc<MemoryIndexStore>) -> Result<()> {
    let (algorithm, commit) = lookup(args, config)?;
    let reader = IndexReader::new(store);
    let document = document_key(&args.address, algorithm, &commit);
    let header = reader
        .document(&document)
        .await?
        .ok_or_else(|| CliError::NotFound(document.name().to_string()))?;

    let buckets = reader.bucket_results(&document).await?;
    let nodes = reader.tree_nodes(&document).await?;
    let files: usize = buckets.iter().map(|b| b.files_contained()).sum();

    println!("document      {}", document.name());
    println!("name          {}", header.name);
    println!("version       {}", header.version);
    println!("tag           {}", header.tag);
    if let Some(when) = header.when {
        println!("when          {}", when.to_rfc3339());
    }
    println!("file exts     {}", header.file_exts.join(","));
    println!("files         {}", files);
    println!("buckets       {}", buckets.len());
    println!("tree nodes    {}", nodes.len());
    if let Some(root) = nodes.last() {
        println!("root          {} (height {})", root.node_hash, root.height);
    }
    Ok(())
}

async fn delete(args: &LookupArgs, config: &CliConfig, store: Arc<MemoryIndexStore>) -> Result<()> {
    let (algorithm, commit) = lookup(args, config)?;
    Persister::new(Arc::clone(&store))
        .remove(&args.address, algorithm, &commit)
        .await?;
    let saved = store.save_snapshot(&config.snapshot).await?;
    println!("deleted; {} records remain", saved);
    Ok(())
}

async fn remove(args: &RemoveArgs, config: &CliConfig, store: Arc<MemoryIndexStore>) -> Result<()> {
    if !args.yes {
        return Err(CliError::NotConfirmed);
    }

    let mut settings = config.remover.clone();
    if let Some(batch_size) = args.batch_size {
        settings.batch_size = batch_size;
    }
    if let Some(wait_ms) = args.wait_ms {
        settings.wait_ms = wait_ms;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }

    let kind = Kind::from(args.kind);
    let removed = BulkRemover::new(Arc::clone(&store), settings.to_remover_config())
        .remove_kind(kind)
        .await?;
    store.save_snapshot(&config.snapshot).await?;
    println!("removed {} {} records", removed, kind);
    Ok(())
}
