use crate::cache::{default_cache_dir, DiskCache};
use crate::document::process_document;
use crate::prelude::{eprintln, println, *};
use breakdown_core::cache::{CacheKey, MemoryCache};
use breakdown_core::config::ExtractConfig;
use breakdown_core::pipeline::ResultTable;
use colored::Colorize;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_OUTPUT: &str = "breakdown.xlsx";

#[derive(Debug, clap::Args, Clone)]
pub struct ExtractOptions {
    /// PDF reports to process
    #[arg(value_name = "PDF", required = true)]
    pub paths: Vec<PathBuf>,

    /// Also extract the amount column
    #[arg(long, env = "BREAKDOWN_AMOUNT")]
    pub amount: bool,

    /// Output file (one input) or directory (several inputs)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the tables as JSON instead of a preview
    #[arg(long)]
    pub json: bool,

    /// Skip the on-disk result cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Outcome for one input document.
#[derive(Debug, Serialize)]
pub struct DocumentOutput {
    pub path: PathBuf,
    pub cached: bool,
    pub output: Option<PathBuf>,
    pub table: ResultTable,
}

/// Shared state handed to each blocking extraction task.
#[derive(Clone)]
struct Extractor {
    config: ExtractConfig,
    memory: Arc<MemoryCache<ResultTable>>,
    disk: Option<DiskCache>,
}

impl Extractor {
    /// Read, look up the caches, and extract on a miss.
    fn extract(&self, path: &Path) -> Result<(ResultTable, bool)> {
        let bytes = std::fs::read(path).wrap_err_with(|| f!("Failed to read {}", path.display()))?;
        let key = CacheKey::for_document(&bytes, &self.config);

        if let Some(table) = self.disk.as_ref().and_then(|disk| disk.get(&key)) {
            log::info!("cache hit for {} ({})", path.display(), key);
            self.memory.insert(&key, table.clone());
            return Ok((table, true));
        }

        let table = self
            .memory
            .get_or_try_compute(&key, || process_document(&bytes, &self.config))
            .map_err(|e| eyre!("{}: {}", path.display(), e))?;

        if let Some(disk) = &self.disk {
            if let Err(e) = disk.put(&key, &table) {
                log::warn!("{e}");
            }
        }

        Ok((table, false))
    }
}

/// Where the workbook for each input goes, in input order.
///
/// One input writes to `output` or [`DEFAULT_OUTPUT`]. Several inputs write
/// `<stem>.xlsx` into the `output` directory; a stem seen before gets a
/// `-2`, `-3`... suffix so no two inputs share a workbook.
pub fn output_paths(inputs: &[PathBuf], output: Option<&Path>) -> Result<Vec<PathBuf>> {
    if inputs.len() <= 1 {
        let out = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        return Ok(inputs.iter().map(|_| out.clone()).collect());
    }

    let dir = output.unwrap_or_else(|| Path::new("."));
    if dir.is_file() {
        return Err(Error::InvalidOutput(f!(
            "{} is a file, expected a directory for several inputs",
            dir.display()
        ))
        .into());
    }

    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| -> Result<PathBuf> {
            let stem = input
                .file_stem()
                .ok_or_else(|| Error::InvalidOutput(f!("{} has no file name", input.display())))?
                .to_string_lossy()
                .into_owned();

            let mut name = f!("{stem}.xlsx");
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = f!("{stem}-{n}.xlsx");
                n += 1;
            }
            Ok(dir.join(name))
        })
        .collect()
}

fn write_workbook(table: &ResultTable, path: &Path) -> Result<()> {
    let bytes = crate::xlsx::write_xlsx(table)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes).wrap_err_with(|| f!("Failed to write {}", path.display()))
}

/// Per-document outcomes of a batch.
#[derive(Debug, Default)]
struct Summary {
    outputs: Vec<DocumentOutput>,
    unreadable: usize,
    unwritten: usize,
}

/// Write a workbook for every document that produced rows.
///
/// A failure on one document is reported and counted, and the rest are
/// still written.
fn write_outputs(results: Vec<(PathBuf, PathBuf, Result<(ResultTable, bool)>)>) -> Summary {
    let mut summary = Summary::default();

    for (path, out, result) in results {
        let (table, cached) = match result {
            Ok(found) => found,
            Err(e) => {
                summary.unreadable += 1;
                eprintln!("{} {e:#}", "error:".red().bold());
                continue;
            }
        };

        let output = if table.is_empty() {
            eprintln!("{}", Error::NoRowsFound(path.display().to_string()).to_string().yellow());
            None
        } else {
            match write_workbook(&table, &out) {
                Ok(()) => Some(out),
                Err(e) => {
                    summary.unwritten += 1;
                    eprintln!("{} {}: {e:#}", "error:".red().bold(), path.display());
                    None
                }
            }
        };

        summary.outputs.push(DocumentOutput {
            path,
            cached,
            output,
            table,
        });
    }

    summary
}

pub async fn run(options: ExtractOptions, global: crate::Global) -> Result<()> {
    let config = crate::config::load_config(global.config.as_deref(), options.amount)?;
    let targets = output_paths(&options.paths, options.output.as_deref())?;

    let disk = if options.no_cache {
        None
    } else {
        let dir = match &global.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir()?,
        };
        Some(DiskCache::new(dir))
    };

    if global.verbose {
        eprintln!("Processing {} document(s)", options.paths.len());
        if let Some(disk) = &disk {
            eprintln!("Cache: {}", disk.dir().display());
        }
    }

    let extractor = Extractor {
        config,
        memory: Arc::new(MemoryCache::new()),
        disk,
    };

    let tasks = options.paths.iter().cloned().map(|path| {
        let extractor = extractor.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
    });

    // join_all keeps input order.
    let results = join_all(tasks)
        .await
        .into_iter()
        .zip(options.paths.iter().cloned().zip(targets))
        .map(|(joined, (path, out))| {
            let result = joined
                .map_err(|e| eyre!("{}: {}", path.display(), e))
                .and_then(|found| found);
            (path, out, result)
        })
        .collect();

    let summary = write_outputs(results);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary.outputs)?);
    } else {
        output_formatted(&summary.outputs, global.verbose);
    }

    let total = options.paths.len();
    if summary.unreadable > 0 {
        return Err(Error::Unreadable(summary.unreadable, total).into());
    }
    if summary.unwritten > 0 {
        return Err(Error::Unwritten(summary.unwritten, total).into());
    }
    if summary.outputs.iter().all(|o| o.table.is_empty()) {
        let names: Vec<String> = summary
            .outputs
            .iter()
            .map(|o| o.path.display().to_string())
            .collect();
        return Err(Error::NoRowsFound(names.join(", ")).into());
    }

    Ok(())
}

fn output_formatted(outputs: &[DocumentOutput], verbose: bool) {
    for output in outputs {
        let Some(out) = &output.output else {
            continue;
        };

        if outputs.len() > 1 {
            println!("\n{}", output.path.display().to_string().bright_cyan());
        }
        records_table(&output.table.headers(), &output.table.records()).printstd();

        let source = if output.cached && verbose { " (cached)" } else { "" };
        println!(
            "{} {} {} projects to {}{}",
            "✓".green(),
            "Extracted".bold(),
            output.table.project_count(),
            out.display(),
            source
        );
    }
}
