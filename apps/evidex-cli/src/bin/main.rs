use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use evidex_core::chunk_store::JsonChunkStore;
use evidex_core::config::Config;
use evidex_core::ingest::Ingestor;
use evidex_core::logging;
use evidex_core::traits::ChunkStore;
use evidex_core::types::{MetaFilter, MetaValue};
use evidex_hybrid::RetrieverRegistry;

const USAGE: &str = "Usage:
  evidex ingest <dir> <owner>
  evidex query <owner> \"<text>\" [--k N] [--filter key=value]...
  evidex remove <owner>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn usage_exit(msg: &str) -> ! {
    eprintln!("Error: {msg}\n{USAGE}");
    std::process::exit(1)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    logging::init(&settings.logging);

    let (cmd, args) = parse_args();
    let store: Arc<dyn ChunkStore> = Arc::new(JsonChunkStore::open(settings.storage.chunk_path())?);
    let registry = RetrieverRegistry::new(settings.clone(), Arc::clone(&store));

    match cmd.as_str() {
        "ingest" => {
            let (Some(dir), Some(owner)) = (args.first(), args.get(1)) else { usage_exit("ingest needs <dir> <owner>") };
            let dir = PathBuf::from(dir);
            let ingestor = Ingestor::default();
            let files = ingestor.list_txt_files(&dir);
            if files.is_empty() {
                println!("No .txt files found under {}.", dir.display());
                return Ok(());
            }

            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
                    .progress_chars("#>-"),
            );
            let mut chunks = Vec::new();
            for file in &files {
                pb.set_message(file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
                chunks.extend(ingestor.process_file(file, owner).with_context(|| format!("reading {}", file.display()))?);
                pb.inc(1);
            }
            pb.finish_with_message("chunked");

            store.put_chunks(owner, &chunks)?;
            // opening indexes what the store now holds
            let retriever = registry.get_or_open(owner).await?;
            let state = retriever.read().await.state();
            println!("Index state: {state:?}");
            tracing::info!(owner = owner.as_str(), files = files.len(), chunks = chunks.len(), "ingest complete");
            println!("Ingested {} files into {} chunks for owner '{}'", files.len(), chunks.len(), owner);
        }
        "query" => {
            let (Some(owner), Some(text)) = (args.first(), args.get(1)) else { usage_exit("query needs <owner> \"<text>\"") };
            let mut k = settings.retrieval.k_vector;
            let mut filter = MetaFilter::new();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--k" => {
                        k = args.get(i + 1).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage_exit("--k requires a number"));
                        i += 1;
                    }
                    "--filter" => {
                        let Some((key, value)) = args.get(i + 1).and_then(|kv| kv.split_once('=')) else {
                            usage_exit("--filter requires key=value")
                        };
                        filter.insert(key.to_string(), MetaValue::parse(value));
                        i += 1;
                    }
                    other => usage_exit(&format!("unknown argument '{other}'")),
                }
                i += 1;
            }

            let retriever = registry.get_or_open(owner).await?;
            let evidence = retriever.read().await.query(text, k, (!filter.is_empty()).then_some(&filter)).await;
            println!("{}", serde_json::to_string_pretty(&evidence)?);
        }
        "remove" => {
            let Some(owner) = args.first() else { usage_exit("remove needs <owner>") };
            registry.remove(owner).await?;
            println!("Removed owner '{}'", owner);
        }
        _ => usage_exit(&format!("unknown command '{cmd}'")),
    }
    Ok(())
}
