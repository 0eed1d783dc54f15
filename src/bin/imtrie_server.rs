//! imtrie-server - completion server for an input method
//!
//! Usage:
//!   imtrie-server serve [--config FILE] [--store PATH | --ephemeral] [--bind ADDR] ...
//!   imtrie-server import --store PATH FILE
//!   imtrie-server query [--addr ADDR] INPUT
//!
//! Protocol:
//!   Request:  [4 ASCII digits: length] [JSON, UTF-8 or GBK]
//!   Response: [4 ASCII digits: length] [JSON, GBK by default]

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use imtrie::config::DEFAULT_PORT;
use imtrie::server::lock_engine;
use imtrie::{
    BackendKind, Client, Engine, JournalStore, MemoryStore, QueryServer, Record, RecordStore,
    ResponseEncoding, ServerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "imtrie-server", version)]
#[command(about = "Frequency-ranked prefix completion server for input methods")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the store and answer completion requests
    Serve(ServeArgs),

    /// Bulk-load `code<TAB>word<TAB>frequency` lines into a journal store
    Import {
        /// Journal file to load into (created if missing)
        #[arg(long)]
        store: PathBuf,

        /// Tab-separated record file
        file: PathBuf,
    },

    /// Send one completion request and print the answer
    Query {
        #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
        addr: SocketAddr,

        #[arg(long, value_enum, default_value_t = ResponseEncoding::Gbk)]
        encoding: ResponseEncoding,

        /// Expect `[[symbols..., name], frequency]` records (frozen backend)
        #[arg(long)]
        records: bool,

        input: String,
    },
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// YAML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Journal file backing the index
    #[arg(long, conflicts_with = "ephemeral")]
    store: Option<PathBuf>,

    /// Serve from an empty in-memory store, ignoring any configured journal
    #[arg(long)]
    ephemeral: bool,

    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Peer allowed to connect (repeatable; replaces the configured list)
    #[arg(long = "allow")]
    allow: Vec<IpAddr>,

    #[arg(long)]
    max_completions: Option<usize>,

    #[arg(long)]
    flush_period_ms: Option<u64>,

    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    #[arg(long, value_enum)]
    encoding: Option<ResponseEncoding>,
}

impl ServeArgs {
    fn resolve(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if !self.allow.is_empty() {
            config.allow = self.allow;
        }
        if let Some(n) = self.max_completions {
            config.max_completions = n;
        }
        if let Some(ms) = self.flush_period_ms {
            config.flush_period_ms = ms;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if self.ephemeral {
            config.store = None;
        } else if let Some(store) = self.store {
            config.store = Some(store);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args.resolve()?),
        Command::Import { store, file } => import(store, file),
        Command::Query { addr, encoding, records, input } => query(addr, encoding, records, &input),
    }
}

fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting imtrie-server");

    let store: Box<dyn RecordStore> = match &config.store {
        Some(path) => {
            let store = JournalStore::open(path)
                .with_context(|| format!("opening store {}", path.display()))?;
            tracing::info!(path = %path.display(), records = store.len(), "store opened");
            Box::new(store)
        }
        None => {
            tracing::info!("no store configured, serving from an ephemeral in-memory store");
            Box::new(MemoryStore::new())
        }
    };

    let engine = Engine::open(store, &config)?;
    tracing::info!(
        backend = ?engine.backend().kind(),
        entries = ?engine.entry_count(),
        max_completions = config.max_completions,
        flush_period_ms = config.flush_period_ms,
        "engine ready"
    );
    let engine = Arc::new(Mutex::new(engine));

    // Flush pending writes on SIGINT/SIGTERM
    let engine_for_signal = Arc::clone(&engine);
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .context("registering signal handlers")?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::info!(signal = sig, "received signal, flushing");
            match lock_engine(&engine_for_signal).flush() {
                Ok(stats) => tracing::info!(
                    inserted = stats.inserted,
                    removed = stats.removed,
                    "flushed pending mutations"
                ),
                Err(e) => tracing::error!(error = %e, "flush failed, pending mutations lost"),
            }
            tracing::info!("exiting");
            std::process::exit(0);
        }
    });

    let server = QueryServer::bind(config, engine)?;
    server.run()?;
    Ok(())
}

fn import(store_path: PathBuf, file: PathBuf) -> anyhow::Result<()> {
    let reader = BufReader::new(
        File::open(&file).with_context(|| format!("opening {}", file.display()))?,
    );

    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let record = Record::parse_tsv(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        records.push(record);
    }
    if records.is_empty() {
        bail!("{} contains no records", file.display());
    }

    let mut store = JournalStore::open(&store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;
    store.add_many(&records)?;
    store.compact()?;

    tracing::info!(
        file = %file.display(),
        imported = records.len(),
        total = store.len(),
        "import complete"
    );
    Ok(())
}

fn query(
    addr: SocketAddr,
    encoding: ResponseEncoding,
    records: bool,
    input: &str,
) -> anyhow::Result<()> {
    let mut client = Client::connect_with(addr, encoding)
        .with_context(|| format!("connecting to {}", addr))?;

    if records {
        for (symbols, frequency) in client.complete_records(input)? {
            println!("{}\t{}", symbols.join(" "), frequency);
        }
    } else {
        for (code, name) in client.complete(input)? {
            println!("{}\t{}", code, name);
        }
    }
    Ok(())
}
