//! news-search demo driver
//!
//! Usage:
//!   news-search [--config <path>] [--index <dir>] [--data <records.json>]
//!               [--field <name>] [--raw] [--json] [--log-dir <dir> | --log-files]
//!               [-v] [QUERY...]
//!
//! The driver will:
//! 1. Teach the segmenter domain vocabulary
//! 2. Clear the index
//! 3. Load records from a JSON array (or a built-in sample) and upsert them
//! 4. Run every query and print the hits

use std::path::PathBuf;

use anyhow::Context;
use news_search::logging::{default_log_directory, LogFormat, LoggingConfig, LoggingSystem};
use news_search::{IndexManager, IndexingActor, Record, SearchConfig, TokenPipeline};

/// Vocabulary added before indexing so compounds stay whole
const DOMAIN_WORDS: &[&str] = &["机器学习"];

const SAMPLE_RECORDS: &str = r#"[
    { "id": 1, "title": "machine learning basics", "content": "intro" },
    { "id": 2, "title": "机器学习入门", "content": "从线性回归到神经网络" },
    { "id": 3, "title": "Markets rally on rate cut hopes", "content": "Stocks closed higher on Friday" },
    { "id": 4, "title": "天气预报", "content": "明天北京有雨" }
]"#;

/// Command line arguments
struct Args {
    config: Option<PathBuf>,
    index: Option<PathBuf>,
    data: Option<PathBuf>,
    field: Option<String>,
    raw: bool,
    json: bool,
    log_dir: Option<PathBuf>,
    verbose: bool,
    queries: Vec<String>,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            config: None,
            index: None,
            data: None,
            field: None,
            raw: false,
            json: false,
            log_dir: None,
            verbose: false,
            queries: Vec::new(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    parsed.config = Some(args.next().map(PathBuf::from).ok_or("--config needs a path")?);
                }
                "--index" | "-i" => {
                    parsed.index = Some(args.next().map(PathBuf::from).ok_or("--index needs a path")?);
                }
                "--data" | "-d" => {
                    parsed.data = Some(args.next().map(PathBuf::from).ok_or("--data needs a path")?);
                }
                "--field" | "-f" => {
                    parsed.field = Some(args.next().ok_or("--field needs a name")?);
                }
                "--raw" | "-r" => parsed.raw = true,
                "--json" => parsed.json = true,
                "--log-dir" => {
                    parsed.log_dir = Some(args.next().map(PathBuf::from).ok_or("--log-dir needs a path")?);
                }
                "--log-files" => parsed.log_dir = Some(default_log_directory()),
                "--verbose" | "-v" => parsed.verbose = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(format!("Unknown argument: {}", flag));
                }
                _ => parsed.queries.push(arg),
            }
        }

        if parsed.queries.is_empty() {
            parsed.queries.push("机器学习".to_string());
            parsed.queries.push("mach".to_string());
        }
        Ok(parsed)
    }
}

fn print_help() {
    println!(
        r#"news-search - full-text search demo

USAGE:
    news-search [OPTIONS] [QUERY]...

OPTIONS:
    -c, --config <PATH>    JSON configuration file
    -i, --index <DIR>      Index directory (overrides the configuration)
    -d, --data <PATH>      JSON array of {{id, title, content}} records
    -f, --field <NAME>     Search only this field (id, title or content)
    -r, --raw              Treat queries as query syntax, without prefix expansion
        --json             Emit log lines as JSON
        --log-dir <DIR>    Also write rolling log files into DIR
        --log-files        Also write rolling log files into the default log directory
    -v, --verbose          Enable debug logging for news-search
    -h, --help             Print this help message
"#
    );
}

fn load_records(data: Option<&PathBuf>) -> anyhow::Result<Vec<Record>> {
    let records = match data {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading records from {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing records in {}", path.display()))?
        }
        None => serde_json::from_str(SAMPLE_RECORDS).context("parsing built-in sample")?,
    };
    Ok(records)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut logging = LoggingConfig::for_cli(args.verbose);
    if args.json {
        logging = logging.with_format(LogFormat::Json);
    }
    if let Some(dir) = args.log_dir.clone() {
        logging = logging.with_log_directory(dir);
    }
    let _logging = LoggingSystem::init(logging).context("initializing logging")?;

    let mut config = match args.config.as_deref() {
        Some(path) => SearchConfig::load_or_default(path)?,
        None => SearchConfig::default(),
    };
    if let Some(index) = args.index.clone() {
        config.index_path = index;
    }
    config.validate()?;
    tracing::info!(index_path = %config.index_path.display(), "Starting news-search");

    let pipeline = TokenPipeline::from_config(&config).context("loading stopwords")?;
    for word in DOMAIN_WORDS {
        pipeline.add_word(word);
    }

    let manager = IndexManager::open(config, pipeline)?;
    let indexer = IndexingActor::spawn(manager);

    indexer.clear_all().await?;
    let records = load_records(args.data.as_ref())?;
    let count = indexer.upsert_batch(records).await?;
    tracing::info!(count, "Indexed records");

    let searcher = indexer.searcher();
    let field = args.field.as_deref();
    for query in &args.queries {
        let results = if args.raw {
            searcher.search_default(query, field)
        } else {
            searcher.search(query, field)
        };

        match results {
            Ok(records) => {
                println!("{} ({} hits)", query, records.len());
                for record in records {
                    println!("  {}", record);
                }
            }
            Err(e) => eprintln!("{}: {}", query, e),
        }
    }

    indexer.shutdown().await?;
    Ok(())
}
