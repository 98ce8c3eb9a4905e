use carousel_gen::config::{self, CarouselConfig};
use carousel_gen::output;
use carousel_gen::pipeline::CarouselPipeline;
use carousel_gen::store::ArtifactStore;
use carousel_gen::types::RequestDocument;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "carousel-gen")]
#[command(about = "Render text snippets into image carousel slides")]
#[command(long_about = "\
Render text snippets into image carousel slides

A request is a JSON document with a title and a list of slide texts:

  {
    \"title\": \"Five tips\",
    \"slides\": [{ \"text\": \"First tip\" }, { \"text\": \"Second tip\" }],
    \"include_logo\": true,
    \"style\": { \"width\": 1080, \"background\": [18, 18, 18] }
  }

Every slide is rendered as a PNG and stored under a fresh carousel id:

  carousel-store/
  └── 3f2c9a0d5b7e4c1f8a6b2d9e0c4f7a1e/
      ├── slide_1.png
      └── slide_2.png

Slides that fail to render are replaced by an error slide; the carousel always
has one image per input text. Stored carousels are removed by 'sweep' once they
are older than the configured TTL.

Run 'carousel-gen gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "carousel.toml", global = true)]
    config: PathBuf,

    /// Log level for diagnostics on stderr (overrides log_level in the config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a request document and store the slides
    Render {
        /// Request JSON file
        request: PathBuf,
        /// Print the JSON response (base64 slides) instead of progress
        #[arg(long)]
        json: bool,
    },
    /// Fetch one stored slide
    Get {
        carousel_id: String,
        filename: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the files of a stored carousel
    List { carousel_id: String },
    /// Remove stored carousels older than the TTL
    Sweep {
        /// Override storage.ttl_hours
        #[arg(long)]
        ttl_hours: Option<u64>,
        /// Keep running, sweeping every SECS seconds
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let level = match &cli.log_level {
        Some(level) => level.parse()?,
        None => config.level_filter()?,
    };
    init_tracing(level);

    match cli.command {
        Command::Render { request, json } => {
            let content = std::fs::read_to_string(&request)?;
            let document: RequestDocument = serde_json::from_str(&content)?;
            init_thread_pool(&config);
            let pipeline = CarouselPipeline::new(&config)?;
            let request = pipeline.request(document)?;
            tracing::info!(
                renderer = pipeline.renderer_name(),
                slides = request.slides.len(),
                "rendering carousel"
            );

            if json {
                let publication = pipeline.publish(&request, None)?;
                println!("{}", serde_json::to_string_pretty(&publication.response)?);
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        output::print_render_event(&event);
                    }
                });
                let publication = pipeline.publish(&request, Some(tx));
                printer.join().ok();
                println!();
                output::print_publication(&publication?);
            }
        }
        Command::Get {
            carousel_id,
            filename,
            out,
        } => {
            let store = ArtifactStore::open(&config.storage.root)?;
            let bytes = store.get(&carousel_id, &filename)?;
            match out {
                Some(path) => std::fs::write(path, bytes)?,
                None => std::io::stdout().lock().write_all(&bytes)?,
            }
        }
        Command::List { carousel_id } => {
            let store = ArtifactStore::open(&config.storage.root)?;
            let names = store.list(&carousel_id)?;
            output::print_listing(&carousel_id, &names);
        }
        Command::Sweep { ttl_hours, every } => {
            let store = ArtifactStore::open(&config.storage.root)?;
            let ttl = match ttl_hours {
                Some(hours) => Duration::from_secs(hours.saturating_mul(3600)),
                None => config.storage.ttl(),
            };
            loop {
                let report = store.sweep_expired(ttl)?;
                output::print_sweep_report(store.root(), ttl, &report);
                match every {
                    Some(secs) => std::thread::sleep(Duration::from_secs(secs.max(1))),
                    None => break,
                }
            }
        }
        Command::GenConfig => unreachable!("handled before config loading"),
    }

    Ok(())
}

/// Diagnostics go to stderr so `render --json` and `get` keep stdout clean.
fn init_tracing(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can constrain down, not up.
fn init_thread_pool(config: &CarouselConfig) {
    let threads = config::effective_threads(&config.processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
