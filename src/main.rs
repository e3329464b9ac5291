mod bom;
mod output;
mod parser;
mod scraper;
mod settings;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use parser::extract::{Extractor, QuantityScope};
use settings::Settings;

#[derive(Parser)]
#[command(name = "manual_bom", about = "Hardware bill-of-materials scraper for paginated online manuals")]
struct Cli {
    /// Settings file (default: ./manual_bom.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every page, then write the detail listing and the BOM CSV (default)
    Run(RunArgs),
    /// Clean and extract one saved HTML page, printing its mentions
    Extract {
        /// Path to the HTML file
        file: PathBuf,
        /// Page number to report mentions under
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(long, value_enum)]
        quantity_scope: Option<QuantityScope>,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// First page to fetch
    #[arg(long)]
    first: Option<u32>,
    /// Last page to fetch (inclusive)
    #[arg(long)]
    last: Option<u32>,
    /// Pause after each page, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Detail listing output path
    #[arg(long)]
    detail_out: Option<PathBuf>,
    /// BOM CSV output path
    #[arg(long)]
    bom_out: Option<PathBuf>,
    /// Which matches in a sentence receive its "(Nx)" quantity
    #[arg(long, value_enum)]
    quantity_scope: Option<QuantityScope>,
}

impl RunArgs {
    fn apply(self, s: &mut Settings) {
        if let Some(v) = self.first {
            s.first_page = v;
        }
        if let Some(v) = self.last {
            s.last_page = v;
        }
        if let Some(v) = self.delay_ms {
            s.delay_ms = v;
        }
        if let Some(v) = self.detail_out {
            s.detail_path = v;
        }
        if let Some(v) = self.bom_out {
            s.bom_path = v;
        }
        if let Some(v) = self.quantity_scope {
            s.quantity_scope = v;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    info!(settings = ?settings, "Settings loaded");

    let result = match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            args.apply(&mut settings);
            run(&settings).await
        }
        Commands::Extract { file, page, quantity_scope } => {
            let html = std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let html = String::from_utf8_lossy(&html);
            let extractor = Extractor::new(quantity_scope.unwrap_or(settings.quantity_scope));
            let mentions = parser::process_page(page, &html, &extractor);
            for m in &mentions {
                println!("[{}] {}", m.kind, output::detail_line(m));
            }
            println!(
                "\n{} mentions, {} distinct components.",
                mentions.len(),
                bom::aggregate(&mentions).len()
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(settings: &Settings) -> anyhow::Result<()> {
    let pages = settings.page_count();
    let delay = Duration::from_millis(settings.delay_ms);

    println!("Manual Hardware Scraper");
    println!("{}", "=".repeat(60));
    println!("Source: {}", settings.base_url);
    println!("Total pages to process: {}", pages);
    println!(
        "Rate limit alone adds {}; expect several times that with fetches.",
        format_duration(rate_limit_estimate(delay, pages))
    );
    println!();

    let source = scraper::HttpSource::new(settings)?;
    let extractor = Extractor::new(settings.quantity_scope);
    let (mentions, stats) = scraper::scrape_pages(
        &source,
        &extractor,
        settings.first_page,
        settings.last_page,
        delay,
    )
    .await;

    println!("\nCompleted! Found {} component mentions", mentions.len());
    if stats.skipped > 0 {
        println!("{} of {} pages could not be fetched and were skipped.", stats.skipped, stats.total);
    }

    output::save_detail(&settings.detail_path, &mentions)?;
    let bom = bom::aggregate(&mentions);
    output::save_bom(&settings.bom_path, &bom)?;

    println!("\nOutput files created:");
    println!("  - {} (detailed)", settings.detail_path.display());
    println!("  - {} (aggregated BOM, {} components)", settings.bom_path.display(), bom.len());
    Ok(())
}

fn rate_limit_estimate(delay: Duration, pages: u32) -> Duration {
    delay.saturating_mul(pages)
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
