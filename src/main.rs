use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use structopt::StructOpt;

use catfreq::{Category, Config, Outcome, Pipeline, Report, Source};

/// Number of words printed to the terminal.
const DISPLAY_TOP: usize = 20;

#[allow(missing_docs)]
#[derive(Debug, StructOpt)]
#[structopt(
    name = "catfreq",
    about = "Word frequencies of the articles in a Wikipedia category."
)]
#[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
struct App {
    #[structopt(name = "category", help = "The category, with or without `Category:` prefix.")]
    category: String,
    #[structopt(long = "force-refresh", help = "Ignore and overwrite cached results.")]
    force_refresh: bool,
    #[structopt(long = "clear-cache", help = "Delete cached results of the category first.")]
    clear_cache: bool,
    #[structopt(
        long = "cache-dir",
        help = "Directory for cached results.",
        parse(from_os_str)
    )]
    cache_dir: Option<PathBuf>,
    #[structopt(long = "max-pages", help = "Max. number of articles to analyze.")]
    max_pages: Option<usize>,
    #[structopt(long = "top", help = "Number of words in the report.")]
    top: Option<usize>,
    #[structopt(
        long = "output",
        short = "o",
        help = "Directory to write the report to.",
        parse(from_os_str)
    )]
    output: Option<PathBuf>,
}

impl App {
    fn as_config(&self) -> Config {
        let mut config = Config::builder();
        if let Some(cache_dir) = self.cache_dir.clone() {
            config = config.cache_dir(cache_dir);
        }
        if let Some(max_pages) = self.max_pages {
            config = config.max_pages(max_pages);
        }
        if let Some(top) = self.top {
            config = config.top_n(top);
        }
        config.build()
    }

    async fn run(self) -> anyhow::Result<()> {
        let category = Category::new(&self.category)?;
        let pipeline = Pipeline::new(self.as_config())?;

        if self.clear_cache {
            log::info!("Clearing cache of {:?}", category.name());
            pipeline.store().clear(&category);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing pending requests...");
                flag.store(true, Ordering::SeqCst);
            }
        });

        let analysis = match pipeline
            .run_until(&category, self.force_refresh, Some(cancel))
            .await
        {
            Outcome::Frequencies(analysis) => analysis,
            Outcome::NoPages => {
                println!("No pages found in category: {}", category);
                return Ok(());
            }
            Outcome::NoContent => {
                println!("No content extracted for category: {}", category);
                return Ok(());
            }
        };

        if analysis.source == Source::Partial {
            println!("Interrupted, these results are partial and were not cached.");
        }
        println!(
            "Top {} words in {} ({}):",
            DISPLAY_TOP, category, analysis.source
        );
        for (idx, (word, count)) in analysis.top(DISPLAY_TOP).into_iter().enumerate() {
            println!("{:>3}. {}: {}", idx + 1, word, count);
        }

        let out = self.output.unwrap_or_else(|| PathBuf::from("."));
        let path = Report::new(&analysis, pipeline.config().top_n())
            .write_to(out)
            .await?;
        println!("Results saved to {}", path.display());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    Ok(App::from_args().run().await?)
}
