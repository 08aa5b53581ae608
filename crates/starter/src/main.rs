use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use starter::templates;
use starter::RunOptions;
use starter_crawler::{CrawlerConfig, OnError};
use tokio::runtime;

/// Crawler starter templates
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    /// Plain HTTP crawler, handlers get the raw body
    #[command(name = "http")]
    Http(TemplateArgs),
    /// HTML crawler with CSS selector extraction
    #[command(name = "html")]
    Html(TemplateArgs),
    /// Headless browser crawler with resource blocking
    #[cfg(feature = "browser")]
    #[command(name = "browser")]
    Browser(BrowserArgs),
    #[command(hide = true)]
    Completion,
}

#[derive(Debug, clap::Args)]
pub struct TemplateArgs {
    /// Optional crawler yaml configuration file, replaces the template defaults
    #[arg(env = "STARTER_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override crawler's maximum in-flight requests
    #[arg(long)]
    pub max_concurrency: Option<usize>,
    /// Override crawler's maximum number of handled requests
    #[arg(long)]
    pub max_requests_per_crawl: Option<usize>,
    /// Limit how many requests start per minute
    #[arg(long)]
    pub max_requests_per_minute: Option<usize>,
    /// Override crawler's request handler timeout
    #[arg(long)]
    pub request_handler_timeout_secs: Option<u64>,
    /// Override crawler's page load timeout
    #[arg(long)]
    pub navigation_timeout_secs: Option<u64>,
    /// Override crawler's number of retries per request
    #[arg(long)]
    pub max_request_retries: Option<usize>,
    /// Skip pages disallowed by robots.txt
    #[arg(long)]
    pub respect_robots_txt: bool,
    /// Override crawler's handler error strategy
    #[arg(value_enum, long)]
    pub on_handler_error: Option<OnError>,
    /// No SIGINT handling, the dataset is still flushed on exit
    #[arg(long)]
    pub no_sigint: bool,
    /// Start URL replacing the template's seeds, can be repeated
    #[arg(long = "url")]
    pub urls: Vec<String>,
    /// Route the start URLs to this handler
    #[arg(long, requires = "urls")]
    pub label: Option<String>,
    /// Named request queue
    #[arg(long)]
    pub queue_name: Option<String>,
    /// Named dataset
    #[arg(long)]
    pub dataset_name: Option<String>,
    /// Where datasets are written
    #[arg(env = "STORAGE_DIR", long)]
    pub storage_dir: Option<PathBuf>,
    /// Append to the dataset instead of purging it
    #[arg(long)]
    pub keep_storage: bool,
    /// Also write the dataset as csv to this path
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TemplateArgs {
    fn crawler_config(&self, template: CrawlerConfig) -> anyhow::Result<CrawlerConfig> {
        let mut conf = if let Some(file) = self.crawler_config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            template
        };
        if let Some(user_agent) = &self.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(max_concurrency) = self.max_concurrency {
            conf.max_concurrency = max_concurrency;
        }
        if let Some(max_requests_per_crawl) = self.max_requests_per_crawl {
            conf.max_requests_per_crawl = Some(max_requests_per_crawl);
        }
        if let Some(max_requests_per_minute) = self.max_requests_per_minute {
            conf.max_requests_per_minute = Some(max_requests_per_minute);
        }
        if let Some(secs) = self.request_handler_timeout_secs {
            conf.request_handler_timeout_secs = secs;
        }
        if let Some(secs) = self.navigation_timeout_secs {
            conf.navigation_timeout_secs = secs;
        }
        if let Some(max_request_retries) = self.max_request_retries {
            conf.max_request_retries = max_request_retries;
        }
        if self.respect_robots_txt {
            conf.respect_robots_txt = true;
        }
        if let Some(on_handler_error) = self.on_handler_error {
            conf.on_handler_error = on_handler_error;
        }
        if self.no_sigint {
            conf.handle_sigint = false;
        }
        Ok(conf)
    }

    fn run_options(&self, template: CrawlerConfig) -> anyhow::Result<RunOptions> {
        let mut opts = RunOptions::new(self.crawler_config(template)?);
        opts.queue_name = self.queue_name.clone();
        opts.dataset_name = self.dataset_name.clone();
        if let Some(dir) = &self.storage_dir {
            opts.dataset.storage_dir = dir.clone();
        }
        opts.dataset.purge_on_start = !self.keep_storage;
        opts.urls = self.urls.clone();
        opts.label = self.label.clone();
        opts.export_csv = self.export_csv.clone();
        Ok(opts)
    }
}

#[cfg(feature = "browser")]
#[derive(Debug, clap::Args)]
pub struct BrowserArgs {
    #[command(flatten)]
    pub template: TemplateArgs,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

fn init_logger(quiet: bool) {
    if !quiet {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("starter=info,starter_crawler=info"),
        )
        .init();
    }
}

fn main() -> anyhow::Result<()> {
    // A missing .env is fine, the variables may come from the shell.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    let rt = || runtime::Builder::new_multi_thread().enable_all().build();

    match args.cmd {
        SubCommand::Http(args) => {
            init_logger(args.quiet);
            log_dotenv(&dotenv);
            let opts = args.run_options(templates::http::crawler_config())?;
            rt()?.block_on(templates::http::run(opts))?;
            Ok(())
        }
        SubCommand::Html(args) => {
            init_logger(args.quiet);
            log_dotenv(&dotenv);
            let opts = args.run_options(templates::html::crawler_config())?;
            rt()?.block_on(templates::html::run(opts))?;
            Ok(())
        }
        #[cfg(feature = "browser")]
        SubCommand::Browser(args) => {
            init_logger(args.template.quiet);
            log_dotenv(&dotenv);
            let opts = args
                .template
                .run_options(templates::browser::crawler_config())?;
            let headless = templates::browser::HEADLESS && !args.headful;
            rt()?.block_on(templates::browser::run(opts, headless))?;
            Ok(())
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "starter", &mut io::stdout());
            Ok(())
        }
    }
}

fn log_dotenv(dotenv: &dotenvy::Result<PathBuf>) {
    match dotenv {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => (),
        Err(e) => log::warn!("Couldn't load .env got: {e}"),
    }
}
