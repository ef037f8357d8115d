pub mod config;
pub mod crawl;
pub mod map;
pub mod report;

pub use config::{ApiConfig, ConfigError};
pub use crawl::{CrawlError, CrawlOutcome, CrawlSummary, Crawler};
pub use map::{MapError, ResourceGraph};
pub use report::{GraphSink, ReportFormat, WriterSink};

const BANNER: &str = r#"
              __
   ________  / /___ ___  ____ _____
  / ___/ _ \/ / __ `__ \/ __ `/ __ \
 / /  /  __/ / / / / / / /_/ / /_/ /
/_/   \___/_/_/ /_/ /_/\__,_/ .___/
                           /_/
"#;

/// The banner goes to stderr, like every other status line, so stdout only
/// ever carries the report.
pub fn print_banner() {
    eprintln!("{}", BANNER);
    eprintln!(
        "  relmap v{} - hypermedia API resource mapper\n",
        env!("CARGO_PKG_VERSION")
    );
}
