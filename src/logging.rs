use std::io;

use tracing::{Level, Metadata};
use tracing_appender::rolling;
use tracing_subscriber::{filter::FilterFn, fmt, prelude::*, EnvFilter, Registry};

use crate::environment::get_env_string;

/// Console directives when `RUST_LOG` is unset.
const CONSOLE_DIRECTIVES: &str =
    "info,llm_request=info,web_request=warn,clustering=info,article-embeddings=warn";

/// The log file always records pipeline and model traffic in detail.
const FILE_DIRECTIVES: &str = "info,llm_request=debug,pipeline=debug,clustering=debug,event=debug";

const LOG_FILE: &str = "newsline.log";

/// Installs the global subscriber: a console layer honoring `RUST_LOG` and a
/// daily rolling file under `LOG_DIR` (default `logs`).
pub fn configure_logging() {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(CONSOLE_DIRECTIVES));
    let console = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(console_filter)
        .with_filter(FilterFn::new(|metadata| !is_markup_noise(metadata)));

    let log_dir = get_env_string("LOG_DIR", "logs");
    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(rolling::daily(log_dir, LOG_FILE))
        .with_filter(EnvFilter::new(FILE_DIRECTIVES));

    Registry::default().with(console).with(file).init();
}

/// html5ever warns about every malformed page readability parses.
fn is_markup_noise(metadata: &Metadata<'_>) -> bool {
    *metadata.level() == Level::WARN && metadata.target().starts_with("html5ever")
}
