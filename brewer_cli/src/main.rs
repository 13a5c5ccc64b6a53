mod brew;
mod cli;
mod error_fmt;
mod link;
mod serve;

use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = brewer_config::load_file(&cli.config)
        .wrap_err_with(|| format!("invalid configuration {}", cli.config.display()))?;
    init_tracing(cli.log_level.as_deref(), cli.json, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), sim = cli.sim, "configuration loaded");

    let link = link::open(&cfg, cli.sim)?;
    match cli.cmd {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            serve::run_server(&cfg, link, &bind)
        }
        Commands::Brew { order } => brew::run_brew(&cfg, link, &order, cli.json),
        Commands::SelfCheck => brew::self_check(&cfg, link, cli.json),
    }
}

/// Console logs go to stderr so stdout stays machine-readable. With
/// `[logging].file` set, a JSON copy is written through a non-blocking
/// appender whose guard lives in `FILE_GUARD`.
fn init_tracing(
    cli_level: Option<&str>,
    json: bool,
    logging: &brewer_config::Logging,
) -> Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_text = (!json).then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}

/// Controller wired to `writer` with the config's settings, vocabulary and
/// storage directory.
pub(crate) fn controller_for(
    cfg: &brewer_config::Config,
    writer: Box<dyn brewer_traits::LineWriter + Send>,
) -> brewer_core::OrderController {
    brewer_core::OrderController::builder()
        .apply_config(cfg)
        .with_writer(writer)
        .build()
}
