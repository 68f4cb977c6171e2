mod cli;
mod commands;
mod config;
mod error;
mod server;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};
use clap::{CommandFactory, Parser};
use std::process;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    // A reset must work even when the named file is missing or broken.
    let mut config = if matches!(args.command, Commands::Config { reset: true, .. }) {
        AppConfig::default()
    } else {
        AppConfig::load(args.config.as_deref())?
    };
    if let Some(proxy) = args.proxy {
        config.filter.fetch.proxy = Some(proxy);
    }

    let executor = CommandExecutor::new(config.filter.clone());

    match args.command {
        Commands::Filter {
            input,
            base_url,
            output,
        } => {
            executor
                .filter(&input, base_url.as_deref(), output.as_deref())
                .await?;
        }

        Commands::Analyze {
            input,
            base_url,
            format,
        } => {
            executor.analyze(&input, base_url.as_deref(), format).await?;
        }

        Commands::Serve { bind, port } => {
            let mut server = config.server.with_env_overrides();
            if let Some(bind) = bind {
                server.bind_address = bind;
            }
            if let Some(port) = port {
                server.port = port;
            }
            executor.serve(server).await?;
        }

        Commands::Config { show, reset } => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults ({})", path.display());
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // Playlists go to stdout, so logs stay on stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}
