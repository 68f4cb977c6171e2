use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "adfilter",
    about = "Detect and strip ad breaks from HLS playlists",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "ADFILTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Proxy used for upstream playlist requests (http, https or socks5)
    #[arg(long, global = true, env = "ADFILTER_PROXY")]
    pub proxy: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove ad groups from a playlist and print the result
    Filter {
        /// Playlist file, `-` for stdin, or an http(s) URL
        input: String,

        /// URL the playlist was served from, used to resolve relative segment URIs
        #[arg(short, long)]
        base_url: Option<String>,

        /// Write the playlist here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print how each discontinuity group of a playlist is scored
    Analyze {
        /// Playlist file, `-` for stdin, or an http(s) URL
        input: String,

        #[arg(short, long)]
        base_url: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Run a local proxy that serves filtered playlists
    Serve {
        /// Address to bind (overrides config and ADFILTER_BIND_ADDRESS)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides config and ADFILTER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show or reset the configuration file
    Config {
        #[arg(long)]
        show: bool,

        #[arg(long, conflicts_with = "show")]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}
