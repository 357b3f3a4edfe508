//! CLI argument parsing

use clap::builder::FalseyValueParser;
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::config::{
    parse_container_name, parse_keep_alive, parse_positive, DEFAULT_CONTAINER_NAME, DEFAULT_PORT,
    DEFAULT_SHELL, DEFAULT_VOLUME,
};
use crate::probe::GpuMode;

#[derive(Parser, Debug)]
#[command(name = "ollamactl")]
#[command(author, version, about = "Run and manage an Ollama container on Docker or Podman", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Verbose output (runtime commands are logged)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    pub no_color: bool,

    /// Print runtime commands that would change state instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Output format as JSON (status)
    #[arg(long, global = true)]
    pub json: bool,

    /// Container runtime binary: a name on PATH or a path (default: docker, then podman)
    #[arg(long, global = true, env = "OLLAMACTL_RUNTIME", value_name = "BIN")]
    pub runtime: Option<String>,

    /// Name of the managed container
    #[arg(
        long,
        global = true,
        env = "OLLAMACTL_CONTAINER",
        default_value = DEFAULT_CONTAINER_NAME,
        value_parser = parse_container_name
    )]
    pub name: String,

    /// Image reference (default: ollama/ollama, :rocm tag on AMD GPUs)
    #[arg(long, global = true, env = "OLLAMACTL_IMAGE", value_name = "IMAGE")]
    pub image: Option<String>,

    /// GPU to hand to the container
    #[arg(long, global = true, value_enum, env = "OLLAMACTL_GPU", default_value_t = GpuMode::Auto)]
    pub gpu: GpuMode,
}

#[derive(Subcommand, Debug)]
pub enum SubCommand {
    /// Create and start the container (starts an existing one)
    Run(RunArgs),

    /// Stop and remove the container
    Stop,

    /// Restart the container
    Restart,

    /// Pull the image
    Pull,

    /// Pull the image and recreate the container if it changed
    Update,

    /// Recreate the container with its current settings
    Recreate,

    /// Show container logs
    Logs(LogsArgs),

    /// Run the ollama CLI inside the container
    #[command(name = "ollama")]
    Ollama {
        /// Arguments passed to ollama (e.g. `run llama3.2`)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Open a shell inside the container
    Shell {
        /// Shell to run
        #[arg(long, default_value = DEFAULT_SHELL)]
        shell: String,
    },

    /// Show runtime, GPU and container status
    Status,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Host port for the API
    #[arg(
        short,
        long,
        env = "OLLAMACTL_PORT",
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Named volume or host directory for models (paths contain '/' or start with '.' or '~')
    #[arg(short, long, env = "OLLAMACTL_VOLUME", default_value = DEFAULT_VOLUME)]
    pub volume: String,

    /// Enable daemon debug logging (OLLAMA_DEBUG)
    #[arg(long, env = "OLLAMA_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Enable flash attention (OLLAMA_FLASH_ATTENTION)
    #[arg(long, env = "OLLAMA_FLASH_ATTENTION", value_parser = FalseyValueParser::new())]
    pub flash_attention: bool,

    /// How long models stay loaded, e.g. 5m, 1h or -1 (OLLAMA_KEEP_ALIVE)
    #[arg(long, env = "OLLAMA_KEEP_ALIVE", value_name = "DURATION", value_parser = parse_keep_alive)]
    pub keep_alive: Option<String>,

    /// Maximum models loaded at once (OLLAMA_MAX_LOADED_MODELS)
    #[arg(long, env = "OLLAMA_MAX_LOADED_MODELS", value_name = "N", value_parser = parse_positive)]
    pub max_loaded_models: Option<u32>,

    /// Parallel requests per model (OLLAMA_NUM_PARALLEL)
    #[arg(long, env = "OLLAMA_NUM_PARALLEL", value_name = "N", value_parser = parse_positive)]
    pub num_parallel: Option<u32>,

    /// Remove and recreate an existing container so new settings apply
    #[arg(long, alias = "force-recreate")]
    pub recreate: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LogsArgs {
    /// Follow log output
    #[arg(short, long)]
    pub follow: bool,

    /// Number of lines from the end ("all" for everything)
    #[arg(short = 'n', long, value_name = "N", value_parser = parse_tail)]
    pub tail: Option<String>,

    /// Only logs since a timestamp or relative time (e.g. 10m)
    #[arg(long, value_name = "TIME")]
    pub since: Option<String>,

    /// Show timestamps
    #[arg(short, long)]
    pub timestamps: bool,

    /// Do not prefix lines with the container name
    #[arg(long)]
    pub no_prefix: bool,
}

fn parse_tail(raw: &str) -> Result<String, String> {
    if raw == "all" || raw.parse::<u64>().is_ok() {
        Ok(raw.to_string())
    } else {
        Err(format!("'{}' is not a line count or \"all\"", raw))
    }
}
