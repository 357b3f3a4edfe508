//! Command executor

use std::io::IsTerminal;

use serde::Serialize;
use tracing::info;

use crate::cli::{LogsArgs, RunArgs, SubCommand};
use crate::config::{ServeOptions, Volume};
use crate::container::{ContainerDetails, ContainerManager, ContainerSpec, RunOutcome, UpdateOutcome};
use crate::error::{OllamactlError, Result};
use crate::output::OutputFormat;
use crate::probe::{default_image, detect_runtime, resolve_gpu, GpuMode, GpuVendor, Host};
use crate::runtime::builder::LogOptions;
use crate::runtime::{CommandRunner, Runtime};

/// Execution context containing runtime configuration
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub dry_run: bool,
    pub output_format: OutputFormat,
    pub verbose: bool,
    /// Requested runtime binary, if any
    pub runtime: Option<String>,
    pub name: String,
    /// Image override
    pub image: Option<String>,
    pub gpu: GpuMode,
    /// Whether stdin and stdout are terminals (decides `exec -t`)
    pub interactive: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            dry_run: false,
            output_format: OutputFormat::Human,
            verbose: false,
            runtime: None,
            name: crate::config::DEFAULT_CONTAINER_NAME.to_string(),
            image: None,
            gpu: GpuMode::Auto,
            interactive: std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
        }
    }
}

/// Result of command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub data: ResultData,
}

#[derive(Debug, Clone)]
pub enum ResultData {
    /// Lifecycle operation summary
    Message(String),
    Status(StatusReport),
    /// A pass-through child finished; its output has already been shown
    Exited(Option<i32>),
}

impl ExecutionResult {
    fn message(text: impl Into<String>) -> Self {
        Self {
            data: ResultData::Message(text.into()),
        }
    }

    fn exited(code: Option<i32>) -> Self {
        Self {
            data: ResultData::Exited(code),
        }
    }

    /// Process exit code this result maps to
    pub fn exit_code(&self) -> i32 {
        match self.data {
            ResultData::Exited(Some(code)) => code,
            ResultData::Exited(None) => 1,
            _ => 0,
        }
    }
}

/// Everything `status` reports
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub runtime: Runtime,
    /// GPU the host offers (or the forced `--gpu` choice)
    pub host_gpu: GpuVendor,
    pub name: String,
    pub container: Option<ContainerDetails>,
    pub image_size: Option<u64>,
}

/// Execute a parsed subcommand against the host's container runtime
pub fn execute_command<R>(
    cmd: &SubCommand,
    ctx: &ExecutionContext,
    host: &Host,
    runner: &R,
) -> Result<ExecutionResult>
where
    R: CommandRunner + ?Sized,
{
    let runtime = detect_runtime(ctx.runtime.as_deref(), host, runner)?;
    let manager = ContainerManager::new(runtime, runner, &ctx.name)
        .with_dry_run(ctx.dry_run)
        .with_stdout_reserved(matches!(ctx.output_format, OutputFormat::Json));
    let name = manager.name().to_string();

    match cmd {
        SubCommand::Run(args) => {
            let spec = run_spec(args, ctx, host, runner)?;
            let outcome = manager.run(&spec, args.recreate)?;
            Ok(ExecutionResult::message(describe_run(&spec, &outcome)))
        }

        SubCommand::Stop => {
            manager.stop()?;
            Ok(ExecutionResult::message(format!(
                "Stopped and removed container '{}'",
                name
            )))
        }

        SubCommand::Restart => {
            manager.restart()?;
            Ok(ExecutionResult::message(format!("Restarted container '{}'", name)))
        }

        SubCommand::Pull => {
            let image = match &ctx.image {
                Some(image) => image.clone(),
                None => match manager.details()? {
                    Some(details) => details.image,
                    None => default_image(resolve_gpu(ctx.gpu, host, runner)).to_string(),
                },
            };
            manager.pull(&image)?;
            Ok(ExecutionResult::message(format!("Pulled {}", image)))
        }

        SubCommand::Update => {
            let fallback = default_image(resolve_gpu(ctx.gpu, host, runner));
            let message = match manager.update(ctx.image.as_deref(), fallback)? {
                UpdateOutcome::UpToDate => format!("Container '{}' is up to date", name),
                UpdateOutcome::Updated => {
                    format!("Container '{}' updated to the newly pulled image", name)
                }
                UpdateOutcome::PulledOnly => format!(
                    "Pulled {}; no container '{}' to update",
                    ctx.image.as_deref().unwrap_or(fallback),
                    name
                ),
            };
            Ok(ExecutionResult::message(message))
        }

        SubCommand::Recreate => {
            let spec = manager.recreate(ctx.image.as_deref())?;
            Ok(ExecutionResult::message(format!(
                "Recreated container '{}' ({}) on {}",
                name,
                spec.image,
                spec.url()
            )))
        }

        SubCommand::Logs(args) => {
            let prefix = format!("[{}] ", name);
            let prefix = if args.no_prefix { None } else { Some(prefix.as_str()) };
            let code = manager.logs(&log_options(args), prefix)?;
            Ok(ExecutionResult::exited(code))
        }

        SubCommand::Ollama { args } => {
            let mut command = vec!["ollama".to_string()];
            command.extend(args.iter().cloned());
            let code = manager.exec(ctx.interactive, &command)?;
            Ok(ExecutionResult::exited(code))
        }

        SubCommand::Shell { shell } => {
            let code = manager.exec(ctx.interactive, &[shell.clone()])?;
            Ok(ExecutionResult::exited(code))
        }

        SubCommand::Status => {
            let host_gpu = resolve_gpu(ctx.gpu, host, runner);
            let container = manager.details()?;
            let image_size = container
                .as_ref()
                .filter(|details| !details.image_id.is_empty())
                .and_then(|details| manager.inspect_image(&details.image_id).ok())
                .and_then(|image| image.size);
            Ok(ExecutionResult {
                data: ResultData::Status(StatusReport {
                    runtime: manager.runtime().clone(),
                    host_gpu,
                    name,
                    container,
                    image_size,
                }),
            })
        }
    }
}

/// Container spec from `run` flags, probing the GPU when asked to
fn run_spec<R>(args: &RunArgs, ctx: &ExecutionContext, host: &Host, runner: &R) -> Result<ContainerSpec>
where
    R: CommandRunner + ?Sized,
{
    let volume = Volume::parse(&args.volume, host.home.as_deref(), &host.cwd)?;
    let gpu = resolve_gpu(ctx.gpu, host, runner);
    if gpu != GpuVendor::None {
        info!(%gpu, "GPU enabled");
    }
    let image = ctx
        .image
        .clone()
        .unwrap_or_else(|| default_image(gpu).to_string());
    if image.trim().is_empty() {
        return Err(OllamactlError::Validation("image must not be empty".to_string()));
    }

    Ok(ContainerSpec {
        name: ctx.name.clone(),
        image,
        port: args.port,
        volume,
        serve: ServeOptions {
            debug: args.debug,
            flash_attention: args.flash_attention,
            keep_alive: args.keep_alive.clone(),
            max_loaded_models: args.max_loaded_models,
            num_parallel: args.num_parallel,
        },
        gpu,
    })
}

fn log_options(args: &LogsArgs) -> LogOptions {
    LogOptions {
        follow: args.follow,
        tail: args.tail.clone(),
        since: args.since.clone(),
        timestamps: args.timestamps,
    }
}

fn not_applied(ignored: &[&str]) -> String {
    if ignored.is_empty() {
        String::new()
    } else {
        format!(
            "\nRequested {} not applied; use --recreate to apply",
            ignored.join(", ")
        )
    }
}

fn describe_run(spec: &ContainerSpec, outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Created => format!(
            "Started container '{}' ({}) on {}",
            spec.name,
            spec.image,
            spec.url()
        ),
        RunOutcome::Recreated => format!(
            "Recreated container '{}' ({}) on {}",
            spec.name,
            spec.image,
            spec.url()
        ),
        RunOutcome::Started { ignored } => format!(
            "Started existing container '{}'{}",
            spec.name,
            not_applied(ignored)
        ),
        RunOutcome::AlreadyRunning { ignored } => format!(
            "Container '{}' is already running{}",
            spec.name,
            not_applied(ignored)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::{host_in, stub_binary};
    use crate::runtime::testing::{ok, ScriptedRunner};
    use clap::Parser;

    fn context() -> ExecutionContext {
        ExecutionContext {
            gpu: GpuMode::None,
            interactive: false,
            ..ExecutionContext::default()
        }
    }

    fn command(argv: &[&str]) -> SubCommand {
        crate::cli::Args::try_parse_from(std::iter::once("ollamactl").chain(argv.iter().copied()))
            .unwrap()
            .command
    }

    /// Docker with no containers
    fn empty_docker() -> ScriptedRunner {
        ScriptedRunner::new(|args| match args[0].as_str() {
            "--version" => ok("Docker version 27.3.1\n"),
            "ps" => ok(""),
            other => panic!("unexpected capture: {}", other),
        })
    }

    #[test]
    fn test_run_builds_full_command() {
        let dir = tempfile::tempdir().unwrap();
        stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let runner = empty_docker();

        let cmd = command(&["run", "--port", "8080", "--debug", "--volume", "./models"]);
        let result = execute_command(&cmd, &context(), &host, &runner).unwrap();

        assert_eq!(result.exit_code(), 0);
        let lines = runner.forwarded_lines();
        assert_eq!(lines.len(), 1);
        let expected_mount = format!("-v {}/models:/root/.ollama", dir.path().display());
        assert!(lines[0].contains("-p 8080:11434"), "{}", lines[0]);
        assert!(lines[0].contains(&expected_mount), "{}", lines[0]);
        assert!(lines[0].contains("-e OLLAMA_DEBUG=1"));
        assert!(dir.path().join("models").is_dir());
        match result.data {
            ResultData::Message(msg) => assert!(msg.contains("http://localhost:8080")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_run_with_amd_uses_rocm_image() {
        let dir = tempfile::tempdir().unwrap();
        stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let runner = empty_docker();
        let ctx = ExecutionContext {
            gpu: GpuMode::Amd,
            ..context()
        };

        execute_command(&command(&["run"]), &ctx, &host, &runner).unwrap();
        let line = &runner.forwarded_lines()[0];
        assert!(line.contains("--device /dev/kfd --device /dev/dri"));
        assert!(line.ends_with(crate::config::ROCM_IMAGE));
    }

    #[test]
    fn test_stop_without_container_fails() {
        let dir = tempfile::tempdir().unwrap();
        stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let err = execute_command(&command(&["stop"]), &context(), &host, &empty_docker()).unwrap_err();
        assert_eq!(err.to_string(), "Container 'ollama' does not exist. Start it with `ollamactl run`");
    }

    #[test]
    fn test_missing_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        let err = execute_command(&command(&["status"]), &context(), &host, &empty_docker()).unwrap_err();
        assert!(matches!(err, OllamactlError::RuntimeNotFound));
    }

    #[test]
    fn test_status_without_container() {
        let dir = tempfile::tempdir().unwrap();
        let docker = stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let result = execute_command(&command(&["status"]), &context(), &host, &empty_docker()).unwrap();
        match result.data {
            ResultData::Status(report) => {
                assert_eq!(report.runtime.program, docker);
                assert!(report.container.is_none());
                assert_eq!(report.host_gpu, GpuVendor::None);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_pull_defaults_image() {
        let dir = tempfile::tempdir().unwrap();
        stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let runner = empty_docker();
        execute_command(&command(&["pull"]), &context(), &host, &runner).unwrap();
        assert_eq!(
            runner.forwarded_lines(),
            vec![format!("pull {}", crate::config::DEFAULT_IMAGE)]
        );
    }

    #[test]
    fn test_status_sizes_the_running_image() {
        let dir = tempfile::tempdir().unwrap();
        stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let runner = ScriptedRunner::new(|args| match args[0].as_str() {
            "--version" => ok("Docker version 27.3.1\n"),
            "ps" => ok("ollama\n"),
            "container" => ok(r#"[{"Id":"abc","Name":"/ollama","Image":"sha256:1111",
                "State":{"Status":"running","Running":true},
                "Config":{"Image":"docker.io/ollama/ollama:latest"}}]"#),
            "image" => ok(r#"[{"Id":"sha256:1111","Size":2048}]"#),
            other => panic!("unexpected capture: {}", other),
        });

        let result = execute_command(&command(&["status"]), &context(), &host, &runner).unwrap();
        assert!(runner
            .captured
            .borrow()
            .iter()
            .any(|args| args.join(" ") == "image inspect sha256:1111"));
        match result.data {
            ResultData::Status(report) => assert_eq!(report.image_size, Some(2048)),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_json_output_keeps_runtime_output_off_stdout() {
        let dir = tempfile::tempdir().unwrap();
        stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        let runner = empty_docker();
        let ctx = ExecutionContext {
            output_format: OutputFormat::Json,
            ..context()
        };

        execute_command(&command(&["run"]), &ctx, &host, &runner).unwrap();
        assert_eq!(*runner.to_stderr.borrow(), vec![0]);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExecutionResult::exited(Some(3)).exit_code(), 3);
        assert_eq!(ExecutionResult::exited(None).exit_code(), 1);
        assert_eq!(ExecutionResult::message("ok").exit_code(), 0);
    }
}
