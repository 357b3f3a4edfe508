//! Pass-through execution of runtime commands

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::thread;

use tracing::debug;

use crate::error::Result;

/// A program plus its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Output of a command run to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the lifecycle logic and real processes
pub trait CommandRunner {
    /// Run to completion with stdout and stderr captured
    fn capture(&self, invocation: &Invocation) -> Result<CapturedOutput>;

    /// Run with output going to this process's stdout and stderr.
    ///
    /// With a prefix, every output line is written as `prefix + line`.
    /// Returns the child's exit code.
    fn forward(&self, invocation: &Invocation, prefix: Option<&str>) -> Result<Option<i32>>;

    /// Like an unprefixed [`forward`](CommandRunner::forward), but the
    /// child's stdout goes to this process's stderr. Keeps stdout free for
    /// machine-readable output.
    fn forward_to_stderr(&self, invocation: &Invocation) -> Result<Option<i32>> {
        self.forward(invocation, None)
    }
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn capture(&self, invocation: &Invocation) -> Result<CapturedOutput> {
        debug!(command = %invocation, "capture");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()?;

        Ok(CapturedOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn forward(&self, invocation: &Invocation, prefix: Option<&str>) -> Result<Option<i32>> {
        debug!(command = %invocation, prefixed = prefix.is_some(), "forward");
        leave_interrupts_to_child();

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);

        let Some(prefix) = prefix else {
            let status = command.status()?;
            return Ok(status.code());
        };

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let code = pump_prefixed(&mut child, prefix, io::stdout().lock(), io::stderr())?;
        Ok(code)
    }

    fn forward_to_stderr(&self, invocation: &Invocation) -> Result<Option<i32>> {
        debug!(command = %invocation, "forward to stderr");
        leave_interrupts_to_child();

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdout(Stdio::from(io::stderr()))
            .status()?;
        Ok(status.code())
    }
}

/// Copy a spawned child's piped output to `out` and `err` with every line
/// prefixed, then reap it.
///
/// When `out` goes away (e.g. piped into `head`) the child is killed at once
/// and the run counts as a clean exit. The stderr copier is not joined in that
/// case: a grandchild may still hold the pipe open.
fn pump_prefixed<O, E>(child: &mut Child, prefix: &str, out: O, err: E) -> io::Result<Option<i32>>
where
    O: Write,
    E: Write + Send + 'static,
{
    let errors = child.stderr.take().map(|pipe| {
        let prefix = prefix.to_string();
        thread::spawn(move || copy_prefixed(pipe, err, &prefix))
    });

    let copied = match child.stdout.take() {
        Some(pipe) => copy_prefixed(pipe, out, prefix),
        None => Ok(()),
    };

    if let Err(e) = copied {
        let _ = child.kill();
        let _ = child.wait();
        if e.kind() == io::ErrorKind::BrokenPipe {
            debug!("output closed, child stopped");
            return Ok(Some(0));
        }
        return Err(e);
    }

    if let Some(errors) = errors {
        let forwarded = errors
            .join()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "stderr forwarder panicked")));
        if let Err(e) = forwarded {
            if e.kind() != io::ErrorKind::BrokenPipe {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
    }

    Ok(child.wait()?.code())
}

/// Copy `reader` to `writer` line by line, prefixing each line
pub fn copy_prefixed<R: Read, W: Write>(reader: R, mut writer: W, prefix: &str) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        // One write per line keeps lines whole on a shared stderr
        let mut prefixed = Vec::with_capacity(prefix.len() + line.len() + 1);
        prefixed.extend_from_slice(prefix.as_bytes());
        prefixed.extend_from_slice(&line);
        if !line.ends_with(b"\n") {
            prefixed.push(b'\n');
        }
        writer.write_all(&prefixed)?;
        writer.flush()?;
    }
    Ok(())
}

/// Ctrl-C reaches the whole foreground group; let the child handle it and
/// report its status instead of dying first.
fn leave_interrupts_to_child() {
    static HANDLER: Once = Once::new();
    HANDLER.call_once(|| {
        if let Err(e) = ctrlc::set_handler(|| debug!("interrupt received, waiting for child")) {
            debug!(error = %e, "could not install interrupt handler");
        }
    });
}
