//! External command execution utilities.
//!
//! Provides a builder-based API for running external compilers with stdin
//! piping, plus a file-based invocation path for tools that only accept a
//! file argument and write a sibling output file.
//!
//! # Examples
//!
//! ```ignore
//! use crate::exec::Cmd;
//!
//! // Pipe a buffer through a compiler
//! let run = Cmd::from_slice(&["uglifyjs", "-"])
//!     .cwd(root)
//!     .stdin(combined)
//!     .run()?;
//! ```

use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    stdin_data: Option<Vec<u8>>,
}

/// Captured result of an external invocation.
///
/// The exit status is carried but deliberately not turned into an error:
/// the pipeline's policy is best effort - stdout is the compiled result,
/// stderr a diagnostic for the log.
pub struct Invocation {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub success: bool,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["node", "lessc", "-"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs
                .push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Execute the command, draining stdout and stderr to completion.
    ///
    /// Fails only on spawn/pipe errors; a nonzero exit status is reported
    /// through `Invocation::success`.
    pub fn run(self) -> Result<Invocation> {
        let name = self.program_name();
        if self.program.is_empty() {
            bail!("empty command");
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        // Feed stdin from its own thread; writing inline would deadlock as
        // soon as the child fills its stdout pipe while input is still
        // pending. The stream is dropped on completion so the child sees EOF.
        let writer = if let Some(data) = self.stdin_data
            && let Some(mut stdin) = child.stdin.take()
        {
            Some(std::thread::spawn(move || stdin.write_all(&data)))
        } else {
            None
        };

        // wait_with_output drains both streams fully before reaping the
        // child; stopping early would deadlock the pipe.
        let output: Output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))?;

        // A child that exits without consuming its input breaks the pipe;
        // under the best-effort policy that is a diagnostic, not a failure.
        if let Some(writer) = writer
            && !matches!(writer.join(), Ok(Ok(())))
        {
            crate::debug!("exec"; "`{name}` closed stdin before input was fully written");
        }

        Ok(Invocation {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            stdout: output.stdout,
        })
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

// ============================================================================
// File-based invocation
// ============================================================================

/// Invoke a tool that requires file input and writes a sibling output file.
///
/// The input buffer is materialized to a uniquely named temp file with
/// `ext`; `$FILE` in the argv is replaced with its path (appended when the
/// argv never mentions it). The expected output is the same path with
/// `output_ext`. Both files are removed before returning. If the expected
/// output never appears, the tool's own stdout/stderr is returned as a
/// best-effort payload.
pub fn invoke_file_based(
    argv: &[String],
    input: &[u8],
    ext: &str,
    output_ext: &str,
    envs: &[(String, String)],
    cwd: &Path,
) -> Result<Vec<u8>> {
    let mut tmp = tempfile::Builder::new()
        .prefix("sitetools-")
        .suffix(&format!(".{ext}"))
        .tempfile()
        .context("Failed to create temp input file")?;
    tmp.write_all(input)
        .context("Failed to write temp input file")?;
    tmp.flush().ok();

    let input_path = tmp.path().to_path_buf();
    let input_str = input_path.display().to_string();

    let mut args: Vec<String> = argv
        .iter()
        .map(|a| a.replace("$FILE", &input_str))
        .collect();
    if !argv.iter().any(|a| a.contains("$FILE")) {
        args.push(input_str.clone());
    }

    let run = Cmd::from_slice(&args)
        .cwd(cwd)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .run()?;

    let expected = input_path.with_extension(output_ext);
    let result = if expected.is_file() {
        let bytes = std::fs::read(&expected)
            .with_context(|| format!("Failed to read {}", expected.display()))?;
        std::fs::remove_file(&expected).ok();
        bytes
    } else {
        // Best effort: hand back whatever the tool printed.
        if run.stdout.is_empty() {
            run.stderr.clone().into_bytes()
        } else {
            run.stdout
        }
    };

    if !run.stderr.trim().is_empty() {
        crate::log!("warn"; "{}: {}", args[0], run.stderr.trim());
    }

    Ok(result)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo").arg("hello").arg("world").cwd("/tmp");
        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").arg("a");
        assert_eq!(cmd.args.len(), 1);
    }

    #[test]
    fn test_stdin_pipe() {
        let run = Cmd::new("cat").stdin(b"test data").run().unwrap();
        assert!(run.success);
        assert_eq!(run.stdout, b"test data");
    }

    #[test]
    fn test_large_stdin_round_trip() {
        // Larger than the stdin+stdout pipe capacity; a streaming child
        // echoes while input is still being written.
        let data = vec![b'x'; 1 << 20];
        let run = Cmd::new("cat").stdin(&data).run().unwrap();
        assert!(run.success);
        assert_eq!(run.stdout, data);
    }

    #[test]
    fn test_child_ignoring_stdin_does_not_fail() {
        let run = Cmd::from_slice(&["sh", "-c", "echo done"])
            .stdin(vec![b'x'; 1 << 20])
            .run()
            .unwrap();
        assert!(run.success);
        assert_eq!(run.stdout, b"done\n");
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let run = Cmd::from_slice(&["sh", "-c", "echo out; echo diag >&2; exit 3"])
            .run()
            .unwrap();
        assert!(!run.success);
        assert_eq!(run.stdout, b"out\n");
        assert_eq!(run.stderr.trim(), "diag");
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        assert!(Cmd::new("sitetools-no-such-binary").run().is_err());
    }

    #[test]
    fn test_file_based_invocation() {
        // "Compiler" that writes an uppercased sibling .out file.
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"tr '[:lower:]' '[:upper:]' < "$0" > "${0%.in}.out""#.to_string(),
            "$FILE".to_string(),
        ];
        let out = invoke_file_based(&argv, b"abc", "in", "out", &[], Path::new(".")).unwrap();
        assert_eq!(out, b"ABC");
    }

    #[test]
    fn test_file_based_missing_output_returns_tool_output() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "echo oops".to_string()];
        let out = invoke_file_based(&argv, b"abc", "in", "out", &[], Path::new(".")).unwrap();
        assert_eq!(out, b"oops\n");
    }
}
