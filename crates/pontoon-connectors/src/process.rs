//! Shared subprocess streaming plumbing
//!
//! Both database families drive their native dump/restore tools as
//! child processes and stream through stdio. The source side reads the
//! tool's stdout; a clean exit distinguishes end-of-stream from a tool
//! that died mid-dump. stderr is drained concurrently so a chatty tool
//! can never block on a full pipe, and its tail is kept for error
//! reports.

use std::collections::VecDeque;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use pontoon_core::{Error, Result};

/// Lines of stderr kept for error messages.
const STDERR_TAIL_LINES: usize = 8;

/// A fully specified child process invocation.
#[derive(Debug, Clone)]
pub(crate) struct CommandSpec {
    pub program: &'static str,
    pub args: Vec<String>,
    pub env: Vec<(&'static str, String)>,
}

impl CommandSpec {
    fn build(&self) -> Command {
        let mut command = Command::new(self.program);
        command.args(&self.args);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command.kill_on_drop(true);
        command
    }
}

fn drain_stderr(stderr: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        while let Ok(Some(line)) = lines.next_line().await {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail.into_iter().collect::<Vec<_>>().join("\n")
    })
}

async fn stderr_tail(task: Option<JoinHandle<String>>) -> String {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Streams a dump tool's stdout as the source byte sequence.
pub(crate) struct SubprocessSource {
    endpoint: String,
    spec: CommandSpec,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    finished: bool,
}

impl SubprocessSource {
    pub(crate) fn new(endpoint: String, spec: CommandSpec) -> Self {
        Self {
            endpoint,
            spec,
            child: None,
            stdout: None,
            stderr_task: None,
            finished: false,
        }
    }

    pub(crate) async fn open(&mut self) -> Result<()> {
        debug!("Spawning {} for {}", self.spec.program, self.endpoint);

        let mut child = self
            .spec
            .build()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::connection(
                    &self.endpoint,
                    format!("failed to spawn {}: {e}", self.spec.program),
                )
            })?;

        self.stdout = child.stdout.take();
        self.stderr_task = child.stderr.take().map(drain_stderr);
        self.child = Some(child);
        Ok(())
    }

    pub(crate) async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| Error::stream_interrupted("source stream is not open"))?;

        match stdout.read(buf).await {
            Ok(0) => {
                // The pipe closed; only the exit status tells a finished
                // dump apart from a tool that died mid-stream.
                self.finished = true;
                let status = match self.child.as_mut() {
                    Some(child) => child.wait().await.map_err(|e| {
                        Error::stream_interrupted(format!(
                            "waiting for {} failed: {e}",
                            self.spec.program
                        ))
                    })?,
                    None => return Err(Error::stream_interrupted("source process vanished")),
                };

                if status.success() {
                    Ok(0)
                } else {
                    let tail = stderr_tail(self.stderr_task.take()).await;
                    Err(Error::stream_interrupted(format!(
                        "{} exited with {status}: {tail}",
                        self.spec.program
                    )))
                }
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.finished = true;
                Err(Error::stream_interrupted(format!(
                    "reading from {} failed: {e}",
                    self.spec.program
                )))
            }
        }
    }

    pub(crate) async fn close(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            if !self.finished {
                // Abandoning the remainder of the dump (error or stop
                // request): take the tool down rather than waiting.
                let _ = child.start_kill();
            }
            let _ = child.wait().await;
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.stdout = None;
        self.finished = true;
        Ok(())
    }
}

/// Feeds verified dump bytes to a restore tool's stdin.
pub(crate) struct SubprocessSink {
    endpoint: String,
    spec: CommandSpec,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
}

impl SubprocessSink {
    pub(crate) fn new(endpoint: String, spec: CommandSpec) -> Self {
        Self {
            endpoint,
            spec,
            child: None,
            stdin: None,
            stderr_task: None,
        }
    }

    pub(crate) async fn open(&mut self) -> Result<()> {
        debug!("Spawning {} for {}", self.spec.program, self.endpoint);

        let mut child = self
            .spec
            .build()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::connection(
                    &self.endpoint,
                    format!("failed to spawn {}: {e}", self.spec.program),
                )
            })?;

        self.stdin = child.stdin.take();
        self.stderr_task = child.stderr.take().map(drain_stderr);
        self.child = Some(child);
        Ok(())
    }

    pub(crate) async fn write(&mut self, buf: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::connection(&self.endpoint, "destination stream is not open"))?;

        stdin.write_all(buf).await.map_err(|e| {
            Error::connection(
                &self.endpoint,
                format!("writing to {} failed: {e}", self.spec.program),
            )
        })
    }

    pub(crate) async fn close(&mut self) -> Result<()> {
        // Closing stdin is what lets the tool finish and commit.
        self.stdin = None;

        if let Some(mut child) = self.child.take() {
            let status = child.wait().await.map_err(|e| {
                Error::connection(
                    &self.endpoint,
                    format!("waiting for {} failed: {e}", self.spec.program),
                )
            })?;

            if !status.success() {
                let tail = stderr_tail(self.stderr_task.take()).await;
                return Err(Error::connection(
                    &self.endpoint,
                    format!("{} exited with {status}: {tail}", self.spec.program),
                ));
            }
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        Ok(())
    }
}
