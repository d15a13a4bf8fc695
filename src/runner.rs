//! External command runner.
//!
//! [`CommandRunner::spawn`] starts a program and hands back an
//! [`OutputStream`]: an iterator over the program's output, one line per
//! [`OutputChunk`], tagged with the pipe it came from. The stream is finite
//! and cannot be restarted. Callers either drain it in one go
//! ([`OutputStream::drain`]) or pull chunks as they arrive and forward them to
//! whatever displays them, then call [`OutputStream::finish`] for the exit
//! status.
//!
//! Output is not interpreted here. The `make` helpers only know how to spell
//! an invocation.

use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::error::MakefigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipe {
    Stdout,
    Stderr,
}

/// One line of output, line terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub pipe: Pipe,
    pub text: String,
}

/// Starts external programs.
pub trait CommandRunner {
    fn spawn(&self, program: &str, args: &[String]) -> Result<OutputStream, MakefigError>;
}

/// Runs programs as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl CommandRunner for ProcessRunner {
    fn spawn(&self, program: &str, args: &[String]) -> Result<OutputStream, MakefigError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::info!(program, ?args, "spawning");
        let mut child = command.spawn().map_err(|e| MakefigError::SpawnFailed {
            program: program.into(),
            source: e,
        })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, Pipe::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, Pipe::Stderr, tx));
        }

        Ok(OutputStream {
            program: program.into(),
            rx,
            child,
            readers,
            finished: false,
        })
    }
}

/// Forward output one chunk at a time. A chunk ends at `\n` or at a bare
/// `\r`, so progress lines that redraw themselves arrive as they are drawn.
/// `\r\n` ends a single chunk.
fn forward_lines<R: Read + Send + 'static>(
    source: R,
    pipe: Pipe,
    tx: mpsc::Sender<OutputChunk>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut pending = Vec::new();
        let mut after_cr = false;
        let send = |pending: &mut Vec<u8>| {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            tx.send(OutputChunk { pipe, text }).is_ok()
        };
        loop {
            let (consumed, delimiter) = match reader.fill_buf() {
                Ok([]) => break,
                Ok(available) => match available.iter().position(|b| matches!(b, b'\n' | b'\r')) {
                    Some(at) => {
                        pending.extend_from_slice(&available[..at]);
                        (at + 1, Some(available[at]))
                    }
                    None => {
                        pending.extend_from_slice(available);
                        (available.len(), None)
                    }
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(?pipe, error = %e, "output pipe read failed");
                    break;
                }
            };
            reader.consume(consumed);

            let Some(delimiter) = delimiter else {
                after_cr &= pending.is_empty();
                continue;
            };
            let joins_crlf = delimiter == b'\n' && after_cr && pending.is_empty();
            after_cr = delimiter == b'\r';
            if !joins_crlf && !send(&mut pending) {
                return;
            }
        }
        if !pending.is_empty() {
            send(&mut pending);
        }
    })
}

/// Output of a running program. Iteration ends once both pipes close.
///
/// Dropping the stream before [`finish`](Self::finish) or
/// [`drain`](Self::drain) kills the program and reaps it. Reader threads are
/// left to end on their own once the pipes close.
pub struct OutputStream {
    program: String,
    rx: mpsc::Receiver<OutputChunk>,
    child: Child,
    readers: Vec<JoinHandle<()>>,
    finished: bool,
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .finish_non_exhaustive()
    }
}

impl Iterator for OutputStream {
    type Item = OutputChunk;

    fn next(&mut self) -> Option<OutputChunk> {
        self.rx.recv().ok()
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::debug!(program = %self.program, pid = self.child.id(), "stream dropped, killing");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl OutputStream {
    /// Process id of the running program.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Wait for the program to exit. Output not yet consumed is discarded.
    pub fn finish(mut self) -> Result<ExitStatus, MakefigError> {
        // Keep reading so the child never blocks on a full pipe.
        self.rx.iter().for_each(drop);
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        let status = self.child.wait().map_err(|e| MakefigError::SpawnFailed {
            program: self.program.clone(),
            source: e,
        })?;
        self.finished = true;
        tracing::info!(program = %self.program, %status, "finished");
        Ok(status)
    }

    /// Collect all output, then wait for exit.
    pub fn drain(mut self) -> Result<Transcript, MakefigError> {
        let chunks: Vec<OutputChunk> = self.by_ref().collect();
        let status = self.finish()?;
        Ok(Transcript { chunks, status })
    }
}

/// Everything a finished program printed, in arrival order.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub chunks: Vec<OutputChunk>,
    pub status: ExitStatus,
}

impl Transcript {
    pub fn lines(&self, pipe: Pipe) -> impl Iterator<Item = &str> {
        self.chunks
            .iter()
            .filter(move |c| c.pipe == pipe)
            .map(|c| c.text.as_str())
    }
}

/// The Makefile targets the tool drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum MakeTarget {
    Build,
    Size,
    Program,
    Run,
    Clean,
}

impl MakeTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            MakeTarget::Build => "build",
            MakeTarget::Size => "size",
            MakeTarget::Program => "program",
            MakeTarget::Run => "run",
            MakeTarget::Clean => "clean",
        }
    }
}

impl fmt::Display for MakeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Program and arguments for `make <target>`, with `-f` when the Makefile
/// isn't the default one in the working directory.
pub fn make_invocation(target: MakeTarget, makefile: Option<&Path>) -> (&'static str, Vec<String>) {
    let mut args = Vec::new();
    if let Some(path) = makefile {
        args.push("-f".to_string());
        args.push(path.display().to_string());
    }
    args.push(target.as_str().to_string());
    ("make", args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_without_makefile() {
        let (program, args) = make_invocation(MakeTarget::Build, None);
        assert_eq!(program, "make");
        assert_eq!(args, vec!["build"]);
    }

    #[test]
    fn invocation_with_makefile() {
        let (_, args) = make_invocation(MakeTarget::Program, Some(Path::new("fw/Makefile")));
        assert_eq!(args, vec!["-f", "fw/Makefile", "program"]);
    }

    #[test]
    fn spawn_missing_program_fails() {
        let err = ProcessRunner::new()
            .spawn("makefig-no-such-program", &[])
            .unwrap_err();
        assert!(matches!(err, MakefigError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn streams_both_pipes() {
        let args = vec!["-c".to_string(), "echo one; echo two >&2; echo three".to_string()];
        let transcript = ProcessRunner::new().spawn("sh", &args).unwrap().drain().unwrap();

        assert!(transcript.status.success());
        let out: Vec<&str> = transcript.lines(Pipe::Stdout).collect();
        assert_eq!(out, vec!["one", "three"]);
        let err: Vec<&str> = transcript.lines(Pipe::Stderr).collect();
        assert_eq!(err, vec!["two"]);
    }

    #[cfg(unix)]
    #[test]
    fn reports_exit_code() {
        let args = vec!["-c".to_string(), "exit 3".to_string()];
        let transcript = ProcessRunner::new().spawn("sh", &args).unwrap().drain().unwrap();
        assert_eq!(transcript.status.code(), Some(3));
        assert!(transcript.chunks.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn incremental_consumption() {
        let args = vec!["-c".to_string(), "printf 'a\\nb\\n'".to_string()];
        let mut stream = ProcessRunner::new().spawn("sh", &args).unwrap();
        let first = stream.next().unwrap();
        assert_eq!(first.text, "a");
        assert_eq!(first.pipe, Pipe::Stdout);
        let rest: Vec<OutputChunk> = stream.by_ref().collect();
        assert_eq!(rest.len(), 1);
        assert!(stream.next().is_none());
        assert!(stream.finish().unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn carriage_returns_split_progress_lines() {
        let args = vec![
            "-c".to_string(),
            "printf 'erase 10%%\\rerase 100%%\\r\\ndone\\r\\nno newline'".to_string(),
        ];
        let transcript = ProcessRunner::new().spawn("sh", &args).unwrap().drain().unwrap();
        let out: Vec<&str> = transcript.lines(Pipe::Stdout).collect();
        assert_eq!(out, vec!["erase 10%", "erase 100%", "done", "no newline"]);
    }

    #[cfg(unix)]
    #[test]
    fn empty_lines_are_kept() {
        let args = vec!["-c".to_string(), "printf 'a\\n\\nb\\n'".to_string()];
        let transcript = ProcessRunner::new().spawn("sh", &args).unwrap().drain().unwrap();
        let out: Vec<&str> = transcript.lines(Pipe::Stdout).collect();
        assert_eq!(out, vec!["a", "", "b"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dropping_stream_kills_and_reaps_child() {
        let stream = ProcessRunner::new()
            .spawn("sleep", &["30".to_string()])
            .unwrap();
        let proc_dir = std::path::PathBuf::from(format!("/proc/{}", stream.id()));
        assert!(proc_dir.exists());

        let started = std::time::Instant::now();
        drop(stream);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        assert!(!proc_dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let args = vec!["-c".to_string(), "ls".to_string()];
        let transcript = ProcessRunner::new()
            .working_dir(dir.path())
            .spawn("sh", &args)
            .unwrap()
            .drain()
            .unwrap();
        assert!(transcript.lines(Pipe::Stdout).any(|l| l == "marker.txt"));
    }
}
