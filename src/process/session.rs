/*
This code is part of the WhiteboxTools geospatial analysis library.
Created: 16/10/2026
Last Modified: 16/10/2026
License: MIT
*/

use super::{classify_line, CancelFlag, ExitStatus, ToolEvent};
use crate::errors::{Result, RunnerError};
use log::{info, warn};
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// How often the cancel flag is checked while no output arrives.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type LineResult = std::io::Result<String>;

/// One live child process and the output received from it so far.
pub struct ProcessSession {
    child: Child,
    lines: Receiver<LineResult>,
    reader: Option<JoinHandle<()>>,
    log: Vec<String>,
    progress: Option<i32>,
    cancel: CancelFlag,
    finished: bool,
}

impl ProcessSession {
    /// Launches `exe` with `args` directly (never through a shell). stdout
    /// and stderr share one pipe, so lines arrive in the order they were written.
    pub fn spawn<S: AsRef<OsStr>>(exe: &Path, args: &[S], cancel: CancelFlag) -> Result<ProcessSession> {
        let spawn_error = |source: io::Error| RunnerError::ProcessSpawn {
            exe: exe.to_path_buf(),
            source,
        };
        let (output, writer) = io::pipe().map_err(spawn_error)?;
        let err_writer = writer.try_clone().map_err(spawn_error)?;

        // the Command, and with it the parent's copies of the writer, is
        // dropped at the end of this statement
        let child = Command::new(exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(err_writer)
            .spawn()
            .map_err(spawn_error)?;

        let (tx, rx) = mpsc::channel();
        let reader = forward_lines(output, tx);

        Ok(ProcessSession {
            child,
            lines: rx,
            reader: Some(reader),
            log: vec![],
            progress: None,
            cancel,
            finished: false,
        })
    }

    /// Every line received so far.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// The last percentage reported by a progress line.
    pub fn progress(&self) -> Option<i32> {
        self.progress
    }

    /// Reads output until the process closes its streams or the run is cancelled.
    pub fn drive<F: FnMut(ToolEvent)>(&mut self, mut handler: F) -> ExitStatus {
        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(line)) => {
                    if self.cancel.is_cancelled() {
                        return self.cancelled();
                    }
                    let event = classify_line(&line);
                    if let Some(percent) = event.percent() {
                        self.progress = Some(percent);
                    }
                    self.log.push(line);
                    handler(event);
                }
                Ok(Err(e)) => {
                    let err = RunnerError::ProcessRead(e);
                    warn!("{}", err);
                    handler(ToolEvent::message(err.to_string()));
                    self.terminate();
                    return ExitStatus::Failed;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.finished = true;
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        match self.child.wait() {
            Ok(status) => {
                if !status.success() {
                    warn!("Tool process exited with {}", status);
                }
                ExitStatus::Completed
            }
            Err(e) => {
                let err = RunnerError::ProcessRead(e);
                warn!("{}", err);
                handler(ToolEvent::message(err.to_string()));
                ExitStatus::Failed
            }
        }
    }

    fn cancelled(&mut self) -> ExitStatus {
        self.terminate();
        self.cancel.reset();
        info!("Process cancelled");
        ExitStatus::Cancelled
    }

    // A grandchild still holding the pipe keeps the reader blocked after the
    // kill, so the reader is left to finish on its own.
    fn terminate(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!("Error encountered while killing process: {}", e);
            }
        }
        let _ = self.child.wait();
        self.finished = true;
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if !self.finished {
            self.terminate();
        }
    }
}

fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<LineResult>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = vec![];
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    })
}
