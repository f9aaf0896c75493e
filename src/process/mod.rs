/*
This code is part of the WhiteboxTools geospatial analysis library.
Created: 16/10/2026
Last Modified: 16/10/2026
License: MIT
*/

pub mod progress;
pub mod session;

pub use self::progress::classify_line;
pub use self::session::ProcessSession;

use crate::configs::Configs;
use crate::tools::names::to_camelcase;
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// How a tool run ended. The numeric codes are part of the calling contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Completed = 0,
    Failed = 1,
    Cancelled = 2,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A cancellation request shared between the run loop and whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One classified line of tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    Progress {
        label: String,
        percent: i32,
        line: String,
    },
    Message {
        text: String,
    },
}

impl ToolEvent {
    pub fn message<S: Into<String>>(text: S) -> ToolEvent {
        ToolEvent::Message { text: text.into() }
    }

    /// The output line exactly as the tool printed it (less trailing whitespace).
    pub fn line(&self) -> &str {
        match self {
            ToolEvent::Progress { line, .. } => line,
            ToolEvent::Message { text } => text,
        }
    }

    pub fn percent(&self) -> Option<i32> {
        match self {
            ToolEvent::Progress { percent, .. } => Some(*percent),
            ToolEvent::Message { .. } => None,
        }
    }
}

impl fmt::Display for ToolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line())
    }
}

/// Adapts a plain line callback to the event handler interface.
pub fn line_callback<F: FnMut(&str)>(mut callback: F) -> impl FnMut(ToolEvent) {
    move |event: ToolEvent| callback(event.line())
}

/// Everything needed to launch one tool run.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// The tool name in the executable's UpperCamelCase form.
    pub tool_name: String,
    pub working_dir: String,
    pub arguments: Vec<String>,
    pub verbose: bool,
    pub compress_rasters: bool,
    pub max_procs: isize,
    pub output_command: bool,
}

impl ToolInvocation {
    pub fn new(tool_name: &str, arguments: Vec<String>, configs: &Configs) -> ToolInvocation {
        ToolInvocation {
            tool_name: to_camelcase(tool_name),
            working_dir: configs.working_directory.clone(),
            arguments,
            verbose: configs.verbose_mode,
            compress_rasters: configs.compress_rasters,
            max_procs: configs.max_procs,
            output_command: configs.output_command,
        }
    }

    /// The argument vector passed to the executable, in the order it expects.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![format!("--run=\"{}\"", self.tool_name)];
        if !self.working_dir.trim().is_empty() {
            args.push(format!("--wd=\"{}\"", self.working_dir));
        }
        args.extend(self.arguments.iter().cloned());
        if self.verbose {
            args.push("-v".to_string());
        } else {
            args.push("-v=false".to_string());
        }
        if self.compress_rasters {
            args.push("--compress_rasters=True".to_string());
        } else {
            args.push("--compress_rasters=False".to_string());
        }
        if self.max_procs > 0 {
            args.push(format!("--max_procs={}", self.max_procs));
        }
        args
    }

    /// The full command, executable first.
    pub fn command_line(&self, exe: &Path) -> Vec<String> {
        let mut cl = vec![exe.display().to_string()];
        cl.extend(self.args());
        cl
    }
}

/// Runs one tool to completion, handing every output line to `handler` in order.
///
/// Spawn and read failures are delivered to the handler as message lines and
/// reported as `Failed`. Once `cancel` is set the child is killed, no further
/// lines are delivered, and the flag is cleared again.
pub fn run_invocation<F: FnMut(ToolEvent)>(
    exe: &Path,
    invocation: &ToolInvocation,
    cancel: &CancelFlag,
    mut handler: F,
) -> ExitStatus {
    let command_line = invocation.command_line(exe).join(" ");
    debug!("{}", command_line);
    info!("Running {}", invocation.tool_name);
    if invocation.output_command {
        handler(ToolEvent::message(command_line));
    }

    let mut session = match ProcessSession::spawn(exe, &invocation.args(), cancel.clone()) {
        Ok(session) => session,
        Err(e) => {
            handler(ToolEvent::message(e.to_string()));
            return ExitStatus::Failed;
        }
    };
    let status = session.drive(handler);
    info!("{} finished: {:?}", invocation.tool_name, status);
    status
}

/// A tool run executing on a worker thread.
pub struct BackgroundRun {
    events: Receiver<ToolEvent>,
    handle: JoinHandle<ExitStatus>,
}

impl BackgroundRun {
    /// Output events, in the order the tool produced them. The channel
    /// closes when the run ends.
    pub fn events(&self) -> &Receiver<ToolEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run to end.
    pub fn join(self) -> ExitStatus {
        self.handle.join().unwrap_or(ExitStatus::Failed)
    }
}

/// Starts `run_invocation` on its own thread so the caller stays responsive.
pub fn spawn_invocation(exe: PathBuf, invocation: ToolInvocation, cancel: CancelFlag) -> BackgroundRun {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        run_invocation(&exe, &invocation, &cancel, |event| {
            // the receiver may have been dropped
            let _ = tx.send(event);
        })
    });
    BackgroundRun { events: rx, handle }
}
