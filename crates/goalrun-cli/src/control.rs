//! Interactive run control from stdin.

use std::io::BufRead;

use goalrun_agent::{AgentError, Mode, RunControl};
use tokio::sync::mpsc;
use tracing::debug;

/// A command typed while a run is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Step,
    Resume,
    Stop,
}

impl Command {
    /// Parse one input line. Accepts the single-letter form or the full word.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "s" | "step" => Some(Self::Step),
            "r" | "resume" => Some(Self::Resume),
            "q" | "quit" | "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    /// Apply the command, returning a line of feedback for the user.
    pub fn apply(self, control: &RunControl) -> String {
        let outcome = match self {
            Self::Pause => control
                .set_mode(Mode::Pause)
                .map(|_| "pausing after the current task"),
            Self::Resume => control
                .set_mode(Mode::Automatic)
                .map(|_| "resuming automatic mode"),
            Self::Step => control.request_step().map(|accepted| {
                if accepted {
                    "running one task"
                } else {
                    "step ignored: the run is not paused"
                }
            }),
            Self::Stop => {
                control.stop();
                Ok("stopping")
            }
        };

        match outcome {
            Ok(feedback) => feedback.to_string(),
            Err(AgentError::RunStopped) => "the run has already stopped".to_string(),
            Err(e) => e.to_string(),
        }
    }
}

/// Read commands from stdin until it closes or the run stops.
///
/// The blocking reads run on a detached thread, which must never be joined.
pub async fn read_commands(control: RunControl) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = rx.recv().await {
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Some(command) => {
                debug!(command = ?command, "Applying command");
                eprintln!("> {}", command.apply(&control));
                if command == Command::Stop {
                    break;
                }
            }
            None => eprintln!(
                "> unknown command {:?} (p = pause, s = step, r = resume, q = stop)",
                line.trim()
            ),
        }
    }
    debug!("Command input closed");
}
