//! Lifecycle hooks driving a simulation.
//!
//! A host attaches once, then feeds [`Command`]s either directly through
//! [`Driver::on_event`] or queued and drained on the next
//! [`Driver::on_update`].

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::export::ResultSummary;
use crate::sim::{ComputeBackend, ComputePipeline, Kernel};
use crate::util::{Error, Result};

/// Operational commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Trace every ray.
    Run,
    /// Restore the original rays and re-initialize.
    Reset,
    /// Export results, to the default path when `None`.
    Save(Option<PathBuf>),
}

impl Command {
    /// Parse one command line: `run`, `reset` or `save [path]`.
    ///
    /// Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        if head.starts_with('#') {
            return Ok(None);
        }

        let cmd = match head {
            "run" | "r" => Command::Run,
            "reset" => Command::Reset,
            "save" | "s" => Command::Save(words.next().map(PathBuf::from)),
            other => return Err(Error::Command(other.to_string())),
        };
        if let Some(extra) = words.next() {
            return Err(Error::Command(format!("unexpected argument '{extra}' after {head}")));
        }
        Ok(Some(cmd))
    }

    /// Parse a sequence of argv-style words (`save` takes the next word as
    /// its path unless that word is itself a command).
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<Self>> {
        let mut out = Vec::new();
        let mut iter = args.iter().map(AsRef::as_ref).peekable();
        while let Some(word) = iter.next() {
            let cmd = match word {
                "save" | "s" => {
                    let path = iter.next_if(|w| !is_command_word(w)).map(PathBuf::from);
                    Command::Save(path)
                }
                other => match Command::parse(other)? {
                    Some(cmd) => cmd,
                    None => continue,
                },
            };
            out.push(cmd);
        }
        Ok(out)
    }
}

fn is_command_word(word: &str) -> bool {
    matches!(word, "run" | "r" | "reset" | "save" | "s")
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Run => f.write_str("run"),
            Command::Reset => f.write_str("reset"),
            Command::Save(None) => f.write_str("save"),
            Command::Save(Some(p)) => write!(f, "save {}", p.display()),
        }
    }
}

/// What a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Traced,
    Reset,
    Saved { path: PathBuf, summary: ResultSummary },
}

/// Host-facing lifecycle.
pub trait Driver {
    /// Called once before any event.
    fn on_attach(&mut self) -> Result<()>;

    /// Execute one command now.
    fn on_event(&mut self, command: &Command) -> Result<Outcome>;

    /// Periodic tick; runs whatever was queued since the last tick.
    ///
    /// Stops at the first failure, which is then the last entry; commands
    /// queued behind it are discarded.
    fn on_update(&mut self) -> Vec<Result<Outcome>> {
        Vec::new()
    }
}

/// A [`ComputePipeline`] behind the [`Driver`] hooks.
pub struct Simulation<B> {
    pipeline: ComputePipeline<B>,
    export_path: PathBuf,
    pending: VecDeque<Command>,
    attached: bool,
}

impl<B: ComputeBackend> Simulation<B> {
    pub fn new(pipeline: ComputePipeline<B>, export_path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            export_path: export_path.into(),
            pending: VecDeque::new(),
            attached: false,
        }
    }

    pub fn pipeline(&self) -> &ComputePipeline<B> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut ComputePipeline<B> {
        &mut self.pipeline
    }

    /// Queue a command for the next [`Driver::on_update`].
    pub fn submit(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<B: ComputeBackend> Driver for Simulation<B> {
    fn on_attach(&mut self) -> Result<()> {
        if self.attached {
            return Ok(());
        }
        self.pipeline.execute(Kernel::Init)?;
        self.attached = true;
        info!("Simulation attached ({})", self.pipeline.state());
        Ok(())
    }

    fn on_event(&mut self, command: &Command) -> Result<Outcome> {
        debug!("Command: {}", command);
        match command {
            Command::Run => {
                self.pipeline.execute(Kernel::Trace)?;
                Ok(Outcome::Traced)
            }
            Command::Reset => {
                self.pipeline.reset()?;
                Ok(Outcome::Reset)
            }
            Command::Save(path) => {
                let path = path.clone().unwrap_or_else(|| self.export_path.clone());
                let summary = self.pipeline.export(&path)?;
                info!("Saved {}: {}", path.display(), summary);
                Ok(Outcome::Saved { path, summary })
            }
        }
    }

    fn on_update(&mut self) -> Vec<Result<Outcome>> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while let Some(command) = self.pending.pop_front() {
            let outcome = self.on_event(&command);
            let failed = outcome.is_err();
            outcomes.push(outcome);
            if failed {
                if !self.pending.is_empty() {
                    warn!("\"{}\" failed; dropping {} queued commands", command, self.pending.len());
                    self.pending.clear();
                }
                break;
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(Command::parse("run").unwrap(), Some(Command::Run));
        assert_eq!(Command::parse("  reset ").unwrap(), Some(Command::Reset));
        assert_eq!(Command::parse("save").unwrap(), Some(Command::Save(None)));
        assert_eq!(
            Command::parse("save out.bin").unwrap(),
            Some(Command::Save(Some("out.bin".into())))
        );
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("# comment").unwrap(), None);
        assert!(matches!(Command::parse("fly"), Err(Error::Command(_))));
        assert!(Command::parse("run now").is_err());
    }

    #[test]
    fn test_parse_args() {
        let cmds = Command::parse_args(&["run", "save", "a.bin", "reset", "save", "run"]).unwrap();
        assert_eq!(
            cmds,
            [
                Command::Run,
                Command::Save(Some("a.bin".into())),
                Command::Reset,
                Command::Save(None),
                Command::Run,
            ]
        );
    }

    #[test]
    fn test_display_round_trips() {
        let cmd = Command::Save(Some("x.bin".into()));
        assert_eq!(Command::parse(&cmd.to_string()).unwrap(), Some(cmd));
    }
}
