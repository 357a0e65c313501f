//! # Telecommand script interpreter module
//!
//! This module provides an interpreter for telecommand scripts, allowing the vehicle to be run
//! unattended (for example in the simulator) with a pre-planned sequence of depth hold and
//! safety commands.
//!
//! A script is a sequence of `<time_s>: <tc_json>;` entries, one per line. Lines which do not
//! match this form (such as `#` comments) are ignored:
//!
//! ```text
//! # Hold at the current depth, then go to 10 ft
//! 1.0: {"type": "DEPTH_HOLD", "payload": {"cmd": "ENABLE"}};
//! 5.0: {"type": "DEPTH_HOLD", "payload": {"cmd": "GO_TO", "depth_ft": 10.0}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Command {
    /// The time the command is supposed to execute at, relative to the start of the script
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_tcs` to
/// acquire a list of telecommands that need executing.
pub struct ScriptInterpreter {
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),
}

#[derive(Debug, PartialEq)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(|e| ScriptError::InvalidTimestamp(e.to_string()))?;

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{} ({})", time_str, e)))?;

            // The scripts contain JSON only.
            let tc = Tc::from_json(cap.get(3).map(|m| m.as_str()).unwrap_or(""))
                .map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            tc_queue.push_back(Command { exec_time_s, tc });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        // Keep the queue in execution order even if the script isn't
        tc_queue
            .make_contiguous()
            .sort_by(|a, b| a.exec_time_s.total_cmp(&b.exec_time_s));

        Ok(ScriptInterpreter { cmds: tc_queue })
    }

    /// Return the TCs which are due at the given script time.
    pub fn get_pending_tcs(&mut self, script_time_s: f64) -> PendingTcs {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript;
        }

        let mut tc_vec: Vec<Tc> = vec![];

        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > script_time_s {
                break;
            }
            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        if tc_vec.is_empty() {
            PendingTcs::None
        } else {
            PendingTcs::Some(tc_vec)
        }
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::DepthHoldCmd;

    const SCRIPT: &str = r#"
# Comment lines are skipped
1.0: {"type": "DEPTH_HOLD", "payload": {"cmd": "ENABLE"}};
0.5: {"type": "RESET_STOP"};
2.5: {"type": "DEPTH_HOLD", "payload": {"cmd": "GO_TO", "depth_ft": 10.0}};
"#;

    #[test]
    fn test_script_replay_order() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();
        assert_eq!(si.get_num_tcs(), 3);
        assert_eq!(si.get_duration(), 2.5);

        assert_eq!(si.get_pending_tcs(0.1), PendingTcs::None);
        assert_eq!(
            si.get_pending_tcs(1.0),
            PendingTcs::Some(vec![Tc::ResetStop, Tc::DepthHold(DepthHoldCmd::Enable)])
        );
        assert_eq!(si.get_pending_tcs(2.0), PendingTcs::None);
        assert_eq!(
            si.get_pending_tcs(3.0),
            PendingTcs::Some(vec![Tc::DepthHold(DepthHoldCmd::GoTo { depth_ft: 10.0 })])
        );
        assert_eq!(si.get_pending_tcs(4.0), PendingTcs::EndOfScript);
    }

    #[test]
    fn test_script_errors() {
        assert!(matches!(
            ScriptInterpreter::from_str("# nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str(r#"1.0: {"type": "WARP"};"#),
            Err(ScriptError::InvalidTc(t, _)) if t == 1.0
        ));
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.prs"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
