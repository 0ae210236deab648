//! Process introspection.
//!
//! The launcher search keys off the command line of the process owning a
//! window, in two shapes: the short command (argv[0]) and the full
//! reconstructed command string.

use anyhow::{Context, Result, bail};
use std::fs;

pub trait ProcInspector {
    /// Command-line arguments of the given process
    fn args(&self, pid: i32) -> Result<Vec<String>>;
}

/// Real implementation reading /proc
pub struct ProcFs;

impl ProcInspector for ProcFs {
    fn args(&self, pid: i32) -> Result<Vec<String>> {
        let raw = fs::read(format!("/proc/{}/cmdline", pid))
            .with_context(|| format!("Failed to read cmdline for pid {}", pid))?;
        let args: Vec<String> = raw
            .split(|b| *b == 0)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        if args.is_empty() {
            bail!("pid {} has an empty cmdline", pid);
        }
        Ok(args)
    }
}

/// Command identity of a window's owning process, queried once at admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandInfo {
    /// argv[0]
    pub short: Option<String>,
    /// all arguments joined with spaces
    pub full: Option<String>,
}

impl CommandInfo {
    pub fn for_pid(inspector: &dyn ProcInspector, pid: i32) -> Self {
        match inspector.args(pid) {
            Ok(args) => CommandInfo {
                short: args.first().cloned(),
                full: Some(args.join(" ")),
            },
            Err(e) => {
                tracing::debug!("No command info for pid {}: {}", pid, e);
                CommandInfo::default()
            }
        }
    }

}
