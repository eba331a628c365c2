//! # Shell resolution and child-process construction.
//!
//! Exec services run through the host shell: `bash -c <cmd>` on unix,
//! `cmd /c <cmd>` elsewhere. The shell is resolved per engine (an explicit
//! path via [`Config::shell`](crate::Config::shell), or the platform default
//! looked up on `PATH`), so two engines in one process can use different
//! shells.
//!
//! Before invocation the literal token `$PORT` in the command string is
//! replaced with the worker's assigned port, and `PORT=<port>` is appended
//! to the inherited environment.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::EngineError;

/// Resolved shell used to run exec services.
#[derive(Clone, Debug)]
pub(crate) struct Shell {
    program: PathBuf,
    flag: &'static str,
}

impl Shell {
    /// Name of the platform-default shell binary.
    pub(crate) fn default_name() -> &'static str {
        if cfg!(windows) {
            "cmd"
        } else {
            "bash"
        }
    }

    const fn default_flag() -> &'static str {
        if cfg!(windows) {
            "/c"
        } else {
            "-c"
        }
    }

    /// Resolves the shell: an explicit override path, or the platform
    /// default found on `PATH`.
    pub(crate) fn resolve(override_path: Option<&Path>) -> Result<Self, EngineError> {
        if let Some(p) = override_path {
            return Ok(Self {
                program: p.to_path_buf(),
                flag: Self::default_flag(),
            });
        }
        let name = Self::default_name();
        find_in_path(name)
            .map(|program| Self {
                program,
                flag: Self::default_flag(),
            })
            .ok_or(EngineError::ShellNotFound {
                tried: name.to_string(),
            })
    }

    /// Builds the child-process command for one worker.
    ///
    /// Stdout and stderr are piped (the actor drains them into the log
    /// multiplexer); stdin is closed.
    pub(crate) fn command(&self, exec: &str, port: u16) -> Command {
        let line = expand_port(exec, port);
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.flag)
            .arg(line)
            .env("PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// Replaces every literal `$PORT` token with the assigned port.
pub(crate) fn expand_port(exec: &str, port: u16) -> String {
    exec.replace("$PORT", &port.to_string())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let with_exe = candidate.with_extension("exe");
            if with_exe.is_file() {
                return Some(with_exe);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_every_port_token() {
        assert_eq!(
            expand_port("serve --port $PORT --peer $PORT", 3001),
            "serve --port 3001 --peer 3001"
        );
        assert_eq!(expand_port("echo plain", 3001), "echo plain");
    }

    #[cfg(unix)]
    #[test]
    fn resolves_platform_shell_from_path() {
        let shell = Shell::resolve(None).expect("bash should be on PATH");
        assert!(shell.program.ends_with("bash"));
        assert_eq!(shell.flag, "-c");
    }

    #[test]
    fn explicit_override_wins() {
        let shell = Shell::resolve(Some(Path::new("/opt/custom/sh"))).expect("override");
        assert_eq!(shell.program, PathBuf::from("/opt/custom/sh"));
    }
}
