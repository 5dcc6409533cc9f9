//! External command execution.
//!
//! Runs a program to completion, echoing its output through the logger and
//! turning a non-zero exit into an error carrying the first stderr lines.

use crate::log;
use anyhow::{Context, Result, bail};
use std::{
    ffi::OsStr,
    path::Path,
    process::{Command, Output},
};

/// Run an external command with arguments.
///
/// # Examples
/// ```ignore
/// exec!(["git"]; "clone", url, dest)?;
/// exec!(root; ["git"]; "status", "-s")?;
/// ```
#[macro_export]
macro_rules! exec {
    ($cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec(None, &$cmd, &[$(::std::ffi::OsStr::new(&$arg)),*])
    }};
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec(
            Some(::std::convert::AsRef::<::std::path::Path>::as_ref($root)),
            &$cmd,
            &[$(::std::ffi::OsStr::new(&$arg)),*],
        )
    }};
}

/// Execute `cmd` (program plus leading arguments) followed by `args`.
///
/// # Errors
/// Returns error if the program cannot be started or exits unsuccessfully.
pub fn exec(root: Option<&Path>, cmd: &[&str], args: &[&OsStr]) -> Result<Output> {
    let Some((program, leading)) = cmd.split_first() else {
        bail!("Empty command");
    };

    let mut command = Command::new(program);
    command.args(leading).args(args.iter().filter(|a| !a.is_empty()));
    if let Some(dir) = root {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{program}`"))?;
    log_output(program, &output)?;
    Ok(output)
}

/// Echo command output, failing on a non-zero exit.
fn log_output(name: &str, output: &Output) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let message = stderr.trim();
        if message.is_empty() {
            bail!("Command `{name}` failed with {}", output.status);
        }
        bail!("Command `{name}` failed with {}:\n{message}", output.status);
    }

    for line in stdout.lines().chain(stderr.lines()) {
        if !line.trim().is_empty() {
            log!(name; "{line}");
        }
    }
    Ok(())
}
