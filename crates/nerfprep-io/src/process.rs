use std::process::Command;

use crate::error::IoError;

/// The command line of `cmd` as a single string, for logs and errors.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion and return its standard output.
///
/// The call blocks until the child exits. A non-zero exit status is an
/// [`IoError::ExternalProcess`] carrying the captured standard error.
///
/// # Arguments
///
/// * `cmd` - The command to run.
///
/// # Returns
///
/// The standard output of the command.
pub fn run_command(cmd: &mut Command) -> Result<String, IoError> {
    let command = command_line(cmd);
    log::debug!("Running {command}");

    let output = cmd.output().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IoError::CommandNotFound(command.clone()),
        _ => IoError::FileError(e),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(IoError::ExternalProcess {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    if !stdout.is_empty() {
        log::debug!("{stdout}");
    }

    Ok(stdout)
}
