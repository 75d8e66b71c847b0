//! Shell completion generation for mongo-dispatch

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io::{self, Write};
use std::str::FromStr;

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result};

const BIN_NAME: &str = "mongo-dispatch";

/// Write the completion script for `shell_name` to stdout
pub fn generate_completion(shell_name: &str) -> Result<()> {
    let shell = parse_shell(shell_name)?;
    let script = completion_script(shell);
    io::stdout().write_all(&script)?;
    Ok(())
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    Shell::from_str(&shell_name.to_lowercase()).map_err(|_| {
        ConfigError::InvalidValue {
            field: "shell".to_string(),
            value: shell_name.to_string(),
        }
        .into()
    })
}

fn completion_script(shell: Shell) -> Vec<u8> {
    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, BIN_NAME, &mut buffer);
    buffer
}
