//! Shell completion scripts

use clap::{Arg, Command};
use clap_complete::{generate, Shell};
use std::io;

/// The hidden `--completion SHELL` flag
pub fn completion_arg() -> Arg {
    Arg::new("completion")
        .long("completion")
        .value_name("SHELL")
        .value_parser(clap::value_parser!(Shell))
        .help("Print a completion script for SHELL")
        .hide(true)
}

/// Write the completion script for `cmd` to stdout
pub fn print_completion(shell: Shell, cmd: &mut Command) {
    let name = cmd.get_name().to_string();
    generate(shell, cmd, name, &mut io::stdout());
}
