// Command-line argument parsing module

mod clap_parser;

pub use clap_parser::{build_cli, ClapCommandParser};
