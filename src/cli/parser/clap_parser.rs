// Clap-based command parser implementation

use crate::cli::types::{CommandType, OutputFormat, ParsedCommand};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Clap-based command parser implementation
pub struct ClapCommandParser {
    app: Command,
}

impl ClapCommandParser {
    /// Create a new clap command parser
    pub fn new() -> Self {
        Self { app: build_cli() }
    }

    /// Parse command-line arguments into a structured command.
    ///
    /// Help and version requests come back as `clap::Error` too; callers
    /// should let clap print them via `Error::exit`.
    pub fn parse_args<I, T>(&self, args: I) -> Result<ParsedCommand, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.app.clone().try_get_matches_from(args)?;
        Ok(matches_to_parsed_command(&matches))
    }
}

impl Default for ClapCommandParser {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_to_parsed_command(matches: &ArgMatches) -> ParsedCommand {
    let command = match matches.subcommand() {
        Some(("enable-any-source", _)) => CommandType::EnableAnySource,
        Some(("restore-gatekeeper", _)) => CommandType::RestoreGatekeeper,
        Some(("status", _)) => CommandType::Status,
        Some(("open-settings", _)) => CommandType::OpenSettings,
        Some(("fix-app", sub_m)) => CommandType::FixApp(
            sub_m
                .get_one::<PathBuf>("path")
                .cloned()
                .unwrap_or_default(),
        ),
        Some(("legacy-disable", _)) => CommandType::LegacyDisable,
        Some(("legacy-enable", _)) => CommandType::LegacyEnable,
        Some(("config", sub_m)) => match sub_m.subcommand() {
            Some(("init", init_m)) => CommandType::ConfigInit {
                force: init_m.get_flag("force"),
            },
            Some(("path", _)) => CommandType::ConfigPath,
            _ => CommandType::ConfigShow,
        },
        // subcommand_required(true) keeps this unreachable in practice
        _ => CommandType::Status,
    };

    ParsedCommand {
        command,
        config_file: matches.get_one::<PathBuf>("config").cloned(),
        output_format: matches.get_one::<OutputFormat>("format").copied(),
        verbosity: matches.get_count("verbose"),
        no_open: matches.get_flag("no-open"),
    }
}

/// Build the full command tree
pub fn build_cli() -> Command {
    Command::new("macrepair")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Allow apps from anywhere and repair \"damaged\" apps on macOS")
        .long_about(
            "Runs the macOS Gatekeeper and quarantine tools with administrator rights. \
             Commands that change system settings prompt for your login password.",
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true)
                .help("Use a specific configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(clap::builder::ValueParser::new(parse_output_format))
                .global(true)
                .help("Output format (text, json)"),
        )
        .arg(
            Arg::new("no-open")
                .long("no-open")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Do not open System Settings when confirmation is required"),
        )
        .subcommand(
            Command::new("enable-any-source")
                .about("Allow apps from anywhere (spctl --global-disable)")
                .long_about(
                    "Disables Gatekeeper assessments. On recent macOS versions the change \
                     must then be confirmed under System Settings > Privacy & Security.",
                ),
        )
        .subcommand(
            Command::new("restore-gatekeeper")
                .about("Restore the default Gatekeeper policy (spctl --global-enable)"),
        )
        .subcommand(Command::new("status").about("Show whether Gatekeeper assessments are enabled"))
        .subcommand(Command::new("open-settings").about("Open Privacy & Security settings"))
        .subcommand(
            Command::new("fix-app")
                .about("Remove the quarantine attribute from an application")
                .long_about(
                    "Repairs apps that macOS reports as \"damaged and can't be opened\" by \
                     recursively removing the com.apple.quarantine attribute.",
                )
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Path to the .app bundle"),
                ),
        )
        .subcommand(
            Command::new("legacy-disable")
                .about("Allow apps from anywhere on older systems (spctl --master-disable)"),
        )
        .subcommand(
            Command::new("legacy-enable")
                .about("Restore Gatekeeper on older systems (spctl --master-enable)"),
        )
        .subcommand(
            Command::new("config")
                .about("Manage configuration")
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(
                    Command::new("init")
                        .about("Write a default configuration file")
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Overwrite an existing file"),
                        ),
                )
                .subcommand(Command::new("path").about("Print the configuration file location")),
        )
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_parse_fix_app_with_global_flags() {
        let parser = ClapCommandParser::new();
        let parsed = parser
            .parse_args(["macrepair", "fix-app", "/Applications/Foo.app", "-vv", "--no-open"])
            .unwrap();

        assert_eq!(
            parsed.command,
            CommandType::FixApp(PathBuf::from("/Applications/Foo.app"))
        );
        assert_eq!(parsed.verbosity, 2);
        assert!(parsed.no_open);
        assert_eq!(parsed.config_file, None);
    }

    #[test]
    fn test_parse_config_subcommands() {
        let parser = ClapCommandParser::new();

        let parsed = parser.parse_args(["macrepair", "config"]).unwrap();
        assert_eq!(parsed.command, CommandType::ConfigShow);

        let parsed = parser
            .parse_args(["macrepair", "--config", "/tmp/m.toml", "config", "init", "--force"])
            .unwrap();
        assert_eq!(parsed.command, CommandType::ConfigInit { force: true });
        assert_eq!(parsed.config_file, Some(PathBuf::from("/tmp/m.toml")));
    }

    #[test]
    fn test_parse_output_format() {
        let parser = ClapCommandParser::new();
        let parsed = parser.parse_args(["macrepair", "status", "--format", "json"]).unwrap();
        assert_eq!(parsed.output_format, Some(OutputFormat::Json));

        assert!(parser.parse_args(["macrepair", "status", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_fix_app_requires_path() {
        let parser = ClapCommandParser::new();
        assert!(parser.parse_args(["macrepair", "fix-app"]).is_err());
    }
}
