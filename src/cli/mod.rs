// Command-line front end for the maintenance operations

pub mod config;
pub mod error;
pub mod handlers;
pub mod output;
pub mod parser;
pub mod types;

pub use error::{CLIError, CLIResult};
pub use types::*;

pub use handlers::{
    completion_exit_code, error_exit_code, exit_code, CommandHandler, CredentialSource,
    HandlerReport, TerminalPrompt,
};
pub use output::OutputFormatter;
pub use parser::{build_cli, ClapCommandParser};

/// Run a parsed command to completion.
///
/// Configuration commands are served here; everything else goes through a
/// [`CommandHandler`].
pub async fn run(parsed: ParsedCommand) -> CLIResult<HandlerReport> {
    match &parsed.command {
        CommandType::ConfigPath => {
            let path = match &parsed.config_file {
                Some(path) => path.clone(),
                None => config::default_config_path()?,
            };
            Ok(HandlerReport {
                output: path.display().to_string(),
                exit_code: exit_code::SUCCESS,
            })
        }
        CommandType::ConfigInit { force } => {
            let path = config::init_config(parsed.config_file.clone(), *force).await?;
            Ok(HandlerReport {
                output: format!("Wrote {}", path.display()),
                exit_code: exit_code::SUCCESS,
            })
        }
        CommandType::ConfigShow => {
            let app_config = config::load_config(parsed.config_file.clone()).await?;
            let formatter =
                OutputFormatter::new(parsed.output_format.unwrap_or(app_config.output_format));
            Ok(HandlerReport {
                output: formatter.format_config(&app_config)?,
                exit_code: exit_code::SUCCESS,
            })
        }
        command => {
            let app_config = config::load_config(parsed.config_file.clone()).await?;
            let formatter =
                OutputFormatter::new(parsed.output_format.unwrap_or(app_config.output_format));
            let open_settings = app_config.auto_open_settings && !parsed.no_open;
            CommandHandler::new(&app_config, formatter, open_settings)
                .run(command.clone())
                .await
        }
    }
}
