use anyhow::{Context, Result};

use macrepair::cli::{self, error_exit_code, ClapCommandParser};
use macrepair::platform::{detect_macos_version, ensure_supported};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let parsed = match ClapCommandParser::new().parse_args(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    init_logging(parsed.verbosity);

    if parsed.command.needs_macos() {
        ensure_supported().context("This command only works on macOS")?;
        match detect_macos_version() {
            Some(version) => log::info!("macOS {}", version),
            None => log::debug!("Could not determine the macOS version"),
        }
    }

    match cli::run(parsed).await {
        Ok(report) => {
            if !report.output.is_empty() {
                println!("{}", report.output);
            }
            std::process::exit(report.exit_code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(error_exit_code(&e));
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` flags pick the level
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
