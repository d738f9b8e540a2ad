use anyhow::Result;
use clap::Parser;
use museum_registry::RegistryConfig;
use museum_registry::cli::{self, OutputFormat};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    museum_registry::init_tracing();
    let cli_args = cli::Cli::parse();
    let action = cli_args.command.action_label();
    let format = cli_args.format;

    let config = match RegistryConfig::from_args(cli_args.args) {
        Ok(config) => config,
        Err(error) => emit_error_and_exit(action, format, error),
    };
    match cli::run_command(&config, cli_args.command).await {
        Ok(output) => {
            if let Err(error) = cli::output::emit_output(&output, format, cli_args.compact) {
                emit_error_and_exit(action, format, error);
            }
            Ok(())
        }
        Err(error) => emit_error_and_exit(action, format, error),
    }
}

fn emit_error_and_exit(action: &str, format: OutputFormat, error: anyhow::Error) -> ! {
    match format {
        OutputFormat::Text => eprintln!("{}", cli::errors::failure_message(action, &error)),
        OutputFormat::Json => eprintln!("{}", cli::errors::envelope_for(action, &error)),
    }
    std::process::exit(1)
}
