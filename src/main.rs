use clap::error::ErrorKind;
use clap::Parser;
use enterprise_tools::client::HttpTransport;
use enterprise_tools::commands::Cli;
use enterprise_tools::config::CredentialStore;
use enterprise_tools::dispatch::{self, Context};
use enterprise_tools::error::EXIT_CONFIG;
use enterprise_tools::workflow::Report;
use enterprise_tools::ToolsError;
use std::process;
use std::sync::Arc;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => process::exit(usage_exit(&e)),
    };

    if let Err(e) = enterprise_tools::logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: {}", ToolsError::Io(e));
            process::exit(EXIT_CONFIG);
        }
    };

    process::exit(runtime.block_on(run(cli)));
}

/// Print a clap error or help text and pick the exit status
fn usage_exit(e: &clap::Error) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{e}");
            0
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            print!("{e}");
            EXIT_CONFIG
        }
        _ => {
            eprint!("{e}");
            EXIT_CONFIG
        }
    }
}

async fn run(cli: Cli) -> i32 {
    let mut report = Report::new();
    let result = connect(&cli).map(|ctx| (ctx, cli.command));

    let outcome = match result {
        Ok((ctx, command)) => dispatch::run(command, &ctx, &mut report).await,
        Err(e) => Err(e),
    };

    // Partial progress is still reported when a later step failed
    for warning in &report.warnings {
        eprintln!("WARNING: {}", warning);
    }
    for line in &report.lines {
        println!("{}", line);
    }

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            if let Some(hint) = e.remediation() {
                eprintln!("{}", hint);
            }
            e.exit_code()
        }
    }
}

fn connect(cli: &Cli) -> enterprise_tools::Result<Context> {
    let store = CredentialStore::standard(cli.config.as_deref());
    let transport = HttpTransport::new()?;
    Ok(Context::new(store, Arc::new(transport)))
}
