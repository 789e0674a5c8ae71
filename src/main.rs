use anyhow::Result;
use clap::Parser;
use std::time::{Duration, Instant};

use mlflow_prompts::cli::Cli;
use mlflow_prompts::commands;
use mlflow_prompts::error_help;
use mlflow_prompts::signals::{self, INTERRUPTED_EXIT_CODE};
use mlflow_prompts::{
    init_logging, log_command_execution, CallContext, CancelToken, ClientConfig, LogConfig,
    ErrorKind, RegistryClient, RegistryError,
};

/// Budget for the follow-up listing behind "did you mean" suggestions
const SUGGESTION_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Only initialize logging if explicitly requested via env var
    if LogConfig::requested() {
        if let Err(e) = init_logging(LogConfig::from_env()) {
            eprintln!("warning: {:#}", e);
        }
    }

    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let start = Instant::now();
    let command_name = cli.command.name();

    let token = CancelToken::new();
    if let Err(e) = signals::cancel_on_signal(token.clone()) {
        eprintln!("warning: {:#}", e);
    }
    let ctx = CallContext::with_cancel(token);

    let client = match connect() {
        Ok(client) => client,
        Err(e) => {
            eprint!("{}", error_help::render(&e, None, &[]));
            return 1;
        }
    };

    let mut stdout = std::io::stdout();
    let result = commands::run(&client, &ctx, &mut stdout, &cli.command).await;
    log_command_execution(command_name, start.elapsed().as_millis() as u64, &result);

    match result {
        Ok(()) => 0,
        Err(e) => report(&client, &cli, &e).await,
    }
}

fn connect() -> Result<RegistryClient, RegistryError> {
    let config = ClientConfig::load()?;
    RegistryClient::new(&config)
}

/// Print a failed command's error and pick the exit code.
async fn report(client: &RegistryClient, cli: &Cli, err: &anyhow::Error) -> i32 {
    let Some(registry_err) = err.downcast_ref::<RegistryError>() else {
        eprintln!("Error: {:#}", err);
        return 1;
    };

    if registry_err.kind() == ErrorKind::Cancelled || signals::is_shutdown_requested() {
        eprint!("{}", error_help::render(registry_err, None, &[]));
        return INTERRUPTED_EXIT_CODE;
    }

    let prompt_name = cli.command.prompt_name();
    let known = if registry_err.is_not_found() && prompt_name.is_some() {
        let ctx = CallContext::background().with_timeout(SUGGESTION_TIMEOUT);
        commands::known_prompt_names(client, &ctx).await
    } else {
        Vec::new()
    };

    eprint!("{}", error_help::render(registry_err, prompt_name, &known));
    if err.chain().count() > 1 {
        eprintln!("({:#})", err);
    }
    1
}
