use anyhow::{Context, Result};
use clap::Parser;
use policyscope_core::error::{EXIT_CONFIG, EXIT_INTERRUPTED};
use policyscope_core::{
    Reporter, Retriever, RetrieverConfig, RetrieverError, SecretSource, TenantSettings,
    TerminalPrompt, TerminalState,
};
use std::future::Future;
use std::io::Stdout;

/// Lists CyberArk Secure Cloud Access and Secure Infrastructure Access policies.
///
/// Reads CYBERARK_IDENTITY_TENANT_ID, CYBERARK_SUBDOMAIN and CYBERARK_CLIENT_ID
/// from the environment (or a .env file) and prompts for the client secret.
#[derive(Parser, Debug)]
#[command(name = "policyscope")]
#[command(version)]
struct Cli {}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _cli = Cli::parse();

    // Real environment variables take precedence over .env entries
    let dotenv = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    match &dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    // Everything holding the secret is dropped inside `run` before exiting
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n[ERROR] {:#}", e);
            EXIT_CONFIG
        }
    };

    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let mut reporter = Reporter::new(std::io::stdout());
    reporter.banner().context("Failed to write report")?;

    // Checked before prompting so an incomplete environment never asks for the secret
    let settings = match TenantSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => return Ok(abort(&e)),
    };

    let terminal = TerminalState::capture();
    let config = match prompt_secret(settings, TerminalPrompt, tokio::signal::ctrl_c()).await {
        Some(Ok(config)) => config,
        Some(Err(e)) => return Ok(abort(&e)),
        None => {
            // The prompt thread is still blocked with echo off
            terminal.restore();
            return Ok(interrupted());
        }
    };

    tracing::debug!(
        tenant = %config.tenant_id,
        subdomain = %config.subdomain,
        timeout_secs = config.http.timeout_secs,
        "configuration loaded"
    );

    let retriever = match Retriever::new(config) {
        Ok(retriever) => retriever,
        Err(e) => return Ok(abort(&e)),
    };
    tracing::debug!(token_url = %retriever.endpoints().token_url, "resolved endpoints");

    reporter.blank_line().context("Failed to write report")?;
    Ok(retrieve(&retriever, &mut reporter).await)
}

/// Read the secret on a blocking thread while watching for an interrupt.
///
/// Returns `None` when `interrupt` fires first. The interrupt future is
/// polled before the prompt starts so a signal can never slip in between.
async fn prompt_secret<S, I>(
    settings: TenantSettings,
    source: S,
    interrupt: I,
) -> Option<policyscope_core::Result<RetrieverConfig>>
where
    S: SecretSource + Send + 'static,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(interrupt);

    tokio::select! {
        biased;
        Ok(()) = &mut interrupt => {
            tracing::info!("Received SIGINT at the secret prompt, aborting");
            None
        }
        joined = async move {
            tokio::task::spawn_blocking(move || settings.with_secret(&source)).await
        } => Some(joined.unwrap_or_else(|e| {
            Err(RetrieverError::ConfigError(format!("Secret prompt failed: {}", e)))
        })),
    }
}

async fn retrieve(retriever: &Retriever, reporter: &mut Reporter<Stdout>) -> i32 {
    tokio::select! {
        outcome = retriever.run(reporter) => match outcome {
            Ok(report) => {
                let code = report.exit_code();
                if code != 0 {
                    eprintln!("\n[ERROR] Neither SCA nor SIA policies could be retrieved");
                }
                code
            }
            Err(e) => abort(&e),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, aborting");
            interrupted()
        }
    }
}

fn interrupted() -> i32 {
    eprintln!("\nInterrupted");
    EXIT_INTERRUPTED
}

/// Print a fatal error and pick its exit code.
fn abort(err: &RetrieverError) -> i32 {
    eprintln!("\n[ERROR] {}", err);
    err.exit_code()
}
