use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stonk_core::domain::analysis::AnalysisRequest;
use stonk_core::llm::anthropic::{AnthropicClient, AnthropicOptions};
use stonk_core::llm::error::ErrorKind;
use stonk_core::llm::prompt;
use stonk_core::requestor::AnalysisRequestor;

mod render;

#[derive(Debug, Parser)]
#[command(name = "stonk", about = "News and sentiment analysis for a stock ticker")]
struct Args {
    /// Ticker to analyze (e.g. AAPL). Reads tickers from stdin when omitted.
    ticker: Option<String>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Print the prompt for TICKER and exit without calling the API.
    #[arg(long, requires = "ticker")]
    print_prompt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = stonk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if args.print_prompt {
        let request = AnalysisRequest::try_new(args.ticker.as_deref().unwrap_or_default())?;
        let text = if AnthropicOptions::from_env().structured_output {
            prompt::structured_prompt(&request.ticker)
        } else {
            prompt::analysis_prompt(&request.ticker)
        };
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    let client = AnthropicClient::from_settings(&settings)?;
    let requestor = Arc::new(AnalysisRequestor::new(Arc::new(client)));

    match args.ticker {
        Some(ticker) => run_once(&requestor, &ticker, args.json).await,
        None => {
            run_interactive(requestor, args.json).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_once(
    requestor: &AnalysisRequestor,
    ticker: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    match requestor.analyze(ticker).await {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render::render_result(&result));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if err.kind != ErrorKind::EmptyInput {
                sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
            }
            eprintln!("{}", render::render_error(&err.message()));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_interactive(requestor: Arc<AnalysisRequestor>, json: bool) -> anyhow::Result<()> {
    let mut rx = requestor.subscribe();
    let renderer = tokio::spawn(async move {
        // Ends once every handle to the requestor is gone.
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if let Some(line) = render::render_state(&snapshot, json) {
                println!("{line}");
            }
        }
    });

    eprintln!("Enter a ticker (e.g. AAPL, TSLA, NVDA). Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        last = Some(requestor.submit(line));
    }

    if let Some(handle) = last {
        if let Err(e) = handle.await {
            tracing::debug!(error = %e, "last analysis did not complete");
        }
    }
    drop(requestor);
    renderer.await.context("renderer task failed")?;
    Ok(())
}

fn init_sentry(settings: &stonk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ticker_and_flags() {
        let args = Args::try_parse_from(["stonk", "aapl", "--json"]).unwrap();
        assert_eq!(args.ticker.as_deref(), Some("aapl"));
        assert!(args.json);
        assert!(!args.print_prompt);
    }

    #[test]
    fn print_prompt_requires_ticker() {
        assert!(Args::try_parse_from(["stonk", "--print-prompt"]).is_err());
        assert!(Args::try_parse_from(["stonk", "msft", "--print-prompt"]).is_ok());
    }

    #[test]
    fn no_arguments_means_interactive() {
        let args = Args::try_parse_from(["stonk"]).unwrap();
        assert!(args.ticker.is_none());
    }
}
