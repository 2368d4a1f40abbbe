use std::{io::Write as _, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use itinerary_client::{load_settings, SubmissionController, SubmitError};
use shared::domain::FormField;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod view;

use view::{button_label, field_edit, prompt_text, render_itinerary, TITLE};

/// Generate a travel itinerary from a destination, budget and interests.
///
/// Without `--destination` the planner runs as an interactive form.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file (defaults to ./planner.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base url of the itinerary generator.
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    destination: Option<String>,
    #[arg(long, default_value = "")]
    budget: String,
    #[arg(long, default_value = "")]
    interests: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        settings.endpoint_base_url = endpoint;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = Some(timeout_secs);
    }

    let controller = SubmissionController::from_settings(&settings)?;

    match args.destination {
        Some(destination) => {
            controller.set_destination(destination).await;
            controller.set_budget(args.budget).await;
            controller.set_interests(args.interests).await;
            eprintln!("{}", button_label(true));

            let itinerary = submit_or_cancel(&controller)
                .await
                .context("failed to generate itinerary")?;
            println!("{}", render_itinerary(&itinerary));
            Ok(())
        }
        None => run_form(controller).await,
    }
}

/// Ctrl-C while a request is pending cancels it instead of killing the process.
async fn submit_or_cancel(controller: &SubmissionController) -> Result<String, SubmitError> {
    let submit = controller.submit();
    tokio::pin!(submit);

    tokio::select! {
        outcome = &mut submit => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel().await;
            submit.await
        }
    }
}

async fn run_form(controller: Arc<SubmissionController>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{TITLE}");

    loop {
        let form = controller.form().await;

        let Some(destination) = prompt(&mut lines, FormField::Destination, "").await? else {
            break;
        };
        if destination.trim().is_empty() {
            break;
        }
        controller.set_destination(destination).await;

        for field in [FormField::Budget, FormField::Interests] {
            let Some(value) = prompt(&mut lines, field, form.get(field)).await? else {
                return Ok(());
            };
            if let Some(value) = field_edit(&value) {
                controller.set_field(field, value).await;
            }
        }

        println!("[{}]", button_label(true));
        match submit_or_cancel(&controller).await {
            Ok(_) => {}
            Err(err) if err.is_request_failure() => {
                eprintln!("Could not generate an itinerary: {err}");
            }
            Err(err) => eprintln!("{err}"),
        }

        let snapshot = controller.snapshot().await;
        if let Some(itinerary) = snapshot.result {
            println!("{}", render_itinerary(&itinerary));
        }
        println!("[{}]", button_label(snapshot.busy));
    }

    info!("planner closed");
    Ok(())
}

/// `None` on end of input or Ctrl-C.
async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    field: FormField,
    current: &str,
) -> Result<Option<String>> {
    print!("{}", prompt_text(field, current));
    std::io::stdout().flush().context("failed to flush stdout")?;

    tokio::select! {
        line = lines.next_line() => {
            let line = line.context("failed to read from stdin")?;
            Ok(line.map(|line| line.trim_end_matches('\r').to_string()))
        }
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}
