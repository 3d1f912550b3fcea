// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

mod script;

use anyhow::Result;
use clap::Parser;
use meetpoint::fixtures::{FixtureGeocoder, FixturePlaceSearch};
use meetpoint::{EngineError, SessionHandle, spawn_session};
use script::{Script, Step};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a scripted meeting session against fixture services", long_about = None)]
struct Args {
    /// JSON script with geocodes, place pages and steps.
    #[arg(long, env = "MEETPOINT_SCRIPT")]
    script: PathBuf,

    /// Overrides the script's margin ratio.
    #[arg(long, env = "MEETPOINT_MARGIN_RATIO")]
    margin_ratio: Option<f64>,

    /// Overrides the script's delay between result pages.
    #[arg(long, env = "MEETPOINT_PAGE_DELAY_MS")]
    page_delay_ms: Option<u64>,

    /// Simulated latency of every place search.
    #[arg(long, default_value_t = 0)]
    search_latency_ms: u64,

    /// Log at debug level.
    #[arg(long, short)]
    verbose: bool,
}

fn emit(kind: &str, data: serde_json::Value) {
    println!("{}", json!({ "kind": kind, "data": data }));
}

// prints every places publication and notice until the session goes away
fn spawn_printer(handle: &SessionHandle) -> tokio::task::JoinHandle<()> {
    let mut places = handle.subscribe_places();
    let mut notices = handle.subscribe_notices();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = places.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = places.borrow_and_update().clone();
                    emit("places", json!(*current));
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => emit("notice", json!(format!("{:?}", notice))),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("printer lagged behind by {} notices", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

async fn run_step(handle: &SessionHandle, step: &Step) -> Result<(), EngineError> {
    let aggregates = match step.clone() {
        Step::AddAddress { id, address } => handle.add_address(id, address).await?,
        Step::UpdateAddress { id, address } => handle.update_address(id, address).await?,
        Step::Upsert { id, lat, lng } => handle.update_point(id, lat, lng).await?,
        Step::Put { point } => handle.put_point(point).await?,
        Step::Remove { id } => handle.remove_point(id).await?,
        Step::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            return Ok(());
        }
    };

    emit("aggregates", json!(*aggregates));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let mut script = Script::load(&args.script)?;
    if let Some(margin_ratio) = args.margin_ratio {
        script.config.margin_ratio = margin_ratio;
    }
    if let Some(page_delay_ms) = args.page_delay_ms {
        script.config.page_delay_ms = page_delay_ms;
    }

    let geocoder = Arc::new(FixtureGeocoder::new(script.geocodes.clone()));
    let search = Arc::new(
        FixturePlaceSearch::new(script.places.clone())
            .with_latency(Duration::from_millis(args.search_latency_ms)),
    );

    let (handle, session) = spawn_session(&script.session_id, &script.config, geocoder, search)?;
    let printer = spawn_printer(&handle);

    tracing::info!(
        "replaying {} steps for session {}",
        script.steps.len(),
        script.session_id
    );

    for step in &script.steps {
        if let Err(e) = run_step(&handle, step).await {
            // geocode failures are part of a replay, not the end of it
            emit("error", json!(e.to_string()));
        }
    }

    emit(
        "final",
        json!({
            "aggregates": *handle.aggregates(),
            "places": *handle.places(),
        }),
    );

    handle.shutdown().await;
    session.await?;
    drop(handle);
    printer.await?;

    Ok(())
}
