use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use whale_radar_lib::modules::tracker::{
    DispatchEvent, HttpActivitySource, TrackRequest, TrackerConfig, TrackerService,
};
use whale_radar_lib::shared::utils::{init_logger, LogContext};

/// Reads a `TrackRequest` JSON document from stdin and prints the report.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_logger();

    let config = TrackerConfig::from_env().context("Invalid configuration")?;
    let source = Arc::new(HttpActivitySource::new(
        config.require_api_base_url()?,
        config.rate_limit_rps,
    )?);
    let service = TrackerService::with_default_scorer(source.clone(), source, config)?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    let request = TrackRequest::from_json(&input).context("Invalid track request")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received CTRL+C, cancelling run");
                on_interrupt.cancel();
            }
            Err(err) => LogContext::error_with_context(&err, "Failed to listen for CTRL+C"),
        }
    });

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<DispatchEvent>();
    let progress = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            log::debug!(
                "{} {}/{} ({}%): {} {:?}",
                event.phase,
                event.completed,
                event.total,
                event.percentage(),
                event.id,
                event.status
            );
        }
    });

    let report = service
        .track_with_progress(&request, &cancel, &progress_tx)
        .await?;
    drop(progress_tx);
    if let Err(err) = progress.await {
        LogContext::error_with_context(&err, "Progress reporter stopped abnormally");
    }

    println!("{}", report.to_json()?);

    if report.cancelled {
        log::warn!("Run was cancelled; report is partial");
    }
    Ok(())
}
