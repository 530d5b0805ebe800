use std::sync::Arc;

use genstream_core::content::ContentKind;
use genstream_core::error::CoreError;
use genstream_core::generation::GenerationRequest;
use genstream_core::tiers::{SubscriptionTier, TierLimits};
use genstream_events::PlatformEvent;
use genstream_pipeline::{
    Catalog, EngineConfig, GenerationService, InMemoryCatalog, MockSynthesizer,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genstream_worker=debug,genstream_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env();
    let tier = worker_tier();
    tracing::info!(
        steps = config.steps,
        step_interval_ms = config.step_interval.as_millis() as u64,
        merge_interval_ms = config.merge_interval.as_millis() as u64,
        ?tier,
        "Loaded engine configuration",
    );

    // --- Generation service ---
    let catalog = Arc::new(InMemoryCatalog::new());
    let service = Arc::new(GenerationService::new(
        config,
        catalog.clone(),
        Arc::new(MockSynthesizer::default()),
    ));
    service.start();

    // --- Event observer ---
    let mut events = service.subscribe();
    let observer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event observer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tracing::info!("Worker ready. Enter `<video|music> <style> <duration_secs> <prompt>`, `list`, `catalog`, or `quit`");

    tokio::select! {
        () = read_commands(&service, &catalog, tier) => {
            tracing::info!("Input closed, starting graceful shutdown");
        }
        () = shutdown_signal() => {}
    }

    service.shutdown().await;
    observer.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Plan used for every submission, from `WORKER_TIER` (default premium).
fn worker_tier() -> SubscriptionTier {
    match std::env::var("WORKER_TIER") {
        Ok(raw) => raw.parse().unwrap_or_else(|e: CoreError| {
            tracing::warn!(error = %e, "Invalid WORKER_TIER, using premium");
            SubscriptionTier::Premium
        }),
        Err(_) => SubscriptionTier::Premium,
    }
}

/// Process stdin lines until EOF or `quit`.
async fn read_commands(service: &GenerationService, catalog: &InMemoryCatalog, tier: SubscriptionTier) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                return;
            }
        };

        match line.trim() {
            "" => {}
            "quit" | "exit" => return,
            "list" => {
                for job in service.list_jobs().await {
                    match serde_json::to_string(&job) {
                        Ok(json) => println!("{json}"),
                        Err(e) => tracing::error!(job_id = %job.id, error = %e, "Failed to serialize job"),
                    }
                }
            }
            "catalog" => match catalog.list().await {
                Ok(items) => {
                    for item in items {
                        println!("{}  {}  [{}]", item.id, item.title, item.genre);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to read catalog"),
            },
            command => match parse_request(command) {
                Ok(request) => {
                    let limits = TierLimits::for_tier(tier, request.kind);
                    match service.submit_generation(request, &limits).await {
                        Ok(job_id) => println!("{job_id}"),
                        Err(e) if e.is_client_error() => {
                            tracing::warn!(error = %e, "Submission rejected");
                        }
                        Err(e) => tracing::error!(error = %e, "Submission failed"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Could not parse command"),
            },
        }
    }
}

/// Parse `<kind> <style> <duration_secs> <prompt...>`.
fn parse_request(line: &str) -> Result<GenerationRequest, CoreError> {
    let mut parts = line.splitn(4, char::is_whitespace);
    let (Some(kind), Some(style), Some(duration), Some(prompt)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CoreError::Validation(
            "Expected: <video|music> <style> <duration_secs> <prompt>".to_string(),
        ));
    };

    let kind: ContentKind = kind.parse()?;
    let duration_secs = duration
        .parse()
        .map_err(|_| CoreError::Validation(format!("Invalid duration '{duration}'")))?;
    Ok(GenerationRequest::new(kind, prompt, style, duration_secs))
}

fn log_event(event: &PlatformEvent) {
    tracing::info!(
        event_type = %event.event_type,
        job_id = ?event.job_id,
        content_id = ?event.content_id,
        payload = %event.payload,
        "Event",
    );
}

/// Wait for a termination signal to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
