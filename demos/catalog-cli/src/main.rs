//! Catalog CLI - browse the event directory from a terminal
//!
//! Loads the catalog from the hosted backend when `SUPABASE_URL` and
//! `SUPABASE_ANON_KEY` are set, otherwise from a small built-in sample.
//!
//! # Running
//!
//! ```bash
//! cargo run -p catalog-cli
//! cargo run -p catalog-cli -- '{"mode":"Online","date":"month"}'
//! cargo run -p catalog-cli -- --metrics
//! ```
//!
//! The optional argument is a filter spec in its JSON wire form.

#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI output

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use techevents_catalog::filter::parse_spec;
use techevents_catalog::mocks::InMemoryBackend;
use techevents_catalog::{
    CatalogBackend, CatalogController, CatalogEnvironment, CatalogSettings, Category, Event,
    FilterSpec,
};
use techevents_core::environment::SystemClock;
use techevents_rest::{RestBackend, RestError};
use techevents_runtime::metrics::MetricsRecorder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,techevents_catalog=info,catalog_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut show_metrics = false;
    let mut spec = FilterSpec::default();
    for arg in std::env::args().skip(1) {
        if arg == "--metrics" {
            show_metrics = true;
        } else {
            spec = parse_spec(&arg).with_context(|| format!("invalid filter spec: {arg}"))?;
        }
    }

    let mut recorder = MetricsRecorder::new();
    recorder.install()?;

    let settings = CatalogSettings::from_env()?;
    let catalog = CatalogController::new(CatalogEnvironment::new(
        backend()?,
        Arc::new(SystemClock),
        settings,
    ));

    let view = catalog.load().await?;
    if let Some(error) = &view.error {
        tracing::warn!(%error, "Catalog loaded with an error");
    }

    let view = if spec.is_unfiltered() {
        view
    } else {
        catalog.set_filter(spec).await?
    };

    println!("== Events ==");
    if view.is_empty_result() {
        println!("  no events match these filters");
    }
    for event in &view.events {
        print_event(event);
    }

    println!();
    println!("== Most viewed ==");
    for event in catalog.top_viewed().await {
        println!("  {:>6} views  {}", event.view_count, event.title);
    }

    let stats = catalog.stats().await;
    println!();
    println!("== Browse ==");
    for category in Category::BROWSABLE {
        println!("  {:<10} {}", category.as_str(), category.count(&stats));
    }
    println!(
        "  {} events, {} platforms, {} views",
        stats.total_events, stats.total_platforms, stats.total_views
    );

    if let Some(text) = recorder.render().filter(|_| show_metrics) {
        println!();
        println!("{text}");
    }

    catalog.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

fn backend() -> anyhow::Result<Arc<dyn CatalogBackend>> {
    match RestBackend::from_env() {
        Ok(backend) => {
            tracing::info!(?backend, "Using hosted backend");
            Ok(Arc::new(backend))
        },
        Err(RestError::MissingConfig(var)) => {
            tracing::info!(missing = var, "Hosted backend not configured, using sample data");
            Ok(Arc::new(sample()))
        },
        Err(e) => Err(e.into()),
    }
}

fn print_event(event: &Event) {
    let themes: Vec<String> = event.theme.iter().map(ToString::to_string).collect();
    println!(
        "  {}  {:<28} {:<8} {:<12} [{}]",
        event.date.format("%Y-%m-%d"),
        event.title,
        event.mode.to_string(),
        event.platform.name,
        themes.join(", ")
    );
}

fn sample() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_platform(json!({ "id": "devfolio", "name": "Devfolio", "logo": "", "color": "#3770FF" }))
        .with_platform(json!({ "id": "unstop", "name": "Unstop", "logo": "", "color": "#1C4980" }))
        .with_platform(json!({ "id": "mlh", "name": "MLH", "logo": "", "color": "#E73427" }))
        .with_event(json!({
            "id": "ethindia", "title": "ETHIndia", "date": "2025-12-05", "end_date": "2025-12-07",
            "created_at": "2025-06-01T00:00:00Z", "mode": "Offline", "theme": ["Web3", "Blockchain"],
            "platform_id": "devfolio", "location": "Bengaluru", "view_count": 1840, "is_popular": true
        }))
        .with_event(json!({
            "id": "build-ai", "title": "Build with AI", "date": "2025-11-15",
            "created_at": "2025-07-12T00:00:00Z", "mode": "Online", "theme": ["AI", "Data Science"],
            "platform_id": "mlh", "view_count": 920, "is_trending": true
        }))
        .with_event(json!({
            "id": "smart-campus", "title": "Smart Campus Hack", "date": "2025-10-30",
            "created_at": "2025-08-03T00:00:00Z", "mode": "Hybrid", "theme": ["IoT", "Sustainability"],
            "platform_id": "unstop", "location": "Pune", "college": "COEP", "view_count": 310
        }))
}
