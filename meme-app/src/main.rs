//! meme-app entry point.

use clap::Parser;
use meme_app::{AppConfig, CliArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,meme_core=debug,meme_app=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    // Use JSON format for log collectors (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from(CliArgs::parse());
    tracing::info!(
        "Replaying {} on a {}x{} canvas",
        config.script.display(),
        config.width,
        config.height
    );

    let report = meme_app::run(&config).await?;

    for outcome in &report.exports {
        if let Some(message) = outcome.user_message() {
            tracing::info!("{}: {}", message.title, message.body);
        }
    }
    tracing::info!(
        "Finished {} steps: {} text, {} image elements, undo depth {}",
        report.steps,
        report.elements.text_elements.len(),
        report.elements.image_elements.len(),
        report.undo_depth
    );
    println!("{}", serde_json::to_string_pretty(&report.elements)?);

    Ok(())
}
