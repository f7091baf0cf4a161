//! Record input for a few seconds, save it to disk, then replay it once.
//!
//! Run with: cargo run --example record_and_replay

use macrokit::{MacroPlayer, MacroRecorder, PlaybackOptions, RecorderConfig};
use macrokit_input::{create_resolver, NullResolver, RdevSource, WindowResolver};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let source = Arc::new(RdevSource::new());
    let resolver: Arc<dyn WindowResolver> = match create_resolver() {
        Ok(resolver) => resolver,
        Err(e) => {
            warn!("no window backend on this platform ({e}), recording screen coordinates");
            Arc::new(NullResolver)
        }
    };

    let mut recorder = MacroRecorder::new(Arc::clone(&source) as _, Arc::clone(&resolver));
    let mut events = recorder.event_stream();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            info!(?event.kind, at = ?event.timestamp, "recorded");
        }
    });

    info!("recording for 5 seconds, type and move the mouse...");
    recorder.start("demo", RecorderConfig::default())?;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let sequence = recorder.stop();
    info!(events = sequence.len(), "recording finished");

    let path = std::env::temp_dir().join("macrokit-demo.json");
    sequence.save_to_file(&path)?;
    info!(path = %path.display(), "sequence saved");

    info!("replaying in 2 seconds, hands off the keyboard...");
    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut player = MacroPlayer::new(source, resolver);
    player.play(&sequence, PlaybackOptions::default())?;
    player.wait()?;
    info!("replay finished");
    Ok(())
}
