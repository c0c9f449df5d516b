use std::time::Duration;

use mecab_rs::{LifecycleEvent, Mecab, MecabConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mecab_rs=info")),
        )
        .init();

    let config = MecabConfig::default()
        .with_retry_delay(Duration::from_secs(2))
        .with_max_attempts(3);
    let mecab = Mecab::native(config)?;

    let mut events = mecab.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let LifecycleEvent::Failed { attempt, error, .. } = event {
                eprintln!("attempt {attempt} failed: {error}");
            }
        }
    });

    if let Some(loader) = mecab.start() {
        loader.await??;
    }
    mecab.wait_ready().await?;
    println!("mecab {}", mecab.version().unwrap_or_else(|| "(unknown version)".to_string()));

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "すもももももももものうち".to_string());
    let result = mecab.analyze(&text).await?;
    for token in &result.recognized {
        println!(
            "{}\t{}\t{}\t{}",
            token.surface,
            token.part_of_speech(),
            token.dictionary_form(),
            token.reading()
        );
    }
    for segment in &result.unrecognized {
        println!("?\t{segment}");
    }

    mecab.shutdown().await?;
    Ok(())
}
