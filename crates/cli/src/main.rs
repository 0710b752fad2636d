use anyhow::{Context, Result};
use clap::Parser;
use snapcircle_core::{Config, SnapCircle, ViewMode, init, presentation};
use std::env;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,

    /// Print the most recent captures and exit
    #[arg(long, value_name = "N", num_args = 0..=1)]
    history: Option<Option<usize>>,

    /// Check that the analysis relay is reachable and exit
    #[arg(long)]
    check: bool,

    /// Override the relay URL defined in .env
    #[arg(long, value_name = "URL")]
    relay_url: Option<String>,

    /// Override the analysis timeout, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Copy the result to clipboard when the overlay closes
    #[arg(short, long, default_value_t = false)]
    copy: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    init();
    let args = Args::parse();

    // Command line flags win over the environment
    let relay_url = args.relay_url.clone();
    let timeout = args.timeout.map(|secs| secs.to_string());
    let config = Config::from_lookup(|key| match key {
        "SNAPCIRCLE_RELAY_URL" if relay_url.is_some() => relay_url.clone(),
        "SNAPCIRCLE_TIMEOUT_SECS" if timeout.is_some() => timeout.clone(),
        _ => env::var(key).ok(),
    })
    .context("Failed to load configuration")?;

    // History and relay checks must work without a display
    let app = SnapCircle::with_config(config);

    if let Some(limit) = args.history {
        let limit = limit.unwrap_or(app.config().history_limit);
        let records = app.history(limit).context("Failed to read capture history")?;
        if records.is_empty() {
            println!("No captures yet");
        }
        for record in records {
            println!("#{} {} {}", record.id, record.timestamp, record.image_path);
            match record.result() {
                Ok(result) => {
                    println!("{}", presentation::render(&result, ViewMode::Summarize).to_plain_text())
                }
                Err(e) => log::warn!("Record {} has an unreadable result: {}", record.id, e),
            }
            println!();
        }
        return Ok(());
    }

    let relay = app.config().relay_url.clone();
    if args.check {
        app.check_relay()
            .await
            .with_context(|| format!("Relay at {} is not healthy", relay))?;
        println!("Relay at {} is healthy", relay);
        return Ok(());
    }

    if args.list_monitors {
        let monitors = app
            .list_monitors()
            .context("Failed to initialize screen capturer")?;
        println!("Available monitors:");
        for info in monitors {
            println!("{}", info);
        }
        return Ok(());
    }

    if let Err(e) = app.check_relay().await {
        log::warn!("Relay check failed, captures will likely fail: {}", e);
    }

    // The overlay runs its own event loop; keep it off the async workers
    let result = tokio::task::block_in_place(|| app.run_interactive())
        .context("Failed to run capture overlay")?;

    match result {
        Some(result) => {
            let text = presentation::render(&result, ViewMode::Overview).to_plain_text();
            println!("{}", text);

            if args.copy {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(text) {
                            eprintln!("Warning: Failed to copy to clipboard: {}", e);
                        } else {
                            println!("(Copied to clipboard)");
                        }
                    }
                    Err(e) => eprintln!("Warning: Could not access clipboard: {}", e),
                }
            }
        }
        None => println!("Selection cancelled"),
    }

    Ok(())
}
