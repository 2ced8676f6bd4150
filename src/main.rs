use anyhow::Result;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agentwatch::config::{Command, Config};
use agentwatch::detect::{format_result, read_input, run_detect};
use agentwatch::replay::{replay_file, ReplayOptions};
use agentwatch_core::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    cli.merge_into(&mut settings);
    settings.validate();

    match cli.command {
        Command::Detect { file, json } => {
            let input = read_input(file.as_deref())?;
            let result = run_detect(&input, &settings);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", format_result(&result));
            }
        }
        Command::Replay {
            file,
            interval_ms,
            repeat,
            id,
            json,
            ..
        } => {
            let mut options = ReplayOptions::from_settings(&settings);
            options.instance_id = id;
            options.repeat = repeat;
            if let Some(ms) = interval_ms {
                options.interval = Duration::from_millis(ms);
            }
            let summary = replay_file(&file, &settings, &options).await?;

            for event in &summary.events {
                if json {
                    println!("{}", serde_json::to_string(event)?);
                } else {
                    println!("{event:?}");
                }
            }
            if let Some(last) = &summary.last {
                if json {
                    println!("{}", serde_json::to_string(last)?);
                } else {
                    println!(
                        "{} ticks, final state: {}{}",
                        summary.ticks,
                        last.state,
                        if last.timed_out {
                            format!(" (timed out: {})", last.timeout_type)
                        } else {
                            String::new()
                        }
                    );
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("agentwatch=debug,agentwatch_core=debug")
    } else {
        EnvFilter::new("agentwatch=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
