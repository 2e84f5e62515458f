use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use waav_voice_session::core::transport::{HttpSignalingClient, loopback::LoopbackKit};
use waav_voice_session::{SessionConfig, SessionSnapshot, VoiceSession};

/// Key used for replays when no real credentials are configured
const REPLAY_PLACEHOLDER_KEY: &str = "sk-replay-placeholder";

/// WaaV Voice Session - realtime speech-to-speech session tooling
#[derive(Parser, Debug)]
#[command(name = "waav-voice-session")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run recorded wire events through a session on the loopback transport
    Replay {
        /// JSON Lines file, one server event per line
        file: PathBuf,
    },

    /// Validate configuration and print a redacted summary
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        info!("Loading configuration from {}", config_path.display());
        SessionConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        SessionConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command {
        Commands::CheckConfig => {
            for line in config.summary() {
                println!("{line}");
            }
            if let Err(e) = config.validate_credentials() {
                println!("warning: {e}");
            }
            let signaling = HttpSignalingClient::from_config(&config)
                .map_err(|e| anyhow!(e.to_string()))?;
            println!("signaling endpoint: {}", signaling.endpoint());
            Ok(())
        }
        Commands::Replay { file } => replay(config, &file).await,
    }
}

/// One line of a replay file.
enum ReplayStep {
    /// Deliver the raw line as an inbound data-channel message
    Event { event_type: String, raw: String },
    /// `{"sleep_ms": N}` lets timers run
    Sleep(Duration),
}

fn parse_replay(contents: &str) -> anyhow::Result<Vec<ReplayStep>> {
    let mut steps = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| anyhow!("line {}: invalid JSON: {}", index + 1, e))?;

        if let Some(ms) = value.get("sleep_ms").and_then(|v| v.as_u64()) {
            steps.push(ReplayStep::Sleep(Duration::from_millis(ms)));
            continue;
        }

        let event_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("line {}: event without a \"type\" field", index + 1))?;
        steps.push(ReplayStep::Event {
            event_type: event_type.to_string(),
            raw: line.to_string(),
        });
    }
    Ok(steps)
}

async fn replay(mut config: SessionConfig, file: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| anyhow!("Failed to read {}: {}", file.display(), e))?;
    let steps = parse_replay(&contents)?;

    if config.validate_credentials().is_err() {
        debug!("No API key configured, replaying with a placeholder");
        config = config.with_api_key(REPLAY_PLACEHOLDER_KEY);
    }
    let settle = config.timing.transcript_debounce + config.timing.assistant_gate_retry;

    let kit = LoopbackKit::new();
    let handle = kit.handle();
    let session = VoiceSession::new(config, kit.collaborators());

    session
        .start_conversation()
        .await
        .map_err(|e| anyhow!("Failed to start session: {}", e))?;

    let mut last = session.snapshot().await?;
    println!("connection: {}", last.connection);

    for step in steps {
        match step {
            ReplayStep::Sleep(delay) => tokio::time::sleep(delay).await,
            ReplayStep::Event { event_type, raw } => {
                if !handle.inject(raw) {
                    return Err(anyhow!("Loopback transport is gone"));
                }
                let next = session.snapshot().await?;
                print_changes(&event_type, &last, &next);
                last = next;
            }
        }
    }

    // Let debounced and gated transcript flushes land
    tokio::time::sleep(settle * 2).await;
    let last = session.snapshot().await?;

    println!();
    println!("transcript:");
    for item in &last.transcript {
        let marker = if item.is_final { "" } else { " (partial)" };
        println!("  [{}] {}: {}{}", item.id, item.role, item.text, marker);
    }
    if let Some(error) = &last.error {
        println!("error: {}", error.message);
    }

    session.stop().await;
    Ok(())
}

fn print_changes(event_type: &str, before: &SessionSnapshot, after: &SessionSnapshot) {
    if before.conversation != after.conversation {
        println!(
            "{event_type}: {} -> {} (level {:.1})",
            before.conversation,
            after.conversation,
            after.amplitude()
        );
    }
    if before.connection != after.connection {
        println!(
            "{event_type}: connection {} -> {}",
            before.connection, after.connection
        );
    }
    if before.warning != after.warning
        && let Some(warning) = &after.warning
    {
        println!("{event_type}: warning: {}", warning.message);
    }
    if before.error != after.error
        && let Some(error) = &after.error
    {
        println!("{event_type}: error: {}", error.message);
    }
}
