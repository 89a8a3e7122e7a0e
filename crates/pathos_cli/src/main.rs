use anyhow::{Context, Result};
use clap::Parser;
use pathos_core::config::{PathosConfig, SessionBackend};
use pathos_core::persona::{PersonaDelta, PersonaProfile};
use pathos_limbic::ReflectionRecord;
use pathos_reasoning::ConversationEngine;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "PATHOS_CONFIG", default_value = "pathos.toml")]
    config: PathBuf,

    /// Persona preset (neutral, calm_therapist, supportive_friend, analytical_scientist)
    #[arg(short, long)]
    persona: Option<String>,

    /// LLM provider override (ollama, openai, mock)
    #[arg(long)]
    provider: Option<String>,

    /// Model override
    #[arg(short, long)]
    model: Option<String>,

    /// Persist sessions to this SQLite database
    #[arg(long)]
    db: Option<String>,

    /// Conversation id; reuse one to resume a stored conversation
    #[arg(long)]
    conversation: Option<String>,

    /// Print the self-reflection after every reply
    #[arg(long)]
    show_reflection: bool,

    /// Answer a single message and exit
    #[arg(long)]
    once: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Also write daily-rotated JSON logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_logging(json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pathos.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let plain = (!json).then(|| fmt::layer().with_writer(std::io::stderr));
    let structured = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .with(file_layer)
        .init();
    guard
}

fn build_config(args: &Args) -> Result<PathosConfig> {
    // A config file that exists must be valid; a missing one means defaults.
    let mut config = if args.config.exists() {
        PathosConfig::load(&args.config)?
    } else {
        PathosConfig::load_or_default(&args.config)
    };

    if let Some(name) = &args.persona {
        config.persona = PersonaProfile::preset(name).with_context(|| {
            format!(
                "Unknown persona '{}' (available: {})",
                name,
                PersonaProfile::preset_names().join(", ")
            )
        })?;
    }
    if let Some(provider) = &args.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }
    if let Some(db) = &args.db {
        config.session.backend = SessionBackend::Sqlite;
        config.session.db_path = db.clone();
    }
    Ok(config)
}

fn print_reflection(reflection: &ReflectionRecord) {
    println!("  [reflection] {}", reflection.reasoning);
}

const HELP: &str = "\
Commands:
  /mood                 current mood, neurochemistry and bond
  /history              recent mood samples
  /reflect              toggle reflection output
  /persona <preset>     switch persona preset
  /adjust <o> <e> <c>   nudge persona optimism/energy/confidence
  /state                dump the session as JSON
  /quit                 exit";

async fn handle_command(
    engine: &ConversationEngine,
    conversation: &str,
    line: &str,
    show_reflection: &mut bool,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    match cmd {
        "/quit" | "/exit" => return Ok(false),
        "/help" => println!("{}", HELP),
        "/reflect" => {
            *show_reflection = !*show_reflection;
            println!("Reflection output {}.", if *show_reflection { "on" } else { "off" });
        }
        "/mood" => match engine.session_snapshot(conversation).await {
            Some(s) => {
                let [p, a, d] = s.mood.describe_axes();
                println!("Mood: {} ({}; {}; {})", s.mood.label(), p, a, d);
                println!(
                    "Neurochemistry: dopamine {:.2}, serotonin {:.2}, noradrenaline {:.2}",
                    s.neuro.dopamine, s.neuro.serotonin, s.neuro.noradrenaline
                );
                println!("Bond: {:.2} ({})", s.attachment.bond, s.attachment.band());
            }
            None => println!("No turns yet."),
        },
        "/history" => match engine.session_snapshot(conversation).await {
            Some(s) => {
                for sample in s.history.iter().rev().take(10) {
                    println!(
                        "  turn {:>3}: {:<10} P={:+.2} A={:+.2} D={:+.2} ({})",
                        sample.turn,
                        sample.mood.label(),
                        sample.mood.pleasure,
                        sample.mood.arousal,
                        sample.mood.dominance,
                        sample.emotion
                    );
                }
            }
            None => println!("No turns yet."),
        },
        "/persona" => match parts.next().and_then(PersonaProfile::preset) {
            Some(profile) => match engine.set_persona(conversation, profile).await {
                Ok(()) => println!("Persona switched."),
                Err(e) => println!("Rejected: {}", e),
            },
            None => println!("Available: {}", PersonaProfile::preset_names().join(", ")),
        },
        "/adjust" => {
            let values: Vec<f32> = parts.filter_map(|v| v.parse().ok()).collect();
            if let [optimism, energy, confidence] = values[..] {
                let delta = PersonaDelta {
                    optimism,
                    energy,
                    confidence,
                };
                match engine.adjust_persona(conversation, delta).await {
                    Ok(b) => println!(
                        "Persona bias: optimism {:+.2}, energy {:+.2}, confidence {:+.2}",
                        b.optimism, b.energy, b.confidence
                    ),
                    Err(e) => println!("Rejected: {}", e),
                }
            } else {
                println!("Usage: /adjust <optimism> <energy> <confidence>");
            }
        }
        "/state" => match engine.session_snapshot(conversation).await {
            Some(s) => println!("{}", serde_json::to_string_pretty(&s)?),
            None => println!("No turns yet."),
        },
        other => println!("Unknown command {}. Type /help.", other),
    }
    Ok(true)
}

async fn run_repl(engine: &ConversationEngine, conversation: &str, mut show_reflection: bool) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history_path = dirs::data_dir().map(|d| d.join("pathos").join("history.txt"));
    if let Some(path) = &history_path {
        let _ = rl.load_history(path);
    }

    println!(
        "Pathos online (conversation {}, provider {}). Type /help for commands, /quit to exit.",
        conversation,
        engine.provider_name()
    );

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        if trimmed.starts_with('/') {
            if !handle_command(engine, conversation, trimmed, &mut show_reflection).await? {
                break;
            }
            continue;
        }

        let result = engine.submit_turn(conversation, trimmed).await;
        println!("\nPathos: {}\n", result.reply_text);
        if show_reflection {
            print_reflection(&result.reflection);
        }
    }

    if let Some(path) = &history_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_logging(args.log_json, args.log_dir.as_deref());

    let config = build_config(&args)?;
    info!(
        persona = %config.persona.name,
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Initializing Pathos"
    );
    let engine = ConversationEngine::from_config(config).await?;

    let conversation = args
        .conversation
        .clone()
        .unwrap_or_else(|| format!("cli-{}", uuid::Uuid::new_v4()));

    match &args.once {
        Some(message) => {
            let result = engine.submit_turn(&conversation, message).await;
            println!("{}", result.reply_text);
            if args.show_reflection {
                print_reflection(&result.reflection);
            }
        }
        None => run_repl(&engine, &conversation, args.show_reflection).await?,
    }

    let unsaved = engine.flush().await;
    if unsaved > 0 {
        eprintln!("Warning: {} session(s) could not be saved.", unsaved);
    }
    Ok(())
}
