//! ORPHEUS MIND - Unified Entry Point
//!
//! Turn flow: Message → Intents → Evolve → Tone → (Oracle) → Compose → Save

use anyhow::Result;
use clap::Parser;
use orpheus_mind::initiation::{InitiationManager, SystemConfig};
use orpheus_mind::session::{SessionRegistry, TurnReply};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Single message to answer.
    #[arg(long)]
    prompt: Option<String>,

    /// Keep reading messages from stdin.
    #[arg(long)]
    interactive: bool,

    /// Conversation key; state is stored per key.
    #[arg(long, default_value = "default")]
    conversation: String,

    /// Start a new conversation under a random key.
    #[arg(long)]
    fresh: bool,

    /// Config file (TOML).
    #[arg(long, default_value = orpheus_mind::initiation::config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the state directory.
    #[arg(long)]
    data_dir: Option<String>,

    /// Seed for reproducible replies.
    #[arg(long)]
    seed: Option<u64>,

    /// Never call the language model.
    #[arg(long)]
    no_oracle: bool,

    /// Log level (RUST_LOG takes precedence).
    #[arg(long)]
    log_level: Option<String>,

    /// Print each reply as JSON.
    #[arg(long)]
    json: bool,

    /// Show the effective configuration and exit.
    #[arg(long)]
    show_config: bool,
}

fn merge_config_with_args(mut config: SystemConfig, args: &Args) -> SystemConfig {
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.no_oracle {
        config.oracle.enabled = false;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_reply(reply: &TurnReply, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string(reply)?);
    } else {
        println!("\n🎭 Orpheus [{}]:\n{}", reply.mode, reply.reply);
    }
    Ok(())
}

fn run_interactive(registry: &SessionRegistry, conversation: &str, args: &Args) -> Result<()> {
    println!("\n🗣️ Interactive mode - type 'quit' to exit");
    println!("========================================");

    if let Some(initial_prompt) = &args.prompt {
        print_reply(&registry.turn(conversation, initial_prompt), args.json)?;
    }

    loop {
        print!("\n📝 You: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        print_reply(&registry.turn(conversation, input), args.json)?;
    }

    println!("👋 Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = merge_config_with_args(SystemConfig::load_from(&args.config)?, &args);
    init_logging(&config.log_level);

    if args.show_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    ctrlc::set_handler(|| {
        println!("\n👋 Goodbye!");
        std::process::exit(0);
    })?;

    let manager = InitiationManager::new(config)?;
    let registry = manager.init_system()?;

    let conversation = if args.fresh {
        registry.open_new()
    } else {
        args.conversation.clone()
    };
    tracing::info!(%conversation, "conversation ready");

    if args.interactive {
        run_interactive(&registry, &conversation, &args)
    } else {
        let Some(prompt) = &args.prompt else {
            eprintln!("Error: --prompt is required (or use --interactive)");
            std::process::exit(1);
        };
        print_reply(&registry.turn(&conversation, prompt), args.json)
    }
}
