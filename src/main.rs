mod client;
mod config;
mod error;
mod gateway;
mod history;
mod input;
mod interrupt;
mod progress;
mod render;
mod session;

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use config::{ConfigFile, Overrides, SessionConfig};
use interrupt::Interrupts;
use session::{Exit, Session, Turn};

#[derive(Parser, Debug)]
#[command(
    name = "chatcli",
    about = "A convenient ChatGPT CLI",
    long_about = "chatcli sends a message to an OpenAI-compatible chat API and prints the reply.\n\
                  With -i it keeps a conversation going until Ctrl+D or /quit.",
)]
struct Args {
    /// Message to send (words are joined with spaces)
    text: Vec<String>,

    /// Model alias [GPT3.5, GPT4, GPT4o, or one from the config file]
    #[arg(short = 'p', long, env = "CHATCLI_MODEL")]
    model: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override endpoint URL
    #[arg(long, env = "CHATCLI_ENDPOINT")]
    endpoint: Option<String>,

    /// Profile to use from config file
    #[arg(long, env = "CHATCLI_PROFILE")]
    profile: Option<String>,

    /// Interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Reply style: dark, light or ascii
    #[arg(long)]
    style: Option<String>,

    /// Print replies verbatim, without Markdown styling
    #[arg(long)]
    plain: bool,

    /// Seconds to wait for each reply
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// More log output on stderr (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write a default config file to ~/.config/chatcli/config.toml and exit
    #[arg(long)]
    init: bool,

    /// List available profiles and exit
    #[arg(long)]
    profiles: bool,

    /// Generate shell completions and print to stdout (bash, zsh, fish, elvish)
    #[arg(long, value_name = "SHELL")]
    completions: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // ── --init ────────────────────────────────────────────────────────────────
    if args.init {
        let path = ConfigFile::write_default_if_missing()?;
        println!("Config written to: {}", path.display());
        return Ok(());
    }

    // ── --completions ─────────────────────────────────────────────────────────
    if let Some(shell_name) = &args.completions {
        return generate_completions(shell_name);
    }

    let file = ConfigFile::load()?;

    // ── --profiles ────────────────────────────────────────────────────────────
    if args.profiles {
        print_profiles(&file);
        return Ok(());
    }

    let text = args.text.join(" ");
    if !args.interactive && text.trim().is_empty() {
        Args::command().print_help()?;
        return Ok(());
    }

    let overrides = Overrides {
        profile: args.profile.as_deref(),
        endpoint: args.endpoint.as_deref(),
        model: args.model.as_deref(),
        api_key: args.api_key.as_deref(),
        style: args.style.as_deref(),
        plain: args.plain,
        timeout_secs: args.timeout,
    };
    let config = match SessionConfig::resolve(&file, &overrides) {
        Ok(resolved) => SessionConfig {
            show_progress: std::io::stderr().is_terminal(),
            ..resolved
        },
        Err(e) => {
            eprintln!("✗ {e}");
            std::process::exit(1);
        }
    };

    let mut client = client::Client::new(config.endpoint.clone());
    client.set_api_key(config.api_key.clone());
    let backend = Arc::new(client);

    let mut interrupts = Interrupts::ctrl_c();
    let mut session = Session::new(&config, backend, std::io::stdout(), std::io::stderr());

    // ── Single-message mode ───────────────────────────────────────────────────
    if !args.interactive {
        let turn = session.send(text, &mut interrupts).await?;
        if turn != Turn::Replied {
            std::process::exit(1);
        }
        return Ok(());
    }

    // ── Interactive mode ──────────────────────────────────────────────────────
    println!("Interactive mode. Ctrl+C to quit.");
    println!("  {}  ·  {}", config.profile_name, config.model_alias);
    println!("  Start a line with ` for a multi-line message, end it with ` to send.");
    println!();

    if !text.trim().is_empty() {
        session.send(text, &mut interrupts).await?;
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let exit = session.run(&mut lines, &mut interrupts).await?;
    tracing::debug!(?exit, turns = session.history().len(), "session ended");

    if exit == Exit::Interrupted {
        std::process::exit(130);
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info,chatcli=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CHATCLI_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Profiles listing ──────────────────────────────────────────────────────────

fn print_profiles(file: &ConfigFile) {
    let mut entries: Vec<(&String, &config::Profile)> = file.profiles.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    println!();
    println!("  Profiles");
    for (name, p) in &entries {
        let marker = if **name == file.default_profile { " ←" } else { "" };
        println!("  {name}{marker}");
        println!("    endpoint  {}", p.endpoint);
        println!("    model     {}", p.model);
        println!("    timeout   {}s", p.timeout_secs);
        println!();
    }
}

// ── Shell completions ─────────────────────────────────────────────────────────

fn generate_completions(shell_name: &str) -> Result<()> {
    use clap_complete::{Shell, generate};

    let shell: Shell = match shell_name.to_lowercase().as_str() {
        "bash"    => Shell::Bash,
        "zsh"     => Shell::Zsh,
        "fish"    => Shell::Fish,
        "elvish"  => Shell::Elvish,
        _ => {
            eprintln!("Unknown shell: {shell_name}");
            eprintln!("Supported: bash, zsh, fish, elvish");
            std::process::exit(1);
        }
    };

    let mut cmd = Args::command();
    generate(shell, &mut cmd, "chatcli", &mut std::io::stdout());
    Ok(())
}
