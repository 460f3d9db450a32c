mod api;
mod cli;
mod config;
mod session;
mod transcript;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tdo", about = "A to-do list client for the 4Geeks playground API")]
pub struct Args {
    #[arg(short, long, help = "One-shot mode: run a single command line and exit")]
    pub command: Option<String>,

    #[arg(short, long, help = "Create or open this user at startup")]
    pub user: Option<String>,

    #[arg(long, env = "TDO_BASE_URL", help = "Service base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Auto-approve confirmation prompts")]
    pub yes: bool,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session transcripts directory")]
    pub transcripts_dir: Option<PathBuf>,

    #[arg(long, help = "Debug output (print HTTP requests)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_default()
    };

    // Precedence: flag (or TDO_BASE_URL via clap) > config file > built-in.
    let base_url = args
        .base_url
        .clone()
        .or_else(|| cfg.base_url.clone())
        .unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string());

    let transcripts_dir = args
        .transcripts_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(".tdo").join("sessions"));
    std::fs::create_dir_all(&transcripts_dir)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let transcript_path = transcripts_dir.join(format!("{}.jsonl", session_id));
    let transcript = transcript::Transcript::new(&transcript_path, &session_id, &base_url)?;

    let api = api::Client::new(&base_url, args.debug);
    let auto_yes = args.yes || cfg.auto_confirm;
    let startup_user = args.user.clone().or_else(|| cfg.username.clone());

    let ctx = cli::Context {
        args,
        api,
        session: RefCell::new(session::Session::new()),
        transcript: RefCell::new(transcript),
        session_id,
        auto_yes,
    };

    let _ = ctx.transcript.borrow_mut().session_start();

    if let Some(name) = &startup_user {
        cli::open_user(&ctx, name);
    }

    if let Some(line) = ctx.args.command.clone() {
        cli::run_once(&ctx, &line)
    } else {
        cli::run_repl(ctx)
    }
}
