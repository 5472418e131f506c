use std::env;
use std::io::{stdin, IsTerminal};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use bank_cli::command::{self, Command};
use bank_cli::config::ConfigLoad;
use bank_cli::directory::InMemoryDirectory;
use bank_cli::logging;
use bank_cli::session::Session;
use clap::Parser;
use log::info;

#[derive(Debug, Parser)]
#[command(version, author, about = "Core banking engine CLI")]
pub struct Args {
    /// Configuration file path (JSON).
    #[clap(short = 'c', long = "config", default_value = "config/bank.json")]
    config: String,

    #[clap(long = "log-level", default_value = "info")]
    log_level: String,

    #[clap(short = 'n', long, help = "Force non-interactive mode")]
    non_interactive: bool,

    #[clap(long, help = "A single REPL-style command to run non-interactively")]
    query: Option<String>,

    #[clap(subcommand)]
    cmd: Option<Command>,
}

#[tokio::main]
pub async fn main() -> Result<()> {
    setup_panic_hook();

    eprintln!();
    eprintln!(" ____              _  ");
    eprintln!("|  _ \\            | | ");
    eprintln!("| |_) | __ _ _ __ | | __");
    eprintln!("|  _ < / _` | '_ \\| |/ /  Core Banking CLI");
    eprintln!("| |_) | (_| | | | |   < ");
    eprintln!("|____/ \\__,_|_| |_|_|\\_\\");
    eprintln!();

    let args = Args::parse();

    let log_dir = format!(
        "{}/.bank-cli",
        env::var("HOME").unwrap_or_else(|_| ".".to_string())
    );
    let _guards = logging::init_logging(&log_dir, &args.log_level).await?;
    info!("bank-cli starting, args: {:?}", &args);

    let mut cfg = ConfigLoad::new(&args.config).unwrap_or_else(|_| ConfigLoad::default());
    info!("bank-cli config: {:?}", &cfg);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let store = bank::store::memory::InMemoryStore::new();
    let directory = InMemoryDirectory::new();

    if let Some(cmd) = args.cmd {
        return command::run(cmd, store, &directory).await;
    }

    let is_terminal = stdin().is_terminal();
    let is_repl = is_terminal && !args.non_interactive && args.query.is_none();
    if is_repl {
        cfg.terminal_update();
    }

    let mut session = Session::new(cfg, store, directory);

    if is_repl {
        session.handle_repl().await;
        return Ok(());
    }

    match args.query {
        Some(query) => session.handle_line(&query).await?,
        None => {
            for line in stdin().lines() {
                session.handle_line(&line?).await?;
            }
        }
    }

    Ok(())
}

fn setup_panic_hook() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();
    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);
            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta)
                .expect("human-panic: printing error message to console failed");
        }));
    }
}
