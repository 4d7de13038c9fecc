//! Relaychat terminal client.

mod config;
mod console;
mod paths;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use rc_crypto::{keys::fingerprint, SealedBoxProvider};
use rc_proto::ConversationId;
use rc_session::{Session, SessionDeps, SessionError, SessionIo, SessionState};
use rc_store::{ProfileStore, Store, DEFAULT_DISPLAY_NAME};

use crate::config::{ClientConfig, RELAY_URL_ENV};
use crate::console::Command;
use crate::paths::DataPaths;
use crate::transport::TransportEvent;

#[derive(Parser)]
#[command(name = "rc-client")]
#[command(about = "End-to-end encrypted chat over a relay", long_about = None)]
struct Cli {
    /// Directory holding the profile, message history and config
    #[arg(long, global = true, env = "RC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Relay WebSocket URL (overrides config.json and RC_RELAY_URL)
    #[arg(long, global = true)]
    relay_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the relay and chat (default)
    Run {
        /// Display name to use on first run instead of prompting
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the stored message history
    History,

    /// Delete all stored messages
    Clear,

    /// Show the local identity
    Whoami,
}

struct AppContext {
    paths: DataPaths,
    config: ClientConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rc_client=info,rc_session=info,rc_store=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = DataPaths::resolve(cli.data_dir)?;
    let config = ClientConfig::load(&paths.config())?
        .with_overrides(std::env::var(RELAY_URL_ENV).ok(), cli.relay_url);
    let ctx = AppContext { paths, config };

    match cli.command.unwrap_or(Commands::Run { name: None }) {
        Commands::Run { name } => run(&ctx, name).await,
        Commands::History => history(&ctx).await,
        Commands::Clear => clear(&ctx).await,
        Commands::Whoami => whoami(&ctx),
    }
}

async fn open_store(ctx: &AppContext) -> Result<Store> {
    std::fs::create_dir_all(ctx.paths.root())
        .with_context(|| format!("cannot create {}", ctx.paths.root().display()))?;
    Store::open(&ctx.paths.database(), ctx.config.store.clone())
        .await
        .context("cannot open message store")
}

async fn history(ctx: &AppContext) -> Result<()> {
    let store = open_store(ctx).await?;
    for message in store.list_all().await? {
        println!(
            "{:<10} {}",
            console::short_id(&message.conversation.to_string()),
            console::format_message(&message)
        );
    }
    store.close().await;
    Ok(())
}

async fn clear(ctx: &AppContext) -> Result<()> {
    let store = open_store(ctx).await?;
    store.clear_all().await?;
    store.close().await;
    println!("History cleared.");
    Ok(())
}

fn whoami(ctx: &AppContext) -> Result<()> {
    match ProfileStore::new(ctx.paths.profile()).load()? {
        Some(profile) => {
            println!("id:          {}", profile.id);
            println!("name:        {}", profile.name);
            println!("fingerprint: {}", fingerprint(&profile.public_key)?);
        }
        None => println!("No identity yet. Run `rc-client run` to create one."),
    }
    Ok(())
}

async fn prompt(stdin: &mut Lines<BufReader<Stdin>>, text: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(stdin.next_line().await?)
}

async fn run(ctx: &AppContext, name: Option<String>) -> Result<()> {
    let store = open_store(ctx).await?;
    let (mut session, io) = Session::start(SessionDeps {
        store,
        profiles: ProfileStore::new(ctx.paths.profile()),
        identity: Arc::new(SealedBoxProvider),
    })?;
    let SessionIo { outbound, mut events } = io;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(text) = console::render(&event) {
                println!("{text}");
            }
        }
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    if session.state() == SessionState::Unprovisioned {
        let generated = session.request_identity()?;
        println!("Welcome! Your identity is {}", generated.public_key);
        loop {
            let chosen = match &name {
                Some(n) => n.clone(),
                None => {
                    let line = prompt(&mut stdin, &format!("Display name [{DEFAULT_DISPLAY_NAME}]: ")).await?;
                    match line {
                        Some(l) if !l.trim().is_empty() => l,
                        Some(_) => DEFAULT_DISPLAY_NAME.to_string(),
                        None => return Ok(()),
                    }
                }
            };
            match session.submit_display_name(&chosen) {
                Ok(()) => break,
                Err(SessionError::InvalidDisplayName(reason)) if name.is_none() => println!("! {reason}"),
                Err(e) => return Err(e.into()),
            }
        }
    } else if name.is_some() {
        tracing::info!(target: "rc_client", event = "name_ignored", reason = "profile already exists");
    }

    let mut transport = transport::connect(&ctx.config.relay_url, outbound).await?;
    session.transport_opened().await?;

    loop {
        tokio::select! {
            event = transport.events.recv() => match event {
                Some(TransportEvent::Frame(text)) => {
                    if let Err(e) = session.handle_frame(&text).await {
                        tracing::warn!(target: "rc_client", event = "frame_failed", error = %e);
                    }
                }
                Some(TransportEvent::Closed) | None => {
                    session.transport_closed();
                    break;
                }
            },
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(cmd)) => {
                        if let Err(e) = execute(&mut session, cmd).await {
                            println!("! {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(usage) => println!("! {usage}"),
                }
            }
        }
    }

    session.store().close().await;
    drop(session);
    transport.finish().await;
    let _ = printer.await;
    Ok(())
}

async fn execute(session: &mut Session, cmd: Command) -> Result<(), SessionError> {
    match cmd {
        Command::Say(text) => match session.send_message(&text).await {
            Ok(report) if report.recipients.is_empty() => {
                println!("* saved locally, nobody to deliver to");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e @ SessionError::Unsent { .. }) => {
                if let Some(text) = e.into_unsent_text() {
                    println!("! unsent: {text}");
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        Command::Group => session.select_conversation(ConversationId::Group).await,
        Command::Dm(query) => match console::resolve_peer(session.roster(), &query) {
            Ok(conversation) => session.select_conversation(conversation).await,
            Err(msg) => {
                println!("! {msg}");
                Ok(())
            }
        },
        Command::Peers => {
            if session.roster().is_empty() {
                println!("* nobody else is here");
            }
            for peer in session.roster().all() {
                println!("  {} {}", console::short_id(&peer.identity), peer.display_name);
            }
            Ok(())
        }
        Command::List => {
            let active = session.active_conversation().clone();
            for summary in session.conversations().await? {
                println!("{}", console::format_summary(&summary, &active));
            }
            Ok(())
        }
        Command::Clear => {
            let active = session.active_conversation().clone();
            println!("* cleared {}", console::conversation_label(&active, session.roster()));
            session.clear_conversation(&active).await
        }
        Command::Quit => Ok(()),
    }
}
