// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # postchain
//!
//! Entry point for the `postchain` binary. Parses CLI arguments, initializes
//! logging, opens the ledger stored in the data directory, and runs one
//! subcommand against it.
//!
//! Command output goes to stdout; logs go to stderr.

mod cli;
mod display;
mod feed;
mod logging;
mod observer;
mod sealing;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use postchain_ledger::{
    snapshot, Clock, DirectMessage, FoldHash, LedgerConfig, SealStatus, SharedLedger,
    SnapshotStore, SystemClock,
};

use cli::{Commands, FeedArgs, PostArgs, PostchainCli, SealArgs};
use display::{describe_age, format_timestamp};
use feed::PostBody;
use logging::LogFormat;
use store::SledStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PostchainCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    std::fs::create_dir_all(&cli.data_dir).with_context(|| {
        format!("failed to create data directory: {}", cli.data_dir.display())
    })?;
    let db_path = cli.data_dir.join("db");
    let store = Arc::new(
        SledStore::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::debug!(path = %db_path.display(), "database opened");

    // Identity commands never need the ledger itself.
    match &cli.command {
        Commands::Login { name } => return login(&store, name),
        Commands::Logout => {
            store.clear_username().context("failed to forget identity")?;
            println!("Logged out.");
            return Ok(());
        }
        Commands::Whoami => {
            match resolve_user(&cli, &store) {
                Ok(user) => println!("{user}"),
                Err(_) => println!("Not logged in."),
            }
            return Ok(());
        }
        _ => {}
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shared = SharedLedger::open(
        Arc::clone(&store) as Arc<dyn SnapshotStore>,
        LedgerConfig::default(),
        Arc::new(FoldHash),
        Arc::clone(&clock),
    )
    .context("failed to load ledger")?;

    match cli.command {
        Commands::Post(ref args) => {
            let user = resolve_user(&cli, &store)?;
            create_post(&shared, &user, args, clock.now_millis())
        }
        Commands::Seal(args) => seal(shared, args).await,
        Commands::Feed(args) => {
            show_feed(&shared, args, clock.now_millis());
            Ok(())
        }
        Commands::Send {
            ref recipient,
            ref text,
        } => {
            let user = resolve_user(&cli, &store)?;
            send(&shared, &user, recipient, text)
        }
        Commands::Inbox => {
            let user = resolve_user(&cli, &store)?;
            let messages = shared.read(|ledger| ledger.messages_for(&user));
            print_messages(&messages, &user, "No messages yet.");
            Ok(())
        }
        Commands::Conversation { ref other } => {
            let user = resolve_user(&cli, &store)?;
            let messages = shared.read(|ledger| ledger.conversation(&user, other));
            print_messages(&messages, &user, "No messages in this conversation.");
            Ok(())
        }
        Commands::Contacts => {
            let user = resolve_user(&cli, &store)?;
            let contacts = shared.read(|ledger| ledger.correspondents(&user));
            if contacts.is_empty() {
                println!("No contacts yet.");
            }
            for contact in contacts {
                println!("{contact}");
            }
            Ok(())
        }
        Commands::Status => {
            print_status(&shared, clock.now_millis());
            Ok(())
        }
        Commands::Export => {
            let blob = shared
                .read(snapshot::encode)
                .context("failed to encode snapshot")?;
            println!("{blob}");
            Ok(())
        }
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => Ok(()),
    }
}

/// The identity to act as: `--user` first, then the one remembered by
/// `login`.
fn resolve_user(cli: &PostchainCli, store: &SledStore) -> Result<String> {
    if let Some(user) = cli.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(user.to_string());
    }
    match store.username().context("failed to read stored identity")? {
        Some(user) => Ok(user),
        None => bail!("no identity set; run `postchain login <name>` or pass --user"),
    }
}

fn login(store: &SledStore, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("name must not be empty");
    }
    store
        .set_username(name)
        .context("failed to remember identity")?;
    println!("Logged in as {name}.");
    Ok(())
}

fn create_post(shared: &SharedLedger, user: &str, args: &PostArgs, now: u64) -> Result<()> {
    let Some(body) = PostBody::compose(&args.text, args.image_url.clone(), args.story, now) else {
        bail!("a post needs text or an image");
    };
    let content = body.to_content().context("failed to encode post body")?;

    match shared
        .create_post(&content, user)
        .context("failed to save post")?
    {
        Some(post) => {
            let pending = shared.read(|ledger| ledger.pending_len());
            println!(
                "Queued post #{} ({pending} pending). Run `postchain seal` to chain it.",
                post.id
            );
            Ok(())
        }
        None => bail!("post rejected"),
    }
}

async fn seal(shared: SharedLedger, args: SealArgs) -> Result<()> {
    if let Some(difficulty) = args.difficulty {
        shared
            .set_difficulty(difficulty)
            .context("failed to save difficulty")?;
    }

    let report = sealing::run_seal_pass(shared, Duration::from_millis(args.timeout_ms)).await?;

    for entry in &report.sealed {
        let note = match entry.status {
            SealStatus::Sealed => "",
            SealStatus::Exhausted => " (below target)",
        };
        println!(
            "Sealed post #{} hash {} nonce {} after {} attempts{note}",
            entry.id, entry.hash, entry.nonce, entry.attempts
        );
    }
    if report.sealed.is_empty() && report.remaining == 0 {
        println!("Nothing to seal.");
    }
    if report.remaining > 0 {
        println!("{} post(s) still pending.", report.remaining);
    }
    Ok(())
}

fn show_feed(shared: &SharedLedger, args: FeedArgs, now: u64) {
    let posts = shared.read(|ledger| match &args.author {
        Some(author) => ledger.posts_by_author(author),
        None => ledger.all_posts(),
    });
    let lines = feed::render_feed(&posts, now, !args.hide_stories);
    if lines.is_empty() {
        println!("No posts yet.");
        return;
    }
    for line in lines {
        println!("{line}\n");
    }
}

fn send(shared: &SharedLedger, user: &str, recipient: &str, text: &str) -> Result<()> {
    match shared
        .send_message(user, recipient, text)
        .context("failed to save message")?
    {
        Some(message) => {
            println!("Sent message {} to {}.", message.id, message.recipient);
            Ok(())
        }
        None => bail!("message rejected: recipient and text must be non-empty and not yourself"),
    }
}

fn print_messages(messages: &[DirectMessage], user: &str, empty: &str) {
    if messages.is_empty() {
        println!("{empty}");
    }
    for msg in messages {
        let direction = if msg.sender == user {
            format!("to {}", msg.recipient)
        } else {
            format!("from {}", msg.sender)
        };
        println!(
            "[{}] {direction}: {}",
            format_timestamp(msg.timestamp),
            msg.content
        );
    }
}

fn print_status(shared: &SharedLedger, now: u64) {
    let stats = shared.stats();
    println!("Chain valid:     {}", if stats.valid { "yes" } else { "NO" });
    println!("Difficulty:      {}", stats.difficulty);
    println!("Blocks:          {}", stats.blocks);
    println!("Pending posts:   {}", stats.pending);
    println!("Messages:        {}", stats.messages);
    println!(
        "Last block:      {} ({})",
        format_timestamp(stats.tip_timestamp),
        describe_age(stats.tip_timestamp, now)
    );
    if stats.below_target > 0 {
        println!("Below target:    {} post(s)", stats.below_target);
    }
}
