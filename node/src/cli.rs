//! # CLI Interface
//!
//! Defines the command-line argument structure for `postchain` using
//! `clap` derive. Global flags pick the data directory, the acting identity,
//! and log output; subcommands map one-to-one onto ledger operations.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Append-only social ledger: public posts sealed into a hash chain,
/// private messages kept in a flat log.
#[derive(Parser, Debug)]
#[command(
    name = "postchain",
    about = "Append-only post chain and direct messages",
    version,
    propagate_version = true
)]
pub struct PostchainCli {
    /// Directory holding the ledger database.
    ///
    /// Created on first use if it does not exist.
    #[arg(
        long,
        short = 'd',
        env = "POSTCHAIN_DATA_DIR",
        default_value = ".postchain",
        global = true
    )]
    pub data_dir: PathBuf,

    /// Identity to act as. Overrides the one remembered by `login`.
    #[arg(long, short = 'u', env = "POSTCHAIN_USER", global = true)]
    pub user: Option<String>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "POSTCHAIN_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(
        long,
        default_value = "postchain_node=info,postchain_ledger=warn",
        global = true
    )]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remember an identity for later commands.
    Login {
        /// Identifier to post and message as.
        name: String,
    },
    /// Forget the remembered identity.
    Logout,
    /// Print the identity commands will act as.
    Whoami,
    /// Queue a post for the next seal pass.
    Post(PostArgs),
    /// Seal every pending post onto the chain.
    Seal(SealArgs),
    /// List chained posts, newest first.
    Feed(FeedArgs),
    /// Send a direct message.
    Send {
        /// Identifier of the recipient.
        recipient: String,
        /// Message text.
        text: String,
    },
    /// List every message you sent or received.
    Inbox,
    /// Show the conversation with one other identity.
    Conversation {
        /// The other party.
        other: String,
    },
    /// List everyone you have exchanged messages with.
    Contacts,
    /// Show chain health and counters.
    Status,
    /// Print the raw snapshot JSON to stdout.
    Export,
}

/// Arguments for the `post` subcommand.
#[derive(Args, Debug)]
pub struct PostArgs {
    /// Post text. May be empty when an image is attached.
    #[arg(default_value = "")]
    pub text: String,

    /// Make this a story that disappears from feeds after 24 hours.
    #[arg(long)]
    pub story: bool,

    /// Attach an image by URL.
    #[arg(long)]
    pub image_url: Option<String>,
}

/// Arguments for the `seal` subcommand.
#[derive(Args, Debug)]
pub struct SealArgs {
    /// Stop starting new posts after this many milliseconds. The post being
    /// mined when time runs out still finishes.
    #[arg(long, env = "POSTCHAIN_SEAL_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Change the ledger difficulty before sealing.
    #[arg(long)]
    pub difficulty: Option<u32>,
}

/// Arguments for the `feed` subcommand.
#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Only show posts by this author.
    #[arg(long)]
    pub author: Option<String>,

    /// Leave stories out entirely.
    #[arg(long)]
    pub hide_stories: bool,
}
