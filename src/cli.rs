use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "pgpmail",
    version,
    about = "End-to-end encrypted mail on top of Gmail"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Auth(AuthArgs),
    /// Scan the inbox and list encrypted threads
    Threads(ThreadsArgs),
    /// Decrypt and show one thread
    Read(ReadArgs),
    /// Encrypt and send a message
    Send(SendArgs),
    /// Remove threads from every mailbox view
    Trash(TrashArgs),
    /// Send an unencrypted invitation
    Invite(InviteArgs),
    /// Suggest known addresses
    Contacts(ContactsArgs),
}

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    Login,
    Status,
    Logout,
}

#[derive(Debug, Args)]
pub struct ThreadsArgs {
    #[arg(long, default_value_t = 20, help = "Maximum threads to show")]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[arg(help = "Thread id")]
    pub thread_id: String,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    #[arg(long, value_delimiter = ',', num_args = 1.., required = true, help = "Recipient addresses")]
    pub to: Vec<String>,
    #[arg(long, visible_alias = "subj", help = "Email subject")]
    pub subject: Option<String>,
    #[arg(long, help = "Inline body text")]
    pub body: Option<String>,
    #[arg(long, help = "Read body from file")]
    pub body_file: Option<PathBuf>,
    #[arg(long, help = "Read body from stdin")]
    pub stdin: bool,
    #[arg(long, help = "Reply within this thread id")]
    pub thread: Option<String>,
    #[arg(long, help = "Message-ID header of the message being answered")]
    pub in_reply_to: Option<String>,
    #[arg(long, action = ArgAction::Append, help = "Attach file (repeatable)")]
    pub attach: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TrashArgs {
    #[arg(required = true, num_args = 1.., help = "Thread ids")]
    pub thread_ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct InviteArgs {
    #[arg(long, value_delimiter = ',', num_args = 1.., required = true, help = "Addresses to invite")]
    pub to: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ContactsArgs {
    #[arg(default_value = "", help = "Address prefix")]
    pub prefix: String,
    #[arg(long, default_value_t = 10, help = "Maximum suggestions")]
    pub limit: usize,
}
