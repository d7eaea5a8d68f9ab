use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fit",
    about = "Content-addressed version control and backup",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Stage files or directories
    Add(AddArgs),
    /// Record the staged files as a new commit
    Commit(MessageArgs),
    /// Show commit history from HEAD
    Log(LogArgs),
    /// Show staged, modified and untracked files
    Status,
    /// List branches, or create or delete one
    Branch(BranchArgs),
    /// Switch to a branch or detach at a commit
    Checkout(CheckoutArgs),
    /// Serve this repository to push and pull clients
    Daemon(DaemonArgs),
    /// Send a branch to a daemon
    Push(RemoteArgs),
    /// Fetch a branch from a daemon
    Pull(RemoteArgs),
    /// Create a repository from a daemon's branch
    Clone(CloneArgs),
    /// Write a commit's files into the working tree
    Restore(RestoreArgs),
    /// Delete unreachable objects
    Gc(GcArgs),
    /// Stage everything and commit
    Snapshot(MessageArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    pub dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct MessageArgs {
    #[arg(short, long)]
    pub message: String,
}

#[derive(Args)]
pub struct LogArgs {
    /// Maximum number of commits to show
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct BranchArgs {
    /// Branch to create (or delete with -d)
    pub name: Option<String>,
    #[arg(short, long, requires = "name")]
    pub delete: bool,
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Branch name or commit hash (prefix)
    pub target: String,
}

#[derive(Args)]
pub struct DaemonArgs {
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<IpAddr>,
    /// TOML daemon configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct RemoteArgs {
    /// Daemon address, `host[:port]`
    pub remote: String,
    pub branch: String,
}

#[derive(Args)]
pub struct CloneArgs {
    /// Daemon address, `host[:port]`
    pub remote: String,
    pub branch: String,
    /// Destination (default: the branch name)
    pub dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct RestoreArgs {
    /// Commit hash (prefix) or branch
    pub revision: String,
}

#[derive(Args)]
pub struct GcArgs {
    /// Report what would be removed without deleting
    #[arg(long)]
    pub dry_run: bool,
}
