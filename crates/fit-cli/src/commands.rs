use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use fit_sdk::{CheckoutTarget, GcOptions, Repository, DEFAULT_LOG_LIMIT};
use fit_server::{Daemon, ServerConfig};
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(args),
        Command::Add(args) => cmd_add(args),
        Command::Commit(args) => cmd_commit(args),
        Command::Log(args) => cmd_log(args),
        Command::Status => cmd_status(),
        Command::Branch(args) => cmd_branch(args),
        Command::Checkout(args) => cmd_checkout(args),
        Command::Daemon(args) => cmd_daemon(args).await,
        Command::Push(args) => cmd_push(args).await,
        Command::Pull(args) => cmd_pull(args).await,
        Command::Clone(args) => cmd_clone(args).await,
        Command::Restore(args) => cmd_restore(args),
        Command::Gc(args) => cmd_gc(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

fn open_repo() -> anyhow::Result<Repository> {
    Ok(Repository::discover(std::env::current_dir()?)?)
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    let repo = Repository::init(&dir)?;
    println!(
        "{} Initialized empty fit repository in {}",
        "✓".green().bold(),
        repo.fit_dir().display().to_string().bold()
    );
    Ok(())
}

fn cmd_add(args: AddArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let cwd = std::env::current_dir()?.canonicalize()?;
    let paths = args
        .paths
        .iter()
        .map(|p| workdir_relative(repo.workdir(), &cwd, p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    for entry in repo.add(&paths)? {
        println!("  {} {}", "staged:".green(), entry.path);
    }
    Ok(())
}

fn cmd_commit(args: MessageArgs) -> anyhow::Result<()> {
    let result = open_repo()?.commit(&args.message)?;
    print_commit(&result, &args.message);
    Ok(())
}

fn cmd_snapshot(args: MessageArgs) -> anyhow::Result<()> {
    let result = open_repo()?.snapshot(&args.message)?;
    print_commit(&result, &args.message);
    Ok(())
}

fn print_commit(result: &fit_sdk::CommitResult, message: &str) {
    let branch = result.branch.as_deref().unwrap_or("detached HEAD");
    let root = if result.parent.is_none() { " (root commit)" } else { "" };
    println!(
        "[{} {}]{} {}",
        branch.yellow(),
        result.id.short_hex().dimmed(),
        root,
        message.lines().next().unwrap_or_default()
    );
}

fn cmd_log(args: LogArgs) -> anyhow::Result<()> {
    let entries = open_repo()?.log(args.limit.unwrap_or(DEFAULT_LOG_LIMIT))?;
    if entries.is_empty() {
        println!("No commits yet.");
    }
    for entry in entries {
        println!("{} {}", "commit".yellow(), entry.id.to_hex().yellow());
        println!("Author: {}", entry.author);
        match entry.date() {
            Some(date) => println!("Date:   {}", date.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Date:   {}", entry.timestamp),
        }
        println!();
        for line in entry.message.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let status = open_repo()?.status()?;
    match (&status.branch, &status.head) {
        (Some(branch), _) => println!("On branch {}", branch.yellow().bold()),
        (None, Some(head)) => println!("HEAD detached at {}", head.short_hex().yellow()),
        (None, None) => println!("HEAD detached"),
    }
    if status.head.is_none() {
        println!("\nNo commits yet");
    }

    let changes = &status.changes;
    if !changes.staged.is_empty() {
        println!("\nChanges to be committed:");
        for entry in &changes.staged {
            println!("  {:>10}: {}", entry.status.label(), entry.path.green());
        }
    }
    if !changes.modified.is_empty() {
        println!("\nChanges not staged for commit:");
        for entry in &changes.modified {
            println!("  {:>10}: {}", entry.status.label(), entry.path.red());
        }
    }
    if !changes.untracked.is_empty() {
        println!("\nUntracked files:");
        for path in &changes.untracked {
            println!("  {}", path.red());
        }
    }
    if status.pending_changes() == 0 && changes.untracked.is_empty() {
        println!("\nNothing to commit, working tree clean.");
    }
    Ok(())
}

fn cmd_branch(args: BranchArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    match args.name {
        Some(name) if args.delete => {
            repo.delete_branch(&name)?;
            println!("Deleted branch {}", name.yellow());
        }
        Some(name) => {
            let target = repo.create_branch(&name)?;
            println!("Created branch {} at {}", name.yellow(), target.short_hex().dimmed());
        }
        None => {
            for branch in repo.branches()? {
                if branch.current {
                    println!("* {}", branch.name.green().bold());
                } else {
                    println!("  {}", branch.name);
                }
            }
        }
    }
    Ok(())
}

fn cmd_checkout(args: CheckoutArgs) -> anyhow::Result<()> {
    match open_repo()?.checkout(&args.target)? {
        CheckoutTarget::Branch { name, .. } => {
            println!("Switched to branch {}", name.yellow().bold())
        }
        CheckoutTarget::Detached { commit } => {
            println!("HEAD is now at {} (detached)", commit.short_hex().yellow())
        }
    }
    Ok(())
}

async fn cmd_daemon(args: DaemonArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(ip) = args.bind {
        config.bind_addr.set_ip(ip);
    }
    debug!(?config, "daemon configuration");

    let repo = Repository::discover(&config.repo_root)
        .with_context(|| format!("no repository to serve at {}", config.repo_root.display()))?;
    let daemon = Daemon::bind(&config, repo.store(), repo.refs()).await?;
    println!(
        "Serving {} on {}",
        repo.workdir().display().to_string().bold(),
        daemon.local_addr()?.to_string().cyan()
    );
    daemon.serve().await?;
    Ok(())
}

async fn cmd_push(args: RemoteArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let remote = repo.remote(&args.remote)?;
    let result = repo.push(&remote, &args.branch).await?;
    println!(
        "{} Pushed {} to {} ({} objects, {} bytes)",
        "✓".green().bold(),
        format!("{}@{}", result.branch, result.tip.short_hex()).yellow(),
        remote.to_string().bold(),
        result.objects_sent,
        result.bytes_transferred
    );
    Ok(())
}

async fn cmd_pull(args: RemoteArgs) -> anyhow::Result<()> {
    let repo = open_repo()?;
    let remote = repo.remote(&args.remote)?;
    let result = repo.pull(&remote, &args.branch).await?;
    if result.up_to_date() {
        println!("{} already up to date.", result.branch.yellow());
        return Ok(());
    }
    let from = result
        .previous
        .map(|id| id.short_hex())
        .unwrap_or_else(|| "(none)".to_string());
    println!(
        "{} Pulled {} from {}: {}..{} ({} objects)",
        "✓".green().bold(),
        result.branch.yellow(),
        remote.to_string().bold(),
        from,
        result.tip.short_hex(),
        result.fetch.objects_received
    );
    if result.fetch.mismatched > 0 {
        println!(
            "{} {} received objects failed hash verification",
            "warning:".yellow().bold(),
            result.fetch.mismatched
        );
    }
    Ok(())
}

async fn cmd_clone(args: CloneArgs) -> anyhow::Result<()> {
    let remote = fit_sdk::Remote::parse(&args.remote)?;
    let dir = args.dir.unwrap_or_else(|| PathBuf::from(&args.branch));
    let repo = Repository::clone_from(&remote, &args.branch, &dir).await?;
    println!(
        "{} Cloned {} from {} into {}",
        "✓".green().bold(),
        args.branch.yellow(),
        remote.to_string().bold(),
        repo.workdir().display()
    );
    Ok(())
}

fn cmd_restore(args: RestoreArgs) -> anyhow::Result<()> {
    let written = open_repo()?.restore(&args.revision)?;
    println!("{} Restored {} files from {}", "✓".green().bold(), written, args.revision.yellow());
    Ok(())
}

fn cmd_gc(args: GcArgs) -> anyhow::Result<()> {
    let report = open_repo()?.gc(GcOptions { dry_run: args.dry_run })?;
    let verb = if args.dry_run { "would remove" } else { "removed" };
    println!(
        "{} GC: {} objects scanned, {} reachable, {} {}",
        "✓".green(),
        report.scanned,
        report.reachable,
        verb,
        report.removed
    );
    if report.failed > 0 {
        println!("{} {} objects could not be removed", "warning:".yellow().bold(), report.failed);
    }
    Ok(())
}

/// Turn a path given on the command line into a `/`-separated path relative
/// to the working tree.
fn workdir_relative(workdir: &Path, cwd: &Path, path: &Path) -> anyhow::Result<String> {
    let mut abs = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::ParentDir => {
                abs.pop();
            }
            Component::CurDir => {}
            other => abs.push(other),
        }
    }
    let Ok(rel) = abs.strip_prefix(workdir) else {
        bail!("{} is outside the repository at {}", path.display(), workdir.display());
    };
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    Ok(parts.join("/"))
}
