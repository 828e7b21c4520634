//! art CLI — the human interface to the art version control engine.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use art_core::Repository;

#[derive(Parser)]
#[command(name = "art", about = "art — file-based version control", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new art repository.
    Init {
        /// Directory to initialize (default: current directory).
        dir: Option<PathBuf>,
    },

    /// Show the working tree status.
    Status,

    /// Stage changes under a file or directory.
    Add {
        /// Path to stage, relative to the repository root.
        path: String,
    },

    /// Record the stage as a new commit on the active branch.
    Commit {
        /// Commit message.
        message: String,
    },

    /// List, create, or delete branches.
    Branch {
        /// Branch name; omit to list branches.
        name: Option<String>,

        /// Delete the named branch.
        #[arg(short = 'd', long = "delete", requires = "name")]
        delete: bool,

        /// Alias of --delete.
        #[arg(short = 'D', requires = "name", hide = true)]
        delete_force: bool,
    },

    /// Switch the working tree to a branch (creating it if missing).
    Checkout {
        /// Branch to switch to.
        name: String,

        /// Discard local changes instead of refusing.
        #[arg(long)]
        force: bool,
    },

    /// Merge a branch into the active branch.
    Merge {
        /// Branch to merge in.
        name: String,
    },

    /// Show the active branch's commit history.
    Log,

    /// Show unstaged content changes.
    Diff,

    /// Stash away working tree changes.
    Stash {
        #[command(subcommand)]
        action: Option<StashCommands>,
    },

    /// Clear the stage, or move the branch head to an earlier commit.
    Reset {
        /// Commit hash to reset to; omit to just clear the stage.
        hash: Option<String>,
    },

    /// Stage a file deletion and remove it from the working tree.
    Rm {
        /// Path to remove.
        path: String,
    },

    /// Get or set configuration values.
    Config {
        /// Configuration key; omit to list everything.
        key: Option<String>,

        /// New value; omit to read the key.
        value: Option<String>,
    },

    /// Show or set the remote slug used by sync commands.
    Remote {
        /// Remote slug or URL to record; omit to show the current one.
        url: Option<String>,
    },
}

#[derive(Subcommand)]
enum StashCommands {
    /// Re-apply the newest stash entry and drop it.
    Pop,
    /// List stash entries, newest first.
    List,
}

fn main() {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("error: cannot determine current directory: {e}");
        process::exit(1);
    });

    let result = match cli.command {
        Commands::Init { dir } => cmd_init(&cwd, dir),
        Commands::Status => cmd_status(&cwd),
        Commands::Add { path } => cmd_add(&cwd, &path),
        Commands::Commit { message } => cmd_commit(&cwd, &message),
        Commands::Branch {
            name,
            delete,
            delete_force,
        } => cmd_branch(&cwd, name, delete || delete_force),
        Commands::Checkout { name, force } => cmd_checkout(&cwd, &name, force),
        Commands::Merge { name } => cmd_merge(&cwd, &name),
        Commands::Log => cmd_log(&cwd),
        Commands::Diff => cmd_diff(&cwd),
        Commands::Stash { action } => cmd_stash(&cwd, action),
        Commands::Reset { hash } => cmd_reset(&cwd, hash.as_deref()),
        Commands::Rm { path } => cmd_rm(&cwd, &path),
        Commands::Config { key, value } => cmd_config(&cwd, key.as_deref(), value.as_deref()),
        Commands::Remote { url } => cmd_remote(&cwd, url.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn cmd_init(cwd: &PathBuf, dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let target = match dir {
        Some(d) if d.is_absolute() => d,
        Some(d) => cwd.join(d),
        None => cwd.clone(),
    };
    std::fs::create_dir_all(&target)?;
    let repo = Repository::init(&target)?;
    println!(
        "Initialized empty art repository in {}",
        repo.root().join(".art").display()
    );
    Ok(())
}

fn cmd_status(cwd: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    let status = repo.status()?;

    println!("On branch {}", status.active_branch);
    match &status.last_commit {
        Some(hash) => println!("Last commit: {}", &hash[..12.min(hash.len())]),
        None => println!("No commits yet"),
    }

    let sections: [(&str, char, &Vec<String>); 4] = [
        ("Staged", '+', &status.staged),
        ("Modified", '~', &status.modified),
        ("Untracked", '?', &status.untracked),
        ("Ignored", '!', &status.ignored),
    ];
    let mut any = false;
    for (title, marker, paths) in sections {
        if paths.is_empty() {
            continue;
        }
        any = true;
        println!("\n{title}:");
        for path in paths {
            println!("  {marker} {path}");
        }
    }
    if !any {
        println!("\nWorking tree clean");
    }
    Ok(())
}

fn cmd_add(cwd: &PathBuf, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.add(path)?);
    Ok(())
}

fn cmd_commit(cwd: &PathBuf, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.commit(message)?);
    Ok(())
}

fn cmd_branch(
    cwd: &PathBuf,
    name: Option<String>,
    delete: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;

    match name {
        None => {
            let active = repo.head()?.active.branch;
            for branch in repo.branches()? {
                if branch == active {
                    println!("* {branch}");
                } else {
                    println!("  {branch}");
                }
            }
        }
        Some(name) if delete => println!("{}", repo.delete_branch(&name)?),
        Some(name) => println!("{}", repo.create_branch(&name)?),
    }
    Ok(())
}

fn cmd_checkout(cwd: &PathBuf, name: &str, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.checkout(name, force)?);
    Ok(())
}

fn cmd_merge(cwd: &PathBuf, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.merge(name)?);
    Ok(())
}

fn cmd_log(cwd: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.log()?);
    Ok(())
}

fn cmd_diff(cwd: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    let report = repo.diff()?;

    if report.file_diffs.is_empty() && report.staged.is_empty() {
        println!("No changes");
        return Ok(());
    }

    for file_diff in &report.file_diffs {
        println!("{}", file_diff.file);
        if !file_diff.deleted.is_empty() {
            for line in file_diff.deleted.lines() {
                println!("  - {line}");
            }
        }
        if !file_diff.added.is_empty() {
            for line in file_diff.added.lines() {
                println!("  + {line}");
            }
        }
    }

    if !report.staged.is_empty() {
        println!("\nStaged:");
        for path in &report.staged {
            println!("  {path}");
        }
    }
    Ok(())
}

fn cmd_stash(
    cwd: &PathBuf,
    action: Option<StashCommands>,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;

    match action {
        None => println!("{}", repo.stash()?),
        Some(StashCommands::Pop) => println!("{}", repo.stash_pop()?),
        Some(StashCommands::List) => {
            let entries = repo.stash_list()?;
            if entries.is_empty() {
                println!("No stash entries");
            }
            for entry in entries {
                println!("{}: {}", entry.id, entry.date);
            }
        }
    }
    Ok(())
}

fn cmd_reset(cwd: &PathBuf, hash: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.reset(hash)?);
    Ok(())
}

fn cmd_rm(cwd: &PathBuf, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;
    println!("{}", repo.rm(path)?);
    Ok(())
}

fn cmd_config(
    cwd: &PathBuf,
    key: Option<&str>,
    value: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;

    match (key, value) {
        (None, _) => {
            for (k, v) in repo.config_list()? {
                println!("{k}={v}");
            }
        }
        (Some(key), None) => match repo.config_get(key)? {
            Some(value) => println!("{value}"),
            None => return Err(format!("configuration key '{key}' not found").into()),
        },
        (Some(key), Some(value)) => {
            repo.config_set(key, value)?;
        }
    }
    Ok(())
}

fn cmd_remote(cwd: &PathBuf, url: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let repo = Repository::open(cwd)?;

    match url {
        Some(url) => {
            repo.set_remote(url)?;
            println!("Remote set to '{url}'");
        }
        None => {
            let remote = repo.remote_url()?;
            if remote.is_empty() {
                println!("No remote configured");
            } else {
                println!("{remote}");
            }
        }
    }
    Ok(())
}
