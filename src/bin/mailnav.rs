#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for browsing a content server's IMAP folder tree

use clap::{Parser, Subcommand};
use mailnav::{
    EmailProperties, FolderEntry, ImapStore, MailboxStore, Message, Navigator, OpenMode, Protocol,
    Unchecked, User,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

type Nav = Navigator<ImapStore, Unchecked>;

#[derive(Parser)]
#[command(name = "mailnav")]
#[command(about = "Browse and search the IMAP folder tree of a content server")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the immediate sub-folders of a folder
    Folders {
        /// Mailbox or repository path (default: the root)
        #[arg(long)]
        path: Option<String>,
    },

    /// Recursively list folders and message subjects
    Tree {
        /// Mailbox or repository path (default: the root)
        #[arg(long)]
        path: Option<String>,
    },

    /// Search message subjects in a folder
    Search {
        /// Substring to look for, or a full-match pattern with --regex
        term: String,

        /// Folder to search in
        #[arg(long)]
        path: String,

        /// Treat TERM as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Subscribe to a folder
    Subscribe {
        #[arg(long)]
        path: String,
    },

    /// Unsubscribe from a folder
    Unsubscribe {
        #[arg(long)]
        path: String,
    },
}

#[derive(Serialize)]
struct TreeNode {
    path: String,
    messages: Vec<String>,
}

#[derive(Serialize)]
struct SearchHit<'a> {
    subject: &'a str,
    from: &'a [String],
    flags: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let props = EmailProperties::from_env()?;
    let user = User::from_env()?;

    let mut nav = Navigator::new(ImapStore::new(props), Unchecked);
    nav.authenticate(&user).await?;

    let result = run(&mut nav, &args).await;
    nav.disconnect().await.ok();
    result
}

async fn run(nav: &mut Nav, args: &Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Folders { path } => {
            locate(nav, path.as_deref())?;
            cmd_folders(nav, args).await
        }
        Command::Tree { path } => {
            locate(nav, path.as_deref())?;
            cmd_tree(nav, args).await
        }
        Command::Search { term, path, regex } => {
            nav.using_resource(path)?;
            cmd_search(nav, args, term, *regex).await
        }
        Command::Subscribe { path } => {
            nav.using_resource(path)?.subscribe().await?;
            println!("Subscribed to {path}");
            Ok(())
        }
        Command::Unsubscribe { path } => {
            nav.using_resource(path)?.unsubscribe().await?;
            println!("Unsubscribed from {path}");
            Ok(())
        }
    }
}

fn locate(nav: &mut Nav, path: Option<&str>) -> mailnav::Result<()> {
    match path {
        Some(path) => {
            nav.using_resource(path)?;
        }
        None => {
            nav.set_location("");
        }
    }
    Ok(())
}

async fn cmd_folders(nav: &mut Nav, args: &Args) -> anyhow::Result<()> {
    let folders = nav.get_folders().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else if folders.is_empty() {
        println!("No folders found.");
    } else {
        for FolderEntry { path, .. } in &folders {
            println!("{path}");
        }
    }

    Ok(())
}

async fn cmd_tree(nav: &mut Nav, args: &Args) -> anyhow::Result<()> {
    let root = nav.location().current().to_string();
    let mut nodes = Vec::new();
    let mut pending = vec![root];

    while let Some(folder) = pending.pop() {
        let messages = if folder.is_empty() {
            Vec::new()
        } else {
            subjects_of(nav.store_mut(), &folder).await?
        };
        nav.set_location(&folder);
        let children = nav.get_folders().await?;
        pending.extend(children.into_iter().rev().map(|c| c.path));
        nodes.push(TreeNode {
            path: folder,
            messages,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
    } else {
        print_tree(&nodes);
    }

    Ok(())
}

/// Subjects in `folder`; folders that cannot be opened list none.
async fn subjects_of(store: &mut ImapStore, folder: &str) -> mailnav::Result<Vec<String>> {
    if store.open(folder, OpenMode::ReadOnly).await.is_err() {
        return Ok(Vec::new());
    }
    let messages = store.messages(folder).await;
    store.close(folder, false).await?;
    Ok(messages?.into_iter().map(|m| m.subject).collect())
}

async fn cmd_search(nav: &mut Nav, args: &Args, term: &str, regex: bool) -> anyhow::Result<()> {
    if regex {
        nav.search_subject_with_wildcards_for(term).await?;
    } else {
        nav.search_subject_for(term).await?;
    }
    let results: Vec<&Message> = nav.search_results().iter().collect();

    if args.json {
        let hits: Vec<SearchHit<'_>> = results
            .iter()
            .map(|m| SearchHit {
                subject: &m.subject,
                from: &m.from,
                flags: m.flags.to_string(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print_message_table(&results);
    }

    Ok(())
}

fn print_tree(nodes: &[TreeNode]) {
    for node in nodes {
        let depth = node.path.matches('/').count();
        let name = node.path.rsplit('/').next().unwrap_or_default();
        let label = if name.is_empty() { "/" } else { name };
        println!("{}{label}/", "  ".repeat(depth));
        for subject in &node.messages {
            println!("{}- {subject}", "  ".repeat(depth + 1));
        }
    }
}

fn print_message_table(messages: &[&Message]) {
    if messages.is_empty() {
        println!("No messages found.");
        return;
    }

    let header = format!("{:<8} {:<30} {:<20} {}", "UID", "From", "Flags", "Subject");
    println!("{header}");
    println!("{}", "-".repeat(100));

    for message in messages {
        println!(
            "{:<8} {:<30} {:<20} {}",
            message.uid,
            truncate(&message.from.join(", "), 28),
            message.flags.to_string(),
            truncate(&message.subject, 40),
        );
    }

    println!("\n{} message(s)", messages.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
