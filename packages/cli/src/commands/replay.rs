use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use flowdoc_editor::{FlowContent, FlowRange, FlowSelection, Operation};
use flowdoc_sync::{DocumentServer, MemoryBlobStore, Session, SyncClient, SyncConfig};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::{print_json, read_json};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Replay script (JSON)
    pub script: PathBuf,

    /// Directory holding flowdoc.config.json (defaults to the working directory)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// A scripted session: initial content plus the steps each client takes
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<FlowContent>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Apply an arbitrary operation locally
    Edit { client: String, op: Operation },
    /// Insert plain text locally
    Type { client: String, at: usize, text: String },
    /// Remove a range locally
    Erase { client: String, range: FlowRange },
    Select {
        client: String,
        #[serde(default)]
        selection: Option<FlowSelection>,
    },
    /// Exchange state with the server
    Sync { client: String },
    Trim,
}

impl Step {
    /// The client taking this step, if any
    pub fn client(&self) -> Option<&str> {
        match self {
            Step::Edit { client, .. }
            | Step::Type { client, .. }
            | Step::Erase { client, .. }
            | Step::Select { client, .. }
            | Step::Sync { client } => Some(client),
            Step::Trim => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientReport {
    pub name: String,
    pub text: String,
    pub version: u64,
    pub converged: bool,
    pub unconfirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub version: u64,
    pub text: String,
    pub digest: String,
    pub history: usize,
    pub clients: Vec<ClientReport>,
}

pub fn replay(args: ReplayArgs, cwd: &Path) -> Result<()> {
    let config_dir = args.config_dir.as_deref().unwrap_or(cwd);
    let config = SyncConfig::load(config_dir).context("Loading sync config")?;
    let script: Script = read_json(&args.script)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(run_script(script, config))?;

    if args.format == "json" {
        return print_json(&report);
    }

    println!("📜 {} {}", "Replayed".green().bold(), args.script.display());
    println!("   Version: {}", report.version);
    println!("   Digest:  {}", report.digest);
    println!("   History: {} change(s)", report.history);
    println!("   Content: {:?}", report.text);
    println!();
    for client in &report.clients {
        let status = if client.converged {
            "✓".green()
        } else {
            "✗".red()
        };
        let pending = if client.unconfirmed { " (unconfirmed edits)" } else { "" };
        println!(
            "   {} {} @{} {:?}{}",
            status,
            client.name.bright_white(),
            client.version,
            client.text,
            pending.yellow()
        );
    }
    Ok(())
}

struct Participant {
    session: Session,
    client: SyncClient,
}

pub async fn run_script(script: Script, config: SyncConfig) -> Result<Report> {
    let server = DocumentServer::new(Arc::new(MemoryBlobStore::new()), config);
    let content = match (script.content, script.text) {
        (Some(content), _) => content,
        (None, Some(text)) => FlowContent::from_text(&text),
        (None, None) => FlowContent::new(),
    };
    server
        .init(Some(content), None)
        .await?
        .ok_or_else(|| anyhow!("Document already exists"))?;

    let mut participants: BTreeMap<String, Participant> = BTreeMap::new();

    for (index, step) in script.steps.into_iter().enumerate() {
        let Some(name) = step.client().map(str::to_owned) else {
            let trimmed = server.trim().await?;
            info!(step = index, trimmed, "Trim");
            continue;
        };
        let participant = match participants.entry(name) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let participant = join(&server, entry.key()).await?;
                entry.insert(participant)
            }
        };

        match step {
            Step::Edit { op, .. } => edit(participant, op, index)?,
            Step::Type { at, text, .. } => edit(participant, Operation::insert_text(at, &text), index)?,
            Step::Erase { range, .. } => edit(participant, Operation::remove(range), index)?,
            Step::Select { selection, .. } => participant.client.set_selection(selection),
            Step::Sync { .. } => sync(&server, participant).await?,
            Step::Trim => {}
        }
    }

    let snapshot = server
        .read()
        .await?
        .ok_or_else(|| anyhow!("Document disappeared"))?;
    let history = server.history().await?.len();
    let clients = participants
        .into_iter()
        .map(|(name, p)| ClientReport {
            text: p.client.content().plain_text(),
            version: p.client.version(),
            converged: p.client.content() == &snapshot.content && !p.client.has_unconfirmed(),
            unconfirmed: p.client.has_unconfirmed(),
            name,
        })
        .collect();

    Ok(Report {
        version: snapshot.version,
        text: snapshot.content.plain_text(),
        digest: snapshot.digest,
        history,
        clients,
    })
}

async fn join(server: &DocumentServer<MemoryBlobStore>, name: &str) -> Result<Participant> {
    let snapshot = server
        .read()
        .await?
        .ok_or_else(|| anyhow!("Document does not exist"))?;
    info!(client = name, version = snapshot.version, "Joined");
    Ok(Participant {
        session: Session::new(format!("session-{}", name), name, name),
        client: SyncClient::from_snapshot(snapshot),
    })
}

fn edit(participant: &mut Participant, op: Operation, index: usize) -> Result<()> {
    let name = op.name();
    participant
        .client
        .edit(op)
        .with_context(|| format!("Step {}: {} by {} failed", index, name, participant.session.name))
}

async fn sync(server: &DocumentServer<MemoryBlobStore>, participant: &mut Participant) -> Result<()> {
    let input = participant.client.input();
    match server.sync(input, participant.session.clone()).await? {
        Some(output) => {
            info!(client = %participant.session.name, version = output.version, "Synced");
            participant.client.apply_output(output)?;
        }
        None => {
            warn!(client = %participant.session.name, "Sync rejected, reloading and dropping local edits");
            let snapshot = server
                .read()
                .await?
                .ok_or_else(|| anyhow!("Document does not exist"))?;
            participant.client = SyncClient::from_snapshot(snapshot);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(json: &str) -> Script {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_replay_converges() {
        let script = script(
            r#"{
                "text": "hello there!",
                "steps": [
                    { "step": "type", "client": "alice", "at": 11, "text": "?" },
                    { "step": "erase", "client": "bob", "range": [0, 1] },
                    { "step": "type", "client": "bob", "at": 0, "text": "H" },
                    { "step": "sync", "client": "bob" },
                    { "step": "sync", "client": "alice" },
                    { "step": "sync", "client": "bob" }
                ]
            }"#,
        );

        let report = run_script(script, SyncConfig::default()).await.unwrap();
        assert_eq!(report.text, "Hello there?!");
        assert_eq!(report.version, 2);
        assert_eq!(report.history, 2);
        assert!(report.clients.iter().all(|c| c.converged));
        assert_eq!(report.clients[0].name, "alice");
    }

    #[tokio::test]
    async fn test_replay_reports_unsynced_clients() {
        let script = script(
            r#"{
                "steps": [
                    { "step": "type", "client": "alice", "at": 0, "text": "draft" },
                    { "step": "trim" }
                ]
            }"#,
        );

        let report = run_script(script, SyncConfig::default()).await.unwrap();
        assert_eq!(report.text, "");
        assert!(!report.clients[0].converged);
        assert!(report.clients[0].unconfirmed);
    }

    #[tokio::test]
    async fn test_replay_surfaces_invalid_edits() {
        let script = script(
            r#"{
                "text": "abc",
                "steps": [{ "step": "erase", "client": "alice", "range": [2, 9] }]
            }"#,
        );
        let err = run_script(script, SyncConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("Step 0"));
    }
}
