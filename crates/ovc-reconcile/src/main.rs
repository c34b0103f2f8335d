mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ovc_machine::gateway::OvcGateway;
use ovc_machine::{MachineId, Reconciler};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Reconcile one OVC virtual machine per invocation.
///
/// Connection settings come from `OVC_URL` and `OVC_JWT` (a `.env` file is
/// honored). Results are printed as JSON on stdout; logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "ovc-reconcile", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report whether the machine exists. Lookup errors count as absent.
    Exists { id: String },

    /// Print the machine's current state, or `null` if it is gone.
    Read { id: String },

    /// Create a machine from a JSON spec.
    Create {
        #[arg(long)]
        desired: PathBuf,
    },

    /// Converge an existing machine from the previously applied spec to a new one.
    Update {
        id: String,
        #[arg(long)]
        prior: PathBuf,
        #[arg(long)]
        desired: PathBuf,
    },

    /// Permanently delete the machine.
    Delete { id: String },

    /// Read an existing machine and print the spec it currently satisfies.
    Import { id: String },
}

async fn run(reconciler: &Reconciler, command: Command) -> anyhow::Result<Value> {
    let output = match command {
        Command::Exists { id } => json!(reconciler.exists(&MachineId(id)).await),
        Command::Read { id } => serde_json::to_value(reconciler.read(&MachineId(id)).await?)?,
        Command::Create { desired } => {
            let desired = input::load_config(&desired)?;
            let (id, state) = reconciler.create(&desired).await?;
            json!({ "id": id, "state": state })
        }
        Command::Update { id, prior, desired } => {
            let prior = input::load_config(&prior)?;
            let desired = input::load_config(&desired)?;
            serde_json::to_value(reconciler.update(&MachineId(id), &prior, &desired).await?)?
        }
        Command::Delete { id } => {
            let id = MachineId(id);
            reconciler.delete(&id).await?;
            json!({ "id": id, "deleted": true })
        }
        Command::Import { id } => {
            let (state, config) = reconciler.import(&MachineId(id)).await?;
            json!({ "state": state, "config": config })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let gateway = OvcGateway::from_env().context("failed to configure OVC gateway")?;
    let reconciler = Reconciler::new(Arc::new(gateway));

    let output = run(&reconciler, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
