use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use newvm_api::NewVmClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;
use uh_infra::Provisioner;
use uh_infra::config::BackendConfig;
use uh_infra::types::{ControlPanel, OrderId, Vm, Vpc};

#[derive(Parser)]
#[command(name = "uh")]
#[command(about = "Provision NewVM virtual machines, control panels and VPCs")]
#[command(version)]
struct Cli {
    /// API base URL
    #[arg(long, global = true, env = "NEWVM_HOST")]
    host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List orderable products (no login needed)
    Products {
        #[arg(value_enum)]
        kind: ProductKind,
    },
    /// List operating systems
    Os,
    /// List locations new VMs can be ordered in
    Locations,
    /// List VPCs
    Vpcs,
    /// Manage virtual machines
    #[command(subcommand)]
    Vm(VmCommand),
    /// Manage control-panel licenses
    #[command(subcommand)]
    ControlPanel(ControlPanelCommand),
    /// Manage VPCs
    #[command(subcommand)]
    Vpc(VpcCommand),
}

#[derive(Clone, Copy, ValueEnum)]
enum ProductKind {
    Vm,
    ControlPanel,
}

#[derive(Subcommand)]
enum VmCommand {
    /// Show a VM, including any change still queued at the vendor
    Get { order_id: i64 },
    /// Order a VM described by a JSON file
    Create { file: PathBuf },
    /// Resize a VM to match a JSON file
    Update { order_id: i64, file: PathBuf },
    /// Power off and end the order with the billing period
    Delete { order_id: i64 },
}

#[derive(Subcommand)]
enum ControlPanelCommand {
    Get {
        order_id: i64,
        /// Previously returned control panel; its extensions are kept until the vendor reports them
        #[arg(long)]
        known: Option<PathBuf>,
    },
    Create { file: PathBuf },
    Update { order_id: i64, file: PathBuf },
    Delete { order_id: i64 },
}

#[derive(Subcommand)]
enum VpcCommand {
    Get {
        id: String,
        /// Previously returned VPC; its members are kept until the vendor reports them
        #[arg(long)]
        known: Option<PathBuf>,
    },
    Create { file: PathBuf },
    Update { id: String, file: PathBuf },
    Delete { id: String },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Infra(#[from] uh_infra::Error),

    #[error(transparent)]
    Api(#[from] newvm_api::Error),

    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encoding output: {0}")]
    Output(#[from] serde_json::Error),
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let body = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn print<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Products { kind } = cli.command {
        let host = cli.host.unwrap_or_else(|| newvm_api::DEFAULT_HOST.to_string());
        let provisioner = Provisioner::new(NewVmClient::anonymous(host, newvm_api::DEFAULT_TIMEOUT)?);
        return match kind {
            ProductKind::Vm => print(&provisioner.vm_products().await?),
            ProductKind::ControlPanel => print(&provisioner.control_panel_products().await?),
        };
    }

    let mut config = BackendConfig::from_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    let provisioner = Provisioner::new(config.connect().await?);

    let result = execute(&provisioner, cli.command).await;

    if let Err(err) = provisioner.backend().logout().await {
        tracing::warn!(error = %err, "logout failed");
    }
    result
}

async fn execute(p: &Provisioner<NewVmClient>, command: Command) -> Result<(), CliError> {
    match command {
        Command::Products { .. } => Ok(()),
        Command::Os => print(&p.operating_systems().await?),
        Command::Locations => print(&p.locations().await?),
        Command::Vpcs => print(&p.vpcs().await?),

        Command::Vm(cmd) => match cmd {
            VmCommand::Get { order_id } => print(&p.read_vm(OrderId(order_id)).await?),
            VmCommand::Create { file } => {
                let vm: Vm = load(&file)?;
                print(&p.create_vm(&vm).await?)
            }
            VmCommand::Update { order_id, file } => {
                let vm: Vm = load(&file)?;
                print(&p.update_vm(OrderId(order_id), &vm).await?)
            }
            VmCommand::Delete { order_id } => Ok(p.delete_vm(OrderId(order_id)).await?),
        },

        Command::ControlPanel(cmd) => match cmd {
            ControlPanelCommand::Get { order_id, known } => {
                let known = match known {
                    Some(path) => load::<ControlPanel>(&path)?.extensions,
                    None => Vec::new(),
                };
                print(&p.read_control_panel(OrderId(order_id), &known).await?)
            }
            ControlPanelCommand::Create { file } => {
                let panel: ControlPanel = load(&file)?;
                print(&p.create_control_panel(&panel).await?)
            }
            ControlPanelCommand::Update { order_id, file } => {
                let panel: ControlPanel = load(&file)?;
                print(&p.update_control_panel(OrderId(order_id), &panel).await?)
            }
            ControlPanelCommand::Delete { order_id } => {
                Ok(p.delete_control_panel(OrderId(order_id)).await?)
            }
        },

        Command::Vpc(cmd) => match cmd {
            VpcCommand::Get { id, known } => {
                let known = match known {
                    Some(path) => load::<Vpc>(&path)?.members,
                    None => Vec::new(),
                };
                print(&p.read_vpc(&id, &known).await?)
            }
            VpcCommand::Create { file } => {
                let vpc: Vpc = load(&file)?;
                print(&p.create_vpc(&vpc).await?)
            }
            VpcCommand::Update { id, file } => {
                let vpc: Vpc = load(&file)?;
                print(&p.update_vpc(&id, &vpc).await?)
            }
            VpcCommand::Delete { id } => Ok(p.delete_vpc(&id).await?),
        },
    }
}
