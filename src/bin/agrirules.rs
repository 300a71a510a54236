use std::path::PathBuf;

use agrirules::cli::{describe_key, load_device_keys, load_expression, render_outline, ExpressionFormat};
use agrirules::{filter_config_string, to_wire_format, ExpressionBuilder, LoggingConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agrirules", version, about = "Rule-engine expression tooling", author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Expr {
        #[command(subcommand)]
        command: ExprCommand,
    },
    /// List the condition keys a device's capability map offers
    Keys { device: PathBuf },
    /// Fetch sensors and devices for an organization
    #[cfg(feature = "http-client")]
    Catalog {
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand)]
enum ExprCommand {
    /// Print the expression outline and validate it
    Check { file: PathBuf },
    /// Convert to the rule-engine wire format
    Wire {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Convert to the editor tree format
    Tree { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Expr { command } => match command {
            ExprCommand::Check { file } => handle_check(file)?,
            ExprCommand::Wire { file, compact } => handle_wire(file, compact)?,
            ExprCommand::Tree { file } => handle_tree(file)?,
        },
        Command::Keys { device } => handle_keys(device)?,
        #[cfg(feature = "http-client")]
        Command::Catalog { org } => handle_catalog(org).await?,
    }
    Ok(())
}

fn handle_check(file: PathBuf) -> anyhow::Result<()> {
    let (format, group) = load_expression(&file)?;
    let label = match format {
        ExpressionFormat::Tree => "tree",
        ExpressionFormat::Wire => "wire",
    };
    println!("format: {label}");
    print!("{}", render_outline(&group));
    match ExpressionBuilder::from_group(group).validate() {
        Ok(()) => println!("ok"),
        Err(err) => println!("invalid: {err}"),
    }
    Ok(())
}

fn handle_wire(file: PathBuf, compact: bool) -> anyhow::Result<()> {
    let (_, group) = load_expression(&file)?;
    let content = if compact {
        filter_config_string(&group)?
    } else {
        serde_json::to_string_pretty(&to_wire_format(&group))?
    };
    println!("{content}");
    Ok(())
}

fn handle_tree(file: PathBuf) -> anyhow::Result<()> {
    let (_, group) = load_expression(&file)?;
    println!("{}", ExpressionBuilder::from_group(group).to_json()?);
    Ok(())
}

fn handle_keys(device: PathBuf) -> anyhow::Result<()> {
    let keys = load_device_keys(&device)?;
    if keys.is_empty() {
        println!("No condition keys found in `{}`", device.display());
    }
    for key in &keys {
        println!("{}", describe_key(key));
    }
    Ok(())
}

#[cfg(feature = "http-client")]
async fn handle_catalog(org: Option<String>) -> anyhow::Result<()> {
    use agrirules::{ClientConfig, HttpPlatformClient, ReferenceCatalog};

    let config = ClientConfig::from_env()?;
    let organization_id = org
        .or_else(|| config.organization_id.clone())
        .ok_or_else(|| anyhow::anyhow!("pass --org or set AGRIRULES_ORG_ID"))?;
    let client = HttpPlatformClient::new(&config)?;
    let catalog = ReferenceCatalog::load(&client, &organization_id).await;

    println!("{:<38} {:<8} {}", "UUID", "Kind", "Name");
    for sensor in catalog.sensors() {
        println!("{:<38} {:<8} {}", sensor.uuid, "sensor", sensor.name);
    }
    for device in catalog.devices() {
        println!("{:<38} {:<8} {}", device.uuid, "device", device.name);
        for key in catalog.keys(agrirules::SourceType::Device, &device.uuid) {
            println!("{:<38} {:<8}   {}", "", "", describe_key(&key));
        }
    }
    Ok(())
}
