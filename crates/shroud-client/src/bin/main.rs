//! shroud CLI
//!
//! Run with:
//! ```bash
//! cargo run -p shroud-client --bin shroud -- --network zamaDevnet networks
//! cargo run -p shroud-client --bin shroud -- --gateway http://localhost:7077 \
//!     decrypt --request-id abc --type u32
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use shroud_client::{Client, ClientConfig, DevEngineFactory, GatewayClient, PollOptions, RpcConnection};
use shroud_core::{network, parse_address, Address, ClientSettings, TypeTag};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shroud")]
#[command(about = "Encrypt inputs and poll decryptions against an FHE gateway")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ConnectionArgs {
    /// Network key from the registry [default: sepolia]
    #[arg(long, global = true)]
    network: Option<String>,

    /// Gateway URL overriding the network's
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// JSON settings file; flags above override its values
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Confirm the chain id against this RPC endpoint before initializing
    #[arg(long, global = true)]
    rpc_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered networks
    Networks,

    /// Fetch the gateway public key
    PublicKey,

    /// Encrypt a single value with the development engine
    Encrypt {
        #[arg(long = "type")]
        tag: TypeTag,
        #[arg(long)]
        value: String,
    },

    /// Build an encrypted input batch with the development engine
    Input {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        user: String,
        /// Values as `type:value`, in order (e.g. `u32:500 bool:true`)
        #[arg(long = "value", num_args = 1..)]
        values: Vec<String>,
    },

    /// Poll the gateway for a decryption result
    Decrypt {
        #[arg(long)]
        request_id: String,
        #[arg(long = "type")]
        tag: Option<TypeTag>,
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
        #[arg(long, default_value = "2000")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shroud_client=info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Networks => {
            for (key, profile) in network::profiles() {
                println!(
                    "{:<12} chain={:<10} gateway={}",
                    key,
                    profile.chain_id,
                    profile.gateway_url.as_deref().unwrap_or("-")
                );
            }
        }
        Command::PublicKey => {
            let config = client_config(&args.connection).await?;
            let url = config
                .gateway_url()
                .ok_or_else(|| anyhow::anyhow!("no gateway configured for {}", config.profile.name))?;
            let gateway = GatewayClient::new(url, config.http_timeout)?;
            let key = gateway.fetch_public_key().await?;
            let preview: String = key.public_key.chars().take(32).collect();
            println!(
                "[OK] public key: {} chars, id={}, starts {}...",
                key.public_key.len(),
                key.public_key_id.as_deref().unwrap_or("-"),
                preview
            );
        }
        Command::Encrypt { tag, value } => {
            let config = client_config(&args.connection).await?;
            let client = Client::new(config, DevEngineFactory::default());
            let encrypted = client.encrypt(tag, value).await?;
            println!("[OK] {} ciphertext 0x{}", tag, hex::encode(&encrypted.ciphertext));
        }
        Command::Input {
            contract,
            user,
            values,
        } => {
            let contract = parse_address(&contract)?;
            let user = parse_address(&user)?;
            let config = client_config(&args.connection).await?;
            let client = Client::new(config, DevEngineFactory::default());

            let mut input = client.input(contract, user);
            for entry in &values {
                let (tag, value) = parse_entry(entry)?;
                input.add(tag, value)?;
            }
            let encrypted = input.finalize().await?;

            for (i, handle) in encrypted.handles.iter().enumerate() {
                println!("  handle[{}] = 0x{}", i, hex::encode(handle));
            }
            println!("[OK] proof = 0x{}", hex::encode(&encrypted.proof));
        }
        Command::Decrypt {
            request_id,
            tag,
            timeout_ms,
            interval_ms,
        } => {
            let config = client_config(&args.connection).await?;
            let client = Client::new(config, DevEngineFactory::default());
            let request = client.request_decryption_with_id(request_id, Vec::<u8>::new(), Address::ZERO, tag);
            let opts = PollOptions::new(
                Duration::from_millis(timeout_ms),
                Duration::from_millis(interval_ms),
            );
            let plaintext = client.await_decryption(&request, opts).await?;
            println!("[OK] {} = {}", request.request_id, plaintext);
        }
    }

    Ok(())
}

/// Resolve settings file, registry and flags into a client configuration
async fn client_config(args: &ConnectionArgs) -> anyhow::Result<ClientConfig> {
    let mut settings = match &args.settings {
        Some(path) => ClientSettings::load(path)?,
        None => ClientSettings::default(),
    };
    if let Some(network) = &args.network {
        settings.network = network.clone();
    }
    if let Some(gateway) = &args.gateway {
        settings.gateway_url = Some(gateway.clone());
    }
    if let Some(rpc_url) = &args.rpc_url {
        settings.rpc_url = Some(rpc_url.clone());
    }

    let mut config = ClientConfig::from_settings(&settings)?;
    if let Some(rpc_url) = &settings.rpc_url {
        config = config.with_connection(RpcConnection::connect(rpc_url).await?);
    }
    Ok(config)
}

fn parse_entry(entry: &str) -> anyhow::Result<(TypeTag, String)> {
    let (tag, value) = entry
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("expected type:value, got {}", entry))?;
    Ok((tag.parse()?, value.to_string()))
}
