//! kb_Vegan - MDS ordination service module.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use kb_vegan::config::{HostConfig, ModuleConfig, DEPLOYMENT_CONFIG_ENV, SERVICE_NAME};
use kb_vegan::mds::{CallContext, MdsOutput, MdsParams};
use kb_vegan::{logging, server, Error, VeganService};

#[derive(Parser)]
#[command(name = "kb-vegan")]
#[command(about = "kb_Vegan - MDS ordination service module")]
#[command(version)]
struct Cli {
    /// Deployment config (TOML)
    #[arg(long, global = true, env = DEPLOYMENT_CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC requests over stdio
    Serve,

    /// Print the module status descriptor
    Status,

    /// Run MDS once and print the result
    RunMds {
        /// MDSParams JSON file, or '-' for stdin
        #[arg(long)]
        params: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let host = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading deployment config");
            HostConfig::load(path, SERVICE_NAME)?
        }
        None => HostConfig::new(),
    };
    let config = ModuleConfig::from_env(host)?;
    let service = Arc::new(VeganService::from_config(config));

    match cli.command {
        Commands::Serve => {
            info!(
                scratch = %service.config().scratch().display(),
                callback_url = %service.config().callback_url(),
                "Serving kb_Vegan on stdio"
            );
            server::run(
                service,
                tokio::io::BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
        }
        Commands::Status => {
            let status = service.status(&CallContext::default());
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::RunMds { params } => {
            let raw = read_params(&params)?;
            let params: MdsParams = serde_json::from_str(&raw)?;
            let ctx = CallContext::with_call_id(uuid::Uuid::new_v4().to_string());
            let result =
                tokio::task::spawn_blocking(move || service.run_mds(&ctx, params)).await??;
            if let Some(output) = result.first().and_then(|m| MdsOutput::from_map(m).ok()) {
                info!(
                    mds_ref = %output.mds_ref,
                    report_name = %output.report_name,
                    report_ref = %output.report_ref,
                    "MDS run finished"
                );
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn read_params(path: &Path) -> Result<String, Error> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
