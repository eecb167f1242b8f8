mod cli;

use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use cli::{AuthArgs, Cli, OtcCommand, ProviderCommand};
use otc_provider::config::ProviderConfig;
use otc_provider::output;
use otc_provider::providers::{self, Provider};
use otc_provider::reconcile::Reconciler;
use otc_provider::resource::{Manifest, parse_address};
use otc_provider::state::{self, StateFile};

const PROVIDER: &str = "opentelekomcloud";

fn provider(auth: &AuthArgs) -> Result<Box<dyn Provider>> {
    let config = auth.provider_config()?;
    tracing::debug!(?config, "provider configuration");
    Ok(providers::get_provider(PROVIDER, config)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        ProviderCommand::OpenTelekomCloud {
            auth,
            state_file,
            command,
        } => {
            let state_path = state_file.unwrap_or_else(state::default_path);
            run(&auth, &state_path, command).await?;
        }
    }

    Ok(())
}

async fn run(auth: &AuthArgs, state_path: &Path, command: OtcCommand) -> Result<()> {
    match command {
        OtcCommand::Plan(args) => {
            let manifest = Manifest::load(&args.manifest)?;
            let provider = provider(auth)?;
            let reconciler = Reconciler::load(provider.as_ref(), state_path)?;
            let plan = reconciler.plan(&manifest)?;
            println!("{}", output::render_plan(&plan));
        }
        OtcCommand::Apply(args) => {
            let manifest = Manifest::load(&args.manifest)?;
            let provider = provider(auth)?;
            let mut reconciler = Reconciler::load(provider.as_ref(), state_path)?;
            let plan = reconciler.plan(&manifest)?;
            println!("{}", output::render_plan(&plan));
            if plan.has_changes() {
                reconciler.apply(&manifest, &plan).await?;
                tracing::info!(summary = %plan.summary(), "apply complete");
            }
        }
        OtcCommand::Refresh => {
            let provider = provider(auth)?;
            let mut reconciler = Reconciler::load(provider.as_ref(), state_path)?;
            let summary = reconciler.refresh().await?;
            tracing::info!(
                refreshed = summary.refreshed,
                dropped = summary.dropped.len(),
                "refresh complete"
            );
            for address in &summary.dropped {
                println!("{} no longer exists, removed from state", address);
            }
        }
        OtcCommand::Destroy => {
            let provider = provider(auth)?;
            let mut reconciler = Reconciler::load(provider.as_ref(), state_path)?;
            let destroyed = reconciler.destroy().await?;
            println!("{} resources destroyed", destroyed.len());
        }
        OtcCommand::Import(args) => {
            let (resource_type, name) = parse_address(&args.address)
                .ok_or_else(|| eyre!("invalid address '{}', expected type.name", args.address))?;
            let provider = provider(auth)?;
            let mut reconciler = Reconciler::load(provider.as_ref(), state_path)?;
            let imported = reconciler.import(resource_type, name, &args.id).await?;
            println!("imported {} ({})", imported.address(), imported.id);
        }
        OtcCommand::Data(args) => {
            let manifest = Manifest::load(&args.manifest)?;
            let provider = provider(auth)?;
            let reconciler = Reconciler::new(provider.as_ref(), StateFile::new(), state_path);
            let results = reconciler.read_data(&manifest).await?;
            println!("{}", output::render_data(&results));
        }
        OtcCommand::State => {
            let state = StateFile::load(state_path)?;
            println!("{}", output::render_state(&state));
        }
        OtcCommand::Resources => {
            // Listing types makes no API calls, so no token is needed.
            let provider = providers::get_provider(PROVIDER, ProviderConfig::new(String::new()))?;
            println!("resources:");
            for resource_type in provider.resource_types() {
                println!("  {}", resource_type);
            }
            println!("data sources:");
            for data_type in provider.data_source_types() {
                println!("  {}", data_type);
            }
        }
    }

    Ok(())
}
