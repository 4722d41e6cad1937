//! `maposter` command-line client.
//!
//! ```bash
//! # Generate a poster and save it in the current directory
//! maposter generate --city Venice --country Italy
//!
//! # Both formats, A3 size, custom water colour
//! maposter generate --city Paris --country France --format both --size A3 --color water=#1B4F72
//!
//! # Reference data and service health
//! maposter themes
//! maposter health
//! ```

mod cli;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use maposter_client::api::PosterApi;
use maposter_client::catalog::load_catalog;
use maposter_client::config::ClientConfig;
use maposter_client::download::download_all;
use maposter_client::session::{PosterSession, SessionEvent};
use maposter_client::transport::PosterTransport;
use maposter_core::catalog::Catalog;
use maposter_core::request::PosterForm;
use maposter_core::steps::{ProgressSnapshot, StepState};

use cli::{Cli, Command, GenerateArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maposter=info,maposter_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    tracing::debug!(api_url = %config.api_url, "Configuration loaded");

    let api = Arc::new(PosterApi::new(config.api_url.clone()));

    match cli.command {
        Command::Generate(args) => generate(api, config, args).await,
        Command::Themes => list_themes(api.as_ref(), &config).await,
        Command::Health => health(&api).await,
    }
}

async fn generate(api: Arc<PosterApi>, config: ClientConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(api.as_ref(), config.catalog_timeout).await;
    let form = build_form(&catalog, &args)?;

    let mut session = PosterSession::new(Arc::clone(&api), Arc::new(catalog), config);
    let job = session.submit_form(&form).await?;
    println!("Job {} submitted ({})", job.id, job.status);

    let mut last_step = None;
    while let Some(event) = session.next_event().await {
        match event {
            SessionEvent::Progress(snapshot) => {
                print_progress(&snapshot, &mut last_step);
            }
            SessionEvent::Completed {
                snapshot,
                preview,
                downloads,
                ..
            } => {
                print_progress(&snapshot, &mut last_step);
                println!("Preview: {}", api.url(&preview.preview_url()));

                return match download_all(api.as_ref(), &downloads, &args.out_dir).await {
                    Ok(written) => {
                        for path in written {
                            println!("Saved {}", path.display());
                        }
                        Ok(())
                    }
                    Err(e) => {
                        for path in e.saved() {
                            println!("Saved {}", path.display());
                        }
                        Err(anyhow::Error::new(e).context("Failed to save poster"))
                    }
                };
            }
            SessionEvent::Failed { message, snapshot } => {
                if let Some(halted) = snapshot.steps.iter().find(|s| s.state == StepState::Halted) {
                    println!("  x {}", halted.label);
                }
                bail!("Poster generation failed: {message}");
            }
        }
    }

    bail!("Job ended without a result")
}

/// Print the current step once per step change, plus the message.
fn print_progress(snapshot: &ProgressSnapshot, last_step: &mut Option<usize>) {
    if *last_step != Some(snapshot.current_index) {
        let label = snapshot
            .current_step()
            .or_else(|| snapshot.steps.get(snapshot.current_index))
            .map(|s| s.label)
            .unwrap_or_default();
        println!("[{:>3}%] {label}", snapshot.percent);
        *last_step = Some(snapshot.current_index);
    }
    if !snapshot.message.is_empty() {
        tracing::debug!(percent = snapshot.percent, "{}", snapshot.message);
    }
}

fn build_form(catalog: &Catalog, args: &GenerateArgs) -> anyhow::Result<PosterForm> {
    let mut form = PosterForm {
        city: args.city.clone(),
        country: args.country.clone(),
        format: args.format.clone(),
        show_water: !args.no_water,
        show_parks: !args.no_parks,
        show_buildings: args.buildings,
        show_railways: args.railways,
        show_attribution: args.no_attribution.then_some(false),
        custom_colors: args.colors.iter().cloned().collect(),
        ..PosterForm::default()
    };

    if let Some(theme) = &args.theme {
        form.theme = theme.clone();
    }
    if let Some(distance) = &args.distance {
        form.distance = distance.clone();
    }
    if let Some(width) = &args.width {
        form.width = width.clone();
    }
    if let Some(height) = &args.height {
        form.height = height.clone();
    }
    if let Some(dpi) = &args.dpi {
        form.dpi = dpi.clone();
    }

    if let Some(name) = &args.size {
        let size = catalog
            .output_size(name)
            .with_context(|| format!("Unknown size preset '{name}'"))?;
        form.apply_output_size(size);
    }
    if let Some(name) = &args.features {
        let set = catalog
            .feature_set(name)
            .with_context(|| format!("Unknown feature set '{name}'"))?;
        form.apply_feature_set(set);
    }

    Ok(form)
}

async fn list_themes<T: PosterTransport + ?Sized>(transport: &T, config: &ClientConfig) -> anyhow::Result<()> {
    let catalog = load_catalog(transport, config.catalog_timeout).await;

    println!("Themes:");
    for theme in catalog.themes() {
        println!("  {:<20} {}", theme.id, theme.display_name);
    }

    let presets = catalog.presets();
    if !presets.output_sizes.is_empty() {
        println!("Sizes:");
        for size in &presets.output_sizes {
            println!("  {:<20} {} x {} in", size.name, size.width, size.height);
        }
    }
    if !presets.feature_sets.is_empty() {
        println!("Feature sets:");
        for set in &presets.feature_sets {
            println!(
                "  {:<20} water={} parks={} buildings={} railways={}",
                set.name, set.water, set.parks, set.buildings, set.railways
            );
        }
    }
    Ok(())
}

async fn health(api: &PosterApi) -> anyhow::Result<()> {
    let status = api
        .health()
        .await
        .with_context(|| format!("Poster service at {} is unreachable", api.api_url()))?;
    if !status.is_healthy() {
        bail!("Poster service reported status '{}'", status.status);
    }
    println!("{} is {}", api.api_url(), status.status);
    Ok(())
}
