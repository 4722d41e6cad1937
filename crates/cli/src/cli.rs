//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "maposter")]
#[command(version)]
#[command(about = "Generate city map posters with the poster service", long_about = None)]
pub struct Cli {
    /// Base URL of the poster service (overrides POSTER_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a poster request, follow its progress and save the result
    Generate(GenerateArgs),

    /// List the themes and presets offered by the service
    Themes,

    /// Check that the service is up
    Health,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// City to map
    #[arg(long)]
    pub city: String,

    /// Country the city is in
    #[arg(long)]
    pub country: String,

    /// Theme identifier
    #[arg(long)]
    pub theme: Option<String>,

    /// Map radius in metres
    #[arg(long)]
    pub distance: Option<String>,

    /// Poster width in inches
    #[arg(long)]
    pub width: Option<String>,

    /// Poster height in inches
    #[arg(long)]
    pub height: Option<String>,

    /// Named size preset; replaces --width and --height
    #[arg(long, conflicts_with_all = ["width", "height"])]
    pub size: Option<String>,

    /// Output resolution (150, 300 or 600)
    #[arg(long)]
    pub dpi: Option<String>,

    /// png, svg or both
    #[arg(long, default_value = "png")]
    pub format: String,

    /// Named feature bundle; replaces the individual layer flags
    #[arg(long)]
    pub features: Option<String>,

    /// Leave out water
    #[arg(long)]
    pub no_water: bool,

    /// Leave out parks
    #[arg(long)]
    pub no_parks: bool,

    /// Draw buildings
    #[arg(long)]
    pub buildings: bool,

    /// Draw railways
    #[arg(long)]
    pub railways: bool,

    /// Omit the attribution line
    #[arg(long)]
    pub no_attribution: bool,

    /// Colour override as SLOT=#RRGGBB (repeatable)
    #[arg(long = "color", value_parser = parse_color)]
    pub colors: Vec<(String, String)>,

    /// Directory the finished files are saved to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

fn parse_color(raw: &str) -> Result<(String, String), String> {
    let (slot, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=#RRGGBB, got '{raw}'"))?;
    Ok((slot.trim().to_string(), value.trim().to_string()))
}
