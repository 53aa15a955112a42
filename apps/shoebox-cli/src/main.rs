use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use shoebox_engine::{dispatch, prompt::ConsolePrompt, LabelResolver};
use shoebox_exif::ExifReader;
use shoebox_geo::NominatimGeocoder;
use shoebox_ops::init_tracing;
use shoebox_types::config::{
    DispatchConfig, GeocodeConfig, OpsConfig, ResolverConfig, ShoeboxConfig,
};
use tracing::info;

const DEFAULT_GEOCODE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
const DEFAULT_USER_AGENT: &str = "shoebox/0.1 (media organizer)";

/// Sorts a directory of photos and videos into dated, location-labeled
/// folders.
#[derive(Debug, Parser)]
#[command(name = "shoebox", version, about)]
struct Cli {
    /// Input directory to scan [default: Files].
    #[arg(short, long)]
    input: Option<String>,

    /// Output directory receiving the labeled folders [default: Output].
    #[arg(short, long)]
    output: Option<String>,

    /// Request an explicit label for every new day instead of geocoding.
    #[arg(short, long)]
    label: bool,

    /// Consult sibling flight logs for video locations.
    #[arg(short, long)]
    telemetry: bool,

    /// Seconds to wait after each geocoding request [default: 1].
    #[arg(short, long)]
    sleep: Option<f64>,

    /// Move files into place instead of copying them.
    #[arg(short, long)]
    delete: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Stop after this many files.
    #[arg(short, long)]
    num: Option<u64>,

    /// Only process files with these extensions.
    #[arg(short, long, num_args = 1..)]
    extensions: Option<Vec<String>>,

    /// Optional TOML config file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_tracing(&config.ops)?;

    let geocoder = NominatimGeocoder::new(&config.geocode)?;
    let mut resolver = LabelResolver::new(
        config.resolver.clone(),
        ExifReader::new(),
        geocoder,
        ConsolePrompt::new(),
    );

    let summary = dispatch::run(&config.dispatch, &mut resolver).await?;
    info!(%summary, "shoebox finished");
    println!("{summary}");
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ShoeboxConfig> {
    let mut config = match &cli.config {
        Some(path) => ShoeboxConfig::from_file(path)?,
        None => default_config(),
    };

    if let Some(input) = &cli.input {
        config.dispatch.input_dir = input.clone();
    }
    if let Some(output) = &cli.output {
        config.dispatch.output_dir = output.clone();
    }
    if cli.label {
        config.resolver.explicit_labels = true;
    }
    if cli.telemetry {
        config.resolver.telemetry_assist = true;
    }
    if let Some(sleep) = cli.sleep {
        config.geocode.throttle_secs = sleep;
    }
    if cli.delete {
        config.dispatch.move_files = true;
    }
    if let Some(num) = cli.num {
        config.dispatch.max_files = Some(num);
    }
    if let Some(extensions) = &cli.extensions {
        config.dispatch.extensions = Some(extensions.clone());
    }
    if cli.verbose {
        config.ops.log_level = "debug".into();
    }

    config.validate()?;
    Ok(config)
}

fn default_config() -> ShoeboxConfig {
    ShoeboxConfig {
        dispatch: DispatchConfig {
            input_dir: "Files".into(),
            output_dir: "Output".into(),
            extensions: None,
            max_files: None,
            move_files: false,
        },
        resolver: ResolverConfig {
            explicit_labels: false,
            telemetry_assist: false,
            image_extensions: vec!["jpg".into(), "jpeg".into()],
        },
        geocode: GeocodeConfig {
            endpoint: DEFAULT_GEOCODE_ENDPOINT.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            throttle_secs: 1.0,
            timeout_secs: 30,
        },
        ops: OpsConfig {
            log_level: "info".into(),
        },
    }
}
