use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use unxnb_core::{DataFormat, MapFormat, Platform, TmxDataEncoding, UnpackOptions, Unpacker};

mod game_paths;
mod loader;
mod ui;

use loader::PassthroughLoader;
use ui::ConsoleReporter;

/// unxnb - unpacks a game's compiled XNB content into editable files
#[derive(Parser)]
#[command(
    name = "unxnb",
    version = env!("CARGO_PKG_VERSION"),
    about = "Unpacks a game's compiled XNB content containers into editable, portable file formats",
    long_about = None
)]
struct Cli {
    /// Path to the game install folder (detected from conventional install
    /// locations if omitted)
    game_path: Option<PathBuf>,

    /// Path to the content folder (defaults to the game's Content folder)
    #[arg(long)]
    content_path: Option<PathBuf>,

    /// Where to write unpacked files (defaults to "Content (unpacked)" next
    /// to the content folder)
    #[arg(long)]
    export_path: Option<PathBuf>,

    /// Output format for structured-data assets
    #[arg(long, value_enum, default_value_t = DataFormatArg::Json)]
    data_format: DataFormatArg,

    /// Map output format (repeat the flag to produce several)
    #[arg(long = "map-format", value_enum, default_values_t = [MapFormatArg::Tmx])]
    map_formats: Vec<MapFormatArg>,

    /// Tile-data encoding used inside TMX documents
    #[arg(long, value_enum, default_value_t = TmxEncodingArg::Csv)]
    tmx_encoding: TmxEncodingArg,

    /// The platform whose content variant is being unpacked (defaults to the
    /// current platform)
    #[arg(long, value_enum)]
    platform: Option<PlatformArg>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DataFormatArg {
    Json,
    Yaml,
}

impl std::fmt::Display for DataFormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormatArg::Json => write!(f, "json"),
            DataFormatArg::Yaml => write!(f, "yaml"),
        }
    }
}

impl From<DataFormatArg> for DataFormat {
    fn from(value: DataFormatArg) -> Self {
        match value {
            DataFormatArg::Json => DataFormat::Json,
            DataFormatArg::Yaml => DataFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MapFormatArg {
    Tmx,
    Json,
}

impl std::fmt::Display for MapFormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapFormatArg::Tmx => write!(f, "tmx"),
            MapFormatArg::Json => write!(f, "json"),
        }
    }
}

impl From<MapFormatArg> for MapFormat {
    fn from(value: MapFormatArg) -> Self {
        match value {
            MapFormatArg::Tmx => MapFormat::Tmx,
            MapFormatArg::Json => MapFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TmxEncodingArg {
    Csv,
    Base64Gzip,
}

impl std::fmt::Display for TmxEncodingArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TmxEncodingArg::Csv => write!(f, "csv"),
            TmxEncodingArg::Base64Gzip => write!(f, "base64-gzip"),
        }
    }
}

impl From<TmxEncodingArg> for TmxDataEncoding {
    fn from(value: TmxEncodingArg) -> Self {
        match value {
            TmxEncodingArg::Csv => TmxDataEncoding::Csv,
            TmxEncodingArg::Base64Gzip => TmxDataEncoding::Base64Gzip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    Windows,
    Linux,
    Mac,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Windows => Platform::Windows,
            PlatformArg::Linux => Platform::Linux,
            PlatformArg::Mac => Platform::Mac,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    colored::control::set_override(!cli.no_color);
    init_logging(cli.verbose);

    let platform = cli.platform.map_or_else(Platform::detect, Platform::from);

    // resolve the content folder: explicit path, else detect the game install
    let game_folder = game_paths::find_game_folder(cli.game_path.as_deref(), platform);
    let content_root = match &cli.content_path {
        Some(path) => path.clone(),
        None => {
            let Some(game) = &game_folder else {
                bail!(
                    "can't find the game folder. Pass the game's install path as an argument, \
                     or --content-path to point at a content folder directly."
                );
            };
            match game_paths::find_content_folder(game, platform) {
                Some(path) => path,
                None => bail!(
                    "can't find the content folder for the game at {}.",
                    game.display()
                ),
            }
        }
    };

    let export_root = match cli.export_path {
        Some(path) => path,
        None => match &game_folder {
            Some(game) => game.join("Content (unpacked)"),
            None => content_root.with_file_name("Content (unpacked)"),
        },
    };

    tracing::debug!(
        "content root: {}, export root: {}",
        content_root.display(),
        export_root.display()
    );

    let options = UnpackOptions {
        data_format: cli.data_format.into(),
        map_formats: cli.map_formats.iter().map(|&format| format.into()).collect(),
        tmx_encoding: cli.tmx_encoding.into(),
        platform,
    };

    // enumerate up front so the progress bar knows its length
    let records = Unpacker::discover(&content_root);

    let unpacker = Unpacker::new(&options);
    let mut loader = PassthroughLoader;
    let mut reporter = ConsoleReporter::new(records.len());

    // start errors are already printed by the reporter
    if unpacker
        .run(
            &mut loader,
            &mut reporter,
            &content_root,
            &export_root,
            Some(records),
        )
        .is_err()
    {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(format!("unxnb_core={level},unxnb_cli={level}"))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
