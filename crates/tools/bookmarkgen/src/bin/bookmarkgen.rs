//! bookmarkgen - turn a flat-color image into a multi-material bookmark

use anyhow::Result;
use bookmark::Bookmark;
use bookmarkgen::{
    inspect_stl, load_raster, load_settings, write_outputs, OutputFormat, OutputOptions,
    SettingsOverrides,
};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookmarkgen")]
#[command(about = "Generate multi-color bookmark models from images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize an image and write STL files or a 3MF package
    Generate {
        /// Input image (any format the image crate decodes)
        input: PathBuf,

        /// TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: SettingsOverrides,

        /// Seed for the quantizer; random when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "3mf")]
        format: OutputFormat,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,

        /// File stem for the 3MF package and preview
        #[arg(long, default_value = "bookmark")]
        name: String,

        /// PNG thumbnail for the 3MF package (defaults to the rendered preview)
        #[arg(long)]
        thumbnail: Option<PathBuf>,

        /// Also write a flat-color preview PNG
        #[arg(long)]
        preview: bool,
    },

    /// Print triangle count and bounds of a binary STL file
    Inspect {
        /// STL file to read
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            config,
            overrides,
            seed,
            format,
            out,
            name,
            thumbnail,
            preview,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            overrides.apply(&mut settings)?;

            let raster = load_raster(&input, &settings)?;
            let bookmark = match seed {
                Some(seed) => Bookmark::from_raster(&raster, &mut StdRng::seed_from_u64(seed)),
                None => Bookmark::from_raster(&raster, &mut rand::rng()),
            };

            let palette = bookmark.palette();
            for (slot, (color, count)) in palette.colors.iter().zip(palette.counts).enumerate() {
                info!("Slot {} {}: {} pixels", slot, color, count);
            }

            let options = OutputOptions {
                out_dir: out,
                format,
                name,
                thumbnail,
                write_preview: preview,
            };
            for path in write_outputs(&bookmark, &settings, &options)? {
                println!("{}", path.display());
            }
        }
        Commands::Inspect { file } => {
            let summary = inspect_stl(&file)?;
            println!("Triangles: {}", summary.triangles);
            println!(
                "Bounds: [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
                summary.min[0],
                summary.min[1],
                summary.min[2],
                summary.max[0],
                summary.max[1],
                summary.max[2]
            );
        }
    }

    Ok(())
}
