use clap::{Parser, Subcommand};
use rasterkit::config::{self, RasterConfig};
use rasterkit::imaging::{self, Filter, Image, Offset};
use rasterkit::output;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared flags for commands that write the transformed image.
#[derive(clap::Args, Clone)]
struct SaveArgs {
    /// Output file name; the image's extension is appended (default: source name)
    #[arg(long)]
    name: Option<String>,

    /// Output directory (default: image_directory from the config)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Encoding quality, clamped to 1-100 (default: output.quality from the config)
    #[arg(long, allow_negative_numbers = true)]
    quality: Option<i64>,
}

#[derive(Parser)]
#[command(name = "rasterkit")]
#[command(about = "Resize, crop, filter and watermark raster images")]
#[command(long_about = "\
Resize, crop, filter and watermark raster images

Every command reads one image, applies one operation and saves the result.
Reads JPEG, PNG, GIF, WebP and TIFF; writes JPEG, PNG and GIF.

Offsets (--x, --y) accept:
  center        centre on that axis (default)
  end           flush with the right/bottom edge (aliases: right, bottom)
  N             N pixels from the left/top edge
  -N            N pixels back from the right/bottom edge

Out-of-range quality and opacity values are clamped to 1-100.

Run 'rasterkit gen-config' to generate a documented rasterkit.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./rasterkit.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raster driver, overriding the config
    #[arg(long, global = true)]
    driver: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print size and type of an image
    Info {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resize; a missing side keeps the aspect ratio
    Resize {
        file: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        width: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        height: Option<i64>,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Cut out a rectangle; a missing side keeps the full axis
    Crop {
        file: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, default_value = "center", allow_hyphen_values = true)]
        x: Offset,
        #[arg(long, default_value = "center", allow_hyphen_values = true)]
        y: Offset,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Apply a filter (negate, grayscale, brightness, contrast, colorize,
    /// edgedetect, emboss, gaussian-blur, selective-blur, mean-removal,
    /// smooth, pixelate)
    Filter {
        file: PathBuf,
        kind: Filter,
        /// Up to four filter arguments
        #[arg(num_args = 0..=4, allow_negative_numbers = true)]
        args: Vec<i32>,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Draw another image over this one
    Watermark {
        file: PathBuf,
        mark: PathBuf,
        #[arg(long, default_value = "center", allow_hyphen_values = true)]
        x: Offset,
        #[arg(long, default_value = "center", allow_hyphen_values = true)]
        y: Offset,
        /// Opacity, clamped to 1-100 (default: watermark.opacity from the config)
        #[arg(long, allow_negative_numbers = true)]
        opacity: Option<i64>,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Encode the image and write it to a file or stdout
    Render {
        file: PathBuf,
        /// jpg, png or gif (default: the image's own type)
        #[arg(long)]
        format: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        quality: Option<i64>,
        /// Write here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a stock rasterkit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rasterkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = resolve_config(cli.config.as_deref(), cli.driver.as_deref())?;

    match cli.command {
        Command::Info { file, json } => {
            let image = imaging::open_with_config(&file, &config)?;
            if json {
                println!("{}", output::format_info_json(&file, image.metadata())?);
            } else {
                output::print_info(&file, image.metadata());
            }
        }
        Command::Resize {
            file,
            width,
            height,
            save,
        } => {
            let mut image = imaging::open_with_config(&file, &config)?;
            image.resize(width, height)?;
            save_image(&mut image, &file, &save, &config)?;
        }
        Command::Crop {
            file,
            width,
            height,
            x,
            y,
            save,
        } => {
            let mut image = imaging::open_with_config(&file, &config)?;
            image.crop(width, height, x, y)?;
            save_image(&mut image, &file, &save, &config)?;
        }
        Command::Filter {
            file,
            kind,
            args,
            save,
        } => {
            let mut padded = [None; 4];
            for (slot, value) in padded.iter_mut().zip(args) {
                *slot = Some(value);
            }
            let mut image = imaging::open_with_config(&file, &config)?;
            image.filter(kind, padded)?;
            save_image(&mut image, &file, &save, &config)?;
        }
        Command::Watermark {
            file,
            mark,
            x,
            y,
            opacity,
            save,
        } => {
            let mut image = imaging::open_with_config(&file, &config)?;
            let mark = imaging::open_with_config(&mark, &config)?;
            let opacity = opacity.unwrap_or(config.watermark.opacity);
            image.watermark(&mark, x, y, opacity)?;
            save_image(&mut image, &file, &save, &config)?;
        }
        Command::Render {
            file,
            format,
            quality,
            output,
        } => {
            let mut image = imaging::open_with_config(&file, &config)?;
            let quality = quality.unwrap_or(config.output.quality);
            let bytes = image.render(format.as_deref(), quality)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)?;
                    info!(path = %path.display(), bytes = bytes.len(), "rendered image");
                }
                None => std::io::stdout().lock().write_all(&bytes)?,
            }
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Load the config from `--config`, or `./rasterkit.toml` if present, then
/// apply the `--driver` override.
fn resolve_config(
    path: Option<&Path>,
    driver: Option<&str>,
) -> Result<RasterConfig, config::ConfigError> {
    let mut config = match path {
        Some(path) => config::load_config(path)?,
        None => config::load_config_or_default(Path::new("."))?,
    };
    if let Some(driver) = driver {
        config.driver = driver.to_string();
        config.validate()?;
    }
    Ok(config)
}

fn save_image(
    image: &mut Image,
    source: &Path,
    args: &SaveArgs,
    config: &RasterConfig,
) -> Result<(), imaging::ImageError> {
    let quality = args.quality.unwrap_or(config.output.quality);
    let target = image.save(args.name.as_deref(), args.dir.as_deref(), quality)?;
    println!("{}", output::format_saved(source, &target, image.metadata()));
    Ok(())
}
