use clap::{Parser, Subcommand};
use photoslot::config::{self, PhotoConfig};
use photoslot::crop::CenterCrop;
use photoslot::manager::PhotoManager;
use photoslot::store::PhotoStore;
use photoslot::{resize, validate};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "photoslot")]
#[command(about = "Single-slot profile photo pipeline")]
#[command(long_about = "\
Single-slot profile photo pipeline

Validates an image by content (byte signatures, not filename), center-crops
it to the configured aspect, normalizes dimensions and quality, and persists
exactly one photo per store directory.

Store layout:

  <store-dir>/
  ├── current-id        # pointer to the active record
  ├── records.json      # record metadata (created_at, checksum, size)
  └── blobs/<id>        # the stored photo bytes

Run 'photoslot gen-config' to print a documented photoslot.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Store directory
    #[arg(long, default_value = ".photoslot", global = true)]
    store_dir: PathBuf,

    /// Config file (defaults apply when absent)
    #[arg(long, default_value = "photoslot.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a file without storing anything
    Check {
        /// Image file to inspect
        file: PathBuf,
    },
    /// Validate, crop, resize, and persist a photo
    Save {
        /// Image file to store
        file: PathBuf,
    },
    /// Write the display-normalized rendition of the stored photo
    Show {
        /// Output path for the rendition
        #[arg(long, default_value = "photo-display.jpg")]
        out: PathBuf,
    },
    /// Print metadata for the stored photo
    Status,
    /// Delete the stored photo
    Remove,
    /// Print a stock photoslot.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PhotoConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Check { file } => {
            let bytes = std::fs::read(&file)?;
            match validate::validate_with_limit(&bytes, config.limits.max_bytes) {
                Ok(format) => {
                    let dims = resize::dimensions(&bytes)
                        .map(|(w, h)| format!("{w}x{h}"))
                        .unwrap_or_else(|| "unknown dimensions".into());
                    println!(
                        "{}: {} ({}, {} bytes)",
                        file.display(),
                        format.mime(),
                        dims,
                        bytes.len()
                    );
                }
                Err(e) => {
                    eprintln!("{}: {}", file.display(), e);
                    std::process::exit(1);
                }
            }
        }
        Command::Save { file } => {
            let bytes = std::fs::read(&file)?;
            let store = PhotoStore::open(&cli.store_dir)?;
            let crop_aspect = (config.crop.width, config.crop.height);
            let mut manager = PhotoManager::new(store, config);

            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            if !manager.handle_file_change(&name, &bytes) {
                if let Some(e) = manager.upload_error() {
                    eprintln!("{name}: {e}");
                }
                std::process::exit(1);
            }

            let tool = CenterCrop::from_bytes(&bytes, crop_aspect)
                .ok_or("source image could not be prepared for cropping")?;
            manager.bind_crop_tool(Box::new(tool));

            if !manager.save_cropped() {
                return Err("crop extraction failed; nothing was stored".into());
            }
            let record = manager
                .store()
                .current_record()?
                .ok_or("photo was not persisted")?;
            println!(
                "Stored {} ({} bytes, sha256 {})",
                record.id,
                record.byte_len,
                &record.sha256[..12]
            );
        }
        Command::Show { out } => {
            let store = PhotoStore::open(&cli.store_dir)?;
            let Some(bytes) = store.get()? else {
                println!("No photo stored");
                return Ok(());
            };
            let rendition = resize::resize(&bytes, &config.display.spec())
                .ok_or("stored photo could not be rendered for display")?;
            std::fs::write(&out, &rendition)?;
            println!(
                "Wrote {} ({}x{})",
                out.display(),
                config.display.width,
                config.display.height
            );
        }
        Command::Status => {
            let store = PhotoStore::open(&cli.store_dir)?;
            match store.current_record()? {
                Some(record) => {
                    println!("id:         {}", record.id);
                    println!("created at: {}", record.created_at);
                    println!("size:       {} bytes", record.byte_len);
                    println!("sha256:     {}", record.sha256);
                }
                None => println!("No photo stored"),
            }
        }
        Command::Remove => {
            let store = PhotoStore::open(&cli.store_dir)?;
            store.delete()?;
            println!("Removed");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
