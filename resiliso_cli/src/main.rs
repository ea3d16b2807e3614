mod boot_stub;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use resiliso::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resiliso", version, about = "Bootable ISO builder with single-block self-repair")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write the built-in 1.44 MB floppy boot image
    BuildBoot {
        #[arg(long, default_value = "boot.img")]
        output: PathBuf,
    },
    /// Build the redundancy set and the disc image
    BuildIso {
        /// Boot image to embed; the built-in stub when omitted
        #[arg(long)]
        boot_image: Option<PathBuf>,
        /// Do not embed the redundancy set in the image
        #[arg(long, default_value_t = false)]
        no_redundancy: bool,
        /// Program run on the finished image (image path appended)
        #[arg(long)]
        finisher: Option<PathBuf>,
        /// Overrides `image_path` from the configuration
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Flip bytes in the middle of a stored block
    Corrupt {
        index: usize,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Check every stored block against the manifest
    Verify {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Rebuild the first missing or corrupted block from parity
    Recover {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the manifest of a redundancy set
    ShowManifest {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the layout of a disc image
    Inspect { image: PathBuf },
    /// Write a configuration file with default values
    InitConfig {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ResilisoConfig::load_or_default(&cli.config)?;
    let redundancy_dir = |dir: Option<PathBuf>| dir.unwrap_or_else(|| config.redundancy_dir.clone());

    match cli.cmd {
        Cmd::BuildBoot { output } => build_boot(&output)?,
        Cmd::BuildIso {
            boot_image,
            no_redundancy,
            finisher,
            output,
        } => build_iso(config.clone(), boot_image, no_redundancy, finisher, output)?,
        Cmd::Corrupt { index, dir } => corrupt(&redundancy_dir(dir), index)?,
        Cmd::Verify { dir } => verify(&redundancy_dir(dir))?,
        Cmd::Recover { dir } => recover(&redundancy_dir(dir))?,
        Cmd::ShowManifest { dir } => show_manifest(&redundancy_dir(dir))?,
        Cmd::Inspect { image } => inspect(&image)?,
        Cmd::InitConfig { force } => init_config(&cli.config, force)?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_boot(output: &Path) -> Result<()> {
    let image = boot_stub::boot_image();
    write_file(output, &image)?;
    info!(path = %output.display(), bytes = image.len(), "wrote boot image");
    Ok(())
}

fn build_iso(
    mut config: ResilisoConfig,
    boot_image: Option<PathBuf>,
    no_redundancy: bool,
    finisher: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    if no_redundancy {
        config.include_redundancy = false;
    }
    if let Some(output) = output {
        config.image_path = output;
    }

    let payload = match boot_image {
        Some(path) => fs::read(&path).with_context(|| format!("reading {}", path.display()))?,
        None => boot_stub::boot_image(),
    };

    let finisher = finisher.map(CommandFinisher::new);
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run(&payload, finisher.as_ref().map(|f| f as &dyn ImageFinisher))?;

    println!(
        "{} ({} bytes, {} blocks, {} embedded files)",
        report.image_path.display(),
        report.image_len,
        report.redundancy.manifest.len(),
        report.embedded_files
    );
    if let Some(FinishOutcome::Failed(reason)) = report.finish {
        bail!("image finisher failed: {reason}");
    }
    Ok(())
}

fn corrupt(dir: &Path, index: usize) -> Result<()> {
    let set = RedundancySet::open(dir)?;
    let path = set.corrupt_block(index)?;
    println!("corrupted {}", path.display());
    Ok(())
}

fn verify(dir: &Path) -> Result<()> {
    let set = RedundancySet::open(dir)?;
    set.ensure_intact()?;
    println!("{} blocks verified", set.manifest.len());
    Ok(())
}

fn recover(dir: &Path) -> Result<()> {
    let set = RedundancySet::open(dir)?;
    match set.recover()? {
        RecoveryReport::Clean => println!("no corruption detected"),
        RecoveryReport::Recovered {
            index,
            kind,
            path,
            verified: true,
        } => println!("recovered block {index} ({kind:?}) -> {}", path.display()),
        RecoveryReport::Recovered { index, .. } => {
            bail!("block {index} was rebuilt but the set still does not verify; more than one block is damaged")
        }
    }
    Ok(())
}

fn show_manifest(dir: &Path) -> Result<()> {
    let set = RedundancySet::open(dir)?;
    print!("{}", set.manifest);
    Ok(())
}

fn inspect(image_path: &Path) -> Result<()> {
    let image = fs::read(image_path).with_context(|| format!("reading {}", image_path.display()))?;
    let disc = DiscImage::parse_layout(&image)?;
    let initial = &disc.catalog.initial;

    println!("volume      {}", disc.primary.volume_id);
    println!("sectors     {}", disc.primary.volume_space_size);
    println!("catalog     LBA {} ({})", disc.boot_record.catalog_lba, disc.catalog.validation.id());
    println!(
        "boot entry  LBA {} {:?} {} virtual sectors{}",
        initial.load_lba,
        initial.media_type,
        initial.sector_count,
        if initial.bootable { "" } else { " (not bootable)" }
    );
    for record in &disc.entries {
        println!("{:>8} {:>10}  {}", record.extent_lba, record.data_length, record.name());
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ResilisoConfig::default().save(path)?;
    println!("wrote {}", path.display());
    Ok(())
}
