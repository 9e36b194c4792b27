use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use zyntel_branding::{
    parse_hex_color, render_favicon, render_wizard_images, BrandingFile, BrandingReport,
    FaviconConfig, WizardConfig,
};
use zyntel_bucket::S3BucketStore;
use zyntel_core::config::{self, BucketConfig, DatabaseConfig};
use zyntel_core::import::{self, ConflictPolicy, ImportPlan, Profile};
use zyntel_core::source::{BucketSource, LocalSource, SourceReader};
use zyntel_core::{db, rollup};

#[derive(Parser, Debug)]
#[command(author, version, about = "Zyntel data seeding and branding toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run database migrations
    Migrate,
    /// Import the seed files into the database
    Import(ImportArgs),
    /// Recompute the daily progress rollup from current encounters
    Rollup,
    /// Generate installer and favicon artwork
    #[command(subcommand)]
    Branding(BrandingCommand),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Which schema the seed files are loaded into
    #[arg(long, value_enum, default_value_t = ProfileArg::Overview)]
    profile: ProfileArg,
    /// Where the seed files are read from
    #[arg(long, value_enum, default_value_t = SourceArg::Local)]
    source: SourceArg,
    /// Local seed directory (defaults to ZYNTEL_DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Override the catalog conflict policy of the profile
    #[arg(long, value_enum)]
    catalog_policy: Option<PolicyArg>,
    /// Skip running migrations before importing
    #[arg(long)]
    skip_migrations: bool,
}

#[derive(Subcommand, Debug)]
enum BrandingCommand {
    /// Installer wizard bitmaps from one PNG
    Wizard {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        /// Backing colour for transparent pixels
        #[arg(long, default_value = "#000000")]
        background: String,
    },
    /// Multi-resolution favicon from light and dark PNGs
    Favicon {
        #[arg(long, num_args = 1..)]
        light: Vec<PathBuf>,
        #[arg(long, num_args = 1..)]
        dark: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Every output described by a branding TOML file
    All {
        #[arg(long)]
        config: PathBuf,
        /// Overrides the wizard backing colour from the file
        #[arg(long)]
        background: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Overview,
    Registry,
}

impl From<ProfileArg> for Profile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Overview => Profile::Overview,
            ProfileArg::Registry => Profile::Registry,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Local,
    Bucket,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Ignore,
    Overwrite,
}

impl From<PolicyArg> for ConflictPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Ignore => ConflictPolicy::IgnoreOnConflict,
            PolicyArg::Overwrite => ConflictPolicy::OverwriteOnConflict,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => {
            let pool = connect_pool().await?;
            let result = db::run_migrations(&pool).await;
            pool.close().await;
            result?;
            Ok(())
        }
        Command::Import(args) => run_import(args).await,
        Command::Rollup => {
            let pool = connect_pool().await?;
            let result = rollup::regenerate(&pool).await;
            pool.close().await;
            let summary = result?;
            info!(
                encounters = summary.encounters,
                rows = summary.rows_written,
                "Rollup regenerated"
            );
            Ok(())
        }
        Command::Branding(command) => run_branding(command),
    }
}

async fn connect_pool() -> Result<db::DbPool> {
    let config = DatabaseConfig::from_env()?;
    db::connect(&config.url)
        .await
        .context("failed to connect to the database")
}

async fn run_import(args: ImportArgs) -> Result<()> {
    // Everything that can fail on configuration is settled before the
    // database is touched.
    let source: Box<dyn SourceReader> = match args.source {
        SourceArg::Local => {
            let root = args.data_dir.unwrap_or_else(config::data_dir_from_env);
            info!(root = %root.display(), "Reading seed files from local directory");
            Box::new(LocalSource::new(root))
        }
        SourceArg::Bucket => {
            if args.data_dir.is_some() {
                warn!("--data-dir is ignored when reading from the bucket");
            }
            let bucket = BucketConfig::from_env()?;
            info!(?bucket, "Reading seed files from bucket");
            let store = S3BucketStore::new(bucket.to_s3_config())
                .await
                .context("failed to build bucket client")?;
            Box::new(BucketSource::new(Arc::new(store)))
        }
    };

    let mut plan = ImportPlan::new(args.profile.into());
    if let Some(policy) = args.catalog_policy {
        plan = plan.with_catalog_policy(policy.into());
    }

    let pool = connect_pool().await?;
    let result: zyntel_core::error::Result<Vec<import::ImportReport>> = async {
        if args.skip_migrations {
            warn!("Skipping migrations before importing");
        } else {
            db::run_migrations(&pool).await?;
        }
        import::run_plan(&pool, source.as_ref(), &plan).await
    }
    .await;
    pool.close().await;

    let reports = result.context("import failed")?;
    let written: u64 = reports.iter().map(|r| r.written).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    info!(
        profile = plan.profile.as_str(),
        steps = reports.len(),
        written,
        skipped,
        "Import complete"
    );
    Ok(())
}

fn run_branding(command: BrandingCommand) -> Result<()> {
    let report = match command {
        BrandingCommand::Wizard {
            input,
            output_dir,
            background,
        } => {
            let background = parse_hex_color(&background)?;
            render_wizard_images(&WizardConfig::new(input, output_dir).with_background(background))
        }
        BrandingCommand::Favicon {
            light,
            dark,
            output,
        } => render_favicon(&FaviconConfig::new(output).with_light(light).with_dark(dark)),
        BrandingCommand::All { config, background } => {
            let file = BrandingFile::load(&config)?;
            let mut report = BrandingReport::default();
            let mut any = false;

            if let Some(mut wizard) = file.wizard_config()? {
                if let Some(background) = background.as_deref() {
                    wizard.background = parse_hex_color(background)?;
                }
                report.merge(render_wizard_images(&wizard));
                any = true;
            }
            if let Some(favicon) = file.favicon_config() {
                report.merge(render_favicon(&favicon));
                any = true;
            }
            if !any {
                warn!(
                    path = %config.display(),
                    "Branding config has no [wizard] or [favicon] table"
                );
            }
            report
        }
    };

    summarize(&report)
}

fn summarize(report: &BrandingReport) -> Result<()> {
    for failure in &report.failures {
        error!(
            output = %failure.target.display(),
            error = %failure.error,
            "Branding output failed"
        );
    }
    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        "Branding finished"
    );
    if !report.is_clean() {
        bail!("{} branding output(s) failed", report.failures.len());
    }
    Ok(())
}
