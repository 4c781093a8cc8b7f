use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use plotlab::parser::parse_listing;
use plotlab::resolve::resolve_pipeline;
use plotlab::style::validate_dpi;
use plotlab::{LabConfig, Session};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plotlab")]
#[command(version, about = "Render statistical charts from tabular datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of extra CSV datasets
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Seed for row sampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Output resolution, overrides the config and listings without a theme
    #[arg(long, global = true)]
    dpi: Option<u32>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available datasets
    Datasets,

    /// Show the column schema of a dataset
    Describe {
        dataset: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Render one chart from a code listing
    Render {
        /// Dataset name
        #[arg(short, long)]
        dataset: String,

        /// Listing text, e.g. 'df | histogram(x: "sepal_length")'
        #[arg(short, long, conflicts_with = "listing_file", required_unless_present = "listing_file")]
        listing: Option<String>,

        /// Read the listing from a file
        #[arg(long, value_name = "FILE")]
        listing_file: Option<PathBuf>,

        /// PNG output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the reproducing listing to this file
        #[arg(long, value_name = "FILE")]
        listing_out: Option<PathBuf>,
    },

    /// Render several listings into a gallery and export it as a ZIP archive
    Gallery {
        /// Dataset name
        #[arg(short, long)]
        dataset: String,

        /// Listing files, saved in order under their file stem
        #[arg(required = true, value_name = "LISTING")]
        listings: Vec<PathBuf>,

        /// Archive path; defaults to gallery_<timestamp>.zip in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "plotlab=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PLOTLAB_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<LabConfig> {
    let mut config = match &cli.config {
        Some(path) => LabConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LabConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(seed) = cli.seed {
        config.sample_seed = seed;
    }
    if let Some(dpi) = cli.dpi {
        config.export_dpi = dpi;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Render a listing against the session's table. A listing without a theme
/// command takes the session style; `--dpi` always wins.
fn render_listing(session: &Session, text: &str, dpi: Option<u32>) -> Result<plotlab::Rendered> {
    let pipeline = parse_listing(text)?;
    let (request, mut style) = resolve_pipeline(&pipeline)?;
    if !pipeline.commands.iter().any(|c| c.name == "theme") {
        style = session.style();
    }
    if let Some(dpi) = dpi {
        validate_dpi(dpi)?;
        style.dpi = dpi;
    }
    let rendered = plotlab::render(session.table()?, &request, &style, session.config().sample_seed)?;
    Ok(rendered)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let mut session = Session::new(config);

    match &cli.command {
        Commands::Datasets => {
            for name in session.datasets() {
                println!("{}", name);
            }
        }

        Commands::Describe { dataset, json } => {
            session.select_dataset(dataset)?;
            let summary = session.summary()?;
            if *json {
                let out = serde_json::json!({ "dataset": dataset, "summary": summary });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "{}: {} rows, {} numeric, {} categorical, {:.1}% missing",
                    dataset,
                    summary.rows,
                    summary.numeric.len(),
                    summary.categorical.len(),
                    summary.missing_ratio * 100.0
                );
                let width = summary.columns.iter().map(|c| c.name.len()).max().unwrap_or(6).max(6);
                println!("{:<width$}  {:<11}  {:>8}", "column", "dtype", "missing", width = width);
                for column in &summary.columns {
                    println!(
                        "{:<width$}  {:<11}  {:>7.1}%",
                        column.name,
                        column.kind.as_str(),
                        column.missing_ratio * 100.0,
                        width = width
                    );
                }
            }
        }

        Commands::Render {
            dataset,
            listing,
            listing_file,
            output,
            listing_out,
        } => {
            let text = match (listing, listing_file) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => read_text(path)?,
                (None, None) => bail!("either --listing or --listing-file is required"),
            };
            session.select_dataset(dataset)?;
            let rendered = render_listing(&session, &text, cli.dpi)?;

            if let Some(path) = listing_out {
                fs::write(path, rendered.listing.as_str())
                    .with_context(|| format!("Failed to write listing to {}", path.display()))?;
            }

            match output {
                Some(path) => {
                    fs::write(path, rendered.artifact.png())
                        .with_context(|| format!("Failed to write PNG to {}", path.display()))?;
                    println!(
                        "{} ({}x{} px, {} rows) -> {}",
                        rendered.title,
                        rendered.artifact.width(),
                        rendered.artifact.height(),
                        rendered.rows_used,
                        path.display()
                    );
                    println!("{}", rendered.description);
                }
                None => {
                    // Write PNG to stdout
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    handle
                        .write_all(rendered.artifact.png())
                        .context("Failed to write PNG to stdout")?;
                    handle.flush().context("Failed to flush stdout")?;
                }
            }
        }

        Commands::Gallery {
            dataset,
            listings,
            output,
        } => {
            session.select_dataset(dataset)?;
            for path in listings {
                let text = read_text(path)?;
                let rendered = render_listing(&session, &text, cli.dpi)
                    .with_context(|| format!("Failed to render {}", path.display()))?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                session.save(rendered, &name, None);
            }

            let archive = session.export_gallery(Local::now())?;
            let path = output.clone().unwrap_or_else(|| PathBuf::from(&archive.filename));
            fs::write(&path, &archive.bytes)
                .with_context(|| format!("Failed to write archive to {}", path.display()))?;
            println!("{} charts -> {}", session.gallery().len(), path.display());
        }
    }

    Ok(())
}
