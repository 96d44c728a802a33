use anyhow::Context;
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use shelfx_core::{Algorithm, Catalog, Distribution, ShelfConfig};
use shelfx_storage::{text_format, ShelfManager};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Similarity-driven shelf layout engine
#[derive(Parser, Debug)]
#[command(name = "shelfx")]
#[command(about = "Places related products next to each other on a shelf", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new distribution for a shelf
    Generate {
        /// Catalog JSON with product lists and similarities
        #[arg(long)]
        catalog: PathBuf,

        /// Product list to place
        #[arg(long)]
        list: String,

        /// Shelf id
        #[arg(long, default_value_t = 0)]
        shelf: u32,

        /// Shelf width in cells [default: 4 for a new shelf]
        #[arg(long)]
        xsize: Option<usize>,

        /// Shelf height in cells [default: 3 for a new shelf]
        #[arg(long)]
        ysize: Option<usize>,

        /// exhaustive or hill-climbing
        #[arg(long, default_value = "hill-climbing")]
        algorithm: String,

        /// Search work limit, negative for unbounded
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        limit: i64,

        /// Distribution name
        #[arg(long)]
        name: String,

        /// Persist shelves and distributions under this directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print a persisted distribution
    Show {
        /// Distribution text file
        file: PathBuf,

        /// Catalog JSON used to score the layout
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_grid(distribution: &Distribution) {
    let rows = distribution.render_as_names();
    let width = rows
        .iter()
        .flatten()
        .map(|cell| cell.as_deref().unwrap_or(text_format::EMPTY_MARKER).len())
        .max()
        .unwrap_or(0);
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .map(|cell| {
                format!(
                    "{:<width$}",
                    cell.as_deref().unwrap_or(text_format::EMPTY_MARKER),
                    width = width
                )
            })
            .collect();
        println!("{}", line.join(" | ").trim_end());
    }
}

/// Requested dimensions must agree with an existing shelf.
fn check_dimensions(existing: ShelfConfig, xsize: Option<usize>, ysize: Option<usize>) -> anyhow::Result<()> {
    let xsize = xsize.unwrap_or(existing.xsize);
    let ysize = ysize.unwrap_or(existing.ysize);
    if (xsize, ysize) != (existing.xsize, existing.ysize) {
        anyhow::bail!(
            "shelf {} is {}x{}, not {}x{}",
            existing.id,
            existing.xsize,
            existing.ysize,
            xsize,
            ysize
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn generate(
    catalog: PathBuf,
    list: String,
    shelf_id: u32,
    xsize: Option<usize>,
    ysize: Option<usize>,
    algorithm: &str,
    limit: i64,
    name: String,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let catalog = Catalog::load(&catalog)
        .with_context(|| format!("failed to load catalog {:?}", catalog))?;

    let manager = match &data_dir {
        Some(dir) => ShelfManager::open(dir, catalog)?,
        None => ShelfManager::new(catalog),
    };

    let config = match manager.shelf(shelf_id) {
        Ok(shelf) => {
            check_dimensions(shelf.config(), xsize, ysize)?;
            if shelf.products().name() == list {
                info!("Using existing shelf {}", shelf_id);
            } else {
                let cleared = manager.reassign_products(shelf_id, &list)?;
                info!("Reassigned shelf {}, cleared {} distributions", shelf_id, cleared.len());
            }
            shelf.config()
        }
        Err(_) => {
            let defaults = ShelfConfig::default();
            let config = ShelfConfig {
                id: shelf_id,
                xsize: xsize.unwrap_or(defaults.xsize),
                ysize: ysize.unwrap_or(defaults.ysize),
            };
            manager.create_shelf(config, &list)?;
            config
        }
    };

    let distribution = manager.generate_distribution(config.id, &name, algorithm, limit)?;
    let score = distribution.score(manager.catalog().similarity());

    println!("{} ({}x{}, {})", distribution.name(), distribution.cols(), distribution.rows(), algorithm);
    print_grid(&distribution);
    println!("score: {:.4}", score);

    if let Some(dir) = &data_dir {
        info!("Saved shelf {} under {:?}", config.id, dir);
    }
    Ok(())
}

fn show(file: PathBuf, catalog: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {:?}", file))?;
    let distribution = text_format::read_distribution(&text)?;
    let score = match catalog {
        Some(path) => Some(Catalog::load(&path)?.similarity().clone()),
        None => None,
    }
    .map(|similarity| distribution.score(&similarity));

    let created = distribution.created_at().to_rfc3339_opts(SecondsFormat::Secs, true);
    let modified = distribution.modified_at().to_rfc3339_opts(SecondsFormat::Secs, true);

    if json {
        let value = serde_json::json!({
            "name": distribution.name(),
            "created_at": created,
            "modified_at": modified,
            "rows": distribution.render_as_names(),
            "score": score,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", distribution.name());
    println!("created:  {}", created);
    println!("modified: {}", modified);
    print_grid(&distribution);
    if let Some(score) = score {
        println!("score: {:.4}", score);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Generate {
            catalog,
            list,
            shelf,
            xsize,
            ysize,
            algorithm,
            limit,
            name,
            data_dir,
        } => generate(
            catalog,
            list,
            shelf,
            xsize,
            ysize,
            &algorithm,
            limit,
            name,
            data_dir,
        ),
        Command::Show { file, catalog, json } => show(file, catalog, json),
    }
}
