use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use sommelier::Settings;
use sommelier_core::{parse_grapes, Catalog, WineProfile};
use sommelier_recommend::{
    CachedGeocoder, CatalogGeocoder, ExplainedRecommendation, FoodFilters, FoodQuery, Geocoder,
    QueryRequest, RecommendationSet, RecommendationStats,
};
use sommelier_storage::{load_catalog, persistence, ModelStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Content-based wine recommendations
#[derive(Parser, Debug)]
#[command(name = "sommelier")]
#[command(about = "Content-based wine recommendations", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the encoder and index over a catalog and save the model
    Fit {
        #[command(flatten)]
        source: CatalogSource,

        /// Path to the data directory
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
    /// Recommend wines similar to a description
    Recommend {
        #[command(flatten)]
        source: CatalogSource,

        /// Path to the data directory
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        #[command(flatten)]
        wine: WineArgs,

        /// Grape variety (repeatable or comma separated)
        #[arg(long = "grape")]
        grapes: Vec<String>,

        /// Alcohol by volume, in percent
        #[arg(long)]
        abv: Option<f64>,

        /// Number of recommendations
        #[arg(short, long, default_value_t = 5)]
        n: usize,

        /// Include per-field similarity breakdowns
        #[arg(long)]
        explain: bool,
    },
    /// Recommend wines that pair with a food
    Food {
        #[command(flatten)]
        source: CatalogSource,

        /// Food to pair with
        #[arg(long)]
        food: String,

        /// Only match whole pairing tags
        #[arg(long)]
        exact: bool,

        #[command(flatten)]
        wine: WineArgs,

        /// Grape variety (repeatable or comma separated); wines with any of them match
        #[arg(long = "grape")]
        grapes: Vec<String>,

        /// Number of recommendations
        #[arg(short, long, default_value_t = 5)]
        n: usize,
    },
    /// Describe the saved model artifact
    Inspect {
        /// Path to the data directory
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct CatalogSource {
    /// Wine catalog (JSON-lines or JSON array, optionally .gz)
    #[arg(long)]
    catalog: PathBuf,

    /// Per-user ratings to aggregate into the catalog
    #[arg(long)]
    ratings: Option<PathBuf>,
}

impl CatalogSource {
    fn load(&self) -> anyhow::Result<Catalog> {
        load_catalog(&self.catalog, self.ratings.as_deref())
            .with_context(|| format!("loading catalog {}", self.catalog.display()))
    }
}

#[derive(ClapArgs, Debug)]
struct WineArgs {
    /// Wine type (Red, White, Rosé, Sparkling, ...)
    #[arg(long = "type")]
    wine_type: Option<String>,

    /// Body, e.g. "Full-bodied"
    #[arg(long)]
    body: Option<String>,

    /// Acidity: Low, Medium or High
    #[arg(long)]
    acidity: Option<String>,

    /// Country of origin
    #[arg(long)]
    country: Option<String>,

    /// Region name
    #[arg(long)]
    region: Option<String>,
}

#[derive(Serialize)]
struct RecommendOutput {
    #[serde(flatten)]
    set: RecommendationSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<RecommendationStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explain: Option<Vec<ExplainedRecommendation>>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_store(
    settings: &Settings,
    data_dir: &Path,
    geocoder: Option<Arc<dyn Geocoder>>,
) -> anyhow::Result<ModelStore> {
    let store = ModelStore::new(
        data_dir,
        settings.encoder.clone(),
        settings.recommender.clone(),
    )?;
    Ok(match geocoder {
        Some(geocoder) => store.with_geocoder(geocoder),
        None => store,
    })
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

    let settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match args.command {
        Command::Fit { source, data_dir } => {
            info!("Fitting model into {:?}", data_dir);
            let catalog = source.load()?;
            let store = open_store(&settings, &data_dir, None)?;
            store.rebuild(catalog)?;
            print_json(&persistence::describe(&store.model_path())?)?;
        }
        Command::Recommend {
            source,
            data_dir,
            wine,
            grapes,
            abv,
            n,
            explain,
        } => {
            let catalog = source.load()?;

            let regions = CatalogGeocoder::from_catalog(&catalog);
            let geocoder = Arc::new(match &settings.geocode_cache {
                Some(path) => CachedGeocoder::with_cache_file(regions, path)?,
                None => CachedGeocoder::new(regions),
            });
            let shared: Arc<dyn Geocoder> = geocoder.clone();

            let store = open_store(&settings, &data_dir, Some(shared))?;
            let engine = store.load_or_rebuild(catalog)?;

            let profile = WineProfile {
                wine_type: wine.wine_type,
                grapes: grapes.iter().flat_map(|g| parse_grapes(g)).collect(),
                body: wine.body,
                acidity: wine.acidity,
                abv,
                region: wine.region,
                ..Default::default()
            };
            let mut request = QueryRequest::new(profile).with_n(n);
            request.country = wine.country;

            let set = engine.recommend_by_characteristics(&request)?;
            let (stats, explained) = if explain {
                let explained = engine.explain(&set)?;
                (Some(RecommendationStats::compute(&set, &explained)), Some(explained))
            } else {
                (None, None)
            };

            if let Some(path) = &settings.geocode_cache {
                geocoder.save_cache(path)?;
            }

            print_json(&RecommendOutput {
                set,
                stats,
                explain: explained,
            })?;
        }
        Command::Food {
            source,
            food,
            exact,
            wine,
            grapes,
            n,
        } => {
            let catalog = source.load()?;
            let engine = sommelier::Recommender::new(Some(catalog), None, settings.recommender.clone())?;

            let filters = FoodFilters {
                wine_type: wine.wine_type,
                grapes,
                body: wine.body,
                acidity: wine.acidity,
                country: wine.country,
                region: wine.region,
            };
            let query = FoodQuery::new(food).with_filters(filters).exact(exact).with_n(n);
            let results = engine.recommend_by_food(&query)?;
            if results.is_empty() {
                info!("No wines pair with '{}' under the given filters", query.food);
            }
            print_json(&results)?;
        }
        Command::Inspect { data_dir } => {
            let path = data_dir.join(sommelier_storage::MODEL_FILENAME);
            print_json(&persistence::describe(&path)?)?;
        }
    }

    Ok(())
}
