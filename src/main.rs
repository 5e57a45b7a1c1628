//! OUVC — Over/Under-Value Checker
//!
//! Entry point. Loads secrets and configuration, initialises
//! structured logging, and dispatches to the property analyzer, the
//! crypto screener, the offline demo, or the web API server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

use ouvc::config::AppConfig;
use ouvc::crypto::coingecko::CoinGeckoClient;
use ouvc::crypto::defillama::DefiLlamaClient;
use ouvc::crypto::screen::undervalued_test;
use ouvc::crypto::{CoinScreener, TvlFallback};
use ouvc::dashboard;
use ouvc::dashboard::routes::ApiState;
use ouvc::listings::bayut::BayutClient;
use ouvc::listings::demo::DemoListings;
use ouvc::listings::{ListingSource, TargetSpec};
use ouvc::secrets::SecretsManager;
use ouvc::types::{CoinSnapshot, Coordinates, Purpose, WhitepaperInputs};
use ouvc::valuation::comparables::ComparableSelector;
use ouvc::valuation::estimator::ValuationEstimator;
use ouvc::valuation::rental::RentalEstimator;
use ouvc::valuation::signals::SignalGenerator;
use ouvc::valuation::ValuationPipeline;

const BANNER: &str = r#"
  ___  _   ___     ______
 / _ \| | | \ \   / / ___|
| | | | | | |\ \ / / |
| |_| | |_| | \ V /| |___
 \___/ \___/   \_/  \____|

  Over/Under-Value Checker
  v0.1.0
"#;

#[derive(Parser)]
#[command(name = "ouvc", about = "Over/Under-Value Checker for property listings and crypto assets")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a property against comparable listings.
    Property {
        /// Location slug or Bayut external id (e.g. dubai-marina).
        #[arg(long)]
        location: String,
        /// Asking price.
        #[arg(long)]
        price: f64,
        /// Floor area in square units.
        #[arg(long)]
        area: Option<f64>,
        /// Bedroom count (0 = studio).
        #[arg(long)]
        rooms: Option<u32>,
        #[arg(long)]
        baths: Option<u32>,
        /// for-sale or for-rent.
        #[arg(long, default_value = "for-sale")]
        purpose: String,
        /// Treat the target as a verified listing.
        #[arg(long)]
        verified: bool,
        /// Target latitude (with --lng, enables distance ranking).
        #[arg(long)]
        lat: Option<f64>,
        #[arg(long)]
        lng: Option<f64>,
        /// Amenity names on the target (repeatable).
        #[arg(long = "amenity")]
        amenities: Vec<String>,
    },
    /// Run the 60-second undervalued test on a coin.
    Crypto {
        /// Coin name or ticker (e.g. zcash, btc).
        #[arg(long)]
        coin: String,
        /// New coins minted per year (whitepaper figure).
        #[arg(long)]
        new_coins_per_year: f64,
        /// Value locked in USD; omitted means auto-resolve from
        /// DeFiLlama or estimate from market cap.
        #[arg(long)]
        value_locked: Option<f64>,
    },
    /// Run both analyses on built-in sample data, no keys needed.
    Demo,
    /// Serve the JSON API and web page.
    Serve {
        /// Port override; defaults to the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    println!("{BANNER}");

    // Secrets file keys become process env vars, so config-declared
    // env references resolve either way.
    let secrets = SecretsManager::default_location();
    let loaded = secrets.load()?;
    if loaded == 0 {
        info!("No secrets file; using process environment only");
    }

    match cli.command {
        Command::Property {
            location,
            price,
            area,
            rooms,
            baths,
            purpose,
            verified,
            lat,
            lng,
            amenities,
        } => {
            let spec = TargetSpec {
                location,
                purpose: purpose.parse::<Purpose>()?,
                price,
                area,
                rooms,
                baths,
                coordinates: match (lat, lng) {
                    (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
                    _ => None,
                },
                verified,
                amenities,
            };
            run_property(&cfg, &secrets, spec).await?;
        }
        Command::Crypto {
            coin,
            new_coins_per_year,
            value_locked,
        } => {
            let screener = build_screener(&cfg, &secrets)?;
            let report = screener.screen(&coin, new_coins_per_year, value_locked).await?;
            println!("{report}");
        }
        Command::Demo => run_demo(&cfg).await?,
        Command::Serve { port } => {
            let state = Arc::new(ApiState {
                source: build_source(&cfg, &secrets)?,
                pipeline: build_pipeline(&cfg),
                screener: build_screener(&cfg, &secrets)?,
                max_pages: cfg.listings.max_pages,
            });
            dashboard::serve(state, port.unwrap_or(cfg.dashboard.port)).await?;
        }
    }

    Ok(())
}

/// Analyze one property end to end and print the report.
async fn run_property(cfg: &AppConfig, secrets: &SecretsManager, spec: TargetSpec) -> Result<()> {
    let source = build_source(cfg, secrets)?;
    let pipeline = build_pipeline(cfg);

    let query = spec.search_query(cfg.listings.max_pages);
    info!(location = %query.location, source = source.name(), "Fetching candidate listings");
    let pool = source.search(&query).await?;

    let target = spec.to_record(&pool);
    let analysis = pipeline.analyze(&target, &pool)?;

    println!("Property analysis ({} pool listings from {})", pool.len(), source.name());
    println!("{analysis}");
    Ok(())
}

/// Offline demo: Marina 2BR against the demo pool, plus the Zcash
/// screen on fixed sample numbers.
async fn run_demo(cfg: &AppConfig) -> Result<()> {
    println!("Demo: Dubai Marina 2BR, 1,200 sqft, asking 1,800,000\n");

    let source = DemoListings::new();
    let pipeline = build_pipeline(cfg);
    let spec = TargetSpec {
        location: "dubai-marina".to_string(),
        purpose: Purpose::ForSale,
        price: 1_800_000.0,
        area: Some(1200.0),
        rooms: Some(2),
        baths: Some(2),
        coordinates: Some(Coordinates::new(25.0800, 55.1400)),
        verified: true,
        amenities: vec!["Balcony".to_string(), "Parking".to_string()],
    };

    let pool = source.search(&spec.search_query(1)).await?;
    let target = spec.to_record(&pool);
    let analysis = pipeline.analyze(&target, &pool)?;
    println!("{analysis}");

    println!("Demo: Zcash undervalued test\n");
    let snapshot = CoinSnapshot {
        name: "Zcash".to_string(),
        symbol: "ZEC".to_string(),
        price: 45.0,
        circulating_supply: 15_000_000.0,
        total_supply: None,
        max_supply: Some(21_000_000.0),
        volume_24h: 50_000_000.0,
        market_cap: 675_000_000.0,
        price_change_24h: None,
        value_locked: Some(1_600_000_000.0),
    };
    let inputs = WhitepaperInputs {
        new_coins_per_year: 657_000.0,
        value_locked_usd: 1_600_000_000.0,
    };
    let report = undervalued_test(&snapshot, &inputs, &cfg.crypto.screen_config());
    println!("{report}");

    Ok(())
}

/// Bayut when a key is configured, demo pool otherwise.
fn build_source(cfg: &AppConfig, secrets: &SecretsManager) -> Result<Box<dyn ListingSource>> {
    match secrets.get(&cfg.listings.api_key_env) {
        Some(key) => Ok(Box::new(BayutClient::new(key)?)),
        None => {
            warn!(
                key_env = %cfg.listings.api_key_env,
                "No listings API key configured — using demo data"
            );
            Ok(Box::new(DemoListings::new()))
        }
    }
}

fn build_pipeline(cfg: &AppConfig) -> ValuationPipeline {
    ValuationPipeline::new(
        ComparableSelector::new(cfg.screener.selector_config()),
        ValuationEstimator::new(cfg.screener.estimator_config()),
        RentalEstimator::new(Default::default()),
        SignalGenerator::new(Default::default()),
    )
}

fn build_screener(cfg: &AppConfig, secrets: &SecretsManager) -> Result<CoinScreener> {
    Ok(CoinScreener::new(
        CoinGeckoClient::new(secrets.get(&cfg.crypto.coingecko_key_env))?,
        DefiLlamaClient::new()?,
        cfg.crypto.screen_config(),
        TvlFallback::default(),
    ))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ouvc=info"));

    let json_logging = std::env::var("OUVC_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
