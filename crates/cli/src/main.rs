use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::seq::IndexedRandom;
use rand::Rng;
use scorer::{RecommendationResult, RecommendationSource, UserPreferences};
use service::{RecommendationService, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::warn;
use trainer::GENRE_CATALOG;

/// ReelRecs - Streaming content recommendation core
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Train and query the content recommendation model", long_about = None)]
struct Cli {
    /// Directory holding the model artifact (overrides MODEL_DIR)
    #[arg(short, long, global = true)]
    model_dir: Option<PathBuf>,

    /// MLflow tracking server (overrides MLFLOW_TRACKING_URI)
    #[arg(long, global = true)]
    tracking_uri: Option<String>,

    /// Train without experiment tracking
    #[arg(long, global = true)]
    no_tracking: bool,

    /// Seed for the synthetic catalog (overrides SYNTHETIC_SEED)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new model and reload it
    Train {
        /// Retrain even if a model exists
        #[arg(long)]
        force: bool,
    },

    /// Get recommendations for a user
    Recommend {
        #[arg(long, default_value = "anonymous")]
        user_id: String,

        #[arg(long, default_value = "default")]
        profile_id: String,

        /// Preferred genres, comma separated
        #[arg(long, value_delimiter = ',')]
        genres: Vec<String>,

        /// Watched content ids, comma separated
        #[arg(long, value_delimiter = ',')]
        watched: Vec<String>,

        /// Full preferences as JSON, e.g. '{"genres":["Drama"],"watchHistory":[{"contentId":"content_1"}]}'
        #[arg(long)]
        preferences: Option<String>,

        /// Number of recommendations to return
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the loaded model
    Info,

    /// Show service health
    Health,

    /// Log a rating for a piece of content
    Feedback {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        content_id: String,

        #[arg(long)]
        rating: f32,
    },

    /// Run benchmark to test scoring performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let start = Instant::now();
    let service = RecommendationService::from_config(&config)
        .await
        .context("Failed to start recommendation service")?;
    println!(
        "{} Service ready in {:?} (model {})",
        "✓".green(),
        start.elapsed(),
        if service.model_info().model_loaded {
            "loaded".green()
        } else {
            "not loaded".yellow()
        }
    );

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Train { force } => handle_train(&service, force).await?,
        Commands::Recommend {
            user_id,
            profile_id,
            genres,
            watched,
            preferences,
            limit,
            json,
        } => {
            let preferences = build_preferences(preferences.as_deref(), genres, watched)?;
            handle_recommend(&service, &user_id, &profile_id, &preferences, limit, json)?
        }
        Commands::Info => handle_info(&service)?,
        Commands::Health => handle_health(&service)?,
        Commands::Feedback {
            user_id,
            content_id,
            rating,
        } => handle_feedback(&service, &user_id, &content_id, rating)?,
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(service, requests, concurrent).await?,
    }

    Ok(())
}

/// Environment first, then command-line overrides
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::from_env()?;
    if let Some(model_dir) = &cli.model_dir {
        config.model_dir = model_dir.clone();
    }
    if let Some(uri) = &cli.tracking_uri {
        config.mlflow_tracking_uri = uri.clone();
    }
    if cli.no_tracking {
        config.tracking_enabled = false;
    }
    if let Some(seed) = cli.seed {
        config.synthetic_seed = Some(seed);
    }
    Ok(config)
}

/// JSON preferences, extended by any --genres / --watched values
fn build_preferences(
    json: Option<&str>,
    genres: Vec<String>,
    watched: Vec<String>,
) -> Result<UserPreferences> {
    let base = match json {
        Some(raw) => serde_json::from_str(raw).context("Invalid --preferences JSON")?,
        None => UserPreferences::new(),
    };
    Ok(base.with_genres(genres).with_watched(watched))
}

/// Handle the 'train' command
async fn handle_train(service: &RecommendationService, force: bool) -> Result<()> {
    let report = service.train(force).await?;
    let metrics = &report.metrics;

    println!("{}", report.message.bold().blue());
    println!("{}Content items: {}", "• ".green(), metrics.num_content_items);
    println!("{}Genres: {}", "• ".green(), metrics.num_genres);
    println!("{}Model version: {}", "• ".green(), metrics.model_version);
    println!("{}Training time: {}", "• ".green(), metrics.training_time);
    if report.model_reloaded {
        println!("{}Model reloaded", "• ".cyan());
    } else {
        println!("{}Model was not reloaded", "• ".red());
    }
    Ok(())
}

/// Handle the 'recommend' command
fn handle_recommend(
    service: &RecommendationService,
    user_id: &str,
    profile_id: &str,
    preferences: &UserPreferences,
    limit: usize,
    json: bool,
) -> Result<()> {
    let result = service.recommend(user_id, profile_id, preferences, limit);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_recommendations(user_id, &result);
    }
    Ok(())
}

/// Handle the 'info' command
fn handle_info(service: &RecommendationService) -> Result<()> {
    let info = service.model_info();

    println!("{}", "Model info:".bold().blue());
    println!("{}Loaded: {}", "• ".green(), info.model_loaded);
    println!("{}Path: {}", "• ".green(), info.model_path);
    println!("{}Type: {}", "• ".green(), info.model_type);
    println!("{}Content items: {}", "• ".cyan(), info.num_content_items);
    if let Some(version) = &info.model_version {
        println!("{}Version: {}", "• ".cyan(), version);
    }
    if let Some(created_at) = info.artifact_created_at {
        println!("{}Trained at: {}", "• ".cyan(), created_at.to_rfc3339());
    }
    Ok(())
}

/// Handle the 'health' command
fn handle_health(service: &RecommendationService) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&service.health())?);
    Ok(())
}

/// Handle the 'feedback' command
fn handle_feedback(
    service: &RecommendationService,
    user_id: &str,
    content_id: &str,
    rating: f32,
) -> Result<()> {
    let ack = service.log_feedback(user_id, content_id, rating)?;
    println!("{} {}", "✓".green(), ack.message);
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: RecommendationService,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if requests == 0 || concurrent == 0 {
        bail!("--requests and --concurrent must both be positive");
    }
    if !service.model_info().model_loaded {
        warn!("No model loaded; training one before benchmarking");
        service.train(false).await?;
    }

    // Random preferences drawn from the synthetic catalog
    let catalog_size = service.model_info().num_content_items.max(1);
    let requests_prefs: Vec<UserPreferences> = {
        let mut rng = rand::rng();
        (0..requests)
            .map(|_| {
                let genres: Vec<&str> =
                    GENRE_CATALOG.choose_multiple(&mut rng, 2).copied().collect();
                let watched = (0..rng.random_range(0..10))
                    .map(|_| format!("content_{}", rng.random_range(0..catalog_size)))
                    .collect::<Vec<_>>();
                UserPreferences::new().with_genres(genres).with_watched(watched)
            })
            .collect()
    };

    let service = Arc::new(service);
    let permits = Arc::new(Semaphore::new(concurrent));
    let wall_clock = Instant::now();

    let mut handles = vec![];
    for (i, prefs) in requests_prefs.into_iter().enumerate() {
        let service = service.clone();
        let permits = permits.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            let result = tokio::task::spawn_blocking(move || {
                service.recommend(&format!("user-{}", i), "default", &prefs, 20)
            })
            .await?;
            Ok::<_, anyhow::Error>((start.elapsed(), result.source))
        });
        handles.push(handle);
    }

    let mut timings: Vec<Duration> = Vec::with_capacity(requests);
    let mut fallbacks = 0;
    for handle in handles {
        let (elapsed, source) = handle.await??;
        if source != RecommendationSource::MlModel {
            fallbacks += 1;
        }
        timings.push(elapsed);
    }
    let total_time = wall_clock.elapsed();

    let latency_sum: Duration = timings.iter().sum();
    let avg_latency = latency_sum / (timings.len() as u32);
    timings.sort();
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() as f32 * 0.95) as usize];
    let p99 = timings[(timings.len() as f32 * 0.99) as usize];
    let throughput = requests as f32 / total_time.as_secs_f32();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);
    if fallbacks > 0 {
        println!("{} {} requests fell back", "!".yellow(), fallbacks);
    }

    Ok(())
}

/// Helper function to format and print recommendations
fn print_recommendations(user_id: &str, result: &RecommendationResult) {
    let source = match result.source {
        RecommendationSource::MlModel => result.source.to_string().green(),
        RecommendationSource::RuleBased => result.source.to_string().yellow(),
        RecommendationSource::Error => result.source.to_string().red(),
    };
    println!(
        "{} [{} | confidence {:.2}]",
        format!("Recommendations for {}:", user_id).bold().blue(),
        source,
        result.confidence
    );

    if result.content_ids.is_empty() {
        println!("  (none)");
        return;
    }
    for (rank, content_id) in result.content_ids.iter().enumerate() {
        println!("{}. {}", (rank + 1).to_string().green(), content_id);
    }
}
