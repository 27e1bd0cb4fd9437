// Rumbo SUP conditions CLI v0.1
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rumbo_sup_client::config::{AppConfig, SessionCacheBackend};
use rumbo_sup_client::errors::AppError;
use rumbo_sup_client::models::{BoardType, Experience, PaddlePower, Profile, SessionGoal};
use rumbo_sup_client::services::api::ApiClient;
use rumbo_sup_client::services::orchestrator::{FetchOrchestrator, LoadParams, LoadPhase};
use rumbo_sup_client::services::view::ConditionsView;
use rumbo_sup_client::services::wind::{classify, WindReading};
use rumbo_sup_client::storage::cache::CacheStore;
use rumbo_sup_client::storage::kv::{FileStore, KeyValueStore, MemoryStore};
use rumbo_sup_client::storage::profile::ProfileStore;

/// How often the cold-start flag is checked while a load is pending.
const COLD_START_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "rumbo", version, about = "SUP paddling conditions for your spot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show conditions for the configured spot.
    Conditions {
        /// Change the session goal of the saved profile first.
        #[arg(long)]
        goal: Option<SessionGoal>,
        /// Hour index into the timeline (0 = now).
        #[arg(long, default_value_t = 0)]
        at: usize,
        /// Skip the cache and fetch from the service.
        #[arg(long)]
        refresh: bool,
    },
    /// Explain the conditions at one hour for the saved profile.
    Explain {
        #[arg(long, default_value_t = 0)]
        at: usize,
    },
    /// Manage the saved rider profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Find the closest known spot to a coordinate.
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Check whether the backend is up.
    Health,
    /// Classify a wind direction (degrees, wind coming from).
    Wind {
        #[arg(allow_hyphen_values = true)]
        degrees: f64,
        #[arg(long)]
        speed: Option<f64>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    Set {
        #[arg(long)]
        board: BoardType,
        #[arg(long)]
        experience: Experience,
        #[arg(long)]
        power: PaddlePower,
        #[arg(long, default_value = "calm")]
        goal: SessionGoal,
    },
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rumbo_sup_client=info,rumbo=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if std::env::var("RUMBO_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Wind { degrees, speed } => {
            print_wind(classify(Some(degrees), speed, None));
            Ok(())
        }
        Command::Health => {
            let api = ApiClient::new(&config.api_url, config.request_timeout)?;
            match api.health().await {
                Some(status) => println!("Backend {} ({})", status.status, config.api_url),
                None => println!("Backend unavailable ({})", config.api_url),
            }
            Ok(())
        }
        Command::Nearest { lat, lon } => {
            let api = ApiClient::new(&config.api_url, config.request_timeout)?;
            let spot = api.nearest_spot(lat, lon).await?;
            println!(
                "{} ({}) {:.1} km away",
                spot.name, spot.spot_id, spot.distance_km
            );
            Ok(())
        }
        Command::Profile { action } => {
            let profiles = open_profiles(&config)?;
            match action {
                ProfileAction::Show => match profiles.load() {
                    Some(profile) => print_profile(&profile),
                    None => println!("No profile saved."),
                },
                ProfileAction::Set {
                    board,
                    experience,
                    power,
                    goal,
                } => {
                    let profile = Profile {
                        board_type: board,
                        experience,
                        paddle_power: power,
                        session_goal: goal,
                    };
                    profiles.save(&profile)?;
                    print_profile(&profile);
                }
                ProfileAction::Clear => {
                    profiles.clear()?;
                    println!("Profile cleared.");
                }
            }
            Ok(())
        }
        Command::Conditions { goal, at, refresh } => {
            let profile = session_profile(&open_profiles(&config)?, goal)?;

            let orchestrator = build_orchestrator(&config)?;
            let params = LoadParams::new(config.spot_id.clone(), profile);
            if let LoadPhase::Error(message) =
                load_with_progress(&orchestrator, &params, refresh).await
            {
                return Err(AppError::ExternalServiceError(message));
            }

            orchestrator.select(at).await;
            print!("{}", ConditionsView::from_state(&orchestrator.snapshot().await));
            Ok(())
        }
        Command::Explain { at } => {
            let profiles = open_profiles(&config)?;
            let profile = profiles.load().ok_or_else(|| {
                AppError::BadRequest(
                    "No profile saved. Run `rumbo profile set` first.".to_string(),
                )
            })?;

            let api = ApiClient::new(&config.api_url, config.request_timeout)?;
            let orchestrator = FetchOrchestrator::new(api.clone(), open_cache(&config)?);
            let params = LoadParams::new(config.spot_id.clone(), Some(profile));
            if let LoadPhase::Error(message) =
                load_with_progress(&orchestrator, &params, false).await
            {
                return Err(AppError::ExternalServiceError(message));
            }

            orchestrator.select(at).await;
            let state = orchestrator.snapshot().await;
            let point = state.selector.selected_point().ok_or_else(|| {
                AppError::ExternalServiceError("no timeline point to explain".to_string())
            })?;
            let explanation = api.explain(&profile, &point.weather, &point.result).await?;
            println!("{}", explanation.explanation);
            if !explanation.glossary_terms.is_empty() {
                println!("\nGlossary: {}", explanation.glossary_terms.join(", "));
            }
            Ok(())
        }
    }
}

/// Profile for a conditions request, persisting a new session goal first.
/// A goal without a saved profile is rejected rather than dropped.
fn session_profile(
    profiles: &ProfileStore,
    goal: Option<SessionGoal>,
) -> Result<Option<Profile>, AppError> {
    let Some(goal) = goal else {
        return Ok(profiles.load());
    };
    match profiles.update_session_goal(goal)? {
        Some(profile) => Ok(Some(profile)),
        None => Err(AppError::BadRequest(
            "No profile saved, so --goal has nothing to update. Run `rumbo profile set` first."
                .to_string(),
        )),
    }
}

fn open_profiles(config: &AppConfig) -> Result<ProfileStore, AppError> {
    Ok(ProfileStore::new(Arc::new(FileStore::open(
        config.profile_dir(),
    )?)))
}

fn open_cache(config: &AppConfig) -> Result<CacheStore, AppError> {
    let store: Arc<dyn KeyValueStore> = match config.session_cache {
        SessionCacheBackend::File => Arc::new(FileStore::open(config.cache_dir())?),
        SessionCacheBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(CacheStore::new(store))
}

fn build_orchestrator(config: &AppConfig) -> Result<FetchOrchestrator<ApiClient>, AppError> {
    let api = ApiClient::new(&config.api_url, config.request_timeout)?;
    Ok(FetchOrchestrator::new(api, open_cache(config)?))
}

/// Run a load, telling the user once if the backend looks like it is waking up.
async fn load_with_progress(
    orchestrator: &FetchOrchestrator<ApiClient>,
    params: &LoadParams,
    force: bool,
) -> LoadPhase {
    let load = async {
        if force {
            orchestrator.refresh(params).await
        } else {
            orchestrator.load(params).await
        }
    };
    tokio::pin!(load);

    let mut announced = false;
    let mut ticker = tokio::time::interval(COLD_START_POLL_INTERVAL);
    loop {
        tokio::select! {
            phase = &mut load => return phase,
            _ = ticker.tick() => {
                if !announced && orchestrator.cold_start_visible().await {
                    announced = true;
                    eprintln!("{}", ConditionsView::Loading { cold_start: true });
                }
            }
        }
    }
}

fn print_profile(profile: &Profile) {
    println!(
        "board: {}, experience: {}, paddle power: {}, session goal: {}",
        profile.board_type.as_wire(),
        profile.experience.as_wire(),
        profile.paddle_power.as_wire(),
        profile.session_goal.as_wire()
    );
}

fn print_wind(reading: WindReading) {
    match reading {
        WindReading::Known(info) => {
            println!("{}", info.from_to_label());
            println!("relative to shore: {}", info.relative_direction);
            if info.is_offshore {
                println!("offshore wind: drift risk, stay close to shore");
            }
        }
        WindReading::Unknown => println!("direction unknown"),
    }
}
