use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use adview_core::clock::SystemClock;
use adview_core::types::Ad;
use adview_sim::file_store::FileBackend;
use adview_sim::session::{Session, VisibilityScript, WatchReport};
use adview_sim::settings::SimSettings;
use adview_sim::SimError;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "adview-sim")]
#[command(about = "Run the ad-view reward flow headless against a local state file")]
struct Cli {
    /// Config file (default: ~/.config/adview/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    /// State file standing in for localStorage
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Profile email used when the state has no profile yet
    #[arg(long, global = true, default_value = "sim@adview.local")]
    email: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a native ad to completion and claim it
    Watch {
        #[arg(long)]
        ad: String,
        /// JSON file with the ad list (bare array or {"ads": [...]})
        #[arg(long)]
        ads: Option<PathBuf>,
        /// Seconds after opening when the tab goes hidden
        #[arg(long)]
        hidden_at: Option<f64>,
        /// Seconds after opening when the tab is visible again
        #[arg(long)]
        visible_at: Option<f64>,
    },
    /// Visit a redirect ad's site and return after a while
    Redirect {
        #[arg(long)]
        ad: String,
        #[arg(long)]
        ads: Option<PathBuf>,
        /// Seconds spent on the advertiser's site
        #[arg(long)]
        return_after: f64,
    },
    /// Show or change the local balance
    Balance {
        #[command(subcommand)]
        op: Option<BalanceOp>,
    },
    /// Response cache maintenance
    Cache {
        #[command(subcommand)]
        op: CacheOp,
    },
    /// List ads, unwatched first
    Ads {
        #[arg(long)]
        ads: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BalanceOp {
    Add { amount: f64 },
    Subtract { amount: f64 },
}

#[derive(Subcommand)]
enum CacheOp {
    /// Remove expired and unreadable entries
    ClearExpired,
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

fn read_ads(cli_path: Option<&Path>, settings: &SimSettings) -> Result<Vec<Ad>, Box<dyn std::error::Error>> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| settings.ads_file.clone())
        .ok_or("No ads file given (use --ads or ads_file in config)")?;
    let text = fs::read_to_string(&path).map_err(|e| SimError::Io {
        path: path.clone(),
        source: e,
    })?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(SimError::Ads)?;
    Ok(Ad::list_from_value(value))
}

fn print_report(report: &WatchReport, session: &Session) {
    if let Some(url) = &report.visited {
        println!("Visited {}", url);
    }
    for event in &report.events {
        println!("  event: {:?}", event);
    }
    println!(
        "Ad {} ended {:?} after {:.1}s",
        report.ad_id,
        report.final_state,
        report.elapsed_ms as f64 / 1000.0
    );
    match &report.outcome {
        Some(outcome) => {
            println!("{}", outcome.message());
            if !outcome.synced {
                println!("  (balance kept locally, server unreachable)");
            }
        }
        None => println!("No reward. Balance: {}", session.ledger.get_current_balance()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = SimSettings::load(cli.config.as_deref())?;
    let state_path = cli.state.clone().unwrap_or_else(|| settings.state_path());
    tracing::debug!("Using state file {}", state_path.display());

    let session = Session::new(
        FileBackend::open(&state_path),
        settings.app.clone(),
        Rc::new(SystemClock),
        &cli.email,
    );

    match cli.command {
        Commands::Watch {
            ad,
            ads,
            hidden_at,
            visible_at,
        } => {
            let ads = read_ads(ads.as_deref(), &settings)?;
            let script = VisibilityScript {
                hidden_at_ms: hidden_at.map(secs_to_ms),
                visible_at_ms: visible_at.map(secs_to_ms),
            };
            let report = session.run_watch(ads, &ad, script)?;
            print_report(&report, &session);
        }
        Commands::Redirect {
            ad,
            ads,
            return_after,
        } => {
            let ads = read_ads(ads.as_deref(), &settings)?;
            let report = session.run_redirect(ads, &ad, secs_to_ms(return_after))?;
            print_report(&report, &session);
        }
        Commands::Balance { op } => {
            match op {
                Some(BalanceOp::Add { amount }) => {
                    session.ledger.try_apply_balance_change(amount.abs(), "manual add")?;
                }
                Some(BalanceOp::Subtract { amount }) => {
                    session
                        .ledger
                        .try_apply_balance_change(-amount.abs(), "manual subtract")?;
                }
                None => {}
            }
            println!("Balance: {}", session.ledger.get_current_balance());
        }
        Commands::Cache {
            op: CacheOp::ClearExpired,
        } => {
            let removed = session.cache.clear_expired();
            println!("Removed {} cache entries", removed);
        }
        Commands::Ads { ads } => {
            let ads = read_ads(ads.as_deref(), &settings)?;
            let queue = session.queue(ads);
            for ad in queue.ads() {
                let mark = if session.profiles.is_watched(&ad.id) {
                    "x"
                } else {
                    " "
                };
                println!(
                    "[{}] {:<12} {:<9} +{:<6} {}",
                    mark,
                    ad.id,
                    format!("{:?}", ad.ad_type).to_lowercase(),
                    ad.reward_per_view,
                    ad.title
                );
            }
        }
    }
    Ok(())
}
