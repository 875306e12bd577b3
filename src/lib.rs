pub mod capture;
pub mod db;
pub mod ranging;
pub mod settings;
pub mod stats;
pub mod utils;

use std::path::PathBuf;

use anyhow::Context;
use log::info;

use capture::CaptureController;
use db::Database;
use settings::SettingsStore;
use stats::SessionStats;

const DATA_DIR_ENV: &str = "RANGELOG_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "rangelog-data";

fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Rangelog starting up...");

    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("rangelog.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let ranging = settings.ranging();
    info!(
        "Ranging: roi {:.2}, offset ({:+.2}, {:+.2}), window {}, {} depth",
        ranging.roi_fraction,
        ranging.offset_x,
        ranging.offset_y,
        ranging.smoothing_window,
        if ranging.use_smoothed_source { "smoothed" } else { "raw" }
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let controller = CaptureController::new(database, &settings.capture());
        let active = controller.restore_or_start().await?;
        info!("Active session: {}", active.display_name());

        for session in controller.list_sessions().await? {
            let stats = SessionStats::for_session(&session);
            match stats.median_m {
                Some(median) => info!(
                    "{}: {} points, median {median:.2} m, path {:.0} m",
                    session.display_name(),
                    stats.count,
                    stats.path_length_m
                ),
                None => info!("{}: no points", session.display_name()),
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
