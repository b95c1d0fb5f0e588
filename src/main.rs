mod app;
mod config;
mod fleet;
mod layout;
mod map;
mod util;

use std::time::Duration;

use clap::Parser;

use crate::config::{DEFAULT_ENDPOINT, MapConfig};
use crate::fleet::GeoPoint;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// GeoJSON endpoint serving the latest vehicle positions.
    #[arg(long, env = "BUSMAP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[arg(long, env = "BUSMAP_REFRESH_SECS", default_value_t = 10)]
    refresh_secs: u64,

    #[arg(long, env = "BUSMAP_REQUEST_TIMEOUT_SECS", default_value_t = 8)]
    request_timeout_secs: u64,

    /// Screen distance under which markers are grouped.
    #[arg(long, default_value_t = 28.0)]
    cluster_radius: f32,

    #[arg(long, default_value_t = 24.105, allow_negative_numbers = true)]
    center_lon: f64,

    #[arg(long, default_value_t = 56.949, allow_negative_numbers = true)]
    center_lat: f64,

    #[arg(long, default_value_t = 12.0)]
    zoom: f64,
}

impl Args {
    fn into_config(self) -> MapConfig {
        MapConfig {
            endpoint: self.endpoint,
            refresh_interval: Duration::from_secs(self.refresh_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            cluster_radius_px: self.cluster_radius,
            center: GeoPoint::new(self.center_lon, self.center_lat),
            zoom: self.zoom,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    config.validate()?;
    log::info!(
        "polling {} every {}s",
        config.endpoint,
        config.refresh_interval.as_secs()
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "busmap",
        options,
        Box::new(move |cc| Ok(Box::new(app::BusMapApp::new(cc, config.clone())))),
    )
    .map_err(|error| anyhow::anyhow!("failed to start the map window: {error}"))
}
