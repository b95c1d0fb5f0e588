use std::time::Duration;

use anyhow::{Result, bail};

use crate::fleet::GeoPoint;
use crate::map::{CLUSTER_DISTANCE_PX, MAX_ZOOM, MIN_ZOOM};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/buses";

#[derive(Clone, Debug)]
pub struct MapConfig {
    pub endpoint: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub cluster_radius_px: f32,
    pub center: GeoPoint,
    pub zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            refresh_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(8),
            cluster_radius_px: CLUSTER_DISTANCE_PX,
            center: GeoPoint::new(24.105, 56.949),
            zoom: 12.0,
        }
    }
}

impl MapConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            bail!("endpoint must be an http(s) URL, got {:?}", self.endpoint);
        }
        if self.refresh_interval.is_zero() {
            bail!("refresh interval must be at least one second");
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be at least one second");
        }
        if !self.cluster_radius_px.is_finite() || self.cluster_radius_px <= 0.0 {
            bail!(
                "cluster radius must be a positive number of pixels, got {}",
                self.cluster_radius_px
            );
        }
        if !(-180.0..=180.0).contains(&self.center.lon) || !(-90.0..=90.0).contains(&self.center.lat)
        {
            bail!(
                "initial center ({}, {}) is not a valid longitude/latitude",
                self.center.lon,
                self.center.lat
            );
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom) {
            bail!("zoom must be between {MIN_ZOOM} and {MAX_ZOOM}, got {}", self.zoom);
        }
        Ok(())
    }
}
