use std::sync::Arc;

use eframe::egui::{Context, Rect};

use crate::config::MapConfig;
use crate::fleet::{GeoPoint, HttpSnapshotSource, SnapshotSource};
use crate::map::{MarkerLayer, RefreshOutcome, Refresher};

mod map;
mod render_utils;
mod ui;

pub struct BusMapApp {
    model: ViewModel,
}

struct ViewModel {
    endpoint: String,
    refresher: Refresher,
    layer: MarkerLayer,
    center: GeoPoint,
    zoom: f64,
    cluster_radius_px: f32,
    zooming: bool,
    view_dirty: bool,
    search: String,
    popup_rect: Option<Rect>,
    last_outcome: Option<RefreshOutcome>,
}

impl BusMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: MapConfig) -> Self {
        let source: Arc<dyn SnapshotSource> = Arc::new(HttpSnapshotSource::new(
            config.endpoint.clone(),
            config.request_timeout,
        ));
        Self {
            model: ViewModel::new(config, source),
        }
    }
}

impl eframe::App for BusMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.model.show(ctx);
    }
}
