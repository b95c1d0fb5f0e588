use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use eframe::egui::{self, Align, Color32, Context, Layout, RichText};

use crate::config::MapConfig;
use crate::fleet::SnapshotSource;
use crate::map::{MarkerLayer, RefreshOutcome, Refresher, TickOutcome};
use crate::util::format_age;

use super::super::ViewModel;

const POLL_REPAINT_INTERVAL: Duration = Duration::from_millis(100);

impl ViewModel {
    pub(in crate::app) fn new(config: MapConfig, source: Arc<dyn SnapshotSource>) -> Self {
        let mut layer = MarkerLayer::new();
        layer.attach_gesture_handler();

        Self {
            endpoint: config.endpoint.clone(),
            refresher: Refresher::new(source, config.refresh_interval, config.cluster_radius_px),
            layer,
            center: config.center,
            zoom: config.zoom,
            cluster_radius_px: config.cluster_radius_px,
            zooming: false,
            view_dirty: false,
            search: String::new(),
            popup_rect: None,
            last_outcome: None,
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        let now = Instant::now();
        if let Some(TickOutcome::Suppressed) = self.refresher.run_due(now, self.layer.interaction())
        {
            log::debug!("refresh tick held back while the user is interacting");
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("busmap");
                    ui.separator();
                    ui.label(format!("source: {}", self.endpoint));
                    ui.label(self.snapshot_summary());
                    ui.label(format!("clusters: {}", self.layer.clusters().len()));
                    if self.refresher.is_fetching() {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(error) = self.refresher.last_error() {
                            ui.label(
                                RichText::new(format!("refresh failed: {error}"))
                                    .color(Color32::from_rgb(236, 112, 99)),
                            );
                        } else if let Some(applied) = self.refresher.last_applied() {
                            ui.label(format!("updated {}", format_age(applied, Utc::now())));
                        }
                        if self.layer.interaction().is_engaged() {
                            ui.label(RichText::new("updates paused").italics());
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_map(ui));

        let wait = if self.refresher.is_fetching() {
            POLL_REPAINT_INTERVAL
        } else {
            self.refresher.time_until_due(Instant::now())
        };
        ctx.request_repaint_after(wait);
    }

    fn snapshot_summary(&self) -> String {
        match self.refresher.last_snapshot() {
            Some(snapshot) => format!(
                "vehicles: {} ({} located)",
                snapshot.entities.len(),
                snapshot.located_count()
            ),
            None => "vehicles: waiting for first snapshot".to_owned(),
        }
    }

    pub(in crate::app) fn record_outcome(&mut self, outcome: RefreshOutcome) {
        if let RefreshOutcome::Failed(error) = &outcome
            && self.refresher.last_snapshot().is_none()
        {
            log::warn!("no vehicles shown yet; {error}");
        }
        self.last_outcome = Some(outcome);
    }
}
