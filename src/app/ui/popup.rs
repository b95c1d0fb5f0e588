use chrono::{DateTime, Utc};
use eframe::egui::{self, Context, RichText, vec2};

use crate::fleet::Entity;
use crate::map::{MapView, Projection};
use crate::util::{compass_point, format_age};

use super::super::ViewModel;

/// Text rows shown in a vehicle popup, omitting fields the vehicle lacks.
pub(in crate::app) fn popup_lines(entity: &Entity, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();

    match entity.timestamp() {
        Some(timestamp) => lines.push(format!(
            "Updated {} ({})",
            timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            format_age(timestamp, now)
        )),
        None => lines.push("Last update unknown".to_owned()),
    }

    match entity.speed_kmh() {
        Some(speed) => lines.push(format!("Speed {speed:.1} km/h")),
        None => lines.push("Speed unknown".to_owned()),
    }

    if let Some(heading) = entity.heading_deg {
        lines.push(format!("Heading {heading:.0}° {}", compass_point(heading)));
    }
    if let Some(battery) = entity.battery_volts {
        lines.push(format!("Battery {battery:.2} V"));
    }
    match (entity.rssi_dbm, entity.snr_db) {
        (Some(rssi), Some(snr)) => lines.push(format!("RSSI {rssi} dBm, SNR {snr:.1} dB")),
        (Some(rssi), None) => lines.push(format!("RSSI {rssi} dBm")),
        (None, Some(snr)) => lines.push(format!("SNR {snr:.1} dB")),
        (None, None) => {}
    }

    lines
}

impl ViewModel {
    pub(in crate::app) fn draw_popup(&mut self, ctx: &Context, view: &MapView) {
        let Some(popup) = self.layer.popup() else {
            self.popup_rect = None;
            return;
        };

        let anchor = view.project(popup.position);
        if !view.rect().expand(40.0).contains(anchor) {
            self.popup_rect = None;
            return;
        }

        let entity = popup.entity.clone();
        let lines = popup_lines(&entity, Utc::now());
        let mut close_requested = false;

        let response = egui::Area::new(egui::Id::new("vehicle_popup"))
            .order(egui::Order::Foreground)
            .fixed_pos(anchor + vec2(14.0, -14.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(260.0);
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(entity.id.as_str()).strong());
                        if ui.small_button("Close").clicked() {
                            close_requested = true;
                        }
                    });
                    ui.separator();
                    for line in &lines {
                        ui.label(line.as_str());
                    }
                });
            });

        self.popup_rect = Some(response.response.rect);
        if close_requested {
            self.layer.close_popup();
            self.popup_rect = None;
        }
    }
}
