use chrono::Utc;
use eframe::egui::{self, Align2, Color32, FontId, Painter, Sense, Stroke, Ui, vec2};

use crate::map::{MapView, MarkerHandle, MarkerKind, Projection};
use crate::util::freshness;

use super::super::ViewModel;
use super::super::render_utils::{
    blend_color, circle_visible, cluster_color, draw_background, freshness_color,
    heading_direction,
};

impl ViewModel {
    pub(in crate::app) fn draw_map(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let mut view = MapView::new(rect, self.center, self.zoom);
        self.handle_map_zoom(ui, &mut view, &response);
        self.handle_map_pan(&mut view, &response);
        self.center = view.center();
        self.zoom = view.zoom();

        if let Some(outcome) = self.refresher.poll(&mut self.layer, &view) {
            self.record_outcome(outcome);
        }

        if self.view_dirty && !self.zooming && !response.dragged() {
            let reclustered = self.refresher.recluster(&mut self.layer, &view);
            if reclustered || self.refresher.last_snapshot().is_none() {
                self.view_dirty = false;
            }
        }

        self.handle_map_click(&view, &response);

        let hovered = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| self.layer.hit_test(&view, pointer));
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        draw_background(&painter, &view);
        self.draw_markers(&painter, &view, hovered);
        self.draw_hover_label(&painter, &view, hovered);
        self.draw_popup(ui.ctx(), &view);
    }

    fn draw_markers(&self, painter: &Painter, view: &MapView, hovered: Option<MarkerHandle>) {
        let rect = view.rect();
        let now = Utc::now();
        let popup_marker = self.layer.popup().map(|popup| popup.marker);
        let outline = Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190));

        let mut spider_anchor = None;
        for (_, marker) in self.layer.visible_markers() {
            if let MarkerKind::Spider { anchor, .. } = &marker.kind {
                let anchor = view.project(*anchor);
                spider_anchor = Some(anchor);
                painter.line_segment(
                    [anchor, view.project(marker.position)],
                    Stroke::new(1.2, Color32::from_rgba_unmultiplied(205, 210, 220, 140)),
                );
            }
        }
        if let Some(anchor) = spider_anchor {
            painter.circle_filled(anchor, 3.5, Color32::from_gray(210));
        }

        for (handle, marker) in self.layer.visible_markers() {
            let position = view.project(marker.position);
            let radius = marker.screen_radius();
            if !circle_visible(rect, position, radius + 8.0) {
                continue;
            }
            let is_hovered = hovered == Some(handle);

            match &marker.kind {
                MarkerKind::Entity(entity) | MarkerKind::Spider { entity, .. } => {
                    let base = freshness_color(freshness(entity.timestamp(), now));
                    let color = if is_hovered {
                        blend_color(base, Color32::WHITE, 0.35)
                    } else {
                        base
                    };

                    if let Some(heading) = entity.heading_deg {
                        let direction = heading_direction(heading);
                        painter.line_segment(
                            [
                                position + direction * radius,
                                position + direction * (radius + 6.0),
                            ],
                            Stroke::new(2.0, color),
                        );
                    }

                    painter.circle_filled(position, radius, color);
                    painter.circle_stroke(position, radius, outline);

                    if popup_marker == Some(handle) {
                        painter.circle_stroke(
                            position,
                            radius + 4.0,
                            Stroke::new(2.0, Color32::from_rgb(245, 206, 93)),
                        );
                    }
                }
                MarkerKind::Cluster { count, .. } => {
                    let base = cluster_color(*count);
                    let color = if is_hovered {
                        blend_color(base, Color32::WHITE, 0.25)
                    } else {
                        base
                    };

                    painter.circle_filled(position, radius + 4.0, color.gamma_multiply(0.35));
                    painter.circle_filled(position, radius, color);
                    painter.circle_stroke(position, radius, outline);
                    painter.text(
                        position,
                        Align2::CENTER_CENTER,
                        count.to_string(),
                        FontId::proportional(13.0),
                        Color32::WHITE,
                    );
                }
            }
        }
    }

    fn draw_hover_label(&self, painter: &Painter, view: &MapView, hovered: Option<MarkerHandle>) {
        let Some(marker) = hovered.and_then(|handle| self.layer.marker(handle)) else {
            return;
        };

        let text = match &marker.kind {
            MarkerKind::Entity(entity) | MarkerKind::Spider { entity, .. } => {
                match entity.speed_kmh() {
                    Some(speed) => format!("{}  |  {speed:.0} km/h", entity.id),
                    None => entity.id.clone(),
                }
            }
            MarkerKind::Cluster { count, .. } => format!("{count} vehicles, click to expand"),
        };

        painter.text(
            view.rect().left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            text,
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
    }
}
