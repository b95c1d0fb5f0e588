use eframe::egui::{self, Ui};

use crate::map::{ClickTarget, MapGesture, MapView};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn handle_map_zoom(
        &mut self,
        ui: &Ui,
        view: &mut MapView,
        response: &egui::Response,
    ) {
        let scroll = if response.hovered() {
            ui.input(|input| input.raw_scroll_delta.y)
        } else {
            0.0
        };

        if scroll.abs() <= f32::EPSILON {
            if self.zooming {
                self.zooming = false;
                self.view_dirty = true;
            }
            return;
        }

        if !self.zooming {
            self.zooming = true;
            self.layer.handle_gesture(MapGesture::ZoomStart);
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| view.rect().center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        view.zoom_around(pointer, f64::from(zoom_factor));
    }

    pub(in crate::app) fn handle_map_pan(&mut self, view: &mut MapView, response: &egui::Response) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            self.layer.handle_gesture(MapGesture::DragStart);
            self.layer.handle_gesture(MapGesture::MoveStart);
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            view.pan_by(response.drag_delta());
        }

        if response.drag_stopped() {
            self.view_dirty = true;
        }
    }

    pub(in crate::app) fn handle_map_click(&mut self, view: &MapView, response: &egui::Response) {
        if !response.clicked_by(egui::PointerButton::Primary) {
            return;
        }
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };

        if self.popup_rect.is_some_and(|rect| rect.contains(pointer)) {
            self.layer.handle_gesture(MapGesture::Click(ClickTarget::Popup));
            return;
        }

        match self.layer.hit_test(view, pointer) {
            Some(handle) => {
                self.layer
                    .handle_gesture(MapGesture::Click(ClickTarget::Marker(handle)));
                self.layer.handle_marker_click(handle, view);
            }
            None => self.layer.handle_gesture(MapGesture::Click(ClickTarget::Map)),
        }
    }
}
