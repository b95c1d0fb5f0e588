use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::fleet::GeoPoint;
use crate::map::{MAX_LATITUDE, MapView, Projection};
use crate::util::Freshness;

const TILE_PIXELS: f32 = 256.0;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

/// Dark backdrop with the slippy-map tile grid of the current zoom level.
pub(super) fn draw_background(painter: &Painter, view: &MapView) {
    let rect = view.rect();
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = TILE_PIXELS * 2f32.powf(view.zoom().fract() as f32);
    let origin = view.project(GeoPoint::new(-180.0, MAX_LATITUDE));
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            stroke,
        );
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            stroke,
        );
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn freshness_color(freshness: Freshness) -> Color32 {
    match freshness {
        Freshness::Fresh => Color32::from_rgb(72, 199, 116),
        Freshness::Aging => Color32::from_rgb(240, 180, 70),
        Freshness::Stale => Color32::from_rgb(150, 150, 158),
        Freshness::Unknown => Color32::from_rgb(110, 130, 160),
    }
}

pub(super) fn cluster_color(count: usize) -> Color32 {
    let t = ((count as f32).log2() / 6.0).clamp(0.0, 1.0);
    blend_color(
        Color32::from_rgb(66, 146, 226),
        Color32::from_rgb(226, 92, 84),
        t,
    )
}

/// Screen direction for a compass heading; 0° points up.
pub(super) fn heading_direction(heading_deg: f64) -> Vec2 {
    let radians = heading_deg.to_radians() as f32;
    vec2(radians.sin(), -radians.cos())
}
