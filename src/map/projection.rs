use std::f64::consts::PI;

use eframe::egui::{Pos2, Rect, Vec2, pos2};

use crate::fleet::GeoPoint;

const TILE_SIZE: f64 = 256.0;
pub const MAX_LATITUDE: f64 = 85.051_128_78;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 19.0;

/// Maps geographic coordinates to screen pixels and back.
///
/// A projected point is only meaningful for the view it was computed under.
pub trait Projection {
    fn project(&self, geo: GeoPoint) -> Pos2;
    fn unproject(&self, screen: Pos2) -> GeoPoint;
}

/// Web Mercator view over a screen rectangle.
#[derive(Clone, Copy, Debug)]
pub struct MapView {
    rect: Rect,
    center: GeoPoint,
    zoom: f64,
}

impl MapView {
    pub fn new(rect: Rect, center: GeoPoint, zoom: f64) -> Self {
        Self {
            rect,
            center: clamp_geo(center),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// Shifts the view so the content moves by `delta` screen pixels.
    pub fn pan_by(&mut self, delta: Vec2) {
        let center_screen = self.rect.center() - delta;
        self.center = clamp_geo(self.unproject(center_screen));
    }

    /// Zooms by `factor` keeping the geo point under `anchor` fixed on screen.
    pub fn zoom_around(&mut self, anchor: Pos2, factor: f64) {
        let geo_before = self.unproject(anchor);
        self.zoom = (self.zoom + factor.log2()).clamp(MIN_ZOOM, MAX_ZOOM);

        let (anchor_world_x, anchor_world_y) = world_pixels(geo_before, self.world_size());
        let offset = anchor - self.rect.center();
        let center_world_x = anchor_world_x - f64::from(offset.x);
        let center_world_y = anchor_world_y - f64::from(offset.y);
        self.center = clamp_geo(geo_from_world(
            center_world_x,
            center_world_y,
            self.world_size(),
        ));
    }
}

impl Projection for MapView {
    fn project(&self, geo: GeoPoint) -> Pos2 {
        let size = self.world_size();
        let (x, y) = world_pixels(geo, size);
        let (cx, cy) = world_pixels(self.center, size);
        let center = self.rect.center();
        pos2(
            center.x + (x - cx) as f32,
            center.y + (y - cy) as f32,
        )
    }

    fn unproject(&self, screen: Pos2) -> GeoPoint {
        let size = self.world_size();
        let (cx, cy) = world_pixels(self.center, size);
        let offset = screen - self.rect.center();
        geo_from_world(cx + f64::from(offset.x), cy + f64::from(offset.y), size)
    }
}

fn clamp_geo(geo: GeoPoint) -> GeoPoint {
    let lon = (geo.lon + 180.0).rem_euclid(360.0) - 180.0;
    GeoPoint::new(lon, geo.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE))
}

fn world_pixels(geo: GeoPoint, size: f64) -> (f64, f64) {
    let lat = geo.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (geo.lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

fn geo_from_world(x: f64, y: f64, size: f64) -> GeoPoint {
    let lon = x / size * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lon, lat)
}
