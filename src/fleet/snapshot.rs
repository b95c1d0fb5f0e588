use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// One tracked vehicle as reported in a snapshot.
///
/// Everything except the id is optional; a vehicle without both coordinates
/// is kept in the snapshot but never clustered or drawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entity {
    pub id: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub timestamp_millis: Option<i64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub battery_volts: Option<f64>,
    pub rssi_dbm: Option<i64>,
    pub snr_db: Option<f64>,
}

impl Entity {
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => {
                Some(GeoPoint::new(lon, lat))
            }
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_millis
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_mps.map(|speed| speed * 3.6)
    }
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub entities: Vec<Entity>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            fetched_at: Utc::now(),
        }
    }

    pub fn located_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.position().is_some())
            .count()
    }

    pub fn find(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }
}
