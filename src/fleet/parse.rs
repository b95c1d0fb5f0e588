use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use super::snapshot::{Entity, Snapshot};

#[derive(Clone, Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: RawProperties,
}

#[derive(Clone, Debug, Deserialize)]
struct RawGeometry {
    #[serde(default)]
    coordinates: Vec<Option<f64>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(default, rename = "vehicleId")]
    vehicle_id: Option<Value>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    heading: Option<f64>,
    #[serde(default)]
    battery: Option<f64>,
    #[serde(default)]
    rssi: Option<i64>,
    #[serde(default)]
    snr: Option<f64>,
}

/// Decodes the `/api/buses` FeatureCollection into a snapshot.
///
/// Only a broken envelope is an error. Individual features that cannot be
/// read, or that carry no vehicle id, are skipped.
pub fn parse_snapshot(raw: &str) -> Result<Snapshot> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON from snapshot endpoint")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("unexpected JSON type from snapshot endpoint"))?;

    match object.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") | None => {}
        Some(other) => return Err(anyhow!("expected a FeatureCollection, got {other}")),
    }

    let features = object
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("FeatureCollection has no features array"))?;

    let mut entities = Vec::with_capacity(features.len());
    let mut skipped = 0usize;
    for value in features {
        let Ok(feature) = RawFeature::deserialize(value) else {
            skipped += 1;
            continue;
        };

        match entity_from_feature(feature) {
            Some(entity) => entities.push(entity),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} unreadable feature(s) in snapshot");
    }

    Ok(Snapshot::new(entities))
}

fn entity_from_feature(feature: RawFeature) -> Option<Entity> {
    let properties = feature.properties;
    let id = match properties.vehicle_id? {
        Value::String(id) => id,
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if id.trim().is_empty() {
        return None;
    }

    let coordinates = feature
        .geometry
        .map(|geometry| geometry.coordinates)
        .unwrap_or_default();
    let longitude = coordinates
        .first()
        .copied()
        .flatten()
        .or(properties.longitude);
    let latitude = coordinates
        .get(1)
        .copied()
        .flatten()
        .or(properties.latitude);

    let timestamp_millis = properties.timestamp.as_deref().and_then(|raw| {
        let parsed = parse_timestamp_millis(raw);
        if parsed.is_none() {
            log::debug!("unreadable timestamp {raw:?} for vehicle {id}");
        }
        parsed
    });

    Some(Entity {
        id,
        longitude,
        latitude,
        timestamp_millis,
        speed_mps: properties.speed,
        heading_deg: properties.heading,
        battery_volts: properties.battery,
        rssi_dbm: properties.rssi,
        snr_db: properties.snr,
    })
}

pub(super) fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.timestamp_millis());
    }

    // Offset-less timestamps are UTC on the server side.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}
