use bevy::log::warn;
use geojson::{Feature, FeatureCollection, GeoJson, feature::Id};

use crate::quakes::FeedError;
use crate::types::{PlateBoundary, Quake};

/// Items decoded from a feed plus the number of features that had to be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

fn into_collection(geojson: GeoJson) -> Result<FeatureCollection, FeedError> {
    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(FeedError::NotACollection("Feature")),
        GeoJson::Geometry(_) => Err(FeedError::NotACollection("Geometry")),
    }
}

fn feature_id(feature: &Feature) -> Option<String> {
    feature.id.as_ref().map(|id| match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    })
}

/// Turns a USGS feature into a quake. Needs a point geometry with at least longitude and latitude.
pub fn quake_from_feature(feature: &Feature) -> Option<Quake> {
    let geometry = feature.geometry.as_ref()?;
    let geojson::Value::Point(position) = &geometry.value else {
        return None;
    };
    if position.len() < 2 {
        return None;
    }

    Some(Quake {
        id: feature_id(feature),
        magnitude: feature.property("mag").and_then(|v| v.as_f64()),
        place: feature
            .property("place")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        time_ms: feature.property("time").and_then(|v| v.as_i64()),
        longitude: position[0],
        latitude: position[1],
        depth_km: position.get(2).copied(),
    })
}

pub fn parse_quakes(geojson: GeoJson) -> Result<ParsedFeed<Quake>, FeedError> {
    let collection = into_collection(geojson)?;
    let mut items = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;
    for feature in &collection.features {
        match quake_from_feature(feature) {
            Some(quake) => items.push(quake),
            None => {
                warn!("Skipping earthquake feature without a point: {:?}", feature.id);
                skipped += 1;
            }
        }
    }
    Ok(ParsedFeed { items, skipped })
}

fn to_line_string(line: &[Vec<f64>]) -> geo::LineString<f64> {
    geo::LineString(
        line.iter()
            .filter(|p| p.len() >= 2)
            .map(|p| geo::Coord { x: p[0], y: p[1] })
            .collect(),
    )
}

pub fn plate_from_feature(feature: &Feature) -> Option<PlateBoundary> {
    let geometry = feature.geometry.as_ref()?;
    let lines = match &geometry.value {
        geojson::Value::LineString(line) => vec![to_line_string(line)],
        geojson::Value::MultiLineString(lines) => {
            lines.iter().map(|line| to_line_string(line)).collect()
        }
        // Plate outlines are sometimes published as polygons; draw their rings.
        geojson::Value::Polygon(rings) => rings.iter().map(|ring| to_line_string(ring)).collect(),
        geojson::Value::MultiPolygon(polygons) => polygons
            .iter()
            .flat_map(|rings| rings.iter().map(|ring| to_line_string(ring)))
            .collect(),
        _ => return None,
    };
    let lines: Vec<_> = lines.into_iter().filter(|l| l.0.len() >= 2).collect();
    if lines.is_empty() {
        return None;
    }

    Some(PlateBoundary {
        lines: geo::MultiLineString(lines),
    })
}

pub fn parse_plates(geojson: GeoJson) -> Result<ParsedFeed<PlateBoundary>, FeedError> {
    let collection = into_collection(geojson)?;
    let mut items = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;
    for feature in &collection.features {
        match plate_from_feature(feature) {
            Some(plate) => items.push(plate),
            None => {
                warn!("Skipping plate feature without line geometry: {:?}", feature.id);
                skipped += 1;
            }
        }
    }
    Ok(ParsedFeed { items, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAKES: &str = r#"{
        "type": "FeatureCollection",
        "metadata": { "title": "USGS All Earthquakes, Past Week" },
        "features": [
            {
                "type": "Feature",
                "id": "us7000n1",
                "properties": { "mag": 5, "place": "80 km E of Town", "time": 1700000000000 },
                "geometry": { "type": "Point", "coordinates": [142.1, 38.3, 20] }
            },
            {
                "type": "Feature",
                "id": "ak0001",
                "properties": { "mag": null, "place": null, "time": 1700000001000 },
                "geometry": { "type": "Point", "coordinates": [-150.0, 61.2, -1.5] }
            },
            {
                "type": "Feature",
                "properties": { "mag": 1.1 },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "mag": 2.2 },
                "geometry": { "type": "Point", "coordinates": [10.0, 20.0] }
            }
        ]
    }"#;

    const PLATES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "Name": "AF-AN" },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-0.4, -54.8], [0.1, -54.5], [1.0, -54.2]]
                }
            },
            {
                "type": "Feature",
                "properties": { "Name": "PA-NA" },
                "geometry": { "type": "MultiLineString", "coordinates": [
                    [[-125.0, 40.3], [-124.5, 40.9]],
                    [[-122.0, 37.0], [-121.9, 36.8]]
                ] }
            },
            {
                "type": "Feature",
                "properties": { "Name": "broken" },
                "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
            }
        ]
    }"#;

    #[test]
    fn quakes_keep_nulls_and_skip_missing_geometry() {
        let parsed = parse_quakes(QUAKES.parse().unwrap()).unwrap();
        assert_eq!(parsed.items.len(), 3);
        assert_eq!(parsed.skipped, 1);

        let first = &parsed.items[0];
        assert_eq!(first.id.as_deref(), Some("us7000n1"));
        assert_eq!(first.magnitude, Some(5.0));
        assert_eq!(first.place.as_deref(), Some("80 km E of Town"));
        assert_eq!(first.time_ms, Some(1_700_000_000_000));
        assert_eq!((first.longitude, first.latitude), (142.1, 38.3));
        assert_eq!(first.depth_km, Some(20.0));

        let second = &parsed.items[1];
        assert_eq!(second.magnitude, None);
        assert_eq!(second.place, None);
        assert_eq!(second.depth_km, Some(-1.5));

        assert_eq!(parsed.items[2].depth_km, None);
    }

    #[test]
    fn plates_flatten_multi_line_strings() {
        let parsed = parse_plates(PLATES.parse().unwrap()).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.items[0].lines.0.len(), 1);
        assert_eq!(parsed.items[1].lines.0.len(), 2);
        assert_eq!(parsed.items[1].world_lines().len(), 2);
    }

    #[test]
    fn a_single_feature_is_rejected() {
        let single = r#"{ "type": "Feature", "properties": {}, "geometry": null }"#;
        assert!(matches!(
            parse_quakes(single.parse().unwrap()),
            Err(FeedError::NotACollection("Feature"))
        ));
    }
}
