//! JSON decoders for the four upstream APIs.
//!
//! Wire structs mirror only the fields we read; serde skips the rest.
//! Optional sub-objects decode to `None` instead of failing.

use serde::Deserialize;

use crate::error::FetchError;
use crate::model::{Place, PointOfInterest, PoiDetailBody, WeatherSnapshot};

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    hits: Option<Vec<Option<GeocodeHit>>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    name: Option<String>,
    city: Option<String>,
    point: Option<GeocodePoint>,
}

#[derive(Debug, Deserialize)]
struct GeocodePoint {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwResponse {
    weather: Option<Vec<OwWeather>>,
    main: Option<OwMain>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OtmPlace {
    name: Option<String>,
    xid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OtmPlaceInfo {
    xid: Option<String>,
    name: Option<String>,
    wikipedia_extracts: Option<OtmExtracts>,
}

#[derive(Debug, Deserialize)]
struct OtmExtracts {
    text: Option<String>,
}

/// Decode a geocoding response into selectable candidates.
///
/// Hits without a name or without both coordinates cannot be selected and
/// are skipped one by one; the rest of the response is kept.
pub fn decode_places(body: &str) -> Result<Vec<Place>, FetchError> {
    let parsed: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| FetchError::parse("geocoding", &e))?;

    Ok(parsed
        .hits
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(|hit| {
            let name = non_empty(hit.name)?;
            let point = hit.point?;
            Some(Place {
                name,
                city: hit.city,
                lat: point.lat?,
                lng: point.lng?,
            })
        })
        .collect())
}

/// Decode a current-weather response. Only the first condition entry is used.
pub fn decode_weather(body: &str) -> Result<WeatherSnapshot, FetchError> {
    let parsed: OwResponse =
        serde_json::from_str(body).map_err(|e| FetchError::parse("weather", &e))?;

    let first = parsed.weather.and_then(|list| list.into_iter().next());
    let (condition, description) = match first {
        Some(w) => (w.main, w.description),
        None => (None, None),
    };

    Ok(WeatherSnapshot {
        condition,
        description,
        temperature_c: parsed.main.and_then(|m| m.temp),
    })
}

/// Decode a POI discovery array, dropping entries without a name or id.
pub fn decode_pois(body: &str) -> Result<Vec<PointOfInterest>, FetchError> {
    let parsed: Vec<Option<OtmPlace>> =
        serde_json::from_str(body).map_err(|e| FetchError::parse("places", &e))?;

    Ok(parsed
        .into_iter()
        .flatten()
        .filter_map(|p| {
            let name = non_empty(p.name)?;
            let xid = non_empty(p.xid)?;
            Some(PointOfInterest { xid, name })
        })
        .collect())
}

/// Decode a POI detail response.
pub fn decode_poi_detail(body: &str) -> Result<PoiDetailBody, FetchError> {
    let parsed: OtmPlaceInfo =
        serde_json::from_str(body).map_err(|e| FetchError::parse("place info", &e))?;

    Ok(PoiDetailBody {
        xid: parsed.xid,
        name: parsed.name,
        description: parsed.wikipedia_extracts.and_then(|w| w.text),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;

    #[test]
    fn weather_fixture_decodes() {
        let body = r#"{"weather":[{"main":"Clear","description":"clear sky"}],"main":{"temp":21.5}}"#;
        let snapshot = decode_weather(body).unwrap();

        assert_eq!(snapshot.condition.as_deref(), Some("Clear"));
        assert_eq!(snapshot.description.as_deref(), Some("clear sky"));
        assert_eq!(snapshot.temperature_c, Some(21.5));
    }

    #[test]
    fn weather_without_condition_array_is_not_an_error() {
        let snapshot = decode_weather(r#"{"main":{"temp":3.0},"cod":200}"#).unwrap();

        assert_eq!(snapshot.condition, None);
        assert_eq!(snapshot.temperature_c, Some(3.0));
    }

    #[test]
    fn weather_with_empty_condition_array() {
        let snapshot = decode_weather(r#"{"weather":[]}"#).unwrap();
        assert_eq!(snapshot.condition, None);
        assert_eq!(snapshot.temperature_c, None);
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = decode_weather("<html>502 Bad Gateway</html>").unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Parse);

        let err = decode_pois(r#"{"error":"not an array"}"#).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::Parse);
    }

    #[test]
    fn places_ignore_unknown_fields_and_skip_hits_without_point() {
        let body = r#"{
            "hits": [
                {"name": "Paris", "city": "Paris", "country": "France",
                 "point": {"lat": 48.8566, "lng": 2.3522}, "osm_id": 7444},
                {"name": "Paris", "point": {"lat": 33.66, "lng": -95.55}},
                {"name": "Nowhere"}
            ],
            "took": 4
        }"#;
        let places = decode_places(body).unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].label(), "Paris, Paris");
        assert_eq!(places[1].city, None);
        assert_eq!(places[1].lng, -95.55);
    }

    #[test]
    fn places_without_hits_decode_to_empty() {
        assert!(decode_places(r#"{"took":1}"#).unwrap().is_empty());
    }

    #[test]
    fn pois_drop_empty_names() {
        let body = r#"[
            {"xid": "N1", "name": "Notre-Dame", "dist": 12.5, "kinds": "churches"},
            {"xid": "N2", "name": ""},
            {"xid": "N3", "name": "Pont Neuf"},
            {"name": "No id"}
        ]"#;
        let pois = decode_pois(body).unwrap();

        let ids: Vec<_> = pois.iter().map(|p| p.xid.as_str()).collect();
        assert_eq!(ids, ["N1", "N3"]);
    }

    #[test]
    fn null_poi_fields_drop_only_that_entry() {
        let body = r#"[
            {"xid": "N1", "name": "Louvre"},
            {"xid": "N2", "name": null},
            {"xid": null, "name": "Orphan"},
            null,
            {"xid": "N3", "name": "Pont Neuf"}
        ]"#;
        let pois = decode_pois(body).unwrap();

        let names: Vec<_> = pois.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Louvre", "Pont Neuf"]);
    }

    #[test]
    fn null_hit_fields_drop_only_that_hit() {
        let body = r#"{"hits": [
            {"name": null, "point": {"lat": 1.0, "lng": 2.0}},
            {"name": "Paris", "city": null, "point": {"lat": 48.85, "lng": 2.35}},
            {"name": "Half", "point": {"lat": 10.0, "lng": null}},
            {"name": "Nowhere", "point": null},
            null
        ]}"#;
        let places = decode_places(body).unwrap();

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].label(), "Paris");
        assert_eq!(places[0].lat, 48.85);
    }

    #[test]
    fn null_hits_decode_to_empty() {
        assert!(decode_places(r#"{"hits":null}"#).unwrap().is_empty());
    }

    #[test]
    fn poi_detail_with_description() {
        let body = r#"{"xid":"N1","name":"Notre-Dame","rate":"7h",
                       "wikipedia_extracts":{"title":"Notre-Dame","text":"A cathedral."}}"#;
        let detail = decode_poi_detail(body).unwrap();

        assert_eq!(detail.xid.as_deref(), Some("N1"));
        assert_eq!(detail.description.as_deref(), Some("A cathedral."));
    }

    #[test]
    fn poi_detail_without_extracts_is_absent() {
        let detail = decode_poi_detail(r#"{"xid":"N1","name":"Notre-Dame"}"#).unwrap();
        assert_eq!(detail.description, None);

        let detail = decode_poi_detail(r#"{"xid":"N1","wikipedia_extracts":{}}"#).unwrap();
        assert_eq!(detail.description, None);
    }
}
