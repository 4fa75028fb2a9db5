use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::analyzer::CollegeCompetitionLevel;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
}

/// One college on the competition map.
#[derive(Debug, Clone)]
pub struct MapMarker {
    pub name: String,
    pub coordinates: (f64, f64),
    pub level: CollegeCompetitionLevel,
    pub score: f64,
}

/// Geocodes locations and renders the geographic competition map.
pub struct GeoMapper {
    client: reqwest::Client,
    location_cache: HashMap<String, Option<(f64, f64)>>,
}

impl GeoMapper {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            location_cache: HashMap::new(),
        }
    }

    /// Resolve a free-text location to (latitude, longitude). Failures are
    /// cached so a bad location is only queried once per run.
    pub async fn get_coordinates(&mut self, location: &str) -> Option<(f64, f64)> {
        let location = location.trim();
        if location.is_empty() {
            return None;
        }

        if let Some(cached) = self.location_cache.get(location) {
            return *cached;
        }

        // Nominatim asks for at most one request per second.
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let coords = match self.query_nominatim(location).await {
            Ok(Some(coords)) => {
                info!("Located {}: {:?}", location, coords);
                Some(coords)
            }
            Ok(None) => {
                warn!("Could not geocode: {}", location);
                None
            }
            Err(e) => {
                warn!("Geocoding error for {}: {}", location, e);
                None
            }
        };

        self.location_cache.insert(location.to_string(), coords);
        coords
    }

    async fn query_nominatim(&self, location: &str) -> Result<Option<(f64, f64)>> {
        let results: Vec<NominatimResult> = self
            .client
            .get(NOMINATIM_URL)
            .query(&[("format", "json"), ("limit", "1"), ("q", location)])
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("Geocoding request failed for: {}", location))?
            .json()
            .await
            .with_context(|| format!("Invalid geocoding response for: {}", location))?;

        let Some(result) = results.first() else {
            return Ok(None);
        };

        let lat = result.lat.parse::<f64>().context("Invalid latitude")?;
        let lon = result.lon.parse::<f64>().context("Invalid longitude")?;
        Ok(Some((lat, lon)))
    }
}

/// Great-circle distance between two coordinates in miles.
pub fn distance_miles(a: (f64, f64), b: (f64, f64)) -> f64 {
    let earth_radius_miles = 3959.0;

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    earth_radius_miles * c
}

/// Distance bucket relative to the home college.
pub fn distance_category(miles: f64) -> &'static str {
    if miles < 50.0 {
        "local"
    } else if miles < 250.0 {
        "regional"
    } else {
        "national"
    }
}

fn marker_color(level: CollegeCompetitionLevel) -> &'static str {
    match level {
        CollegeCompetitionLevel::High => "#d73027",
        CollegeCompetitionLevel::Medium => "#fc8d59",
        CollegeCompetitionLevel::Low => "#1a9850",
        CollegeCompetitionLevel::None => "#999999",
    }
}

fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', " ")
}

/// Render a self-contained Leaflet map with the home college and every
/// geocoded competitor, colored by competition level.
pub fn render_map_html(home_name: &str, home_coords: (f64, f64), markers: &[MapMarker]) -> String {
    let mut marker_js = String::new();

    marker_js.push_str(&format!(
        "L.circleMarker([{}, {}], {{radius: 10, color: '#2166ac', fillColor: '#2166ac', fillOpacity: 0.9}})\n  .bindPopup('🎓 {} (your college)').addTo(map);\n",
        home_coords.0,
        home_coords.1,
        escape_js(home_name)
    ));

    for marker in markers {
        let distance = distance_miles(home_coords, marker.coordinates);
        marker_js.push_str(&format!(
            "L.circleMarker([{}, {}], {{radius: 8, color: '{color}', fillColor: '{color}', fillOpacity: 0.8}})\n  .bindPopup('{}: {} competition, score {:.0}%, {:.0} mi ({})').addTo(map);\n",
            marker.coordinates.0,
            marker.coordinates.1,
            escape_js(&marker.name),
            marker.level,
            marker.score * 100.0,
            distance,
            distance_category(distance),
            color = marker_color(marker.level),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>College Competition Map</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
  <div id="map"></div>
  <script>
    var map = L.map('map').setView([{}, {}], 7);
    L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
      attribution: '&copy; OpenStreetMap contributors'
    }}).addTo(map);
{}
  </script>
</body>
</html>
"#,
        home_coords.0, home_coords.1, marker_js
    )
}
