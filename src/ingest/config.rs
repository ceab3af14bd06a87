// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::{Coordinates, MonitoredPoint};

pub const ENV_LOCATIONS_PATH: &str = "WEATHERBOY_LOCATIONS_PATH";

const DEFAULT_LOCATIONS: &[(&str, &str)] = &[
    ("Marion, IL", "37.7308,-88.9277"),
    ("Murray, KY", "36.6103,-88.3148"),
    ("Champaign, IL", "40.1163,-88.2435"),
];

#[derive(Debug, serde::Deserialize)]
struct LocationSpec {
    name: String,
    point: String,
}

/// Built-in points used when no locations file is found.
pub fn default_locations() -> Vec<MonitoredPoint> {
    DEFAULT_LOCATIONS
        .iter()
        .filter_map(|(name, point)| {
            Coordinates::parse(point)
                .ok()
                .map(|c| MonitoredPoint::new(*name, c))
        })
        .collect()
}

/// Load points from an explicit path. Supports TOML or JSON formats.
pub fn load_locations_from(path: &Path) -> Result<Vec<MonitoredPoint>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading locations from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_locations(&content, ext.as_str())
        .with_context(|| format!("parsing locations in {}", path.display()))
}

/// Load points using env var + fallbacks:
/// 1) $WEATHERBOY_LOCATIONS_PATH
/// 2) config/locations.toml
/// 3) config/locations.json
/// 4) built-in defaults
pub fn load_locations_default() -> Result<Vec<MonitoredPoint>> {
    if let Ok(p) = std::env::var(ENV_LOCATIONS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_locations_from(&pb);
        }
        return Err(anyhow!("{ENV_LOCATIONS_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/locations.toml");
    if toml_p.exists() {
        return load_locations_from(&toml_p);
    }
    let json_p = PathBuf::from("config/locations.json");
    if json_p.exists() {
        return load_locations_from(&json_p);
    }
    Ok(default_locations())
}

fn parse_locations(s: &str, hint_ext: &str) -> Result<Vec<MonitoredPoint>> {
    let specs = if hint_ext == "json" {
        parse_json(s)?
    } else {
        match parse_toml(s) {
            Ok(v) => v,
            Err(toml_err) => parse_json(s).map_err(|_| toml_err)?,
        }
    };
    build_points(specs)
}

fn parse_toml(s: &str) -> Result<Vec<LocationSpec>> {
    #[derive(serde::Deserialize)]
    struct TomlLocations {
        locations: Vec<LocationSpec>,
    }
    let v: TomlLocations = toml::from_str(s)?;
    Ok(v.locations)
}

fn parse_json(s: &str) -> Result<Vec<LocationSpec>> {
    Ok(serde_json::from_str(s)?)
}

fn build_points(specs: Vec<LocationSpec>) -> Result<Vec<MonitoredPoint>> {
    if specs.is_empty() {
        bail!("no locations configured");
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            bail!("location with empty name");
        }
        if !seen.insert(name.clone()) {
            bail!("duplicate location name {name:?}");
        }
        let coords = Coordinates::parse(&spec.point)
            .with_context(|| format!("location {name:?}"))?;
        out.push(MonitoredPoint::new(name, coords));
    }
    Ok(out)
}
