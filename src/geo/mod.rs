// src/geo/mod.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, info, warn};

/// A position is `[lon, lat]` (any extra ordinates are ignored).
pub type Ring = Vec<[f64; 2]>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Every ring of every polygon.
    pub fn rings(&self) -> Vec<&Ring> {
        match self {
            Geometry::Polygon(rings) => rings.iter().collect(),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionShape {
    pub code: String,
    pub geometry: Geometry,
}

/// Region boundaries keyed by 2-letter code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeoCollection {
    shapes: BTreeMap<String, RegionShape>,
}

/// Longitude/latitude extent of a set of shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

#[derive(Debug, Deserialize)]
struct RawFeatureCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    ty: String,
    coordinates: serde_json::Value,
}

fn id_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RawFeature {
    /// The feature's `id`, falling back to `properties.id`.
    fn code(&self) -> Option<String> {
        self.id
            .as_ref()
            .and_then(id_to_string)
            .or_else(|| {
                self.properties
                    .as_ref()
                    .and_then(|p| p.get("id"))
                    .and_then(id_to_string)
            })
            .filter(|s| !s.is_empty())
    }
}

fn parse_positions(v: &serde_json::Value) -> Result<Ring> {
    let points = v.as_array().ok_or_else(|| anyhow!("ring is not an array"))?;
    points
        .iter()
        .map(|p| {
            let coords = p
                .as_array()
                .ok_or_else(|| anyhow!("position is not an array"))?;
            match (coords.first().and_then(|c| c.as_f64()), coords.get(1).and_then(|c| c.as_f64())) {
                (Some(lon), Some(lat)) => Ok([lon, lat]),
                _ => Err(anyhow!("position needs two numeric ordinates")),
            }
        })
        .collect()
}

fn parse_polygon(v: &serde_json::Value) -> Result<Vec<Ring>> {
    v.as_array()
        .ok_or_else(|| anyhow!("polygon is not an array of rings"))?
        .iter()
        .map(parse_positions)
        .collect()
}

fn parse_geometry(raw: &RawGeometry) -> Result<Option<Geometry>> {
    match raw.ty.as_str() {
        "Polygon" => Ok(Some(Geometry::Polygon(parse_polygon(&raw.coordinates)?))),
        "MultiPolygon" => {
            let polys = raw
                .coordinates
                .as_array()
                .ok_or_else(|| anyhow!("multipolygon is not an array"))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(Geometry::MultiPolygon(polys)))
        }
        _ => Ok(None),
    }
}

impl GeoCollection {
    /// Parse a GeoJSON FeatureCollection. Features without an id or with a
    /// non-areal geometry are skipped.
    pub fn from_json(text: &str) -> Result<Self> {
        let fc: RawFeatureCollection =
            serde_json::from_str(text).context("decoding GeoJSON feature collection")?;

        let mut shapes = BTreeMap::new();
        for (idx, feature) in fc.features.iter().enumerate() {
            let Some(code) = feature.code() else {
                debug!(feature = idx, "feature without id skipped");
                continue;
            };
            let Some(raw_geom) = &feature.geometry else {
                debug!(feature = idx, %code, "feature without geometry skipped");
                continue;
            };
            let geometry = match parse_geometry(raw_geom)
                .with_context(|| format!("feature `{}` has malformed coordinates", code))?
            {
                Some(g) => g,
                None => {
                    debug!(%code, ty = %raw_geom.ty, "non-areal feature skipped");
                    continue;
                }
            };
            shapes.insert(code.clone(), RegionShape { code, geometry });
        }

        if shapes.is_empty() {
            bail!("feature collection contains no usable region polygons");
        }
        Ok(Self { shapes })
    }

    pub(crate) fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn get(&self, code: &str) -> Option<&RegionShape> {
        self.shapes.get(code)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &RegionShape> {
        self.shapes.values()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self
            .shapes
            .values()
            .flat_map(|s| s.geometry.rings())
            .flatten();
        let first = points.next()?;
        let init = Bounds {
            min_lon: first[0],
            min_lat: first[1],
            max_lon: first[0],
            max_lat: first[1],
        };
        Some(points.fold(init, |b, p| Bounds {
            min_lon: b.min_lon.min(p[0]),
            min_lat: b.min_lat.min(p[1]),
            max_lon: b.max_lon.max(p[0]),
            max_lat: b.max_lat.max(p[1]),
        }))
    }
}

/// Load the boundary file. Any failure is degraded to `None` so the map
/// section can be skipped while everything else renders.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_geometry<P: AsRef<Path>>(path: P) -> Option<GeoCollection> {
    match read_geometry(path.as_ref()) {
        Ok(geo) => {
            info!(regions = geo.len(), "geometry loaded");
            Some(geo)
        }
        Err(e) => {
            warn!("geometry unavailable: {:#}", e);
            None
        }
    }
}

fn read_geometry(path: &Path) -> Result<GeoCollection> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading geometry file {:?}", path))?;
    GeoCollection::from_json(&text)
        .with_context(|| format!("parsing geometry file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SAMPLE_GEOJSON;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_feature_collection() -> Result<()> {
        let geo = GeoCollection::from_json(SAMPLE_GEOJSON)?;
        assert_eq!(geo.len(), 2);
        assert!(geo.get("AC").is_some());
        assert!(geo.get("XX").is_none());
        let ba = geo.get("BA").unwrap();
        assert_eq!(ba.geometry.rings().len(), 1);
        assert_eq!(ba.geometry.rings()[0][2], [-38.0, -18.0]);
        Ok(())
    }

    #[test]
    fn test_bounds() -> Result<()> {
        let geo = GeoCollection::from_json(SAMPLE_GEOJSON)?;
        let b = geo.bounds().unwrap();
        assert_eq!(b.min_lon, -73.0);
        assert_eq!(b.max_lon, -38.0);
        assert_eq!(b.min_lat, -18.0);
        assert_eq!(b.max_lat, -7.0);
        Ok(())
    }

    #[test]
    fn test_load_geometry_missing_file_is_none() {
        assert!(load_geometry("/no/such/brasil_estados.json").is_none());
    }

    #[test]
    fn test_load_geometry_invalid_json_is_none() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(b"{ not json")?;
        assert!(load_geometry(tmp.path()).is_none());
        Ok(())
    }

    #[test]
    fn test_load_geometry_from_disk() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(SAMPLE_GEOJSON.as_bytes())?;
        let geo = load_geometry(tmp.path()).expect("geometry loads");
        assert_eq!(geo.len(), 2);
        Ok(())
    }
}
