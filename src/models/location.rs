//! Location payloads and their normalization to centroid + bbox + area

use serde::{Deserialize, Serialize};

use crate::{HazardError, Result};

/// Half-width in degrees of the box drawn around a point location
pub const POINT_BUFFER_DEGREES: f64 = 0.1;

/// Kilometers per degree of longitude at the equator
const KM_PER_DEG_LON: f64 = 111.32;
/// Kilometers per degree of latitude
const KM_PER_DEG_LAT: f64 = 110.57;

/// Axis-aligned bounding box in degrees, serialized as `[west, south, east, north]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.west, bbox.south, bbox.east, bbox.north]
    }
}

impl BoundingBox {
    #[must_use]
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Check ranges and orientation: west < east, south < north
    pub fn validate(&self) -> Result<()> {
        validate_longitude(self.west)?;
        validate_longitude(self.east)?;
        validate_latitude(self.south)?;
        validate_latitude(self.north)?;

        if self.west >= self.east {
            return Err(HazardError::validation(format!(
                "bbox west ({}) must be less than east ({})",
                self.west, self.east
            )));
        }
        if self.south >= self.north {
            return Err(HazardError::validation(format!(
                "bbox south ({}) must be less than north ({})",
                self.south, self.north
            )));
        }
        Ok(())
    }

    /// Midpoint as `(lat, lon)`
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Equirectangular area approximation in km²
    #[must_use]
    pub fn area_km2(&self) -> f64 {
        let mean_lat = ((self.south + self.north) / 2.0).to_radians();
        let width_km = (self.east - self.west) * KM_PER_DEG_LON * mean_lat.cos();
        let height_km = (self.north - self.south) * KM_PER_DEG_LAT;
        (width_km * height_km).max(0.0)
    }

    /// Comma separated `west,south,east,north` as used in FIRMS area URLs
    #[must_use]
    pub fn to_area_coords(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Location as submitted by clients. Exactly one of the fields must be set.
///
/// `point` is `[lat, lon]`, `polygon` vertices are `[lon, lat]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<[f64; 2]>>,
}

/// A location payload reduced to its single populated variant
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Point { lat: f64, lon: f64 },
    BBox(BoundingBox),
    Polygon(Vec<[f64; 2]>),
}

impl LocationPayload {
    #[must_use]
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            point: Some([lat, lon]),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn bbox(bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn polygon(vertices: Vec<[f64; 2]>) -> Self {
        Self {
            polygon: Some(vertices),
            ..Self::default()
        }
    }

    /// Pick the single populated variant, failing on zero or several
    pub fn into_input(self) -> Result<LocationInput> {
        match (self.point, self.bbox, self.polygon) {
            (Some([lat, lon]), None, None) => Ok(LocationInput::Point { lat, lon }),
            (None, Some(bbox), None) => Ok(LocationInput::BBox(bbox)),
            (None, None, Some(vertices)) => Ok(LocationInput::Polygon(vertices)),
            (None, None, None) => Err(HazardError::validation(
                "one of 'point', 'bbox' or 'polygon' is required",
            )),
            _ => Err(HazardError::validation(
                "provide exactly one of 'point', 'bbox' or 'polygon'",
            )),
        }
    }

    /// Normalize into centroid, bbox and area
    pub fn normalize(self) -> Result<NormalizedLocation> {
        self.into_input()?.normalize()
    }
}

/// Canonical representation every downstream component works with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLocation {
    pub lat: f64,
    pub lon: f64,
    pub bbox: BoundingBox,
    pub area_km2: f64,
}

impl LocationInput {
    pub fn normalize(self) -> Result<NormalizedLocation> {
        let (lat, lon, bbox) = match self {
            LocationInput::Point { lat, lon } => {
                validate_latitude(lat)?;
                validate_longitude(lon)?;
                let bbox = BoundingBox::new(
                    (lon - POINT_BUFFER_DEGREES).max(-180.0),
                    (lat - POINT_BUFFER_DEGREES).max(-90.0),
                    (lon + POINT_BUFFER_DEGREES).min(180.0),
                    (lat + POINT_BUFFER_DEGREES).min(90.0),
                );
                (lat, lon, bbox)
            }
            LocationInput::BBox(bbox) => {
                bbox.validate()?;
                let (lat, lon) = bbox.center();
                (lat, lon, bbox)
            }
            LocationInput::Polygon(vertices) => polygon_centroid_and_bbox(vertices)?,
        };

        bbox.validate()?;

        Ok(NormalizedLocation {
            lat,
            lon,
            bbox,
            area_km2: bbox.area_km2(),
        })
    }
}

/// Vertex-mean centroid (not area weighted) and min/max bbox of a ring
fn polygon_centroid_and_bbox(mut vertices: Vec<[f64; 2]>) -> Result<(f64, f64, BoundingBox)> {
    // closed rings repeat the first vertex
    if vertices.len() >= 2 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 3 {
        return Err(HazardError::validation(format!(
            "polygon needs at least 3 distinct vertices, got {}",
            vertices.len()
        )));
    }

    let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    let (mut lon_sum, mut lat_sum) = (0.0, 0.0);

    for &[lon, lat] in &vertices {
        validate_longitude(lon)?;
        validate_latitude(lat)?;
        bbox.west = bbox.west.min(lon);
        bbox.east = bbox.east.max(lon);
        bbox.south = bbox.south.min(lat);
        bbox.north = bbox.north.max(lat);
        lon_sum += lon;
        lat_sum += lat;
    }

    let n = vertices.len() as f64;
    Ok((lat_sum / n, lon_sum / n, bbox))
}

fn validate_latitude(lat: f64) -> Result<()> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(HazardError::validation(format!(
            "latitude {lat} is outside [-90, 90]"
        )))
    }
}

fn validate_longitude(lon: f64) -> Result<()> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(HazardError::validation(format!(
            "longitude {lon} is outside [-180, 180]"
        )))
    }
}
