use geo_types::{Coord, Rect};
use serde_derive::{Deserialize, Serialize};

pub type DocumentId = String;

pub trait Identifiable {
    fn id(&self) -> &DocumentId;
}

/// A WGS84 point in degrees.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<Coordinate> for Coord {
    fn from(c: Coordinate) -> Self {
        Coord { x: c.lon, y: c.lat }
    }
}

impl From<Coord> for Coordinate {
    fn from(c: Coord) -> Self {
        Coordinate::new(c.y, c.x)
    }
}

/// Query area given by its north-east and south-west corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    rect: Rect,
}

impl BoundingBox {
    /// Corners must already be ordered; boxes crossing the antimeridian are not representable.
    pub fn new(north_east: Coordinate, south_west: Coordinate) -> Option<Self> {
        if !north_east.is_valid() || !south_west.is_valid() {
            return None;
        }

        if south_west.lat > north_east.lat || south_west.lon > north_east.lon {
            return None;
        }

        Some(Self {
            rect: Rect::new(Coord::from(south_west), Coord::from(north_east)),
        })
    }

    pub fn north_east(&self) -> Coordinate {
        self.rect.max().into()
    }

    pub fn south_west(&self) -> Coordinate {
        self.rect.min().into()
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        let (min, max) = (self.rect.min(), self.rect.max());

        point.lon >= min.x && point.lon <= max.x && point.lat >= min.y && point.lat <= max.y
    }
}
