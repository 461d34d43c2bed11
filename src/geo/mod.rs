//! Geographic primitives shared by the map, the feature store and the
//! search control.
//!
//! Render space is an equirectangular plane measured in degrees: `x` grows
//! eastward, `y` grows northward. It is the same plane the base coastline
//! layer is drawn in, so projecting is a normalization rather than a
//! change of units.

mod disambiguate;

pub use disambiguate::{disambiguate, spread_coincident, SPREAD_RADIUS};

use serde::Deserialize;

/// Latitude limit of the rendered world, as used by web maps
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Geographic position in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "GeoPoint")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// GeoJSON point as it appears on the wire: `{"type": "Point", "coordinates": [lon, lat]}`
#[derive(Debug, Deserialize)]
struct GeoPoint {
    coordinates: [f64; 2],
}

impl From<GeoPoint> for LonLat {
    fn from(p: GeoPoint) -> Self {
        LonLat::new(p.coordinates[0], p.coordinates[1])
    }
}

/// Position in render space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Project a geographic position into render space
pub fn project(p: LonLat) -> Coord {
    let x = if (-180.0..180.0).contains(&p.lon) {
        p.lon
    } else {
        // Wrap longitude into [-180, 180)
        (p.lon + 180.0).rem_euclid(360.0) - 180.0
    };
    let y = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    Coord::new(x, y)
}

/// Axis-aligned rectangle in render space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Project a `[min_lon, min_lat, max_lon, max_lat]` box into render space
    pub fn from_lon_lat_bbox(bbox: [f64; 4]) -> Self {
        let sw = project(LonLat::new(bbox[0], bbox[1]));
        let ne = project(LonLat::new(bbox[2], bbox[3]));
        Self::new(sw.x, sw.y, ne.x, ne.y)
    }

    /// Smallest extent containing every coordinate, `None` for an empty input
    pub fn around<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut extent = Self::new(first.x, first.y, first.x, first.y);
        for c in iter {
            extent.min_x = extent.min_x.min(c.x);
            extent.min_y = extent.min_y.min(c.y);
            extent.max_x = extent.max_x.max(c.x);
            extent.max_y = extent.max_y.max(c.y);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, c: &Coord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_is_deterministic_and_wraps() {
        let paris = LonLat::new(2.35, 48.86);
        assert_eq!(project(paris), project(paris));
        assert_eq!(project(paris), Coord::new(2.35, 48.86));

        let wrapped = project(LonLat::new(190.0, 10.0));
        assert!((wrapped.x - -170.0).abs() < 1e-9);

        let polar = project(LonLat::new(0.0, 89.9));
        assert_eq!(polar.y, MAX_LATITUDE);
    }

    #[test]
    fn test_extent_from_bbox_normalizes_corners() {
        let extent = Extent::from_lon_lat_bbox([9.6, 51.1, -5.2, 41.3]);
        assert_eq!(extent.min_x, -5.2);
        assert_eq!(extent.max_y, 51.1);
        assert!((extent.width() - 14.8).abs() < 1e-9);
    }

    #[test]
    fn test_extent_around_points() {
        let coords = [Coord::new(1.0, 2.0), Coord::new(-3.0, 5.0), Coord::new(0.0, 0.0)];
        let extent = Extent::around(&coords).unwrap();
        assert_eq!(extent, Extent::new(-3.0, 0.0, 1.0, 5.0));
        assert!(Extent::around(&Vec::<Coord>::new()).is_none());
    }

    #[test]
    fn test_lon_lat_from_geojson_point() {
        let p: LonLat =
            serde_json::from_str(r#"{"type": "Point", "coordinates": [2.35, 48.86]}"#).unwrap();
        assert_eq!(p, LonLat::new(2.35, 48.86));
    }
}
