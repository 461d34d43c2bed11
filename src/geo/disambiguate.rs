use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

use tracing::debug;

use crate::item::MapItem;

use super::LonLat;

/// Displacement applied to coincident points, in degrees (roughly 50 m)
pub const SPREAD_RADIUS: f64 = 0.0005;

/// Return a copy of `items` where markers sharing the exact same position
/// are spread evenly on a circle around it.
///
/// The input is left untouched; callers keep it if they need the true
/// positions.
pub fn disambiguate(items: &[MapItem]) -> Vec<MapItem> {
    let mut items = items.to_vec();
    let mut points: Vec<LonLat> = items.iter().map(|item| item.coordinates).collect();

    spread_coincident(&mut points);

    for (item, point) in items.iter_mut().zip(points) {
        item.coordinates = point;
    }
    items
}

/// Spread every group of `n > 1` identical points on a circle of radius
/// [`SPREAD_RADIUS`], member `i` at angle `π/2 + i·2π/n`.
///
/// Points that are alone at their position are not moved.
pub fn spread_coincident(points: &mut [LonLat]) {
    // Group indices by exact position, keeping collision order
    let mut groups: HashMap<(u64, u64), Vec<usize>> = HashMap::new();
    let mut order: Vec<(u64, u64)> = Vec::new();

    for (i, p) in points.iter().enumerate() {
        if p.lon.is_nan() || p.lat.is_nan() {
            continue;
        }
        let key = position_key(p);
        let group = groups.entry(key).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(i);
    }

    for key in order {
        let members = &groups[&key];
        let n = members.len();
        if n < 2 {
            continue;
        }

        debug!(count = n, lon = points[members[0]].lon, lat = points[members[0]].lat, "Spreading coincident points");

        let step = 2.0 * PI / n as f64;
        for (i, &idx) in members.iter().enumerate() {
            let angle = FRAC_PI_2 + i as f64 * step;
            let p = &mut points[idx];
            p.lon += SPREAD_RADIUS * angle.cos();
            p.lat += SPREAD_RADIUS * angle.sin();
        }
    }
}

/// Structural equality key; `-0.0` and `0.0` compare equal
fn position_key(p: &LonLat) -> (u64, u64) {
    ((p.lon + 0.0).to_bits(), (p.lat + 0.0).to_bits())
}
