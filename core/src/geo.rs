//! Geospatial helpers used by profile storage and discovery ranking.
//!
//! Profiles store a derived geohash with ~5 km precision (`spec.md`
//! §3) alongside raw `lat`/`lon`; discovery ranking needs an actual
//! distance in kilometers (§4.4 step 5), which a geohash prefix alone
//! cannot give accurately, so both are kept.

const BASE32: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Earth's mean radius in kilometers, used by [`haversine_km`].
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geohash precision (in characters) that yields ~5 km cells at the
/// equator, per `spec.md` §3's "derived `geohash` with ~5 km precision".
pub const PRECISION_5KM: usize = 5;

/// Encode `(lat, lon)` as a geohash string with the given character
/// precision.
///
/// # Panics
///
/// Never panics for finite `lat`/`lon`; out-of-range values simply
/// produce a degenerate hash rather than an error, since geohashing is
/// a storage/indexing aid, not a validated input field (latitude and
/// longitude are validated at the profile API boundary instead).
pub fn encode(lat: f64, lon: f64, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lon_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut bits = 0u8;
    let mut bit_count = 0;
    let mut even_bit = true;

    while hash.len() < precision {
        if even_bit {
            let mid = (lon_range.0 + lon_range.1) / 2.0;
            if lon >= mid {
                bits = (bits << 1) | 1;
                lon_range.0 = mid;
            } else {
                bits <<= 1;
                lon_range.1 = mid;
            }
        } else {
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            if lat >= mid {
                bits = (bits << 1) | 1;
                lat_range.0 = mid;
            } else {
                bits <<= 1;
                lat_range.1 = mid;
            }
        }
        even_bit = !even_bit;
        bit_count += 1;

        if bit_count == 5 {
            hash.push(BASE32[bits as usize] as char);
            bits = 0;
            bit_count = 0;
        }
    }

    hash
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_has_zero_distance() {
        assert!(haversine_km(51.5074, -0.1278, 51.5074, -0.1278) < 1e-9);
    }

    #[test]
    fn known_distance_london_paris() {
        // London to Paris is approximately 344 km.
        let d = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((300.0..400.0).contains(&d), "distance was {d}");
    }

    #[test]
    fn encode_is_deterministic_and_sized() {
        let a = encode(51.5074, -0.1278, PRECISION_5KM);
        let b = encode(51.5074, -0.1278, PRECISION_5KM);
        assert_eq!(a, b);
        assert_eq!(a.len(), PRECISION_5KM);
    }

    #[test]
    fn nearby_points_share_a_geohash_prefix() {
        let a = encode(51.5074, -0.1278, PRECISION_5KM);
        let b = encode(51.5080, -0.1280, PRECISION_5KM);
        assert_eq!(&a[..4], &b[..4]);
    }
}
