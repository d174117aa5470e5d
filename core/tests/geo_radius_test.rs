//! Exercises `geo::encode` and `geo::haversine_km` together the way
//! discovery's candidate query actually uses them: a geohash-prefix
//! index narrows candidates cheaply, then `haversine_km` computes the
//! exact distance the ranking formula needs (`spec.md` §3, §4.4 step 5).

use datecore::geo::{encode, haversine_km, PRECISION_5KM};

struct Candidate {
    name: &'static str,
    lat: f64,
    lon: f64,
}

#[test]
fn prefix_narrows_before_exact_distance_confirms() {
    let center = (51.5074_f64, -0.1278_f64); // central London
    let candidates = [
        Candidate { name: "nearby", lat: 51.5080, lon: -0.1280 },
        Candidate { name: "far", lat: 48.8566, lon: 2.3522 }, // Paris
    ];

    let center_hash = encode(center.0, center.1, PRECISION_5KM);

    let prefix_matches: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| encode(c.lat, c.lon, PRECISION_5KM).starts_with(&center_hash[..4]))
        .collect();

    assert_eq!(prefix_matches.len(), 1);
    assert_eq!(prefix_matches[0].name, "nearby");

    let distance = haversine_km(center.0, center.1, prefix_matches[0].lat, prefix_matches[0].lon);
    assert!(distance < 1.0, "distance was {distance}");
}

#[test]
fn candidates_outside_a_radius_are_excluded_by_exact_distance() {
    let center = (51.5074_f64, -0.1278_f64); // central London
    let max_distance_km = 50.0;
    let candidates = [
        Candidate { name: "oxford", lat: 51.7520, lon: -1.2577 },     // ~80km away
        Candidate { name: "same_city", lat: 51.5155, lon: -0.0922 }, // a few km away
    ];

    let within: Vec<&str> = candidates
        .iter()
        .filter(|c| haversine_km(center.0, center.1, c.lat, c.lon) <= max_distance_km)
        .map(|c| c.name)
        .collect();

    assert_eq!(within, vec!["same_city"]);
}
