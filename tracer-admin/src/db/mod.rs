//! Database queries used by the HTTP handlers
//!
//! Schema creation lives in `tracer_common::db`; these modules hold the
//! per-entity queries.

pub mod admins;
pub mod org;
pub mod password_resets;
pub mod stats;
pub mod ump;

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn rounds_to_places() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(12.25, 1), 12.3);
        assert_eq!(round_to(0.0, 2), 0.0);
    }
}
