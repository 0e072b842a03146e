//! Test data factory.
//!
//! Builds realistic [`IngestInput`] values for duplicate-lifecycle
//! scenarios.

use dupeguard_core::{IngestInput, Location};

/// Bangalore coordinates used across the "clear duplicate" family of scenarios.
pub const MARKET_LAT: f64 = 12.9716;
pub const MARKET_LON: f64 = 77.5946;

/// A single placeholder photo; the default `ZeroImageEmbedder` never reads
/// the bytes, so any non-empty buffer is sufficient for these tests.
pub fn photo() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0]
}

pub struct ReportFactory;

impl ReportFactory {
    /// A pothole report at the market location, with the given description.
    pub fn pothole_at_market(reporter_id: &str, description: &str) -> IngestInput {
        IngestInput {
            reporter_id: reporter_id.to_string(),
            location: Location::new(MARKET_LAT, MARKET_LON).unwrap(),
            category: "POTHOLE".to_string(),
            severity: "medium".to_string(),
            description: description.to_string(),
            photo_bytes: vec![photo()],
        }
    }

    /// A report in an arbitrary category/location/description, for tests
    /// that need full control over every field.
    #[allow(clippy::too_many_arguments)]
    pub fn custom(
        reporter_id: &str,
        lat: f64,
        lon: f64,
        category: &str,
        description: &str,
        photo_count: usize,
    ) -> IngestInput {
        IngestInput {
            reporter_id: reporter_id.to_string(),
            location: Location::new(lat, lon).unwrap(),
            category: category.to_string(),
            severity: "medium".to_string(),
            description: description.to_string(),
            photo_bytes: (0..photo_count.max(1)).map(|_| photo()).collect(),
        }
    }
}
