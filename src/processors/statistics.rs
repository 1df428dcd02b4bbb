use crate::{
    data_types::route::{OverallStats, Segment},
    util::geo::GeoUtils,
};

use super::segment_builder::{FrameBucket, RouteGeometry};

pub struct Statistics;

impl Statistics {
    /// Share of marked frames in percent, one decimal. Empty buckets have no coverage.
    pub fn coverage(bucket: &FrameBucket) -> f64 {
        if bucket.frames == 0 {
            return 0.0;
        }

        GeoUtils::round_to(bucket.marked as f64 / bucket.frames as f64 * 100.0, 1)
    }

    /// Mean coverage of the segments that received frames; 0 when none did.
    pub fn average_coverage(segments: &[Segment]) -> f64 {
        let (sum, count) = segments
            .iter()
            .filter(|s| s.has_data)
            .fold((0.0, 0u32), |(sum, count), s| (sum + s.coverage_percentage, count + 1));

        if count == 0 {
            return 0.0;
        }

        GeoUtils::round_to(sum / count as f64, 1)
    }

    pub fn overall(geometry: &RouteGeometry, segments: &[Segment]) -> OverallStats {
        OverallStats {
            total_frames: segments.iter().map(|s| s.frames_count).sum(),
            total_distance_meters: GeoUtils::round_to(geometry.total_distance, 2),
            segment_length_meters: geometry.segment_length_m,
            total_segments: segments.len() as u32,
            segments_with_data: segments.iter().filter(|s| s.has_data).count() as u32,
            average_coverage: Statistics::average_coverage(segments),
        }
    }
}
