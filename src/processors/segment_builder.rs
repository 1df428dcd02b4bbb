use crate::{
    data_types::{common::Coordinate, route::Segment},
    error::{GatewayError, Result},
    util::geo::GeoUtils,
};

use super::statistics::Statistics;

/// A straight route between two points, cut into fixed-length segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteGeometry {
    pub start: Coordinate,
    pub end: Coordinate,
    pub segment_length_m: u32,
    pub total_distance: f64,
    pub num_segments: usize,
}

impl RouteGeometry {
    /// Upper bound on segments per route. Each one is returned and stored in full.
    pub const MAX_SEGMENTS: usize = 10_000;

    /// Identical endpoints give a single zero-length segment.
    pub fn new(start: Coordinate, end: Coordinate, segment_length_m: u32) -> Result<Self> {
        if segment_length_m == 0 {
            return Err(GatewayError::validation("segment length must be positive"));
        }

        let total_distance = GeoUtils::distance(&start, &end);
        let num_segments = if total_distance > 0.0 {
            (total_distance / segment_length_m as f64).ceil().max(1.0) as usize
        } else {
            1
        };

        if num_segments > RouteGeometry::MAX_SEGMENTS {
            return Err(GatewayError::validation(format!(
                "route of {:.0}m would have {} segments of {}m, at most {} segments are allowed",
                total_distance,
                num_segments,
                segment_length_m,
                RouteGeometry::MAX_SEGMENTS
            )));
        }

        Ok(Self {
            start,
            end,
            segment_length_m,
            total_distance,
            num_segments,
        })
    }

    /// Bucket of a point lying `distance` meters from the start.
    /// Points at or past the far end land in the last segment.
    pub fn segment_index(&self, distance: f64) -> usize {
        let index = (distance / self.segment_length_m as f64).floor();
        if index <= 0.0 || !index.is_finite() {
            return 0;
        }

        (index as usize).min(self.num_segments - 1)
    }

    /// Start and end coordinate of the segment at `index` (0-based).
    pub fn segment_bounds(&self, index: usize) -> (Coordinate, Coordinate) {
        if self.total_distance <= 0.0 {
            return (self.start, self.start);
        }

        let length = self.segment_length_m as f64;
        let start_ratio = index as f64 * length / self.total_distance;
        let end_ratio = if index + 1 >= self.num_segments {
            1.0
        } else {
            ((index + 1) as f64 * length).min(self.total_distance) / self.total_distance
        };

        (
            GeoUtils::lerp(&self.start, &self.end, start_ratio),
            GeoUtils::lerp(&self.start, &self.end, end_ratio),
        )
    }
}

/// Frames that fell into one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameBucket {
    pub frames: u32,
    pub marked: u32,
}

impl FrameBucket {
    pub fn push(&mut self, marked: bool) {
        self.frames += 1;
        if marked {
            self.marked += 1;
        }
    }
}

pub struct SegmentBuilder;

impl SegmentBuilder {
    /// Spreads the frames evenly along the route and assigns each one to the segment
    /// its position falls into. Returns one bucket per segment, empty ones included.
    pub fn bucket_frames(geometry: &RouteGeometry, frame_results: &[i64]) -> Vec<FrameBucket> {
        let mut buckets = vec![FrameBucket::default(); geometry.num_segments];

        let positions = GeoUtils::interpolate(&geometry.start, &geometry.end, frame_results.len());
        for (position, result) in positions.iter().zip(frame_results) {
            let distance = GeoUtils::distance(&geometry.start, position);
            buckets[geometry.segment_index(distance)].push(*result != 0);
        }

        buckets
    }

    pub fn build_segments(geometry: &RouteGeometry, frame_results: &[i64]) -> Vec<Segment> {
        SegmentBuilder::bucket_frames(geometry, frame_results)
            .iter()
            .enumerate()
            .map(|(index, bucket)| {
                let (start_coordinate, end_coordinate) = geometry.segment_bounds(index);

                Segment {
                    segment_id: index as u32 + 1,
                    frames_count: bucket.frames,
                    coverage_percentage: Statistics::coverage(bucket),
                    has_data: bucket.frames > 0,
                    start_coordinate,
                    end_coordinate,
                }
            })
            .collect()
    }
}
