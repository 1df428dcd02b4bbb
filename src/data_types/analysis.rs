use serde_derive::{Deserialize, Serialize};

use crate::data_types::{
    common::{Coordinate, DocumentId},
    route::{OverallStats, Segment},
};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// Flat per-frame answer of the inference service: one entry per video frame.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FrameResultsResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub frame_results: Vec<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BundleSegment {
    pub segment_id: u32,
    #[serde(default)]
    pub frames_count: u32,
    #[serde(default)]
    pub coverage_percentage: f64,
    #[serde(default)]
    pub has_data: bool,
}

/// Pre-aggregated `analysis_results.json` found inside the result archive.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BundleAnalysis {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub overall_stats: OverallStats,
    #[serde(default)]
    pub segments: Vec<BundleSegment>,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisBundle {
    pub analysis: BundleAnalysis,
    pub annotated_video: Option<Vec<u8>>,
}

/// The two answer shapes of the inference service.
#[derive(Debug, Clone)]
pub enum UpstreamResponse {
    Frames(FrameResultsResponse),
    Bundle(AnalysisBundle),
}

/// What the gateway hands back to the caller after an analysis.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisResult {
    pub status: String,
    pub message: String,
    pub route_id: DocumentId,
    pub start_point: Coordinate,
    pub end_point: Coordinate,
    pub segment_length: u32,
    pub overall_stats: OverallStats,
    pub segments: Vec<Segment>,
}

pub fn is_success_status(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case(STATUS_SUCCESS)
}
