use serde_derive::{Deserialize, Serialize};

use crate::{
    data_types::common::{Coordinate, DocumentId, Identifiable},
    util::DateTimeUtils,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Segment {
    pub segment_id: u32,
    pub frames_count: u32,
    pub coverage_percentage: f64,
    pub has_data: bool,
    pub start_coordinate: Coordinate,
    pub end_coordinate: Coordinate,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct OverallStats {
    pub total_frames: u32,
    pub total_distance_meters: f64,
    pub segment_length_meters: u32,
    pub total_segments: u32,
    pub segments_with_data: u32,
    pub average_coverage: f64,
}

/// A stored analysis. Segments are embedded and share the route's lifecycle.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Route {
    pub _id: DocumentId,
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub start_point: Coordinate,
    pub end_point: Coordinate,
    pub segment_length_m: u32,

    pub overall_stats: OverallStats,
    pub segments: Vec<Segment>,

    pub video_filename: Option<String>,
    pub video_path: Option<String>,
    pub annotated_video_path: Option<String>,

    // epoch milliseconds
    pub created_at: i64,
}

impl Identifiable for Route {
    fn id(&self) -> &DocumentId {
        &self._id
    }
}

impl Route {
    pub fn default_name(route_id: &str) -> String {
        format!("Route {}", route_id.chars().take(8).collect::<String>())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RouteResponse {
    pub id: DocumentId,
    pub name: String,
    pub start_point: Coordinate,
    pub end_point: Coordinate,
    pub segment_length: u32,
    pub overall_stats: OverallStats,
    pub segments: Vec<Segment>,
    pub created_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_video_path: Option<String>,
}

impl From<Route> for RouteResponse {
    fn from(route: Route) -> Self {
        Self {
            created_at: DateTimeUtils::millis_to_rfc3339(route.created_at),
            id: route._id,
            name: route.name,
            start_point: route.start_point,
            end_point: route.end_point,
            segment_length: route.segment_length_m,
            overall_stats: route.overall_stats,
            segments: route.segments,
            video_filename: route.video_filename,
            video_path: route.video_path,
            annotated_video_path: route.annotated_video_path,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ListRoutesResponse {
    pub routes: Vec<RouteResponse>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AreaRoutesResponse {
    pub routes: Vec<RouteResponse>,
    pub total: usize,
}
