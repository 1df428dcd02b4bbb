use crate::{
    data_types::{
        analysis::{
            is_success_status, AnalysisBundle, AnalysisResult, FrameResultsResponse,
            UpstreamResponse, STATUS_SUCCESS,
        },
        common::Coordinate,
        request::AnalyzeRequest,
        route::Segment,
    },
    error::{GatewayError, Result},
    logvbln,
    util::geo::GeoUtils,
};

use super::{
    segment_builder::{RouteGeometry, SegmentBuilder},
    statistics::Statistics,
};

pub const ANALYSIS_COMPLETED: &str = "Analysis completed successfully";

/// A normalized analysis plus the annotated video, if the service produced one.
#[derive(Debug)]
pub struct AssembledAnalysis {
    pub result: AnalysisResult,
    pub annotated_video: Option<Vec<u8>>,
}

pub struct ResultAssembler;

impl ResultAssembler {
    const CC: &'static str = "ResultAssembler";

    pub fn assemble(request: &AnalyzeRequest, response: UpstreamResponse) -> Result<AssembledAnalysis> {
        match response {
            UpstreamResponse::Frames(frames) => Ok(AssembledAnalysis {
                result: ResultAssembler::from_frames(request, frames)?,
                annotated_video: None,
            }),
            UpstreamResponse::Bundle(bundle) => Ok(ResultAssembler::from_bundle(request, bundle)),
        }
    }

    /// Buckets the raw per-frame detections and computes every statistic locally.
    pub fn from_frames(request: &AnalyzeRequest, frames: FrameResultsResponse) -> Result<AnalysisResult> {
        if !is_success_status(&frames.status) {
            let reason = if frames.message.is_empty() {
                format!("inference service reported status {:?}", frames.status)
            } else {
                frames.message
            };
            return Err(GatewayError::Upstream(reason));
        }

        let geometry = RouteGeometry::new(request.start, request.end, request.segment_length_m)?;
        let segments = SegmentBuilder::build_segments(&geometry, &frames.frame_results);
        let overall_stats = Statistics::overall(&geometry, &segments);

        logvbln!(
            "{} frames over {:.2}m -> {} segments, {} with data",
            overall_stats.total_frames,
            geometry.total_distance,
            overall_stats.total_segments,
            overall_stats.segments_with_data
        );

        Ok(AnalysisResult {
            status: STATUS_SUCCESS.to_string(),
            message: ANALYSIS_COMPLETED.to_string(),
            route_id: request.route_id.clone(),
            start_point: request.start,
            end_point: request.end,
            segment_length: request.segment_length_m,
            overall_stats,
            segments,
        })
    }

    /// Keeps the service's statistics and only places its segments along the route.
    pub fn from_bundle(request: &AnalyzeRequest, bundle: AnalysisBundle) -> AssembledAnalysis {
        let analysis = bundle.analysis;
        let count = analysis.segments.len();

        let segments = analysis
            .segments
            .into_iter()
            .enumerate()
            .map(|(index, upstream)| {
                let (start_coordinate, end_coordinate) =
                    ResultAssembler::progress_bounds(&request.start, &request.end, index, count);

                Segment {
                    segment_id: upstream.segment_id,
                    frames_count: upstream.frames_count,
                    coverage_percentage: upstream.coverage_percentage,
                    has_data: upstream.has_data,
                    start_coordinate,
                    end_coordinate,
                }
            })
            .collect();

        let mut overall_stats = analysis.overall_stats;
        if overall_stats.segment_length_meters == 0 {
            overall_stats.segment_length_meters = request.segment_length_m;
        }

        logvbln!(
            "Bundle with {} segments, average coverage {}",
            count,
            overall_stats.average_coverage
        );

        AssembledAnalysis {
            result: AnalysisResult {
                status: STATUS_SUCCESS.to_string(),
                message: ANALYSIS_COMPLETED.to_string(),
                route_id: request.route_id.clone(),
                start_point: request.start,
                end_point: request.end,
                segment_length: request.segment_length_m,
                overall_stats,
                segments,
            },
            annotated_video: bundle.annotated_video,
        }
    }

    /// Even split of the route by segment position. First starts at `start`, last ends at `end`.
    fn progress_bounds(
        start: &Coordinate,
        end: &Coordinate,
        index: usize,
        count: usize,
    ) -> (Coordinate, Coordinate) {
        let start_progress = index as f64 / count as f64;
        let end_progress = if index + 1 >= count {
            1.0
        } else {
            (index + 1) as f64 / count as f64
        };

        (
            GeoUtils::lerp(start, end, start_progress),
            GeoUtils::lerp(start, end, end_progress),
        )
    }
}
