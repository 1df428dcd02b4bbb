use std::path::{Path, PathBuf};

use crate::{
    data_types::{
        analysis::AnalysisResult,
        request::AnalyzeRequest,
        route::Route,
    },
    database::{
        video_store::{Staging, VideoStore},
        RouteStore,
    },
    error::{GatewayError, Result},
    inference::InferenceService,
    logerr, logln,
    util::{
        facilities::{Facilities, Required},
        time::Benchmark,
        DateTimeUtils,
    },
};

use self::assembler::{AssembledAnalysis, ResultAssembler};

pub mod assembler;
pub mod segment_builder;
pub mod statistics;

/// Inference call, result assembly and best-effort persistence of one uploaded video.
pub struct AnalysisPipeline<'a> {
    inference: &'a dyn InferenceService,
    route_store: &'a dyn RouteStore,
    video_store: &'a VideoStore,
}

impl<'a> AnalysisPipeline<'a> {
    const CC: &'static str = "Pipeline";

    pub fn new(dependencies: &Facilities<'a>) -> Result<Self> {
        dependencies.check(&[Required::Inference, Required::RouteStore, Required::VideoStore])?;

        Ok(Self {
            inference: dependencies.inference()?,
            route_store: dependencies.route_store()?,
            video_store: dependencies.video_store()?,
        })
    }

    /// Fails only when the analysis itself fails. A route that could not be stored
    /// is reported in the result message.
    pub async fn run(&self, request: AnalyzeRequest) -> Result<AnalysisResult> {
        let _bench = Benchmark::start("analysis");

        logln!(
            "Analysing route {} ({}m segments) from {:?} to {:?}",
            request.route_id,
            request.segment_length_m,
            request.start,
            request.end
        );

        let response = self.inference.analyze(&request).await?;
        let assembled = ResultAssembler::assemble(&request, response)?;

        let result = match self.persist(&request, &assembled).await {
            Ok(()) => {
                logln!("Stored route {}", request.route_id);
                assembled.result
            }
            Err(err) => {
                logerr!("Route {} not stored: {}", request.route_id, err);

                let mut result = assembled.result;
                result.message = format!("{}, but the route was not saved: {}", result.message, err);
                result
            }
        };

        Ok(result)
    }

    async fn persist(&self, request: &AnalyzeRequest, assembled: &AssembledAnalysis) -> Result<()> {
        match self.route_store.get_by_id(&request.route_id).await {
            Ok(_) => {
                return Err(GatewayError::Storage(format!(
                    "route {} already exists",
                    request.route_id
                )))
            }
            Err(GatewayError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        // Overlapping requests for one id can all pass the check above. Files only
        // move out of staging once this request's route is created.
        let mut staging = self.video_store.staging(&request.route_id);

        let staged = self.stage_videos(&mut staging, request, assembled).await;
        let (video_path, annotated_path) = match staged {
            Ok(paths) => paths,
            Err(err) => {
                self.video_store.discard(staging).await;
                return Err(err);
            }
        };

        let route = AnalysisPipeline::route_from(request, assembled, &video_path, annotated_path.as_deref());

        if let Err(err) = self.route_store.create(&route).await {
            self.video_store.discard(staging).await;
            return Err(err);
        }

        if let Err(err) = self.video_store.commit(staging).await {
            if let Err(delete_err) = self.route_store.delete(&request.route_id).await {
                logerr!("Route {} left without videos: {}", request.route_id, delete_err);
            }
            self.remove_videos(&request.route_id, &[Some(video_path), annotated_path]).await;
            return Err(err);
        }

        Ok(())
    }

    async fn stage_videos(
        &self,
        staging: &mut Staging,
        request: &AnalyzeRequest,
        assembled: &AssembledAnalysis,
    ) -> Result<(PathBuf, Option<PathBuf>)> {
        let video_path = self
            .video_store
            .save_original(staging, &request.route_id, &request.video)
            .await?;

        let annotated_path = match &assembled.annotated_video {
            Some(data) => Some(
                self.video_store
                    .save_annotated(staging, &request.route_id, data)
                    .await?,
            ),
            None => None,
        };

        Ok((video_path, annotated_path))
    }

    async fn remove_videos(&self, route_id: &str, paths: &[Option<PathBuf>]) {
        let paths: Vec<String> = paths
            .iter()
            .flatten()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();

        self.video_store.remove_all(route_id, &paths).await;
    }

    fn route_from(
        request: &AnalyzeRequest,
        assembled: &AssembledAnalysis,
        video_path: &Path,
        annotated_path: Option<&Path>,
    ) -> Route {
        let result = &assembled.result;

        Route {
            _id: request.route_id.clone(),
            name: Route::default_name(&request.route_id),
            description: None,
            start_point: result.start_point,
            end_point: result.end_point,
            segment_length_m: result.segment_length,
            overall_stats: result.overall_stats.clone(),
            segments: result.segments.clone(),
            video_filename: Some(request.video.filename.clone()),
            video_path: Some(video_path.to_string_lossy().into_owned()),
            annotated_video_path: annotated_path.map(|p| p.to_string_lossy().into_owned()),
            created_at: DateTimeUtils::now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_types::{
            analysis::{
                AnalysisBundle, BundleAnalysis, BundleSegment, FrameResultsResponse,
                UpstreamResponse, STATUS_SUCCESS,
            },
            common::{BoundingBox, Coordinate},
            request::{Pagination, VideoUpload},
        },
        database::memory::MemoryRouteStore,
        util::facilities::DependenciesBuilder,
    };

    /// Answers every analysis with the same canned response.
    struct ScriptedInference {
        response: Result<UpstreamResponse>,
    }

    #[rocket::async_trait]
    impl InferenceService for ScriptedInference {
        async fn analyze(&self, _request: &AnalyzeRequest) -> Result<UpstreamResponse> {
            match &self.response {
                Ok(response) => Ok(response.clone()),
                Err(err) => Err(GatewayError::upstream(err.to_string())),
            }
        }

        async fn health(&self) -> Result<()> {
            self.response.as_ref().map(|_| ()).map_err(|err| GatewayError::upstream(err.to_string()))
        }
    }

    struct BrokenStore;

    #[rocket::async_trait]
    impl RouteStore for BrokenStore {
        async fn create(&self, _route: &Route) -> Result<()> {
            Err(GatewayError::Storage("connection reset".to_string()))
        }

        async fn get_by_id(&self, id: &str) -> Result<Route> {
            Err(GatewayError::NotFound(id.to_string()))
        }

        async fn get_by_area(&self, _area: &BoundingBox) -> Result<Vec<Route>> {
            Ok(Vec::new())
        }

        async fn list(&self, _pagination: &Pagination) -> Result<(Vec<Route>, u64)> {
            Ok((Vec::new(), 0))
        }

        async fn delete(&self, id: &str) -> Result<()> {
            Err(GatewayError::NotFound(id.to_string()))
        }

        async fn ping(&self) -> Result<()> {
            Err(GatewayError::Storage("connection reset".to_string()))
        }
    }

    fn bundle_response() -> UpstreamResponse {
        UpstreamResponse::Bundle(AnalysisBundle {
            analysis: BundleAnalysis {
                status: Some(STATUS_SUCCESS.to_string()),
                segments: vec![BundleSegment {
                    segment_id: 1,
                    frames_count: 12,
                    coverage_percentage: 75.0,
                    has_data: true,
                }],
                ..Default::default()
            },
            annotated_video: Some(vec![4, 2]),
        })
    }

    fn request(route_id: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            route_id: route_id.to_string(),
            start: Coordinate::new(55.7558, 37.6176),
            end: Coordinate::new(55.7568, 37.6186),
            segment_length_m: 100,
            video: VideoUpload::new("ride.mp4", vec![1, 2, 3]),
        }
    }

    fn temp_videos() -> VideoStore {
        VideoStore::new(std::env::temp_dir().join(format!("pipeline-{}", uuid::Uuid::new_v4())))
    }

    async fn run(
        inference: &ScriptedInference,
        store: &dyn RouteStore,
        videos: &VideoStore,
        request: AnalyzeRequest,
    ) -> Result<AnalysisResult> {
        let facilities = DependenciesBuilder::new()
            .with_inference(inference)
            .with_route_store(store)
            .with_video_store(videos)
            .build();

        AnalysisPipeline::new(&facilities)?.run(request).await
    }

    #[tokio::test]
    async fn test_bundle_analysis_is_stored_with_videos() {
        let inference = ScriptedInference { response: Ok(bundle_response()) };
        let store = MemoryRouteStore::new();
        let videos = temp_videos();

        let result = run(&inference, &store, &videos, request("abc")).await.unwrap();

        assert_eq!(result.status, STATUS_SUCCESS);
        assert_eq!(result.route_id, "abc");
        assert_eq!(result.segments.len(), 1);

        let route = store.get_by_id("abc").await.unwrap();
        assert_eq!(route.name, "Route abc");
        assert_eq!(route.video_filename.as_deref(), Some("ride.mp4"));

        let video_path = route.video_path.unwrap();
        let annotated_path = route.annotated_video_path.unwrap();
        assert!(Path::new(&video_path).ends_with("videos/abc/abc.mp4"));
        assert_eq!(tokio::fs::read(&annotated_path).await.unwrap(), vec![4, 2]);
    }

    #[tokio::test]
    async fn test_frames_analysis_is_aggregated_and_stored() {
        let inference = ScriptedInference {
            response: Ok(UpstreamResponse::Frames(FrameResultsResponse {
                status: STATUS_SUCCESS.to_string(),
                message: String::new(),
                frame_results: vec![1, 0, 1, 1],
            })),
        };
        let store = MemoryRouteStore::new();
        let videos = temp_videos();

        let result = run(&inference, &store, &videos, request("frames")).await.unwrap();

        assert_eq!(result.overall_stats.total_frames, 4);
        assert!(store.get_by_id("frames").await.unwrap().annotated_video_path.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_keeps_result_and_removes_videos() {
        let inference = ScriptedInference { response: Ok(bundle_response()) };
        let videos = temp_videos();

        let result = run(&inference, &BrokenStore, &videos, request("lost")).await.unwrap();

        assert_eq!(result.status, STATUS_SUCCESS);
        assert!(result.message.contains("not saved"));
        assert!(result.message.contains("connection reset"));
        assert!(!videos.route_dir("lost").exists());
    }

    #[tokio::test]
    async fn test_upstream_failure_persists_nothing() {
        let inference = ScriptedInference {
            response: Err(GatewayError::upstream("model crashed")),
        };
        let store = MemoryRouteStore::new();
        let videos = temp_videos();

        let err = run(&inference, &store, &videos, request("nope")).await.unwrap_err();

        assert!(matches!(err, GatewayError::Upstream(_)));
        assert_eq!(store.list(&Pagination::default()).await.unwrap().1, 0);
        assert!(!videos.route_dir("nope").exists());
    }

    #[tokio::test]
    async fn test_existing_route_is_not_overwritten() {
        let inference = ScriptedInference { response: Ok(bundle_response()) };
        let store = MemoryRouteStore::new();
        let videos = temp_videos();

        run(&inference, &store, &videos, request("twice")).await.unwrap();
        let first = store.get_by_id("twice").await.unwrap();

        let second = run(&inference, &store, &videos, request("twice")).await.unwrap();

        assert!(second.message.contains("already exists"));
        assert_eq!(store.get_by_id("twice").await.unwrap().created_at, first.created_at);
        assert!(Path::new(&first.video_path.unwrap()).exists());
    }

    /// Never sees an existing route, as when two requests for one id overlap.
    struct RacingStore {
        inner: MemoryRouteStore,
    }

    #[rocket::async_trait]
    impl RouteStore for RacingStore {
        async fn create(&self, route: &Route) -> Result<()> {
            self.inner.create(route).await
        }

        async fn get_by_id(&self, id: &str) -> Result<Route> {
            Err(GatewayError::NotFound(id.to_string()))
        }

        async fn get_by_area(&self, area: &BoundingBox) -> Result<Vec<Route>> {
            self.inner.get_by_area(area).await
        }

        async fn list(&self, pagination: &Pagination) -> Result<(Vec<Route>, u64)> {
            self.inner.list(pagination).await
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.inner.delete(id).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_losing_duplicate_keeps_stored_videos() {
        let inference = ScriptedInference { response: Ok(bundle_response()) };
        let store = RacingStore {
            inner: MemoryRouteStore::new(),
        };
        let videos = temp_videos();

        run(&inference, &store, &videos, request("dup")).await.unwrap();

        let mut late = request("dup");
        late.video = VideoUpload::new("other.mp4", vec![7, 7, 7]);
        let second = run(&inference, &store, &videos, late).await.unwrap();
        assert!(second.message.contains("already exists"));

        let stored = store.inner.get_by_id("dup").await.unwrap();
        let video_path = stored.video_path.unwrap();
        assert_eq!(tokio::fs::read(&video_path).await.unwrap(), vec![1, 2, 3]);
        assert!(Path::new(&stored.annotated_video_path.unwrap()).exists());

        let mut entries = tokio::fs::read_dir(videos.route_dir("dup")).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_pipeline_requires_all_facilities() {
        let store = MemoryRouteStore::new();
        let facilities = DependenciesBuilder::new().with_route_store(&store).build();

        assert!(matches!(AnalysisPipeline::new(&facilities), Err(GatewayError::Config(_))));
    }
}
