use std::time::Duration;

use curl::easy::{Easy, Form};

use crate::{
    data_types::{
        analysis::UpstreamResponse,
        request::{AnalyzeRequest, VideoUpload},
    },
    error::{GatewayError, Result},
    logln, logvbln,
    util::{config::{InferenceConfig, InferenceMode}, time::Benchmark},
};

use super::{decode_response, InferenceService};

const BUNDLE_ENDPOINT: &str = "analyze-road-marking";
const FRAMES_ENDPOINT: &str = "analyze";
const HEALTH_ENDPOINT: &str = "health";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY: usize = 512;

/// HTTP client of the inference service.
pub struct InferenceApi {
    base_url: String,
    timeout: Duration,
    mode: InferenceMode,
}

struct HttpResponse {
    code: u32,
    body: Vec<u8>,
}

impl HttpResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    fn error(&self, url: &str) -> GatewayError {
        let end = self.body.len().min(MAX_ERROR_BODY);
        GatewayError::upstream(format!(
            "{} answered HTTP {}: {}",
            url,
            self.code,
            String::from_utf8_lossy(&self.body[..end]).trim()
        ))
    }
}

impl InferenceApi {
    const CC: &'static str = "InferenceApi";

    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_seconds),
            mode: config.mode,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn form_fields(mode: InferenceMode, request: &AnalyzeRequest) -> Vec<(&'static str, String)> {
        match mode {
            InferenceMode::Bundle => vec![
                ("lat1", format!("{:.6}", request.start.lat)),
                ("lon1", format!("{:.6}", request.start.lon)),
                ("lat2", format!("{:.6}", request.end.lat)),
                ("lon2", format!("{:.6}", request.end.lon)),
                ("segment_length_m", request.segment_length_m.to_string()),
            ],
            InferenceMode::Frames => vec![
                ("startLat", request.start.lat.to_string()),
                ("startLon", request.start.lon.to_string()),
                ("endLat", request.end.lat.to_string()),
                ("endLon", request.end.lon.to_string()),
                ("segmentLength", request.segment_length_m.to_string()),
            ],
        }
    }

    fn build_form(fields: &[(&'static str, String)], video: VideoUpload) -> Result<Form> {
        let mut form = Form::new();

        for (name, value) in fields {
            form.part(name).contents(value.as_bytes()).add()?;
        }

        let content_type = format!("video/{}", video.extension());
        form.part("video")
            .buffer(&video.filename, video.data)
            .content_type(&content_type)
            .add()?;

        Ok(form)
    }

    fn perform(handle: &mut Easy) -> Result<HttpResponse> {
        let mut body = Vec::new();

        {
            let mut transfer = handle.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        Ok(HttpResponse {
            code: handle.response_code()?,
            body,
        })
    }

    fn post_video(
        url: &str,
        timeout: Duration,
        fields: &[(&'static str, String)],
        video: VideoUpload,
    ) -> Result<UpstreamResponse> {
        let form = InferenceApi::build_form(fields, video)?;

        let mut handle = Easy::new();
        handle.url(url)?;
        handle.timeout(timeout)?;
        handle.httppost(form)?;

        let response = InferenceApi::perform(&mut handle)?;
        if !response.is_success() {
            return Err(response.error(url));
        }

        decode_response(&response.body)
    }

    fn get_health(url: &str) -> Result<()> {
        let mut handle = Easy::new();
        handle.url(url)?;
        handle.get(true)?;
        handle.timeout(HEALTH_TIMEOUT)?;

        let response = InferenceApi::perform(&mut handle)?;
        if !response.is_success() {
            return Err(response.error(url));
        }

        Ok(())
    }
}

async fn blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| GatewayError::upstream(format!("inference call aborted: {}", err)))?
}

#[rocket::async_trait]
impl InferenceService for InferenceApi {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<UpstreamResponse> {
        let url = self.endpoint(match self.mode {
            InferenceMode::Bundle => BUNDLE_ENDPOINT,
            InferenceMode::Frames => FRAMES_ENDPOINT,
        });

        logln!(
            "Sending {} ({} bytes) to {}",
            request.video.filename,
            request.video.data.len(),
            url
        );

        let fields = InferenceApi::form_fields(self.mode, request);
        let video = request.video.clone();
        let timeout = self.timeout;

        let _bench = Benchmark::start("inference call");
        let response =
            blocking(move || InferenceApi::post_video(&url, timeout, &fields, video)).await?;

        match &response {
            UpstreamResponse::Frames(frames) => {
                logvbln!("Received {} frame results", frames.frame_results.len())
            }
            UpstreamResponse::Bundle(bundle) => logvbln!(
                "Received bundle with {} segments, annotated video: {}",
                bundle.analysis.segments.len(),
                bundle.annotated_video.is_some()
            ),
        }

        Ok(response)
    }

    async fn health(&self) -> Result<()> {
        let url = self.endpoint(HEALTH_ENDPOINT);
        blocking(move || InferenceApi::get_health(&url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::common::Coordinate;

    fn config(base_url: &str) -> InferenceConfig {
        InferenceConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 1,
            mode: InferenceMode::Bundle,
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let api = InferenceApi::new(&config("http://ml:8000/"));
        assert_eq!(api.endpoint(BUNDLE_ENDPOINT), "http://ml:8000/analyze-road-marking");
    }

    #[test]
    fn test_build_form_in_both_modes() {
        let request = AnalyzeRequest {
            route_id: "r".to_string(),
            start: Coordinate::new(55.7558, 37.6176),
            end: Coordinate::new(55.7568, 37.6186),
            segment_length_m: 100,
            video: VideoUpload::new("ride.mp4", vec![1, 2, 3]),
        };

        let bundle = InferenceApi::form_fields(InferenceMode::Bundle, &request);
        assert_eq!(bundle[0], ("lat1", "55.755800".to_string()));
        assert_eq!(bundle[4], ("segment_length_m", "100".to_string()));

        let frames = InferenceApi::form_fields(InferenceMode::Frames, &request);
        assert_eq!(frames[1], ("startLon", "37.6176".to_string()));
        assert_eq!(frames[4], ("segmentLength", "100".to_string()));

        assert!(InferenceApi::build_form(&frames, request.video).is_ok());
    }

    #[test]
    fn test_error_response_is_truncated() {
        let response = HttpResponse {
            code: 500,
            body: vec![b'x'; 4096],
        };

        match response.error("http://ml/analyze") {
            GatewayError::Upstream(message) => {
                assert!(message.contains("HTTP 500"));
                assert!(message.len() < 4096);
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_upstream_error() {
        let api = InferenceApi::new(&config("http://127.0.0.1:1"));
        assert!(matches!(api.health().await, Err(GatewayError::Upstream(_))));
    }
}
