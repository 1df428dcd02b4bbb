use std::path::PathBuf;

use rocket::{
    http::{ContentType, Status},
    local::asynchronous::Client,
};
use serde_json::Value;

use road_marking_gateway::{
    data_types::{
        analysis::{FrameResultsResponse, UpstreamResponse},
        request::AnalyzeRequest,
    },
    database::{memory::MemoryRouteStore, video_store::VideoStore},
    error::{GatewayError, Result},
    inference::InferenceService,
    server::build_rocket,
    util::config::Config,
    App,
};

const BOUNDARY: &str = "gateway-test-boundary";

struct ScriptedInference {
    healthy: bool,
    frame_results: Vec<i64>,
}

#[rocket::async_trait]
impl InferenceService for ScriptedInference {
    async fn analyze(&self, _request: &AnalyzeRequest) -> Result<UpstreamResponse> {
        Ok(UpstreamResponse::Frames(FrameResultsResponse {
            status: "success".to_string(),
            message: String::new(),
            frame_results: self.frame_results.clone(),
        }))
    }

    async fn health(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(GatewayError::upstream("connection refused"))
        }
    }
}

async fn client_with(healthy: bool) -> (Client, PathBuf) {
    let static_dir = std::env::temp_dir().join(format!("gateway-api-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.storage.static_dir = static_dir.to_string_lossy().into_owned();

    let app = App::new(
        config,
        Box::new(ScriptedInference {
            healthy,
            frame_results: vec![1, 1, 0, 1, 1, 1, 0, 1, 1, 1],
        }),
        Box::new(MemoryRouteStore::new()),
        VideoStore::new(&static_dir),
    );

    let client = Client::tracked(build_rocket(app)).await.unwrap();
    (client, static_dir)
}

async fn client() -> Client {
    client_with(true).await.0
}

fn multipart(fields: &[(&str, &str)], video: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    if let Some((filename, data)) = video {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_type() -> ContentType {
    ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
}

const ROUTE_FIELDS: &[(&str, &str)] = &[
    ("startLat", "55.7558"),
    ("startLon", "37.6176"),
    ("end_lat", "55.7568"),
    ("end_lon", "37.6186"),
    ("segment_length_m", "100"),
    ("routeId", "test-route"),
];

async fn json(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
    let body = response.into_string().await.unwrap();
    serde_json::from_str(&body).unwrap()
}

#[rocket::async_test]
async fn test_health_on_both_paths() {
    let client = client().await;

    for path in ["/health", "/api/v1/health"] {
        let response = client.get(path).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(json(response).await["status"], "healthy");
    }
}

#[rocket::async_test]
async fn test_health_reports_unreachable_inference() {
    let (client, _) = client_with(false).await;

    let response = client.get("/api/v1/health").dispatch().await;
    assert_eq!(response.status(), Status::ServiceUnavailable);

    let body = json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert!(body["message"].as_str().unwrap().contains("connection refused"));
}

#[rocket::async_test]
async fn test_empty_listing_uses_default_paging() {
    let client = client().await;

    let response = client.get("/api/v1/routes?page=0&size=500").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body = json(response).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["page"], 1);
    assert_eq!(body["size"], 10);
    assert!(body["routes"].as_array().unwrap().is_empty());
}

#[rocket::async_test]
async fn test_unknown_route_is_404() {
    let client = client().await;

    let response = client.get("/api/v1/routes/does-not-exist").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(json(response).await["status"], "error");

    let response = client.delete("/api/v1/routes/does-not-exist").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_analyze_without_video_is_400() {
    let client = client().await;

    let response = client
        .post("/api/v1/analyze")
        .header(multipart_type())
        .body(multipart(ROUTE_FIELDS, None))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert!(json(response).await["message"].as_str().unwrap().contains("video"));
}

#[rocket::async_test]
async fn test_analyze_with_bad_coordinate_is_400() {
    let client = client().await;

    let mut fields = ROUTE_FIELDS.to_vec();
    fields[0] = ("startLat", "123.0");

    let response = client
        .post("/api/v1/analyze")
        .header(multipart_type())
        .body(multipart(&fields, Some(("ride.mp4", &b"fake video"[..]))))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    assert!(json(response).await["message"].as_str().unwrap().contains("start_lat"));
}

#[rocket::async_test]
async fn test_area_with_inverted_box_is_400() {
    let client = client().await;

    let response = client
        .get("/api/v1/routes/area?ne_lat=55&ne_lon=38&sw_lat=56&sw_lon=37")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_analyze_store_query_and_delete() {
    let (client, static_dir) = client_with(true).await;

    let response = client
        .post("/api/v1/analyze")
        .header(multipart_type())
        .body(multipart(ROUTE_FIELDS, Some(("ride.mp4", &b"fake video"[..]))))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let result = json(response).await;
    assert_eq!(result["status"], "success");
    assert_eq!(result["route_id"], "test-route");
    assert_eq!(result["segment_length"], 100);
    assert_eq!(result["overall_stats"]["total_frames"], 10);
    assert_eq!(result["overall_stats"]["total_segments"], 2);
    assert_eq!(result["segments"].as_array().unwrap().len(), 2);

    let response = client.get("/api/v1/routes/test-route").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let route = json(response).await;
    assert_eq!(route["id"], "test-route");
    assert_eq!(route["name"], "Route test-rou");
    assert_eq!(route["video_filename"], "ride.mp4");

    let listing = json(client.get("/api/v1/routes").dispatch().await).await;
    assert_eq!(listing["total"], 1);

    let inside = json(
        client
            .get("/api/v1/routes/area?ne_lat=56&ne_lon=38&sw_lat=55&sw_lon=37")
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(inside["total"], 1);

    let elsewhere = json(
        client
            .get("/api/v1/routes/area?ne_lat=49&ne_lon=3&sw_lat=48&sw_lon=2")
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(elsewhere["total"], 0);

    let video = client.get("/api/v1/routes/test-route/video").dispatch().await;
    assert_eq!(video.status(), Status::Ok);
    assert_eq!(video.into_bytes().await.unwrap(), b"fake video".to_vec());

    let annotated = client.get("/api/v1/routes/test-route/annotated-video").dispatch().await;
    assert_eq!(annotated.status(), Status::NotFound);

    let response = client.delete("/api/v1/routes/test-route").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/api/v1/routes/test-route").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    assert!(!static_dir.join("videos").join("test-route").exists());
}
