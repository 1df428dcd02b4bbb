use std::path::Path;

use rocket::{
    data::{Limits, ToByteUnit},
    fairing::{Fairing, Info, Kind},
    form::{self, Form},
    fs::{NamedFile, TempFile},
    http::{ContentType, Header, Status},
    Build, Request, Response, Rocket, State,
};
use serde_derive::Serialize;
use tokio::io::AsyncReadExt;

use crate::{
    data_types::{
        analysis::{AnalysisResult, STATUS_ERROR},
        request::{AnalyzeFields, AreaFields, Pagination, VideoUpload},
    },
    error::{GatewayError, Result},
    logerr, logln, logwarn,
    util::config::Config,
    App,
};

const CC: &str = "Server";

type ApiResponse = (Status, (ContentType, String));

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Cross-Origin-Resource-Sharing Fairing",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Origin, Content-Type, Content-Length, Accept-Encoding, Authorization",
        ));
    }
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
    message: String,
}

fn json_response<T: serde::Serialize>(status: Status, body: &T) -> ApiResponse {
    match serde_json::to_string(body) {
        Ok(json) => (status, (ContentType::JSON, json)),
        Err(err) => message_response(Status::InternalServerError, STATUS_ERROR, err.to_string()),
    }
}

fn message_response(status: Status, label: &str, message: String) -> ApiResponse {
    let body = StatusBody {
        status: label,
        message,
    };

    let json = serde_json::to_string(&body).unwrap_or_default();
    (status, (ContentType::JSON, json))
}

/// `upstream` is the status used when the inference service is at fault.
fn error_response(err: &GatewayError, upstream: Status) -> ApiResponse {
    let status = match err {
        GatewayError::Validation(_) => Status::BadRequest,
        GatewayError::NotFound(_) => Status::NotFound,
        GatewayError::Upstream(_) => upstream,
        GatewayError::Storage(_) | GatewayError::Config(_) | GatewayError::Io(_) => {
            Status::InternalServerError
        }
    };

    if status.code >= 500 {
        logerr!(@CC, "{}", err);
    }

    message_response(status, STATUS_ERROR, err.to_string())
}

fn respond<T: serde::Serialize>(result: Result<T>) -> ApiResponse {
    match result {
        Ok(body) => json_response(Status::Ok, &body),
        Err(err) => error_response(&err, Status::InternalServerError),
    }
}

#[options("/<_..>")]
fn all_options() {
    /* Intentionally left empty */
}

#[derive(FromForm)]
pub struct AnalyzeForm<'r> {
    #[field(name = "start_lat")]
    #[field(name = "startLat")]
    start_lat: Option<String>,

    #[field(name = "start_lon")]
    #[field(name = "startLon")]
    start_lon: Option<String>,

    #[field(name = "end_lat")]
    #[field(name = "endLat")]
    end_lat: Option<String>,

    #[field(name = "end_lon")]
    #[field(name = "endLon")]
    end_lon: Option<String>,

    #[field(name = "segment_length")]
    #[field(name = "segment_length_m")]
    #[field(name = "segmentLength")]
    segment_length: Option<String>,

    #[field(name = "route_id")]
    #[field(name = "routeId")]
    route_id: Option<String>,

    video: Option<TempFile<'r>>,
}

async fn read_upload(file: &TempFile<'_>) -> Result<VideoUpload> {
    let filename = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str())
        .and_then(|raw| Path::new(raw).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("video.mp4")
        .to_string();

    let mut data = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await?;
    tokio::pin!(reader);
    reader.read_to_end(&mut data).await?;

    Ok(VideoUpload::new(filename, data))
}

async fn analyze_form(app: &App, form: AnalyzeForm<'_>) -> Result<AnalysisResult> {
    let video = match &form.video {
        Some(file) => Some(read_upload(file).await?),
        None => None,
    };

    let request = AnalyzeFields {
        start_lat: form.start_lat,
        start_lon: form.start_lon,
        end_lat: form.end_lat,
        end_lon: form.end_lon,
        segment_length: form.segment_length,
        route_id: form.route_id,
    }
    .validate(video)?;

    app.analyze(request).await
}

async fn handle_analyze(app: &App, form: form::Result<'_, Form<AnalyzeForm<'_>>>) -> ApiResponse {
    let form = match form {
        Ok(form) => form.into_inner(),
        Err(errors) => {
            logwarn!(@CC, "Rejected analyze form: {}", errors);
            return message_response(Status::BadRequest, STATUS_ERROR, errors.to_string());
        }
    };

    match analyze_form(app, form).await {
        Ok(result) => json_response(Status::Ok, &result),
        Err(err) => error_response(&err, Status::BadGateway),
    }
}

#[post("/analyze", data = "<form>")]
async fn analyze(app: &State<App>, form: form::Result<'_, Form<AnalyzeForm<'_>>>) -> ApiResponse {
    handle_analyze(app, form).await
}

#[post("/routes", data = "<form>")]
async fn create_route(app: &State<App>, form: form::Result<'_, Form<AnalyzeForm<'_>>>) -> ApiResponse {
    handle_analyze(app, form).await
}

#[get("/routes?<page>&<size>")]
async fn list_routes(app: &State<App>, page: Option<&str>, size: Option<&str>) -> ApiResponse {
    respond(app.list_routes(Pagination::from_query(page, size)).await)
}

#[get("/routes/area?<ne_lat>&<ne_lon>&<sw_lat>&<sw_lon>")]
async fn routes_in_area(
    app: &State<App>,
    ne_lat: Option<String>,
    ne_lon: Option<String>,
    sw_lat: Option<String>,
    sw_lon: Option<String>,
) -> ApiResponse {
    let area = AreaFields {
        ne_lat,
        ne_lon,
        sw_lat,
        sw_lon,
    }
    .validate();

    match area {
        Ok(area) => respond(app.routes_in_area(&area).await),
        Err(err) => error_response(&err, Status::InternalServerError),
    }
}

#[get("/routes/<id>")]
async fn get_route(app: &State<App>, id: &str) -> ApiResponse {
    respond(app.get_route(id).await)
}

#[delete("/routes/<id>")]
async fn delete_route(app: &State<App>, id: &str) -> ApiResponse {
    match app.delete_route(id).await {
        Ok(()) => message_response(Status::Ok, "success", format!("Route {} deleted", id)),
        Err(err) => error_response(&err, Status::InternalServerError),
    }
}

async fn stream_video(app: &App, id: &str, annotated: bool) -> std::result::Result<NamedFile, ApiResponse> {
    let path = app
        .route_video_path(id, annotated)
        .await
        .map_err(|err| error_response(&err, Status::InternalServerError))?;

    NamedFile::open(&path).await.map_err(|err| {
        logwarn!(@CC, "Video {} of route {} unreadable: {}", path.display(), id, err);
        error_response(
            &GatewayError::NotFound(format!("{} video", id)),
            Status::InternalServerError,
        )
    })
}

#[get("/routes/<id>/video")]
async fn route_video(app: &State<App>, id: &str) -> std::result::Result<NamedFile, ApiResponse> {
    stream_video(app, id, false).await
}

#[get("/routes/<id>/annotated-video")]
async fn route_annotated_video(
    app: &State<App>,
    id: &str,
) -> std::result::Result<NamedFile, ApiResponse> {
    stream_video(app, id, true).await
}

#[get("/health")]
async fn health(app: &State<App>) -> ApiResponse {
    match app.health().await {
        Ok(()) => message_response(Status::Ok, "healthy", "Service is running".to_string()),
        Err(err) => {
            logwarn!(@CC, "Health check failed: {}", err);
            message_response(Status::ServiceUnavailable, "unhealthy", err.to_string())
        }
    }
}

/// Assembles the HTTP server around an already constructed `App`.
pub fn build_rocket(app: App) -> Rocket<Build> {
    let config: &Config = app.config();
    let upload_limit = config.server.max_upload_mb.mebibytes();

    let figment = rocket::Config::figment()
        .merge(("address", config.server.host.clone()))
        .merge(("port", config.server.port))
        .merge((
            "limits",
            Limits::default()
                .limit("file", upload_limit)
                .limit("data-form", upload_limit),
        ));

    logln!(@CC, "Listening on {}:{}", config.server.host, config.server.port);

    rocket::custom(figment)
        .attach(Cors)
        .manage(app)
        .mount("/", routes![health, all_options])
        .mount(
            "/api/v1",
            routes![
                analyze,
                create_route,
                list_routes,
                routes_in_area,
                get_route,
                delete_route,
                route_video,
                route_annotated_video,
                health,
            ],
        )
}
