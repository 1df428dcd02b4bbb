use crate::{
    data_types::{
        analysis::{FrameResultsResponse, UpstreamResponse},
        request::AnalyzeRequest,
    },
    error::{GatewayError, Result},
};

pub mod api;
pub mod bundle;

/// Local file header magic of a zip archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// The external neural-network service that turns a road video into marking detections.
#[rocket::async_trait]
pub trait InferenceService: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<UpstreamResponse>;

    async fn health(&self) -> Result<()>;
}

/// Both endpoints of the service are decoded here, the shape is told apart by the body itself.
pub fn decode_response(body: &[u8]) -> Result<UpstreamResponse> {
    if body.starts_with(ZIP_MAGIC) {
        return Ok(UpstreamResponse::Bundle(bundle::unpack(body)?));
    }

    let frames: FrameResultsResponse = serde_json::from_slice(body).map_err(|err| {
        GatewayError::upstream(format!("malformed analysis response: {}", err))
    })?;

    Ok(UpstreamResponse::Frames(frames))
}
