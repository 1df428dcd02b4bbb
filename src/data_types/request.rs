use std::path::Path;

use crate::{
    data_types::common::{BoundingBox, Coordinate, DocumentId},
    error::{GatewayError, Result},
    processors::segment_builder::RouteGeometry,
};

pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

#[derive(Debug, Clone, Default)]
pub struct VideoUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl VideoUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
    }
}

/// A validated analysis request. The core is never invoked with anything else.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub route_id: DocumentId,
    pub start: Coordinate,
    pub end: Coordinate,
    pub segment_length_m: u32,
    pub video: VideoUpload,
}

/// Raw analyze form values, after the key spellings have been folded together.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeFields {
    pub start_lat: Option<String>,
    pub start_lon: Option<String>,
    pub end_lat: Option<String>,
    pub end_lon: Option<String>,
    pub segment_length: Option<String>,
    pub route_id: Option<String>,
}

impl AnalyzeFields {
    pub fn validate(self, video: Option<VideoUpload>) -> Result<AnalyzeRequest> {
        let start = Coordinate::new(
            parse_latitude("start_lat", self.start_lat.as_deref())?,
            parse_longitude("start_lon", self.start_lon.as_deref())?,
        );
        let end = Coordinate::new(
            parse_latitude("end_lat", self.end_lat.as_deref())?,
            parse_longitude("end_lon", self.end_lon.as_deref())?,
        );
        let segment_length_m = parse_segment_length(self.segment_length.as_deref())?;
        RouteGeometry::new(start, end, segment_length_m)?;

        let video = match video {
            Some(video) if !video.data.is_empty() => video,
            Some(_) => return Err(GatewayError::validation("video file is empty")),
            None => return Err(GatewayError::validation("video file is required")),
        };

        let route_id = match self.route_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => validate_route_id(id)?.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        Ok(AnalyzeRequest {
            route_id,
            start,
            end,
            segment_length_m,
            video,
        })
    }
}

/// Raw `ne_*`/`sw_*` query values of an area search.
#[derive(Debug, Clone, Default)]
pub struct AreaFields {
    pub ne_lat: Option<String>,
    pub ne_lon: Option<String>,
    pub sw_lat: Option<String>,
    pub sw_lon: Option<String>,
}

impl AreaFields {
    pub fn validate(self) -> Result<BoundingBox> {
        let north_east = Coordinate::new(
            parse_latitude("ne_lat", self.ne_lat.as_deref())?,
            parse_longitude("ne_lon", self.ne_lon.as_deref())?,
        );
        let south_west = Coordinate::new(
            parse_latitude("sw_lat", self.sw_lat.as_deref())?,
            parse_longitude("sw_lon", self.sw_lon.as_deref())?,
        );

        BoundingBox::new(north_east, south_west).ok_or_else(|| {
            GatewayError::validation(
                "south-west corner must not lie north or east of the north-east corner",
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub size: u64,
}

impl Pagination {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_SIZE: u64 = 10;
    pub const MAX_SIZE: u64 = 100;

    /// Out-of-range or malformed values fall back to the defaults.
    pub fn from_query(page: Option<&str>, size: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(Self::DEFAULT_PAGE);

        let size = size
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|s| (1..=Self::MAX_SIZE).contains(s))
            .unwrap_or(Self::DEFAULT_SIZE);

        Self { page, size }
    }

    /// Capped at `i64::MAX`, the largest skip MongoDB accepts.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.size)
            .min(i64::MAX as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            size: Self::DEFAULT_SIZE,
        }
    }
}

pub const MAX_ROUTE_ID_LEN: usize = 64;

/// Route ids name directories on disk, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_route_id(id: &str) -> Result<&str> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

    if id.is_empty() || id.len() > MAX_ROUTE_ID_LEN || !id.chars().all(allowed) {
        return Err(GatewayError::validation(format!(
            "route_id must be 1 to {} characters of letters, digits, '-' or '_'",
            MAX_ROUTE_ID_LEN
        )));
    }

    Ok(id)
}

fn parse_number(field: &str, value: Option<&str>) -> Result<f64> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::validation(format!("missing required field {}", field)))?;

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GatewayError::validation(format!("{} is not a number: {:?}", field, raw)))
}

fn parse_latitude(field: &str, value: Option<&str>) -> Result<f64> {
    let lat = parse_number(field, value)?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(GatewayError::validation(format!(
            "{} must be within [-90, 90], got {}",
            field, lat
        )));
    }

    Ok(lat)
}

fn parse_longitude(field: &str, value: Option<&str>) -> Result<f64> {
    let lon = parse_number(field, value)?;
    if !(-180.0..=180.0).contains(&lon) {
        return Err(GatewayError::validation(format!(
            "{} must be within [-180, 180], got {}",
            field, lon
        )));
    }

    Ok(lon)
}

fn parse_segment_length(value: Option<&str>) -> Result<u32> {
    let length = parse_number("segment_length", value)?;

    if length <= 0.0 || length.fract() != 0.0 || length > u32::MAX as f64 {
        return Err(GatewayError::validation(format!(
            "segment_length must be a positive whole number of meters, got {}",
            length
        )));
    }

    Ok(length as u32)
}
