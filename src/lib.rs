#[macro_use]
extern crate rocket;

use std::path::PathBuf;

use data_types::{
    analysis::AnalysisResult,
    common::BoundingBox,
    request::{AnalyzeRequest, Pagination},
    route::{AreaRoutesResponse, ListRoutesResponse, Route, RouteResponse},
};
use database::{memory::MemoryRouteStore, route_db::RouteDB, video_store::VideoStore, RouteStore};
use error::{GatewayError, Result};
use inference::{api::InferenceApi, InferenceService};
use processors::AnalysisPipeline;
use util::{
    config::{Config, DatabaseBackend, LoggingSettings},
    facilities::DependenciesBuilder,
    logging,
};

pub mod data_types;
pub mod database;
pub mod error;
pub mod inference;
pub mod processors;
pub mod server;
pub mod util;

/// Everything a request needs, built once at startup and shared by all handlers.
pub struct App {
    config: Config,
    inference: Box<dyn InferenceService>,
    route_store: Box<dyn RouteStore>,
    video_store: VideoStore,
}

impl App {
    const CC: &'static str = "App";

    pub fn new(
        config: Config,
        inference: Box<dyn InferenceService>,
        route_store: Box<dyn RouteStore>,
        video_store: VideoStore,
    ) -> Self {
        Self {
            config,
            inference,
            route_store,
            video_store,
        }
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let route_store: Box<dyn RouteStore> = match config.database.backend {
            DatabaseBackend::Mongodb => {
                Box::new(RouteDB::new(&config.database.uri, &config.database.name).await?)
            }
            DatabaseBackend::Memory => {
                logwarn!("Routes are kept in memory and lost on restart");
                Box::new(MemoryRouteStore::new())
            }
        };

        logln!(
            "Inference service at {} ({:?} mode, {}s timeout)",
            config.inference.base_url,
            config.inference.mode,
            config.inference.timeout_seconds
        );

        Ok(App::new(
            config.clone(),
            Box::new(InferenceApi::new(&config.inference)),
            route_store,
            VideoStore::new(&config.storage.static_dir),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisResult> {
        let facilities = DependenciesBuilder::new()
            .with_inference(self.inference.as_ref())
            .with_route_store(self.route_store.as_ref())
            .with_video_store(&self.video_store)
            .build();

        AnalysisPipeline::new(&facilities)?.run(request).await
    }

    pub async fn get_route(&self, id: &str) -> Result<RouteResponse> {
        Ok(self.route_store.get_by_id(id).await?.into())
    }

    pub async fn list_routes(&self, pagination: Pagination) -> Result<ListRoutesResponse> {
        let (routes, total) = self.route_store.list(&pagination).await?;

        Ok(ListRoutesResponse {
            routes: routes.into_iter().map(RouteResponse::from).collect(),
            total,
            page: pagination.page,
            size: pagination.size,
        })
    }

    pub async fn routes_in_area(&self, area: &BoundingBox) -> Result<AreaRoutesResponse> {
        let routes: Vec<RouteResponse> = self
            .route_store
            .get_by_area(area)
            .await?
            .into_iter()
            .map(RouteResponse::from)
            .collect();

        Ok(AreaRoutesResponse {
            total: routes.len(),
            routes,
        })
    }

    /// Removes the route, then its videos. Leftover files are only logged.
    pub async fn delete_route(&self, id: &str) -> Result<()> {
        let route = self.route_store.get_by_id(id).await?;
        self.route_store.delete(id).await?;

        let paths: Vec<&str> = [&route.video_path, &route.annotated_video_path]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        self.video_store.remove_all(id, &paths).await;

        logln!("Deleted route {}", id);
        Ok(())
    }

    pub async fn route_video_path(&self, id: &str, annotated: bool) -> Result<PathBuf> {
        let route: Route = self.route_store.get_by_id(id).await?;

        let path = if annotated {
            route.annotated_video_path
        } else {
            route.video_path
        };

        path.map(PathBuf::from)
            .ok_or_else(|| GatewayError::NotFound(format!("{} video", id)))
    }

    /// Both the inference service and the route store have to answer.
    pub async fn health(&self) -> Result<()> {
        self.inference.health().await?;
        self.route_store.ping().await
    }
}

pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    logging::set_global_logging(settings.enabled);
    logging::set_global_level(settings.log_level()?);

    for cc in &settings.verbose {
        logging::enable_cc(cc, logging::LogLevel::VERBOSE);
    }

    for cc in &settings.muted {
        logging::disable_cc(cc);
    }

    Ok(())
}
