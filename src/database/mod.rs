use crate::{
    data_types::{common::BoundingBox, request::Pagination, route::Route},
    error::Result,
};

pub mod memory;
pub mod mongo;
pub mod route_db;
pub mod video_store;

/// Storage of analysed routes. A route owns its segments; deleting it removes them too.
#[rocket::async_trait]
pub trait RouteStore: Send + Sync {
    async fn create(&self, route: &Route) -> Result<()>;

    /// `GatewayError::NotFound` when no route has this id.
    async fn get_by_id(&self, id: &str) -> Result<Route>;

    /// Routes with at least one segment endpoint inside `area`, newest first.
    async fn get_by_area(&self, area: &BoundingBox) -> Result<Vec<Route>>;

    /// One page of routes, newest first, with the total number of stored routes.
    async fn list(&self, pagination: &Pagination) -> Result<(Vec<Route>, u64)>;

    /// `GatewayError::NotFound` when no route has this id.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

pub(crate) fn route_in_area(route: &Route, area: &BoundingBox) -> bool {
    route
        .segments
        .iter()
        .any(|s| area.contains(&s.start_coordinate) || area.contains(&s.end_coordinate))
}
