use tokio::sync::RwLock;

use crate::{
    data_types::{
        common::{BoundingBox, Identifiable},
        request::Pagination,
        route::Route,
    },
    error::{GatewayError, Result},
};

use super::{route_in_area, RouteStore};

/// Process-local route storage, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryRouteStore {
    routes: RwLock<Vec<Route>>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Default::default()
    }

    fn newest_first(routes: &mut [Route]) {
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

#[rocket::async_trait]
impl RouteStore for MemoryRouteStore {
    async fn create(&self, route: &Route) -> Result<()> {
        let mut routes = self.routes.write().await;

        if routes.iter().any(|r| r.id() == route.id()) {
            return Err(GatewayError::Storage(format!("route {} already exists", route._id)));
        }

        routes.push(route.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Route> {
        self.routes
            .read()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn get_by_area(&self, area: &BoundingBox) -> Result<Vec<Route>> {
        let mut found: Vec<Route> = self
            .routes
            .read()
            .await
            .iter()
            .filter(|r| route_in_area(r, area))
            .cloned()
            .collect();

        MemoryRouteStore::newest_first(&mut found);
        Ok(found)
    }

    async fn list(&self, pagination: &Pagination) -> Result<(Vec<Route>, u64)> {
        let mut all = self.routes.read().await.clone();
        let total = all.len() as u64;

        MemoryRouteStore::newest_first(&mut all);

        let page = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.size as usize)
            .collect();

        Ok((page, total))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut routes = self.routes.write().await;
        let before = routes.len();

        routes.retain(|r| r.id() != id);

        if routes.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
