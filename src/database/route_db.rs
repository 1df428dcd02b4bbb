use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Collection,
};

use crate::{
    data_types::{common::BoundingBox, request::Pagination, route::Route},
    error::{GatewayError, Result},
    logvbln,
};

use super::{mongo::MongoDatabase, RouteStore};

pub struct RouteDB {
    db_conn: MongoDatabase,
}

impl RouteDB {
    const CC: &'static str = "RouteDB";
    const COLL_NAME: &'static str = "routes";

    pub async fn new(uri: &str, name: &str) -> Result<Self> {
        let db_conn = MongoDatabase::connect(uri, name).await?;
        let this = Self { db_conn };

        this.db_conn
            .ensure_descending_index(&this.typed_collection(), "created_at")
            .await?;

        Ok(this)
    }

    fn typed_collection(&self) -> Collection<Route> {
        self.db_conn.typed_collection(RouteDB::COLL_NAME)
    }

    fn newest_first() -> Document {
        doc! {"created_at": -1}
    }

    /// Routes owning a segment whose start or end falls inside `area`.
    pub fn area_filter(area: &BoundingBox) -> Document {
        let (ne, sw) = (area.north_east(), area.south_west());

        let inside = |field: &str| -> Document {
            let lat_key = format!("{}.lat", field);
            let lon_key = format!("{}.lon", field);

            doc! {
                lat_key: {"$gte": sw.lat, "$lte": ne.lat},
                lon_key: {"$gte": sw.lon, "$lte": ne.lon},
            }
        };

        doc! {
            "segments": {
                "$elemMatch": {
                    "$or": [inside("start_coordinate"), inside("end_coordinate")]
                }
            }
        }
    }
}

#[rocket::async_trait]
impl RouteStore for RouteDB {
    async fn create(&self, route: &Route) -> Result<()> {
        logvbln!("Inserting route {} with {} segments", route._id, route.segments.len());

        self.db_conn.insert_one(&self.typed_collection(), route).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Route> {
        self.db_conn
            .find_one(&self.typed_collection(), doc! {"_id": id})
            .await?
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn get_by_area(&self, area: &BoundingBox) -> Result<Vec<Route>> {
        self.db_conn
            .find_many(
                &self.typed_collection(),
                RouteDB::area_filter(area),
                FindOptions::builder().sort(RouteDB::newest_first()).build(),
            )
            .await
    }

    async fn list(&self, pagination: &Pagination) -> Result<(Vec<Route>, u64)> {
        let total = self.db_conn.count(&self.typed_collection(), doc! {}).await?;

        let routes = self
            .db_conn
            .find_many(
                &self.typed_collection(),
                doc! {},
                FindOptions::builder()
                    .sort(RouteDB::newest_first())
                    .skip(pagination.offset())
                    .limit(pagination.size as i64)
                    .build(),
            )
            .await?;

        Ok((routes, total))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let deleted = self
            .db_conn
            .delete_one(&self.typed_collection(), doc! {"_id": id})
            .await?;

        if deleted == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db_conn.ping().await
    }
}
