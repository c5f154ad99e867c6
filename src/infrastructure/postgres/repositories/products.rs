use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::products::ProductEntity;
use crate::domain::repositories::products::ProductRepository;
use crate::infrastructure::postgres::{postgres_connection::PgPool, schema::products};

pub struct ProductPostgres {
    db_pool: Arc<PgPool>,
}

impl ProductPostgres {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProductRepository for ProductPostgres {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = products::table
            .find(id)
            .select(ProductEntity::as_select())
            .first::<ProductEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
