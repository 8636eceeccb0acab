#![cfg(test)]

use async_trait::async_trait;
use qflow_schema::{DataSourceRegistry, Schema, SchemaError};

pub struct EmptyRegistry;

#[async_trait]
impl DataSourceRegistry for EmptyRegistry {
    async fn fetch_schema(&self, _id: &str) -> Result<Schema, SchemaError> {
        Ok(Schema::default())
    }
}
