//! Product business logic - catalog lookups used when rendering order previews.

use crate::{
    config::app::ProductSeed,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashMap;
use tracing::info;

/// Retrieves a specific product by its id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: &str,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists active products ordered by name.
pub async fn get_all_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads product names for a batch of ids in one query, keyed by id.
///
/// Inactive products still resolve; unknown ids are simply absent from the map.
pub async fn product_names_by_ids(
    db: &DatabaseConnection,
    product_ids: &[String],
) -> Result<HashMap<String, String>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Product::find()
        .filter(product::Column::Id.is_in(product_ids.iter().cloned()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect())
}

/// Creates a new product.
///
/// # Errors
/// Returns `Error::InvalidInput` if the name is empty, or a database error if the insert fails.
pub async fn create_product(
    db: &DatabaseConnection,
    id: Option<String>,
    name: &str,
    description: Option<String>,
) -> Result<product::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Product name cannot be empty"));
    }

    let now = chrono::Utc::now();
    let product = product::ActiveModel {
        id: Set(id.unwrap_or_else(super::new_id)),
        name: Set(name.trim().to_string()),
        description: Set(description),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    product.insert(db).await.map_err(Into::into)
}

/// Creates each configured product whose id is not already present.
pub async fn seed_products(db: &DatabaseConnection, seeds: &[ProductSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if get_product_by_id(db, &seed.id).await?.is_some() {
            continue;
        }
        create_product(db, Some(seed.id.clone()), &seed.name, seed.description.clone()).await?;
        created += 1;
    }
    if created > 0 {
        info!("Seeded {} products from configuration.", created);
    }
    Ok(created)
}
