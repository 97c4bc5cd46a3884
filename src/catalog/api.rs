//! Product listing endpoint

use crate::auth::AuthenticatedUser;
use crate::catalog::{
    models::{PageParams, Pagination, Product},
    store::ProductStore,
};
use crate::error::ApiError;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

/// Decoded query string, in request order
pub type QueryPairs = Vec<(String, String)>;

#[derive(Clone)]
pub struct CatalogState {
    pub products: ProductStore,
}

/// List products - GET /api/products?page=&limit=
pub async fn list_products(
    State(state): State<CatalogState>,
    Extension(user): Extension<AuthenticatedUser>,
    WithRejection(Query(pairs), _): WithRejection<Query<QueryPairs>, ApiError>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let page = Pagination::from_params(&PageParams::from_pairs(pairs));

    let products = state
        .products
        .list(page)
        .await
        .map_err(|e| ApiError::internal("Error fetching products", e))?;

    debug!(
        user_id = %user.user_id,
        page = page.page,
        limit = page.limit,
        returned = products.len(),
        "Listed products"
    );

    Ok(Json(products))
}
