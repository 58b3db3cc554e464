//! Product services - Catalog handlers with role-based visibility

use crate::core::{
    AppError, AppState, ErrorDetails, FieldIssue, IdParam, QueryParams, Reply, ValidJson, require_role,
};
use crate::dtos::{CreateProductDTO, ListQuery, ProductFilters, ProductStatsDTO, UpdateProductDTO};
use crate::entities::{Product, ProductType, Role, User};
use crate::repositories::{Entity, Filter};
use axum::{Extension, extract::State};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const SEARCH_FIELDS: &[&str] = &["name", "sku", "description", "category"];

/// Narrowing every query starts from: plain users only see public products.
fn visibility(user: &User) -> Filter {
    match user.role {
        Role::Admin => Filter::new(),
        Role::User => Filter::new().eq("type", ProductType::Public.as_str()),
    }
}

/// A discount, when present, must be strictly below the price.
fn ensure_discount(price: f64, discount: Option<f64>) -> Result<(), AppError> {
    let Some(discount) = discount else {
        return Ok(());
    };
    if Product::truncate_price(discount) < Product::truncate_price(price) {
        return Ok(());
    }
    warn!(price, discount, "Discount not below price");
    Err(
        AppError::bad_request("Discount price must be less than the regular price")
            .with_code("INVALID_DISCOUNT_PRICE")
            .with_details(ErrorDetails::Fields(vec![FieldIssue {
                field: "discountPrice".to_string(),
                message: format!("discountPrice ({discount}) must be less than price ({price})"),
            }])),
    )
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, sku = %body.sku))]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ValidJson(body): ValidJson<CreateProductDTO>,
) -> Result<Reply<Product>, AppError> {
    require_role(&current_user, Role::Admin)?;
    ensure_discount(body.price, body.discount_price)?;

    let product = state.products.create(body.into()).await?;
    info!(product_id = %product.id, "Product created");
    Ok(Reply::created("Product created successfully", product))
}

#[instrument(skip(state, current_user, query, filters), fields(user_id = %current_user.id))]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    QueryParams(query): QueryParams<ListQuery>,
    QueryParams(filters): QueryParams<ProductFilters>,
) -> Result<Reply<Vec<Product>>, AppError> {
    let spec = filters.apply(query.to_spec(SEARCH_FIELDS));
    debug!(page = spec.page(), limit = spec.limit(), "Listing products");
    let listing = state
        .products
        .list(visibility(&current_user), None, Some(&spec))
        .await?;
    Ok(listing.into())
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn product_stats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Reply<ProductStatsDTO>, AppError> {
    require_role(&current_user, Role::Admin)?;

    let all = Filter::new();
    let public = Filter::new().eq("type", ProductType::Public.as_str());
    let private = Filter::new().eq("type", ProductType::Private.as_str());
    let out_of_stock = Filter::new().eq("quantity", 0i64);
    let (total_products, public_products, private_products, out_of_stock, listing) = futures::try_join!(
        state.products.count(&all),
        state.products.count(&public),
        state.products.count(&private),
        state.products.count(&out_of_stock),
        state.products.list(Filter::new(), None, None),
    )?;

    let products = listing.into_items();
    let total_quantity = products.iter().map(|p| p.quantity).sum::<i64>();
    let inventory_value = products
        .iter()
        .map(|p| p.effective_price() * p.quantity as f64)
        .sum::<f64>();

    Ok(Reply::message(
        "Product statistics retrieved successfully",
        ProductStatsDTO {
            total_products,
            public_products,
            private_products,
            out_of_stock,
            total_quantity,
            inventory_value: Product::truncate_price(inventory_value),
        },
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, product_id = %id))]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    IdParam(id): IdParam,
) -> Result<Reply<Product>, AppError> {
    let product = state.products.find_by_id(&id, None).await?;
    if !visibility(&current_user).test(|field| product.value(field)) {
        // nascosto = inesistente per chi non può vederlo
        warn!("Private product requested by non-admin");
        return Err(
            AppError::not_found("Product with this id not found")
                .with_details(ErrorDetails::resource_with_id("Product", id)),
        );
    }
    Ok(Reply::message("Product retrieved successfully", product))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, product_id = %id))]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    IdParam(id): IdParam,
    ValidJson(body): ValidJson<UpdateProductDTO>,
) -> Result<Reply<Product>, AppError> {
    require_role(&current_user, Role::Admin)?;

    if body.price.is_some() || body.discount_price.is_some() {
        let stored = state.products.find_by_id(&id, None).await?;
        ensure_discount(
            body.price.unwrap_or(stored.price),
            body.merged_discount(stored.discount_price),
        )?;
    }

    let product = state.products.update(&id, body.changes(), None).await?;
    info!("Product updated");
    Ok(Reply::message("Product updated successfully", product))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    IdParam(id): IdParam,
) -> Result<Reply<()>, AppError> {
    require_role(&current_user, Role::Admin)?;
    state.products.remove(&id).await?;
    info!("Product deleted");
    Ok(Reply::message("Product deleted successfully", ()))
}
