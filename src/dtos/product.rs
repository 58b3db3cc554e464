//! Product DTOs - Data Transfer Objects for the catalog

use crate::core::FieldOrder;
use crate::entities::{NewProduct, ProductType};
use crate::repositories::Changes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

lazy_static! {
    static ref SKU_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductDTO {
    #[validate(
        length(min = 3, max = 50, message = "sku must be between 3 and 50 characters"),
        regex(
            path = *SKU_PATTERN,
            message = "sku must be alphanumeric and can contain hyphens and underscores"
        )
    )]
    pub sku: String,

    #[validate(length(min = 3, max = 200, message = "name must be between 3 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 100, message = "category must be between 2 and 100 characters"))]
    pub category: String,

    #[serde(rename = "type", default)]
    pub product_type: ProductType,

    #[validate(range(min = 0.01, message = "price must be greater than 0"))]
    pub price: f64,

    #[validate(range(min = 0.0, message = "discountPrice must be >= 0"))]
    pub discount_price: Option<f64>,

    #[validate(range(min = 0, message = "quantity must be >= 0"))]
    pub quantity: i64,
}

impl FieldOrder for CreateProductDTO {
    const FIELD_ORDER: &'static [&'static str] = &[
        "sku",
        "name",
        "description",
        "category",
        "product_type",
        "price",
        "discount_price",
        "quantity",
    ];
}

impl From<CreateProductDTO> for NewProduct {
    fn from(dto: CreateProductDTO) -> Self {
        Self {
            sku: dto.sku,
            name: dto.name,
            description: dto.description,
            category: dto.category,
            product_type: dto.product_type,
            price: dto.price,
            discount_price: dto.discount_price,
            quantity: dto.quantity,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductDTO {
    #[validate(
        length(min = 3, max = 50, message = "sku must be between 3 and 50 characters"),
        regex(
            path = *SKU_PATTERN,
            message = "sku must be alphanumeric and can contain hyphens and underscores"
        )
    )]
    pub sku: Option<String>,

    #[validate(length(min = 3, max = 200, message = "name must be between 3 and 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 100, message = "category must be between 2 and 100 characters"))]
    pub category: Option<String>,

    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,

    #[validate(range(min = 0.01, message = "price must be greater than 0"))]
    pub price: Option<f64>,

    /// `None` leaves the discount alone, `Some(None)` (an explicit `null`) removes it.
    #[serde(default, deserialize_with = "present")]
    #[validate(range(min = 0.0, message = "discountPrice must be >= 0"))]
    pub discount_price: Option<Option<f64>>,

    #[validate(range(min = 0, message = "quantity must be >= 0"))]
    pub quantity: Option<i64>,
}

// campo presente nel JSON, anche se null
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl FieldOrder for UpdateProductDTO {
    const FIELD_ORDER: &'static [&'static str] = <CreateProductDTO as FieldOrder>::FIELD_ORDER;
}

impl UpdateProductDTO {
    pub fn changes(&self) -> Changes {
        Changes::new()
            .set_some("sku", self.sku.clone())
            .set_some("name", self.name.clone())
            .set_some("description", self.description.clone())
            .set_some("category", self.category.clone())
            .set_some("type", self.product_type.map(|t| t.as_str()))
            .set_some("price", self.price)
            .set_some("discountPrice", self.discount_price)
            .set_some("quantity", self.quantity)
    }

    /// Discount after the update, given the stored one.
    pub fn merged_discount(&self, stored: Option<f64>) -> Option<f64> {
        self.discount_price.unwrap_or(stored)
    }
}

/// Inventory summary returned by `GET /products/stats`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductStatsDTO {
    pub total_products: u64,
    pub public_products: u64,
    pub private_products: u64,
    pub out_of_stock: u64,
    pub total_quantity: i64,
    pub inventory_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_defaults_to_public() {
        let dto: CreateProductDTO = serde_json::from_value(json!({
            "sku": "KB-001",
            "name": "Keyboard",
            "category": "Peripherals",
            "price": 49.9,
            "quantity": 2
        }))
        .unwrap();
        assert_eq!(dto.product_type, ProductType::Public);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn sku_pattern_and_price_are_enforced() {
        let dto: CreateProductDTO = serde_json::from_value(json!({
            "sku": "no spaces!",
            "name": "Keyboard",
            "category": "Peripherals",
            "price": 0,
            "discountPrice": -1,
            "quantity": 2
        }))
        .unwrap();
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("sku"));
        assert!(fields.contains_key("price"));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn update_maps_wire_names() {
        let dto = UpdateProductDTO {
            product_type: Some(ProductType::Private),
            discount_price: Some(Some(5.0)),
            ..Default::default()
        };
        let fields: Vec<&str> = dto.changes().iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec!["type", "discountPrice"]);
    }

    #[test]
    fn null_discount_clears_absent_discount_keeps() {
        let absent: UpdateProductDTO = serde_json::from_value(json!({ "price": 10.0 })).unwrap();
        assert_eq!(absent.discount_price, None);
        assert_eq!(absent.merged_discount(Some(4.0)), Some(4.0));
        assert!(absent.changes().iter().all(|(f, _)| *f != "discountPrice"));

        let cleared: UpdateProductDTO =
            serde_json::from_value(json!({ "discountPrice": null })).unwrap();
        assert_eq!(cleared.discount_price, Some(None));
        assert_eq!(cleared.merged_discount(Some(4.0)), None);
        let changes = cleared.changes();
        let (_, value) = changes.iter().find(|(f, _)| *f == "discountPrice").unwrap();
        assert!(value.is_null());

        let invalid: UpdateProductDTO =
            serde_json::from_value(json!({ "discountPrice": -2.0 })).unwrap();
        assert!(invalid.validate().unwrap_err().field_errors().contains_key("discount_price"));
    }
}
