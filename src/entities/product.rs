//! Product entity - Catalog record with price normalization

use super::{
    decode_id, decode_parsed, expect_float, expect_int, expect_opt_float, expect_opt_text,
    expect_parsed, expect_text, expect_timestamp,
};
use crate::entities::ProductType;
use crate::repositories::{Entity, FieldValue, RecordId, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::mysql::MySqlRow;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: RecordId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub product_type: ProductType,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub quantity: i64,
}

impl Product {
    /// Truncates (never rounds) to two decimals.
    pub fn truncate_price(value: f64) -> f64 {
        // the epsilon absorbs binary representation error, e.g. 19.99 * 100 = 1998.9999...
        (value * 100.0 + 1e-6).trunc() / 100.0
    }

    pub fn normalize_sku(sku: &str) -> String {
        sku.trim().to_uppercase()
    }

    /// Price customers actually pay.
    pub fn effective_price(&self) -> f64 {
        self.discount_price.unwrap_or(self.price)
    }
}

impl Entity for Product {
    const NAME: &'static str = "Product";
    const TABLE: &'static str = "products";
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("sku", "sku"),
        ("name", "name"),
        ("description", "description"),
        ("category", "category"),
        ("type", "type"),
        ("price", "price"),
        ("discountPrice", "discount_price"),
        ("quantity", "quantity"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];
    const UNIQUE: &'static [&'static str] = &["sku"];

    type Create = NewProduct;

    fn build(id: RecordId, data: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            sku: Self::normalize_sku(&data.sku),
            name: data.name.trim().to_string(),
            description: data.description,
            category: data.category.trim().to_string(),
            product_type: data.product_type,
            price: Self::truncate_price(data.price),
            discount_price: data.discount_price.map(Self::truncate_price),
            quantity: data.quantity,
            created_at: now,
            updated_at: now,
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("id", self.id.into()),
            ("sku", self.sku.clone().into()),
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("category", self.category.clone().into()),
            ("type", self.product_type.as_str().into()),
            ("price", self.price.into()),
            ("discountPrice", self.discount_price.into()),
            ("quantity", self.quantity.into()),
            ("createdAt", self.created_at.into()),
            ("updatedAt", self.updated_at.into()),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), StoreError> {
        match field {
            "sku" => self.sku = Self::normalize_sku(&expect_text(field, value)?),
            "name" => self.name = expect_text(field, value)?.trim().to_string(),
            "description" => self.description = expect_opt_text(field, value)?,
            "category" => self.category = expect_text(field, value)?.trim().to_string(),
            "type" => self.product_type = expect_parsed(field, value)?,
            "price" => self.price = Self::truncate_price(expect_float(field, value)?),
            "discountPrice" => {
                self.discount_price = expect_opt_float(field, value)?.map(Self::truncate_price)
            }
            "quantity" => self.quantity = expect_int(field, value)?,
            "createdAt" => self.created_at = expect_timestamp(field, value)?,
            "updatedAt" => self.updated_at = expect_timestamp(field, value)?,
            other => return Err(StoreError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_id(row)?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            product_type: decode_parsed(row, "type")?,
            price: row.try_get("price")?,
            discount_price: row.try_get("discount_price")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            sku: " kb-001 ".into(),
            name: "Keyboard".into(),
            description: None,
            category: "Peripherals".into(),
            product_type: ProductType::Public,
            price: 19.999,
            discount_price: Some(9.991),
            quantity: 3,
        }
    }

    #[test]
    fn build_normalizes_sku_and_prices() {
        let product = Product::build(RecordId::new(), new_product(), Utc::now());
        assert_eq!(product.sku, "KB-001");
        assert_eq!(product.price, 19.99);
        assert_eq!(product.discount_price, Some(9.99));
    }

    #[test]
    fn truncation_never_rounds_up() {
        assert_eq!(Product::truncate_price(19.99), 19.99);
        assert_eq!(Product::truncate_price(0.019), 0.01);
        assert_eq!(Product::truncate_price(100.0), 100.0);
    }

    #[test]
    fn serializes_type_under_its_wire_name() {
        let product = Product::build(RecordId::new(), new_product(), Utc::now());
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["type"], "public");
        assert_eq!(json["discountPrice"], 9.99);
        assert!(json["description"].is_null());
    }

    #[test]
    fn assign_applies_the_same_normalization() {
        let mut product = Product::build(RecordId::new(), new_product(), Utc::now());
        product.assign("sku", "ab-9".into()).unwrap();
        product.assign("discountPrice", FieldValue::Null).unwrap();
        product.assign("quantity", FieldValue::Int(0)).unwrap();
        assert_eq!(product.sku, "AB-9");
        assert_eq!(product.discount_price, None);
        assert_eq!(product.effective_price(), product.price);
    }
}
