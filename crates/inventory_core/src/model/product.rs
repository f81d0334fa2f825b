//! Product record.
//!
//! # Invariants
//! - `name` is never blank.
//! - `price` is finite and strictly positive.
//! - `description` defaults to empty, `category` to `"General"`.

use super::audit::AuditFields;
use super::{require_text, Entity, EntityId, ValidationError};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

pub const DEFAULT_CATEGORY: &str = "General";

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(skip)]
    pub id: EntityId,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(flatten)]
    pub audit: AuditFields,
}

/// Attributes for creating a product.
///
/// `price` accepts a JSON number or a numeric string.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub name: String,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub price: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "created_by")]
    pub created_by: Option<String>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price: Some(price),
            ..Self::default()
        }
    }
}

/// Partial update for a product. `None` keeps the stored value.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPatch {
    pub name: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub price: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl Entity for Product {
    const KIND: &'static str = "product";
    const TABLE: &'static str = "product";

    type Attributes = NewProduct;
    type Patch = ProductPatch;

    fn create(id: EntityId, attributes: NewProduct, now: &str) -> Result<Self, ValidationError> {
        let price = attributes
            .price
            .ok_or(ValidationError::MissingField("price"))?;
        let product = Self {
            id,
            name: attributes.name,
            price,
            description: attributes.description.unwrap_or_default(),
            category: attributes.category.unwrap_or_else(default_category),
            audit: AuditFields::new(attributes.created_by, now),
        };
        product.validate()?;
        Ok(product)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ValidationError::NonPositive {
                field: "price",
                value: self.price,
            });
        }
        Ok(())
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
