//! In-app purchase domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Store the receipt was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Apple,
    Google,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Apple => "apple",
            Platform::Google => "google",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apple" | "ios" => Ok(Platform::Apple),
            "google" | "android" => Ok(Platform::Google),
            _ => Err(format!("Invalid platform: {}", s)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A receipt already validated by the platform-specific validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidatedPurchase {
    /// Globally unique across platforms.
    pub transaction_id: String,
    pub product_id: String,
    pub platform: Platform,
    pub user_id: Uuid,
}

/// Persisted record of an applied purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub transaction_id: String,
    pub product_id: String,
    pub platform: Platform,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// What a product is worth once bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProductGrant {
    Points {
        points: i64,
        #[serde(default)]
        bonus_points: i64,
    },
    FreePass {
        hours: i64,
    },
}

impl ProductGrant {
    /// Total points credited for a point grant, zero for a free pass.
    pub fn face_value(&self) -> i64 {
        match self {
            ProductGrant::Points {
                points,
                bonus_points,
            } => points + bonus_points,
            ProductGrant::FreePass { .. } => 0,
        }
    }
}

/// Maps store product ids to grants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCatalog {
    products: HashMap<String, ProductGrant>,
}

impl ProductCatalog {
    pub fn new(products: HashMap<String, ProductGrant>) -> Self {
        Self { products }
    }

    pub fn with_product(mut self, product_id: impl Into<String>, grant: ProductGrant) -> Self {
        self.products.insert(product_id.into(), grant);
        self
    }

    pub fn lookup(&self, product_id: &str) -> Option<ProductGrant> {
        self.products.get(product_id).copied()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Result of applying a validated purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PurchaseOutcome {
    /// The grant was applied by this call.
    Applied { grant: ProductGrant },
    /// The transaction id had already been consumed.
    AlreadyApplied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parsing() {
        assert_eq!(Platform::from_str("apple").unwrap(), Platform::Apple);
        assert_eq!(Platform::from_str("Android").unwrap(), Platform::Google);
        assert!(Platform::from_str("amazon").is_err());
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ProductCatalog::default()
            .with_product(
                "points_5",
                ProductGrant::Points {
                    points: 5,
                    bonus_points: 0,
                },
            )
            .with_product("pass_24h", ProductGrant::FreePass { hours: 24 });

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup("points_5").map(|g| g.face_value()), Some(5));
        assert_eq!(
            catalog.lookup("pass_24h"),
            Some(ProductGrant::FreePass { hours: 24 })
        );
        assert!(catalog.lookup("points_500").is_none());
    }

    #[test]
    fn test_grant_deserialization() {
        let grant: ProductGrant =
            serde_json::from_str(r#"{"kind":"points","points":10,"bonus_points":2}"#).unwrap();
        assert_eq!(grant.face_value(), 12);

        let grant: ProductGrant = serde_json::from_str(r#"{"kind":"points","points":3}"#).unwrap();
        assert_eq!(grant.face_value(), 3);
    }
}
