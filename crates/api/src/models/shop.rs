//! Shops (sellers).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendora_core::{ShopId, UserId};

/// A seller storefront. Products optionally belong to a shop.
#[derive(Debug, Clone, Serialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a shop. The owner is the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub description: Option<String>,
}
