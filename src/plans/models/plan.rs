use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A priced subscription tier. Rows are managed out of band by admin
/// tooling; this service only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    /// Price in minor currency units (cents).
    pub price_cents: i64,
    /// URL-safe identifier used in checkout links.
    pub slug: String,
    /// Stripe price reference the subscription is created against.
    pub stripe_plan: String,
}

impl Plan {
    /// Price in major units with two decimals, e.g. 999 -> "9.99".
    pub fn display_price(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// Ephemeral Stripe token pair authorizing the browser to register a
/// payment method. Issued per checkout-page view, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: String,
}
