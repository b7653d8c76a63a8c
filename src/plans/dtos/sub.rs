use serde::Deserialize;

/// Purchase form posted from the checkout page. Both fields are
/// optional at the type level so validation can name the missing one.
#[derive(Debug, Deserialize)]
pub struct SubscriptionForm {
    pub plan: Option<i64>,
    pub payment_method: Option<String>,
}
