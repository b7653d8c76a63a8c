use async_trait::async_trait;
use stripe::{
    AttachPaymentMethod, Client, CreateSetupIntent, CreateSubscription, CreateSubscriptionItems,
    CustomerId, CustomerInvoiceSettings, PaymentMethod, PaymentMethodId, UpdateCustomer,
};

use crate::common::error::{AppError, Res};
use crate::common::stripe::create_client;
use crate::plans::models::plan::SetupIntent;

/// Thin write-side interface to the payment processor. Subscription
/// state lives at the processor; nothing here is persisted locally.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issues an ephemeral token pair the browser uses to register a
    /// payment method against the customer.
    async fn create_setup_intent(&self, customer_id: &str) -> Res<SetupIntent>;

    /// Attaches the payment method, makes it the customer's default and
    /// creates the subscription. Returns the processor's subscription id.
    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        payment_method: &str,
    ) -> Res<String>;
}

pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: create_client(secret_key),
        }
    }
}

fn parse_customer_id(customer_id: &str) -> Res<CustomerId> {
    customer_id
        .parse::<CustomerId>()
        .map_err(|e| AppError::Internal(format!("Malformed Stripe customer id: {}", e)))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_setup_intent(&self, customer_id: &str) -> Res<SetupIntent> {
        let customer = parse_customer_id(customer_id)?;

        let mut params = CreateSetupIntent::new();
        params.customer = Some(customer);
        params.payment_method_types = Some(vec!["card".to_string()]);

        let intent = stripe::SetupIntent::create(&self.client, params).await?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            AppError::Internal("Stripe returned a setup intent without a client secret".to_string())
        })?;

        Ok(SetupIntent {
            id: intent.id.to_string(),
            client_secret,
        })
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        payment_method: &str,
    ) -> Res<String> {
        let customer = parse_customer_id(customer_id)?;
        let pm_id = payment_method.parse::<PaymentMethodId>().map_err(|_| {
            AppError::BadRequest("Invalid payment method token".to_string())
        })?;

        PaymentMethod::attach(
            &self.client,
            &pm_id,
            AttachPaymentMethod {
                customer: customer.clone(),
            },
        )
        .await?;

        let mut update = UpdateCustomer::new();
        update.invoice_settings = Some(CustomerInvoiceSettings {
            default_payment_method: Some(pm_id.to_string()),
            ..Default::default()
        });
        stripe::Customer::update(&self.client, &customer, update).await?;

        let mut params = CreateSubscription::new(customer);
        params.items = Some(vec![CreateSubscriptionItems {
            price: Some(price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]);
        let subscription = stripe::Subscription::create(&self.client, params).await?;

        Ok(subscription.id.to_string())
    }
}
