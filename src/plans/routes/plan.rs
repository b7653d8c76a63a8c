use actix_session::Session;
use actix_web::{Responder, get, post, web};
use log::info;
use std::sync::Arc;

use crate::common::{
    env_config::Config,
    error::AppError,
    http::Success,
    jwt::JwtClaims,
};
use crate::plans::{
    dtos::sub::SubscriptionForm, services::billing::PaymentGateway, store::PlanStore, views,
};

/// Session key under which the post-purchase flash message is stored.
const FLASH_KEY: &str = "success";

/// Renders the plan listing page.
///
/// # Input
/// - `store`: Plan catalogue
/// - `session`: Cookie session, consulted for a one-shot flash message
///
/// # Output
/// - Success: HTML page listing every plan with a checkout link
/// - Error: Returns 500 Internal Server Error if the catalogue cannot be read
#[get("/plans")]
pub async fn get_plans(
    store: web::Data<Arc<dyn PlanStore>>,
    session: Session,
) -> impl Responder {
    let plans = store.list_all().await?;
    // Reading the flash removes it so it shows at most once.
    let flash = session.remove_as::<String>(FLASH_KEY).and_then(|r| r.ok());
    Success::page(views::plans_page(&plans, flash.as_deref()))
}

/// Renders the checkout page for one plan.
///
/// Issues a fresh setup intent against the signed-in user's Stripe customer
/// so the browser can register a card before the purchase is posted.
///
/// # Input
/// - `path`: Plan reference from the URL, a slug or a numeric id
/// - `claims`: JWT claims of the signed-in user, placed by the auth middleware
/// - `store`: Plan catalogue
/// - `gateway`: Payment processor client
/// - `config`: Application configuration carrying the Stripe publishable key
///
/// # Output
/// - Success: HTML checkout page embedding the setup intent client secret
/// - Error: 404 if the reference matches no plan, 500 on processor failure
#[get("/plans/{plan_ref}")]
pub async fn get_checkout(
    path: web::Path<String>,
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn PlanStore>>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    config: web::Data<Arc<Config>>,
) -> impl Responder {
    let plan_ref = path.into_inner();
    let plan = store
        .find_by_ref(&plan_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No such plan: {}", plan_ref)))?;

    let intent = gateway.create_setup_intent(&claims.stripe_customer_id).await?;

    Success::page(views::checkout_page(&plan, &intent, &config.stripe.public_key))
}

/// Creates the subscription from the posted checkout form.
///
/// Validates the form, hands the plan's Stripe price and the registered
/// payment method to the processor, then redirects back to the listing with
/// a flash message.
///
/// # Input
/// - `form`: Checkout form with `plan` (id) and `payment_method` (Stripe token)
/// - `claims`: JWT claims of the signed-in user
/// - `store`: Plan catalogue
/// - `gateway`: Payment processor client
/// - `session`: Cookie session receiving the flash message
///
/// # Output
/// - Success: 302 redirect to `/plans`
/// - Error: 422 naming the offending field, or the processor's error
#[post("/subscription")]
pub async fn post_subscription(
    form: web::Form<SubscriptionForm>,
    claims: web::ReqData<JwtClaims>,
    store: web::Data<Arc<dyn PlanStore>>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    session: Session,
) -> impl Responder {
    let form = form.into_inner();

    let plan_id = form
        .plan
        .ok_or_else(|| AppError::validation("plan", "The plan field is required."))?;
    let payment_method = form
        .payment_method
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            AppError::validation("payment_method", "The payment method field is required.")
        })?;

    let plan = store
        .find_by_id(plan_id)
        .await?
        .ok_or_else(|| AppError::validation("plan", "The selected plan is invalid."))?;

    let subscription_id = gateway
        .create_subscription(&claims.stripe_customer_id, &plan.stripe_plan, &payment_method)
        .await?;

    info!(
        "Created subscription {} to plan {} for user {}",
        subscription_id, plan.slug, claims.user_id
    );

    session
        .insert(FLASH_KEY, views::FLASH_SUBSCRIBED)
        .map_err(|e| AppError::Internal(format!("Failed to store flash message: {}", e)))?;

    Success::redirect("/plans")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use actix_session::{SessionMiddleware, storage::CookieSessionStore};
    use actix_web::{
        App,
        cookie::{Cookie, Key},
        http::{StatusCode, header},
        test,
    };
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::auth::AuthMiddleware;
    use crate::common::env_config::{JwtConfig, StripeKeys};
    use crate::common::error::Res;
    use crate::common::jwt::{ClaimsSpec, generate_jwt};
    use crate::plans::models::plan::{Plan, SetupIntent};

    const JWT_SECRET: &str = "a-test-secret-that-is-long-enough";

    struct InMemoryPlanStore {
        plans: Vec<Plan>,
    }

    #[async_trait]
    impl PlanStore for InMemoryPlanStore {
        async fn list_all(&self) -> Res<Vec<Plan>> {
            Ok(self.plans.clone())
        }

        async fn find_by_id(&self, id: i64) -> Res<Option<Plan>> {
            Ok(self.plans.iter().find(|p| p.id == id).cloned())
        }

        async fn find_by_ref(&self, plan_ref: &str) -> Res<Option<Plan>> {
            let by_slug = self.plans.iter().find(|p| p.slug == plan_ref).cloned();
            if by_slug.is_some() {
                return Ok(by_slug);
            }
            match plan_ref.parse::<i64>() {
                Ok(id) => self.find_by_id(id).await,
                Err(_) => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        intents: Mutex<Vec<String>>,
        subscriptions: Mutex<Vec<(String, String, String)>>,
        fail_subscriptions: bool,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_setup_intent(&self, customer_id: &str) -> Res<SetupIntent> {
            self.intents.lock().unwrap().push(customer_id.to_string());
            Ok(SetupIntent {
                id: "seti_123".to_string(),
                client_secret: "seti_123_secret_456".to_string(),
            })
        }

        async fn create_subscription(
            &self,
            customer_id: &str,
            price_id: &str,
            payment_method: &str,
        ) -> Res<String> {
            if self.fail_subscriptions {
                return Err(AppError::BadRequest("Your card was declined.".to_string()));
            }
            self.subscriptions.lock().unwrap().push((
                customer_id.to_string(),
                price_id.to_string(),
                payment_method.to_string(),
            ));
            Ok("sub_123".to_string())
        }
    }

    fn pro_plan() -> Plan {
        Plan {
            id: 1,
            name: "Pro".to_string(),
            price_cents: 999,
            slug: "pro".to_string(),
            stripe_plan: "plan_abc".to_string(),
        }
    }

    fn config() -> Arc<Config> {
        Arc::new(Config {
            environment: "test".to_string(),
            database_url: "postgresql://localhost/test".to_string(),
            jwt_config: JwtConfig {
                secret: JWT_SECRET.to_string(),
                expiration_hours: 1,
            },
            session_secret: "x".repeat(64),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            num_workers: 1,
            cors_allowed_origin: "http://localhost".to_string(),
            console_logging_enabled: false,
            stripe: StripeKeys {
                public_key: "pk_test_abc".to_string(),
                secret_key: "sk_test_abc".to_string(),
            },
        })
    }

    fn session_cookie() -> Cookie<'static> {
        let token = generate_jwt(
            ClaimsSpec {
                user_id: Uuid::new_v4(),
                email: "jane@example.com".to_string(),
                stripe_customer_id: "cus_test_1".to_string(),
            },
            &config().jwt_config,
        )
        .unwrap();
        Cookie::new("session", token)
    }

    macro_rules! test_app {
        ($store:expr, $gateway:expr) => {{
            let store: Arc<dyn PlanStore> = $store;
            let gateway: Arc<dyn PaymentGateway> = $gateway;
            test::init_service(
                App::new()
                    .wrap(
                        SessionMiddleware::builder(
                            CookieSessionStore::default(),
                            Key::derive_from(&[0u8; 64]),
                        )
                        .cookie_secure(false)
                        .build(),
                    )
                    .app_data(web::Data::new(store))
                    .app_data(web::Data::new(gateway))
                    .app_data(web::Data::new(config()))
                    .service(get_plans)
                    .service(
                        web::scope("")
                            .wrap(AuthMiddleware::new(JWT_SECRET.to_string()))
                            .service(get_checkout)
                            .service(post_subscription),
                    ),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn listing_shows_every_plan() {
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![
                    pro_plan(),
                    Plan {
                        id: 2,
                        name: "Team".to_string(),
                        price_cents: 2900,
                        slug: "team".to_string(),
                        stripe_plan: "plan_def".to_string(),
                    },
                ],
            }),
            Arc::new(RecordingGateway::default())
        );

        let req = test::TestRequest::get().uri("/plans").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Pro"));
        assert!(body.contains("9.99"));
        assert!(body.contains("Team"));
        assert!(body.contains("29.00"));
        assert!(body.contains("/plans/pro"));
    }

    #[actix_web::test]
    async fn listing_needs_no_session() {
        let app = test_app!(
            Arc::new(InMemoryPlanStore { plans: vec![] }),
            Arc::new(RecordingGateway::default())
        );

        let req = test::TestRequest::get().uri("/plans").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn checkout_embeds_intent_secret_and_public_key() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::get()
            .uri("/plans/pro")
            .cookie(session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("seti_123_secret_456"));
        assert!(body.contains("pk_test_abc"));

        let intents = gateway.intents.lock().unwrap();
        assert_eq!(intents.as_slice(), ["cus_test_1"]);
    }

    #[actix_web::test]
    async fn checkout_resolves_numeric_plan_reference() {
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            Arc::new(RecordingGateway::default())
        );

        let req = test::TestRequest::get()
            .uri("/plans/1")
            .cookie(session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn checkout_unknown_plan_is_404_without_touching_gateway() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::get()
            .uri("/plans/enterprise")
            .cookie(session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(gateway.intents.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn checkout_without_session_redirects_to_login() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::get().uri("/plans/pro").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
        assert!(gateway.intents.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn purchase_without_session_redirects_to_login() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .set_form([("plan", "1"), ("payment_method", "pm_test_1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
        assert!(gateway.subscriptions.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn purchase_without_plan_names_the_field() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .cookie(session_cookie())
            .set_form([("payment_method", "pm_test_1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("\"field\":\"plan\""));
        assert!(gateway.subscriptions.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn purchase_without_payment_method_names_the_field() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .cookie(session_cookie())
            .set_form([("plan", "1"), ("payment_method", "  ")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("\"field\":\"payment_method\""));
        assert!(gateway.subscriptions.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn purchase_of_unknown_plan_is_rejected() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .cookie(session_cookie())
            .set_form([("plan", "99"), ("payment_method", "pm_test_1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("The selected plan is invalid."));
        assert!(gateway.subscriptions.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn purchase_creates_subscription_and_redirects() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .cookie(session_cookie())
            .set_form([("plan", "1"), ("payment_method", "pm_test_1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/plans"
        );

        let subscriptions = gateway.subscriptions.lock().unwrap();
        assert_eq!(
            subscriptions.as_slice(),
            [(
                "cus_test_1".to_string(),
                "plan_abc".to_string(),
                "pm_test_1".to_string()
            )]
        );
    }

    #[actix_web::test]
    async fn flash_message_shows_once_after_purchase() {
        let gateway = Arc::new(RecordingGateway::default());
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .cookie(session_cookie())
            .set_form([("plan", "1"), ("payment_method", "pm_test_1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);

        // Carry the session cookie from the redirect into the next request.
        let session: Vec<Cookie<'static>> = resp
            .response()
            .cookies()
            .map(|c| c.into_owned())
            .collect();

        let mut req = test::TestRequest::get().uri("/plans");
        for cookie in &session {
            req = req.cookie(cookie.clone());
        }
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let follow_up: Vec<Cookie<'static>> = resp
            .response()
            .cookies()
            .map(|c| c.into_owned())
            .collect();

        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Subscription purchased successfully!"));

        // The flash was consumed, a second visit renders without it.
        let mut req = test::TestRequest::get().uri("/plans");
        for cookie in &follow_up {
            req = req.cookie(cookie.clone());
        }
        let resp = test::call_service(&app, req.to_request()).await;
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(!body.contains("Subscription purchased successfully!"));
    }

    #[actix_web::test]
    async fn declined_card_surfaces_the_gateway_error() {
        let gateway = Arc::new(RecordingGateway {
            fail_subscriptions: true,
            ..Default::default()
        });
        let app = test_app!(
            Arc::new(InMemoryPlanStore {
                plans: vec![pro_plan()],
            }),
            gateway.clone()
        );

        let req = test::TestRequest::post()
            .uri("/subscription")
            .cookie(session_cookie())
            .set_form([("plan", "1"), ("payment_method", "pm_test_1")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(gateway.subscriptions.lock().unwrap().is_empty());
    }
}
