//! # Authentication Middleware Module
//!
//! This module provides middleware for authenticating requests to pages that
//! require a signed-in user. It validates the JWT carried by the session
//! cookie and adds the decoded claims to the request extensions for use by
//! route handlers. Requests without a valid session are redirected to the
//! login page instead of receiving a bare 401, since the protected routes
//! render browser-facing pages.
//!
//! ## Usage
//! ```rust,ignore
//! // In main.rs or app configuration
//! .service(
//!     web::scope("")
//!         .wrap(auth::AuthMiddleware::new(config.jwt_config.secret.clone()))
//!         .service(/* secured endpoints */)
//! )
//! ```

use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures::future::{Ready, ok};

use crate::common::jwt::validate_jwt;

/// Name of the cookie carrying the session JWT.
pub const SESSION_COOKIE: &str = "session";

/// Authentication middleware for browser-facing secured routes.
///
/// Validates the session cookie locally against the configured JWT secret
/// and redirects to `/login` when the cookie is missing or invalid.
pub struct AuthMiddleware {
    jwt_secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(jwt_secret: String) -> Self {
        AuthMiddleware {
            jwt_secret: Rc::new(jwt_secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            jwt_secret: self.jwt_secret.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    jwt_secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
        let jwt_secret = self.jwt_secret.clone();
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let claims = token.and_then(|t| validate_jwt(&t, &jwt_secret).ok());
            match claims {
                Some(claims) => {
                    // Make the claims available to route handlers.
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                None => {
                    let response = HttpResponse::Found()
                        .insert_header((header::LOCATION, "/login"))
                        .finish()
                        .map_into_boxed_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}
