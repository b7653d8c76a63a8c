// Subscription purchase flow: plan listing, checkout page, subscription
// creation. Card collection and recurring billing are delegated to Stripe.

pub mod plans {
    pub mod routes {
        pub mod plan;
    }

    pub mod services {
        pub mod billing;
    }

    pub mod dtos {
        pub mod sub;
    }

    pub mod models {
        pub mod plan;
    }

    pub mod store;
    pub mod views;
}

// Auth module
pub mod auth {
    pub mod middleware {
        pub mod auth;
    }

    // Re-export auth middleware
    pub use middleware::auth::AuthMiddleware;
}

// Common utilities module
pub mod common {
    pub mod env_config;
    pub mod error;
    pub mod http;
    pub mod jwt;
    pub mod stripe;
}

// Database module
pub mod db;

// Logger module
pub mod logger;

// Re-export commonly used items for convenience
pub use common::error::AppError;
pub use common::http::Success;
pub use common::jwt::JwtClaims;
