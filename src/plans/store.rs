use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::error::{AppError, Res};
use crate::plans::models::plan::Plan;

/// Read-only access to the plan catalogue.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn list_all(&self) -> Res<Vec<Plan>>;
    async fn find_by_id(&self, id: i64) -> Res<Option<Plan>>;
    /// Resolves a checkout-link reference: slug first, numeric id as a
    /// fallback.
    async fn find_by_ref(&self, plan_ref: &str) -> Res<Option<Plan>>;
}

pub struct PgPlanStore {
    pool: Arc<PgPool>,
}

impl PgPlanStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

const PLAN_COLUMNS: &str = "id, name, price_cents, slug, stripe_plan";

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn list_all(&self) -> Res<Vec<Plan>> {
        sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM plans ORDER BY price_cents, id",
            PLAN_COLUMNS
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_by_id(&self, id: i64) -> Res<Option<Plan>> {
        sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM plans WHERE id = $1",
            PLAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_by_ref(&self, plan_ref: &str) -> Res<Option<Plan>> {
        let by_slug = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM plans WHERE slug = $1",
            PLAN_COLUMNS
        ))
        .bind(plan_ref)
        .fetch_optional(&*self.pool)
        .await
        .map_err(AppError::from)?;

        if let Some(plan) = by_slug {
            return Ok(Some(plan));
        }

        match plan_ref.parse::<i64>() {
            Ok(id) => self.find_by_id(id).await,
            Err(_) => Ok(None),
        }
    }
}
