//! PostgreSQL implementation of SubscriptionStore.
//!
//! One row per user. Merge writes use `INSERT ... ON CONFLICT DO UPDATE`
//! with `COALESCE` so that fields absent from a patch keep their stored
//! value; this is also what makes concurrent deliveries last-write-wins
//! at row granularity without application-level locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{RecordPatch, SubscriptionRecord, SubscriptionTier};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::SubscriptionStore;

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription record.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    tier: String,
    is_active: bool,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    stripe_subscription_id: Option<String>,
    stripe_customer_id: Option<String>,
    stripe_product_id: Option<String>,
    provider_status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            tier: parse_tier(&row.tier)?,
            is_active: row.is_active,
            period_start: row.period_start.map(Timestamp::from_datetime),
            period_end: row.period_end.map(Timestamp::from_datetime),
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_customer_id: row.stripe_customer_id,
            stripe_product_id: row.stripe_product_id,
            provider_status: row.provider_status,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_tier(s: &str) -> Result<SubscriptionTier, DomainError> {
    match s.to_lowercase().as_str() {
        "free" => Ok(SubscriptionTier::Free),
        "pro" => Ok(SubscriptionTier::Pro),
        "premium" => Ok(SubscriptionTier::Premium),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid tier value: {}", s),
        )),
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert_merge(
        &self,
        user_id: &UserId,
        patch: RecordPatch,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                user_id, tier, is_active, period_start, period_end,
                stripe_subscription_id, stripe_customer_id, stripe_product_id,
                provider_status, updated_at
            ) VALUES (
                $1, COALESCE($2, 'free'), COALESCE($3, FALSE), $4, $5, $6, $7, $8,
                COALESCE($9, ''), NOW()
            )
            ON CONFLICT (user_id) DO UPDATE SET
                tier = COALESCE($2, subscriptions.tier),
                is_active = COALESCE($3, subscriptions.is_active),
                period_start = COALESCE($4, subscriptions.period_start),
                period_end = COALESCE($5, subscriptions.period_end),
                stripe_subscription_id = COALESCE($6, subscriptions.stripe_subscription_id),
                stripe_customer_id = COALESCE($7, subscriptions.stripe_customer_id),
                stripe_product_id = COALESCE($8, subscriptions.stripe_product_id),
                provider_status = COALESCE($9, subscriptions.provider_status),
                updated_at = NOW()
            "#,
        )
        .bind(user_id.as_str())
        .bind(patch.tier.map(|t| t.as_str()))
        .bind(patch.is_active)
        .bind(patch.period_start.map(|t| *t.as_datetime()))
        .bind(patch.period_end.map(|t| *t.as_datetime()))
        .bind(&patch.stripe_subscription_id)
        .bind(&patch.stripe_customer_id)
        .bind(&patch.stripe_product_id)
        .bind(&patch.provider_status)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to upsert subscription", e))?;

        Ok(())
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                tier = $2,
                is_active = $3,
                period_start = $4,
                period_end = $5,
                stripe_subscription_id = $6,
                stripe_customer_id = $7,
                stripe_product_id = $8,
                provider_status = $9,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(record.tier.as_str())
        .bind(record.is_active)
        .bind(record.period_start.map(|t| *t.as_datetime()))
        .bind(record.period_end.map(|t| *t.as_datetime()))
        .bind(&record.stripe_subscription_id)
        .bind(&record.stripe_customer_id)
        .bind(&record.stripe_product_id)
        .bind(&record.provider_status)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription record not found",
            ));
        }

        Ok(())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT user_id, tier, is_active, period_start, period_end,
                   stripe_subscription_id, stripe_customer_id, stripe_product_id,
                   provider_status, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let user_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM subscriptions
            WHERE stripe_customer_id = $1
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to look up customer", e))?;

        user_id
            .map(|id| {
                UserId::new(id).map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tier_works_for_all_values() {
        assert_eq!(parse_tier("free").unwrap(), SubscriptionTier::Free);
        assert_eq!(parse_tier("pro").unwrap(), SubscriptionTier::Pro);
        assert_eq!(parse_tier("premium").unwrap(), SubscriptionTier::Premium);
        assert_eq!(parse_tier("FREE").unwrap(), SubscriptionTier::Free);
        assert_eq!(parse_tier("Pro").unwrap(), SubscriptionTier::Pro);
    }

    #[test]
    fn parse_tier_rejects_invalid_values() {
        assert!(parse_tier("platinum").is_err());
        assert!(parse_tier("").is_err());
    }

    #[test]
    fn roundtrip_tier_conversion() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Pro,
            SubscriptionTier::Premium,
        ] {
            assert_eq!(parse_tier(tier.as_str()).unwrap(), tier);
        }
    }

    #[test]
    fn row_converts_to_record() {
        let row = SubscriptionRow {
            user_id: "user-123".to_string(),
            tier: "premium".to_string(),
            is_active: true,
            period_start: Some(Utc::now()),
            period_end: Some(Utc::now()),
            stripe_subscription_id: Some("sub_1".to_string()),
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_product_id: Some("prod_1".to_string()),
            provider_status: "active".to_string(),
            updated_at: Utc::now(),
        };

        let record = SubscriptionRecord::try_from(row).unwrap();

        assert_eq!(record.user_id.as_str(), "user-123");
        assert_eq!(record.tier, SubscriptionTier::Premium);
        assert!(record.is_active);
        assert_eq!(record.provider_status, "active");
    }

    #[test]
    fn row_with_invalid_tier_fails_conversion() {
        let row = SubscriptionRow {
            user_id: "user-123".to_string(),
            tier: "platinum".to_string(),
            is_active: false,
            period_start: None,
            period_end: None,
            stripe_subscription_id: None,
            stripe_customer_id: None,
            stripe_product_id: None,
            provider_status: String::new(),
            updated_at: Utc::now(),
        };

        assert!(SubscriptionRecord::try_from(row).is_err());
    }
}
