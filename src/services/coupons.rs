use crate::{
    entities::{coupon, coupon_usage, Coupon, CouponKind, CouponModel, CouponUsage},
    errors::ServiceError,
    services::delivery::DeliveryService,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Coupon validation and discount quoting.
///
/// Validation walks the rejection checks in a fixed order and stops at the
/// first failure, so the shopper always sees the most fundamental problem
/// first. Quotes are ephemeral: nothing is persisted and checkout does not
/// read them back.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    delivery: Arc<DeliveryService>,
}

/// Why a coupon was rejected, in check order. Display strings are shown to
/// the shopper verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
    #[error("Minimum order amount is ₹{0}")]
    BelowMinimum(Decimal),
    #[error("Coupon usage limit exceeded")]
    LimitExhausted,
    #[error("You have already used this coupon")]
    AlreadyUsed,
    #[error("Invalid coupon code")]
    UnknownCode,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, delivery: Arc<DeliveryService>) -> Self {
        Self { db, delivery }
    }

    /// Quotes a coupon against the given subtotal. Rejections come back as
    /// `success: false` payloads, not errors; only infrastructure failures
    /// surface as `Err`.
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        code: &str,
        pincode: Option<&str>,
        subtotal: Decimal,
        user_id: Option<Uuid>,
    ) -> Result<CouponQuote, ServiceError> {
        let code = code.trim().to_uppercase();

        let Some(coupon) = Coupon::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?
        else {
            return Ok(CouponQuote::rejected(CouponRejection::UnknownCode));
        };

        if let Some(rejection) = self.rejection_for(&coupon, subtotal, user_id).await? {
            return Ok(CouponQuote::rejected(rejection));
        }

        let delivery_charge = self.delivery.delivery_charge(subtotal, pincode).await?;
        let (discount, delivery_charge) = match coupon.kind {
            // The waived charge is reported as the discount.
            CouponKind::FreeDelivery => (delivery_charge, Decimal::ZERO),
            _ => (Self::discount_for(&coupon, subtotal), delivery_charge),
        };
        let total = subtotal + delivery_charge - discount;

        info!("Quoted coupon {} at discount {}", coupon.code, discount);
        Ok(CouponQuote {
            success: true,
            message: "Coupon applied successfully".to_string(),
            discount: Some(discount),
            delivery_charge: Some(delivery_charge),
            total: Some(total),
        })
    }

    /// Runs every rejection check in order, including the per-user usage
    /// count for authenticated shoppers.
    async fn rejection_for(
        &self,
        coupon: &CouponModel,
        order_amount: Decimal,
        user_id: Option<Uuid>,
    ) -> Result<Option<CouponRejection>, ServiceError> {
        if let Some(rejection) = static_rejection(coupon, Utc::now(), order_amount) {
            return Ok(Some(rejection));
        }

        if let Some(user_id) = user_id {
            let used = CouponUsage::find()
                .filter(coupon_usage::Column::CouponId.eq(coupon.id))
                .filter(coupon_usage::Column::UserId.eq(user_id))
                .count(&*self.db)
                .await?;
            if used >= coupon.usage_limit_per_user as u64 {
                return Ok(Some(CouponRejection::AlreadyUsed));
            }
        }

        Ok(None)
    }

    /// Discount a coupon grants against an order amount. Free-delivery
    /// coupons discount nothing here; the caller waives the delivery charge
    /// instead. The result never exceeds the amount.
    pub fn discount_for(coupon: &CouponModel, amount: Decimal) -> Decimal {
        match coupon.kind {
            CouponKind::Percentage => {
                let mut discount = amount * coupon.value / Decimal::from(100);
                if let Some(cap) = coupon.maximum_discount {
                    discount = discount.min(cap);
                }
                discount.min(amount).round_dp(2)
            }
            CouponKind::Fixed => coupon.value.min(amount),
            CouponKind::FreeDelivery => Decimal::ZERO,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
    ) -> Result<CouponModel, ServiceError> {
        input.validate()?;
        if input.value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Coupon value must be positive".to_string(),
            ));
        }
        if input.ends_at <= input.starts_at {
            return Err(ServiceError::ValidationError(
                "Coupon end date must be after the start date".to_string(),
            ));
        }

        let code = input.code.trim().to_uppercase();
        let existing = Coupon::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Coupon code already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let coupon = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            kind: Set(input.kind),
            value: Set(input.value),
            minimum_amount: Set(input.minimum_amount.unwrap_or(Decimal::ZERO)),
            maximum_discount: Set(input.maximum_discount),
            usage_limit: Set(input.usage_limit),
            usage_limit_per_user: Set(input.usage_limit_per_user.unwrap_or(1)),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            is_active: Set(true),
            usage_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let coupon = coupon.insert(&*self.db).await?;

        info!("Created coupon {} ({})", coupon.code, coupon.id);
        Ok(coupon)
    }

    #[instrument(skip(self))]
    pub async fn list_coupons(&self) -> Result<Vec<CouponModel>, ServiceError> {
        Coupon::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<CouponModel, ServiceError> {
        let coupon = Coupon::find_by_id(coupon_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        let mut active: coupon::ActiveModel = coupon.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let coupon = active.update(&*self.db).await?;

        info!("Deactivated coupon {}", coupon.code);
        Ok(coupon)
    }
}

/// Checks that need no database access: active flag, validity window,
/// minimum amount, global usage limit. Returns the first failure.
fn static_rejection(
    coupon: &CouponModel,
    now: DateTime<Utc>,
    order_amount: Decimal,
) -> Option<CouponRejection> {
    if !coupon.is_active {
        return Some(CouponRejection::Inactive);
    }
    if now < coupon.starts_at || now > coupon.ends_at {
        return Some(CouponRejection::Expired);
    }
    if order_amount < coupon.minimum_amount {
        return Some(CouponRejection::BelowMinimum(coupon.minimum_amount));
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Some(CouponRejection::LimitExhausted);
        }
    }
    None
}

/// Input for creating a coupon
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCouponInput {
    #[validate(length(min = 3, max = 40))]
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub minimum_amount: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Quote returned by apply-coupon. Amount fields are present only on
/// success.
#[derive(Debug, Serialize)]
pub struct CouponQuote {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_charge: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
}

impl CouponQuote {
    fn rejected(rejection: CouponRejection) -> Self {
        Self {
            success: false,
            message: rejection.to_string(),
            discount: None,
            delivery_charge: None,
            total: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(kind: CouponKind, value: Decimal) -> CouponModel {
        let now = Utc::now();
        CouponModel {
            id: Uuid::new_v4(),
            code: "SAVE10".to_string(),
            kind,
            value,
            minimum_amount: Decimal::ZERO,
            maximum_discount: None,
            usage_limit: None,
            usage_limit_per_user: 1,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            is_active: true,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn inactive_wins_over_every_other_rejection() {
        let mut c = coupon(CouponKind::Fixed, dec!(50));
        c.is_active = false;
        c.ends_at = Utc::now() - Duration::days(1);
        c.minimum_amount = dec!(1000);
        assert_eq!(
            static_rejection(&c, Utc::now(), dec!(10)),
            Some(CouponRejection::Inactive)
        );
    }

    #[test]
    fn expiry_is_checked_before_the_minimum_amount() {
        let mut c = coupon(CouponKind::Fixed, dec!(50));
        c.ends_at = Utc::now() - Duration::hours(1);
        c.minimum_amount = dec!(1000);
        assert_eq!(
            static_rejection(&c, Utc::now(), dec!(10)),
            Some(CouponRejection::Expired)
        );
    }

    #[test]
    fn a_coupon_not_yet_started_reads_as_expired() {
        let mut c = coupon(CouponKind::Fixed, dec!(50));
        c.starts_at = Utc::now() + Duration::days(1);
        c.ends_at = Utc::now() + Duration::days(2);
        assert_eq!(
            static_rejection(&c, Utc::now(), dec!(100)),
            Some(CouponRejection::Expired)
        );
    }

    #[test]
    fn minimum_amount_rejection_carries_the_threshold() {
        let mut c = coupon(CouponKind::Percentage, dec!(10));
        c.minimum_amount = dec!(500);
        let rejection = static_rejection(&c, Utc::now(), dec!(499.99));
        assert_eq!(rejection, Some(CouponRejection::BelowMinimum(dec!(500))));
        assert_eq!(
            rejection.map(|r| r.to_string()),
            Some("Minimum order amount is ₹500".to_string())
        );
    }

    #[test]
    fn exhausted_usage_limit_rejects() {
        let mut c = coupon(CouponKind::Fixed, dec!(50));
        c.usage_limit = Some(3);
        c.usage_count = 3;
        assert_eq!(
            static_rejection(&c, Utc::now(), dec!(100)),
            Some(CouponRejection::LimitExhausted)
        );
    }

    #[test]
    fn a_healthy_coupon_passes_the_static_checks() {
        let c = coupon(CouponKind::Percentage, dec!(10));
        assert_eq!(static_rejection(&c, Utc::now(), dec!(100)), None);
    }

    #[test]
    fn percentage_discount_respects_the_cap() {
        let mut c = coupon(CouponKind::Percentage, dec!(20));
        c.maximum_discount = Some(dec!(100));
        assert_eq!(CouponService::discount_for(&c, dec!(1000)), dec!(100));
        assert_eq!(CouponService::discount_for(&c, dec!(400)), dec!(80));
    }

    #[test]
    fn percentage_discount_rounds_to_paise() {
        let c = coupon(CouponKind::Percentage, dec!(15));
        assert_eq!(CouponService::discount_for(&c, dec!(333.33)), dec!(50.00));
    }

    #[test]
    fn fixed_discount_never_exceeds_the_amount() {
        let c = coupon(CouponKind::Fixed, dec!(150));
        assert_eq!(CouponService::discount_for(&c, dec!(100)), dec!(100));
        assert_eq!(CouponService::discount_for(&c, dec!(600)), dec!(150));
    }

    #[test]
    fn free_delivery_discounts_nothing_directly() {
        let c = coupon(CouponKind::FreeDelivery, Decimal::ZERO);
        assert_eq!(CouponService::discount_for(&c, dec!(999)), Decimal::ZERO);
    }
}
