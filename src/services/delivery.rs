use crate::{
    config::AppConfig,
    entities::{delivery_zone, DeliveryZone, DeliveryZoneModel},
    errors::ServiceError,
    services::PINCODE_RE,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Delivery charge and tax calculation, plus serviceable-zone management.
///
/// Orders at or above the configured free-delivery threshold ship free.
/// Below it the charge comes from the first serviceable zone whose pincode
/// range covers the destination, falling back to the flat default charge.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    config: Arc<AppConfig>,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// Delivery charge for a subtotal, optionally resolved against the
    /// destination pincode.
    pub async fn delivery_charge(
        &self,
        subtotal: Decimal,
        pincode: Option<&str>,
    ) -> Result<Decimal, ServiceError> {
        self.delivery_charge_on(&*self.db, subtotal, pincode).await
    }

    /// Same as [`delivery_charge`](Self::delivery_charge) but runs the zone
    /// lookup on the caller's connection, so checkout can price inside its
    /// own transaction.
    pub async fn delivery_charge_on(
        &self,
        conn: &impl ConnectionTrait,
        subtotal: Decimal,
        pincode: Option<&str>,
    ) -> Result<Decimal, ServiceError> {
        if subtotal >= self.config.free_delivery_threshold {
            return Ok(Decimal::ZERO);
        }

        if let Some(pincode) = pincode {
            // Pincode ranges are compared as strings; zones are expected to
            // hold zero-padded 6-digit bounds.
            let zone = DeliveryZone::find()
                .filter(delivery_zone::Column::IsServiceable.eq(true))
                .filter(delivery_zone::Column::PincodeStart.lte(pincode))
                .filter(delivery_zone::Column::PincodeEnd.gte(pincode))
                .order_by_asc(delivery_zone::Column::CreatedAt)
                .one(conn)
                .await?;

            if let Some(zone) = zone {
                if subtotal >= self.config.free_delivery_threshold {
                    return Ok(Decimal::ZERO);
                }
                return Ok(zone.delivery_charge);
            }
        }

        Ok(self.config.default_delivery_charge)
    }

    /// Flat tax on a subtotal at the configured rate. Checkout currently
    /// prices orders with zero tax; this stays available for quoting.
    pub fn tax_amount(&self, subtotal: Decimal) -> Decimal {
        (subtotal * self.config.tax_rate).round_dp(2)
    }

    /// Estimated delivery timestamp for orders placed now.
    pub fn estimated_delivery(&self) -> DateTime<Utc> {
        Utc::now() + Duration::days(self.config.estimated_delivery_days)
    }

    #[instrument(skip(self))]
    pub async fn create_zone(
        &self,
        input: CreateDeliveryZoneInput,
    ) -> Result<DeliveryZoneModel, ServiceError> {
        input.validate()?;

        if input.pincode_start > input.pincode_end {
            return Err(ServiceError::ValidationError(
                "Pincode range start must not exceed its end".to_string(),
            ));
        }

        let now = Utc::now();
        let zone = delivery_zone::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            pincode_start: Set(input.pincode_start),
            pincode_end: Set(input.pincode_end),
            delivery_charge: Set(input.delivery_charge),
            is_serviceable: Set(input.is_serviceable.unwrap_or(true)),
            estimated_days: Set(input.estimated_days.unwrap_or(3)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let zone = zone.insert(&*self.db).await?;
        info!("Created delivery zone {} ({})", zone.name, zone.id);
        Ok(zone)
    }

    pub async fn list_zones(&self) -> Result<Vec<DeliveryZoneModel>, ServiceError> {
        DeliveryZone::find()
            .order_by_asc(delivery_zone::Column::PincodeStart)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }
}

/// Input for creating a delivery zone
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateDeliveryZoneInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(regex = "PINCODE_RE")]
    pub pincode_start: String,
    #[validate(regex = "PINCODE_RE")]
    pub pincode_end: String,
    pub delivery_charge: Decimal,
    pub is_serviceable: Option<bool>,
    pub estimated_days: Option<i32>,
}
