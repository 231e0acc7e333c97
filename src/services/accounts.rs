use crate::{
    auth::{hash_password, issue_token, verify_password},
    config::AppConfig,
    entities::{
        address, patient_profile, pharmacy_profile, user, Address, AddressLabel, AddressModel,
        PatientProfile, PharmacyProfile, User, UserKind, UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::PINCODE_RE,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Accounts service: registration, login, profiles and delivery addresses.
///
/// Patients and pharmacies self-register; admin accounts are seeded out of
/// band and can never be created through this service. Pharmacies start
/// unapproved and carry that state in their profile until reviewed.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, ServiceError> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let existing = User::find()
            .filter(user::Column::Email.eq(&email))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let user = user::ActiveModel {
            id: Set(user_id),
            email: Set(email),
            password_hash: Set(password_hash),
            full_name: Set(input.full_name.trim().to_string()),
            phone: Set(input.phone.trim().to_string()),
            kind: Set(input.kind.into()),
            is_verified: Set(false),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let user = user.insert(&txn).await?;

        match input.kind {
            RegisterKind::Patient => {
                let profile = patient_profile::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    date_of_birth: Set(None),
                    gender: Set(None),
                    allergies: Set(None),
                    chronic_conditions: Set(None),
                    current_medications: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                profile.insert(&txn).await?;
            }
            RegisterKind::Pharmacy => {
                let business_name = non_empty(input.business_name.as_deref());
                let license_number = non_empty(input.license_number.as_deref());
                let (business_name, license_number) = match (business_name, license_number) {
                    (Some(b), Some(l)) => (b, l),
                    _ => {
                        return Err(ServiceError::ValidationError(
                            "Business name and license number are required for pharmacy accounts"
                                .to_string(),
                        ))
                    }
                };

                let duplicate = PharmacyProfile::find()
                    .filter(pharmacy_profile::Column::LicenseNumber.eq(&license_number))
                    .one(&txn)
                    .await?;
                if duplicate.is_some() {
                    return Err(ServiceError::Conflict(
                        "License number already registered".to_string(),
                    ));
                }

                let profile = pharmacy_profile::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    business_name: Set(business_name),
                    license_number: Set(license_number),
                    gst_number: Set(input.gst_number.clone()),
                    business_address: Set(input.business_address.clone()),
                    is_approved: Set(false),
                    credit_limit: Set(Decimal::ZERO),
                    credit_used: Set(Decimal::ZERO),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                profile.insert(&txn).await?;
            }
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::UserRegistered(user_id))
            .await;

        info!("Registered {:?} account {}", user.kind, user_id);
        Ok(user)
    }

    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutput, ServiceError> {
        let email = input.email.trim().to_lowercase();
        let user = User::find()
            .filter(user::Column::Email.eq(&email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is disabled".to_string()));
        }

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        let access_token = issue_token(
            user.id,
            &user.email,
            user.kind,
            &self.config.jwt_secret,
            self.config.jwt_expiration,
        )?;

        self.event_sender
            .send_or_log(Event::UserLoggedIn(user.id))
            .await;

        info!("User {} logged in", user.id);
        Ok(LoginOutput {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.config.jwt_expiration,
            user,
        })
    }

    /// Resolves a user together with their kind-specific profile.
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<AccountProfile, ServiceError> {
        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let profile = match user.kind {
            UserKind::Patient => PatientProfile::find()
                .filter(patient_profile::Column::UserId.eq(user_id))
                .one(&*self.db)
                .await?
                .map(UserProfile::Patient)
                .unwrap_or(UserProfile::None),
            UserKind::Pharmacy => PharmacyProfile::find()
                .filter(pharmacy_profile::Column::UserId.eq(user_id))
                .one(&*self.db)
                .await?
                .map(UserProfile::Pharmacy)
                .unwrap_or(UserProfile::None),
            UserKind::Admin => UserProfile::None,
        };

        Ok(AccountProfile { user, profile })
    }

    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<AddressModel>, ServiceError> {
        Address::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn get_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        Address::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))
    }

    #[instrument(skip(self, input))]
    pub async fn create_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let is_default = input.is_default.unwrap_or(false);

        let txn = self.db.begin().await?;

        if is_default {
            self.clear_default(&txn, user_id).await?;
        }

        let model = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            label: Set(input.label),
            recipient_name: Set(input.recipient_name),
            phone: Set(input.phone),
            line1: Set(input.line1),
            line2: Set(input.line2),
            city: Set(input.city),
            state: Set(input.state),
            pincode: Set(input.pincode),
            landmark: Set(input.landmark),
            is_default: Set(is_default),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await?;

        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let existing = Address::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))?;

        let make_default = input.is_default.unwrap_or(existing.is_default);
        if make_default && !existing.is_default {
            self.clear_default(&txn, user_id).await?;
        }

        let mut active: address::ActiveModel = existing.into();
        active.label = Set(input.label);
        active.recipient_name = Set(input.recipient_name);
        active.phone = Set(input.phone);
        active.line1 = Set(input.line1);
        active.line2 = Set(input.line2);
        active.city = Set(input.city);
        active.state = Set(input.state);
        active.pincode = Set(input.pincode);
        active.landmark = Set(input.landmark);
        active.is_default = Set(make_default);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Removing the default address intentionally leaves the user without
    /// one; no other address is promoted.
    #[instrument(skip(self))]
    pub async fn delete_address(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let deleted = Address::delete_many()
            .filter(address::Column::Id.eq(address_id))
            .filter(address::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Address not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_default_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        let txn = self.db.begin().await?;

        let address = Address::find_by_id(address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))?;

        self.clear_default(&txn, user_id).await?;

        let mut active: address::ActiveModel = address.into();
        active.is_default = Set(true);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    async fn clear_default(
        &self,
        conn: &impl sea_orm::ConnectionTrait,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        Address::update_many()
            .col_expr(address::Column::IsDefault, Expr::value(false))
            .filter(address::Column::UserId.eq(user_id))
            .filter(address::Column::IsDefault.eq(true))
            .exec(conn)
            .await?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Account kinds open to self-registration. Admins are seeded, so the
/// type cannot express them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    Patient,
    Pharmacy,
}

impl From<RegisterKind> for UserKind {
    fn from(kind: RegisterKind) -> Self {
        match kind {
            RegisterKind::Patient => UserKind::Patient,
            RegisterKind::Pharmacy => UserKind::Pharmacy,
        }
    }
}

/// Input for account registration
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 8, max = 15))]
    pub phone: String,
    pub kind: RegisterKind,
    pub business_name: Option<String>,
    pub license_number: Option<String>,
    pub gst_number: Option<String>,
    pub business_address: Option<String>,
}

/// Input for login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Issued token plus the authenticated user
#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub user: UserModel,
}

/// Kind-specific profile payload
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserProfile {
    Patient(patient_profile::Model),
    Pharmacy(pharmacy_profile::Model),
    None,
}

#[derive(Debug, Serialize)]
pub struct AccountProfile {
    pub user: UserModel,
    pub profile: UserProfile,
}

/// Input for creating or replacing an address
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddressInput {
    pub label: AddressLabel,
    #[validate(length(min = 1, max = 120))]
    pub recipient_name: String,
    #[validate(length(min = 8, max = 15))]
    pub phone: String,
    #[validate(length(min = 1, max = 255))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(regex = "PINCODE_RE")]
    pub pincode: String,
    pub landmark: Option<String>,
    pub is_default: Option<bool>,
}
