//! Booking submission pipeline.
//!
//! ```text
//! brand check → rate limiter → booking_form validation → create booking
//!     → issue upload token → clear wizard session → receipt
//! ```
//!
//! Nothing is persisted unless every earlier step passed.

use crate::clock::Clock;
use crate::config::RateLimitRule;
use crate::error::{BookingError, Result};
use crate::lifecycle::{BookingStatus, PaymentStatus};
use crate::providers::{LifecycleRepository, NewBooking};
use crate::rate_limiter::RateLimiter;
use crate::session::SessionStore;
use crate::state::{BookingId, PaymentId, SessionId};
use crate::upload_token::{DEFAULT_ALLOWED_TYPES, UploadTokenIssuer};
use crate::validation::{BookingForm, SchemaName, ValidationErrors, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Brands accepted when none are configured.
pub const DEFAULT_BRANDS: [&str; 3] = ["puffy", "lava", "indomie"];

/// Where customers send their transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    /// Bank name.
    pub name: String,
    /// Account holder.
    pub account_name: String,
    /// Account number.
    pub account_number: String,
}

impl Default for BankDetails {
    fn default() -> Self {
        Self {
            name: "BCA".to_string(),
            account_name: "PT Talazar Group".to_string(),
            account_number: "1234567890".to_string(),
        }
    }
}

/// Everything the customer needs after submitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// Booking identifier.
    pub booking_id: BookingId,
    /// Payment opened for the booking.
    pub payment_id: PaymentId,
    /// `{BRAND}-{unix_millis}`.
    pub booking_number: String,
    /// `INV-{booking_number}`.
    pub invoice_number: String,
    /// Initial booking status (`pending`).
    pub status: BookingStatus,
    /// Initial payment status (`pending`).
    pub payment_status: PaymentStatus,
    /// Single-use token for the proof-of-payment upload.
    pub upload_token: String,
    /// Transfer instructions.
    pub bank: BankDetails,
    /// Validated booking.
    pub booking: BookingForm,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// Gatekeeper for new bookings.
#[derive(Clone)]
pub struct SubmissionPipeline {
    limiter: RateLimiter,
    validator: Validator,
    tokens: UploadTokenIssuer,
    sessions: SessionStore,
    repository: Arc<dyn LifecycleRepository>,
    clock: Arc<dyn Clock>,
    brands: Vec<String>,
    default_rule: RateLimitRule,
    brand_rules: HashMap<String, RateLimitRule>,
    bank: BankDetails,
}

impl SubmissionPipeline {
    /// Wire a pipeline from its collaborators.
    ///
    /// Starts with the default brands, bank details and a 3-per-minute rule.
    #[must_use]
    pub fn new(
        limiter: RateLimiter,
        validator: Validator,
        tokens: UploadTokenIssuer,
        sessions: SessionStore,
        repository: Arc<dyn LifecycleRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            limiter,
            validator,
            tokens,
            sessions,
            repository,
            clock,
            brands: DEFAULT_BRANDS.iter().map(ToString::to_string).collect(),
            default_rule: RateLimitRule::default(),
            brand_rules: HashMap::new(),
            bank: BankDetails::default(),
        }
    }

    /// Replace the accepted brand slugs.
    #[must_use]
    pub fn with_brands(mut self, brands: Vec<String>) -> Self {
        self.brands = brands;
        self
    }

    /// Set the rule applied to brands without an override.
    #[must_use]
    pub const fn with_default_rule(mut self, rule: RateLimitRule) -> Self {
        self.default_rule = rule;
        self
    }

    /// Override the rule for one brand.
    #[must_use]
    pub fn with_brand_rule(mut self, brand: &str, rule: RateLimitRule) -> Self {
        self.brand_rules.insert(brand.to_string(), rule);
        self
    }

    /// Set transfer instructions returned in receipts.
    #[must_use]
    pub fn with_bank_details(mut self, bank: BankDetails) -> Self {
        self.bank = bank;
        self
    }

    /// Whether `brand` is accepted.
    #[must_use]
    pub fn is_valid_brand(&self, brand: &str) -> bool {
        self.brands.iter().any(|b| b == brand)
    }

    /// Rate limit rule that applies to `brand`.
    #[must_use]
    pub fn rule_for(&self, brand: &str) -> RateLimitRule {
        self.brand_rules
            .get(brand)
            .copied()
            .unwrap_or(self.default_rule)
    }

    /// Transfer instructions.
    #[must_use]
    pub const fn bank_details(&self) -> &BankDetails {
        &self.bank
    }

    /// Accept a booking submission.
    ///
    /// `raw` is the posted form; the brand from the route wins over any
    /// `brandSlug` in the body. When `session` is given, the wizard session is
    /// cleared once the booking exists.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ValidationFailed`] for an unknown brand or bad fields.
    /// - [`BookingError::RateLimited`] when `client_ip` used up its window.
    /// - [`BookingError::StoreUnavailable`] when persistence or token issuance fails.
    pub async fn submit(
        &self,
        client_ip: &str,
        brand: &str,
        raw: &Value,
        session: Option<&SessionId>,
    ) -> Result<SubmissionReceipt> {
        if !self.is_valid_brand(brand) {
            return Err(BookingError::ValidationFailed(ValidationErrors::single(
                "general",
                "Invalid brand",
            )));
        }

        self.limiter
            .enforce(&format!("booking:{client_ip}"), &self.rule_for(brand))
            .await?;

        let mut input = raw.clone();
        if let Value::Object(fields) = &mut input {
            fields.insert("brandSlug".to_string(), Value::String(brand.to_string()));
        }

        let data = self
            .validator
            .validate_schema(SchemaName::BookingForm, &input)
            .map_err(BookingError::ValidationFailed)?;
        let details = Value::Object(data);
        let form: BookingForm = serde_json::from_value(details.clone()).map_err(|e| {
            tracing::warn!(brand = brand, error = %e, "Validated booking form did not deserialize");
            BookingError::ValidationFailed(ValidationErrors::single("general", "Invalid booking details"))
        })?;

        let now = self.clock.now();
        let booking_number = format!("{}-{}", brand.to_uppercase(), now.timestamp_millis());
        let invoice_number = format!("INV-{booking_number}");

        let (booking, payment) = self
            .repository
            .create_booking(NewBooking {
                booking_number: booking_number.clone(),
                invoice_number: invoice_number.clone(),
                brand: brand.to_string(),
                details,
                created_at: now,
            })
            .await?;

        let upload_token = self.tokens.issue(booking.id, &DEFAULT_ALLOWED_TYPES).await?;

        if let Some(session_id) = session {
            // The booking exists at this point; a stale draft only costs storage.
            if let Err(e) = self.sessions.clear(session_id).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to clear wizard session after submission"
                );
            }
        }

        metrics::counter!("booking_submissions_total").increment(1);
        tracing::info!(
            booking_id = %booking.id,
            booking_number = %booking_number,
            brand = brand,
            "Booking submitted"
        );

        Ok(SubmissionReceipt {
            booking_id: booking.id,
            payment_id: payment.id,
            booking_number,
            invoice_number,
            status: booking.status,
            payment_status: payment.status,
            upload_token,
            bank: self.bank.clone(),
            booking: form,
            submitted_at: now,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::mocks::{InMemoryLifecycleRepository, ManualClock};
    use crate::providers::EphemeralStore;
    use crate::session::BookingDraft;
    use crate::stores::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    struct Fixture {
        pipeline: SubmissionPipeline,
        sessions: SessionStore,
        tokens: UploadTokenIssuer,
        repository: InMemoryLifecycleRepository,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap(),
        ));
        let store: Arc<dyn EphemeralStore> = Arc::new(MemoryStore::with_clock(clock.clone()));
        let config = CoordinatorConfig::default();
        let repository = InMemoryLifecycleRepository::new();
        let sessions = SessionStore::new(store.clone(), &config);
        let tokens = UploadTokenIssuer::new(store.clone(), clock.clone(), &config);

        let pipeline = SubmissionPipeline::new(
            RateLimiter::new(store, clock.clone(), &config),
            Validator::new(clock.clone()),
            tokens.clone(),
            sessions.clone(),
            Arc::new(repository.clone()),
            clock.clone(),
        );

        Fixture {
            pipeline,
            sessions,
            tokens,
            repository,
            clock,
        }
    }

    fn form() -> Value {
        json!({
            "name": "Dewi Sartika",
            "email": "dewi@example.com",
            "phone": "081298765432",
            "serviceId": "2",
            "scheduledDate": "2026-08-10T14:00",
            "duration": "90",
            "address": "Jl. Braga No. 5, Bandung",
        })
    }

    #[tokio::test]
    async fn test_submission_creates_pending_booking_and_token() {
        let f = fixture();
        let receipt = f.pipeline.submit("1.2.3.4", "puffy", &form(), None).await.unwrap();

        assert_eq!(receipt.booking_number, format!("PUFFY-{}", f.clock.now().timestamp_millis()));
        assert_eq!(receipt.invoice_number, format!("INV-{}", receipt.booking_number));
        assert_eq!(receipt.status, BookingStatus::Pending);
        assert_eq!(receipt.payment_status, PaymentStatus::Pending);
        assert_eq!(receipt.booking.brand_slug, "puffy");
        assert_eq!(receipt.bank, BankDetails::default());

        let grant = f
            .tokens
            .verify_and_consume(&receipt.upload_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.booking_id, receipt.booking_id);
    }

    #[tokio::test]
    async fn test_unknown_brand_is_rejected_before_anything_else() {
        let f = fixture();
        let err = f.pipeline.submit("1.2.3.4", "acme", &form(), None).await.unwrap_err();
        let BookingError::ValidationFailed(errors) = err else {
            unreachable!("expected validation failure");
        };
        assert_eq!(errors.get("general"), Some("Invalid brand"));
        assert_eq!(f.repository.booking_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_form_persists_nothing() {
        let f = fixture();
        let mut input = form();
        input["email"] = json!("not-an-email");

        let err = f.pipeline.submit("1.2.3.4", "lava", &input, None).await.unwrap_err();
        assert!(matches!(err, BookingError::ValidationFailed(_)));
        assert_eq!(f.repository.booking_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_integer_numbers_are_field_errors() {
        let f = fixture();
        let cases = [
            ("duration", json!("90.5"), "Expected integer, received float"),
            ("serviceId", json!("1.5"), "Expected integer, received float"),
            ("duration", json!("5000000000"), "Number must be less than or equal to 4294967295"),
        ];

        for (field, value, message) in cases {
            let mut input = form();
            input[field] = value;
            let err = f.pipeline.submit("1.2.3.4", "lava", &input, None).await.unwrap_err();
            let BookingError::ValidationFailed(errors) = err else {
                unreachable!("expected validation failure for {field}");
            };
            assert_eq!(errors.get(field), Some(message));
        }
        assert_eq!(f.repository.booking_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fourth_submission_in_a_minute_is_rate_limited() {
        let f = fixture();
        for _ in 0..3 {
            f.pipeline.submit("9.9.9.9", "lava", &form(), None).await.unwrap();
        }
        let err = f.pipeline.submit("9.9.9.9", "lava", &form(), None).await.unwrap_err();
        assert!(matches!(err, BookingError::RateLimited { .. }));
        assert_eq!(f.repository.booking_count().unwrap(), 3);

        f.pipeline.submit("8.8.8.8", "lava", &form(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_brand_rule_override() {
        let f = fixture();
        let pipeline = f
            .pipeline
            .with_brand_rule("indomie", RateLimitRule::new(1, 60_000).unwrap());

        pipeline.submit("5.5.5.5", "indomie", &form(), None).await.unwrap();
        assert!(matches!(
            pipeline.submit("5.5.5.5", "indomie", &form(), None).await,
            Err(BookingError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_submission_clears_wizard_session() {
        let f = fixture();
        let session = SessionId::generate();
        f.sessions
            .save(&session, &BookingDraft { brand: "puffy".into(), ..BookingDraft::default() })
            .await
            .unwrap();

        f.pipeline
            .submit("1.2.3.4", "puffy", &form(), Some(&session))
            .await
            .unwrap();

        assert!(f.sessions.load::<BookingDraft>(&session).await.unwrap().is_none());
    }
}
