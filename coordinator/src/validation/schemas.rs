//! Named schemas and the typed values they produce.

use super::rules::Field;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Every schema the pipeline knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaName {
    /// Customer contact details.
    Customer,
    /// Booking details without the customer.
    Booking,
    /// Customer and booking details posted together by the wizard.
    BookingForm,
    /// Bank transfer claim accompanying a proof upload.
    PaymentProof,
    /// Administrator verdict on a payment proof.
    Verification,
    /// Service catalog entry (admin).
    Service,
    /// Brand catalog entry (admin).
    Brand,
    /// List query parameters.
    Pagination,
}

impl SchemaName {
    /// Storage / routing name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Booking => "booking",
            Self::BookingForm => "booking_form",
            Self::PaymentProof => "payment_proof",
            Self::Verification => "verification",
            Self::Service => "service",
            Self::Brand => "brand",
            Self::Pagination => "pagination",
        }
    }

    const ALL: [Self; 8] = [
        Self::Customer,
        Self::Booking,
        Self::BookingForm,
        Self::PaymentProof,
        Self::Verification,
        Self::Service,
        Self::Brand,
        Self::Pagination,
    ];

    /// Field rules for this schema.
    #[must_use]
    pub fn fields(self) -> Vec<Field> {
        match self {
            Self::Customer => customer_fields(),
            Self::Booking => booking_fields(),
            Self::BookingForm => {
                let mut fields = customer_fields();
                fields.extend(booking_fields());
                fields
            }
            Self::PaymentProof => vec![
                Field::number("bookingId").positive_default().integer(),
                Field::text("referenceNumber")
                    .min_len(1, "Reference number is required")
                    .max_len(100),
                Field::text("bankAccount")
                    .min_len(1, "Bank account is required")
                    .max_len(100),
                Field::number("amount").positive("Amount must be positive"),
            ],
            Self::Verification => vec![
                Field::number("paymentId").positive_default().integer(),
                Field::text("decision").one_of(&["approved", "rejected"]),
                Field::text("rejectionReason").optional(),
            ],
            Self::Service => vec![
                Field::text("name")
                    .min_len(1, "Service name is required")
                    .max_len(100),
                Field::text("description").max_len(1000),
                Field::number("basePrice").positive("Price must be positive"),
                Field::number("duration")
                    .positive("Duration must be positive")
                    .integer()
                    .at_most(f64::from(u32::MAX)),
                Field::boolean("isActive").default_value(json!(true)),
                Field::list(
                    "variants",
                    vec![
                        Field::text("name")
                            .min_len(1, "String must contain at least 1 character(s)")
                            .max_len(100),
                        Field::number("price").positive_default(),
                        Field::text("description").optional().max_len(500),
                    ],
                )
                .optional(),
            ],
            Self::Brand => vec![
                Field::text("name")
                    .min_len(1, "Brand name is required")
                    .max_len(100),
                Field::text("slug")
                    .min_len(1, "Slug is required")
                    .max_len(50)
                    .slug("Slug must contain only lowercase letters, numbers, and hyphens"),
                Field::text("description").max_len(1000),
                Field::boolean("isActive").default_value(json!(true)),
            ],
            Self::Pagination => vec![
                Field::number("page")
                    .positive_default()
                    .integer()
                    .at_most(f64::from(u32::MAX))
                    .default_value(json!(1)),
                Field::number("limit")
                    .positive_default()
                    .integer()
                    .at_most(100.0)
                    .default_value(json!(10)),
            ],
        }
    }

    /// Cross-field rule run after every field passed.
    ///
    /// Returns `(path, message)` on failure.
    pub(crate) fn refine(self, data: &Map<String, Value>) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Verification => {
                let rejected = data.get("decision").and_then(Value::as_str) == Some("rejected");
                let has_reason = data
                    .get("rejectionReason")
                    .and_then(Value::as_str)
                    .is_some_and(|r| !r.trim().is_empty());
                (rejected && !has_reason)
                    .then_some(("rejectionReason", "Rejection reason is required"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("Unknown schema: {s}"))
    }
}

fn customer_fields() -> Vec<Field> {
    vec![
        Field::text("name")
            .min_len(2, "Name must be at least 2 characters")
            .max_len(100),
        Field::text("email")
            .email("Invalid email address")
            .max_len(100),
        Field::text("phone")
            .min_len(10, "Phone number must be at least 10 digits")
            .max_len(15),
    ]
}

fn booking_fields() -> Vec<Field> {
    vec![
        Field::text("brandSlug").min_len(1, "Brand is required"),
        Field::number("serviceId")
            .positive("Service is required")
            .integer(),
        Field::text("serviceVariant").optional(),
        Field::text("scheduledDate").future("Scheduled date must be in the future"),
        Field::number("duration")
            .positive("Duration must be positive")
            .integer()
            .at_most(f64::from(u32::MAX)),
        Field::text("address")
            .min_len(10, "Address must be at least 10 characters")
            .max_len(500),
        Field::text("notes").optional().max_len(1000),
    ]
}

// ═══════════════════════════════════════════════════════════════════════
// Typed outputs
// ═══════════════════════════════════════════════════════════════════════

/// A validated booking wizard submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    /// Customer name.
    pub name: String,
    /// Customer email.
    pub email: String,
    /// Customer phone number.
    pub phone: String,
    /// Brand slug.
    pub brand_slug: String,
    /// Catalog service id.
    pub service_id: u64,
    /// Pricing tier name.
    #[serde(default)]
    pub service_variant: Option<String>,
    /// When the service is scheduled.
    #[serde(deserialize_with = "deserialize_form_datetime")]
    pub scheduled_date: DateTime<Utc>,
    /// Duration in minutes.
    pub duration: u32,
    /// Service address.
    pub address: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated bank transfer claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    /// Booking the transfer settles.
    pub booking_id: u64,
    /// Bank reference number.
    pub reference_number: String,
    /// Source bank account.
    pub bank_account: String,
    /// Amount transferred.
    pub amount: f64,
}

/// Validated list query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page.
    pub page: u32,
    /// Items per page (at most 100).
    pub limit: u32,
}

fn deserialize_form_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    super::rules::parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_parse() {
        assert_eq!("booking_form".parse::<SchemaName>(), Ok(SchemaName::BookingForm));
        assert_eq!(
            "invoice".parse::<SchemaName>(),
            Err("Unknown schema: invoice".to_string())
        );
    }

    #[test]
    fn test_booking_form_is_customer_plus_booking() {
        let names: Vec<_> = SchemaName::BookingForm
            .fields()
            .iter()
            .map(|f| f.name)
            .collect();
        assert!(names.contains(&"email"));
        assert!(names.contains(&"scheduledDate"));
        assert_eq!(
            names.len(),
            SchemaName::Customer.fields().len() + SchemaName::Booking.fields().len()
        );
    }

    #[test]
    fn test_verification_refinement() {
        let mut data = Map::new();
        data.insert("decision".into(), json!("rejected"));
        data.insert("rejectionReason".into(), json!("  "));
        assert_eq!(
            SchemaName::Verification.refine(&data),
            Some(("rejectionReason", "Rejection reason is required"))
        );

        data.insert("decision".into(), json!("approved"));
        assert_eq!(SchemaName::Verification.refine(&data), None);
    }
}
