//! Schema validation for user-submitted data.
//!
//! Every rule of a schema is evaluated as a batch. On failure the caller gets
//! a map from field path (`variants.0.price`) to a human-readable message, so
//! all problems can be shown at once.
//!
//! # Example
//!
//! ```
//! use booking_coordinator::clock::SystemClock;
//! use booking_coordinator::validation::Validator;
//! use std::sync::Arc;
//!
//! let validator = Validator::new(Arc::new(SystemClock));
//! let errors = validator
//!     .validate("customer", &serde_json::json!({"name": "A"}))
//!     .unwrap_err();
//!
//! assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
//! assert_eq!(errors.get("email"), Some("Required"));
//! ```

mod rules;
mod schemas;

pub use rules::{Check, Field, Kind, is_valid_email, parse_datetime};
pub use schemas::{BookingForm, Pagination, PaymentProof, SchemaName};

use crate::clock::Clock;
use crate::error::{BookingError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Field path → message for every rule that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Empty error set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Error set with a single entry.
    #[must_use]
    pub fn single(path: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.insert(path, message);
        errors
    }

    /// Record a failure. The first message per path wins.
    pub fn insert(&mut self, path: &str, message: &str) {
        self.0
            .entry(path.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Message recorded for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Whether nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate `(path, message)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume into the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{path}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Stateless schema validator.
///
/// Holds a clock only for "scheduled date is in the future" checks.
#[derive(Clone)]
pub struct Validator {
    clock: Arc<dyn Clock>,
}

impl Validator {
    /// Create a validator reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Validate `raw` against the schema called `schema_name`.
    ///
    /// Returns the normalized object (declared fields only, coerced, with
    /// defaults).
    ///
    /// # Errors
    ///
    /// Returns every failing field. Unknown schemas and non-object input are
    /// reported under `general`.
    pub fn validate(
        &self,
        schema_name: &str,
        raw: &Value,
    ) -> std::result::Result<Map<String, Value>, ValidationErrors> {
        let schema = schema_name
            .parse::<SchemaName>()
            .map_err(|message| ValidationErrors::single("general", &message))?;
        self.validate_schema(schema, raw)
    }

    /// Validate `raw` against a known schema.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate_schema(
        &self,
        schema: SchemaName,
        raw: &Value,
    ) -> std::result::Result<Map<String, Value>, ValidationErrors> {
        let Value::Object(input) = raw else {
            return Err(ValidationErrors::single("general", "Expected an object"));
        };

        let mut errors = ValidationErrors::new();
        let data = rules::evaluate(&schema.fields(), input, "", self.clock.now(), &mut errors);

        if errors.is_empty() {
            if let Some((path, message)) = schema.refine(&data) {
                errors.insert(path, message);
            }
        }

        if errors.is_empty() {
            Ok(data)
        } else {
            tracing::debug!(
                schema = %schema,
                failures = errors.len(),
                "Validation failed"
            );
            Err(errors)
        }
    }

    /// Validate and deserialize into a typed value.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ValidationFailed`] when any rule fails.
    /// - [`BookingError::Serialization`] when the normalized data does not fit `T`.
    pub fn parse<T: DeserializeOwned>(&self, schema: SchemaName, raw: &Value) -> Result<T> {
        let data = self
            .validate_schema(schema, raw)
            .map_err(BookingError::ValidationFailed)?;
        serde_json::from_value(Value::Object(data))
            .map_err(|e| BookingError::Serialization(e.to_string()))
    }
}
