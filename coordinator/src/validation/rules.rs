//! Declarative field rules and their evaluation.

use super::ValidationErrors;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Shape a field is coerced into before its checks run.
#[derive(Debug, Clone)]
pub enum Kind {
    /// UTF-8 string.
    Text,
    /// Number. Numeric strings are coerced, as form posts carry everything as text.
    Number,
    /// Boolean. `"true"`, `"false"`, `"on"` are coerced.
    Boolean,
    /// Array of objects, each validated against the nested fields.
    List(Vec<Field>),
}

/// A single constraint on a coerced value.
#[derive(Debug, Clone)]
pub enum Check {
    /// Minimum length in characters.
    MinLen(usize, String),
    /// Maximum length in characters.
    MaxLen(usize, String),
    /// Plausible email address.
    Email(String),
    /// Date or datetime strictly after "now".
    Future(String),
    /// Number strictly greater than zero.
    Positive(String),
    /// Whole number that fits in a `u64`.
    Integer(String),
    /// Number at most the bound.
    AtMost(f64, String),
    /// Lowercase letters, digits and hyphens only.
    Slug(String),
    /// One of a fixed set of strings.
    OneOf(&'static [&'static str], String),
}

/// Rules for one field of a schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: &'static str,
    pub(crate) kind: Kind,
    pub(crate) optional: bool,
    pub(crate) default: Option<Value>,
    pub(crate) checks: Vec<Check>,
}

impl Field {
    fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            optional: false,
            default: None,
            checks: Vec::new(),
        }
    }

    /// A required string field.
    #[must_use]
    pub fn text(name: &'static str) -> Self {
        Self::new(name, Kind::Text)
    }

    /// A required numeric field.
    #[must_use]
    pub fn number(name: &'static str) -> Self {
        Self::new(name, Kind::Number)
    }

    /// A required boolean field.
    #[must_use]
    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, Kind::Boolean)
    }

    /// A required array of nested objects.
    #[must_use]
    pub fn list(name: &'static str, item_fields: Vec<Self>) -> Self {
        Self::new(name, Kind::List(item_fields))
    }

    /// Allow the field to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is absent.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }

    /// Minimum length, with a custom message.
    #[must_use]
    pub fn min_len(mut self, n: usize, message: &str) -> Self {
        self.checks.push(Check::MinLen(n, message.to_string()));
        self
    }

    /// Maximum length, with the default message.
    #[must_use]
    pub fn max_len(mut self, n: usize) -> Self {
        self.checks.push(Check::MaxLen(
            n,
            format!("String must contain at most {n} character(s)"),
        ));
        self
    }

    /// Email shape.
    #[must_use]
    pub fn email(mut self, message: &str) -> Self {
        self.checks.push(Check::Email(message.to_string()));
        self
    }

    /// Strictly in the future.
    #[must_use]
    pub fn future(mut self, message: &str) -> Self {
        self.checks.push(Check::Future(message.to_string()));
        self
    }

    /// Strictly positive, with a custom message.
    #[must_use]
    pub fn positive(mut self, message: &str) -> Self {
        self.checks.push(Check::Positive(message.to_string()));
        self
    }

    /// Strictly positive, with the default message.
    #[must_use]
    pub fn positive_default(self) -> Self {
        self.positive("Number must be greater than 0")
    }

    /// Whole number only. Combine with [`Field::at_most`] for narrower integer types.
    #[must_use]
    pub fn integer(mut self) -> Self {
        self.checks
            .push(Check::Integer("Expected integer, received float".to_string()));
        self
    }

    /// Upper bound, with the default message.
    #[must_use]
    pub fn at_most(mut self, n: f64) -> Self {
        self.checks.push(Check::AtMost(
            n,
            format!("Number must be less than or equal to {n}"),
        ));
        self
    }

    /// Slug characters only.
    #[must_use]
    pub fn slug(mut self, message: &str) -> Self {
        self.checks.push(Check::Slug(message.to_string()));
        self
    }

    /// Fixed vocabulary.
    #[must_use]
    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        let expected = values
            .iter()
            .map(|v| format!("'{v}'"))
            .collect::<Vec<_>>()
            .join(" | ");
        self.checks.push(Check::OneOf(
            values,
            format!("Invalid enum value. Expected {expected}"),
        ));
        self
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Evaluate `fields` against `input`, collecting every failure.
///
/// Returns the normalized object: declared fields only, coerced, defaults
/// filled in. Unknown keys are dropped.
pub(crate) fn evaluate(
    fields: &[Field],
    input: &Map<String, Value>,
    prefix: &str,
    now: DateTime<Utc>,
    errors: &mut ValidationErrors,
) -> Map<String, Value> {
    let mut output = Map::new();

    for field in fields {
        let path = join_path(prefix, field.name);
        let raw = input.get(field.name).filter(|v| !v.is_null());

        let Some(raw) = raw else {
            if let Some(default) = &field.default {
                output.insert(field.name.to_string(), default.clone());
            } else if !field.optional {
                errors.insert(&path, "Required");
            }
            continue;
        };

        if let Some(value) = coerce(field, raw, &path, now, errors) {
            if let Some(message) = first_failure(&field.checks, &value, now) {
                errors.insert(&path, message);
            } else {
                output.insert(field.name.to_string(), value);
            }
        }
    }

    output
}

fn coerce(
    field: &Field,
    raw: &Value,
    path: &str,
    now: DateTime<Utc>,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    match (&field.kind, raw) {
        (Kind::Text, Value::String(_)) => Some(raw.clone()),
        (Kind::Text, _) => {
            errors.insert(path, "Expected string");
            None
        }
        (Kind::Number, Value::Number(_)) => Some(raw.clone()),
        (Kind::Number, Value::String(s)) => {
            let parsed = parse_number(s.trim());
            if parsed.is_none() {
                errors.insert(path, "Expected number");
            }
            parsed
        }
        (Kind::Number, _) => {
            errors.insert(path, "Expected number");
            None
        }
        (Kind::Boolean, Value::Bool(_)) => Some(raw.clone()),
        (Kind::Boolean, Value::String(s)) => match s.as_str() {
            "true" | "on" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => {
                errors.insert(path, "Expected boolean");
                None
            }
        },
        (Kind::Boolean, _) => {
            errors.insert(path, "Expected boolean");
            None
        }
        (Kind::List(item_fields), Value::Array(items)) => {
            let before = errors.len();
            let mut normalized = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{path}.{index}");
                match item {
                    Value::Object(obj) => {
                        normalized.push(Value::Object(evaluate(
                            item_fields,
                            obj,
                            &item_path,
                            now,
                            errors,
                        )));
                    }
                    _ => errors.insert(&item_path, "Expected object"),
                }
            }
            (errors.len() == before).then_some(Value::Array(normalized))
        }
        (Kind::List(_), _) => {
            errors.insert(path, "Expected array");
            None
        }
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn first_failure<'a>(checks: &'a [Check], value: &Value, now: DateTime<Utc>) -> Option<&'a str> {
    checks.iter().find_map(|check| {
        let ok = match check {
            Check::MinLen(n, _) => value.as_str().is_some_and(|s| s.chars().count() >= *n),
            Check::MaxLen(n, _) => value.as_str().is_some_and(|s| s.chars().count() <= *n),
            Check::Email(_) => value.as_str().is_some_and(is_valid_email),
            Check::Future(_) => value
                .as_str()
                .and_then(parse_datetime)
                .is_some_and(|at| at > now),
            Check::Positive(_) => value.as_f64().is_some_and(|n| n > 0.0),
            Check::Integer(_) => value.is_u64(),
            Check::AtMost(bound, _) => value.as_f64().is_some_and(|n| n <= *bound),
            Check::Slug(_) => value.as_str().is_some_and(|s| {
                s.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            }),
            Check::OneOf(values, _) => value.as_str().is_some_and(|s| values.contains(&s)),
        };
        if ok {
            None
        } else {
            Some(match check {
                Check::MinLen(_, m)
                | Check::MaxLen(_, m)
                | Check::Email(m)
                | Check::Future(m)
                | Check::Positive(m)
                | Check::Integer(m)
                | Check::AtMost(_, m)
                | Check::Slug(m)
                | Check::OneOf(_, m) => m.as_str(),
            })
        }
    })
}

/// Parse the date formats a booking form can post.
///
/// Accepts RFC 3339, `datetime-local` input (`YYYY-MM-DDTHH:MM[:SS]`, read as
/// UTC) and a bare `YYYY-MM-DD` (midnight UTC).
#[must_use]
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Validate email address format.
///
/// Basic shape check:
/// - Exactly one `@` with non-empty local and domain parts
/// - Domain contains a dot and no empty labels
/// - Length between 3 and 255 characters
///
/// # Examples
///
/// ```
/// use booking_coordinator::validation::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    let valid_local_chars =
        |c: char| c.is_alphanumeric() || c == '.' || c == '-' || c == '+' || c == '_';
    let valid_domain_chars = |c: char| c.is_alphanumeric() || c == '.' || c == '-';

    if !local.chars().all(valid_local_chars) || !domain.chars().all(valid_domain_chars) {
        return false;
    }

    domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn run(fields: &[Field], input: Value) -> (Map<String, Value>, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        let obj = input.as_object().cloned().unwrap_or_default();
        let out = evaluate(fields, &obj, "", now(), &mut errors);
        (out, errors)
    }

    #[test]
    fn test_collects_every_failure_at_once() {
        let fields = vec![
            Field::text("name").min_len(2, "Name must be at least 2 characters"),
            Field::text("email").email("Invalid email address"),
            Field::number("duration").positive("Duration must be positive"),
        ];
        let (_, errors) = run(&fields, json!({"name": "A", "email": "nope", "duration": 0}));

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(errors.get("email"), Some("Invalid email address"));
        assert_eq!(errors.get("duration"), Some("Duration must be positive"));
    }

    #[test]
    fn test_numeric_strings_are_coerced_to_integers() {
        let fields = vec![Field::number("serviceId").positive_default()];
        let (out, errors) = run(&fields, json!({"serviceId": "12"}));
        assert!(errors.is_empty());
        assert_eq!(out["serviceId"], json!(12));
    }

    #[test]
    fn test_integer_rejects_fractions_and_overflow() {
        let fields = vec![
            Field::number("serviceId").positive_default().integer(),
            Field::number("duration")
                .positive_default()
                .integer()
                .at_most(f64::from(u32::MAX)),
        ];

        let (out, errors) = run(&fields, json!({"serviceId": "3", "duration": 90}));
        assert!(errors.is_empty());
        assert_eq!(out["duration"], json!(90));

        let (_, errors) = run(&fields, json!({"serviceId": "1.5", "duration": "90.5"}));
        assert_eq!(errors.get("serviceId"), Some("Expected integer, received float"));
        assert_eq!(errors.get("duration"), Some("Expected integer, received float"));

        let (_, errors) = run(
            &fields,
            json!({"serviceId": "1e20", "duration": "5000000000"}),
        );
        assert_eq!(errors.get("serviceId"), Some("Expected integer, received float"));
        assert_eq!(
            errors.get("duration"),
            Some("Number must be less than or equal to 4294967295")
        );

        let (_, errors) = run(&fields, json!({"serviceId": -4}));
        assert_eq!(errors.get("serviceId"), Some("Number must be greater than 0"));
    }

    #[test]
    fn test_missing_required_and_defaults() {
        let fields = vec![
            Field::text("address"),
            Field::boolean("isActive").default_value(json!(true)),
            Field::text("notes").optional(),
        ];
        let (out, errors) = run(&fields, json!({"extra": 1}));
        assert_eq!(errors.get("address"), Some("Required"));
        assert_eq!(out.get("isActive"), Some(&json!(true)));
        assert!(!out.contains_key("notes"));
        assert!(!out.contains_key("extra"));
    }

    #[test]
    fn test_nested_list_paths() {
        let fields = vec![Field::list(
            "variants",
            vec![Field::number("price").positive_default()],
        )];
        let (_, errors) = run(&fields, json!({"variants": [{"price": 5}, {"price": -1}]}));
        assert_eq!(errors.get("variants.1.price"), Some("Number must be greater than 0"));
    }

    #[test]
    fn test_future_date_is_strict() {
        let fields = vec![Field::text("scheduledDate").future("Scheduled date must be in the future")];

        let exactly_now = now().to_rfc3339();
        let (_, errors) = run(&fields, json!({ "scheduledDate": exactly_now }));
        assert!(errors.get("scheduledDate").is_some());

        let tomorrow = (now() + Duration::days(1)).format("%Y-%m-%dT%H:%M").to_string();
        let (_, errors) = run(&fields, json!({ "scheduledDate": tomorrow }));
        assert!(errors.is_empty());

        let (_, errors) = run(&fields, json!({"scheduledDate": "not a date"}));
        assert_eq!(errors.get("scheduledDate"), Some("Scheduled date must be in the future"));
    }

    #[test]
    fn test_one_of_message() {
        let fields = vec![Field::text("decision").one_of(&["approved", "rejected"])];
        let (_, errors) = run(&fields, json!({"decision": "maybe"}));
        assert_eq!(
            errors.get("decision"),
            Some("Invalid enum value. Expected 'approved' | 'rejected'")
        );
    }

    #[test]
    fn test_valid_and_invalid_emails() {
        assert!(is_valid_email("user.name@example.co.uk"));
        assert!(is_valid_email("a@b.c"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email(""));
    }
}
