//! Request body validation.
//!
//! [`ValidatedJson`] reads the raw body and runs it through three gates before
//! the handler sees anything:
//!
//! 1. Parse as JSON. Failure is a generic `400 Invalid request body`.
//! 2. Check the declared fields ([`RequestSchema::FIELDS`]) for presence and
//!    JSON type.
//! 3. Deserialize into the typed request and run its `validator` rules
//!    (lengths, formats, cross-field rules).
//!
//! Gates 2 and 3 report every failing field at once as `400 Validation failed`.
//! A field that fails gate 2 is swapped for a neutral placeholder of the
//! declared kind so gate 3 still runs over the remaining fields; rule failures
//! on the swapped field itself are dropped.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::{AppError, FieldViolation};

/// Key `validator` files struct-level (`schema`) errors under.
const STRUCT_LEVEL: &str = "__all__";

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    /// Stand-in value of this kind, used only to let rule checks run.
    fn placeholder(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Number | Self::Integer => Value::from(0),
            Self::Boolean => Value::Bool(false),
            Self::Object => Value::Object(serde_json::Map::new()),
            Self::Array => Value::Array(Vec::new()),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Integer => "an integer",
            Self::Boolean => "a boolean",
            Self::Object => "an object",
            Self::Array => "an array",
        }
    }
}

/// Declared shape of one top-level body field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// A request body with a declared schema.
///
/// `FIELDS` covers presence and JSON types; everything else (lengths, formats,
/// "at least one of" rules) comes from the type's `Validate` derive.
pub trait RequestSchema: DeserializeOwned + Validate {
    const FIELDS: &'static [FieldSpec];
}

/// Extractor yielding a body that passed every validation gate.
///
/// # Example
///
/// ```rust,ignore
/// async fn create(ValidatedJson(body): ValidatedJson<CreateReceipt>) -> Result<Json<Receipt>> {
///     // `body` is typed and already validated
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: RequestSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::InvalidBody)?;

        validate_body(&body).map(Self)
    }
}

/// Run a raw body through every validation gate.
///
/// # Errors
///
/// Returns `AppError::InvalidBody` if the body is not JSON, and
/// `AppError::Validation` listing every failing field otherwise.
pub fn validate_body<T: RequestSchema>(body: &[u8]) -> Result<T, AppError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| AppError::InvalidBody)?;

    let Value::Object(mut fields) = value else {
        return Err(AppError::Validation(vec![FieldViolation::new(
            "body",
            "type",
            "body must be a JSON object",
        )]));
    };

    let mut violations = Vec::new();
    for spec in T::FIELDS {
        if let Some(violation) = check_field(spec, fields.get(spec.name)) {
            fields.insert(spec.name.to_owned(), spec.kind.placeholder());
            violations.push(violation);
        }
    }
    let shape_failed = !violations.is_empty();

    let typed: T = match serde_json::from_value(Value::Object(fields)) {
        Ok(typed) => typed,
        Err(_) if shape_failed => return Err(AppError::Validation(sorted(violations))),
        Err(e) => {
            return Err(AppError::Validation(vec![FieldViolation::new(
                "body",
                "type",
                e.to_string(),
            )]));
        }
    };

    if let Err(errors) = typed.validate() {
        let rule_violations: Vec<FieldViolation> = violations_from(&errors)
            .into_iter()
            .filter(|rule| !violations.iter().any(|shape| shape.field == rule.field))
            .collect();
        violations.extend(rule_violations);
    }

    if !violations.is_empty() {
        return Err(AppError::Validation(sorted(violations)));
    }

    Ok(typed)
}

fn check_field(spec: &FieldSpec, value: Option<&Value>) -> Option<FieldViolation> {
    match value {
        None | Some(Value::Null) if spec.required => Some(FieldViolation::new(
            spec.name,
            "required",
            format!("{} is required", spec.name),
        )),
        None | Some(Value::Null) => None,
        Some(value) if !spec.kind.matches(value) => Some(FieldViolation::new(
            spec.name,
            "type",
            format!("{} must be {}", spec.name, spec.kind.describe()),
        )),
        Some(_) => None,
    }
}

/// Flatten `validator` errors into one violation per field and rule.
///
/// Struct-level errors name their fields in a `fields` parameter (see
/// [`at_least_one_of`]) and are reported against each of them.
fn violations_from(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    for (field, kind) in errors.errors() {
        let field = field.to_string();
        let ValidationErrorsKind::Field(field_errors) = kind else {
            continue;
        };

        for error in field_errors {
            let code = error.code.to_string();
            let message = error.message.as_ref().map_or_else(
                || format!("{field} failed the {code} rule"),
                ToString::to_string,
            );

            if field == STRUCT_LEVEL {
                let named = error
                    .params
                    .get("fields")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str);
                for name in named {
                    violations.push(FieldViolation::new(name, &code, &message));
                }
            } else {
                violations.push(FieldViolation::new(&field, code, message));
            }
        }
    }

    violations
}

fn sorted(mut violations: Vec<FieldViolation>) -> Vec<FieldViolation> {
    violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    violations
}

/// Struct-level error for an "at least one of these fields" rule.
#[must_use]
pub fn at_least_one_of(fields: &[&'static str]) -> ValidationError {
    let mut error = ValidationError::new("one_of");
    error.message = Some(format!("at least one of {} is required", fields.join(", ")).into());
    error.add_param("fields".into(), &fields);
    error
}
