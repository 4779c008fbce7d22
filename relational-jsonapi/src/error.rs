//! Errors raised while validating, parsing, planning and rendering.
//!
//! Every failure is eventually converted into a JSON:API `errors` document by the
//! [formatter](format). The variants of [`Error`] determine the HTTP status code and the `source`
//! member of the resulting error objects.

use derive_more::From;
use indexmap::IndexMap;
use itertools::Itertools;
use snafu::Snafu;
use std::fmt::{self, Display, Formatter};

pub mod format;

/// The key under which errors that do not belong to a single field are collected.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Errors encountered while handling a JSON:API request.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A query parameter is unknown, malformed, or repeated.
    #[snafu(display("{detail}"))]
    InvalidQuery { detail: String, parameter: String },

    /// A `filter[...]` parameter names an unknown field or operator, or has no value.
    #[snafu(display("{detail}"))]
    InvalidFilter { detail: String, parameter: String },

    /// The `sort` parameter names fields which are not sortable.
    #[snafu(display("{detail}"))]
    InvalidSort { detail: String },

    /// The `include` parameter names a path which cannot be included.
    #[snafu(display("{detail}"))]
    InvalidInclude { detail: String },

    /// The request body is not a well-formed JSON:API document.
    #[snafu(display("{detail}"))]
    Parse { detail: String },

    /// The type or id of a resource in the request body conflicts with the endpoint.
    #[snafu(display("{detail}"))]
    Conflict { detail: String },

    #[snafu(display("Method \"{method}\" not allowed."))]
    MethodNotAllowed { method: String },

    #[snafu(display("{detail}"))]
    NotFound { detail: String },

    /// The request body failed field-level validation.
    #[snafu(display("{errors}"))]
    Validation { errors: ValidationErrors },

    /// The resource declarations are inconsistent with the request being served.
    #[snafu(display("improperly configured: {detail}"))]
    Configuration { detail: String },

    /// An unexpected failure in the data layer or in a resource hook.
    #[snafu(display("{detail}"))]
    Server { detail: String },
}

impl Error {
    /// An invalid query parameter error naming the raw parameter.
    pub fn query(detail: impl Display, parameter: impl Into<String>) -> Self {
        Self::InvalidQuery {
            detail: detail.to_string(),
            parameter: parameter.into(),
        }
    }

    /// An invalid filter error naming the raw parameter.
    pub fn filter(detail: impl Display, parameter: impl Into<String>) -> Self {
        Self::InvalidFilter {
            detail: detail.to_string(),
            parameter: parameter.into(),
        }
    }

    pub fn parse(detail: impl Display) -> Self {
        Self::Parse {
            detail: detail.to_string(),
        }
    }

    pub fn conflict(detail: impl Display) -> Self {
        Self::Conflict {
            detail: detail.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound {
            detail: "Not found.".into(),
        }
    }

    pub fn configuration(detail: impl Display) -> Self {
        Self::Configuration {
            detail: detail.to_string(),
        }
    }

    /// An error in the data layer.
    pub fn server(error: impl Display) -> Self {
        Self::Server {
            detail: error.to_string(),
        }
    }

    /// The HTTP status code of a response carrying this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidQuery { .. }
            | Self::InvalidFilter { .. }
            | Self::InvalidSort { .. }
            | Self::InvalidInclude { .. }
            | Self::Parse { .. }
            | Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::Conflict { .. } => 409,
            Self::Configuration { .. } | Self::Server { .. } => 500,
        }
    }

    /// A stable, machine-readable code for this kind of error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery { .. }
            | Self::InvalidFilter { .. }
            | Self::InvalidSort { .. }
            | Self::Validation { .. } => "invalid",
            Self::InvalidInclude { .. } | Self::Parse { .. } => "parse_error",
            Self::Conflict { .. } => "conflict",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::NotFound { .. } => "not_found",
            Self::Configuration { .. } | Self::Server { .. } => "error",
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation { errors }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// A failure with the generic `invalid` code.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new("invalid", message)
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A tree of validation failures mirroring the shape of the validated input.
///
/// Object keys are declared field names, or [`NON_FIELD_ERRORS`] for failures that concern the
/// input as a whole.
#[derive(Clone, Debug, PartialEq, Eq, From)]
pub enum ValidationErrors {
    Messages(Vec<FieldError>),
    Object(IndexMap<String, ValidationErrors>),
    List(Vec<ValidationErrors>),
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self::Object(IndexMap::new())
    }
}

impl ValidationErrors {
    /// An error tree with a single failure on `field`.
    pub fn field(field: impl Into<String>, error: FieldError) -> Self {
        let mut errors = Self::default();
        errors.add(field, error);
        errors
    }

    /// An error tree with a single failure which concerns no particular field.
    pub fn non_field(error: FieldError) -> Self {
        Self::field(NON_FIELD_ERRORS, error)
    }

    /// Record a failure on `field`.
    ///
    /// If this tree is not an object, it is first converted to one, keeping existing messages as
    /// non-field errors.
    pub fn add(&mut self, field: impl Into<String>, error: FieldError) {
        let map = self.as_object_mut();
        match map
            .entry(field.into())
            .or_insert_with(|| Self::Messages(vec![]))
        {
            Self::Messages(messages) => messages.push(error),
            other => {
                // A nested tree already exists for this field; attach the message at its root.
                other.add(NON_FIELD_ERRORS, error);
            }
        }
    }

    /// Record a nested tree of failures under `field`.
    pub fn nest(&mut self, field: impl Into<String>, errors: ValidationErrors) {
        if !errors.is_empty() {
            self.as_object_mut().insert(field.into(), errors);
        }
    }

    fn as_object_mut(&mut self) -> &mut IndexMap<String, ValidationErrors> {
        if !matches!(self, Self::Object(_)) {
            let previous = std::mem::take(self);
            if !previous.is_empty() {
                self.as_object_mut()
                    .insert(NON_FIELD_ERRORS.into(), previous);
            }
        }
        match self {
            Self::Object(map) => map,
            _ => unreachable!(),
        }
    }

    /// Whether this tree contains no failures at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of individual failures in this tree.
    pub fn len(&self) -> usize {
        match self {
            Self::Messages(messages) => messages.len(),
            Self::Object(map) => map.values().map(Self::len).sum(),
            Self::List(items) => items.iter().map(Self::len).sum(),
        }
    }

    /// Convert into a `Result`, failing if any failures were recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Messages(messages) => write!(f, "{}", messages.iter().join(" ")),
            Self::Object(map) => write!(
                f,
                "{}",
                map.iter()
                    .filter(|(_, errors)| !errors.is_empty())
                    .map(|(field, errors)| format!("{field}: {errors}"))
                    .join("; ")
            ),
            Self::List(items) => write!(
                f,
                "{}",
                items
                    .iter()
                    .enumerate()
                    .filter(|(_, errors)| !errors.is_empty())
                    .map(|(i, errors)| format!("[{i}] {errors}"))
                    .join("; ")
            ),
        }
    }
}
