//! Contract engine for mocking and validating HTTP exchanges against a
//! normalized OpenAPI operation model.
//!
//! A request flows through [`router`] → [`validator`] → [`negotiator`] →
//! [`mocker`], with [`engine::ContractEngine`] wiring the stages together.
//! Every stage is also usable on its own.

pub mod cache;
pub mod codec;
pub mod converter;
pub mod engine;
pub mod error;
pub mod media_type;
pub mod mocker;
pub mod negotiator;
pub mod router;
pub mod schema;
pub mod security;
pub mod types;
pub mod validator;

pub use engine::{ContractEngine, EngineBuilder, MockOutcome};
pub use types::{Diagnostic, HttpRequest, HttpResponse, Operation, Severity};

const PATH_SEPARATOR: &str = "/";
const TILDE: &str = "~";
const ENCODED_BACKSLASH: &str = "~1";
const ENCODED_TILDE: &str = "~0";
const TYPE_FIELD: &str = "type";
const ITEMS_FIELD: &str = "items";
const PROPERTIES_FIELD: &str = "properties";
const JSON_MEDIA_TYPE: &str = "application/json";
/// Query parameters starting with this prefix steer the mocker and are never validated.
const RESERVED_QUERY_PREFIX: &str = "__";
