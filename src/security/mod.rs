//! Identifier validation for generated SQL.

pub mod validator;

pub use validator::{
    IdentifierValidator, MAX_IDENTIFIER_LENGTH, SYSTEM_DATABASES, is_system_database,
    quote_identifier,
};
