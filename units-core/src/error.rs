#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::unit::Unit;

#[derive(Debug, Error, Diagnostic)]
#[error("configuration error: {message}")]
#[diagnostic(code(units::config))]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
#[error("cannot divide {dividend} by {divisor}")]
#[diagnostic(
    code(units::arithmetic),
    help("the divisor is uninhabited (UnitsBottom); only null-like values carry that unit")
)]
pub struct ArithmeticUnitError {
    pub dividend: Unit,
    pub divisor: Unit,
}
