//! Positional argument validation.
//!
//! Invocations carry untyped string arguments. Each operation declares its
//! arity and the name of every positional field; validation happens before
//! any ledger access so a rejected invocation never writes.

use crate::error::{ContractError, ContractResult};

/// How many arguments an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// At least this many; extras are ignored.
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }

    fn expected(self) -> usize {
        match self {
            Self::Exact(n) | Self::AtLeast(n) => n,
        }
    }
}

/// Checks the argument count against `arity`.
pub(crate) fn check_arity(args: &[String], arity: Arity) -> ContractResult<()> {
    if arity.accepts(args.len()) {
        return Ok(());
    }
    Err(ContractError::invalid_argument(format!(
        "Incorrect number of arguments. Expecting {}",
        arity.expected()
    )))
}

/// Checks that a required argument is non-empty.
///
/// `position` is zero-based; messages use ordinals ("1st argument ...").
pub(crate) fn require_non_empty<'a>(
    value: &'a str,
    position: usize,
    field: &str,
) -> ContractResult<&'a str> {
    if value.is_empty() {
        return Err(ContractError::invalid_argument(format!(
            "{} argument ({field}) must be a non-empty string",
            ordinal(position + 1)
        )));
    }
    Ok(value)
}

/// Validates arity and non-emptiness for every named field, returning the
/// arguments in field order.
pub(crate) fn positional<'a, const N: usize>(
    args: &'a [String],
    arity: Arity,
    fields: [&str; N],
) -> ContractResult<[&'a str; N]> {
    check_arity(args, arity)?;

    let mut values = [""; N];
    for (position, (slot, field)) in values.iter_mut().zip(fields).enumerate() {
        let raw = args.get(position).map_or("", String::as_str);
        *slot = require_non_empty(raw, position, field)?;
    }
    Ok(values)
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
