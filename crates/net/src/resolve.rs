//! Defensive field extraction shared by every decoder.
//!
//! A logical field is described by a [`FieldAliases`] chain: data-field names
//! tried in order, then accessor names tried in order. The first candidate
//! that yields a usable value under the requested interpretation wins, and a
//! failing accessor counts as absent.

use crate::value::{MessageSource, WireValue};
use tracing::trace;

/// Ordered candidate names for one logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    /// Data-field names, highest priority first.
    pub fields: &'static [&'static str],
    /// Accessor names, tried after every data field.
    pub accessors: &'static [&'static str],
}

impl FieldAliases {
    /// Build an alias chain.
    pub const fn new(fields: &'static [&'static str], accessors: &'static [&'static str]) -> Self {
        Self { fields, accessors }
    }
}

/// Interpret a value as a finite number.
///
/// Strings are trimmed and parsed; empty or non-finite results are absent.
pub fn resolve_number(value: &WireValue) -> Option<f64> {
    match value {
        WireValue::Number(n) if n.is_finite() => Some(*n),
        WireValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Interpret a value as non-empty trimmed text.
pub fn resolve_text(value: &WireValue) -> Option<&str> {
    match value {
        WireValue::Text(s) => Some(s.trim()).filter(|t| !t.is_empty()),
        _ => None,
    }
}

/// Invoke an accessor if one is callable, treating failure as absence.
pub fn resolve_accessor<S>(source: &S, name: &str) -> Option<WireValue>
where
    S: MessageSource + ?Sized,
{
    match source.call(name)? {
        Ok(WireValue::Null) => None,
        Ok(value) => Some(value),
        Err(err) => {
            trace!("ignoring failed accessor: {err}");
            None
        }
    }
}

/// Walk an alias chain, returning the first candidate `interpret` accepts.
pub fn resolve_field_with<S, T, F>(source: &S, aliases: &FieldAliases, interpret: F) -> Option<T>
where
    S: MessageSource + ?Sized,
    F: Fn(&WireValue) -> Option<T>,
{
    aliases
        .fields
        .iter()
        .filter_map(|name| source.field(name))
        .find_map(&interpret)
        .or_else(|| {
            aliases
                .accessors
                .iter()
                .filter_map(|name| resolve_accessor(source, name))
                .find_map(|value| interpret(&value))
        })
}

/// Numeric field resolution over an alias chain.
pub fn resolve_numeric_field<S>(source: &S, aliases: &FieldAliases) -> Option<f64>
where
    S: MessageSource + ?Sized,
{
    resolve_field_with(source, aliases, resolve_number)
}

/// Text field resolution over an alias chain.
pub fn resolve_text_field<S>(source: &S, aliases: &FieldAliases) -> Option<String>
where
    S: MessageSource + ?Sized,
{
    resolve_field_with(source, aliases, |value| resolve_text(value).map(str::to_owned))
}

/// First candidate present at all, regardless of its shape.
pub fn resolve_raw_field<S>(source: &S, aliases: &FieldAliases) -> Option<WireValue>
where
    S: MessageSource + ?Sized,
{
    resolve_field_with(source, aliases, |value| match value {
        WireValue::Null => None,
        other => Some(other.clone()),
    })
}

/// Truncate toward zero and require a non-negative result that fits `u32`.
///
/// Fractional counts from lax peers are accepted: `9.8` becomes `9`. The sign
/// is checked before truncating, so `-0.5` is rejected rather than read as `0`.
pub fn truncate_to_u32(value: f64) -> Option<u32> {
    if value < 0.0 {
        return None;
    }
    let whole = value.trunc();
    if whole > f64::from(u32::MAX) {
        return None;
    }
    Some(whole as u32)
}

/// Require an exact slot index in `[0, max_slots)`; fractions are rejected.
pub fn slot_index(value: f64, max_slots: usize) -> Option<usize> {
    let whole = exact_integer(value, u32::MAX)? as usize;
    (whole < max_slots).then_some(whole)
}

/// Require an exact integer in `[0, max]`; fractions are rejected.
pub fn exact_integer(value: f64, max: u32) -> Option<u32> {
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(max) {
        return None;
    }
    Some(value as u32)
}
