// src/cases.rs
//! Case-enumeration detection.
//!
//! Two ways in: a serde enum whose variants all turn out to be unit variants,
//! or an explicit `CaseEnumerable` implementation listing canonical values.

use std::any::type_name;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::probe::Payload;
use crate::shape::{CaseSet, Primitive};

/// A type with a finite, statically known set of canonical values.
pub trait CaseEnumerable: Serialize + Sized {
    fn all_cases() -> Vec<Self>;
}

/// Ordered labels of `T`'s cases, taken from their serialized form.
pub fn case_labels<T: CaseEnumerable>() -> Result<CaseSet> {
    Ok(enumerate::<T>()?.0)
}

/// Labels plus the first case's value, which stands in as a placeholder
/// whenever the type is decoded.
pub(crate) fn enumerate<T: CaseEnumerable>() -> Result<(CaseSet, Option<Value>)> {
    let fail = |source| Error::CaseLabels { type_name: type_name::<T>(), source };

    let values = T::all_cases()
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(fail)?;

    if let Some(bad) = values.iter().find(|v| v.is_object() || v.is_array()) {
        let msg = format!("case serialized as a compound value: {bad}");
        return Err(fail(<serde_json::Error as serde::ser::Error>::custom(msg)));
    }

    let labels = values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let cases = CaseSet { kind: label_kind(&values), labels };
    Ok((cases, values.into_iter().next()))
}

// mixed representations fall back to string
fn label_kind(values: &[Value]) -> Primitive {
    if values.is_empty() || values.iter().all(Value::is_string) {
        Primitive::String
    } else if values.iter().all(Value::is_boolean) {
        Primitive::Bool
    } else if values.iter().all(|v| v.is_i64() || v.is_u64()) {
        Primitive::Int64
    } else if values.iter().all(Value::is_number) {
        Primitive::Double
    } else {
        Primitive::String
    }
}

/// Case-enumerable when every variant has been explored and none of them
/// carries a payload.
pub(crate) fn detect(variants: &[&'static str], payloads: &[Option<Payload>]) -> Option<CaseSet> {
    let all_unit = !variants.is_empty() && payloads.iter().all(|p| matches!(p, Some(Payload::Unit)));
    all_unit.then(|| CaseSet::strings(variants.iter().copied()))
}

// ------------------------------- Tests ------------------------------------ //
