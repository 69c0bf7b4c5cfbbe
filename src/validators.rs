//! Structural checks on request parameters.
//!
//! Bulk parameters are capped at [`MAX_BULK_ELEMENTS`] items. All checks here
//! run before anything is sent to the gateway, so an invalid batch never
//! causes partial work.

use crate::error::GatewayError;
use serde_json::{Map, Value};

pub const MAX_BULK_ELEMENTS: usize = 20;

/// Validates `input` as an array of 1..=`max_size` strings named `field`.
pub fn validate_bulk(
    input: Option<&Value>,
    field: &str,
    max_size: usize,
) -> Result<Vec<String>, GatewayError> {
    validate_bulk_with(input, field, max_size, || {
        format!("{} parameter must not exceed {} elements", field, max_size)
    })
}

fn validate_bulk_with(
    input: Option<&Value>,
    field: &str,
    max_size: usize,
    oversize_message: impl FnOnce() -> String,
) -> Result<Vec<String>, GatewayError> {
    let elements = match input {
        Some(Value::Array(elements)) => elements,
        _ => {
            return Err(GatewayError::validation(format!(
                "{} parameter must be an array",
                field
            )))
        }
    };
    if elements.len() > max_size {
        return Err(GatewayError::validation(oversize_message()));
    }
    if elements.is_empty() {
        return Err(GatewayError::validation(format!(
            "{} parameter must not be empty",
            field
        )));
    }
    elements
        .iter()
        .map(|element| match element {
            Value::String(s) => Ok(s.clone()),
            _ => Err(GatewayError::validation(format!(
                "{} parameter must contain only strings",
                field
            ))),
        })
        .collect()
}

/// A bulk parameter with its name and element cap.
pub trait BulkParamLimiter {
    /// Name of the parameter to mention in the error.
    const PARAM_NAME: &'static str;
    const LIMIT: usize = MAX_BULK_ELEMENTS;

    fn oversize_message() -> String {
        format!(
            "{} parameter must not exceed {} elements",
            Self::PARAM_NAME,
            Self::LIMIT
        )
    }

    fn validate(input: Option<&Value>) -> Result<Vec<String>, GatewayError> {
        validate_bulk_with(input, Self::PARAM_NAME, Self::LIMIT, Self::oversize_message)
    }
}

/// Used by `utxosBulk`
pub struct AddressesParam;
impl BulkParamLimiter for AddressesParam {
    const PARAM_NAME: &'static str = "addresses";
}

/// Used by `txData` and `transaction`
pub struct TxidsParam;
impl BulkParamLimiter for TxidsParam {
    const PARAM_NAME: &'static str = "txids";

    fn oversize_message() -> String {
        format!("Array input must be {} elements or less.", Self::LIMIT)
    }
}

/// Fetches a non-empty string parameter.
pub fn required_string(params: &Map<String, Value>, field: &str) -> Result<String, GatewayError> {
    match params.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(GatewayError::validation(
            format!("{} parameter is required", field),
        )),
        Some(_) => Err(GatewayError::validation(format!(
            "{} parameter must be a string",
            field
        ))),
    }
}

pub fn optional_bool(params: &Map<String, Value>, field: &str) -> Result<bool, GatewayError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(GatewayError::validation(format!(
            "{} parameter must be a boolean",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addresses(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| Value::String(format!("bitcoincash:addr{}", i)))
                .collect(),
        )
    }

    #[test]
    fn rejects_non_array_input() {
        let input = json!("bitcoincash:qrl2nlsaayk6ekxn80pq0ks32dya8xfclyktem2mqj");
        let err = AddressesParam::validate(Some(&input)).unwrap_err();
        assert_eq!(err.status(), 422);
        assert_eq!(err.to_string(), "addresses parameter must be an array");

        let err = AddressesParam::validate(None).unwrap_err();
        assert_eq!(err.to_string(), "addresses parameter must be an array");
    }

    #[test]
    fn accepts_every_length_up_to_limit() {
        for n in 1..=MAX_BULK_ELEMENTS {
            let input = addresses(n);
            let validated = AddressesParam::validate(Some(&input)).unwrap();
            assert_eq!(validated.len(), n);
            assert_eq!(validated[0], "bitcoincash:addr0");
        }
    }

    #[test]
    fn rejects_oversized_input() {
        let input = addresses(21);
        let err = AddressesParam::validate(Some(&input)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "addresses parameter must not exceed 20 elements"
        );

        let err = TxidsParam::validate(Some(&input)).unwrap_err();
        assert_eq!(err.to_string(), "Array input must be 20 elements or less.");
    }

    #[test]
    fn rejects_empty_and_non_string_elements() {
        let err = validate_bulk(Some(&json!([])), "addresses", 20).unwrap_err();
        assert_eq!(err.to_string(), "addresses parameter must not be empty");

        let err = validate_bulk(Some(&json!(["a", 2])), "addresses", 20).unwrap_err();
        assert_eq!(err.to_string(), "addresses parameter must contain only strings");
    }

    #[test]
    fn validate_bulk_respects_custom_max() {
        assert!(validate_bulk(Some(&addresses(3)), "addresses", 3).is_ok());
        let err = validate_bulk(Some(&addresses(4)), "addresses", 3).unwrap_err();
        assert_eq!(err.to_string(), "addresses parameter must not exceed 3 elements");
    }

    #[test]
    fn required_string_test() {
        let params = json!({"address": "bitcoincash:qp", "empty": "", "number": 3});
        let params = params.as_object().unwrap();
        assert_eq!(required_string(params, "address").unwrap(), "bitcoincash:qp");
        assert_eq!(
            required_string(params, "empty").unwrap_err().to_string(),
            "empty parameter is required"
        );
        assert_eq!(
            required_string(params, "missing").unwrap_err().to_string(),
            "missing parameter is required"
        );
        assert_eq!(
            required_string(params, "number").unwrap_err().to_string(),
            "number parameter must be a string"
        );
    }

    #[test]
    fn optional_bool_test() {
        let params = json!({"withTxHistory": true, "bad": "yes"});
        let params = params.as_object().unwrap();
        assert!(optional_bool(params, "withTxHistory").unwrap());
        assert!(!optional_bool(params, "updateCache").unwrap());
        assert!(optional_bool(params, "bad").is_err());
    }
}
