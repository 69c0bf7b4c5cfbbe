use crate::error::{GatewayError, GatewayFault};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// What every handler produces, on success and on failure, whichever
/// transport carried the request.
///
/// `success == false` always comes with `status >= 400` and a `message`.
/// Operation specific fields are flattened next to the fixed ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResponseEnvelope {
    pub fn ok() -> Self {
        ResponseEnvelope {
            success: true,
            status: 200,
            message: None,
            endpoint: None,
            fields: Map::new(),
        }
    }

    pub fn ok_for(endpoint: &str) -> Self {
        ResponseEnvelope::ok().with_endpoint(endpoint)
    }

    pub fn failure(endpoint: &str, err: &GatewayError) -> Self {
        ResponseEnvelope {
            success: false,
            status: err.status(),
            message: Some(err.to_string()),
            endpoint: Some(endpoint.to_string()),
            fields: Map::new(),
        }
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Wraps an object returned by the gateway, forcing `status` to 200.
    ///
    /// An object that reports `success: false` is turned into an error so the
    /// envelope never claims a failed lookup succeeded. Anything that is not
    /// an object ends up under `data`.
    pub fn passthrough(body: Value) -> Result<Self, GatewayError> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert(String::from("data"), other);
                fields
            }
        };
        let success = fields
            .remove("success")
            .map(|success| success.as_bool().unwrap_or(true))
            .unwrap_or(true);
        fields.remove("status");

        if !success {
            let message = ["error", "message"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .unwrap_or("gateway reported failure")
                .to_string();
            return Err(GatewayError::Gateway(GatewayFault::exception(message)));
        }

        Ok(ResponseEnvelope {
            fields,
            ..ResponseEnvelope::ok()
        })
    }

    /// [`ResponseEnvelope::passthrough`] for anything serializable.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, GatewayError> {
        let body = serde_json::to_value(value)
            .map_err(|err| GatewayError::Unhandled(err.to_string()))?;
        ResponseEnvelope::passthrough(body)
    }
}
