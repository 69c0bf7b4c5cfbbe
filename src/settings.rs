use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Environment variables with this prefix override the config file, with `__`
/// between nested keys, e.g. `BCH_GATEWAY_NETWORK__PORT=6000`.
pub const ENV_PREFIX: &str = "BCH_GATEWAY";
pub const DEFAULT_CONFIG_NAME: &str = "config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub network: NetworkSettings,
    pub gateway: GatewaySettings,
    pub rate_limit: RateLimitSettings,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub host: [u8; 4],
    pub port: u16,
    /// Identity this node reports as `reciever` in RPC responses.
    pub node_id: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            host: [127, 0, 0, 1],
            port: 5020,
            node_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub api_server: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            api_server: String::from("https://api.fullstack.cash/v5/"),
            api_token: None,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max: u32,
    pub window_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            max: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub name: String,
    pub api_info: String,
    pub description: String,
    pub provider_name: String,
    pub provider_url: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            name: String::from("bch-wallet-service"),
            api_info: String::from("https://bch-wallet-service.example.com/"),
            description: String::from(
                "Service providing BCH blockchain access needed by a wallet.",
            ),
            provider_name: String::from("Permissionless Software Foundation"),
            provider_url: String::from("https://PSFoundation.cash"),
        }
    }
}

impl Settings {
    /// Loads `config_name` (any format the config crate understands, the file
    /// is optional) and layers the environment on top.
    pub fn load(config_name: &str) -> crate::Result<Settings> {
        let mut settings = config::Config::default();
        settings.merge(config::File::with_name(config_name).required(false))?;
        settings.merge(config::Environment::with_prefix(ENV_PREFIX).separator("__"))?;
        let settings: Settings = settings.try_into()?;
        Ok(settings)
    }

    /// Schema.org description of this service, served at `/`.
    pub fn announce_json_ld(&self) -> Value {
        json!({
            "@context": "https://schema.org/",
            "@type": "WebAPI",
            "name": self.service.name,
            "version": env!("CARGO_PKG_VERSION"),
            "protocol": "bch-wallet",
            "description": self.service.description,
            "documentation": self.service.api_info,
            "identifier": self.network.node_id,
            "provider": {
                "@type": "Organization",
                "name": self.service.provider_name,
                "url": self.service.provider_url,
            }
        })
    }
}
