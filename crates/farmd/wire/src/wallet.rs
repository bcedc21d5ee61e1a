//! Wallet summaries returned by `get_wallets`.

use serde_json::Value;

/// Wallet type discriminator as the daemon reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletType {
    Standard,
    RateLimited,
    ColouredCoin,
    /// A type this client does not know; kept so one exotic wallet does not
    /// sink the whole list.
    Other(String),
}

impl WalletType {
    pub fn from_wire(name: &str) -> Self {
        match name {
            "STANDARD_WALLET" => WalletType::Standard,
            "RATE_LIMITED" => WalletType::RateLimited,
            "COLOURED_COIN" => WalletType::ColouredCoin,
            other => WalletType::Other(other.to_string()),
        }
    }
}

/// One entry of a `get_wallets` response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSummary {
    pub id: u32,
    pub wallet_type: WalletType,
    /// Wallet-type specific settings blob; a nested JSON string for
    /// rate-limited wallets.
    pub data: Option<String>,
}

impl WalletSummary {
    /// Parse one wallet entry; `None` when required fields are missing.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id").and_then(Value::as_u64)?;
        let type_name = value.get("type").and_then(Value::as_str)?;
        Some(Self {
            id: id as u32,
            wallet_type: WalletType::from_wire(type_name),
            data: value
                .get("data")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Rate-limited wallets carry their settings as a nested JSON string;
    /// the `initialized` flag inside it gates balance fetches.
    pub fn rate_limited_initialized(&self) -> bool {
        let Some(raw) = self.data.as_deref() else {
            return false;
        };
        serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|settings| settings.get("initialized").and_then(Value::as_bool))
            .unwrap_or(false)
    }
}
