//! Synchronization settings

use serde::{Deserialize, Serialize};

use core_kernel::Currency;

/// Settings for the synchronization services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Currency every order total and ledger amount is denominated in
    pub base_currency: Currency,
    /// Category written on derived revenue entries
    pub revenue_category: String,
    /// Prefix of the description written on derived revenue entries
    pub description_prefix: String,
    /// Buffer size of the `OrderChanged` broadcast channel
    pub event_channel_capacity: usize,
    /// Replay unresolved sync intents when the service starts
    pub recover_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_currency: Currency::BRL,
            revenue_category: "Sales".to_string(),
            description_prefix: "Sales order".to_string(),
            event_channel_capacity: 64,
            recover_on_startup: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"base_currency": "USD"}"#).unwrap();
        assert_eq!(config.base_currency, Currency::USD);
        assert_eq!(config.revenue_category, "Sales");
        assert!(config.recover_on_startup);
    }
}
