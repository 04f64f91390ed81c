use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ledger::{
    Account, Amount, Ledger, TokenMetadata, DEFAULT_DECIMALS, DEFAULT_NAME, DEFAULT_SYMBOL,
};

/// First well-known development account; receives the genesis supply by default.
pub const DEFAULT_HOLDER: Account = Account::new([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);

pub const DEFAULT_INITIAL_SUPPLY: &str = "1000000";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisConfig {
    /// Initial holder and issuer.
    #[serde(default = "default_holder")]
    pub holder: Account,
    /// Whole units; scaled by `token.decimals` at build time.
    #[serde(default = "default_initial_supply")]
    pub initial_supply: String,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_symbol() -> String {
    DEFAULT_SYMBOL.to_string()
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

fn default_holder() -> Account {
    DEFAULT_HOLDER
}

fn default_initial_supply() -> String {
    DEFAULT_INITIAL_SUPPLY.to_string()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            symbol: default_symbol(),
            decimals: default_decimals(),
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            holder: default_holder(),
            initial_supply: default_initial_supply(),
        }
    }
}

impl LedgerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Loads `path` if given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.token.name.clone(),
            symbol: self.token.symbol.clone(),
            decimals: self.token.decimals,
        }
    }

    pub fn initial_supply(&self) -> Result<Amount, ConfigError> {
        Ok(Amount::parse_units(
            &self.genesis.initial_supply,
            self.token.decimals,
        )?)
    }

    pub fn build_ledger(&self) -> Result<Ledger, ConfigError> {
        Ok(Ledger::new(
            self.metadata(),
            self.initial_supply()?,
            self.genesis.holder,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_my_token_deployment() {
        let ledger = LedgerConfig::default().build_ledger().unwrap();
        assert_eq!(ledger.name(), "MyToken");
        assert_eq!(ledger.symbol(), "MTK");
        assert_eq!(ledger.decimals(), 18);
        assert_eq!(
            ledger.total_supply(),
            Amount::parse_units("1000000", 18).unwrap()
        );
        assert_eq!(ledger.issuer(), DEFAULT_HOLDER);
        assert!(!ledger.issuer().is_null());
        assert_eq!(
            ledger.issuer().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(ledger.metadata(), &LedgerConfig::default().metadata());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"token": {"symbol": "TST", "decimals": 2}}"#).unwrap();
        assert_eq!(config.token.name, "MyToken");
        assert_eq!(config.token.symbol, "TST");
        assert_eq!(config.genesis, GenesisConfig::default());
        assert_eq!(
            config.initial_supply().unwrap(),
            Amount::from(100_000_000u64)
        );
    }

    #[test]
    fn bad_supply_is_a_config_error() {
        let mut config = LedgerConfig::default();
        config.genesis.initial_supply = "lots".into();
        assert!(matches!(
            config.build_ledger(),
            Err(ConfigError::Value(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("mtk-config-{}", std::process::id()));
        let path = dir.join("ledger.json");
        let mut config = LedgerConfig::default();
        config.token.name = "Saved".into();
        config.save(&path).unwrap();
        let loaded = LedgerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_dir_all(&dir).ok();
    }
}
