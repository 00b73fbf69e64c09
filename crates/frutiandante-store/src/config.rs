//! # Storefront Configuration
//!
//! Configuration for a storefront session.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FRUTIANDANTE_ENV=production                                        │
//! │     FRUTIANDANTE_WHATSAPP=56912345678                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/storefront.toml (Linux)                       │
//! │     ~/Library/Application Support/cl.frutiandante.storefront/ (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     development, 10% loyalty discount, 0.5 kg step                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `settings/site` document, when present, takes precedence over the
//! `[shop]` section; the section is the fallback before it loads.
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! environment = "production"
//!
//! [shop]
//! store_name = "Frutiandante"
//! whatsapp_number = "56912345678"
//! loyalty_discount_bps = 1000
//! weight_step = 0.5
//!
//! [cart]
//! storage_key = "frutiandante-cart"
//! persist = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use frutiandante_core::validation::{validate_discount_bps, validate_whatsapp_number};
use frutiandante_core::{DiscountRate, Quantity, SiteConfig, DEFAULT_WEIGHT_STEP};

use crate::cart_store::DEFAULT_CART_KEY;
use crate::error::{StoreError, StoreResult};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "storefront.toml";

// =============================================================================
// Environment
// =============================================================================

/// Build environment. Decides how much detail failures show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(StoreError::InvalidConfig(format!(
                "Unknown environment: '{}'. Valid options: development, production",
                other
            ))),
        }
    }
}

// =============================================================================
// Shop Settings
// =============================================================================

/// Shop defaults used until the `settings/site` document is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSettings {
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// International format without `+`.
    #[serde(default = "default_whatsapp_number")]
    pub whatsapp_number: String,

    /// Second-order discount in basis points (1000 = 10%).
    #[serde(default = "default_loyalty_bps")]
    pub loyalty_discount_bps: u32,

    /// Kilogram step for weight-sold goods.
    #[serde(default = "default_weight_step")]
    pub weight_step: Quantity,

    #[serde(default)]
    pub announcement: Option<String>,
}

fn default_store_name() -> String {
    "Frutiandante".to_string()
}

fn default_whatsapp_number() -> String {
    "56900000000".to_string()
}

fn default_loyalty_bps() -> u32 {
    1000
}

fn default_weight_step() -> Quantity {
    DEFAULT_WEIGHT_STEP
}

impl Default for ShopSettings {
    fn default() -> Self {
        ShopSettings {
            store_name: default_store_name(),
            whatsapp_number: default_whatsapp_number(),
            loyalty_discount_bps: default_loyalty_bps(),
            weight_step: default_weight_step(),
            announcement: None,
        }
    }
}

impl ShopSettings {
    /// The settings as a site configuration record.
    pub fn site_config(&self) -> SiteConfig {
        SiteConfig {
            id: SiteConfig::DOCUMENT_ID.to_string(),
            store_name: self.store_name.clone(),
            whatsapp_number: self.whatsapp_number.clone(),
            loyalty_discount: DiscountRate::from_bps(self.loyalty_discount_bps),
            weight_step: self.weight_step,
            announcement: self.announcement.clone(),
        }
    }
}

// =============================================================================
// Cart Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSettings {
    /// Key of the cart value in local storage.
    #[serde(default = "default_cart_key")]
    pub storage_key: String,

    /// Keep the cart on disk between sessions. `false` keeps it in memory.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Storage file; defaults to the platform data directory.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

fn default_cart_key() -> String {
    DEFAULT_CART_KEY.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CartSettings {
    fn default() -> Self {
        CartSettings {
            storage_key: default_cart_key(),
            persist: true,
            storage_path: None,
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub shop: ShopSettings,

    #[serde(default)]
    pub cart: CartSettings,
}

impl AppConfig {
    /// Loads configuration: defaults, then file, then environment.
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| StoreError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    pub fn validate(&self) -> StoreResult<()> {
        validate_whatsapp_number(&self.shop.whatsapp_number)
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        validate_discount_bps(self.shop.loyalty_discount_bps)
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        if self.shop.weight_step.is_zero() {
            return Err(StoreError::InvalidConfig(
                "weight_step must be greater than 0".into(),
            ));
        }

        if self.cart.storage_key.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "cart storage_key must not be empty".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(env) = std::env::var("FRUTIANDANTE_ENV") {
            match env.parse() {
                Ok(parsed) => {
                    debug!(environment = %env, "Overriding environment from environment");
                    self.environment = parsed;
                }
                Err(_) => warn!(environment = %env, "Unknown environment in FRUTIANDANTE_ENV"),
            }
        }

        if let Ok(number) = std::env::var("FRUTIANDANTE_WHATSAPP") {
            self.shop.whatsapp_number = number;
        }

        if let Ok(name) = std::env::var("FRUTIANDANTE_STORE_NAME") {
            self.shop.store_name = name;
        }

        if let Ok(bps) = std::env::var("FRUTIANDANTE_LOYALTY_BPS") {
            if let Ok(b) = bps.parse::<u32>() {
                debug!(bps = b, "Overriding loyalty discount from environment");
                self.shop.loyalty_discount_bps = b;
            }
        }

        if let Ok(step) = std::env::var("FRUTIANDANTE_WEIGHT_STEP") {
            match step.parse::<f64>().ok().and_then(Quantity::from_f64) {
                Some(q) => self.shop.weight_step = q,
                None => warn!(weight_step = %step, "Invalid weight step in environment"),
            }
        }

        if let Ok(key) = std::env::var("FRUTIANDANTE_CART_KEY") {
            self.cart.storage_key = key;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("cl", "frutiandante", "storefront")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.shop.loyalty_discount_bps, 1000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.shop.whatsapp_number = "+56 9".into();
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = AppConfig::default();
        config.shop.loyalty_discount_bps = 20000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.shop.weight_step = Quantity::zero();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            environment = "production"

            [shop]
            store_name = "Frutiandante Ñuñoa"
            whatsapp_number = "56987654321"
            weight_step = 0.25
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.shop.weight_step, Quantity::from_milli(250));
        assert_eq!(config.shop.loyalty_discount_bps, 1000);
        assert_eq!(config.cart, CartSettings::default());

        let written = toml::to_string_pretty(&config).unwrap();
        assert!(written.contains("[shop]"));
        assert!(written.contains("[cart]"));
    }

    #[test]
    fn test_save_and_load_explicit_path() {
        let dir = std::env::temp_dir().join(format!("frutiandante-config-{}", uuid::Uuid::new_v4().simple()));
        let path = dir.join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.shop.store_name = "Tienda de prueba".into();
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.shop.store_name, "Tienda de prueba");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_site_config_fallback() {
        let site = ShopSettings::default().site_config();
        assert_eq!(site.id, "site");
        assert_eq!(site.loyalty_discount, DiscountRate::from_bps(1000));
    }
}
