//! # Ledger Configuration
//!
//! Business settings the engine needs: the time zone that defines a
//! "business day", default credit terms, default stock thresholds and the
//! purchase edit window.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ALMACEN_TIMEZONE=America/Monterrey                                 │
//! │     ALMACEN_DB_PATH=/var/lib/almacen/almacen.db                        │
//! │     ALMACEN_DEFAULT_CREDIT_DAYS=45                                     │
//! │     ALMACEN_PURCHASE_EDIT_DAYS=3                                       │
//! │     ALMACEN_BUSINESS_NAME="Distribuidora del Norte"                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/almacen/almacen.toml (Linux)                             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [business]
//! name = "Distribuidora del Norte"
//! timezone = "America/Mexico_City"
//!
//! [credit]
//! default_credit_days = 30
//!
//! [stock]
//! default_min_stock = 10
//! default_max_stock = 1000
//!
//! [purchases]
//! edit_window_days = 7
//!
//! [database]
//! path = "almacen.db"
//! max_connections = 5
//! ```

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use almacen_core::{Quantity, MAX_CREDIT_DAYS};
use almacen_db::DbConfig;

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    #[serde(default = "default_business_name")]
    pub name: String,

    /// IANA zone name. Sale cancellation compares calendar days in this zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_business_name() -> String {
    "Almacen".to_string()
}

fn default_timezone() -> String {
    "America/Mexico_City".to_string()
}

impl Default for BusinessSettings {
    fn default() -> Self {
        BusinessSettings {
            name: default_business_name(),
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSettings {
    /// Term for counterparties that have none of their own.
    #[serde(default = "default_credit_days")]
    pub default_credit_days: i64,
}

fn default_credit_days() -> i64 {
    30
}

impl Default for CreditSettings {
    fn default() -> Self {
        CreditSettings {
            default_credit_days: default_credit_days(),
        }
    }
}

/// Thresholds given to stock rows created by an incoming movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSettings {
    #[serde(default = "default_min_stock")]
    pub default_min_stock: i64,

    #[serde(default = "default_max_stock")]
    pub default_max_stock: i64,
}

fn default_min_stock() -> i64 {
    10
}

fn default_max_stock() -> i64 {
    1000
}

impl Default for StockSettings {
    fn default() -> Self {
        StockSettings {
            default_min_stock: default_min_stock(),
            default_max_stock: default_max_stock(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseSettings {
    /// Days after creation during which notes and invoice number can change.
    #[serde(default = "default_edit_window_days")]
    pub edit_window_days: i64,
}

fn default_edit_window_days() -> i64 {
    7
}

impl Default for PurchaseSettings {
    fn default() -> Self {
        PurchaseSettings {
            edit_window_days: default_edit_window_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("almacen.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Ledger Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub business: BusinessSettings,

    #[serde(default)]
    pub credit: CreditSettings,

    #[serde(default)]
    pub stock: StockSettings,

    #[serde(default)]
    pub purchases: PurchaseSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (almacen.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> LedgerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| LedgerError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.parse_timezone()?;

        if !(0..=MAX_CREDIT_DAYS).contains(&self.credit.default_credit_days) {
            return Err(LedgerError::InvalidConfig(format!(
                "default_credit_days must be between 0 and {}, got {}",
                MAX_CREDIT_DAYS, self.credit.default_credit_days
            )));
        }

        if self.stock.default_min_stock < 0
            || self.stock.default_max_stock < self.stock.default_min_stock
        {
            return Err(LedgerError::InvalidConfig(format!(
                "stock thresholds must satisfy 0 <= min <= max, got min {} max {}",
                self.stock.default_min_stock, self.stock.default_max_stock
            )));
        }

        if self.purchases.edit_window_days < 0 {
            return Err(LedgerError::InvalidConfig(
                "edit_window_days must not be negative".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(tz) = std::env::var("ALMACEN_TIMEZONE") {
            debug!(timezone = %tz, "Overriding business timezone from environment");
            self.business.timezone = tz;
        }

        if let Ok(name) = std::env::var("ALMACEN_BUSINESS_NAME") {
            self.business.name = name;
        }

        if let Ok(path) = std::env::var("ALMACEN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(days) = std::env::var("ALMACEN_DEFAULT_CREDIT_DAYS") {
            match days.parse::<i64>() {
                Ok(d) => self.credit.default_credit_days = d,
                Err(_) => warn!(value = %days, "Ignoring invalid ALMACEN_DEFAULT_CREDIT_DAYS"),
            }
        }

        if let Ok(days) = std::env::var("ALMACEN_PURCHASE_EDIT_DAYS") {
            match days.parse::<i64>() {
                Ok(d) => self.purchases.edit_window_days = d,
                Err(_) => warn!(value = %days, "Ignoring invalid ALMACEN_PURCHASE_EDIT_DAYS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "almacen", "almacen")
            .map(|dirs| dirs.config_dir().join("almacen.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    fn parse_timezone(&self) -> LedgerResult<Tz> {
        self.business.timezone.parse::<Tz>().map_err(|_| {
            LedgerError::InvalidConfig(format!(
                "Unknown time zone: '{}'",
                self.business.timezone
            ))
        })
    }

    /// The business time zone. UTC if the configured name does not parse,
    /// which `validate` already rejects for loaded configs.
    pub fn timezone(&self) -> Tz {
        self.parse_timezone().unwrap_or_else(|e| {
            warn!("{}. Falling back to UTC.", e);
            Tz::UTC
        })
    }

    pub fn default_credit_days(&self) -> i64 {
        self.credit.default_credit_days
    }

    pub fn purchase_edit_window_days(&self) -> i64 {
        self.purchases.edit_window_days
    }

    pub fn default_min_stock(&self) -> Quantity {
        Quantity::from_units(self.stock.default_min_stock)
    }

    pub fn default_max_stock(&self) -> Quantity {
        Quantity::from_units(self.stock.default_max_stock)
    }

    /// Pool settings for the configured database.
    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == ":memory:" {
            // One connection is the whole database; the pool size stays 1.
            DbConfig::in_memory()
        } else {
            DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
        }
    }
}
