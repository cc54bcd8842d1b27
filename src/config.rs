use std::{fs::File, io::BufReader, path::Path};

use derive_more::Display;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::error::Error for ConfigError {}

/// Everything that is fixed for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Expected dimensions of the input tables
    pub counts: Counts,
    /// File names of the input tables, relative to the data directory
    pub files: Files,
    /// Scalar cost and capacity parameters
    pub parameters: Scalars,
    /// Levels used by the sensitivity analysis
    pub sweep: SweepConfig,
}

impl Config {
    /// Load a configuration from a json file. Missing fields keep their default value.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        let file = File::open(path).map_err(ConfigError::Io)?;
        serde_json::from_reader(BufReader::new(file)).map_err(ConfigError::Json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counts {
    pub raw_materials: usize,
    pub semi_products: usize,
    pub final_products: usize,
    pub periods: usize,
}

impl Default for Counts {
    fn default() -> Self {
        Counts {
            raw_materials: 9,
            semi_products: 5,
            final_products: 3,
            periods: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Files {
    /// final products x periods
    pub demand: String,
    /// semi products x raw materials
    pub bom_semi: String,
    /// final products x semi products
    pub bom_final: String,
    /// raw materials x periods
    pub raw_price: String,
    /// final products x periods
    pub final_price: String,
    /// semi products x periods
    pub semi_price: String,
}

impl Default for Files {
    fn default() -> Self {
        Files {
            demand: "demand.csv".into(),
            bom_semi: "boms.csv".into(),
            bom_final: "bomf.csv".into(),
            raw_price: "price_raw.csv".into(),
            final_price: "MPF.csv".into(),
            semi_price: "MPS.csv".into(),
        }
    }
}

/// Scalar parameters of the planning model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scalars {
    /// Variable production cost per semi product
    pub production_cost_semi: f64,
    /// Variable production cost per final product
    pub production_cost_final: f64,
    /// Fixed cost of setting up production of a semi product in a period
    pub setup_cost_semi: f64,
    /// Fixed cost of setting up production of a final product in a period
    pub setup_cost_final: f64,
    pub inventory_cost_raw: f64,
    pub inventory_cost_semi: f64,
    pub inventory_cost_final: f64,
    pub inventory_capacity_raw: f64,
    pub inventory_capacity_semi: f64,
    pub inventory_capacity_final: f64,
    /// Total semi production allowed per period
    pub production_capacity_semi: f64,
    /// Total final production allowed per period
    pub production_capacity_final: f64,
    /// Maximum number of semi products set up in one period
    pub setup_limit_semi: f64,
    /// Maximum number of final products set up in one period
    pub setup_limit_final: f64,
    /// Raw materials are bought in multiples of this
    pub lot_size: f64,
    /// Price received when selling a semi product to a subcontractor, relative to its market price
    pub sell_buy_ratio: f64,
    /// Upper bound on production when the setup variable is 1
    pub big_m: f64,
}

impl Default for Scalars {
    fn default() -> Self {
        Scalars {
            production_cost_semi: 5.0,
            production_cost_final: 100.0,
            setup_cost_semi: 375_000.0,
            setup_cost_final: 150_000.0,
            inventory_cost_raw: 1.0,
            inventory_cost_semi: 2.0,
            inventory_cost_final: 5.0,
            inventory_capacity_raw: 3_000_000.0,
            inventory_capacity_semi: 240_000.0,
            inventory_capacity_final: 60_000.0,
            production_capacity_semi: 35_000.0,
            production_capacity_final: 3_000.0,
            setup_limit_semi: 5.0,
            setup_limit_final: 1.0,
            lot_size: 1_000.0,
            sell_buy_ratio: 0.8,
            big_m: 1e9,
        }
    }
}

/// An inclusive, evenly spaced range of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Levels {
    pub fn new(start: f64, stop: f64, step: f64) -> Levels {
        Levels { start, stop, step }
    }

    /// The values `start, start + step, ..., <= stop`.
    /// Each value is computed from its position so rounding errors do not pile up.
    pub fn values(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.stop < self.start {
            return Vec::new();
        }
        let n = ((self.stop - self.start) / self.step + 1e-9).floor() as usize;
        (0..=n).map(|i| self.start + i as f64 * self.step).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Percentage changes applied to demand and prices, e.g. -50 means a 50% decrease
    pub percent: Levels,
    /// Absolute lot sizes
    pub lot_size: Levels,
    /// Absolute inventory holding cost rates, used for all three tiers
    pub inventory_cost: Levels,
    /// Absolute sell/buy ratios
    pub sell_buy_ratio: Levels,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            percent: Levels::new(-50.0, 1300.0, 10.0),
            lot_size: Levels::new(1_000.0, 491_000.0, 10_000.0),
            inventory_cost: Levels::new(1.0, 50.0, 1.0),
            sell_buy_ratio: Levels::new(0.025, 1.0, 0.025),
        }
    }
}
