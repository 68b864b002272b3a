/// Per-kWh rates for one allocation run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TariffConfig {
    /// Solar energy sold to the neighbor.
    pub price_neighbor: f64,
    /// Solar energy exported to the grid.
    pub price_grid: f64,
    /// Energy bought from the grid.
    pub price_grid_buy: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("tariff configuration is missing")]
    MissingTariff,
    #[error("tariff rate '{name}' must be a finite non-negative number, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
}

impl TariffConfig {
    pub fn new(price_neighbor: f64, price_grid: f64, price_grid_buy: f64) -> Self {
        Self {
            price_neighbor,
            price_grid,
            price_grid_buy,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("price_neighbor", self.price_neighbor),
            ("price_grid", self.price_grid),
            ("price_grid_buy", self.price_grid_buy),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidRate { name, value });
            }
        }
        Ok(())
    }

    /// Validated copy of an optional tariff; absence is an error.
    pub fn require(tariff: Option<&TariffConfig>) -> Result<TariffConfig, ConfigurationError> {
        let tariff = tariff.ok_or(ConfigurationError::MissingTariff)?;
        tariff.validate()?;
        Ok(*tariff)
    }
}

/// What the production and usage meters actually measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MeterTopology {
    /// Production is gross generation; self-consumption is allocated first.
    #[default]
    Gross,
    /// Production is already net of the owner's own use (pure excess).
    NetOfSelfConsumption,
}
