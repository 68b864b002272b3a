use meter_client::domain::{AllocationResult, TariffConfig};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BillLine {
    pub energy_kwh: f64,
    pub rate: f64,
    pub amount: f64,
}

impl BillLine {
    fn new(energy_kwh: f64, rate: f64) -> Self {
        Self {
            energy_kwh,
            rate,
            amount: energy_kwh * rate,
        }
    }
}

/// What the neighbor owes for the whole period: solar bought from the owner
/// plus energy drawn from the grid.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NeighborBill {
    pub consumption_kwh: f64,
    pub solar: BillLine,
    pub grid: BillLine,
    pub total: f64,
}

impl NeighborBill {
    pub fn from_result(result: &AllocationResult, tariff: &TariffConfig) -> Self {
        let totals = &result.totals;
        Self {
            consumption_kwh: totals.energy.neighbor_usage,
            solar: BillLine::new(totals.energy.sold_to_neighbor, tariff.price_neighbor),
            grid: BillLine::new(totals.energy.bought_from_grid_neighbor, tariff.price_grid_buy),
            total: totals.cost_neighbor,
        }
    }
}
