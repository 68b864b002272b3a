use std::ops::AddAssign;

use super::CalendarDate;

/// Energy quantities in kWh: raw meter totals and the allocated flows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnergyFlows {
    pub production: f64,
    pub owner_usage: f64,
    pub neighbor_usage: f64,
    pub self_consumed: f64,
    pub sold_to_neighbor: f64,
    pub sold_to_grid: f64,
    pub bought_from_grid_owner: f64,
    pub bought_from_grid_neighbor: f64,
}

impl AddAssign for EnergyFlows {
    fn add_assign(&mut self, rhs: Self) {
        self.production += rhs.production;
        self.owner_usage += rhs.owner_usage;
        self.neighbor_usage += rhs.neighbor_usage;
        self.self_consumed += rhs.self_consumed;
        self.sold_to_neighbor += rhs.sold_to_neighbor;
        self.sold_to_grid += rhs.sold_to_grid;
        self.bought_from_grid_owner += rhs.bought_from_grid_owner;
        self.bought_from_grid_neighbor += rhs.bought_from_grid_neighbor;
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailyStats {
    pub date: CalendarDate,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub energy: EnergyFlows,
    pub revenue: f64,
    pub savings: f64,
    pub cost_owner: f64,
    pub cost_neighbor: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationTotals {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub energy: EnergyFlows,
    pub revenue: f64,
    pub revenue_from_neighbor: f64,
    pub revenue_from_grid: f64,
    pub savings: f64,
    pub cost_owner: f64,
    pub cost_neighbor: f64,
}

/// Daily breakdown in ascending date order plus grand totals.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationResult {
    pub daily: Vec<DailyStats>,
    pub totals: AllocationTotals,
}

impl AllocationResult {
    pub fn day(&self, date: CalendarDate) -> Option<&DailyStats> {
        self.daily.iter().find(|d| d.date == date)
    }
}
