//! Energy-flow allocation between production, the owner, the neighbor and the grid.
//!
//! For each 15-minute interval, production first covers the owner's own use,
//! then the neighbor's, and whatever is left is exported. Unmet demand on
//! either side is bought from the grid. Money is derived once per day from the
//! daily energy sums.

mod bill;

pub use bill::{BillLine, NeighborBill};

use std::collections::{BTreeMap, BTreeSet};

use meter_client::domain::{
    AllocationResult, AllocationTotals, CalendarDate, ConfigurationError, DailyStats, EnergyFlows,
    IntervalValues, MeterSeries, MeterTopology, TariffConfig, INTERVALS_PER_DAY,
};

static ZERO_DAY: IntervalValues = IntervalValues::zeroed();

/// Allocated flows of one interval, in kWh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalFlows {
    pub self_consumed: f64,
    pub sold_to_neighbor: f64,
    pub sold_to_grid: f64,
    pub bought_from_grid_owner: f64,
    pub bought_from_grid_neighbor: f64,
}

impl IntervalFlows {
    /// Splits production `p` against owner usage `o` and neighbor usage `n`.
    ///
    /// With `NetOfSelfConsumption`, `p` is already the owner's excess, so
    /// nothing is self-consumed and the owner's whole usage is grid-bought.
    pub fn allocate(p: f64, o: f64, n: f64, topology: MeterTopology) -> Self {
        let self_consumed = match topology {
            MeterTopology::Gross => p.min(o),
            MeterTopology::NetOfSelfConsumption => 0.0,
        };
        let p1 = p - self_consumed;
        let o1 = o - self_consumed;

        let sold_to_neighbor = p1.min(n);
        let p2 = p1 - sold_to_neighbor;
        let n1 = n - sold_to_neighbor;

        Self {
            self_consumed,
            sold_to_neighbor,
            sold_to_grid: p2,
            bought_from_grid_owner: o1,
            bought_from_grid_neighbor: n1,
        }
    }
}

/// Runs allocations under one validated tariff and topology.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    tariff: TariffConfig,
    topology: MeterTopology,
}

impl AllocationEngine {
    pub fn new(
        tariff: Option<&TariffConfig>,
        topology: MeterTopology,
    ) -> Result<Self, ConfigurationError> {
        match TariffConfig::require(tariff) {
            Ok(tariff) => Ok(Self { tariff, topology }),
            Err(e) => {
                metrics::counter!("allocation_config_rejected_total").increment(1);
                Err(e)
            }
        }
    }

    pub fn tariff(&self) -> &TariffConfig {
        &self.tariff
    }

    pub fn topology(&self) -> MeterTopology {
        self.topology
    }

    /// One `DailyStats` per date present in any of the three series, in
    /// ascending date order. A series without a record for a date counts as
    /// an all-zero day.
    pub fn allocate(
        &self,
        production: &MeterSeries,
        owner: &MeterSeries,
        neighbor: &MeterSeries,
    ) -> AllocationResult {
        let production = date_index(production);
        let owner = date_index(owner);
        let neighbor = date_index(neighbor);

        let dates: BTreeSet<CalendarDate> = production
            .keys()
            .chain(owner.keys())
            .chain(neighbor.keys())
            .copied()
            .collect();

        let daily: Vec<DailyStats> = dates
            .into_iter()
            .map(|date| {
                self.day_stats(
                    date,
                    values_on(&production, date),
                    values_on(&owner, date),
                    values_on(&neighbor, date),
                )
            })
            .collect();

        let totals = self.totals(&daily);
        metrics::counter!("allocation_runs_total").increment(1);
        tracing::debug!(
            days = daily.len(),
            production_kwh = totals.energy.production,
            revenue = totals.revenue,
            "allocation computed"
        );

        AllocationResult { daily, totals }
    }

    fn day_stats(
        &self,
        date: CalendarDate,
        production: &IntervalValues,
        owner: &IntervalValues,
        neighbor: &IntervalValues,
    ) -> DailyStats {
        let mut energy = EnergyFlows::default();
        for i in 0..INTERVALS_PER_DAY {
            let (p, o, n) = (production[i], owner[i], neighbor[i]);
            let flows = IntervalFlows::allocate(p, o, n, self.topology);
            energy += EnergyFlows {
                production: p,
                owner_usage: o,
                neighbor_usage: n,
                self_consumed: flows.self_consumed,
                sold_to_neighbor: flows.sold_to_neighbor,
                sold_to_grid: flows.sold_to_grid,
                bought_from_grid_owner: flows.bought_from_grid_owner,
                bought_from_grid_neighbor: flows.bought_from_grid_neighbor,
            };
        }

        let t = &self.tariff;
        let revenue_from_neighbor = energy.sold_to_neighbor * t.price_neighbor;
        let revenue_from_grid = energy.sold_to_grid * t.price_grid;

        DailyStats {
            date,
            energy,
            revenue: revenue_from_neighbor + revenue_from_grid,
            savings: energy.self_consumed * t.price_grid_buy,
            cost_owner: energy.bought_from_grid_owner * t.price_grid_buy,
            cost_neighbor: revenue_from_neighbor + energy.bought_from_grid_neighbor * t.price_grid_buy,
        }
    }

    fn totals(&self, daily: &[DailyStats]) -> AllocationTotals {
        let mut totals = AllocationTotals::default();
        for day in daily {
            totals.energy += day.energy;
            totals.revenue += day.revenue;
            totals.revenue_from_neighbor += day.energy.sold_to_neighbor * self.tariff.price_neighbor;
            totals.revenue_from_grid += day.energy.sold_to_grid * self.tariff.price_grid;
            totals.savings += day.savings;
            totals.cost_owner += day.cost_owner;
            totals.cost_neighbor += day.cost_neighbor;
        }
        totals
    }
}

/// Allocation with gross metering; fails only on a missing or invalid tariff.
pub fn compute_allocation(
    production: &MeterSeries,
    owner: &MeterSeries,
    neighbor: &MeterSeries,
    tariff: Option<&TariffConfig>,
) -> Result<AllocationResult, ConfigurationError> {
    let engine = AllocationEngine::new(tariff, MeterTopology::Gross)?;
    Ok(engine.allocate(production, owner, neighbor))
}

// Later records overwrite earlier ones for the same date.
fn date_index(series: &MeterSeries) -> BTreeMap<CalendarDate, &IntervalValues> {
    series.iter().map(|r| (r.date, &r.values)).collect()
}

fn values_on<'a>(
    index: &BTreeMap<CalendarDate, &'a IntervalValues>,
    date: CalendarDate,
) -> &'a IntervalValues {
    index.get(&date).copied().unwrap_or(&ZERO_DAY)
}
