//! # Synthetic Ledger
//!
//! A library for generating multi-year double-entry accounting datasets
//! that look like a real mid-size company's ERP export, together with
//! monthly KPI aggregation and an accounting-identity reconciliation check.
//!
//! ## Core Concepts
//!
//! - **Chart of Accounts**: Numbered accounts with a structural kind and a
//!   behavioral role; all generation and aggregation keys off roles
//! - **Ledger Generation**: A seeded monthly event loop (sales, purchases,
//!   payroll, capex, depreciation, VAT, income tax) emitting balanced
//!   entry groups
//! - **KPI Aggregation**: Posted entries folded into monthly income
//!   statement, balance sheet, working capital, and cash flow figures
//! - **Reconciliation**: Enforces assets = liabilities + equity +
//!   cumulative net income for every period
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use synthetic_ledger::{run_simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     end_date: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
//!     ..SimulationConfig::default()
//! };
//!
//! let outcome = run_simulation(&config).unwrap();
//! assert_eq!(outcome.kpis.len(), 3);
//! assert!(outcome.reconciliation.iter().all(|r| r.difference.abs() < 1000.0));
//! ```

pub mod aggregator;
pub mod budget;
pub mod calendar;
pub mod chart;
pub mod error;
pub mod generator;
pub mod reconciliation;
pub mod schema;
pub mod seasonality;

pub use aggregator::{personnel_costs, sales_by_channel, DashboardData, PeriodAggregator};
pub use budget::BudgetPlanner;
pub use chart::{Account, AccountRow, ChartOfAccounts};
pub use error::{Result, SyntheticLedgerError};
pub use generator::{GeneratedLedger, GeneratorState, LedgerGenerator};
pub use reconciliation::{ReconciliationChecker, DEFAULT_TOLERANCE};
pub use schema::*;
pub use seasonality::{growth_multiplier, profile_factors};

use calendar::last_day_of_month;
use chrono::Datelike;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything one simulation run produces: the raw ledger with its side
/// facts, the budget grid, the derived KPI series, the reconciliation
/// report, and the bundled dashboard export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub chart: ChartOfAccounts,
    pub ledger: GeneratedLedger,
    pub budget: Vec<BudgetLine>,
    pub kpis: Vec<KpiRecord>,
    pub reconciliation: Vec<ReconciliationRecord>,
    pub dashboard: DashboardData,
}

pub struct SimulationPipeline;

impl SimulationPipeline {
    pub fn run(config: &SimulationConfig) -> Result<SimulationOutcome> {
        Self::run_with_chart(config, ChartOfAccounts::standard())
    }

    pub fn run_with_chart(
        config: &SimulationConfig,
        chart: ChartOfAccounts,
    ) -> Result<SimulationOutcome> {
        // Construction validates the config against the chart.
        let generator = LedgerGenerator::new(config, &chart)?;

        info!(
            "Simulating double-entry history for organization: {}",
            config.company_name
        );
        debug!(
            "Window {} to {} with seed {}",
            config.start_date, config.end_date, config.seed
        );

        let ledger = generator.generate()?;
        info!(
            "Generated {} ledger entries, {} sales invoices, {} payroll runs",
            ledger.entries.len(),
            ledger.sales.len(),
            ledger.payroll.len()
        );

        let budget = BudgetPlanner::new(config, &chart).plan();

        let aggregator = PeriodAggregator::new(&chart);
        let kpis = aggregator.aggregate(&ledger.entries)?;
        let reconciliation = ReconciliationChecker::new().check(&kpis);
        debug!("Aggregated {} monthly periods", kpis.len());

        let dashboard = DashboardData {
            opex_breakdown: aggregator.opex_breakdown(&budget)?,
            capex: aggregator.capex_summary(&ledger.entries)?,
            personnel: personnel_costs(&ledger.payroll, &kpis),
            sales_channels: sales_by_channel(&ledger.sales),
            kpis: kpis.clone(),
            reconciliation: reconciliation.clone(),
        };

        Ok(SimulationOutcome {
            chart,
            ledger,
            budget,
            kpis,
            reconciliation,
            dashboard,
        })
    }

    pub fn run_with_verification(
        config: &SimulationConfig,
        tolerance: f64,
    ) -> Result<SimulationOutcome> {
        let outcome = Self::run(config)?;

        ReconciliationChecker::with_tolerance(tolerance).verify(&outcome.kpis)?;

        Ok(outcome)
    }
}

pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationOutcome> {
    SimulationPipeline::run(config)
}

pub fn run_simulation_with_verification(
    config: &SimulationConfig,
    tolerance: f64,
) -> Result<SimulationOutcome> {
    SimulationPipeline::run_with_verification(config, tolerance)
}

/// Checks the whole configuration against the chart before any generation
/// happens. Every failure mode here would otherwise surface as a panic or
/// a silently wrong dataset deep inside the monthly loop.
pub(crate) fn validate_config(config: &SimulationConfig, chart: &ChartOfAccounts) -> Result<()> {
    let start_aligned = config.start_date.day() == 1;
    let end_aligned = config.end_date
        == last_day_of_month(config.end_date.year(), config.end_date.month());
    if config.start_date > config.end_date || !start_aligned || !end_aligned {
        return Err(SyntheticLedgerError::InvalidWindow {
            start: config.start_date.to_string(),
            end: config.end_date.to_string(),
        });
    }

    for (name, value) in [
        ("vat_rate", config.vat_rate),
        ("income_tax_rate", config.income_tax_rate),
        ("pretax_profit_fraction", config.pretax_profit_fraction),
        ("employer_levy_rate", config.employer_levy_rate),
        ("capex_probability", config.capex_probability),
        ("collection_probability", config.collection_probability),
        ("payment_probability", config.payment_probability),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(SyntheticLedgerError::InvalidRate {
                name: name.to_string(),
                value,
            });
        }
    }

    if !config.revenue_jitter.is_finite() || !(0.0..=0.5).contains(&config.revenue_jitter) {
        return Err(SyntheticLedgerError::InvalidJitter(config.revenue_jitter));
    }

    let ratios = &config.ratios;
    if !(0.0..1.0).contains(&ratios.gross_margin)
        || !(0.0..1.0).contains(&ratios.ebitda_margin)
        || ratios.ebitda_margin > ratios.gross_margin
        || ratios.personnel_ratio < 0.0
        || ratios.services_ratio_floor <= 0.0
    {
        return Err(SyntheticLedgerError::InvalidRatioTargets(format!(
            "gross_margin {}, ebitda_margin {}, personnel_ratio {}, services_ratio_floor {}",
            ratios.gross_margin,
            ratios.ebitda_margin,
            ratios.personnel_ratio,
            ratios.services_ratio_floor
        )));
    }

    if config.base_monthly_revenue <= 0.0 {
        return Err(SyntheticLedgerError::InvalidAmountBounds {
            name: "base_monthly_revenue".to_string(),
            min: config.base_monthly_revenue,
            max: config.base_monthly_revenue,
        });
    }

    for (name, min, max) in [
        (
            "invoice_amount",
            config.invoice_amount_min,
            config.invoice_amount_max,
        ),
        (
            "purchase_amount",
            config.purchase_amount_min,
            config.purchase_amount_max,
        ),
        ("capex_amount", config.capex_min, config.capex_max),
    ] {
        if min <= 0.0 || min > max {
            return Err(SyntheticLedgerError::InvalidAmountBounds {
                name: name.to_string(),
                min,
                max,
            });
        }
    }

    for (name, value) in [
        ("invoice_shape", config.invoice_shape),
        ("purchase_shape", config.purchase_shape),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(SyntheticLedgerError::InvalidShape {
                name: name.to_string(),
                value,
            });
        }
    }

    for (name, min, max) in [
        (
            "collection_lag",
            config.collection_lag_min_days,
            config.collection_lag_max_days,
        ),
        (
            "payment_lag",
            config.payment_lag_min_days,
            config.payment_lag_max_days,
        ),
    ] {
        if min > max {
            return Err(SyntheticLedgerError::InvalidLagRange {
                name: name.to_string(),
                min,
                max,
            });
        }
    }

    if config.depreciation_life_months == 0 {
        return Err(SyntheticLedgerError::InvalidDepreciationLife(0));
    }

    let opening = &config.opening_balances;
    if opening.cash < 0.0 || opening.fixed_assets < 0.0
        || (opening.equity - (opening.cash + opening.fixed_assets)).abs() > 0.005
    {
        return Err(SyntheticLedgerError::UnbalancedOpeningBalances {
            equity: opening.equity,
            cash: opening.cash,
            fixed_assets: opening.fixed_assets,
        });
    }

    let dims = &config.dimensions;
    for (name, pool) in [
        ("cost_centers", &dims.cost_centers),
        ("projects", &dims.projects),
        ("profit_centers", &dims.profit_centers),
        ("branches", &dims.branches),
    ] {
        if pool.is_empty() {
            return Err(SyntheticLedgerError::EmptyDimensionPool(name.to_string()));
        }
    }

    profile_factors(&config.seasonality)?;

    for id in generator::REQUIRED_ACCOUNTS {
        chart.require(id, "configuration validation")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn one_year_config() -> SimulationConfig {
        SimulationConfig {
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_one_year() {
        let result = run_simulation(&one_year_config());
        if let Err(e) = &result {
            println!("Simulation error: {:?}", e);
        }
        assert!(result.is_ok());

        let outcome = result.unwrap();
        assert_eq!(outcome.kpis.len(), 12);
        assert_eq!(outcome.reconciliation.len(), 12);
        assert!(!outcome.ledger.entries.is_empty());
        assert!(!outcome.budget.is_empty());
        assert!(!outcome.dashboard.opex_breakdown.is_empty());
        assert_eq!(outcome.dashboard.capex.len(), 12);
        assert_eq!(outcome.dashboard.personnel.len(), 12);
        assert!(!outcome.dashboard.sales_channels.is_empty());
    }

    #[test]
    fn test_annual_margins_near_targets() {
        let outcome = run_simulation(&one_year_config()).unwrap();

        let revenue: f64 = outcome.kpis.iter().map(|k| k.revenue).sum();
        let cogs: f64 = outcome.kpis.iter().map(|k| k.cogs).sum();
        let ebitda: f64 = outcome.kpis.iter().map(|k| k.ebitda).sum();

        let gross_margin = (revenue - cogs) / revenue;
        let ebitda_margin = ebitda / revenue;

        assert!(
            (gross_margin - 0.55).abs() < 0.05,
            "gross margin {} drifted from target",
            gross_margin
        );
        assert!(
            (ebitda_margin - 0.15).abs() < 0.05,
            "EBITDA margin {} drifted from target",
            ebitda_margin
        );
    }

    #[test]
    fn test_reconciliation_holds_every_period() {
        let outcome = run_simulation(&one_year_config()).unwrap();

        for record in &outcome.reconciliation {
            assert_eq!(
                record.status,
                ReconciliationStatus::Ok,
                "period {} differs by {}",
                record.period,
                record.difference
            );
        }
    }

    #[test]
    fn test_run_with_verification() {
        let result = run_simulation_with_verification(&one_year_config(), DEFAULT_TOLERANCE);
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_inverted_margin_targets() {
        let config = SimulationConfig {
            ratios: RatioTargets {
                ebitda_margin: 0.9,
                ..RatioTargets::default()
            },
            ..one_year_config()
        };

        let result = run_simulation(&config);
        assert!(matches!(
            result,
            Err(SyntheticLedgerError::InvalidRatioTargets(_))
        ));
    }

    #[test]
    fn test_rejects_unbalanced_opening() {
        let config = SimulationConfig {
            opening_balances: OpeningBalances {
                equity: 10_000_000.0,
                ..OpeningBalances::default()
            },
            ..one_year_config()
        };

        let result = run_simulation(&config);
        assert!(matches!(
            result,
            Err(SyntheticLedgerError::UnbalancedOpeningBalances { .. })
        ));
    }

    #[test]
    fn test_dashboard_serializes() {
        let config = SimulationConfig {
            end_date: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            ..SimulationConfig::default()
        };
        let outcome = run_simulation(&config).unwrap();

        let json = outcome.dashboard.to_json().unwrap();
        assert!(json.contains("\"kpis\""));
        assert!(json.contains("\"reconciliation\""));
    }
}
