use crate::calendar::{first_day_of_month, month_sequence, period_key};
use crate::chart::{Account, ChartOfAccounts};
use crate::schema::{round1, round2, AccountKind, BudgetLine, OpexCategory, SimulationConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PLAN_MIN: f64 = 5_000.0;
const PLAN_MAX: f64 = 500_000.0;
const ACTUAL_DRIFT_MIN: f64 = 0.7;
const ACTUAL_DRIFT_MAX: f64 = 1.3;

// Keeps the budget stream independent of the ledger stream, so adding or
// removing budget accounts never shifts generated postings.
const BUDGET_STREAM: u64 = 0x9E3779B97F4A7C15;

/// Produces plan/actual budget lines for every cost center, operating
/// expense account, and month of the window. Budget actuals are drawn
/// around plan and are deliberately not tied to posted expenses.
pub struct BudgetPlanner<'a> {
    config: &'a SimulationConfig,
    chart: &'a ChartOfAccounts,
}

impl<'a> BudgetPlanner<'a> {
    pub fn new(config: &'a SimulationConfig, chart: &'a ChartOfAccounts) -> Self {
        Self { config, chart }
    }

    pub fn plan(&self) -> Vec<BudgetLine> {
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ BUDGET_STREAM);

        let accounts: Vec<&Account> = self
            .chart
            .accounts()
            .filter(|a| {
                a.kind == AccountKind::Expense && OpexCategory::from_group(a.group_code).is_some()
            })
            .collect();

        let mut lines = Vec::new();
        for (year, month) in month_sequence(self.config.start_date, self.config.end_date) {
            let period = period_key(first_day_of_month(year, month));

            for cost_center in &self.config.dimensions.cost_centers {
                for account in &accounts {
                    let planned = round2(rng.gen_range(PLAN_MIN..=PLAN_MAX));
                    let actual =
                        round2(planned * rng.gen_range(ACTUAL_DRIFT_MIN..=ACTUAL_DRIFT_MAX));

                    lines.push(BudgetLine {
                        cost_center: cost_center.clone(),
                        account_id: account.id.clone(),
                        period: period.clone(),
                        planned,
                        actual,
                        variance: round2(actual - planned),
                        variance_pct: round1((actual / planned - 1.0) * 100.0),
                    });
                }
            }
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn one_month_config() -> SimulationConfig {
        SimulationConfig {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_full_grid_for_one_month() {
        let config = one_month_config();
        let chart = ChartOfAccounts::standard();
        let lines = BudgetPlanner::new(&config, &chart).plan();

        let opex_accounts = chart
            .accounts()
            .filter(|a| {
                a.kind == AccountKind::Expense && OpexCategory::from_group(a.group_code).is_some()
            })
            .count();

        assert_eq!(
            lines.len(),
            config.dimensions.cost_centers.len() * opex_accounts
        );
        assert!(lines.iter().all(|l| l.period == "2023-01"));
    }

    #[test]
    fn test_depreciation_and_tax_accounts_excluded() {
        let config = one_month_config();
        let chart = ChartOfAccounts::standard();
        let lines = BudgetPlanner::new(&config, &chart).plan();

        assert!(lines.iter().all(|l| l.account_id != "551" && l.account_id != "591"));
        assert!(lines.iter().any(|l| l.account_id == "501"));
        assert!(lines.iter().any(|l| l.account_id == "518"));
    }

    #[test]
    fn test_variance_fields_consistent() {
        let config = one_month_config();
        let chart = ChartOfAccounts::standard();
        let lines = BudgetPlanner::new(&config, &chart).plan();

        for line in &lines {
            assert!(line.planned >= PLAN_MIN && line.planned <= PLAN_MAX);
            assert_eq!(line.variance, round2(line.actual - line.planned));
            assert!(
                line.variance_pct >= -30.1 && line.variance_pct <= 30.1,
                "variance_pct {} out of the drift band",
                line.variance_pct
            );
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let config = one_month_config();
        let chart = ChartOfAccounts::standard();

        let first = BudgetPlanner::new(&config, &chart).plan();
        let second = BudgetPlanner::new(&config, &chart).plan();
        assert_eq!(first, second);
    }

    #[test]
    fn test_budget_independent_of_ledger_stream() {
        let config = one_month_config();
        let chart = ChartOfAccounts::standard();
        let baseline = BudgetPlanner::new(&config, &chart).plan();

        // Changing ledger-only knobs must not move budget draws.
        let mut shifted = one_month_config();
        shifted.noise_entries_per_month = 9;
        let after = BudgetPlanner::new(&shifted, &chart).plan();

        assert_eq!(baseline, after);
    }
}
