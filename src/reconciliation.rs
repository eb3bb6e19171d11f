use crate::error::{Result, SyntheticLedgerError};
use crate::schema::{round2, KpiRecord, ReconciliationRecord, ReconciliationStatus};
use log::warn;

/// Default tolerance in base currency. Rounding of per-invoice postings and
/// of the reported KPI fields accumulates a few units per period, nothing
/// near this bound.
pub const DEFAULT_TOLERANCE: f64 = 1000.0;

/// Checks assets = liabilities + equity + cumulative net income per period,
/// on the reported (rounded) KPI fields. Net income is added back because
/// no period-close entries transfer it into equity.
pub struct ReconciliationChecker {
    tolerance: f64,
}

impl Default for ReconciliationChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationChecker {
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn check(&self, kpis: &[KpiRecord]) -> Vec<ReconciliationRecord> {
        let mut cumulative_net_income = 0.0;
        let mut records = Vec::with_capacity(kpis.len());

        for kpi in kpis {
            // Unlike the YTD figure in the KPIs, this accumulator never
            // resets; retained earnings stay on this side of the identity.
            cumulative_net_income += kpi.net_income;

            let right_side = kpi.total_liabilities + kpi.total_equity + cumulative_net_income;
            let difference = round2(kpi.total_assets - right_side);

            let status = if difference.abs() < self.tolerance {
                ReconciliationStatus::Ok
            } else {
                warn!(
                    "Reconciliation failed in {}: assets {:.2} vs liabilities {:.2} + equity {:.2} + net income {:.2}",
                    kpi.period, kpi.total_assets, kpi.total_liabilities, kpi.total_equity, cumulative_net_income
                );
                ReconciliationStatus::Fail
            };

            records.push(ReconciliationRecord {
                period: kpi.period.clone(),
                assets: kpi.total_assets,
                liabilities: kpi.total_liabilities,
                equity: kpi.total_equity,
                cumulative_net_income: round2(cumulative_net_income),
                difference,
                status,
            });
        }

        records
    }

    /// Like `check`, but the first failing period aborts with an error.
    pub fn verify(&self, kpis: &[KpiRecord]) -> Result<Vec<ReconciliationRecord>> {
        let records = self.check(kpis);

        if let Some(failure) = records
            .iter()
            .find(|r| r.status == ReconciliationStatus::Fail)
        {
            return Err(SyntheticLedgerError::ReconciliationViolation {
                period: failure.period.clone(),
                assets: failure.assets,
                liabilities: failure.liabilities,
                equity: failure.equity,
                net_income: failure.cumulative_net_income,
            });
        }

        Ok(records)
    }
}
