use crate::calendar::period_key;
use crate::chart::ChartOfAccounts;
use crate::error::Result;
use crate::schema::{
    round1, round2, AccountKind, AccountRole, BudgetLine, CapexRow, KpiRecord, LedgerEntry,
    OpexBreakdownRow, OpexCategory, PayrollLine, PersonnelCostRow, ReconciliationRecord,
    SalesChannel, SalesChannelRow, SalesLine,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Denominator floor for ROA/ROE so early periods with a thin balance sheet
/// do not explode the ratio.
const RETURN_RATIO_FLOOR: f64 = 1_000_000.0;

/// Cap applied to DSO and DPO after rounding.
const WORKING_CAPITAL_DAYS_CAP: f64 = 120.0;

// Raw sums folded from one month of posted entries.
struct PeriodBucket {
    revenue: f64,
    cogs: f64,
    opex: f64,
    depreciation: f64,
    income_tax: f64,
    asset_debit: f64,
    asset_credit: f64,
    equity_debit: f64,
    equity_credit: f64,
    liability_debit: f64,
    liability_credit: f64,
    cash_inflow: f64,
    cash_outflow: f64,
    receivables_delta: f64,
    payables_delta: f64,
}

impl PeriodBucket {
    fn new() -> Self {
        Self {
            revenue: 0.0,
            cogs: 0.0,
            opex: 0.0,
            depreciation: 0.0,
            income_tax: 0.0,
            asset_debit: 0.0,
            asset_credit: 0.0,
            equity_debit: 0.0,
            equity_credit: 0.0,
            liability_debit: 0.0,
            liability_credit: 0.0,
            cash_inflow: 0.0,
            cash_outflow: 0.0,
            receivables_delta: 0.0,
            payables_delta: 0.0,
        }
    }
}

/// Folds a ledger into monthly KPI records and the dashboard side tables.
/// Only `Posted` entries participate; an entry referencing an account the
/// chart does not know fails the whole run.
pub struct PeriodAggregator<'a> {
    chart: &'a ChartOfAccounts,
}

impl<'a> PeriodAggregator<'a> {
    pub fn new(chart: &'a ChartOfAccounts) -> Self {
        Self { chart }
    }

    pub fn aggregate(&self, entries: &[LedgerEntry]) -> Result<Vec<KpiRecord>> {
        let buckets = self.fold_entries(entries)?;
        Ok(derive_kpis(buckets))
    }

    fn fold_entries(&self, entries: &[LedgerEntry]) -> Result<BTreeMap<(i32, u32), PeriodBucket>> {
        let mut buckets: BTreeMap<(i32, u32), PeriodBucket> = BTreeMap::new();

        for entry in entries.iter().filter(|e| e.status.is_posted()) {
            let debit = self.chart.require(&entry.debit_account, "KPI aggregation")?;
            let credit = self.chart.require(&entry.credit_account, "KPI aggregation")?;

            let bucket = buckets
                .entry((entry.date.year(), entry.date.month()))
                .or_insert_with(PeriodBucket::new);
            let amount = entry.amount_base;

            match debit.role {
                AccountRole::CostOfGoods => bucket.cogs += amount,
                AccountRole::Depreciation => bucket.depreciation += amount,
                AccountRole::IncomeTax => bucket.income_tax += amount,
                AccountRole::OperatingExpense => bucket.opex += amount,
                AccountRole::Cash => {
                    bucket.asset_debit += amount;
                    bucket.cash_inflow += amount;
                }
                AccountRole::Receivable => {
                    bucket.asset_debit += amount;
                    bucket.receivables_delta += amount;
                }
                AccountRole::Payable => {
                    bucket.liability_debit += amount;
                    bucket.payables_delta -= amount;
                }
                AccountRole::Equity => bucket.equity_debit += amount,
                AccountRole::Liability => bucket.liability_debit += amount,
                // Revenue debits do not occur in generated data.
                AccountRole::Revenue => {}
                AccountRole::Other => match debit.kind {
                    AccountKind::Asset => bucket.asset_debit += amount,
                    AccountKind::Liability => bucket.liability_debit += amount,
                    _ => {}
                },
            }

            match credit.role {
                AccountRole::Revenue => bucket.revenue += amount,
                AccountRole::Cash => {
                    bucket.asset_credit += amount;
                    bucket.cash_outflow += amount;
                }
                AccountRole::Receivable => {
                    bucket.asset_credit += amount;
                    bucket.receivables_delta -= amount;
                }
                AccountRole::Payable => {
                    bucket.liability_credit += amount;
                    bucket.payables_delta += amount;
                }
                AccountRole::Equity => bucket.equity_credit += amount,
                AccountRole::Liability => bucket.liability_credit += amount,
                // Expense credits do not occur in generated data.
                AccountRole::CostOfGoods
                | AccountRole::Depreciation
                | AccountRole::IncomeTax
                | AccountRole::OperatingExpense => {}
                AccountRole::Other => match credit.kind {
                    AccountKind::Asset => bucket.asset_credit += amount,
                    AccountKind::Liability => bucket.liability_credit += amount,
                    _ => {}
                },
            }
        }

        Ok(buckets)
    }

    /// Groups budget lines by period, cost center, and expense category.
    /// Accounts outside the six operating categories (depreciation, income
    /// tax) are left out.
    pub fn opex_breakdown(&self, budget: &[BudgetLine]) -> Result<Vec<OpexBreakdownRow>> {
        let mut grouped: BTreeMap<(String, String, OpexCategory), (f64, f64)> = BTreeMap::new();

        for line in budget {
            let account = self.chart.require(&line.account_id, "budget breakdown")?;
            let category = match OpexCategory::from_group(account.group_code) {
                Some(category) => category,
                None => continue,
            };

            let slot = grouped
                .entry((line.period.clone(), line.cost_center.clone(), category))
                .or_insert((0.0, 0.0));
            slot.0 += line.planned;
            slot.1 += line.actual;
        }

        Ok(grouped
            .into_iter()
            .map(|((period, cost_center, category), (planned, actual))| OpexBreakdownRow {
                period,
                cost_center,
                category,
                planned: round2(planned),
                actual: round2(actual),
                variance: round2(actual - planned),
            })
            .collect())
    }

    /// Monthly investment (assets placed in service), depreciation charge,
    /// and the running accumulated depreciation balance.
    pub fn capex_summary(&self, entries: &[LedgerEntry]) -> Result<Vec<CapexRow>> {
        let mut invested: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        let mut depreciated: BTreeMap<(i32, u32), f64> = BTreeMap::new();

        for entry in entries.iter().filter(|e| e.status.is_posted()) {
            let debit = self.chart.require(&entry.debit_account, "capex summary")?;
            let credit = self.chart.require(&entry.credit_account, "capex summary")?;
            let key = (entry.date.year(), entry.date.month());

            // Activation moves value from assets under construction (group
            // 04) into a depreciable asset group; opening balances do not
            // match this shape and stay out.
            if debit.kind == AccountKind::Asset
                && credit.kind == AccountKind::Asset
                && credit.group_code == 4
            {
                *invested.entry(key).or_insert(0.0) += entry.amount_base;
            }
            if debit.role == AccountRole::Depreciation {
                *depreciated.entry(key).or_insert(0.0) += entry.amount_base;
            }
        }

        let mut keys: Vec<(i32, u32)> = invested.keys().chain(depreciated.keys()).copied().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut accumulated = 0.0;
        let rows = keys
            .into_iter()
            .map(|key| {
                let investment = invested.get(&key).copied().unwrap_or(0.0);
                let depreciation = depreciated.get(&key).copied().unwrap_or(0.0);
                accumulated += depreciation;
                CapexRow {
                    period: format!("{:04}-{:02}", key.0, key.1),
                    investment: round2(investment),
                    depreciation: round2(depreciation),
                    accumulated_depreciation: round2(accumulated),
                }
            })
            .collect();

        Ok(rows)
    }
}

fn derive_kpis(buckets: BTreeMap<(i32, u32), PeriodBucket>) -> Vec<KpiRecord> {
    let mut records = Vec::with_capacity(buckets.len());

    let mut cumulative_assets = 0.0;
    let mut cumulative_equity = 0.0;
    let mut cumulative_liabilities = 0.0;
    let mut ytd_net_income = 0.0;
    let mut current_year = None;

    for ((year, month), bucket) in buckets {
        let revenue = bucket.revenue;
        let total_expenses = bucket.cogs + bucket.opex + bucket.depreciation + bucket.income_tax;
        let gross_profit = revenue - bucket.cogs;
        let ebitda = revenue - bucket.cogs - bucket.opex;
        let ebit = ebitda - bucket.depreciation;
        let net_income = revenue - total_expenses;

        if current_year != Some(year) {
            ytd_net_income = 0.0;
            current_year = Some(year);
        }
        ytd_net_income += net_income;
        let annualized_net_income = ytd_net_income / month as f64 * 12.0;

        cumulative_assets += bucket.asset_debit - bucket.asset_credit;
        cumulative_equity += bucket.equity_credit - bucket.equity_debit;
        cumulative_liabilities += bucket.liability_credit - bucket.liability_debit;

        let dso_days = if revenue > 0.0 {
            round1(bucket.receivables_delta.abs() / (revenue / 30.0)).min(WORKING_CAPITAL_DAYS_CAP)
        } else {
            0.0
        };
        let dpo_days = if bucket.opex > 0.0 {
            round1(bucket.payables_delta.abs() / (bucket.opex / 30.0))
                .min(WORKING_CAPITAL_DAYS_CAP)
        } else {
            0.0
        };

        records.push(KpiRecord {
            period: format!("{:04}-{:02}", year, month),
            revenue: round2(revenue),
            cogs: round2(bucket.cogs),
            gross_profit: round2(gross_profit),
            gross_margin_pct: margin_pct(gross_profit, revenue),
            ebitda: round2(ebitda),
            ebitda_margin_pct: margin_pct(ebitda, revenue),
            ebit: round2(ebit),
            net_income: round2(net_income),
            depreciation: round2(bucket.depreciation),
            total_assets: round2(cumulative_assets),
            total_equity: round2(cumulative_equity),
            total_liabilities: round2(cumulative_liabilities),
            dso_days,
            dpo_days,
            roa_pct: return_pct(annualized_net_income, cumulative_assets),
            roe_pct: return_pct(annualized_net_income, cumulative_equity),
            cash_inflow: round2(bucket.cash_inflow),
            cash_outflow: round2(bucket.cash_outflow),
            net_cashflow: round2(bucket.cash_inflow - bucket.cash_outflow),
            burn_rate: round2(bucket.cash_outflow),
        });
    }

    records
}

fn margin_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round2(part / whole * 100.0)
    } else {
        0.0
    }
}

fn return_pct(annualized_net_income: f64, base: f64) -> f64 {
    let denominator = base.abs().max(RETURN_RATIO_FLOOR);
    round2((annualized_net_income / denominator * 100.0).clamp(-100.0, 100.0))
}

/// Joins monthly payroll facts with the revenue of the same period.
pub fn personnel_costs(payroll: &[PayrollLine], kpis: &[KpiRecord]) -> Vec<PersonnelCostRow> {
    let revenue_by_period: BTreeMap<&str, f64> = kpis
        .iter()
        .map(|k| (k.period.as_str(), k.revenue))
        .collect();

    payroll
        .iter()
        .map(|line| {
            let revenue = revenue_by_period
                .get(line.period.as_str())
                .copied()
                .unwrap_or(0.0);
            let share = if revenue > 0.0 {
                round2(line.total_cost / revenue * 100.0)
            } else {
                0.0
            };
            PersonnelCostRow {
                period: line.period.clone(),
                gross_wages: line.gross_wages,
                employer_contributions: line.employer_contributions,
                total_cost: line.total_cost,
                share_of_revenue_pct: share,
            }
        })
        .collect()
}

/// Groups sales invoices by period and channel.
pub fn sales_by_channel(sales: &[SalesLine]) -> Vec<SalesChannelRow> {
    let mut grouped: BTreeMap<(String, SalesChannel), (usize, f64, f64)> = BTreeMap::new();

    for line in sales {
        let slot = grouped
            .entry((period_key(line.date), line.channel))
            .or_insert((0, 0.0, 0.0));
        slot.0 += 1;
        slot.1 += line.net_amount;
        slot.2 += line.vat_amount;
    }

    grouped
        .into_iter()
        .map(|((period, channel), (count, net, vat))| SalesChannelRow {
            period,
            channel,
            invoice_count: count,
            net_revenue: round2(net),
            vat_amount: round2(vat),
            average_invoice: round2(net / count as f64),
        })
        .collect()
}

/// Everything a reporting frontend needs, bundled for one JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub kpis: Vec<KpiRecord>,
    pub reconciliation: Vec<ReconciliationRecord>,
    pub opex_breakdown: Vec<OpexBreakdownRow>,
    pub capex: Vec<CapexRow>,
    pub personnel: Vec<PersonnelCostRow>,
    pub sales_channels: Vec<SalesChannelRow>,
}

impl DashboardData {
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntheticLedgerError;
    use crate::schema::{CurrencyCode, DocumentType, PostingStatus};
    use chrono::NaiveDate;

    fn entry(date: &str, debit: &str, credit: &str, amount: f64) -> LedgerEntry {
        LedgerEntry {
            id: "TX0000001".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            document_type: DocumentType::Internal,
            amount,
            currency: CurrencyCode::CZK,
            fx_rate: 1.0,
            amount_base: amount,
            vat_rate: 0.0,
            vat_amount: 0.0,
            debit_account: debit.to_string(),
            credit_account: credit.to_string(),
            cost_center: "STR001".to_string(),
            project: "PROJ001".to_string(),
            profit_center: "PC01".to_string(),
            branch: "POB01".to_string(),
            description: "test".to_string(),
            status: PostingStatus::Posted,
            created_by: "USR001".to_string(),
        }
    }

    #[test]
    fn test_income_statement_kpis() {
        let chart = ChartOfAccounts::standard();
        let entries = vec![
            entry("2023-01-10", "311", "601", 1000.0),
            entry("2023-01-12", "501", "321", 450.0),
            entry("2023-01-15", "518", "321", 100.0),
            entry("2023-01-31", "551", "082", 50.0),
            entry("2023-01-31", "591", "341", 30.0),
        ];

        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        assert_eq!(kpis.len(), 1);

        let january = &kpis[0];
        assert_eq!(january.period, "2023-01");
        assert_eq!(january.revenue, 1000.0);
        assert_eq!(january.cogs, 450.0);
        assert_eq!(january.gross_profit, 550.0);
        assert_eq!(january.gross_margin_pct, 55.0);
        assert_eq!(january.ebitda, 450.0);
        assert_eq!(january.ebitda_margin_pct, 45.0);
        assert_eq!(january.ebit, 400.0);
        assert_eq!(january.net_income, 370.0);
        assert_eq!(january.depreciation, 50.0);
    }

    #[test]
    fn test_balance_sheet_accumulates_across_periods() {
        let chart = ChartOfAccounts::standard();
        let entries = vec![
            entry("2023-01-01", "221", "701", 1000.0),
            entry("2023-01-01", "701", "411", 1000.0),
            entry("2023-02-10", "311", "601", 500.0),
        ];

        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        assert_eq!(kpis.len(), 2);

        assert_eq!(kpis[0].total_assets, 1000.0);
        assert_eq!(kpis[0].total_equity, 1000.0);
        assert_eq!(kpis[1].total_assets, 1500.0);
        assert_eq!(kpis[1].total_equity, 1000.0);
    }

    #[test]
    fn test_cash_flow_buckets() {
        let chart = ChartOfAccounts::standard();
        let entries = vec![
            entry("2023-01-05", "221", "311", 800.0),
            entry("2023-01-20", "321", "221", 300.0),
        ];

        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        let january = &kpis[0];

        assert_eq!(january.cash_inflow, 800.0);
        assert_eq!(january.cash_outflow, 300.0);
        assert_eq!(january.net_cashflow, 500.0);
        assert_eq!(january.burn_rate, 300.0);
    }

    #[test]
    fn test_draft_and_voided_entries_ignored() {
        let chart = ChartOfAccounts::standard();
        let mut draft = entry("2023-01-10", "311", "601", 999.0);
        draft.status = PostingStatus::Draft;
        let mut voided = entry("2023-01-11", "311", "601", 999.0);
        voided.status = PostingStatus::Voided;
        let entries = vec![draft, voided, entry("2023-01-12", "311", "601", 100.0)];

        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        assert_eq!(kpis[0].revenue, 100.0);
    }

    #[test]
    fn test_unknown_account_is_fatal() {
        let chart = ChartOfAccounts::standard();
        let entries = vec![entry("2023-01-10", "999", "601", 100.0)];

        let result = PeriodAggregator::new(&chart).aggregate(&entries);
        assert!(matches!(
            result,
            Err(SyntheticLedgerError::UnknownAccount { account_id, .. }) if account_id == "999"
        ));
    }

    #[test]
    fn test_dso_capped_at_120_days() {
        let chart = ChartOfAccounts::standard();
        // Large uncollected invoice, tiny revenue base.
        let entries = vec![entry("2023-01-10", "311", "601", 10.0)];

        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        // Delta equals revenue here, so raw DSO would be 30 days.
        assert_eq!(kpis[0].dso_days, 30.0);

        let entries = vec![
            entry("2023-01-10", "311", "601", 10.0),
            entry("2023-01-11", "311", "343", 10_000.0),
        ];
        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        assert_eq!(kpis[0].dso_days, 120.0);
    }

    #[test]
    fn test_ytd_net_income_resets_each_year() {
        let chart = ChartOfAccounts::standard();
        let entries = vec![
            entry("2023-12-10", "311", "601", 100.0),
            entry("2024-01-10", "311", "601", 200.0),
        ];

        let kpis = PeriodAggregator::new(&chart).aggregate(&entries).unwrap();
        assert_eq!(kpis.len(), 2);

        // December annualizes over 12 months, January over 1.
        assert_eq!(kpis[0].roa_pct, round2(100.0 / 1_000_000.0 * 100.0));
        assert_eq!(kpis[1].roa_pct, round2(200.0 * 12.0 / 1_000_000.0 * 100.0));
    }

    #[test]
    fn test_opex_breakdown_skips_non_operating_groups() {
        let chart = ChartOfAccounts::standard();
        let budget = vec![
            BudgetLine {
                cost_center: "STR001".to_string(),
                account_id: "501".to_string(),
                period: "2023-01".to_string(),
                planned: 100.0,
                actual: 120.0,
                variance: 20.0,
                variance_pct: 20.0,
            },
            BudgetLine {
                cost_center: "STR001".to_string(),
                account_id: "518".to_string(),
                period: "2023-01".to_string(),
                planned: 50.0,
                actual: 40.0,
                variance: -10.0,
                variance_pct: -20.0,
            },
            BudgetLine {
                cost_center: "STR001".to_string(),
                account_id: "551".to_string(),
                period: "2023-01".to_string(),
                planned: 70.0,
                actual: 70.0,
                variance: 0.0,
                variance_pct: 0.0,
            },
        ];

        let rows = PeriodAggregator::new(&chart).opex_breakdown(&budget).unwrap();
        assert_eq!(rows.len(), 2, "depreciation group must be excluded");

        let materials = rows
            .iter()
            .find(|r| r.category == OpexCategory::MaterialsAndEnergy)
            .unwrap();
        assert_eq!(materials.planned, 100.0);
        assert_eq!(materials.variance, 20.0);
    }

    #[test]
    fn test_capex_summary_accumulates_depreciation() {
        let chart = ChartOfAccounts::standard();
        let entries = vec![
            entry("2023-01-15", "042", "321", 600.0),
            entry("2023-01-31", "022", "042", 600.0),
            entry("2023-01-31", "551", "082", 10.0),
            entry("2023-02-28", "551", "082", 10.0),
        ];

        let rows = PeriodAggregator::new(&chart).capex_summary(&entries).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].investment, 600.0);
        assert_eq!(rows[0].accumulated_depreciation, 10.0);
        assert_eq!(rows[1].investment, 0.0);
        assert_eq!(rows[1].accumulated_depreciation, 20.0);
    }

    #[test]
    fn test_sales_by_channel_grouping() {
        let sales = vec![
            SalesLine {
                invoice_ref: "FAV000001".to_string(),
                date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
                channel: SalesChannel::Online,
                net_amount: 100.0,
                vat_amount: 21.0,
                currency: CurrencyCode::CZK,
                collected_on: None,
            },
            SalesLine {
                invoice_ref: "FAV000002".to_string(),
                date: NaiveDate::from_ymd_opt(2023, 1, 9).unwrap(),
                channel: SalesChannel::Online,
                net_amount: 300.0,
                vat_amount: 63.0,
                currency: CurrencyCode::CZK,
                collected_on: None,
            },
            SalesLine {
                invoice_ref: "FAV000003".to_string(),
                date: NaiveDate::from_ymd_opt(2023, 1, 9).unwrap(),
                channel: SalesChannel::Branch,
                net_amount: 50.0,
                vat_amount: 10.5,
                currency: CurrencyCode::CZK,
                collected_on: None,
            },
        ];

        let rows = sales_by_channel(&sales);
        assert_eq!(rows.len(), 2);

        let online = rows.iter().find(|r| r.channel == SalesChannel::Online).unwrap();
        assert_eq!(online.invoice_count, 2);
        assert_eq!(online.net_revenue, 400.0);
        assert_eq!(online.average_invoice, 200.0);
    }

    #[test]
    fn test_personnel_share_of_revenue() {
        let payroll = vec![PayrollLine {
            period: "2023-01".to_string(),
            gross_wages: 250.0,
            employer_contributions: 84.5,
            total_cost: 334.5,
            paid_on: None,
        }];
        let chart = ChartOfAccounts::standard();
        let kpis = PeriodAggregator::new(&chart)
            .aggregate(&[entry("2023-01-10", "311", "601", 1000.0)])
            .unwrap();

        let rows = personnel_costs(&payroll, &kpis);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].share_of_revenue_pct, 33.45);
    }
}
