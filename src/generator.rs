use crate::calendar::{
    day_in_next_month, days_after, first_day_of_month, last_day_of_month, month_sequence,
    months_between, period_key,
};
use crate::chart::ChartOfAccounts;
use crate::error::Result;
use crate::schema::{
    round2, CurrencyCode, DocumentType, LedgerEntry, PayrollLine, PostingStatus, SalesChannel,
    SalesLine, SimulationConfig,
};
use crate::seasonality::{growth_multiplier, profile_factors};
use chrono::{Datelike, NaiveDate};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Pareto};
use serde::{Deserialize, Serialize};

pub const ACC_MACHINERY: &str = "022";
pub const ACC_ASSETS_UNDER_CONSTRUCTION: &str = "042";
pub const ACC_ACCUMULATED_DEPRECIATION: &str = "082";
pub const ACC_PETTY_CASH: &str = "211";
pub const ACC_BANK: &str = "221";
pub const ACC_RECEIVABLES: &str = "311";
pub const ACC_PAYABLES: &str = "321";
pub const ACC_PAYROLL_LIABILITIES: &str = "331";
pub const ACC_SOCIAL_LIABILITIES: &str = "336";
pub const ACC_INCOME_TAX_LIABILITY: &str = "341";
pub const ACC_VAT: &str = "343";
pub const ACC_SHARE_CAPITAL: &str = "411";
pub const ACC_MATERIALS: &str = "501";
pub const ACC_SERVICES: &str = "518";
pub const ACC_WAGES: &str = "521";
pub const ACC_SOCIAL_EXPENSE: &str = "524";
pub const ACC_OTHER_OPERATING: &str = "548";
pub const ACC_DEPRECIATION_EXPENSE: &str = "551";
pub const ACC_INCOME_TAX_EXPENSE: &str = "591";
pub const ACC_REVENUE: &str = "601";
pub const ACC_OPENING_BALANCE: &str = "701";

/// Every account the generator posts to. Checked against the chart up
/// front so a missing account fails construction instead of aggregation.
pub const REQUIRED_ACCOUNTS: &[&str] = &[
    ACC_MACHINERY,
    ACC_ASSETS_UNDER_CONSTRUCTION,
    ACC_ACCUMULATED_DEPRECIATION,
    ACC_PETTY_CASH,
    ACC_BANK,
    ACC_RECEIVABLES,
    ACC_PAYABLES,
    ACC_PAYROLL_LIABILITIES,
    ACC_SOCIAL_LIABILITIES,
    ACC_INCOME_TAX_LIABILITY,
    ACC_VAT,
    ACC_SHARE_CAPITAL,
    ACC_MATERIALS,
    ACC_SERVICES,
    ACC_WAGES,
    ACC_SOCIAL_EXPENSE,
    ACC_OTHER_OPERATING,
    ACC_DEPRECIATION_EXPENSE,
    ACC_INCOME_TAX_EXPENSE,
    ACC_REVENUE,
    ACC_OPENING_BALANCE,
];

// Currency mix of generated invoices. Rates are flat per CurrencyCode::rate.
const SALES_EUR_SHARE: f64 = 0.15;
const PURCHASE_EUR_SHARE: f64 = 0.10;
const PURCHASE_USD_SHARE: f64 = 0.05;

const NOISE_AMOUNT_MIN: f64 = 500.0;
const NOISE_AMOUNT_MAX: f64 = 20_000.0;

/// Complete generator output. Entries are sorted by (date, id); the side
/// fact vectors are sorted by date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedLedger {
    pub entries: Vec<LedgerEntry>,
    pub sales: Vec<SalesLine>,
    pub payroll: Vec<PayrollLine>,
}

/// Mutable cursor threaded through the monthly generation steps. All
/// randomness, document numbering, and cross-month carry-over lives here;
/// the generator itself stays immutable after construction.
pub struct GeneratorState {
    rng: StdRng,
    next_entry: u64,
    next_sales_invoice: u64,
    next_purchase_invoice: u64,
    next_capex: u64,
    /// Straight-line charge to post each month, grown by capex activations.
    monthly_depreciation: f64,
    /// Rounded base-currency VAT posted in the current month.
    output_vat: f64,
    input_vat: f64,
    ytd_net_revenue: f64,
}

impl GeneratorState {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_entry: 1,
            next_sales_invoice: 1,
            next_purchase_invoice: 1,
            next_capex: 1,
            monthly_depreciation: 0.0,
            output_vat: 0.0,
            input_vat: 0.0,
            ytd_net_revenue: 0.0,
        }
    }

    fn next_entry_id(&mut self) -> String {
        let id = format!("TX{:07}", self.next_entry);
        self.next_entry += 1;
        id
    }

    fn next_sales_ref(&mut self) -> String {
        let id = format!("FAV{:06}", self.next_sales_invoice);
        self.next_sales_invoice += 1;
        id
    }

    fn next_purchase_ref(&mut self) -> String {
        let id = format!("FAP{:06}", self.next_purchase_invoice);
        self.next_purchase_invoice += 1;
        id
    }

    fn next_capex_ref(&mut self) -> String {
        let id = format!("CAP{:05}", self.next_capex);
        self.next_capex += 1;
        id
    }
}

// Dimension stamp and author shared by every row of one event.
struct EventStamp {
    cost_center: String,
    project: String,
    profit_center: String,
    branch: String,
    created_by: String,
}

// One row of an event, before ids and currency conversion are applied.
struct Posting<'a> {
    date: NaiveDate,
    document_type: DocumentType,
    currency: CurrencyCode,
    amount: f64,
    vat_rate: f64,
    vat_amount: f64,
    debit: &'static str,
    credit: &'static str,
    description: String,
    status: PostingStatus,
    stamp: &'a EventStamp,
}

impl<'a> Posting<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        date: NaiveDate,
        document_type: DocumentType,
        currency: CurrencyCode,
        amount: f64,
        debit: &'static str,
        credit: &'static str,
        description: String,
        stamp: &'a EventStamp,
    ) -> Self {
        Self {
            date,
            document_type,
            currency,
            amount,
            vat_rate: 0.0,
            vat_amount: 0.0,
            debit,
            credit,
            description,
            status: PostingStatus::Posted,
            stamp,
        }
    }
}

/// Deterministic double-entry ledger generator. Construction validates the
/// configuration and the chart; `generate` then runs the monthly event
/// loop and cannot fail.
pub struct LedgerGenerator<'a> {
    config: &'a SimulationConfig,
    seasonal_factors: Vec<f64>,
    invoice_amounts: Pareto<f64>,
    purchase_amounts: Pareto<f64>,
    revenue_jitter: Normal<f64>,
}

impl<'a> LedgerGenerator<'a> {
    pub fn new(config: &'a SimulationConfig, chart: &ChartOfAccounts) -> Result<Self> {
        crate::validate_config(config, chart)?;

        let seasonal_factors = profile_factors(&config.seasonality)?;

        // Bounds and shapes were validated above, so construction cannot fail.
        let invoice_amounts =
            Pareto::new(config.invoice_amount_min, config.invoice_shape).unwrap();
        let purchase_amounts =
            Pareto::new(config.purchase_amount_min, config.purchase_shape).unwrap();
        let revenue_jitter = Normal::new(0.0, config.revenue_jitter).unwrap();

        Ok(Self {
            config,
            seasonal_factors,
            invoice_amounts,
            purchase_amounts,
            revenue_jitter,
        })
    }

    pub fn generate(&self) -> Result<GeneratedLedger> {
        let mut state = GeneratorState::new(self.config.seed);
        let mut out = GeneratedLedger {
            entries: Vec::new(),
            sales: Vec::new(),
            payroll: Vec::new(),
        };

        for (index, (year, month)) in month_sequence(self.config.start_date, self.config.end_date)
            .into_iter()
            .enumerate()
        {
            self.run_month(&mut state, &mut out, year, month, index == 0);
        }

        // Lagged settlements are created out of order; a stable ledger order
        // is part of the output contract.
        out.entries
            .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        out.sales
            .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.invoice_ref.cmp(&b.invoice_ref)));

        Ok(out)
    }

    fn run_month(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
        first_month: bool,
    ) {
        let period = period_key(first_day_of_month(year, month));
        let before = out.entries.len();

        // 1. Reset the per-month VAT position, and the tax base each January.
        state.output_vat = 0.0;
        state.input_vat = 0.0;
        if month == 1 {
            state.ytd_net_revenue = 0.0;
        }

        // 2. Opening balances seed cash, fixed assets, and capital once.
        if first_month {
            self.post_opening_balances(state, out);
        }

        // 3. Sales invoices until the seasonal revenue target is recognized.
        let revenue_target = self.monthly_revenue_target(state, year, month);
        self.run_sales(state, out, year, month, revenue_target);

        // 4. Purchase invoices covering COGS and services for the same target.
        self.run_purchases(state, out, year, month, revenue_target);

        // 5. Payroll accrued at month end, settled on the 15th of the next month.
        self.run_payroll(state, out, year, month, revenue_target);

        // 6. Occasional capital expenditure, activated at month end.
        self.maybe_run_capex(state, out, year, month);

        // 7. Straight-line depreciation of everything activated so far.
        self.post_depreciation(state, out, year, month);

        // 8. VAT settlement on the 25th of the following month.
        self.settle_vat(state, out, year, month);

        // 9. December accrues income tax on the year's revenue proxy.
        if month == 12 {
            self.accrue_income_tax(state, out, year);
        }

        // 10. Draft and voided petty-cost rows that never reach aggregation.
        self.post_noise(state, out, year, month);

        debug!(
            "Generated {} entries for {}",
            out.entries.len() - before,
            period
        );
    }

    fn monthly_revenue_target(&self, state: &mut GeneratorState, year: i32, month: u32) -> f64 {
        let elapsed = months_between(
            first_day_of_month(self.config.start_date.year(), self.config.start_date.month()),
            first_day_of_month(year, month),
        );
        let year_index = elapsed / 12;

        let seasonal = self.seasonal_factors[(month - 1) as usize];
        let growth = growth_multiplier(self.config.annual_growth, year_index);
        // Bounded away from zero so the target stays positive.
        let jitter = (1.0 + self.revenue_jitter.sample(&mut state.rng)).max(0.05);

        self.config.base_monthly_revenue * seasonal * growth * jitter
    }

    fn post_opening_balances(&self, state: &mut GeneratorState, out: &mut GeneratedLedger) {
        let opening = &self.config.opening_balances;
        let date = self.config.start_date;
        let stamp = self.draw_stamp(state);

        self.push(
            state,
            &mut out.entries,
            Posting::new(
                date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                opening.cash,
                ACC_BANK,
                ACC_OPENING_BALANCE,
                "Opening balance - bank accounts".to_string(),
                &stamp,
            ),
        );
        self.push(
            state,
            &mut out.entries,
            Posting::new(
                date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                opening.fixed_assets,
                ACC_MACHINERY,
                ACC_OPENING_BALANCE,
                "Opening balance - machinery and equipment".to_string(),
                &stamp,
            ),
        );
        self.push(
            state,
            &mut out.entries,
            Posting::new(
                date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                opening.equity,
                ACC_OPENING_BALANCE,
                ACC_SHARE_CAPITAL,
                "Opening balance - share capital".to_string(),
                &stamp,
            ),
        );

        // The opening asset base depreciates from the first month.
        state.monthly_depreciation +=
            opening.fixed_assets / self.config.depreciation_life_months as f64;
    }

    fn run_sales(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
        target: f64,
    ) {
        let days = last_day_of_month(year, month).day();
        let mut recognized = 0.0;

        while recognized < target {
            let stamp = self.draw_stamp(state);
            let day = state.rng.gen_range(1..=days);
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();

            let currency = self.draw_sales_currency(state);
            let net = round2(self.draw_invoice_amount(state) / currency.rate());
            let vat = round2(net * self.config.vat_rate);

            let invoice_ref = state.next_sales_ref();
            let channel = SalesChannel::ALL[state.rng.gen_range(0..SalesChannel::ALL.len())];

            let net_posted = self.push(
                state,
                &mut out.entries,
                Posting {
                    vat_rate: self.config.vat_rate,
                    vat_amount: vat,
                    ..Posting::new(
                        date,
                        DocumentType::SalesInvoice,
                        currency,
                        net,
                        ACC_RECEIVABLES,
                        ACC_REVENUE,
                        format!("Sales invoice {} - {:?}", invoice_ref, channel),
                        &stamp,
                    )
                },
            );
            let vat_posted = self.push(
                state,
                &mut out.entries,
                Posting {
                    vat_rate: self.config.vat_rate,
                    vat_amount: vat,
                    ..Posting::new(
                        date,
                        DocumentType::SalesInvoice,
                        currency,
                        vat,
                        ACC_RECEIVABLES,
                        ACC_VAT,
                        format!("Output VAT on {}", invoice_ref),
                        &stamp,
                    )
                },
            );
            state.output_vat += vat_posted;

            let collected_on = if state.rng.gen_bool(self.config.collection_probability) {
                let lag = state.rng.gen_range(
                    self.config.collection_lag_min_days..=self.config.collection_lag_max_days,
                );
                let pay_date = days_after(date, lag);
                if pay_date <= self.config.end_date {
                    self.push(
                        state,
                        &mut out.entries,
                        Posting::new(
                            pay_date,
                            DocumentType::BankStatement,
                            currency,
                            net + vat,
                            ACC_BANK,
                            ACC_RECEIVABLES,
                            format!("Collection of {}", invoice_ref),
                            &stamp,
                        ),
                    );
                    Some(pay_date)
                } else {
                    None
                }
            } else {
                None
            };

            out.sales.push(SalesLine {
                invoice_ref,
                date,
                channel,
                net_amount: net_posted,
                vat_amount: vat_posted,
                currency,
                collected_on,
            });

            recognized += net_posted;
            state.ytd_net_revenue += net_posted;
        }
    }

    fn run_purchases(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
        revenue_target: f64,
    ) {
        let levy = self.config.employer_levy_rate;
        let target = revenue_target * self.config.ratios.purchases_ratio(levy);
        let cogs_share = self.config.ratios.cogs_share(levy);
        let days = last_day_of_month(year, month).day();
        let mut booked = 0.0;

        while booked < target {
            let stamp = self.draw_stamp(state);
            let day = state.rng.gen_range(1..=days);
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();

            let currency = self.draw_purchase_currency(state);
            let net = round2(self.draw_purchase_amount(state) / currency.rate());
            let vat = round2(net * self.config.vat_rate);

            let invoice_ref = state.next_purchase_ref();
            let (expense_account, label) = if state.rng.gen_bool(cogs_share) {
                (ACC_MATERIALS, "materials")
            } else {
                (ACC_SERVICES, "services")
            };

            let net_posted = self.push(
                state,
                &mut out.entries,
                Posting {
                    vat_rate: self.config.vat_rate,
                    vat_amount: vat,
                    ..Posting::new(
                        date,
                        DocumentType::PurchaseInvoice,
                        currency,
                        net,
                        expense_account,
                        ACC_PAYABLES,
                        format!("Purchase invoice {} - {}", invoice_ref, label),
                        &stamp,
                    )
                },
            );
            let vat_posted = self.push(
                state,
                &mut out.entries,
                Posting {
                    vat_rate: self.config.vat_rate,
                    vat_amount: vat,
                    ..Posting::new(
                        date,
                        DocumentType::PurchaseInvoice,
                        currency,
                        vat,
                        ACC_VAT,
                        ACC_PAYABLES,
                        format!("Input VAT on {}", invoice_ref),
                        &stamp,
                    )
                },
            );
            state.input_vat += vat_posted;

            if state.rng.gen_bool(self.config.payment_probability) {
                let lag = state.rng.gen_range(
                    self.config.payment_lag_min_days..=self.config.payment_lag_max_days,
                );
                let pay_date = days_after(date, lag);
                if pay_date <= self.config.end_date {
                    self.push(
                        state,
                        &mut out.entries,
                        Posting::new(
                            pay_date,
                            DocumentType::BankStatement,
                            currency,
                            net + vat,
                            ACC_PAYABLES,
                            ACC_BANK,
                            format!("Payment of {}", invoice_ref),
                            &stamp,
                        ),
                    );
                }
            }

            booked += net_posted;
        }
    }

    fn run_payroll(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
        revenue_target: f64,
    ) {
        let period = period_key(first_day_of_month(year, month));
        let wages = round2(revenue_target * self.config.ratios.personnel_ratio);
        if wages <= 0.0 {
            return;
        }
        let levy = round2(wages * self.config.employer_levy_rate);

        let stamp = self.draw_stamp(state);
        let accrual_date = last_day_of_month(year, month);

        self.push(
            state,
            &mut out.entries,
            Posting::new(
                accrual_date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                wages,
                ACC_WAGES,
                ACC_PAYROLL_LIABILITIES,
                format!("Payroll accrual {}", period),
                &stamp,
            ),
        );
        self.push(
            state,
            &mut out.entries,
            Posting::new(
                accrual_date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                levy,
                ACC_SOCIAL_EXPENSE,
                ACC_SOCIAL_LIABILITIES,
                format!("Employer contributions accrual {}", period),
                &stamp,
            ),
        );

        let payout_date = day_in_next_month(year, month, 15);
        let paid_on = if payout_date <= self.config.end_date {
            self.push(
                state,
                &mut out.entries,
                Posting::new(
                    payout_date,
                    DocumentType::BankStatement,
                    CurrencyCode::CZK,
                    wages,
                    ACC_PAYROLL_LIABILITIES,
                    ACC_BANK,
                    format!("Wages payout {}", period),
                    &stamp,
                ),
            );
            self.push(
                state,
                &mut out.entries,
                Posting::new(
                    payout_date,
                    DocumentType::BankStatement,
                    CurrencyCode::CZK,
                    levy,
                    ACC_SOCIAL_LIABILITIES,
                    ACC_BANK,
                    format!("Employer contributions payout {}", period),
                    &stamp,
                ),
            );
            Some(payout_date)
        } else {
            None
        };

        out.payroll.push(PayrollLine {
            period,
            gross_wages: wages,
            employer_contributions: levy,
            total_cost: round2(wages + levy),
            paid_on,
        });
    }

    fn maybe_run_capex(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
    ) {
        if !state.rng.gen_bool(self.config.capex_probability) {
            return;
        }

        let stamp = self.draw_stamp(state);
        let amount = round2(
            state
                .rng
                .gen_range(self.config.capex_min..=self.config.capex_max),
        );
        let reference = state.next_capex_ref();
        let acquisition_date =
            NaiveDate::from_ymd_opt(year, month, state.rng.gen_range(1..=20)).unwrap();
        let activation_date = last_day_of_month(year, month);

        self.push(
            state,
            &mut out.entries,
            Posting::new(
                acquisition_date,
                DocumentType::PurchaseInvoice,
                CurrencyCode::CZK,
                amount,
                ACC_ASSETS_UNDER_CONSTRUCTION,
                ACC_PAYABLES,
                format!("Capex acquisition {}", reference),
                &stamp,
            ),
        );
        self.push(
            state,
            &mut out.entries,
            Posting::new(
                activation_date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                amount,
                ACC_MACHINERY,
                ACC_ASSETS_UNDER_CONSTRUCTION,
                format!("Asset activation {}", reference),
                &stamp,
            ),
        );

        if state.rng.gen_bool(self.config.payment_probability) {
            let lag = state.rng.gen_range(
                self.config.payment_lag_min_days..=self.config.payment_lag_max_days,
            );
            let pay_date = days_after(acquisition_date, lag);
            if pay_date <= self.config.end_date {
                self.push(
                    state,
                    &mut out.entries,
                    Posting::new(
                        pay_date,
                        DocumentType::BankStatement,
                        CurrencyCode::CZK,
                        amount,
                        ACC_PAYABLES,
                        ACC_BANK,
                        format!("Payment of {}", reference),
                        &stamp,
                    ),
                );
            }
        }

        // Depreciation of the new asset starts in its activation month.
        state.monthly_depreciation += amount / self.config.depreciation_life_months as f64;
    }

    fn post_depreciation(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
    ) {
        let amount = round2(state.monthly_depreciation);
        if amount <= 0.0 {
            return;
        }

        let stamp = self.draw_stamp(state);
        self.push(
            state,
            &mut out.entries,
            Posting::new(
                last_day_of_month(year, month),
                DocumentType::Internal,
                CurrencyCode::CZK,
                amount,
                ACC_DEPRECIATION_EXPENSE,
                ACC_ACCUMULATED_DEPRECIATION,
                format!("Monthly depreciation {}", period_key(first_day_of_month(year, month))),
                &stamp,
            ),
        );
    }

    fn settle_vat(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
    ) {
        let position = round2(state.output_vat - state.input_vat);
        if position == 0.0 {
            return;
        }

        let due_date = day_in_next_month(year, month, 25);
        if due_date > self.config.end_date {
            return;
        }

        let period = period_key(first_day_of_month(year, month));
        let stamp = self.draw_stamp(state);
        if position > 0.0 {
            self.push(
                state,
                &mut out.entries,
                Posting::new(
                    due_date,
                    DocumentType::BankStatement,
                    CurrencyCode::CZK,
                    position,
                    ACC_VAT,
                    ACC_BANK,
                    format!("VAT settlement {}", period),
                    &stamp,
                ),
            );
        } else {
            self.push(
                state,
                &mut out.entries,
                Posting::new(
                    due_date,
                    DocumentType::BankStatement,
                    CurrencyCode::CZK,
                    -position,
                    ACC_BANK,
                    ACC_VAT,
                    format!("VAT refund {}", period),
                    &stamp,
                ),
            );
        }
    }

    fn accrue_income_tax(&self, state: &mut GeneratorState, out: &mut GeneratedLedger, year: i32) {
        let tax = round2(
            state.ytd_net_revenue
                * self.config.pretax_profit_fraction
                * self.config.income_tax_rate,
        );
        if tax <= 0.0 {
            return;
        }

        let accrual_date = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
        if accrual_date > self.config.end_date {
            return;
        }

        let stamp = self.draw_stamp(state);
        self.push(
            state,
            &mut out.entries,
            Posting::new(
                accrual_date,
                DocumentType::Internal,
                CurrencyCode::CZK,
                tax,
                ACC_INCOME_TAX_EXPENSE,
                ACC_INCOME_TAX_LIABILITY,
                format!("Income tax accrual {}", year),
                &stamp,
            ),
        );

        let payment_date = NaiveDate::from_ymd_opt(year + 1, 3, 31).unwrap();
        if payment_date <= self.config.end_date {
            self.push(
                state,
                &mut out.entries,
                Posting::new(
                    payment_date,
                    DocumentType::BankStatement,
                    CurrencyCode::CZK,
                    tax,
                    ACC_INCOME_TAX_LIABILITY,
                    ACC_BANK,
                    format!("Income tax payment {}", year),
                    &stamp,
                ),
            );
        }
    }

    fn post_noise(
        &self,
        state: &mut GeneratorState,
        out: &mut GeneratedLedger,
        year: i32,
        month: u32,
    ) {
        let days = last_day_of_month(year, month).day();

        for _ in 0..self.config.noise_entries_per_month {
            let stamp = self.draw_stamp(state);
            let day = state.rng.gen_range(1..=days);
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let amount = round2(state.rng.gen_range(NOISE_AMOUNT_MIN..=NOISE_AMOUNT_MAX));
            let status = if state.rng.gen_bool(0.5) {
                PostingStatus::Draft
            } else {
                PostingStatus::Voided
            };

            self.push(
                state,
                &mut out.entries,
                Posting {
                    status,
                    ..Posting::new(
                        date,
                        DocumentType::CashPayment,
                        CurrencyCode::CZK,
                        amount,
                        ACC_OTHER_OPERATING,
                        ACC_PETTY_CASH,
                        "Unapproved petty cost".to_string(),
                        &stamp,
                    )
                },
            );
        }
    }

    fn draw_stamp(&self, state: &mut GeneratorState) -> EventStamp {
        let dims = &self.config.dimensions;
        let rng = &mut state.rng;
        EventStamp {
            cost_center: dims.cost_centers[rng.gen_range(0..dims.cost_centers.len())].clone(),
            project: dims.projects[rng.gen_range(0..dims.projects.len())].clone(),
            profit_center: dims.profit_centers[rng.gen_range(0..dims.profit_centers.len())]
                .clone(),
            branch: dims.branches[rng.gen_range(0..dims.branches.len())].clone(),
            created_by: format!("USR{:03}", rng.gen_range(1..=50)),
        }
    }

    fn draw_sales_currency(&self, state: &mut GeneratorState) -> CurrencyCode {
        if state.rng.gen::<f64>() < SALES_EUR_SHARE {
            CurrencyCode::EUR
        } else {
            CurrencyCode::CZK
        }
    }

    fn draw_purchase_currency(&self, state: &mut GeneratorState) -> CurrencyCode {
        let roll: f64 = state.rng.gen();
        if roll < PURCHASE_USD_SHARE {
            CurrencyCode::USD
        } else if roll < PURCHASE_USD_SHARE + PURCHASE_EUR_SHARE {
            CurrencyCode::EUR
        } else {
            CurrencyCode::CZK
        }
    }

    fn draw_invoice_amount(&self, state: &mut GeneratorState) -> f64 {
        self.invoice_amounts
            .sample(&mut state.rng)
            .min(self.config.invoice_amount_max)
    }

    fn draw_purchase_amount(&self, state: &mut GeneratorState) -> f64 {
        self.purchase_amounts
            .sample(&mut state.rng)
            .min(self.config.purchase_amount_max)
    }

    /// Converts one posting into a ledger entry and returns its base-currency
    /// amount. Zero-amount rows are dropped rather than posted.
    fn push(
        &self,
        state: &mut GeneratorState,
        entries: &mut Vec<LedgerEntry>,
        posting: Posting,
    ) -> f64 {
        let amount = round2(posting.amount);
        if amount <= 0.0 {
            return 0.0;
        }

        let rate = posting.currency.rate();
        let amount_base = round2(amount * rate);

        entries.push(LedgerEntry {
            id: state.next_entry_id(),
            date: posting.date,
            document_type: posting.document_type,
            amount,
            currency: posting.currency,
            fx_rate: rate,
            amount_base,
            vat_rate: posting.vat_rate,
            vat_amount: posting.vat_amount,
            debit_account: posting.debit.to_string(),
            credit_account: posting.credit.to_string(),
            cost_center: posting.stamp.cost_center.clone(),
            project: posting.stamp.project.clone(),
            profit_center: posting.stamp.profit_center.clone(),
            branch: posting.stamp.branch.clone(),
            description: posting.description,
            status: posting.status,
            created_by: posting.stamp.created_by.clone(),
        });

        amount_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AccountRow, ChartOfAccounts};
    use crate::error::SyntheticLedgerError;
    use crate::schema::AccountKind;

    fn one_month_config() -> SimulationConfig {
        SimulationConfig {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
            capex_probability: 0.0,
            ..SimulationConfig::default()
        }
    }

    fn one_year_config() -> SimulationConfig {
        SimulationConfig {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            ..SimulationConfig::default()
        }
    }

    fn generate(config: &SimulationConfig) -> GeneratedLedger {
        let chart = ChartOfAccounts::standard();
        LedgerGenerator::new(config, &chart)
            .unwrap()
            .generate()
            .unwrap()
    }

    #[test]
    fn test_opening_balances_posted_once() {
        let config = one_month_config();
        let ledger = generate(&config);

        let cash = ledger
            .entries
            .iter()
            .find(|e| e.debit_account == ACC_BANK && e.credit_account == ACC_OPENING_BALANCE)
            .expect("opening cash entry missing");
        assert_eq!(cash.amount_base, 15_000_000.0);
        assert_eq!(cash.date, config.start_date);

        let assets = ledger
            .entries
            .iter()
            .find(|e| e.debit_account == ACC_MACHINERY && e.credit_account == ACC_OPENING_BALANCE)
            .expect("opening asset entry missing");
        assert_eq!(assets.amount_base, 5_000_000.0);

        let capital = ledger
            .entries
            .iter()
            .find(|e| {
                e.debit_account == ACC_OPENING_BALANCE && e.credit_account == ACC_SHARE_CAPITAL
            })
            .expect("opening capital entry missing");
        assert_eq!(capital.amount_base, 20_000_000.0);
    }

    #[test]
    fn test_first_depreciation_charge() {
        let ledger = generate(&one_month_config());

        let depreciation: Vec<_> = ledger
            .entries
            .iter()
            .filter(|e| e.debit_account == ACC_DEPRECIATION_EXPENSE)
            .collect();
        assert_eq!(depreciation.len(), 1, "expected exactly one depreciation row");
        assert_eq!(depreciation[0].amount_base, 83333.33);
        assert_eq!(depreciation[0].credit_account, ACC_ACCUMULATED_DEPRECIATION);
    }

    #[test]
    fn test_output_vat_tracks_revenue() {
        let config = one_month_config();
        let ledger = generate(&config);

        let revenue: f64 = ledger
            .entries
            .iter()
            .filter(|e| e.credit_account == ACC_REVENUE)
            .map(|e| e.amount_base)
            .sum();
        let output_vat: f64 = ledger
            .entries
            .iter()
            .filter(|e| e.debit_account == ACC_RECEIVABLES && e.credit_account == ACC_VAT)
            .map(|e| e.amount_base)
            .sum();

        assert!(revenue > 0.0, "no revenue generated");
        assert!(
            (output_vat - revenue * config.vat_rate).abs() < 5.0,
            "output VAT {} does not track revenue {} at rate {}",
            output_vat,
            revenue,
            config.vat_rate
        );
    }

    #[test]
    fn test_entries_within_window_and_sorted() {
        let config = one_year_config();
        let ledger = generate(&config);

        assert!(!ledger.entries.is_empty());
        for entry in &ledger.entries {
            assert!(
                entry.date >= config.start_date && entry.date <= config.end_date,
                "entry {} dated {} falls outside the window",
                entry.id,
                entry.date
            );
            assert!(entry.amount > 0.0);
            assert_ne!(entry.debit_account, entry.credit_account);
        }

        for pair in ledger.entries.windows(2) {
            assert!(
                (pair[0].date, &pair[0].id) <= (pair[1].date, &pair[1].id),
                "ledger is not sorted by (date, id)"
            );
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let config = one_month_config();
        let first = generate(&config);
        let second = generate(&config);

        assert_eq!(first.entries, second.entries);
        assert_eq!(first.sales, second.sales);
        assert_eq!(first.payroll, second.payroll);
    }

    #[test]
    fn test_payroll_levy_and_settlement() {
        let config = one_year_config();
        let ledger = generate(&config);

        assert_eq!(ledger.payroll.len(), 12);
        for line in &ledger.payroll {
            assert_eq!(
                line.employer_contributions,
                round2(line.gross_wages * config.employer_levy_rate),
                "levy mismatch in {}",
                line.period
            );
            assert_eq!(line.total_cost, round2(line.gross_wages + line.employer_contributions));

            if line.period == "2023-12" {
                // The January payout falls past the window.
                assert_eq!(line.paid_on, None);
            } else {
                let paid = line.paid_on.expect("payout missing");
                assert_eq!(paid.day(), 15);
            }
        }
    }

    #[test]
    fn test_late_collections_dropped_not_clipped() {
        let config = one_month_config();
        let ledger = generate(&config);

        let dropped = ledger.sales.iter().filter(|s| s.collected_on.is_none()).count();
        assert!(
            dropped > 0,
            "a one-month window should leave some invoices uncollected"
        );
        assert!(ledger
            .entries
            .iter()
            .all(|e| e.date <= config.end_date));
    }

    #[test]
    fn test_cogs_tracks_target_share() {
        let ledger = generate(&one_year_config());

        let revenue: f64 = ledger
            .entries
            .iter()
            .filter(|e| e.credit_account == ACC_REVENUE)
            .map(|e| e.amount_base)
            .sum();
        let cogs: f64 = ledger
            .entries
            .iter()
            .filter(|e| e.debit_account == ACC_MATERIALS)
            .map(|e| e.amount_base)
            .sum();

        let share = cogs / revenue;
        assert!(
            (share - 0.45).abs() < 0.06,
            "COGS share {} drifted from the 0.45 target",
            share
        );
    }

    #[test]
    fn test_vat_settled_on_25th_of_next_month() {
        let ledger = generate(&one_year_config());

        let settlement = ledger
            .entries
            .iter()
            .find(|e| e.description == "VAT settlement 2023-01")
            .expect("January VAT settlement missing");
        assert_eq!(settlement.date, NaiveDate::from_ymd_opt(2023, 2, 25).unwrap());
        assert_eq!(settlement.debit_account, ACC_VAT);
        assert_eq!(settlement.credit_account, ACC_BANK);
    }

    #[test]
    fn test_noise_entries_never_posted() {
        let config = one_year_config();
        let ledger = generate(&config);

        let noise: Vec<_> = ledger
            .entries
            .iter()
            .filter(|e| !e.status.is_posted())
            .collect();
        assert_eq!(noise.len(), 12 * config.noise_entries_per_month as usize);
        for entry in noise {
            assert_eq!(entry.debit_account, ACC_OTHER_OPERATING);
            assert_eq!(entry.credit_account, ACC_PETTY_CASH);
        }
    }

    #[test]
    fn test_december_tax_accrual() {
        let ledger = generate(&one_year_config());

        let accrual = ledger
            .entries
            .iter()
            .find(|e| e.debit_account == ACC_INCOME_TAX_EXPENSE)
            .expect("December tax accrual missing");
        assert_eq!(accrual.date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(accrual.credit_account, ACC_INCOME_TAX_LIABILITY);

        // The March payment falls past the window, so no settlement exists.
        assert!(!ledger
            .entries
            .iter()
            .any(|e| e.debit_account == ACC_INCOME_TAX_LIABILITY));
    }

    #[test]
    fn test_missing_required_account_rejected() {
        let rows = vec![AccountRow {
            id: "221".to_string(),
            name: "Bank accounts".to_string(),
            kind: AccountKind::Asset,
            group: "22 Bank accounts".to_string(),
            class: 2,
        }];
        let chart = ChartOfAccounts::from_rows(rows).unwrap();
        let config = SimulationConfig::default();

        let result = LedgerGenerator::new(&config, &chart);
        assert!(matches!(
            result,
            Err(SyntheticLedgerError::UnknownAccount { .. })
        ));
    }

    #[test]
    fn test_misaligned_window_rejected() {
        let chart = ChartOfAccounts::standard();
        let config = SimulationConfig {
            end_date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
            ..one_month_config()
        };

        let result = LedgerGenerator::new(&config, &chart);
        assert!(matches!(result, Err(SyntheticLedgerError::InvalidWindow { .. })));
    }
}
