use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rounds a monetary value to two decimal places. Applied when values are
/// posted or reported, never to intermediate arithmetic.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One-decimal rounding used for day counts and variance percentages.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AccountKind {
    #[schemars(description = "Balance sheet account with a debit balance (cash, receivables, fixed assets)")]
    Asset,

    #[schemars(description = "Balance sheet account with a credit balance, including equity groups (payables, loans, capital)")]
    Liability,

    #[schemars(description = "Income statement account with a debit balance (class 5)")]
    Expense,

    #[schemars(description = "Income statement account with a credit balance (class 6)")]
    Revenue,

    #[schemars(description = "Opening/closing balance accounts (class 70/71), excluded from all KPI buckets")]
    Closing,

    #[schemars(description = "Off-balance memorandum accounts (class 79), excluded from all KPI buckets")]
    OffBalance,
}

/// Behavioral classification assigned once when the chart is built. All
/// aggregation and generation logic keys off this enum; account names are
/// display-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AccountRole {
    Revenue,
    CostOfGoods,
    Depreciation,
    OperatingExpense,
    IncomeTax,
    Receivable,
    Payable,
    Cash,
    Equity,
    Liability,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum DocumentType {
    SalesInvoice,
    PurchaseInvoice,
    BankStatement,
    CashReceipt,
    CashPayment,
    Internal,
}

impl DocumentType {
    /// Short document-series code used in exports and entry descriptions.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::SalesInvoice => "FAV",
            DocumentType::PurchaseInvoice => "FAP",
            DocumentType::BankStatement => "BV",
            DocumentType::CashReceipt => "PPD",
            DocumentType::CashPayment => "VPD",
            DocumentType::Internal => "INT",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum PostingStatus {
    Posted,
    Draft,
    Voided,
}

impl PostingStatus {
    pub fn is_posted(&self) -> bool {
        matches!(self, PostingStatus::Posted)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CurrencyCode {
    CZK,
    EUR,
    USD,
}

impl CurrencyCode {
    /// Flat conversion rate to the base currency. No revaluation is modeled;
    /// settlement rows reuse the rate of the originating invoice.
    pub fn rate(&self) -> f64 {
        match self {
            CurrencyCode::CZK => 1.0,
            CurrencyCode::EUR => 24.5,
            CurrencyCode::USD => 22.8,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "PascalCase")]
pub enum SalesChannel {
    Online,
    Branch,
    Phone,
    B2bPortal,
    FieldSales,
}

impl SalesChannel {
    pub const ALL: [SalesChannel; 5] = [
        SalesChannel::Online,
        SalesChannel::Branch,
        SalesChannel::Phone,
        SalesChannel::B2bPortal,
        SalesChannel::FieldSales,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "PascalCase")]
pub enum OpexCategory {
    MaterialsAndEnergy,
    Services,
    Personnel,
    TaxesAndFees,
    OtherOperating,
    Financial,
}

impl OpexCategory {
    /// Maps an expense group code to its controlling category. Depreciation
    /// (55) and income tax (59) have no category and are reported elsewhere.
    pub fn from_group(group_code: u32) -> Option<OpexCategory> {
        match group_code {
            50 => Some(OpexCategory::MaterialsAndEnergy),
            51 => Some(OpexCategory::Services),
            52 => Some(OpexCategory::Personnel),
            53 => Some(OpexCategory::TaxesAndFees),
            54 => Some(OpexCategory::OtherOperating),
            56 => Some(OpexCategory::Financial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ReconciliationStatus {
    Ok,
    Fail,
}

/// One balanced posting row. Entries are created in atomic per-event groups
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: String,
    pub date: NaiveDate,
    pub document_type: DocumentType,
    /// Amount in the original currency of the document.
    pub amount: f64,
    pub currency: CurrencyCode,
    pub fx_rate: f64,
    /// Amount converted to the base currency; always `round2(amount * fx_rate)`.
    pub amount_base: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub debit_account: String,
    pub credit_account: String,
    pub cost_center: String,
    pub project: String,
    pub profit_center: String,
    pub branch: String,
    pub description: String,
    pub status: PostingStatus,
    pub created_by: String,
}

/// Side fact for one sales invoice. Amounts are base-currency values of
/// the posted rows; `collected_on` is None when the lagged collection fell
/// past the simulation window and was dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesLine {
    pub invoice_ref: String,
    pub date: NaiveDate,
    pub channel: SalesChannel,
    pub net_amount: f64,
    pub vat_amount: f64,
    pub currency: CurrencyCode,
    pub collected_on: Option<NaiveDate>,
}

/// Side fact for one monthly payroll run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollLine {
    pub period: String,
    pub gross_wages: f64,
    pub employer_contributions: f64,
    pub total_cost: f64,
    pub paid_on: Option<NaiveDate>,
}

/// Plan/actual budget fact per cost center, account, and month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetLine {
    pub cost_center: String,
    pub account_id: String,
    pub period: String,
    pub planned: f64,
    pub actual: f64,
    pub variance: f64,
    pub variance_pct: f64,
}

/// Derived KPI output for one "YYYY-MM" period. Flow fields are
/// period-local; the balance sheet fields are cumulative running totals.
/// All monetary fields carry output rounding (2 decimals), DSO/DPO one
/// decimal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiRecord {
    pub period: String,
    pub revenue: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub gross_margin_pct: f64,
    pub ebitda: f64,
    pub ebitda_margin_pct: f64,
    pub ebit: f64,
    pub net_income: f64,
    pub depreciation: f64,
    pub total_assets: f64,
    pub total_equity: f64,
    pub total_liabilities: f64,
    pub dso_days: f64,
    pub dpo_days: f64,
    pub roa_pct: f64,
    pub roe_pct: f64,
    pub cash_inflow: f64,
    pub cash_outflow: f64,
    pub net_cashflow: f64,
    pub burn_rate: f64,
}

/// Accounting-identity check result for one period. Net income is added
/// back on the right side because no period-close entries are generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationRecord {
    pub period: String,
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
    pub cumulative_net_income: f64,
    pub difference: f64,
    pub status: ReconciliationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpexBreakdownRow {
    pub period: String,
    pub cost_center: String,
    pub category: OpexCategory,
    pub planned: f64,
    pub actual: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapexRow {
    pub period: String,
    pub investment: f64,
    pub depreciation: f64,
    pub accumulated_depreciation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonnelCostRow {
    pub period: String,
    pub gross_wages: f64,
    pub employer_contributions: f64,
    pub total_cost: f64,
    pub share_of_revenue_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesChannelRow {
    pub period: String,
    pub channel: SalesChannel,
    pub invoice_count: usize,
    pub net_revenue: f64,
    pub vat_amount: f64,
    pub average_invoice: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum SeasonalityProfile {
    #[schemars(
        description = "Retail-style calendar: Q4 at 1.3x, July and August at 0.8x, all other months at 1.0x."
    )]
    Standard,

    #[schemars(description = "No seasonal variation; every month at 1.0x.")]
    Flat,

    #[schemars(
        description = "Custom 12-value array of multiplicative monthly factors (January first). All factors must be positive; they scale the base monthly revenue directly and need not sum to anything."
    )]
    Custom(
        #[schemars(description = "Array of 12 positive monthly factors")] Vec<f64>,
    ),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RatioTargets {
    #[schemars(
        description = "Target gross margin as a fraction of revenue: (revenue - COGS) / revenue. Default 0.55."
    )]
    pub gross_margin: f64,

    #[schemars(
        description = "Target EBITDA margin as a fraction of revenue. Default 0.15."
    )]
    pub ebitda_margin: f64,

    #[schemars(
        description = "Target wage base as a fraction of revenue. Employer contributions are added on top via the employer levy rate. Default 0.25."
    )]
    pub personnel_ratio: f64,

    #[schemars(
        description = "Lower bound for the derived services spending ratio, keeping the purchase loop alive even when margin targets leave no room for services. Default 0.05."
    )]
    pub services_ratio_floor: f64,
}

impl Default for RatioTargets {
    fn default() -> Self {
        Self {
            gross_margin: 0.55,
            ebitda_margin: 0.15,
            personnel_ratio: 0.25,
            services_ratio_floor: 0.05,
        }
    }
}

impl RatioTargets {
    /// Fraction of revenue spent on general services, derived so that the
    /// EBITDA target is met once COGS and the full employer cost of payroll
    /// are accounted for. The personnel term here includes the employer
    /// levy; subtracting bare wages would leave realized EBITDA well under
    /// target.
    pub fn services_ratio(&self, employer_levy_rate: f64) -> f64 {
        let personnel_cost = self.personnel_ratio * (1.0 + employer_levy_rate);
        ((self.gross_margin - self.ebitda_margin) - personnel_cost).max(self.services_ratio_floor)
    }

    /// Total purchase spending as a fraction of revenue: COGS plus services.
    pub fn purchases_ratio(&self, employer_levy_rate: f64) -> f64 {
        (1.0 - self.gross_margin) + self.services_ratio(employer_levy_rate)
    }

    /// Probability that a purchase invoice is classified as cost of goods
    /// rather than services.
    pub fn cogs_share(&self, employer_levy_rate: f64) -> f64 {
        (1.0 - self.gross_margin) / self.purchases_ratio(employer_levy_rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OpeningBalances {
    #[schemars(description = "Opening share capital, credited to account 411. Default 20,000,000.")]
    pub equity: f64,

    #[schemars(description = "Opening bank balance, debited to account 221. Default 15,000,000.")]
    pub cash: f64,

    #[schemars(
        description = "Opening fixed assets, debited to account 022. Seeds the monthly depreciation accrual at fixed_assets / depreciation_life_months. Default 5,000,000."
    )]
    pub fixed_assets: f64,
}

impl Default for OpeningBalances {
    fn default() -> Self {
        Self {
            equity: 20_000_000.0,
            cash: 15_000_000.0,
            fixed_assets: 5_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DimensionPools {
    #[schemars(description = "Cost center ids stamped onto generated events")]
    pub cost_centers: Vec<String>,

    #[schemars(description = "Project ids stamped onto generated events")]
    pub projects: Vec<String>,

    #[schemars(description = "Profit center ids stamped onto generated events")]
    pub profit_centers: Vec<String>,

    #[schemars(description = "Branch ids stamped onto generated events")]
    pub branches: Vec<String>,
}

impl Default for DimensionPools {
    fn default() -> Self {
        Self {
            cost_centers: (1..=20).map(|i| format!("STR{:03}", i)).collect(),
            projects: (1..=40).map(|i| format!("PROJ{:03}", i)).collect(),
            profit_centers: (1..=10).map(|i| format!("PC{:02}", i)).collect(),
            branches: (1..=12).map(|i| format!("POB{:02}", i)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SimulationConfig {
    #[schemars(description = "Display name of the simulated company")]
    pub company_name: String,

    #[schemars(description = "Seed for the random number generator. Identical seed and config produce an identical dataset.")]
    pub seed: u64,

    #[schemars(description = "First day of the simulation window (inclusive)")]
    pub start_date: NaiveDate,

    #[schemars(description = "Last day of the simulation window (inclusive). Follow-up postings lagged past this date are dropped.")]
    pub end_date: NaiveDate,

    #[schemars(description = "Unscaled revenue target per month, in base currency. Default 20,000,000.")]
    pub base_monthly_revenue: f64,

    #[schemars(description = "Year-over-year revenue growth applied multiplicatively per simulated year. Default 0.08.")]
    pub annual_growth: f64,

    #[schemars(description = "Standard deviation of the random factor applied to each monthly revenue target. Default 0.05.")]
    pub revenue_jitter: f64,

    #[schemars(description = "Monthly seasonal shape of the revenue target")]
    pub seasonality: SeasonalityProfile,

    pub ratios: RatioTargets,

    pub opening_balances: OpeningBalances,

    #[schemars(description = "VAT rate applied to all sales and purchase invoices. Default 0.21.")]
    pub vat_rate: f64,

    #[schemars(description = "Flat corporate income tax rate. Default 0.19.")]
    pub income_tax_rate: f64,

    #[schemars(description = "Fraction of annual revenue used as the pre-tax profit proxy for the December tax accrual. Default 0.12.")]
    pub pretax_profit_fraction: f64,

    #[schemars(description = "Employer social and health contributions as a fraction of gross wages. Default 0.338 (24.8% social + 9% health).")]
    pub employer_levy_rate: f64,

    #[schemars(description = "Straight-line depreciation life applied to the opening asset base and every capex addition. Default 60.")]
    pub depreciation_life_months: u32,

    #[schemars(description = "Probability of a capital expenditure event in any given month. Default 0.2.")]
    pub capex_probability: f64,

    #[schemars(description = "Lower bound of the uniform capex amount draw. Default 200,000.")]
    pub capex_min: f64,

    #[schemars(description = "Upper bound of the uniform capex amount draw. Default 2,000,000.")]
    pub capex_max: f64,

    #[schemars(description = "Minimum net amount of one sales invoice; also the scale of the Pareto draw. Default 25,000.")]
    pub invoice_amount_min: f64,

    #[schemars(description = "Maximum net amount of one sales invoice; Pareto draws are clamped here. Default 1,500,000.")]
    pub invoice_amount_max: f64,

    #[schemars(description = "Pareto shape for sales invoice amounts; lower means heavier tail. Default 1.6.")]
    pub invoice_shape: f64,

    #[schemars(description = "Probability that a sales invoice is collected within the window. Default 0.92.")]
    pub collection_probability: f64,

    #[schemars(description = "Minimum collection lag in days. Default 14.")]
    pub collection_lag_min_days: u32,

    #[schemars(description = "Maximum collection lag in days. Default 75.")]
    pub collection_lag_max_days: u32,

    #[schemars(description = "Minimum net amount of one purchase invoice. Default 10,000.")]
    pub purchase_amount_min: f64,

    #[schemars(description = "Maximum net amount of one purchase invoice. Default 800,000.")]
    pub purchase_amount_max: f64,

    #[schemars(description = "Pareto shape for purchase invoice amounts. Default 1.5.")]
    pub purchase_shape: f64,

    #[schemars(description = "Probability that a purchase invoice is paid. Default 0.95.")]
    pub payment_probability: f64,

    #[schemars(description = "Minimum payment lag in days. Default 10.")]
    pub payment_lag_min_days: u32,

    #[schemars(description = "Maximum payment lag in days. Default 60.")]
    pub payment_lag_max_days: u32,

    #[schemars(description = "Number of Draft/Voided petty-cost entries per month. These never reach aggregation. Default 2.")]
    pub noise_entries_per_month: u32,

    pub dimensions: DimensionPools,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            company_name: "Demo Manufacturing a.s.".to_string(),
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            base_monthly_revenue: 20_000_000.0,
            annual_growth: 0.08,
            revenue_jitter: 0.05,
            seasonality: SeasonalityProfile::Standard,
            ratios: RatioTargets::default(),
            opening_balances: OpeningBalances::default(),
            vat_rate: 0.21,
            income_tax_rate: 0.19,
            pretax_profit_fraction: 0.12,
            employer_levy_rate: 0.338,
            depreciation_life_months: 60,
            capex_probability: 0.2,
            capex_min: 200_000.0,
            capex_max: 2_000_000.0,
            invoice_amount_min: 25_000.0,
            invoice_amount_max: 1_500_000.0,
            invoice_shape: 1.6,
            collection_probability: 0.92,
            collection_lag_min_days: 14,
            collection_lag_max_days: 75,
            purchase_amount_min: 10_000.0,
            purchase_amount_max: 800_000.0,
            purchase_shape: 1.5,
            payment_probability: 0.95,
            payment_lag_min_days: 10,
            payment_lag_max_days: 60,
            noise_entries_per_month: 2,
            dimensions: DimensionPools::default(),
        }
    }
}

impl SimulationConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SimulationConfig)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = SimulationConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("base_monthly_revenue"));
        assert!(schema_json.contains("ratios"));
        assert!(schema_json.contains("opening_balances"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = SimulationConfig {
            company_name: "Test Corp".to_string(),
            seed: 7,
            ..SimulationConfig::default()
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("Test Corp"));

        let deserialized: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.seed, 7);
        assert_eq!(deserialized.vat_rate, config.vat_rate);
    }

    #[test]
    fn test_config_deserializes_from_partial_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"seed": 99, "annual_growth": 0.1}"#).unwrap();
        assert_eq!(config.seed, 99);
        assert!((config.annual_growth - 0.1).abs() < 1e-12);
        assert_eq!(config.depreciation_life_months, 60);
    }

    #[test]
    fn test_ratio_algebra_meets_ebitda_target() {
        let ratios = RatioTargets::default();
        let levy = 0.338;

        let services = ratios.services_ratio(levy);
        let purchases = ratios.purchases_ratio(levy);
        let cogs_share = ratios.cogs_share(levy);

        let expected_services = (0.55 - 0.15) - 0.25 * 1.338;
        assert!((services - expected_services).abs() < 1e-12);
        assert!((purchases - (0.45 + expected_services)).abs() < 1e-12);
        assert!((cogs_share * purchases - 0.45).abs() < 1e-12);

        // EBITDA per unit of revenue when every loop lands on target.
        let ebitda = 1.0 - 0.45 - services - 0.25 * 1.338;
        assert!((ebitda - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_services_ratio_floor_applies() {
        let ratios = RatioTargets {
            personnel_ratio: 0.4,
            ..RatioTargets::default()
        };
        assert!((ratios.services_ratio(0.338) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_opex_category_mapping() {
        assert_eq!(OpexCategory::from_group(50), Some(OpexCategory::MaterialsAndEnergy));
        assert_eq!(OpexCategory::from_group(51), Some(OpexCategory::Services));
        assert_eq!(OpexCategory::from_group(55), None);
        assert_eq!(OpexCategory::from_group(59), None);
    }

    #[test]
    fn test_document_codes() {
        assert_eq!(DocumentType::SalesInvoice.code(), "FAV");
        assert_eq!(DocumentType::PurchaseInvoice.code(), "FAP");
        assert_eq!(DocumentType::BankStatement.code(), "BV");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(83333.333333), 83333.33);
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(-1.005), -1.0);
    }
}
