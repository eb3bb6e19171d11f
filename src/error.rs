use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyntheticLedgerError {
    #[error("Unknown account id referenced by {context}: {account_id}")]
    UnknownAccount { account_id: String, context: String },

    #[error("Duplicate account id in chart: {0}")]
    DuplicateAccount(String),

    #[error("Malformed account id (expected a numeric code of at least two digits): {0}")]
    MalformedAccountId(String),

    #[error("Invalid ratio targets: {0}")]
    InvalidRatioTargets(String),

    #[error("Invalid simulation window {start}..{end}: start must be the first day of a month, end the last day of a month, and start must not be after end")]
    InvalidWindow { start: String, end: String },

    #[error("Custom seasonality profile has invalid weights: {0}")]
    InvalidSeasonalityWeights(String),

    #[error("Invalid amount bounds for {name}: min {min} must be positive and not above max {max}")]
    InvalidAmountBounds { name: String, min: f64, max: f64 },

    #[error("Invalid rate for {name}: {value} (must be within 0.0..=1.0)")]
    InvalidRate { name: String, value: f64 },

    #[error("Invalid Pareto shape for {name}: {value} (must be positive)")]
    InvalidShape { name: String, value: f64 },

    #[error("Invalid depreciation life: {0} months (must be at least 1)")]
    InvalidDepreciationLife(u32),

    #[error("Invalid lag range for {name}: {min}..{max}")]
    InvalidLagRange { name: String, min: u32, max: u32 },

    #[error("Invalid revenue jitter {0}: must be between 0.0 and 0.5")]
    InvalidJitter(f64),

    #[error("Opening balances do not balance: equity ({equity}) must equal cash ({cash}) plus fixed assets ({fixed_assets})")]
    UnbalancedOpeningBalances {
        equity: f64,
        cash: f64,
        fixed_assets: f64,
    },

    #[error("Dimension pool '{0}' is empty")]
    EmptyDimensionPool(String),

    #[error("Reconciliation violation in {period}: assets ({assets:.2}) != liabilities ({liabilities:.2}) + equity ({equity:.2}) + net income ({net_income:.2})")]
    ReconciliationViolation {
        period: String,
        assets: f64,
        liabilities: f64,
        equity: f64,
        net_income: f64,
    },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyntheticLedgerError>;
