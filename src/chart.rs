use crate::error::{Result, SyntheticLedgerError};
use crate::schema::{AccountKind, AccountRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw chart row as supplied by callers. The class digit is carried
/// separately even though it equals the first digit of the id, matching the
/// statutory source table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
    pub group: String,
    pub class: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
    pub group: String,
    pub class: u8,
    /// Two-digit synthetic group code, the first two digits of the id.
    pub group_code: u32,
    pub role: AccountRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    accounts: BTreeMap<String, Account>,
}

/// Structural role assignment. Every rule keys off the account kind and the
/// numeric group code; display names play no part.
fn assign_role(kind: AccountKind, group_code: u32) -> AccountRole {
    match kind {
        AccountKind::Revenue => AccountRole::Revenue,
        AccountKind::Expense => match group_code {
            50 => AccountRole::CostOfGoods,
            55 => AccountRole::Depreciation,
            59 => AccountRole::IncomeTax,
            _ => AccountRole::OperatingExpense,
        },
        AccountKind::Asset => match group_code {
            21 | 22 => AccountRole::Cash,
            31 => AccountRole::Receivable,
            _ => AccountRole::Other,
        },
        AccountKind::Liability => match group_code {
            32 => AccountRole::Payable,
            41..=43 => AccountRole::Equity,
            _ => AccountRole::Liability,
        },
        AccountKind::Closing | AccountKind::OffBalance => AccountRole::Other,
    }
}

fn group_code_of(id: &str) -> Option<u32> {
    id.get(..2)?.parse().ok()
}

impl ChartOfAccounts {
    /// Builds a chart from caller-supplied rows, assigning roles and
    /// rejecting duplicate or malformed account ids.
    pub fn from_rows(rows: Vec<AccountRow>) -> Result<Self> {
        let mut accounts = BTreeMap::new();

        for row in rows {
            let group_code = group_code_of(&row.id)
                .ok_or_else(|| SyntheticLedgerError::MalformedAccountId(row.id.clone()))?;

            let account = Account {
                role: assign_role(row.kind, group_code),
                id: row.id,
                name: row.name,
                kind: row.kind,
                group: row.group,
                class: row.class,
                group_code,
            };

            if accounts.insert(account.id.clone(), account.clone()).is_some() {
                return Err(SyntheticLedgerError::DuplicateAccount(account.id));
            }
        }

        Ok(Self { accounts })
    }

    /// The built-in chart, an English-named cut of the Czech statutory
    /// chart of accounts covering every group the generator and the KPI
    /// bucketing rules touch.
    pub fn standard() -> Self {
        Self::from_rows(standard_rows()).unwrap()
    }

    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn require(&self, id: &str, context: &str) -> Result<&Account> {
        self.accounts
            .get(id)
            .ok_or_else(|| SyntheticLedgerError::UnknownAccount {
                account_id: id.to_string(),
                context: context.to_string(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn accounts_with_role(&self, role: AccountRole) -> Vec<&Account> {
        self.accounts.values().filter(|a| a.role == role).collect()
    }

    pub fn accounts_with_kind(&self, kind: AccountKind) -> Vec<&Account> {
        self.accounts.values().filter(|a| a.kind == kind).collect()
    }

    pub fn total_accounts(&self) -> usize {
        self.accounts.len()
    }

    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(&self.accounts.values().collect::<Vec<_>>())?;
        Ok(json)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("account_id,name,kind,group,class,role\n");

        for account in self.accounts.values() {
            output.push_str(&format!(
                "{},{},{:?},{},{},{:?}\n",
                account.id, account.name, account.kind, account.group, account.class, account.role
            ));
        }

        output
    }
}

fn standard_rows() -> Vec<AccountRow> {
    use AccountKind::*;

    let table: &[(&str, &str, AccountKind, &str, u8)] = &[
        // Class 0: fixed assets
        ("012", "Software", Asset, "01 Intangible fixed assets", 0),
        ("013", "Licenses and similar rights", Asset, "01 Intangible fixed assets", 0),
        ("021", "Buildings", Asset, "02 Tangible fixed assets", 0),
        ("022", "Machinery and equipment", Asset, "02 Tangible fixed assets", 0),
        ("031", "Land", Asset, "03 Non-depreciated tangible assets", 0),
        ("042", "Fixed assets under construction", Asset, "04 Assets under construction", 0),
        ("051", "Advances for intangible assets", Asset, "05 Advances for fixed assets", 0),
        ("061", "Shares in controlled entities", Asset, "06 Long-term financial assets", 0),
        ("073", "Accumulated amortization of software", Asset, "07 Accumulated amortization", 0),
        ("081", "Accumulated depreciation of buildings", Asset, "08 Accumulated depreciation", 0),
        ("082", "Accumulated depreciation of machinery", Asset, "08 Accumulated depreciation", 0),
        ("091", "Impairment of intangible assets", Asset, "09 Impairments of fixed assets", 0),
        // Class 1: inventory
        ("112", "Materials in stock", Asset, "11 Materials", 1),
        ("121", "Work in progress", Asset, "12 Inventory of own production", 1),
        ("123", "Finished goods", Asset, "12 Inventory of own production", 1),
        ("132", "Goods in stock", Asset, "13 Goods", 1),
        // Class 2: short-term financial assets and loans
        ("211", "Petty cash", Asset, "21 Cash", 2),
        ("213", "Cash equivalents", Asset, "21 Cash", 2),
        ("221", "Bank accounts", Asset, "22 Bank accounts", 2),
        ("231", "Short-term bank loans", Liability, "23 Short-term loans", 2),
        ("261", "Cash in transit", Asset, "26 Transfers", 2),
        // Class 3: settlement relations
        ("311", "Trade receivables", Asset, "31 Receivables", 3),
        ("314", "Short-term advances paid", Asset, "31 Receivables", 3),
        ("315", "Other receivables", Asset, "31 Receivables", 3),
        ("321", "Trade payables", Liability, "32 Trade payables", 3),
        ("324", "Advances received", Liability, "32 Trade payables", 3),
        ("325", "Other payables", Liability, "32 Trade payables", 3),
        ("331", "Payroll liabilities", Liability, "33 Employee settlements", 3),
        ("333", "Other employee liabilities", Liability, "33 Employee settlements", 3),
        ("335", "Receivables from employees", Asset, "33 Employee settlements", 3),
        ("336", "Social security and health insurance liabilities", Liability, "33 Employee settlements", 3),
        ("341", "Income tax liability", Liability, "34 Taxes and subsidies", 3),
        ("342", "Other direct taxes", Liability, "34 Taxes and subsidies", 3),
        ("343", "Value added tax", Liability, "34 Taxes and subsidies", 3),
        ("345", "Other taxes and fees", Liability, "34 Taxes and subsidies", 3),
        ("381", "Prepaid expenses", Asset, "38 Accruals and deferrals", 3),
        ("383", "Accrued expenses", Liability, "38 Accruals and deferrals", 3),
        ("384", "Deferred revenue", Liability, "38 Accruals and deferrals", 3),
        ("386", "Estimated receivables", Asset, "38 Accruals and deferrals", 3),
        ("388", "Estimated payables", Liability, "38 Accruals and deferrals", 3),
        ("391", "Allowance for doubtful receivables", Asset, "39 Allowances", 3),
        // Class 4: equity and long-term liabilities
        ("411", "Share capital", Liability, "41 Share capital", 4),
        ("413", "Other capital funds", Liability, "41 Share capital", 4),
        ("421", "Statutory reserve fund", Liability, "42 Funds and retained earnings", 4),
        ("428", "Retained earnings", Liability, "42 Funds and retained earnings", 4),
        ("429", "Accumulated losses", Liability, "42 Funds and retained earnings", 4),
        ("431", "Profit or loss under approval", Liability, "43 Profit and loss", 4),
        ("451", "Statutory provisions", Liability, "45 Provisions", 4),
        ("459", "Other provisions", Liability, "45 Provisions", 4),
        ("461", "Bank loans", Liability, "46 Long-term bank loans", 4),
        ("479", "Other long-term liabilities", Liability, "47 Long-term liabilities", 4),
        ("481", "Deferred tax liability", Liability, "48 Deferred tax", 4),
        // Class 5: expenses
        ("501", "Materials consumed", Expense, "50 Consumed purchases", 5),
        ("502", "Energy consumed", Expense, "50 Consumed purchases", 5),
        ("504", "Goods sold", Expense, "50 Consumed purchases", 5),
        ("511", "Repairs and maintenance", Expense, "51 Services", 5),
        ("512", "Travel expenses", Expense, "51 Services", 5),
        ("513", "Entertainment expenses", Expense, "51 Services", 5),
        ("518", "Other services", Expense, "51 Services", 5),
        ("521", "Wages and salaries", Expense, "52 Personnel expenses", 5),
        ("524", "Statutory social and health insurance", Expense, "52 Personnel expenses", 5),
        ("527", "Statutory social costs", Expense, "52 Personnel expenses", 5),
        ("531", "Road tax", Expense, "53 Taxes and fees", 5),
        ("532", "Property tax", Expense, "53 Taxes and fees", 5),
        ("538", "Other taxes and fees", Expense, "53 Taxes and fees", 5),
        ("541", "Net book value of assets sold", Expense, "54 Other operating expenses", 5),
        ("543", "Gifts", Expense, "54 Other operating expenses", 5),
        ("544", "Contractual penalties and default interest", Expense, "54 Other operating expenses", 5),
        ("546", "Receivables written off", Expense, "54 Other operating expenses", 5),
        ("548", "Other operating expenses", Expense, "54 Other operating expenses", 5),
        ("551", "Depreciation of fixed assets", Expense, "55 Depreciation and allowances", 5),
        ("559", "Allowances for assets", Expense, "55 Depreciation and allowances", 5),
        ("562", "Interest expense", Expense, "56 Financial expenses", 5),
        ("563", "Foreign exchange losses", Expense, "56 Financial expenses", 5),
        ("568", "Other financial expenses", Expense, "56 Financial expenses", 5),
        ("591", "Income tax - current", Expense, "59 Income taxes", 5),
        ("592", "Income tax - deferred", Expense, "59 Income taxes", 5),
        // Class 6: revenue
        ("601", "Revenue from own products", Revenue, "60 Revenue from products and goods", 6),
        ("602", "Revenue from services", Revenue, "60 Revenue from products and goods", 6),
        ("604", "Revenue from goods", Revenue, "60 Revenue from products and goods", 6),
        ("641", "Gains on disposal of fixed assets", Revenue, "64 Other operating revenue", 6),
        ("642", "Revenue from materials sold", Revenue, "64 Other operating revenue", 6),
        ("648", "Other operating revenue", Revenue, "64 Other operating revenue", 6),
        ("662", "Interest income", Revenue, "66 Financial revenue", 6),
        ("663", "Foreign exchange gains", Revenue, "66 Financial revenue", 6),
        ("668", "Other financial revenue", Revenue, "66 Financial revenue", 6),
        // Class 7: closing and off-balance
        ("701", "Opening balance sheet account", Closing, "70 Balance sheet accounts", 7),
        ("702", "Closing balance sheet account", Closing, "70 Balance sheet accounts", 7),
        ("710", "Profit and loss account", Closing, "71 Profit and loss account", 7),
        ("799", "Off-balance records", OffBalance, "79 Off-balance accounts", 7),
    ];

    table
        .iter()
        .map(|(id, name, kind, group, class)| AccountRow {
            id: (*id).to_string(),
            name: (*name).to_string(),
            kind: *kind,
            group: (*group).to_string(),
            class: *class,
        })
        .collect()
}
