use rust_decimal::Decimal;

use crate::error::{InvoiceError, Result};

/// One line-item of cloud usage for a project on a cluster in the invoice month.
///
/// Fields after `cluster_name` are populated by the preliminary stages and stay
/// `None` until their stage runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsageRecord {
    pub invoice_month: String,
    pub project_name: String,
    pub project_id: String,
    pub pi_name: Option<String>,
    pub invoice_email: Option<String>,
    pub invoice_address: Option<String>,
    pub institution: Option<String>,
    pub institution_code: Option<String>,
    /// Service units consumed
    pub su_hours: Option<Decimal>,
    pub su_type: Option<String>,
    pub rate: String,
    pub cost: Decimal,
    pub cluster_name: String,

    pub is_billable: Option<bool>,
    pub missing_pi: Option<bool>,
    pub su_charge: Option<Decimal>,
    pub lenovo_charge: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub credit_code: Option<String>,
    pub subsidy: Option<Decimal>,
    pub pi_balance: Option<Decimal>,
    pub balance: Option<Decimal>,
    pub prepay_group: Option<String>,
    pub group_managed: Option<bool>,
    pub group_balance: Option<Decimal>,
    pub group_balance_used: Option<Decimal>,
}

impl UsageRecord {
    /// PI name when present and not blank
    pub fn pi(&self) -> Option<&str> {
        self.pi_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn billable(&self) -> Result<bool> {
        self.is_billable.ok_or(InvoiceError::ColumnNotReady {
            column: Column::IsBillable.header(),
        })
    }

    pub fn has_missing_pi(&self) -> Result<bool> {
        self.missing_pi.ok_or(InvoiceError::ColumnNotReady {
            column: Column::MissingPi.header(),
        })
    }

    /// Billable with a PI to send the invoice to
    pub fn invoiceable(&self) -> Result<bool> {
        Ok(self.billable()? && !self.has_missing_pi()?)
    }

    pub fn credit_or_zero(&self) -> Decimal {
        self.credit.unwrap_or(Decimal::ZERO)
    }

    pub fn subsidy_or_zero(&self) -> Decimal {
        self.subsidy.unwrap_or(Decimal::ZERO)
    }

    pub fn cell(&self, column: Column) -> String {
        fn text(v: &Option<String>) -> String {
            v.clone().unwrap_or_default()
        }
        match column {
            Column::InvoiceMonth => self.invoice_month.clone(),
            Column::ProjectName => self.project_name.clone(),
            Column::ProjectId => self.project_id.clone(),
            Column::Pi => text(&self.pi_name),
            Column::InvoiceEmail => text(&self.invoice_email),
            Column::InvoiceAddress => text(&self.invoice_address),
            Column::Institution => text(&self.institution),
            Column::InstitutionCode => text(&self.institution_code),
            Column::SuHours => self.su_hours.map(|d| d.to_string()).unwrap_or_default(),
            Column::SuType => text(&self.su_type),
            Column::Rate => self.rate.clone(),
            Column::Cost => money(self.cost),
            Column::ClusterName => self.cluster_name.clone(),
            Column::IsBillable => flag(self.is_billable),
            Column::MissingPi => flag(self.missing_pi),
            Column::SuCharge => self.su_charge.map(|d| d.to_string()).unwrap_or_default(),
            Column::LenovoCharge => opt_money(self.lenovo_charge),
            Column::Credit => opt_money(self.credit),
            Column::CreditCode => text(&self.credit_code),
            Column::Subsidy => opt_money(self.subsidy),
            Column::PiBalance => opt_money(self.pi_balance),
            Column::Balance => opt_money(self.balance),
            Column::PrepayGroup => text(&self.prepay_group),
            Column::GroupManaged => flag(self.group_managed),
            Column::GroupBalance => opt_money(self.group_balance),
            Column::GroupBalanceUsed => opt_money(self.group_balance_used),
        }
    }
}

pub fn money(d: Decimal) -> String {
    format!("{:.2}", d)
}

fn opt_money(d: Option<Decimal>) -> String {
    d.map(money).unwrap_or_default()
}

fn flag(b: Option<bool>) -> String {
    match b {
        Some(true) => "True".to_string(),
        Some(false) => "False".to_string(),
        None => String::new(),
    }
}

/// Dataset columns and their presentation headers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    InvoiceMonth,
    ProjectName,
    ProjectId,
    Pi,
    InvoiceEmail,
    InvoiceAddress,
    Institution,
    InstitutionCode,
    SuHours,
    SuType,
    Rate,
    Cost,
    ClusterName,
    IsBillable,
    MissingPi,
    SuCharge,
    LenovoCharge,
    Credit,
    CreditCode,
    Subsidy,
    PiBalance,
    Balance,
    PrepayGroup,
    GroupManaged,
    GroupBalance,
    GroupBalanceUsed,
}

impl Column {
    pub fn header(self) -> &'static str {
        match self {
            Column::InvoiceMonth => "Invoice Month",
            Column::ProjectName => "Project - Allocation",
            Column::ProjectId => "Project - Allocation ID",
            Column::Pi => "Manager (PI)",
            Column::InvoiceEmail => "Invoice Email",
            Column::InvoiceAddress => "Invoice Address",
            Column::Institution => "Institution",
            Column::InstitutionCode => "Institution - Specific Code",
            Column::SuHours => "SU Hours (GBhr or SUhr)",
            Column::SuType => "SU Type",
            Column::Rate => "Rate",
            Column::Cost => "Cost",
            Column::ClusterName => "Cluster Name",
            Column::IsBillable => "Is Billable",
            Column::MissingPi => "Missing PI",
            Column::SuCharge => "SU Charge",
            Column::LenovoCharge => "Charge",
            Column::Credit => "Credit",
            Column::CreditCode => "Credit Code",
            Column::Subsidy => "Subsidy",
            Column::PiBalance => "PI Balance",
            Column::Balance => "Balance",
            Column::PrepayGroup => "Prepaid Group Name",
            Column::GroupManaged => "MGHPCC Managed",
            Column::GroupBalance => "Prepaid Group Balance",
            Column::GroupBalanceUsed => "Prepaid Group Used",
        }
    }
}
