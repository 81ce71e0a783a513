use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{de_decimal, de_flag};
use crate::month::{InvoiceMonth, MonthRange};

/// Credit added to a prepay group's balance in a month
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PrepayCredit {
    #[serde(rename = "Month")]
    pub month: InvoiceMonth,
    #[serde(rename = "Group Name")]
    pub group: String,
    #[serde(rename = "Credit", deserialize_with = "de_decimal")]
    pub credit: Decimal,
}

/// Project attached to a prepay group for a span of months
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PrepayProject {
    #[serde(rename = "Group Name")]
    pub group: String,
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Start Date")]
    pub start: Option<InvoiceMonth>,
    #[serde(rename = "End Date")]
    pub end: Option<InvoiceMonth>,
}

impl PrepayProject {
    pub fn is_active(&self, month: &InvoiceMonth) -> bool {
        MonthRange::new(self.start.clone(), self.end.clone()).is_none_or(|r| r.contains(month))
    }
}

/// Contact details for a prepay group
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PrepayContact {
    #[serde(rename = "Group Name")]
    pub group: String,
    #[serde(rename = "Group Contact Email")]
    pub email: String,
    #[serde(rename = "MGHPCC Managed", deserialize_with = "de_flag", default)]
    pub managed: bool,
}

/// Amount drawn from a prepay group's balance in a month
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PrepayDebit {
    #[serde(rename = "Month")]
    pub month: InvoiceMonth,
    #[serde(rename = "Group Name")]
    pub group: String,
    #[serde(rename = "Debit", deserialize_with = "de_decimal")]
    pub debit: Decimal,
}

pub const DEBIT_HEADERS: [&str; 3] = ["Month", "Group Name", "Debit"];

/// All prepay tables for a run
#[derive(Debug, Clone, Default)]
pub struct PrepayBook {
    pub credits: Vec<PrepayCredit>,
    pub projects: Vec<PrepayProject>,
    pub contacts: Vec<PrepayContact>,
    pub debits: Vec<PrepayDebit>,
}

impl PrepayBook {
    pub fn contact(&self, group: &str) -> Option<&PrepayContact> {
        self.contacts.iter().find(|c| c.group == group)
    }

    /// Group funding `project` in `month`, if any
    pub fn group_for_project(&self, project: &str, month: &InvoiceMonth) -> Option<&str> {
        self.projects
            .iter()
            .find(|p| p.project == project && p.is_active(month))
            .map(|p| p.group.as_str())
    }

    pub fn credits_for(&self, group: &str, month: &InvoiceMonth) -> Decimal {
        self.credits
            .iter()
            .filter(|c| c.group == group && &c.month == month)
            .map(|c| c.credit)
            .sum()
    }

    pub fn credits_through(&self, group: &str, month: &InvoiceMonth) -> Decimal {
        self.credits
            .iter()
            .filter(|c| c.group == group && &c.month <= month)
            .map(|c| c.credit)
            .sum()
    }

    /// Debits recorded before `month`; the month's own debits are recomputed each run
    pub fn debits_before(&self, group: &str, month: &InvoiceMonth) -> Decimal {
        self.debits
            .iter()
            .filter(|d| d.group == group && &d.month < month)
            .map(|d| d.debit)
            .sum()
    }

    /// Group names in contact-file order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.contacts.iter().map(|c| c.group.as_str())
    }
}
