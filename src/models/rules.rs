use serde::Deserialize;

use crate::month::{InvoiceMonth, MonthRange};

/// Cluster entry inside a nonbillable project rule file
#[derive(Deserialize, Debug, Clone)]
pub struct RuleClusterEntry {
    pub name: String,
    pub start: Option<InvoiceMonth>,
    pub end: Option<InvoiceMonth>,
}

/// One entry of the nonbillable projects YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct RuleEntry {
    pub name: String,
    #[serde(default)]
    pub clusters: Option<Vec<RuleClusterEntry>>,
    pub start: Option<InvoiceMonth>,
    pub end: Option<InvoiceMonth>,
}

/// Normalized nonbillable project rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonbillableRule {
    Global {
        project: String,
    },
    Scoped {
        project: String,
        cluster: String,
    },
    TimedGlobal {
        project: String,
        range: MonthRange,
    },
    TimedScoped {
        project: String,
        cluster: String,
        range: MonthRange,
    },
}

/// A rule active in the invoice month. `cluster == None` means every cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRule {
    pub project: String,
    pub cluster: Option<String>,
    pub is_timed: bool,
}

impl ResolvedRule {
    pub fn new(project: &str, cluster: Option<&str>, is_timed: bool) -> Self {
        ResolvedRule {
            project: project.to_string(),
            cluster: cluster.map(str::to_string),
            is_timed,
        }
    }
}
