//! # Config Module
//!
//! Everything a run needs besides the usage data, built once at startup and
//! passed by reference into every stage and view.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::{InstituteList, PiHistoryRecord, PrepayBook, ResolvedRule};
use crate::rates::MonthlyRates;

/// Institution whose projects receive the flat subsidy
pub const SUBSIDY_INSTITUTION: &str = "Boston University";

/// Credit code written next to new-PI credits
pub const NEW_PI_CREDIT_CODE: &str = "0002";

/// Cluster that gets its own test-traffic invoice
pub const OCP_TEST_CLUSTER: &str = "ocp-test";

/// Known cluster aliases mapped to canonical names
pub fn default_cluster_aliases() -> BTreeMap<String, String> {
    [
        ("stack", "stack"),
        ("openstack", "stack"),
        ("NERC OpenStack", "stack"),
        ("ocp-prod", "ocp-prod"),
        ("nerc-ocp-prod", "ocp-prod"),
        ("ocp-test", "ocp-test"),
        ("nerc-ocp-test", "ocp-test"),
        ("academic", "academic"),
        ("nerc-ocp-edu", "academic"),
        ("bm", "bm"),
        ("esi", "bm"),
        ("barcelona", "barcelona"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Full SU type names billed at Lenovo rates
pub fn default_lenovo_su_types() -> Vec<String> {
    ["OpenShift GPUA100SXM4", "OpenStack GPUA100SXM4", "OpenShift GPUH100", "OpenStack GPUH100"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The SU kind at the end of an SU type name (`OpenShift GPUH100` → `GPUH100`)
pub fn su_kind(su_type: &str) -> &str {
    su_type.split_whitespace().last().unwrap_or(su_type)
}

#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    pub nonbillable_pis: HashSet<String>,
    /// Nonbillable project rules already resolved for the invoice month
    pub nonbillable_rules: Vec<ResolvedRule>,
    /// Canonical PI name → aliases
    pub pi_aliases: BTreeMap<String, Vec<String>>,
    pub cluster_aliases: BTreeMap<String, String>,
    pub institutes: InstituteList,
    pub rates: MonthlyRates,
    pub pi_history: Vec<PiHistoryRecord>,
    pub prepay: PrepayBook,
    pub lenovo_su_types: Vec<String>,
    /// SU types never covered by new-PI credits
    pub credit_excluded_su_types: Vec<String>,
    pub subsidy_institution: String,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        InvoiceConfig {
            nonbillable_pis: HashSet::new(),
            nonbillable_rules: Vec::new(),
            pi_aliases: BTreeMap::new(),
            cluster_aliases: default_cluster_aliases(),
            institutes: InstituteList::default(),
            rates: MonthlyRates::default(),
            pi_history: Vec::new(),
            prepay: PrepayBook::default(),
            lenovo_su_types: default_lenovo_su_types(),
            credit_excluded_su_types: default_lenovo_su_types(),
            subsidy_institution: SUBSIDY_INSTITUTION.to_string(),
        }
    }
}

impl InvoiceConfig {
    pub fn canonical_clusters(&self) -> BTreeSet<&str> {
        self.cluster_aliases.values().map(String::as_str).collect()
    }

    /// Canonical name for a cluster, or `None` when it is unknown
    pub fn canonical_cluster<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if let Some(canonical) = self.cluster_aliases.get(name) {
            return Some(canonical.as_str());
        }
        self.canonical_clusters().contains(name).then_some(name)
    }

    /// Alias table for directory resource names; unknown names pass through
    pub fn directory_cluster_name(&self, resource: &str) -> String {
        self.cluster_aliases
            .get(resource)
            .cloned()
            .unwrap_or_else(|| resource.to_string())
    }

    pub fn is_lenovo_su_type(&self, su_type: &str) -> bool {
        self.lenovo_su_types.iter().any(|t| t == su_type)
    }
}
