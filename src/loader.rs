//! # Loader Module
//!
//! Reads the rule, alias, institute, ledger and rate files and assembles the
//! run's [`InvoiceConfig`].

use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::{InvoiceConfig, default_cluster_aliases};
use crate::error::Result;
use crate::models::{
    Institute, InstituteList, PiHistoryRecord, PrepayBook, PrepayContact, PrepayCredit,
    PrepayDebit, PrepayProject, RuleEntry,
};
use crate::month::InvoiceMonth;
use crate::rates::{EmptyRateTable, MonthlyRates, RateTable, YamlRateTable};
use crate::rules::resolve_rules;
use crate::settings::Settings;

/// One name per line; blank lines are ignored
pub fn parse_nonbillable_pis(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// `canonical,alias1,alias2,...` per line
pub fn parse_alias_map(text: &str) -> BTreeMap<String, Vec<String>> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.trim().split(',').map(str::trim);
            let canonical = fields.next().filter(|c| !c.is_empty())?;
            let aliases = fields.filter(|a| !a.is_empty()).map(str::to_string).collect();
            Some((canonical.to_string(), aliases))
        })
        .collect()
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Ledger written by earlier runs; absent before the first one
fn read_ledger<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "ledger not found, starting empty");
        return Ok(Vec::new());
    }
    read_csv(path)
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    Ok(serde_yaml::from_str(&fs::read_to_string(path)?)?)
}

pub fn load_cluster_aliases(path: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let mut aliases = default_cluster_aliases();
    if let Some(path) = path {
        let extra: BTreeMap<String, String> = read_yaml(path)?;
        aliases.extend(extra);
    }
    Ok(aliases)
}

pub fn load_prepay_book(settings: &Settings) -> Result<PrepayBook> {
    Ok(PrepayBook {
        credits: read_csv::<PrepayCredit>(&settings.prepay_credits)?,
        projects: read_csv::<PrepayProject>(&settings.prepay_projects)?,
        contacts: read_csv::<PrepayContact>(&settings.prepay_contacts)?,
        debits: read_ledger::<PrepayDebit>(&settings.prepay_debits)?,
    })
}

pub fn load_rates(settings: &Settings, month: &InvoiceMonth) -> Result<MonthlyRates> {
    let table: Box<dyn RateTable> = match &settings.rates {
        Some(path) => Box::new(YamlRateTable::from_path(path)?),
        None => Box::new(EmptyRateTable),
    };
    MonthlyRates::resolve(table.as_ref(), &settings.overrides, month)
}

/// Everything besides the usage data, resolved for the invoice month
pub fn load_config(settings: &Settings) -> Result<InvoiceConfig> {
    let month = &settings.invoice_month;
    let rule_entries: Vec<RuleEntry> = read_yaml(&settings.nonbillable_projects)?;
    let institutes: Vec<Institute> = read_yaml(&settings.institutes)?;

    let config = InvoiceConfig {
        nonbillable_pis: parse_nonbillable_pis(&fs::read_to_string(&settings.nonbillable_pis)?),
        nonbillable_rules: resolve_rules(&rule_entries, month),
        pi_aliases: parse_alias_map(&fs::read_to_string(&settings.alias)?),
        cluster_aliases: load_cluster_aliases(settings.cluster_aliases.as_deref())?,
        institutes: InstituteList::new(institutes),
        rates: load_rates(settings, month)?,
        pi_history: read_ledger::<PiHistoryRecord>(&settings.pi_history)?,
        prepay: load_prepay_book(settings)?,
        ..Default::default()
    };
    tracing::info!(
        month = %month,
        nonbillable_pis = config.nonbillable_pis.len(),
        nonbillable_rules = config.nonbillable_rules.len(),
        institutes = config.institutes.institutes.len(),
        prepay_groups = config.prepay.contacts.len(),
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_map() {
        let map = parse_alias_map("alice@bu.edu,a1@bu.edu, a2@bu.edu\n\nbob@bu.edu\n");
        assert_eq!(map["alice@bu.edu"], ["a1@bu.edu", "a2@bu.edu"]);
        assert!(map["bob@bu.edu"].is_empty());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_nonbillable_pis_skip_blank_lines() {
        let pis = parse_nonbillable_pis("PI1\n\n  PI2  \n");
        assert_eq!(pis.len(), 2);
        assert!(pis.contains("PI2"));
    }

    #[test]
    fn test_cluster_alias_override_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.yaml");
        fs::write(&path, "new-cluster: stack\nesi: bm\n").unwrap();
        let aliases = load_cluster_aliases(Some(&path)).unwrap();
        assert_eq!(aliases["new-cluster"], "stack");
        assert_eq!(aliases["nerc-ocp-prod"], "ocp-prod");
    }

    #[test]
    fn test_prepay_csv_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let projects = dir.path().join("projects.csv");
        fs::write(
            &projects,
            "Group Name,Project,Start Date,End Date\nG1,P1,2023-01,\nG1,P2,,2023-06\n",
        )
        .unwrap();
        let contacts = dir.path().join("contacts.csv");
        fs::write(
            &contacts,
            "Group Name,Group Contact Email,MGHPCC Managed\nG1,g1@bu.edu,True\n",
        )
        .unwrap();

        let projects: Vec<PrepayProject> = read_csv(&projects).unwrap();
        assert_eq!(projects[0].start, Some(InvoiceMonth::parse("2023-01").unwrap()));
        assert_eq!(projects[0].end, None);
        assert_eq!(projects[1].start, None);

        let contacts: Vec<PrepayContact> = read_csv(&contacts).unwrap();
        assert!(contacts[0].managed);
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history: Vec<PiHistoryRecord> = read_ledger(&dir.path().join("PI.csv")).unwrap();
        assert!(history.is_empty());
    }
}
