//! Allocation-directory enrichment.
//!
//! Overwrites project name, PI and institution code from the allocation
//! directory, then verifies every billable row is backed by a registered
//! allocation.

use std::collections::{BTreeSet, HashMap};

use crate::config::InvoiceConfig;
use crate::dataset::Dataset;
use crate::directory::AllocationDirectory;
use crate::error::{InvoiceError, Result};
use crate::models::AllocationRecord;
use crate::rules::{ProjectRuleMatcher, is_billable_project};
use crate::stages::{Stage, StageContext};

/// Directory data keyed by (project id, canonical cluster name)
pub type AllocationMap = HashMap<(String, String), AllocationRecord>;

/// Build the allocation map, skipping malformed directory entries
pub fn allocation_map(entries: &[serde_json::Value], config: &InvoiceConfig) -> AllocationMap {
    let mut map = AllocationMap::new();
    let mut skipped = 0usize;
    for entry in entries {
        match AllocationRecord::from_directory_entry(entry) {
            Some(rec) => {
                let cluster = config.directory_cluster_name(&rec.resource_name);
                map.insert((rec.project_id.clone(), cluster), rec);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "directory entries without required fields");
    }
    map
}

pub fn apply_allocations(data: &mut Dataset, allocations: &AllocationMap) {
    for record in data.iter_mut() {
        let key = (record.project_id.clone(), record.cluster_name.clone());
        if let Some(alloc) = allocations.get(&key) {
            record.project_name = alloc.project_name.clone();
            record.pi_name = Some(alloc.pi_name.clone()).filter(|p| !p.trim().is_empty());
            record.institution_code = Some(alloc.institution_code.clone());
        }
    }
}

/// Billable (project, cluster) pairs with no directory entry, sorted
pub fn missing_allocations(
    data: &Dataset,
    allocations: &AllocationMap,
    matcher: &ProjectRuleMatcher,
) -> Vec<(String, String)> {
    data.iter()
        .filter(|r| is_billable_project(matcher, r))
        .filter(|r| {
            !allocations.contains_key(&(r.project_id.clone(), r.cluster_name.clone()))
        })
        .map(|r| (r.project_name.clone(), r.cluster_name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub struct AllocationEnrichment<'a> {
    directory: &'a dyn AllocationDirectory,
}

impl<'a> AllocationEnrichment<'a> {
    pub fn new(directory: &'a dyn AllocationDirectory) -> Self {
        AllocationEnrichment { directory }
    }
}

impl Stage for AllocationEnrichment<'_> {
    fn name(&self) -> &'static str {
        "allocation-enrichment"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let entries = self.directory.fetch_allocations()?;
        let allocations = allocation_map(&entries, ctx.config);
        tracing::info!(
            entries = entries.len(),
            allocations = allocations.len(),
            "fetched allocation directory"
        );
        apply_allocations(&mut data, &allocations);

        let matcher = ProjectRuleMatcher::new(&ctx.config.nonbillable_rules);
        let missing = missing_allocations(&data, &allocations, &matcher);
        if !missing.is_empty() {
            return Err(InvoiceError::MissingAllocations { missing });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::models::{ResolvedRule, UsageRecord};
    use crate::stages::test_support::month;
    use serde_json::{Value, json};

    fn invoice(
        ids: &[&str],
        names: Option<&[&str]>,
        pis: Option<&[&str]>,
        codes: Option<&[&str]>,
        clusters: &[&str],
    ) -> Dataset {
        let opt = |v: Option<&[&str]>, i: usize| {
            v.map(|v| v[i].to_string()).filter(|s| !s.is_empty())
        };
        Dataset::new(
            ids.iter()
                .enumerate()
                .map(|(i, id)| UsageRecord {
                    project_id: id.to_string(),
                    project_name: names.map_or(id.to_string(), |n| n[i].to_string()),
                    pi_name: opt(pis, i),
                    institution_code: opt(codes, i),
                    cluster_name: clusters[i].to_string(),
                    ..Default::default()
                })
                .collect(),
        )
    }

    fn directory_entries(ids: &[&str], pis: &[&str], codes: &[&str], clusters: &[&str]) -> Vec<Value> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "resource": {"name": clusters[i]},
                    "project": {"pi": pis[i]},
                    "attributes": {
                        "Allocated Project ID": id,
                        "Allocated Project Name": format!("{id}-name"),
                        "Institution-Specific Code": codes[i],
                    }
                })
            })
            .collect()
    }

    fn run(data: Dataset, entries: Vec<Value>, rules: Vec<ResolvedRule>) -> Result<Dataset> {
        let config = InvoiceConfig {
            nonbillable_rules: rules,
            ..Default::default()
        };
        let m = month("2024-01");
        let ctx = StageContext::new(&m, &config);
        let directory = StaticDirectory::new(entries);
        AllocationEnrichment::new(&directory).process(data, &ctx)
    }

    #[test]
    fn test_enriches_matching_rows() {
        let entries = directory_entries(
            &["P1", "P2", "P3", "P4"],
            &["PI1", "PI1", "", "PI12"],
            &["IC1", "", "", "IC2"],
            &["stack"; 4],
        );
        let data = invoice(&["P1", "P1", "P2", "P3", "P4"], None, None, None, &["stack"; 5]);
        let expected = invoice(
            &["P1", "P1", "P2", "P3", "P4"],
            Some(&["P1-name", "P1-name", "P2-name", "P3-name", "P4-name"]),
            Some(&["PI1", "PI1", "PI1", "", "PI12"]),
            Some(&["IC1", "IC1", "", "", "IC2"]),
            &["stack"; 5],
        );
        let mut out = run(data, entries, vec![]).unwrap();
        // an empty directory code is still a directory value
        for r in out.iter_mut() {
            r.institution_code = r.institution_code.take().filter(|c| !c.is_empty());
        }
        assert_eq!(out, expected);
    }

    #[test]
    fn test_billable_project_not_in_directory() {
        let entries = directory_entries(&["P1", "P2"], &["PI1", "PI1"], &["IC1", "IC2"], &["stack"; 2]);
        let data = invoice(&["P1", "P2", "P3", "P4", "P5"], None, None, None, &["stack"; 5]);
        let rules = vec![ResolvedRule::new("P3", None, false)];
        let err = run(data, entries, rules).unwrap_err();
        match &err {
            InvoiceError::MissingAllocations { missing } => assert_eq!(
                missing,
                &[
                    ("P4".to_string(), "stack".to_string()),
                    ("P5".to_string(), "stack".to_string())
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            r#"Projects [("P4", "stack"), ("P5", "stack")] not found in the allocation directory and are billable! Please check the project names"#
        );
    }

    #[test]
    fn test_nonbillable_cluster_rows_need_no_allocation() {
        let entries = directory_entries(
            &["P1", "P2"],
            &["PI1", "PI1"],
            &["IC1", "IC2"],
            &["ocp-prod", "stack"],
        );
        let data = invoice(
            &["P1", "P2", "P3", "P4"],
            None,
            None,
            None,
            &["ocp-prod", "stack", "ocp-test", "ocp-test"],
        );
        let out = run(data, entries, vec![]).unwrap();
        let names: Vec<_> = out.iter().map(|r| r.project_name.as_str()).collect();
        assert_eq!(names, ["P1-name", "P2-name", "P3", "P4"]);
        assert_eq!(out.records()[2].pi_name, None);
    }

    #[test]
    fn test_missing_pairs_are_per_cluster() {
        let entries = directory_entries(
            &["P1", "P2"],
            &["PI1", "PI2"],
            &["IC1", "IC2"],
            &["clusterA", "clusterA"],
        );
        let data = invoice(
            &["P1", "P1", "P2", "P4"],
            None,
            None,
            None,
            &["clusterA", "clusterB", "clusterA", "clusterA"],
        );
        match run(data, entries, vec![]).unwrap_err() {
            InvoiceError::MissingAllocations { missing } => assert_eq!(
                missing,
                vec![
                    ("P1".to_string(), "clusterB".to_string()),
                    ("P4".to_string(), "clusterA".to_string())
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_directory_cluster_aliases_apply() {
        let entries = directory_entries(&["P1"], &["PI1"], &["IC1"], &["nerc-ocp-prod"]);
        let data = invoice(&["P1"], None, None, None, &["ocp-prod"]);
        let out = run(data, entries, vec![]).unwrap();
        assert_eq!(out.records()[0].project_name, "P1-name");
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut entries = directory_entries(&["P1"], &["PI1"], &["IC1"], &["stack"]);
        entries.push(json!({"resource": {"name": "stack"}}));
        let data = invoice(&["P1"], None, None, None, &["stack"]);
        assert!(run(data, entries, vec![]).is_ok());
    }
}
