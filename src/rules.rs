//! # Rules Module
//!
//! Resolves the nonbillable project rule file against the invoice month into a
//! flat list of `(project, cluster, is_timed)` facts. Nothing downstream of the
//! resolver needs any date logic.

use std::collections::HashSet;

use crate::models::{NonbillableRule, ResolvedRule, RuleEntry, UsageRecord};
use crate::month::{InvoiceMonth, MonthRange};

/// Clusters reserved for test and partner traffic; never billed
pub const NONBILLABLE_CLUSTERS: [&str; 2] = ["ocp-test", "barcelona"];

/// Normalize one rule-file entry into tagged rules.
///
/// A top-level range applies to every listed cluster and overrides any
/// per-cluster range.
pub fn normalize_entry(entry: &RuleEntry) -> Vec<NonbillableRule> {
    let top_range = MonthRange::new(entry.start.clone(), entry.end.clone());
    let project = entry.name.clone();

    match (top_range, entry.clusters.as_deref()) {
        (Some(range), Some(clusters)) => clusters
            .iter()
            .map(|c| NonbillableRule::TimedScoped {
                project: project.clone(),
                cluster: c.name.clone(),
                range: range.clone(),
            })
            .collect(),
        (Some(range), None) => vec![NonbillableRule::TimedGlobal { project, range }],
        (None, Some(clusters)) => clusters
            .iter()
            .map(
                |c| match MonthRange::new(c.start.clone(), c.end.clone()) {
                    Some(range) => NonbillableRule::TimedScoped {
                        project: project.clone(),
                        cluster: c.name.clone(),
                        range,
                    },
                    None => NonbillableRule::Scoped {
                        project: project.clone(),
                        cluster: c.name.clone(),
                    },
                },
            )
            .collect(),
        (None, None) => vec![NonbillableRule::Global { project }],
    }
}

impl NonbillableRule {
    /// The rule as a fact for `month`, or `None` when its window excludes the month
    pub fn resolve(&self, month: &InvoiceMonth) -> Option<ResolvedRule> {
        match self {
            NonbillableRule::Global { project } => Some(ResolvedRule::new(project, None, false)),
            NonbillableRule::Scoped { project, cluster } => {
                Some(ResolvedRule::new(project, Some(cluster), false))
            }
            NonbillableRule::TimedGlobal { project, range } => range
                .contains(month)
                .then(|| ResolvedRule::new(project, None, true)),
            NonbillableRule::TimedScoped {
                project,
                cluster,
                range,
            } => range
                .contains(month)
                .then(|| ResolvedRule::new(project, Some(cluster), true)),
        }
    }
}

/// Resolve rule-file entries for `month`, preserving file order
pub fn resolve_rules(entries: &[RuleEntry], month: &InvoiceMonth) -> Vec<ResolvedRule> {
    entries
        .iter()
        .flat_map(normalize_entry)
        .filter_map(|rule| rule.resolve(month))
        .collect()
}

/// Case-insensitive matcher over resolved rules.
///
/// Project names are lowercased on both sides; cluster names are compared as-is.
#[derive(Debug, Clone, Default)]
pub struct ProjectRuleMatcher {
    any_cluster: HashSet<String>,
    per_cluster: HashSet<(String, String)>,
}

impl ProjectRuleMatcher {
    pub fn new(rules: &[ResolvedRule]) -> Self {
        let mut matcher = ProjectRuleMatcher::default();
        for rule in rules {
            let project = rule.project.to_lowercase();
            match &rule.cluster {
                Some(cluster) => {
                    matcher.per_cluster.insert((project, cluster.clone()));
                }
                None => {
                    matcher.any_cluster.insert(project);
                }
            }
        }
        matcher
    }

    /// Any matching rule excludes the project
    pub fn is_nonbillable(&self, project: &str, cluster: &str) -> bool {
        let project = project.to_lowercase();
        self.any_cluster.contains(&project)
            || self
                .per_cluster
                .contains(&(project, cluster.to_string()))
    }
}

pub fn is_nonbillable_cluster(cluster: &str) -> bool {
    NONBILLABLE_CLUSTERS.contains(&cluster)
}

/// Project and cluster criteria only; the PI list is not consulted
pub fn is_billable_project(matcher: &ProjectRuleMatcher, record: &UsageRecord) -> bool {
    !matcher.is_nonbillable(&record.project_name, &record.cluster_name)
        && !is_nonbillable_cluster(&record.cluster_name)
}

/// Timed rules active this month, for the run log
pub fn timed_rules(rules: &[ResolvedRule]) -> impl Iterator<Item = &ResolvedRule> {
    rules.iter().filter(|r| r.is_timed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_YAML: &str = r#"
- name: ProjectA
  clusters:
    - name: Cluster1
    - name: Cluster2
- name: ProjectB
  clusters:
    - name: Cluster1
      start: "2023-01"
      end: "2023-12"
- name: ProjectC
  start: "2023-06"
  end: "2023-07"
- name: ProjectD
  clusters:
    - name: Cluster1
      start: "2023-05"
      end: "2023-09"
    - name: Cluster2
      start: "2023-05"
      end: "2023-11"
- name: ProjectE
"#;

    fn entries() -> Vec<RuleEntry> {
        serde_yaml::from_str(RULES_YAML).unwrap()
    }

    fn month(s: &str) -> InvoiceMonth {
        InvoiceMonth::parse(s).unwrap()
    }

    #[test]
    fn test_resolves_all_rule_shapes() {
        let resolved = resolve_rules(&entries(), &month("2023-09"));
        assert_eq!(
            resolved,
            vec![
                ResolvedRule::new("ProjectA", Some("Cluster1"), false),
                ResolvedRule::new("ProjectA", Some("Cluster2"), false),
                ResolvedRule::new("ProjectB", Some("Cluster1"), true),
                ResolvedRule::new("ProjectD", Some("Cluster1"), true),
                ResolvedRule::new("ProjectD", Some("Cluster2"), true),
                ResolvedRule::new("ProjectE", None, false),
            ]
        );
    }

    #[test]
    fn test_out_of_range_entry_is_dropped() {
        let resolved = resolve_rules(&entries(), &month("2023-09"));
        assert!(resolved.iter().all(|r| r.project != "ProjectC"));

        let in_range = resolve_rules(&entries(), &month("2023-07"));
        assert!(in_range.contains(&ResolvedRule::new("ProjectC", None, true)));
    }

    #[test]
    fn test_per_cluster_windows_are_independent() {
        let resolved = resolve_rules(&entries(), &month("2023-10"));
        let d: Vec<_> = resolved.iter().filter(|r| r.project == "ProjectD").collect();
        assert_eq!(d, vec![&ResolvedRule::new("ProjectD", Some("Cluster2"), true)]);
    }

    #[test]
    fn test_top_level_range_applies_to_clusters() {
        let entries: Vec<RuleEntry> = serde_yaml::from_str(
            r#"
- name: ProjectF
  start: "2024-01"
  end: "2024-03"
  clusters:
    - name: stack
    - name: ocp-prod
"#,
        )
        .unwrap();
        assert_eq!(
            resolve_rules(&entries, &month("2024-02")),
            vec![
                ResolvedRule::new("ProjectF", Some("stack"), true),
                ResolvedRule::new("ProjectF", Some("ocp-prod"), true),
            ]
        );
        assert!(resolve_rules(&entries, &month("2024-04")).is_empty());
    }

    #[test]
    fn test_matcher_is_case_insensitive_on_project_only() {
        let rules = vec![
            ResolvedRule::new("p1", None, false),
            ResolvedRule::new("P8", Some("bm"), false),
        ];
        let m = ProjectRuleMatcher::new(&rules);
        assert!(m.is_nonbillable("P1", "stack"));
        assert!(m.is_nonbillable("P1", "anything"));
        assert!(m.is_nonbillable("p8", "bm"));
        assert!(!m.is_nonbillable("P8", "BM"));
        assert!(!m.is_nonbillable("P8", "stack"));
    }
}
