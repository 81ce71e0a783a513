//! # Stages Module
//!
//! The preliminary pipeline: nine stages run in a fixed order over the dataset.
//! Each stage takes the current dataset by value and returns the next one with the
//! same number of rows.

pub mod billable;
pub mod cluster_name;
pub mod coldfront;
pub mod institution;
pub mod lenovo;
pub mod new_pi_credit;
pub mod pi_alias;
pub mod prepayment;
pub mod subsidy;

use crate::config::InvoiceConfig;
use crate::dataset::Dataset;
use crate::directory::AllocationDirectory;
use crate::error::{InvoiceError, Result};
use crate::month::InvoiceMonth;

pub use billable::ValidateBillable;
pub use cluster_name::ValidateClusterName;
pub use coldfront::AllocationEnrichment;
pub use institution::AddInstitution;
pub use lenovo::LenovoRates;
pub use new_pi_credit::NewPiCredit;
pub use pi_alias::ValidatePiAlias;
pub use prepayment::Prepayment;
pub use subsidy::Subsidy;

/// Read-only inputs shared by every stage and view
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub month: &'a InvoiceMonth,
    pub config: &'a InvoiceConfig,
}

impl<'a> StageContext<'a> {
    pub fn new(month: &'a InvoiceMonth, config: &'a InvoiceConfig) -> Self {
        StageContext { month, config }
    }
}

/// A preliminary processing stage
pub trait Stage {
    fn name(&self) -> &'static str;

    /// Produce the next dataset state; must not add or remove rows
    fn process(&self, data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset>;
}

/// The fixed stage sequence
pub fn preliminary_stages<'a>(directory: &'a dyn AllocationDirectory) -> Vec<Box<dyn Stage + 'a>> {
    vec![
        Box::new(ValidateClusterName),
        Box::new(AllocationEnrichment::new(directory)),
        Box::new(ValidatePiAlias),
        Box::new(AddInstitution),
        Box::new(LenovoRates),
        Box::new(ValidateBillable),
        Box::new(NewPiCredit),
        Box::new(Subsidy),
        Box::new(Prepayment),
    ]
}

/// Run stages in order, checking the row-count invariant after each
pub fn run_stages(
    stages: &[Box<dyn Stage + '_>],
    mut data: Dataset,
    ctx: &StageContext<'_>,
) -> Result<Dataset> {
    for stage in stages {
        let before = data.len();
        data = stage.process(data, ctx)?;
        let after = data.len();
        if before != after {
            return Err(InvoiceError::RowCountChanged {
                stage: stage.name(),
                before,
                after,
            });
        }
        tracing::info!(stage = stage.name(), rows = after, "stage complete");
    }
    Ok(data)
}

/// Run the whole preliminary pipeline
pub fn run_preliminary(
    data: Dataset,
    ctx: &StageContext<'_>,
    directory: &dyn AllocationDirectory,
) -> Result<Dataset> {
    run_stages(&preliminary_stages(directory), data, ctx)
}

#[cfg(test)]
pub(crate) mod test_support {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use crate::models::UsageRecord;
    use crate::month::InvoiceMonth;

    pub fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub fn month(s: &str) -> InvoiceMonth {
        InvoiceMonth::parse(s).unwrap()
    }

    pub fn row(project: &str, pi: Option<&str>, cluster: &str, cost: &str) -> UsageRecord {
        UsageRecord {
            project_name: project.to_string(),
            project_id: project.to_string(),
            pi_name: pi.map(str::to_string),
            cluster_name: cluster.to_string(),
            cost: dec(cost),
            ..Default::default()
        }
    }

    /// A row already through billability validation
    pub fn validated(mut r: UsageRecord, billable: bool) -> UsageRecord {
        r.missing_pi = Some(r.pi().is_none());
        r.is_billable = Some(billable);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageRecord;
    use test_support::row;

    struct DropFirst;

    impl Stage for DropFirst {
        fn name(&self) -> &'static str {
            "drop-first"
        }

        fn process(&self, data: Dataset, _ctx: &StageContext<'_>) -> Result<Dataset> {
            let rows: Vec<UsageRecord> = data.into_records().into_iter().skip(1).collect();
            Ok(Dataset::new(rows))
        }
    }

    #[test]
    fn test_row_count_guard() {
        let month = test_support::month("2024-01");
        let config = InvoiceConfig::default();
        let ctx = StageContext::new(&month, &config);
        let data = Dataset::new(vec![row("P1", None, "stack", "1"), row("P2", None, "stack", "2")]);
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(DropFirst)];
        let err = run_stages(&stages, data, &ctx).unwrap_err();
        assert!(matches!(
            err,
            InvoiceError::RowCountChanged {
                stage: "drop-first",
                before: 2,
                after: 1
            }
        ));
    }

    fn allocation(id: &str, pi: &str, resource: &str) -> serde_json::Value {
        serde_json::json!({
            "resource": {"name": resource},
            "project": {"pi": pi},
            "attributes": {"Allocated Project ID": id, "Allocated Project Name": id}
        })
    }

    #[test]
    fn test_real_stages_keep_every_row() {
        use crate::directory::StaticDirectory;
        use crate::models::{PrepayBook, PrepayContact, PrepayCredit, PrepayProject, ResolvedRule};
        use crate::rates::MonthlyRates;
        use test_support::{dec, month};

        let m = month("2024-01");
        let config = InvoiceConfig {
            pi_aliases: [(
                "bob@bu.edu".to_string(),
                vec!["bob-alias@bu.edu".to_string()],
            )]
            .into_iter()
            .collect(),
            nonbillable_rules: vec![ResolvedRule::new("Internal", None, false)],
            rates: MonthlyRates {
                new_pi_credit_amount: dec("5"),
                lenovo_charges: [("GPUH100".to_string(), dec("6.04"))].into_iter().collect(),
                ..Default::default()
            },
            prepay: PrepayBook {
                credits: vec![PrepayCredit {
                    month: m.clone(),
                    group: "G1".to_string(),
                    credit: dec("50"),
                }],
                projects: vec![PrepayProject {
                    group: "G1".to_string(),
                    project: "P6".to_string(),
                    start: None,
                    end: None,
                }],
                contacts: vec![PrepayContact {
                    group: "G1".to_string(),
                    email: "g1@bu.edu".to_string(),
                    managed: true,
                }],
                debits: Vec::new(),
            },
            ..Default::default()
        };
        let directory = StaticDirectory::new(vec![
            allocation("P1", "alice@bu.edu", "nerc-ocp-prod"),
            allocation("P2", "bob-alias@bu.edu", "stack"),
            allocation("P3", "", "stack"),
            allocation("P5", "alice@bu.edu", "ocp-prod"),
            allocation("P6", "carol@bu.edu", "stack"),
        ]);

        let mut gpu = row("P5", Some("alice@bu.edu"), "ocp-prod", "12.08");
        gpu.su_type = Some("OpenShift GPUH100".to_string());
        gpu.su_hours = Some(dec("2"));
        let mut data = Dataset::new(vec![
            row("P1", Some("alice@bu.edu"), "nerc-ocp-prod", "10"),
            row("P2", Some("bob@bu.edu"), "stack", "3"),
            row("P3", None, "stack", "4"),
            row("Internal", Some("ops@bu.edu"), "stack", "7"),
            gpu,
            row("P6", Some("carol@bu.edu"), "stack", "20"),
        ]);

        let ctx = StageContext::new(&m, &config);
        for stage in preliminary_stages(&directory) {
            data = run_stages(&[stage], data, &ctx).unwrap();
            assert_eq!(data.len(), 6);
        }
        let recs = data.records();

        assert_eq!(recs[0].cluster_name, "ocp-prod");
        assert_eq!(recs[1].pi_name.as_deref(), Some("bob@bu.edu"));
        assert_eq!(recs[2].missing_pi, Some(true));
        assert_eq!(recs[2].is_billable, Some(true));
        assert_eq!(recs[3].is_billable, Some(false));
        assert_eq!(recs[4].lenovo_charge, Some(dec("12.08")));
        assert_eq!(recs[5].prepay_group.as_deref(), Some("G1"));
        assert_eq!(recs[5].group_balance_used, Some(dec("15")));
        assert_eq!(recs[5].group_balance, Some(dec("35")));
    }
}
