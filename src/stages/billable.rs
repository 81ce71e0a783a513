use crate::dataset::Dataset;
use crate::error::Result;
use crate::rules::{ProjectRuleMatcher, is_billable_project};
use crate::stages::{Stage, StageContext};

/// Sets `is_billable` and `missing_pi` on every row.
///
/// A row is nonbillable when its PI is on the nonbillable list, a project rule
/// matches it, or its cluster is never billed.
pub struct ValidateBillable;

impl Stage for ValidateBillable {
    fn name(&self) -> &'static str {
        "validate-billable"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let matcher = ProjectRuleMatcher::new(&ctx.config.nonbillable_rules);
        let mut billable_rows = 0usize;

        for record in data.iter_mut() {
            let pi_excluded = record
                .pi_name
                .as_ref()
                .is_some_and(|pi| ctx.config.nonbillable_pis.contains(pi));
            let billable = !pi_excluded && is_billable_project(&matcher, record);
            let missing_pi = record.pi().is_none();

            if billable && missing_pi {
                tracing::warn!(project = %record.project_name, "billable project has empty PI field");
            }
            billable_rows += usize::from(billable);
            record.is_billable = Some(billable);
            record.missing_pi = Some(missing_pi);
        }

        tracing::debug!(billable_rows, total = data.len(), "billability resolved");
        Ok(data)
    }
}
