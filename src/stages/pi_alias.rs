use std::collections::HashMap;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::stages::{Stage, StageContext};

/// Replaces PI aliases with the canonical PI name
pub struct ValidatePiAlias;

impl Stage for ValidatePiAlias {
    fn name(&self) -> &'static str {
        "validate-pi-alias"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let reverse: HashMap<&str, &str> = ctx
            .config
            .pi_aliases
            .iter()
            .flat_map(|(pi, aliases)| aliases.iter().map(move |a| (a.as_str(), pi.as_str())))
            .collect();

        let mut replaced = 0usize;
        for record in data.iter_mut() {
            if let Some(canonical) = record.pi_name.as_deref().and_then(|p| reverse.get(p)) {
                record.pi_name = Some(canonical.to_string());
                replaced += 1;
            }
        }
        if replaced > 0 {
            tracing::debug!(replaced, "PI aliases resolved");
        }
        Ok(data)
    }
}
