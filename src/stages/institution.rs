use crate::dataset::Dataset;
use crate::error::Result;
use crate::stages::{Stage, StageContext};

/// Derives the institution from the PI's email domain when the export lacks one,
/// and fills a missing institution code from the institute list
pub struct AddInstitution;

impl Stage for AddInstitution {
    fn name(&self) -> &'static str {
        "add-institution"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        let institutes = &ctx.config.institutes;
        for record in data.iter_mut() {
            let preset = record
                .institution
                .as_deref()
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(str::to_string);
            if preset.is_some() && record.institution_code.is_some() {
                continue;
            }

            let by_domain = record.pi().and_then(|pi| institutes.for_pi(pi));
            let inst = match &preset {
                // an explicit name wins; the PI domain is the fallback for its code
                Some(name) => institutes.by_name(name).or(by_domain),
                None => by_domain,
            };
            let Some(inst) = inst else {
                if preset.is_none()
                    && let Some(pi) = record.pi()
                {
                    tracing::warn!(pi, "PI name does not match any institution domain");
                }
                continue;
            };

            if preset.is_none() {
                record.institution = Some(inst.display_name.clone());
            }
            if record.institution_code.is_none() {
                record.institution_code = inst.institution_code.clone();
            }
        }
        Ok(data)
    }
}
