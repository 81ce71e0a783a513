use crate::dataset::Dataset;
use crate::error::{InvoiceError, Result};
use crate::stages::{Stage, StageContext};

/// Maps cluster aliases to canonical names; unknown clusters are fatal
pub struct ValidateClusterName;

impl Stage for ValidateClusterName {
    fn name(&self) -> &'static str {
        "validate-cluster-name"
    }

    fn process(&self, mut data: Dataset, ctx: &StageContext<'_>) -> Result<Dataset> {
        for record in data.iter_mut() {
            let canonical = ctx
                .config
                .canonical_cluster(&record.cluster_name)
                .map(str::to_string)
                .ok_or_else(|| InvoiceError::UnknownCluster(record.cluster_name.clone()))?;
            record.cluster_name = canonical;
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvoiceConfig;
    use crate::stages::test_support::{month, row};

    #[test]
    fn test_aliases_are_normalized() {
        let config = InvoiceConfig::default();
        let m = month("2024-01");
        let ctx = StageContext::new(&m, &config);
        let data = Dataset::new(vec![
            row("P1", None, "nerc-ocp-prod", "1"),
            row("P2", None, "stack", "1"),
            row("P3", None, "nerc-ocp-test", "1"),
        ]);
        let out = ValidateClusterName.process(data, &ctx).unwrap();
        let clusters: Vec<_> = out.iter().map(|r| r.cluster_name.as_str()).collect();
        assert_eq!(clusters, ["ocp-prod", "stack", "ocp-test"]);
    }

    #[test]
    fn test_unknown_cluster_is_fatal() {
        let config = InvoiceConfig::default();
        let m = month("2024-01");
        let ctx = StageContext::new(&m, &config);
        let data = Dataset::new(vec![row("P1", None, "mystery", "1")]);
        let err = ValidateClusterName.process(data, &ctx).unwrap_err();
        assert!(matches!(err, InvoiceError::UnknownCluster(c) if c == "mystery"));
    }
}
