use serde::Deserialize;

use crate::month::InvoiceMonth;

/// One institution of the static institute list
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Institute {
    pub display_name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    /// Billing code used when the allocation directory does not provide one
    #[serde(default)]
    pub institution_code: Option<String>,
    /// Month the institution joined the MGHPCC partnership
    #[serde(default)]
    pub mghpcc_partnership_start_date: Option<String>,
}

impl Institute {
    /// Partnership dates may be full dates; only the `YYYY-MM` prefix counts
    pub fn is_partner_in(&self, month: &InvoiceMonth) -> bool {
        match self.mghpcc_partnership_start_date.as_deref() {
            Some(start) => start.get(..7).is_some_and(|m| m <= month.as_str()),
            None => false,
        }
    }
}

/// Lookup over the institute list
#[derive(Debug, Clone, Default)]
pub struct InstituteList {
    pub institutes: Vec<Institute>,
}

impl InstituteList {
    pub fn new(institutes: Vec<Institute>) -> Self {
        InstituteList { institutes }
    }

    /// Institution for a PI identifier of the form `user@domain`.
    ///
    /// Subdomains fall back to their parents (`cs.bu.edu` → `bu.edu`).
    pub fn for_pi(&self, pi: &str) -> Option<&Institute> {
        let (_, domain) = pi.rsplit_once('@')?;
        let mut domain = domain.trim().to_lowercase();
        loop {
            if let Some(inst) = self
                .institutes
                .iter()
                .find(|i| i.domains.iter().any(|d| d.eq_ignore_ascii_case(&domain)))
            {
                return Some(inst);
            }
            match domain.split_once('.') {
                Some((_, parent)) if parent.contains('.') => domain = parent.to_string(),
                _ => return None,
            }
        }
    }

    pub fn by_name(&self, display_name: &str) -> Option<&Institute> {
        self.institutes
            .iter()
            .find(|i| i.display_name == display_name)
    }

    pub fn is_partner(&self, display_name: &str, month: &InvoiceMonth) -> bool {
        self.by_name(display_name)
            .is_some_and(|i| i.is_partner_in(month))
    }
}
