use serde_json::Value;

pub const ATTR_ALLOCATED_PROJECT_NAME: &str = "Allocated Project Name";
pub const ATTR_ALLOCATED_PROJECT_ID: &str = "Allocated Project ID";
pub const ATTR_INSTITUTION_SPECIFIC_CODE: &str = "Institution-Specific Code";

/// Placeholder institution code for allocations that do not carry one
pub const MISSING_INSTITUTION_CODE: &str = "N/A";

/// Directory data for one (project id, cluster) allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub project_id: String,
    /// Cluster name exactly as the directory reports it
    pub resource_name: String,
    pub project_name: String,
    pub pi_name: String,
    pub institution_code: String,
}

impl AllocationRecord {
    /// Read an allocation from a raw directory entry.
    ///
    /// Returns `None` when any required field is absent; the institution code
    /// is optional.
    pub fn from_directory_entry(entry: &Value) -> Option<Self> {
        let attributes = entry.get("attributes")?;
        let attr = |key: &str| attributes.get(key).and_then(Value::as_str);

        Some(AllocationRecord {
            project_id: attr(ATTR_ALLOCATED_PROJECT_ID)?.to_string(),
            project_name: attr(ATTR_ALLOCATED_PROJECT_NAME)?.to_string(),
            pi_name: entry.get("project")?.get("pi")?.as_str()?.to_string(),
            resource_name: entry.get("resource")?.get("name")?.as_str()?.to_string(),
            institution_code: attr(ATTR_INSTITUTION_SPECIFIC_CODE)
                .unwrap_or(MISSING_INSTITUTION_CODE)
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_complete_entry() {
        let entry = json!({
            "resource": {"name": "stack"},
            "project": {"pi": "pi@bu.edu"},
            "attributes": {
                "Allocated Project ID": "P1",
                "Allocated Project Name": "P1-name",
                "Institution-Specific Code": "IC1"
            }
        });
        let rec = AllocationRecord::from_directory_entry(&entry).unwrap();
        assert_eq!(rec.project_id, "P1");
        assert_eq!(rec.project_name, "P1-name");
        assert_eq!(rec.pi_name, "pi@bu.edu");
        assert_eq!(rec.resource_name, "stack");
        assert_eq!(rec.institution_code, "IC1");
    }

    #[test]
    fn test_institution_code_optional() {
        let entry = json!({
            "resource": {"name": "stack"},
            "project": {"pi": "pi@bu.edu"},
            "attributes": {"Allocated Project ID": "P1", "Allocated Project Name": "P1-name"}
        });
        let rec = AllocationRecord::from_directory_entry(&entry).unwrap();
        assert_eq!(rec.institution_code, MISSING_INSTITUTION_CODE);
    }

    #[test]
    fn test_skips_entry_without_project_id() {
        let entry = json!({
            "resource": {"name": "stack"},
            "project": {"pi": "pi@bu.edu"},
            "attributes": {"Allocated Project Name": "P1-name"}
        });
        assert!(AllocationRecord::from_directory_entry(&entry).is_none());
        assert!(AllocationRecord::from_directory_entry(&json!({})).is_none());
    }
}
