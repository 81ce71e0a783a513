use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use nerc_invoicing::config::InvoiceConfig;
use nerc_invoicing::dataset::Dataset;
use nerc_invoicing::invoices::{self, OutputKind};
use nerc_invoicing::models::{Institute, InstituteList, UsageRecord};
use nerc_invoicing::month::InvoiceMonth;
use nerc_invoicing::stages::StageContext;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn processed(project: &str, pi: &str, institution: &str, cost: &str, credit: &str) -> UsageRecord {
    let cost = dec(cost);
    let credit = dec(credit);
    UsageRecord {
        invoice_month: "2024-03".to_string(),
        project_name: project.to_string(),
        project_id: project.to_lowercase(),
        pi_name: Some(pi.to_string()),
        institution: Some(institution.to_string()),
        cost,
        cluster_name: "stack".to_string(),
        is_billable: Some(true),
        missing_pi: Some(false),
        credit: (credit > Decimal::ZERO).then_some(credit),
        credit_code: (credit > Decimal::ZERO).then(|| "0002".to_string()),
        pi_balance: Some(cost - credit),
        balance: Some(cost - credit),
        ..Default::default()
    }
}

fn config() -> InvoiceConfig {
    InvoiceConfig {
        institutes: InstituteList::new(vec![
            Institute {
                display_name: "Boston University".to_string(),
                domains: vec!["bu.edu".to_string()],
                institution_code: None,
                mghpcc_partnership_start_date: Some("2019-01-01".to_string()),
            },
            Institute {
                display_name: "Acme College".to_string(),
                domains: vec!["acme.edu".to_string()],
                institution_code: None,
                mghpcc_partnership_start_date: None,
            },
        ]),
        ..Default::default()
    }
}

#[test]
fn test_empty_dataset_yields_headed_tables_only() {
    let month = InvoiceMonth::parse("2024-03").unwrap();
    let config = config();
    let ctx = StageContext::new(&month, &config);

    let outputs = invoices::build_all(&Dataset::default(), &ctx).unwrap();
    assert!(outputs.iter().all(|o| o.kind == OutputKind::Table));
    assert!(outputs.iter().all(|o| o.table.is_empty()));
    assert!(outputs.iter().all(|o| !o.table.headers.is_empty()));
    assert!(
        outputs
            .iter()
            .any(|o| o.path == Path::new("billable 2024-03.csv"))
    );
}

#[test]
fn test_partner_total_and_pi_documents() {
    let month = InvoiceMonth::parse("2024-03").unwrap();
    let config = config();
    let ctx = StageContext::new(&month, &config);
    let data = Dataset::new(vec![
        processed("P1", "alice@bu.edu", "Boston University", "100.00", "40.00"),
        processed("P2", "alice@bu.edu", "Boston University", "10.00", "0"),
        processed("P3", "wile@acme.edu", "Acme College", "25.50", "0"),
    ]);

    let outputs = invoices::build_all(&data, &ctx).unwrap();

    let total = outputs
        .iter()
        .find(|o| o.path == Path::new("NERC-2024-03-Total-Invoice.csv"))
        .unwrap();
    assert_eq!(total.table.column("Project - Allocation").unwrap(), ["P1", "P2"]);

    let docs: Vec<_> = outputs
        .iter()
        .filter(|o| o.kind == OutputKind::Document)
        .collect();
    assert_eq!(docs.len(), 2);
    let alice = docs
        .iter()
        .find(|o| o.path.ends_with("Boston_University_alice@bu.edu 2024-03.csv"))
        .unwrap();
    // two project rows plus the total row
    assert_eq!(alice.table.len(), 3);
    let balances = alice.table.column("PI Balance").unwrap();
    assert_eq!(balances.last().copied(), Some("70.00"));
}
