//! # Settings Module
//!
//! Run settings resolved once from the command line and environment.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::cli::Args;
use crate::directory::{AllocationDirectory, FileDirectory, HttpDirectory};
use crate::error::{InvoiceError, Result};
use crate::month::InvoiceMonth;
use crate::rates::RateOverrides;

/// Where allocation data comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DirectorySource {
    File(PathBuf),
    Http {
        keycloak_url: String,
        directory_url: String,
        client_id: String,
        client_secret: String,
    },
}

impl DirectorySource {
    pub fn open(&self) -> Box<dyn AllocationDirectory> {
        match self {
            DirectorySource::File(path) => Box::new(FileDirectory::new(path)),
            DirectorySource::Http {
                keycloak_url,
                directory_url,
                client_id,
                client_secret,
            } => Box::new(HttpDirectory::new(
                keycloak_url.as_str(),
                directory_url.as_str(),
                client_id.as_str(),
                client_secret.as_str(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub invoice_month: InvoiceMonth,
    pub invoice_dir: PathBuf,
    pub output_dir: PathBuf,
    pub directory: DirectorySource,
    pub nonbillable_pis: PathBuf,
    pub nonbillable_projects: PathBuf,
    pub pi_history: PathBuf,
    pub alias: PathBuf,
    pub institutes: PathBuf,
    pub cluster_aliases: Option<PathBuf>,
    pub prepay_credits: PathBuf,
    pub prepay_projects: PathBuf,
    pub prepay_contacts: PathBuf,
    pub prepay_debits: PathBuf,
    pub rates: Option<PathBuf>,
    pub overrides: RateOverrides,
}

/// Parse `KIND=VALUE` pairs
pub fn parse_lenovo_charges(pairs: &[String]) -> Result<Option<BTreeMap<String, Decimal>>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut charges = BTreeMap::new();
    for pair in pairs {
        let (kind, value) = pair.split_once('=').ok_or_else(|| {
            InvoiceError::Configuration(format!("Lenovo charge {pair:?} is not KIND=VALUE"))
        })?;
        let value = Decimal::from_str(value.trim()).map_err(|e| {
            InvoiceError::Configuration(format!("Lenovo charge {pair:?}: {e}"))
        })?;
        charges.insert(kind.trim().to_string(), value);
    }
    Ok(Some(charges))
}

impl Settings {
    pub fn from_args(args: Args, today: NaiveDate) -> Result<Self> {
        let invoice_month = match args.invoice_month.as_deref() {
            Some(m) => InvoiceMonth::parse(m)?,
            None => InvoiceMonth::previous(today),
        };

        let directory = match args.coldfront_api_filepath {
            Some(path) => DirectorySource::File(path),
            None => match (args.keycloak_client_id, args.keycloak_client_secret) {
                (Some(client_id), Some(client_secret)) => DirectorySource::Http {
                    keycloak_url: args.keycloak_url,
                    directory_url: args.coldfront_url,
                    client_id,
                    client_secret,
                },
                _ => {
                    return Err(InvoiceError::Configuration(
                        "KEYCLOAK_CLIENT_ID and KEYCLOAK_CLIENT_SECRET are required \
                         when COLDFRONT_API_FILEPATH is not set"
                            .to_string(),
                    ));
                }
            },
        };

        let invoice_dir = args.invoice_dir.unwrap_or_else(|| {
            PathBuf::from(format!("Invoices/{invoice_month}/Service Invoices"))
        });

        Ok(Settings {
            overrides: RateOverrides {
                new_pi_credit_amount: args.new_pi_credit_amount,
                limit_new_pi_credit_to_partners: args.limit_new_pi_credit_to_partners,
                bu_subsidy_amount: args.bu_subsidy_amount,
                lenovo_charges: parse_lenovo_charges(&args.lenovo_charge)?,
            },
            invoice_month,
            invoice_dir,
            output_dir: args.output_dir,
            directory,
            nonbillable_pis: args.nonbillable_pis,
            nonbillable_projects: args.nonbillable_projects,
            pi_history: args.pi_history,
            alias: args.alias,
            institutes: args.institutes,
            cluster_aliases: args.cluster_aliases,
            prepay_credits: args.prepay_credits,
            prepay_projects: args.prepay_projects,
            prepay_contacts: args.prepay_contacts,
            prepay_debits: args.prepay_debits,
            rates: args.rates,
        })
    }

    /// Usage exports in the invoice directory, sorted by file name
    pub fn invoice_files(&self) -> Result<Vec<PathBuf>> {
        discover_csv_files(&self.invoice_dir)
    }
}

pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            InvoiceError::Configuration(format!("reading {}: {e}", dir.display()))
        })?;
        let is_csv = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if entry.file_type().is_file() && is_csv {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["nerc-invoicing"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_explicit_month_and_saved_directory() {
        let mut a = args(&["--invoice-month", "2024-02", "--coldfront-api-filepath", "cf.json"]);
        a.invoice_dir = None;
        let s = Settings::from_args(a, today()).unwrap();
        assert_eq!(s.invoice_month.as_str(), "2024-02");
        assert_eq!(s.directory, DirectorySource::File(PathBuf::from("cf.json")));
        assert_eq!(
            s.invoice_dir,
            PathBuf::from("Invoices/2024-02/Service Invoices")
        );
    }

    #[test]
    fn test_month_defaults_to_previous() {
        let mut a = args(&["--coldfront-api-filepath", "cf.json"]);
        a.invoice_month = None;
        let s = Settings::from_args(a, today()).unwrap();
        assert_eq!(s.invoice_month.as_str(), "2024-02");
    }

    #[test]
    fn test_invalid_month_rejected() {
        let err = Settings::from_args(
            args(&["--invoice-month", "2024-13", "--coldfront-api-filepath", "cf.json"]),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidMonth(_)));
    }

    #[test]
    fn test_keycloak_credentials_required_without_file() {
        let mut a = args(&["--invoice-month", "2024-02"]);
        a.coldfront_api_filepath = None;
        a.keycloak_client_id = Some("id".to_string());
        a.keycloak_client_secret = None;
        assert!(matches!(
            Settings::from_args(a.clone(), today()),
            Err(InvoiceError::Configuration(_))
        ));

        a.keycloak_client_secret = Some("secret".to_string());
        let s = Settings::from_args(a, today()).unwrap();
        match s.directory {
            DirectorySource::Http { client_id, .. } => assert_eq!(client_id, "id"),
            other => panic!("unexpected directory source: {other:?}"),
        }
    }

    #[test]
    fn test_overrides_parsed() {
        let s = Settings::from_args(
            args(&[
                "--coldfront-api-filepath",
                "cf.json",
                "--new-pi-credit-amount",
                "1000.50",
                "--limit-new-pi-credit-to-partners",
                "true",
                "--lenovo-charge",
                "GPUH100=6.04,GPUA100SXM4=1.803",
            ]),
            today(),
        )
        .unwrap();
        assert_eq!(s.overrides.new_pi_credit_amount, Some(Decimal::new(100050, 2)));
        assert_eq!(s.overrides.limit_new_pi_credit_to_partners, Some(true));
        let charges = s.overrides.lenovo_charges.unwrap();
        assert_eq!(charges["GPUH100"], Decimal::new(604, 2));
        assert_eq!(charges["GPUA100SXM4"], Decimal::new(1803, 3));
    }

    #[test]
    fn test_bad_lenovo_pair() {
        assert!(parse_lenovo_charges(&["GPUH100".to_string()]).is_err());
        assert_eq!(parse_lenovo_charges(&[]).unwrap(), None);
    }

    #[test]
    fn test_discovers_sorted_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();
        let files = discover_csv_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.CSV", "b.csv"]);
    }
}
