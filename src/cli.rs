use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::directory::{DEFAULT_COLDFRONT_URL, DEFAULT_KEYCLOAK_URL};

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "nerc-invoicing", about = "Build the monthly NERC invoices")]
pub struct Args {
    /// Invoice month as YYYY-MM. Defaults to the previous calendar month
    #[arg(long, env = "INVOICE_MONTH")]
    pub invoice_month: Option<String>,

    /// Directory holding the month's usage exports (*.csv).
    /// Defaults to `Invoices/{month}/Service Invoices`
    #[arg(long, env = "INVOICE_DIR")]
    pub invoice_dir: Option<PathBuf>,

    /// Directory the invoices and updated ledgers are written to
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Saved allocation directory response; skips the live API when set
    #[arg(long, env = "COLDFRONT_API_FILEPATH")]
    pub coldfront_api_filepath: Option<PathBuf>,

    #[arg(long, env = "KEYCLOAK_CLIENT_ID", hide_env_values = true)]
    pub keycloak_client_id: Option<String>,

    #[arg(long, env = "KEYCLOAK_CLIENT_SECRET", hide_env_values = true)]
    pub keycloak_client_secret: Option<String>,

    #[arg(long, env = "KEYCLOAK_URL", default_value = DEFAULT_KEYCLOAK_URL)]
    pub keycloak_url: String,

    #[arg(long, env = "COLDFRONT_URL", default_value = DEFAULT_COLDFRONT_URL)]
    pub coldfront_url: String,

    /// Nonbillable PIs, one per line
    #[arg(long, env = "NONBILLABLE_PIS_FILEPATH", default_value = "pi.txt")]
    pub nonbillable_pis: PathBuf,

    /// Nonbillable project rules (YAML)
    #[arg(long, env = "NONBILLABLE_PROJECTS_FILEPATH", default_value = "projects.yaml")]
    pub nonbillable_projects: PathBuf,

    /// PI credit history ledger
    #[arg(long, env = "PI_FILEPATH", default_value = "PI.csv")]
    pub pi_history: PathBuf,

    /// PI aliases: canonical name followed by its aliases on each line
    #[arg(long, env = "ALIAS_FILEPATH", default_value = "alias.csv")]
    pub alias: PathBuf,

    #[arg(long, env = "INSTITUTE_LIST_FILEPATH", default_value = "institute_list.yaml")]
    pub institutes: PathBuf,

    /// Extra cluster aliases (YAML map), merged over the built-in table
    #[arg(long, env = "CLUSTER_ALIASES_FILEPATH")]
    pub cluster_aliases: Option<PathBuf>,

    #[arg(long, env = "PREPAY_CREDITS_FILEPATH", default_value = "prepaid_credits.csv")]
    pub prepay_credits: PathBuf,

    #[arg(long, env = "PREPAY_PROJECTS_FILEPATH", default_value = "prepaid_projects.csv")]
    pub prepay_projects: PathBuf,

    #[arg(long, env = "PREPAY_CONTACTS_FILEPATH", default_value = "prepaid_contacts.csv")]
    pub prepay_contacts: PathBuf,

    #[arg(long, env = "PREPAY_DEBITS_FILEPATH", default_value = "prepay_debits.csv")]
    pub prepay_debits: PathBuf,

    /// Rate history (YAML). Without it every rate must be given explicitly
    #[arg(long, env = "RATES_FILEPATH")]
    pub rates: Option<PathBuf>,

    #[arg(long, env = "NEW_PI_CREDIT_AMOUNT")]
    pub new_pi_credit_amount: Option<Decimal>,

    #[arg(long, env = "LIMIT_NEW_PI_CREDIT_TO_PARTNERS")]
    pub limit_new_pi_credit_to_partners: Option<bool>,

    #[arg(long, env = "BU_SUBSIDY_AMOUNT")]
    pub bu_subsidy_amount: Option<Decimal>,

    /// Lenovo per-SU charges as KIND=VALUE, comma-separated (GPUH100=6.04)
    #[arg(long, env = "LENOVO_CHARGE_INFO", value_delimiter = ',')]
    pub lenovo_charge: Vec<String>,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }
}
