//! # NERC Invoicing
//!
//! Builds the monthly invoices for a research cloud from the month's usage
//! exports.
//!
//! ## Overview
//!
//! A run merges the usage exports into one dataset, passes it through a fixed
//! sequence of enrichment and billing stages, and then derives every invoice
//! from the finished dataset:
//! - Cluster and PI name normalization, allocation directory enrichment
//! - Billable/nonbillable classification from rule files
//! - New-PI credits, the institutional subsidy and prepaid group drawdown
//! - Per-audience invoice tables, per-PI documents and the updated ledgers
//!
//! Money is held as [`rust_decimal::Decimal`] throughout.

/// Command-line arguments and environment variables
pub mod cli;

/// Static run configuration shared by stages and views
pub mod config;

/// The merged usage dataset and export parsing
pub mod dataset;

/// Allocation directory clients (live API, saved file, in-memory)
pub mod directory;

/// Error taxonomy
pub mod error;

/// Invoice views derived from the processed dataset
pub mod invoices;

/// Loading rule, alias, institute, ledger and rate files
pub mod loader;

/// Data models for usage rows, rules, institutes and ledgers
pub mod models;

/// `YYYY-MM` invoice months and month ranges
pub mod month;

/// One full invoice run
pub mod orchestrator;

/// Rate table lookups and overrides
pub mod rates;

/// Nonbillable project rule normalization and matching
pub mod rules;

/// Run settings resolved from the command line
pub mod settings;

/// Output destinations
pub mod sink;

/// The preliminary processing stages
pub mod stages;
