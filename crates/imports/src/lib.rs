//! `refpay-imports` — invoice CSV ingestion.
//!
//! Parses the billing system's heterogeneous CSV exports (tab or comma
//! delimited, headers that drift release to release) into normalized rows,
//! and carries the `InvoiceUpload` / `InvoiceRecord` entities that audit
//! each import.

pub mod columns;
pub mod parser;
pub mod record;
pub mod upload;

pub use columns::ColumnLayout;
pub use parser::{
    DateMode, ParseOutcome, ParsedInvoiceRow, ParserOptions, classify_status, detect_delimiter,
    parse_amount_cents, parse_invoices,
};
pub use record::InvoiceRecord;
pub use upload::{InvoiceUpload, UploadOutcome, UploadStats};

