//! CSV parsing and field normalization for invoice exports.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use refpay_core::{DomainError, DomainResult};
use refpay_parties::PaymentStatus;

use crate::columns::ColumnLayout;

/// Paid-status synonyms accepted from the billing system's free-text state.
/// Matched by equality or substring after trimming and case-folding.
const PAID_SYNONYMS: &[&str] = &["pagada", "pagado", "paid", "pago", "completado", "completed"];

/// Marker for invoices under review. Informational only; the normalized
/// status stays `Pending`.
const IN_REVIEW_MARKER: &str = "en revis";

/// How malformed or missing invoice dates are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateMode {
    /// Substitute the import timestamp. This mirrors the billing exports'
    /// long-standing behavior: a bad date must not drop an otherwise valid
    /// invoice row.
    #[default]
    Lenient,
    /// Reject the row with a per-row error.
    Strict,
}

/// Parser configuration.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub date_mode: DateMode,
}

/// One invoice row surviving validation, with all fields normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInvoiceRow {
    /// 1-based data-row ordinal within the file.
    pub row: usize,
    pub invoice_number: String,
    pub client_name: String,
    pub service_id: String,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub status: PaymentStatus,
    pub in_review: bool,
    /// Amount in smallest currency unit (e.g., cents).
    pub amount: i64,
}

/// Parse result: valid rows plus per-row errors (a bad row never aborts the
/// batch).
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub rows: Vec<ParsedInvoiceRow>,
    pub errors: Vec<String>,
}

/// Detect the file delimiter: tab when the first line carries one, comma
/// otherwise.
pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.contains('\t') { b'\t' } else { b',' }
}

/// Parse an invoice CSV export into normalized rows.
///
/// `now` is the import timestamp, used as the fallback date in
/// [`DateMode::Lenient`].
pub fn parse_invoices(
    text: &str,
    options: &ParserOptions,
    now: DateTime<Utc>,
) -> DomainResult<ParseOutcome> {
    let delimiter = detect_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DomainError::validation(format!("invalid CSV header: {e}")))?
        .clone();
    let layout = ColumnLayout::resolve(&headers);
    tracing::debug!(?layout, "resolved invoice CSV layout");

    let mut outcome = ParseOutcome::default();
    for (idx, result) in reader.records().enumerate() {
        let row_no = idx + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                outcome.errors.push(format!("Row {row_no} could not be read: {e}"));
                continue;
            }
        };

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        match parse_row(&record, &layout, row_no, options, now) {
            Ok(row) => outcome.rows.push(row),
            Err(msg) => outcome.errors.push(msg),
        }
    }

    Ok(outcome)
}

fn parse_row(
    record: &StringRecord,
    layout: &ColumnLayout,
    row_no: usize,
    options: &ParserOptions,
    now: DateTime<Utc>,
) -> Result<ParsedInvoiceRow, String> {
    let invoice_number = field(record, layout.invoice_number).to_string();
    let service_id = field(record, layout.service_id).to_string();

    if service_id.is_empty() {
        let label = if invoice_number.is_empty() {
            row_no.to_string()
        } else {
            invoice_number.clone()
        };
        return Err(format!("Invoice {label} missing service ID"));
    }

    let row_label = if invoice_number.is_empty() {
        row_no.to_string()
    } else {
        invoice_number.clone()
    };

    let issued_at = parse_date(field(record, layout.issue_date), options.date_mode, now)
        .map_err(|e| format!("Invoice {row_label}: {e}"))?;
    let due_at = parse_date(field(record, layout.due_date), options.date_mode, now)
        .map_err(|e| format!("Invoice {row_label}: {e}"))?;

    let (status, in_review) = classify_status(field(record, layout.status));
    let amount = parse_amount_cents(field(record, layout.amount));

    Ok(ParsedInvoiceRow {
        row: row_no,
        invoice_number,
        client_name: field(record, layout.client_name).to_string(),
        service_id,
        issued_at,
        due_at,
        status,
        in_review,
        amount,
    })
}

fn field(record: &StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

/// Classify a free-text invoice state into the normalized payment status,
/// plus the informational in-review flag.
pub fn classify_status(raw: &str) -> (PaymentStatus, bool) {
    let folded = raw.trim().to_lowercase();
    let in_review = folded.contains(IN_REVIEW_MARKER);

    let paid = PAID_SYNONYMS
        .iter()
        .any(|synonym| folded == *synonym || folded.contains(synonym));

    let status = if paid {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    };
    (status, in_review)
}

/// Parse a formatted amount (`"$1,234.56"`, `"1.234,56"`, `"2500"`) into
/// smallest currency units.
///
/// A blank or unparseable amount yields zero — the importer never drops a
/// row over its amount field.
pub fn parse_amount_cents(raw: &str) -> i64 {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() {
        return 0;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if comma > dot {
                // European format: '.' groups thousands, ',' is decimal.
                cleaned = cleaned.replace('.', "").replace(',', ".");
            } else {
                cleaned = cleaned.replace(',', "");
            }
        }
        (None, Some(_)) => {
            // Commas alone are thousands separators.
            cleaned = cleaned.replace(',', "");
        }
        _ => {}
    }

    match cleaned.parse::<f64>() {
        Ok(value) => (value * 100.0).round() as i64,
        Err(_) => 0,
    }
}

/// Parse a `DD/MM/YYYY` date, discarding any trailing time component.
fn parse_date(raw: &str, mode: DateMode, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    let token = raw.split_whitespace().next().unwrap_or("");

    match NaiveDate::parse_from_str(token, "%d/%m/%Y") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN).and_utc()),
        Err(_) => match mode {
            DateMode::Lenient => Ok(now),
            DateMode::Strict => Err(format!("invalid date \"{raw}\"")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    const TAB_CSV: &str = "Factura\tCliente\tFecha\tVencimiento\tEstado\tID Servicio\tTotal\n\
FAC-001\tMaria Lopez\t05/03/2025\t20/03/2025\tPagada\tSVC-1001\t$1,250.00\n\
FAC-002\tJuan Perez\t05/03/2025\t20/03/2025\tPendiente\tSVC-1002\t830.50\n";

    #[test]
    fn detects_tab_and_comma_delimiters() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
    }

    #[test]
    fn parses_tab_delimited_export() {
        let outcome = parse_invoices(TAB_CSV, &ParserOptions::default(), now()).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows.len(), 2);

        let first = &outcome.rows[0];
        assert_eq!(first.invoice_number, "FAC-001");
        assert_eq!(first.client_name, "Maria Lopez");
        assert_eq!(first.service_id, "SVC-1001");
        assert_eq!(first.status, PaymentStatus::Paid);
        assert_eq!(first.amount, 125_000);
        assert_eq!(
            first.issued_at,
            Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap()
        );

        let second = &outcome.rows[1];
        assert_eq!(second.status, PaymentStatus::Pending);
        assert_eq!(second.amount, 83_050);
    }

    #[test]
    fn parses_comma_delimited_export_with_quotes() {
        let csv = "Factura,Cliente,Fecha,Vencimiento,Estado,ID Servicio,Total\n\
FAC-003,\"Gomez, Ana\",10/04/2025,25/04/2025,PAGADO,1003,\"2,500\"\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert!(outcome.errors.is_empty());
        let row = &outcome.rows[0];
        assert_eq!(row.client_name, "Gomez, Ana");
        assert_eq!(row.status, PaymentStatus::Paid);
        assert_eq!(row.amount, 250_000);
    }

    #[test]
    fn missing_service_id_rejects_row_but_not_batch() {
        let csv = "Factura,Cliente,Fecha,Vencimiento,Estado,ID Servicio,Total\n\
FAC-010,Cliente Uno,01/05/2025,15/05/2025,Pagada,,100\n\
FAC-011,Cliente Dos,01/05/2025,15/05/2025,Pagada,SVC-2,100\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert_eq!(outcome.errors, vec!["Invoice FAC-010 missing service ID"]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].invoice_number, "FAC-011");
    }

    #[test]
    fn missing_service_id_error_falls_back_to_row_ordinal() {
        let csv = "Cliente,Fecha,Estado,ID Servicio,Total\n\
Cliente Uno,01/05/2025,Pagada,,100\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert_eq!(outcome.errors, vec!["Invoice 1 missing service ID"]);
    }

    #[test]
    fn date_time_component_is_discarded() {
        let csv = "Factura,Fecha,Estado,ID Servicio,Total\n\
FAC-020,12/02/2025 14:33:00,Pagada,SVC-3,100\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert_eq!(
            outcome.rows[0].issued_at,
            Utc.with_ymd_and_hms(2025, 2, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn lenient_mode_substitutes_now_for_bad_dates() {
        let csv = "Factura,Fecha,Estado,ID Servicio,Total\n\
FAC-021,31/31/2025,Pagada,SVC-4,100\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows[0].issued_at, now());
    }

    #[test]
    fn strict_mode_rejects_bad_dates() {
        let csv = "Factura,Fecha,Estado,ID Servicio,Total\n\
FAC-022,31/31/2025,Pagada,SVC-5,100\n";
        let options = ParserOptions {
            date_mode: DateMode::Strict,
        };
        let outcome = parse_invoices(csv, &options, now()).unwrap();
        assert_eq!(outcome.rows.len(), 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("FAC-022"));
        assert!(outcome.errors[0].contains("invalid date"));
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let csv = "Factura,Cliente,Fecha,Vencimiento,Estado,ID Servicio,Total\n\
FAC-030,Cliente,01/05/2025,15/05/2025,Pagada,SVC-6\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows[0].amount, 0);
    }

    #[test]
    fn status_synonyms_classify_as_paid() {
        for raw in ["Pagada", "PAGADO", "paid", "Pago parcial", "Completado", "completed"] {
            let (status, _) = classify_status(raw);
            assert_eq!(status, PaymentStatus::Paid, "{raw}");
        }
    }

    #[test]
    fn unknown_status_classifies_as_pending() {
        for raw in ["Pendiente", "Vencida", "", "Cancelada"] {
            let (status, _) = classify_status(raw);
            assert_eq!(status, PaymentStatus::Pending, "{raw}");
        }
    }

    #[test]
    fn en_revision_is_pending_with_review_flag() {
        let (status, in_review) = classify_status("En Revisión");
        assert_eq!(status, PaymentStatus::Pending);
        assert!(in_review);
    }

    #[test]
    fn amounts_accept_common_formats() {
        assert_eq!(parse_amount_cents("$1,234.56"), 123_456);
        assert_eq!(parse_amount_cents("1.234,56"), 123_456);
        assert_eq!(parse_amount_cents("2,500"), 250_000);
        assert_eq!(parse_amount_cents("830.50"), 83_050);
        assert_eq!(parse_amount_cents("$ 99"), 9_900);
        assert_eq!(parse_amount_cents(""), 0);
        assert_eq!(parse_amount_cents("n/a"), 0);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let csv = "Factura,Fecha,Estado,ID Servicio,Total\n\
,,,,\n\
FAC-040,01/05/2025,Pagada,SVC-7,100\n";
        let outcome = parse_invoices(csv, &ParserOptions::default(), now()).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows.len(), 1);
    }
}

