//! Column resolution for heterogeneous invoice CSV exports.
//!
//! The billing system renames headers release to release ("Estado",
//! "Status", "Estatus de pago", ...), so the importer does not pin a fixed
//! schema. Each logical field resolves through an ordered rule: exact header
//! candidates first, then a case-insensitive substring search with fallback
//! keywords. Resolution runs once per file and yields a fixed index map
//! reused for every row.

use csv::StringRecord;

struct ColumnRule {
    exact: &'static [&'static str],
    keywords: &'static [&'static str],
}

const INVOICE_NUMBER: ColumnRule = ColumnRule {
    exact: &["factura", "no. factura", "numero de factura", "invoice", "invoice number"],
    keywords: &["factura", "invoice", "folio"],
};

const CLIENT_NAME: ColumnRule = ColumnRule {
    exact: &["cliente", "nombre", "nombre del cliente", "client", "client name"],
    keywords: &["cliente", "nombre", "client", "name"],
};

const ISSUE_DATE: ColumnRule = ColumnRule {
    exact: &["fecha", "fecha de emision", "fecha emision", "issue date", "date"],
    keywords: &["emisi", "issue", "fecha"],
};

const DUE_DATE: ColumnRule = ColumnRule {
    exact: &["vencimiento", "fecha de vencimiento", "due date"],
    keywords: &["vencimiento", "vence", "due"],
};

const STATUS: ColumnRule = ColumnRule {
    exact: &["estado", "estatus", "status"],
    keywords: &["estado", "estatus", "status"],
};

const SERVICE_ID: ColumnRule = ColumnRule {
    exact: &["id servicio", "id de servicio", "servicio", "service id", "id cliente"],
    keywords: &["servicio", "service", "id cliente", "client id"],
};

const AMOUNT: ColumnRule = ColumnRule {
    exact: &["total", "monto", "importe", "amount", "total amount"],
    keywords: &["total", "monto", "importe", "amount"],
};

/// Fixed column-index map for one CSV file.
///
/// A `None` entry means the export carries no recognizable header for that
/// field; the corresponding row values parse as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub invoice_number: Option<usize>,
    pub client_name: Option<usize>,
    pub issue_date: Option<usize>,
    pub due_date: Option<usize>,
    pub status: Option<usize>,
    pub service_id: Option<usize>,
    pub amount: Option<usize>,
}

impl ColumnLayout {
    /// Resolve the layout against a header row.
    pub fn resolve(headers: &StringRecord) -> Self {
        Self {
            invoice_number: resolve_field(headers, &INVOICE_NUMBER),
            client_name: resolve_field(headers, &CLIENT_NAME),
            issue_date: resolve_field(headers, &ISSUE_DATE),
            due_date: resolve_field(headers, &DUE_DATE),
            status: resolve_field(headers, &STATUS),
            service_id: resolve_field(headers, &SERVICE_ID),
            amount: resolve_field(headers, &AMOUNT),
        }
    }
}

fn resolve_field(headers: &StringRecord, rule: &ColumnRule) -> Option<usize> {
    for candidate in rule.exact {
        if let Some(idx) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(candidate))
        {
            return Some(idx);
        }
    }

    for keyword in rule.keywords {
        if let Some(idx) = headers
            .iter()
            .position(|h| h.trim().to_lowercase().contains(keyword))
        {
            return Some(idx);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn exact_headers_resolve_case_insensitively() {
        let layout = ColumnLayout::resolve(&headers(&[
            "Factura", "Cliente", "Fecha", "Vencimiento", "Estado", "ID Servicio", "Total",
        ]));
        assert_eq!(layout.invoice_number, Some(0));
        assert_eq!(layout.client_name, Some(1));
        assert_eq!(layout.issue_date, Some(2));
        assert_eq!(layout.due_date, Some(3));
        assert_eq!(layout.status, Some(4));
        assert_eq!(layout.service_id, Some(5));
        assert_eq!(layout.amount, Some(6));
    }

    #[test]
    fn renamed_headers_resolve_through_keywords() {
        let layout = ColumnLayout::resolve(&headers(&[
            "No. de Factura",
            "Nombre del Suscriptor",
            "Fecha de Emisión",
            "Fecha de Vencimiento",
            "Estatus de Pago",
            "ID del Servicio Contratado",
            "Importe Total",
        ]));
        assert_eq!(layout.invoice_number, Some(0));
        assert_eq!(layout.client_name, Some(1));
        assert_eq!(layout.issue_date, Some(2));
        assert_eq!(layout.due_date, Some(3));
        assert_eq!(layout.status, Some(4));
        assert_eq!(layout.service_id, Some(5));
        assert_eq!(layout.amount, Some(6));
    }

    #[test]
    fn english_export_headers_resolve() {
        let layout = ColumnLayout::resolve(&headers(&[
            "Invoice Number",
            "Client Name",
            "Issue Date",
            "Due Date",
            "Status",
            "Service ID",
            "Total Amount",
        ]));
        assert_eq!(layout.invoice_number, Some(0));
        assert_eq!(layout.service_id, Some(5));
        assert_eq!(layout.amount, Some(6));
    }

    #[test]
    fn issue_date_prefers_emission_over_generic_fecha() {
        // Due date listed first: the generic "fecha" keyword must not
        // swallow it because "emisi" is tried before "fecha".
        let layout = ColumnLayout::resolve(&headers(&[
            "Fecha de Vencimiento",
            "Fecha de Emisión",
        ]));
        assert_eq!(layout.due_date, Some(0));
        assert_eq!(layout.issue_date, Some(1));
    }

    #[test]
    fn unknown_headers_leave_fields_unresolved() {
        let layout = ColumnLayout::resolve(&headers(&["foo", "bar"]));
        assert_eq!(layout, ColumnLayout::default());
    }
}

