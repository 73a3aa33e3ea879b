//! Per-layout configuration table: header labels, the footer marker, noise markers
//! and the column positions of transaction lines.
//!
//! Only the Komerční banka account statement layout is built in. Other issuers
//! need their own table; nothing here is meant to be universal.

use vypis_core::FieldKey;
use vypis_core::locale::{amount_sign, is_amount_shaped, Sign};
use vypis_core::TransactionType;

/// Column positions of a transaction line after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Accounting date followed by the description text.
    pub date_description: usize,
    /// Counterparty name / card type on the first line, account / merchant below.
    pub counterparty: usize,
    /// VS on the first line, KS and SS on the following lines.
    pub symbol: usize,
    pub credit: usize,
    /// `None` for dumps with a single signed amount column.
    pub debit: Option<usize>,
}

impl ColumnLayout {
    /// Number of cells in a normalized transaction line.
    pub fn width(&self) -> usize {
        let last = self.debit.unwrap_or(self.credit).max(self.credit);
        last + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    labels: Vec<(String, FieldKey)>,
    pub opening_balance_label: String,
    pub closing_balance_label: String,
    /// Case-sensitive text that opens the terminal balance block.
    footer_marker: String,
    page_markers: Vec<String>,
    column_titles: Vec<String>,
    pub columns: ColumnLayout,
}

/// Which cell carried a transaction amount and the direction it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountCell {
    pub index: usize,
    pub transaction_type: TransactionType,
}

/// Lowercased label text without the trailing colon.
pub fn normalize_label(text: &str) -> String {
    text.trim().trim_end_matches(':').trim().to_lowercase()
}

impl Layout {
    /// Komerční banka "Výpis z účtu" layout.
    pub fn komercni_banka() -> Self {
        let labels = [
            ("k účtu", FieldKey::AccountNumber),
            ("číslo účtu", FieldKey::AccountNumber),
            ("výpis", FieldKey::StatementType),
            ("typ výpisu", FieldKey::StatementType),
            ("iban", FieldKey::Iban),
            ("typ", FieldKey::AccountType),
            ("typ účtu", FieldKey::AccountType),
            ("měna", FieldKey::Currency),
            ("datum výpisu", FieldKey::StatementDate),
            ("číslo výpisu", FieldKey::StatementNumber),
            ("majitel účtu", FieldKey::AccountEntity),
            ("klient", FieldKey::AccountEntity),
            ("počáteční zůstatek", FieldKey::StartBalance),
            ("konečný zůstatek", FieldKey::EndBalance),
        ]
        .into_iter()
        .map(|(label, key)| (label.to_string(), key))
        .collect();

        let page_markers = ["pokračování na další straně", "rekapitulace transakcí na účtu"]
            .into_iter()
            .map(str::to_string)
            .collect();

        let column_titles = [
            "datum",
            "datum popis transakce",
            "popis transakce",
            "transakce",
            "název protiúčtu / číslo a typ karty",
            "vs",
            "ks",
            "ss",
            "připsáno",
            "odepsáno",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            name: "kb".to_string(),
            labels,
            opening_balance_label: "počáteční zůstatek".to_string(),
            closing_balance_label: "konečný zůstatek".to_string(),
            footer_marker: "KONEČNÝ ZŮSTATEK".to_string(),
            page_markers,
            column_titles,
            columns: ColumnLayout {
                date_description: 0,
                counterparty: 1,
                symbol: 2,
                credit: 3,
                debit: Some(4),
            },
        }
    }

    /// Look up a built-in layout by its config name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "kb" | "komercni_banka" => Some(Self::komercni_banka()),
            _ => None,
        }
    }

    /// Map a label cell to its header field.
    pub fn lookup_label(&self, cell: &str) -> Option<FieldKey> {
        let label = normalize_label(cell);
        self.labels
            .iter()
            .find(|(known, _)| *known == label)
            .map(|(_, key)| key.clone())
    }

    /// True for the terminal balance row. KB prints it in capitals; the
    /// mixed-case balance lines of the header block are header fields.
    pub fn is_footer(&self, cells: &[String]) -> bool {
        cells
            .iter()
            .any(|cell| cell.trim().starts_with(self.footer_marker.as_str()))
    }

    /// True for page furniture: continuation/recap markers anywhere in the
    /// row, or a row made only of transaction table column titles.
    pub fn has_noise_marker(&self, cells: &[String]) -> bool {
        let filled: Vec<String> = cells
            .iter()
            .map(|c| normalize_label(c))
            .filter(|c| !c.is_empty())
            .collect();
        if filled.is_empty() {
            return false;
        }

        let page_marker = filled
            .iter()
            .any(|cell| self.page_markers.iter().any(|m| cell.contains(m.as_str())));
        let column_titles = filled
            .iter()
            .all(|cell| self.column_titles.iter().any(|t| t == cell));

        page_marker || column_titles
    }

    /// Find the amount cell of a transaction line.
    ///
    /// A filled debit column wins; otherwise the credit column; otherwise the
    /// trailing non-empty cell right of the symbol column. Outside the debit
    /// column an explicit `-` marks a debit.
    pub fn locate_amount(&self, cells: &[String]) -> Option<AmountCell> {
        let filled = |idx: usize| cells.get(idx).map(|c| !c.trim().is_empty()).unwrap_or(false);

        if let Some(debit) = self.columns.debit {
            if filled(debit) && is_amount_shaped(&cells[debit]) {
                return Some(AmountCell {
                    index: debit,
                    transaction_type: TransactionType::Debit,
                });
            }
        }

        let signed = |idx: usize| AmountCell {
            index: idx,
            transaction_type: match amount_sign(&cells[idx]) {
                Sign::Negative => TransactionType::Debit,
                Sign::Positive | Sign::Unsigned => TransactionType::Credit,
            },
        };

        let credit = self.columns.credit;
        if filled(credit) && is_amount_shaped(&cells[credit]) {
            return Some(signed(credit));
        }

        let trailing = cells.iter().rposition(|c| !c.trim().is_empty())?;
        if trailing > self.columns.symbol && is_amount_shaped(&cells[trailing]) {
            return Some(signed(trailing));
        }
        None
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::komercni_banka()
    }
}
