//! Row classification: decides the role of one extracted row given the role
//! of the row right before it.

use vypis_core::locale::{is_amount_shaped, split_leading_date};
use vypis_core::{ClassifiedRow, FieldKey, HeaderField, RawRow, Role};

use crate::layout::Layout;

/// Longest text accepted as an unknown `label:` cell.
const MAX_LABEL_CHARS: usize = 40;

/// Control characters become spaces before whitespace is collapsed.
fn normalize_cell(cell: &str) -> String {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    cell.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clean extractor artifacts and fold split date/description columns.
///
/// Rows one cell wider than the layout whose first cell is a bare date get
/// their first two cells merged, so every transaction line carries
/// `date description` in its first cell.
pub fn normalize_row(raw: &RawRow, layout: &Layout) -> RawRow {
    let mut cells: Vec<String> = raw.cells.iter().map(|c| normalize_cell(c)).collect();

    let split_columns = cells.len() == layout.columns.width() + 1
        && matches!(split_leading_date(&cells[0]), Some((_, "")))
        && !cells[1].is_empty()
        && !is_amount_shaped(&cells[1]);
    if split_columns {
        let description = cells.remove(1);
        cells[0] = format!("{} {}", cells[0], description);
    }

    RawRow::new(raw.page, raw.index, cells)
}

/// Classify one row. Pure: same row and prior role always give the same result.
pub fn classify(raw: &RawRow, prior: Role, layout: &Layout) -> ClassifiedRow {
    let row = normalize_row(raw, layout);

    if row.is_blank() || layout.has_noise_marker(&row.cells) {
        return ClassifiedRow::new(row, Role::Noise);
    }

    if layout.is_footer(&row.cells) {
        return ClassifiedRow::new(row, Role::Footer);
    }

    // Inside wrapped transaction text only a known label cell starts a header.
    if let Some(field) = header_field(&row, layout, !prior.opens_continuation()) {
        return ClassifiedRow::header(row, field);
    }

    if is_transaction_line(&row, layout) {
        return ClassifiedRow::new(row, Role::Transaction);
    }

    if prior.opens_continuation() {
        return ClassifiedRow::new(row, Role::Continuation);
    }

    ClassifiedRow::new(row, Role::Noise)
}

/// Classify a whole row sequence, threading each row's role into the next.
pub fn classify_all<'a, I>(rows: I, layout: &Layout) -> Vec<ClassifiedRow>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut prior = Role::Noise;
    rows.into_iter()
        .map(|raw| {
            let classified = classify(raw, prior, layout);
            prior = classified.role;
            classified
        })
        .collect()
}

fn is_transaction_line(row: &RawRow, layout: &Layout) -> bool {
    split_leading_date(row.cell(layout.columns.date_description)).is_some()
        && layout.locate_amount(&row.cells).is_some()
}

/// Parse `label | value...` or `label: value` into a header field.
///
/// With `inline` unset only the first form with a known label is accepted.
fn header_field(row: &RawRow, layout: &Layout, inline: bool) -> Option<HeaderField> {
    let first = row.cells.iter().position(|c| !c.is_empty())?;
    let label_cell = &row.cells[first];

    let join_rest = |head: &str| {
        std::iter::once(head.trim())
            .chain(row.cells[first + 1..].iter().map(|c| c.as_str()))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };

    if let Some(key) = layout.lookup_label(label_cell) {
        let value = join_rest("");
        return (!value.is_empty()).then_some(HeaderField { key, value });
    }
    if !inline {
        return None;
    }

    let (label, inline_value) = label_cell.split_once(':')?;
    let label = label.trim();
    let value = join_rest(inline_value);
    if label.is_empty() || value.is_empty() {
        return None;
    }

    let key = match layout.lookup_label(label) {
        Some(key) => key,
        None if is_label_shaped(label) => FieldKey::Unknown(label.to_string()),
        None => return None,
    };
    Some(HeaderField { key, value })
}

fn is_label_shaped(text: &str) -> bool {
    text.chars().count() <= MAX_LABEL_CHARS && !text.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> RawRow {
        RawRow::new(1, 0, values.iter().map(|v| v.to_string()).collect())
    }

    fn kb() -> Layout {
        Layout::komercni_banka()
    }

    #[test]
    fn test_header_field_label_and_value_cells() {
        let c = classify(&row(&["IBAN:", "CZ65 0100 0000 0001 2345 6789"]), Role::Noise, &kb());
        assert_eq!(c.role, Role::HeaderField);
        let field = c.field.unwrap();
        assert_eq!(field.key, FieldKey::Iban);
        assert_eq!(field.value, "CZ65 0100 0000 0001 2345 6789");
    }

    #[test]
    fn test_header_field_inline_value() {
        let c = classify(&row(&["Číslo výpisu: 12", ""]), Role::HeaderField, &kb());
        assert_eq!(c.role, Role::HeaderField);
        assert_eq!(
            c.field,
            Some(HeaderField {
                key: FieldKey::StatementNumber,
                value: "12".into()
            })
        );
    }

    #[test]
    fn test_unknown_label_is_header_field() {
        let c = classify(&row(&["Pobočka:", "Praha 1"]), Role::HeaderField, &kb());
        assert_eq!(c.role, Role::HeaderField);
        assert_eq!(c.field.unwrap().key, FieldKey::Unknown("Pobočka".into()));
    }

    #[test]
    fn test_label_without_value_is_noise() {
        let c = classify(&row(&["IBAN:", "nan"]), Role::Noise, &kb());
        assert_eq!(c.role, Role::Noise);
    }

    #[test]
    fn test_footer_row() {
        let c = classify(
            &row(&["POČÁTEČNÍ ZŮSTATEK", "1 000,00", "KONEČNÝ ZŮSTATEK", "1 500,00"]),
            Role::Continuation,
            &kb(),
        );
        assert_eq!(c.role, Role::Footer);
    }

    #[test]
    fn test_inline_closing_balance_is_footer() {
        let c = classify(&row(&["KONEČNÝ ZŮSTATEK: 750,00"]), Role::Transaction, &kb());
        assert_eq!(c.role, Role::Footer);
    }

    #[test]
    fn test_header_balance_lines_are_not_footer() {
        let c = classify(&row(&["Konečný zůstatek", "750,00"]), Role::HeaderField, &kb());
        assert_eq!(c.role, Role::HeaderField);
        assert_eq!(c.field.unwrap().key, FieldKey::EndBalance);

        let pair = classify(
            &row(&["Počáteční zůstatek", "100,00", "Konečný zůstatek", "70,00"]),
            Role::HeaderField,
            &kb(),
        );
        assert_eq!(pair.role, Role::HeaderField);
        assert_eq!(pair.field.unwrap().key, FieldKey::StartBalance);
    }

    #[test]
    fn test_known_label_after_transaction_is_header_field() {
        for prior in [Role::Transaction, Role::Continuation] {
            let c = classify(&row(&["k účtu:", "111/0100"]), prior, &kb());
            assert_eq!(c.role, Role::HeaderField);
            assert_eq!(
                c.field,
                Some(HeaderField {
                    key: FieldKey::AccountNumber,
                    value: "111/0100".into()
                })
            );
        }
    }

    #[test]
    fn test_opening_balance_alone_is_header_field() {
        let c = classify(&row(&["Počáteční zůstatek", "1 000,00"]), Role::HeaderField, &kb());
        assert_eq!(c.role, Role::HeaderField);
        assert_eq!(c.field.unwrap().key, FieldKey::StartBalance);
    }

    #[test]
    fn test_transaction_line() {
        let c = classify(
            &row(&["05.01.2024 Platba kartou", "VISA", "", "", "250,00"]),
            Role::HeaderField,
            &kb(),
        );
        assert_eq!(c.role, Role::Transaction);
    }

    #[test]
    fn test_date_without_amount_is_not_transaction() {
        let c = classify(&row(&["04.01.2024 ALBERT PRAHA", "123-456/0100", "0308"]), Role::Transaction, &kb());
        assert_eq!(c.role, Role::Continuation);
    }

    #[test]
    fn test_continuation_needs_transaction_before() {
        let wrapped = row(&["zbytek popisu", ""]);
        assert_eq!(classify(&wrapped, Role::Transaction, &kb()).role, Role::Continuation);
        assert_eq!(classify(&wrapped, Role::Continuation, &kb()).role, Role::Continuation);
        assert_eq!(classify(&wrapped, Role::HeaderField, &kb()).role, Role::Noise);
        assert_eq!(classify(&wrapped, Role::Noise, &kb()).role, Role::Noise);
    }

    #[test]
    fn test_label_inside_wrapped_text_stays_continuation() {
        let c = classify(&row(&["Poznámka: nájem", ""]), Role::Transaction, &kb());
        assert_eq!(c.role, Role::Continuation);
        assert!(c.field.is_none());
    }

    #[test]
    fn test_noise_rows() {
        assert_eq!(classify(&row(&["", " "]), Role::Transaction, &kb()).role, Role::Noise);
        assert_eq!(
            classify(&row(&["Pokračování na další straně"]), Role::Transaction, &kb()).role,
            Role::Noise
        );
        assert_eq!(
            classify(&row(&["Datum", "Popis transakce", "VS", "Připsáno"]), Role::HeaderField, &kb()).role,
            Role::Noise
        );
    }

    #[test]
    fn test_normalize_merges_split_date_column() {
        let raw = row(&["05.01.2024", "Platba kartou", "VISA", "", "", "250,00"]);
        let normalized = normalize_row(&raw, &kb());
        assert_eq!(normalized.cells.len(), 5);
        assert_eq!(normalized.cells[0], "05.01.2024 Platba kartou");
        assert_eq!(normalized.cells[4], "250,00");
    }

    #[test]
    fn test_normalize_cleans_cells() {
        let normalized = normalize_row(&row(&["  a   b ", "nan", "NaN"]), &kb());
        assert_eq!(normalized.cells, vec!["a b", "", ""]);
    }

    #[test]
    fn test_normalize_replaces_control_characters() {
        let normalized = normalize_row(&row(&["a\u{1f}b", "x\u{0}\ty", "\u{7}"]), &kb());
        assert_eq!(normalized.cells, vec!["a b", "x y", ""]);
    }

    #[test]
    fn test_classify_all_threads_prior_role() {
        let rows = vec![
            row(&["05.01.2024 Platba", "", "", "", "10,00"]),
            row(&["pokračování textu"]),
            row(&["další řádek"]),
            row(&[""]),
            row(&["osiřelý text"]),
        ];
        let roles: Vec<Role> = classify_all(&rows, &kb()).into_iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![Role::Transaction, Role::Continuation, Role::Continuation, Role::Noise, Role::Noise]
        );
    }
}
