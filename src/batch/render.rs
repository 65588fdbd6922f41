use crate::source::row::Row;
use indexmap::IndexSet;

const DELIMITER: char = ',';

/// Render rows as CSV. The header is the union of field names in first-seen
/// order; a row without a given field gets an empty cell.
pub fn render_csv(rows: &[Row]) -> String {
    let columns: IndexSet<&str> = rows.iter().flat_map(|row| row.field_names()).collect();

    let mut out = String::new();
    write_record(&mut out, columns.iter().copied());

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| row.get(column).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        write_record(&mut out, cells.iter().map(String::as_str));
    }

    out
}

fn write_record<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        push_escaped(out, cell);
    }
    out.push('\n');
}

fn push_escaped(out: &mut String, cell: &str) {
    let needs_quotes = cell
        .chars()
        .any(|c| c == DELIMITER || c == '"' || c == '\n' || c == '\r');

    if !needs_quotes {
        out.push_str(cell);
        return;
    }

    out.push('"');
    for c in cell.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::row::FieldValue;

    #[test]
    fn test_heterogeneous_rows_union_header() {
        let rows = vec![
            Row::new().with("a", 1).with("b", 2),
            Row::new().with("a", 3).with("c", 4),
        ];
        assert_eq!(render_csv(&rows), "a,b,c\n1,2,\n3,,4\n");
    }

    #[test]
    fn test_quoting() {
        let rows = vec![Row::new()
            .with("note", "hello, world")
            .with("quote", r#"say "hi""#)
            .with("multi", "line1\nline2")
            .with("plain", "ok")];
        assert_eq!(
            render_csv(&rows),
            "note,quote,multi,plain\n\"hello, world\",\"say \"\"hi\"\"\",\"line1\nline2\",ok\n"
        );
    }

    #[test]
    fn test_null_and_bool_cells() {
        let rows = vec![Row::new()
            .with("flag", true)
            .with("missing", FieldValue::Null)];
        assert_eq!(render_csv(&rows), "flag,missing\ntrue,\n");
    }
}
