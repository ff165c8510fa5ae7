//! Character-level CSV parser for the raw sheet exports.
//!
//! The exports routinely carry multi-line directive text inside quoted
//! fields, so line-based splitting is not an option. Boundaries are exactly:
//! an unquoted comma ends a field, an unquoted CR/LF ends a row, and a
//! doubled quote inside a quoted field is a literal quote.

/// Parse raw delimited text into a grid of string cells.
///
/// Rows may be ragged; missing cells read as empty downstream. A trailing
/// row without a final newline is still emitted.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    // unterminated final row
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_rows_and_trailing_row_without_newline() {
        let grid = parse_csv("a,b,c\n1,2,3");
        assert_eq!(grid, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn crlf_terminators() {
        let grid = parse_csv("a,b\r\nc,d\r\n");
        assert_eq!(grid, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn quoted_commas_newlines_and_doubled_quotes() {
        let grid = parse_csv("\"x,y\",\"line1\nline2\",\"he said \"\"hi\"\"\"\n");
        assert_eq!(
            grid,
            vec![vec!["x,y", "line1\nline2", "he said \"hi\""]]
        );
    }

    #[test]
    fn empty_fields_survive() {
        let grid = parse_csv("a,,c\n,,\n");
        assert_eq!(grid, vec![vec!["a", "", "c"], vec!["", "", ""]]);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(parse_csv("").is_empty());
    }
}
