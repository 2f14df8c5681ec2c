use mdspec::parse::parse_delimited;
use mdspec::warnings;

#[test]
fn semicolon_exports_parse_through_delimiter_election() {
    let outcome = parse_delimited("id;name;status\n1;login;open\n2;logout;done");
    assert_eq!(outcome.matrix.column_count(), 3);
    assert_eq!(outcome.matrix.cell(1, 1), Some("login"));
}

#[test]
fn pipe_exports_parse_through_delimiter_election() {
    let outcome = parse_delimited("id|name\n1|login\n2|logout");
    assert_eq!(outcome.matrix.column_count(), 2);
    assert_eq!(outcome.matrix.cell(2, 1), Some("logout"));
}

#[test]
fn unquoted_multiline_cells_are_stitched_back() {
    let text = "ID\tStep\tExpected\n1\tOpen login page\tThe login form is shown\nand the cursor is in the name field\n2\tSubmit\tHome page";
    let outcome = parse_delimited(text);

    assert_eq!(outcome.matrix.row_count(), 3);
    assert_eq!(
        outcome.matrix.cell(1, 2),
        Some("The login form is shown\nand the cursor is in the name field")
    );
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.code == warnings::PARSING_WARNING));
}

#[test]
fn multi_row_continuations_accumulate_in_one_cell() {
    let text = "ID\tNotes\n1\tfirst line of a very long note\nsecond line\nthird line\n2\tshort";
    let outcome = parse_delimited(text);
    assert_eq!(outcome.matrix.row_count(), 3);
    let note = outcome.matrix.cell(1, 1).expect("note cell");
    assert!(note.contains("first line"));
    assert!(note.contains("second line"));
    assert!(note.contains("third line"));
}

#[test]
fn quoted_csv_cells_keep_embedded_delimiters() {
    let outcome = parse_delimited("id,title,notes\n1,\"Login, quickly\",\"a \"\"quoted\"\" word\"");
    assert_eq!(outcome.matrix.cell(1, 1), Some("Login, quickly"));
    assert_eq!(outcome.matrix.cell(1, 2), Some("a \"quoted\" word"));
}

#[test]
fn rows_never_exceed_the_first_record_width() {
    let text = "A\tB\tC\n1\t2\t3\t4\t5\n6\t7\t8";
    let outcome = parse_delimited(text);
    assert_eq!(outcome.matrix.column_count(), 3);
    assert_eq!(outcome.matrix.cell(1, 2), Some("3 4 5"));
}
