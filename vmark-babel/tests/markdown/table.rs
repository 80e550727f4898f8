use vmark_babel::ir::nodes::Align;
use vmark_babel::model::block_text;
use vmark_babel::model::nodes::Block;
use vmark_babel::{parse, serialize};

const TABLE: &str = "| Left | Center | Right |\n| :--- | :----: | ----: |\n| L | C | R |\n";

#[test]
fn test_alignment_reaches_every_cell_of_the_column() {
    let doc = parse(TABLE);
    let Block::Table(table) = &doc.content[0] else {
        panic!("expected table, got {:?}", doc.content[0]);
    };
    let expected = [Some(Align::Left), Some(Align::Center), Some(Align::Right)];
    for row in &table.rows {
        let aligns: Vec<_> = row.cells.iter().map(|cell| cell.body().align).collect();
        assert_eq!(aligns, expected);
    }
    assert!(table.rows[0].cells.iter().all(|cell| cell.is_header()));
    assert!(table.rows[1].cells.iter().all(|cell| !cell.is_header()));
    assert_eq!(block_text(&table.rows[1].cells[2].body().content[0]), "R");
}

#[test]
fn test_separator_row_markers() {
    let output = serialize(&parse(TABLE));
    assert_eq!(
        output,
        "| Left | Center | Right |\n| :-- | :-: | --: |\n| L | C | R |\n"
    );
}

#[test]
fn test_cells_keep_inline_marks_and_escape_pipes() {
    let output = serialize(&parse("| a | b |\n|---|---|\n| **x** | `p\\|q` |\n"));
    assert!(output.contains("| **x** |"), "{output}");
    assert!(output.contains("\\|"), "{output}");
}
