// Property tests for the listing → table pipeline.
use proptest::prelude::*;

use datamap::core::extract::{self, ExtractorKind};
use datamap::core::table::{Cell, ColumnKey, DATA_FILE, DATA_FORMAT, FILE_SIZE, Table};
use datamap::core::tokenize::{ColumnMap, Entry, TableBuilder};

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9_-]{1,8}",
        "[A-Za-z0-9_]{1,6}\\.[a-z0-9]{1,3}",
        Just("C96".to_string()),
        Just("mx100".to_string()),
    ]
}

fn entry() -> impl Strategy<Value = Entry> {
    (prop::collection::vec(segment(), 1..6), 0u64..1_000_000)
        .prop_map(|(segments, size)| Entry::new(segments.join("/"), size))
}

proptest! {
    #[test]
    fn rows_are_exactly_the_dotted_entries(entries in prop::collection::vec(entry(), 0..40)) {
        let table = TableBuilder::new(ColumnMap::new()).build(&entries).unwrap();
        let expected: Vec<(&str, u64)> = entries
            .iter()
            .filter_map(|e| {
                let last = e.path.rsplit('/').next().unwrap_or("");
                last.contains('.').then_some((last, e.size))
            })
            .collect();

        prop_assert_eq!(table.len(), expected.len());
        for (i, (file, size)) in expected.iter().enumerate() {
            prop_assert_eq!(table.cell(i, &FILE_SIZE.into()), Some(&Cell::Int(*size)));
            prop_assert_eq!(table.cell(i, &DATA_FILE.into()), Some(&Cell::text(*file)));
        }
    }

    #[test]
    fn data_format_is_a_suffix_starting_at_a_dot(entries in prop::collection::vec(entry(), 1..20)) {
        let table = TableBuilder::new(ColumnMap::new()).build(&entries).unwrap();
        for row in table.rows() {
            let file = row.get(&DATA_FILE.into()).and_then(Cell::as_text).unwrap();
            let format = row.get(&DATA_FORMAT.into()).and_then(Cell::as_text).unwrap();
            prop_assert!(format.starts_with('.'));
            prop_assert!(file.ends_with(format.as_ref()));
            prop_assert!(!format[1..].contains('.'));
        }
    }

    #[test]
    fn extraction_keeps_row_count(entries in prop::collection::vec(entry(), 0..30)) {
        let mut table = TableBuilder::new(ColumnMap::new()).build(&entries).unwrap();
        let before = table.len();
        let report = extract::apply(
            &mut table,
            ExtractorKind::GridResolutionShort,
            &[ColumnKey::from(DATA_FILE)],
            None,
        )
        .unwrap();

        prop_assert_eq!(table.len(), before);
        prop_assert_eq!(report.matched + report.missing, before);
    }

    #[test]
    fn rearranging_never_changes_values(
        entries in prop::collection::vec(entry(), 1..20),
        front in prop::collection::vec(order_key(), 0..8),
        back in prop::collection::vec(order_key(), 0..8),
    ) {
        let mut table = TableBuilder::new(ColumnMap::new()).build(&entries).unwrap();
        let before = snapshot(&table);

        table.move_to_front(&front);
        table.move_to_back(&back);

        let mut after = snapshot(&table);
        let mut sorted_before = before.clone();
        after.sort_by(|a, b| a.0.cmp(&b.0));
        sorted_before.sort_by(|a, b| a.0.cmp(&b.0));
        prop_assert_eq!(table.width(), before.len());
        prop_assert_eq!(after, sorted_before);
    }
}

/// Column keys for reordering: a few that always exist, positions that may
/// not, and one that never does. Repeats are likely.
fn order_key() -> impl Strategy<Value = ColumnKey> {
    prop_oneof![
        Just(ColumnKey::from(DATA_FILE)),
        Just(ColumnKey::from(FILE_SIZE)),
        Just(ColumnKey::from(DATA_FORMAT)),
        (0usize..6).prop_map(ColumnKey::Position),
        Just(ColumnKey::from("Not A Column")),
    ]
}

fn snapshot(table: &Table) -> Vec<(ColumnKey, Vec<Cell>)> {
    table
        .columns()
        .iter()
        .map(|k| (k.clone(), table.column_values(k).unwrap().into_iter().cloned().collect()))
        .collect()
}
