//! Query pipeline invariants over a table defined outside the crate
//!
//! Every table shares the generic answer path, so a minimal table over a
//! private row struct is enough to pin down filter, stats and render
//! behavior independent of the built-in tables.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use livequery::auth::NoAuthUser;
use livequery::column::{Column, ColumnOffsets, ColumnSet, Row};
use livequery::core::{Core, CoreState, MemoryCore, ProgramStatus};
use livequery::query::{Query, QueryError, QueryLimits, QueryState, Request};
use livequery::table::{ScanHint, Table, Visitor};

struct Item {
    name: String,
    state: i64,
    value: f64,
}

fn item(name: &str, state: i64, value: f64) -> Item {
    Item {
        name: name.to_string(),
        state,
        value,
    }
}

static EVAL_CALLS: AtomicUsize = AtomicUsize::new(0);

struct ItemsTable {
    columns: ColumnSet,
    items: Vec<Item>,
    core: Arc<dyn Core>,
    scans: AtomicUsize,
}

impl ItemsTable {
    fn new(items: Vec<Item>) -> Self {
        let mut columns = ColumnSet::new();
        let o = ColumnOffsets::new;
        columns.add(Column::string("name", "Item name", o(), |i: &Item| i.name.clone()));
        columns.add(Column::int("state", "Item state", o(), |i: &Item| i.state));
        columns.add(Column::double("value", "Item value", o(), |i: &Item| i.value));
        columns.add(Column::string("counted", "Counts evaluations", o(), |i: &Item| {
            EVAL_CALLS.fetch_add(1, Ordering::SeqCst);
            i.name.clone()
        }));
        Self {
            columns,
            items,
            core: Arc::new(MemoryCore::new(CoreState::new(ProgramStatus::default()))),
            scans: AtomicUsize::new(0),
        }
    }
}

impl Table for ItemsTable {
    fn name(&self) -> &str {
        "items"
    }

    fn name_prefix(&self) -> &str {
        "item_"
    }

    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    fn for_each_row(&self, _state: &CoreState, _hint: &ScanHint, visit: &mut Visitor<'_>) {
        self.scans.fetch_add(1, Ordering::SeqCst);
        for item in &self.items {
            if !visit(Row::new(item)) {
                break;
            }
        }
    }
}

fn run(table: &ItemsTable, text: &str) -> Result<String, QueryError> {
    let request = Request::parse(text)?;
    let mut query = Query::new(&request, table, QueryLimits::default())?;
    table.answer_query(&mut query, &NoAuthUser)?;
    assert_eq!(query.state(), QueryState::Rendered);
    Ok(String::from_utf8(query.take_output()).unwrap())
}

#[test]
fn projection_applies_filter() {
    let table = ItemsTable::new(vec![item("web", 0, 0.0), item("db", 2, 0.0)]);
    let out = run(&table, "GET items\nColumns: name\nFilter: state != 0\n").unwrap();
    assert_eq!(out, "db\n");
}

#[test]
fn filtered_count_over_five_rows() {
    let table = ItemsTable::new(vec![
        item("a", 0, 0.0),
        item("b", 2, 0.0),
        item("c", 1, 0.0),
        item("d", 2, 0.0),
        item("e", 3, 0.0),
    ]);
    let out = run(&table, "GET items\nStats: state = 2\n").unwrap();
    assert_eq!(out, "2\n");
}

#[test]
fn unknown_column_fails_before_scan() {
    let table = ItemsTable::new(vec![item("web", 0, 0.0)]);
    let err = run(&table, "GET items\nColumns: name bogus_col\n").unwrap_err();
    assert_eq!(err, QueryError::unknown_column("items", "bogus_col"));
    assert!(err.is_parse_error());
    assert_eq!(table.scans.load(Ordering::SeqCst), 0);

    let err = run(&table, "GET items\nFilter: bogus_col = 1\n").unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(table.scans.load(Ordering::SeqCst), 0);
}

#[test]
fn prefixed_column_names_resolve() {
    let table = ItemsTable::new(vec![item("web", 0, 0.0), item("db", 2, 0.0)]);
    let out = run(&table, "GET items\nColumns: item_name\nFilter: item_state = 2\n").unwrap();
    assert_eq!(out, "db\n");
}

#[test]
fn or_and_short_circuit() {
    // Single test touching EVAL_CALLS, so the count is not shared
    let table = ItemsTable::new(vec![item("a", 0, 0.0), item("b", 0, 0.0), item("c", 1, 0.0)]);

    EVAL_CALLS.store(0, Ordering::SeqCst);
    let text = "GET items\nColumns: name\nFilter: state = 0\nFilter: counted = c\nOr: 2\n";
    let out = run(&table, text).unwrap();
    assert_eq!(out, "a\nb\nc\n");
    // Only the row failing the first disjunct reaches the counted column
    assert_eq!(EVAL_CALLS.load(Ordering::SeqCst), 1);

    EVAL_CALLS.store(0, Ordering::SeqCst);
    let text = "GET items\nColumns: name\nFilter: state = 1\nFilter: counted = c\nAnd: 2\n";
    let out = run(&table, text).unwrap();
    assert_eq!(out, "c\n");
    assert_eq!(EVAL_CALLS.load(Ordering::SeqCst), 1);

    EVAL_CALLS.store(0, Ordering::SeqCst);
    let text = "GET items\nColumns: name\nFilter: state = 5\nFilter: counted = c\nAnd: 2\n\
                Negate:\n";
    run(&table, text).unwrap();
    assert_eq!(EVAL_CALLS.load(Ordering::SeqCst), 0);
}

#[test]
fn filter_is_idempotent() {
    let table =
        ItemsTable::new(vec![item("web", 0, 1.5), item("db", 2, 0.5), item("mail", 1, 3.0)]);
    let text = "GET items\nColumns: name\nFilter: value >= 1\nFilter: name ~ ^[wm]\nAnd: 2\n";
    let first = run(&table, text).unwrap();
    let second = run(&table, text).unwrap();
    assert_eq!(first, "web\nmail\n");
    assert_eq!(first, second);
}

#[test]
fn stats_are_order_independent() {
    let values = [(0, 1.0), (2, 4.0), (2, 0.5), (1, 8.0), (0, 2.0), (3, 0.25)];
    let text = "GET items\nStats: state = 2\nStats: sum value\nStats: min value\n\
                Stats: max value\nStats: avg value\nStats: std value\nStats: suminv value\n";

    let rows = |order: &[usize]| -> Vec<Item> {
        order
            .iter()
            .map(|&i| item(&format!("i{}", i), values[i].0, values[i].1))
            .collect()
    };

    let reference = run(&ItemsTable::new(rows(&[0, 1, 2, 3, 4, 5])), text).unwrap();
    for order in [[5, 4, 3, 2, 1, 0], [2, 0, 4, 1, 5, 3], [3, 5, 1, 0, 2, 4]] {
        assert_eq!(run(&ItemsTable::new(rows(&order)), text).unwrap(), reference);
    }

    let fields: Vec<&str> = reference.trim_end().split(';').collect();
    assert_eq!(fields[0], "2");
    assert_eq!(fields[1], "15.75");
    assert_eq!(fields[2], "0.25");
    assert_eq!(fields[3], "8");
}

#[test]
fn grouped_stats_keep_first_seen_order() {
    let table = ItemsTable::new(vec![
        item("web", 2, 1.0),
        item("db", 0, 2.0),
        item("web", 0, 3.0),
        item("db", 2, 4.0),
        item("web", 2, 5.0),
    ]);
    let out =
        run(&table, "GET items\nColumns: name\nStats: state = 2\nStats: sum value\n").unwrap();
    assert_eq!(out, "web;2;9\ndb;1;6\n");

    let text = "GET items\nColumns: name\nStats: state = 2\nOrderBy: name asc\nLimit: 1\n";
    let out = run(&table, text).unwrap();
    assert_eq!(out, "db;1\n");
}

#[test]
fn empty_stats_render_one_row() {
    let table = ItemsTable::new(Vec::new());
    let out =
        run(&table, "GET items\nStats: state = 2\nStats: sum value\nStats: avg value\n").unwrap();
    assert_eq!(out, "0;0;NA\n");

    let out = run(&table, "GET items\nColumns: name\nStats: state = 2\n").unwrap();
    assert_eq!(out, "");
}

#[test]
fn order_by_and_limit() {
    let table = ItemsTable::new(vec![item("b", 1, 0.0), item("c", 0, 0.0), item("a", 1, 0.0)]);
    let out = run(&table, "GET items\nColumns: name\nOrderBy: name desc\nLimit: 2\n").unwrap();
    assert_eq!(out, "c\nb\n");

    // Stable: equal keys keep scan order
    let out = run(&table, "GET items\nColumns: name\nOrderBy: state\n").unwrap();
    assert_eq!(out, "c\nb\na\n");

    // Without sorting the scan stops at the limit
    let out = run(&table, "GET items\nColumns: name\nLimit: 1\n").unwrap();
    assert_eq!(out, "b\n");
}

#[test]
fn malformed_literals_and_mismatches_are_parse_errors() {
    let table = ItemsTable::new(vec![item("web", 0, 0.0)]);
    for text in [
        "GET items\nFilter: state = zero\n",
        "GET items\nFilter: value < 1.2.3\n",
        "GET items\nFilter: state ~ 1\n",
        "GET items\nFilter: name ~ (unclosed\n",
        "GET items\nFilter: name === web\n",
        "GET items\nStats: sum name\n",
        "GET items\nAnd: 2\n",
    ] {
        let err = run(&table, text).unwrap_err();
        assert!(err.is_parse_error(), "{}: {:?}", text, err);
    }
    assert_eq!(table.scans.load(Ordering::SeqCst), 0);
}

#[test]
fn literal_keeps_inner_spaces() {
    let table = ItemsTable::new(vec![item("web server", 0, 0.0), item("web", 0, 0.0)]);
    let out = run(&table, "GET items\nColumns: name\nFilter: name = web server\n").unwrap();
    assert_eq!(out, "web server\n");
}

#[test]
fn empty_columns_header_selects_default_layout() {
    let table = ItemsTable::new(Vec::new());
    let layout = |text: &str| {
        let request = Request::parse(text).unwrap();
        let query = Query::new(&request, &table, QueryLimits::default()).unwrap();
        let names: Vec<String> = query.columns().iter().map(|c| c.name().to_string()).collect();
        (names, query.to_plan()["column_headers"].clone())
    };

    let (empty, empty_headers) = layout("GET items\nColumns:\n");
    let (absent, absent_headers) = layout("GET items\n");
    assert_eq!(empty, vec!["name", "state", "value", "counted"]);
    assert_eq!(empty, absent);
    assert_eq!(empty_headers, serde_json::json!(true));
    assert_eq!(empty_headers, absent_headers);

    // An explicit ColumnHeaders still wins
    let (_, headers) = layout("GET items\nColumns:\nColumnHeaders: off\n");
    assert_eq!(headers, serde_json::json!(false));
}

#[test]
fn sums_under_permutation() {
    let values = [0.1, 0.2, 0.3, 1e-9, 7.7, 1e6];
    let states = [3, -4, 9, 1 << 40, -(1 << 40), 2];
    let text = "GET items\nStats: sum value\nStats: sum state\nOutputFormat: json\n";
    let sums = |order: &[usize]| -> (f64, f64) {
        let items = order.iter().map(|&i| item(&format!("i{}", i), states[i], values[i])).collect();
        let out = run(&ItemsTable::new(items), text).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        (parsed[0][0].as_f64().unwrap(), parsed[0][1].as_f64().unwrap())
    };

    let (double_ref, int_ref) = sums(&[0, 1, 2, 3, 4, 5]);
    assert_eq!(int_ref, 10.0);
    for order in [[5, 4, 3, 2, 1, 0], [2, 0, 4, 1, 5, 3], [3, 5, 1, 0, 2, 4]] {
        let (double_sum, int_sum) = sums(&order);
        // Integer sums are exact, double sums agree up to rounding
        assert_eq!(int_sum, int_ref);
        assert!(
            (double_sum - double_ref).abs() <= 1e-12 * double_ref.abs(),
            "{} vs {}",
            double_sum,
            double_ref
        );
    }
}
