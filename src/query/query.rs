//! Query construction and evaluation
//!
//! # State machine
//!
//! `Parsed -> Scanning -> (Projecting | Aggregating) -> Rendered`
//!
//! - Built (`Parsed`) from a [`Request`] resolved against one table; every
//!   column, operator and literal is validated here, before any row is seen
//! - `begin_scan` enters `Scanning` while the table holds the core lock
//! - The first row fed through `process_dataset` selects projection or
//!   aggregation
//! - `finish` sorts, limits and renders; `Rendered` is terminal
//!
//! There is no way back: a query is driven exactly once.

use std::mem;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::column::{Column, Row, Value};
use crate::filter::{ColumnFilter, Filter, RelationalOperator};
use crate::output::{render, OutputFormat, ResponseHeader, Separators};
use crate::stats::{AggregationOp, StatsEvaluator, StatsSpec};
use crate::table::Table;

use super::errors::{QueryError, QueryResult};
use super::parser::{Header, Request};
use super::sorter::{ResultSorter, SortDirection, SortableRow};

/// Default cap on compiled regex size
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1024 * 1024;

/// Default cap on a rendered response body
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;

/// Resource limits applied to every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryLimits {
    pub regex_size_limit: usize,
    pub max_response_size: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryState {
    Parsed,
    Scanning,
    Projecting,
    Aggregating,
    Rendered,
}

impl QueryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Parsed => "parsed",
            QueryState::Scanning => "scanning",
            QueryState::Projecting => "projecting",
            QueryState::Aggregating => "aggregating",
            QueryState::Rendered => "rendered",
        }
    }
}

#[derive(Debug, Clone)]
struct OrderBy {
    column: Arc<Column>,
    direction: SortDirection,
    /// Position among the group columns of a stats query
    group_position: Option<usize>,
}

/// One request resolved against one table
#[derive(Debug)]
pub struct Query {
    table: String,
    columns: Vec<Arc<Column>>,
    filter: Filter,
    stats: Option<StatsEvaluator>,
    aggregating: bool,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    format: OutputFormat,
    separators: Separators,
    response_header: ResponseHeader,
    column_headers: bool,
    auth_user: Option<String>,
    keep_alive: bool,
    limits: QueryLimits,
    state: QueryState,
    rows: Vec<SortableRow>,
    rows_scanned: usize,
    rows_returned: usize,
    output: Vec<u8>,
}

impl Query {
    /// Resolves `request` against `table`. Fails on the first unknown
    /// column, bad operator, malformed literal or unbalanced combinator.
    pub fn new(request: &Request, table: &dyn Table, limits: QueryLimits) -> QueryResult<Self> {
        let mut builder = Builder {
            table,
            limits,
            columns: Vec::new(),
            filters: Vec::new(),
            stats: Vec::new(),
            order_by: Vec::new(),
        };

        let mut query = Query {
            table: table.name().to_string(),
            columns: Vec::new(),
            filter: Filter::always_true(),
            stats: None,
            aggregating: false,
            order_by: Vec::new(),
            limit: None,
            format: OutputFormat::default(),
            separators: Separators::default(),
            response_header: ResponseHeader::default(),
            column_headers: false,
            auth_user: None,
            keep_alive: false,
            limits,
            state: QueryState::Parsed,
            rows: Vec::new(),
            rows_scanned: 0,
            rows_returned: 0,
            output: Vec::new(),
        };
        let mut column_headers = None;

        for header in &request.headers {
            match header {
                Header::Columns(names) => builder.add_columns(names)?,
                Header::Filter(text) => {
                    let leaf = builder.comparison(text)?;
                    builder.filters.push(leaf);
                }
                Header::And(n) => Builder::combine(&mut builder.filters, *n, "And", Filter::And)?,
                Header::Or(n) => Builder::combine(&mut builder.filters, *n, "Or", Filter::Or)?,
                Header::Negate => {
                    let child = builder
                        .filters
                        .pop()
                        .ok_or_else(|| QueryError::invalid_header("Negate on empty filter stack"))?;
                    builder.filters.push(child.negated());
                }
                Header::Stats(text) => {
                    let spec = builder.stats_spec(text)?;
                    builder.stats.push(spec);
                }
                Header::StatsAnd(n) => builder.combine_stats(*n, "StatsAnd", Filter::And)?,
                Header::StatsOr(n) => builder.combine_stats(*n, "StatsOr", Filter::Or)?,
                Header::StatsNegate => builder.negate_stats()?,
                Header::Limit(n) => query.limit = Some(*n),
                Header::OrderBy { column, direction } => {
                    let column = builder.resolve(column)?;
                    builder.order_by.push((column, *direction));
                }
                Header::OutputFormat(format) => query.format = *format,
                Header::ColumnHeaders(on) => column_headers = Some(*on),
                Header::Separators(separators) => query.separators = *separators,
                Header::ResponseHeader(mode) => query.response_header = *mode,
                Header::AuthUser(name) => query.auth_user = Some(name.clone()),
                Header::KeepAlive(on) => query.keep_alive = *on,
            }
        }

        let is_stats = !builder.stats.is_empty();
        query.aggregating = is_stats;
        // An empty `Columns:` header selects the default layout, headers included
        let default_layout = builder.columns.is_empty();
        query.column_headers = column_headers.unwrap_or(!is_stats && default_layout);
        query.filter = match builder.filters.len() {
            1 => builder.filters.remove(0),
            _ => Filter::And(mem::take(&mut builder.filters)),
        };

        if is_stats {
            query.order_by = builder.grouped_order_by()?;
            query.columns = builder.columns.clone();
            query.stats = Some(StatsEvaluator::new(
                mem::take(&mut builder.columns),
                mem::take(&mut builder.stats),
            ));
        } else {
            query.columns = if default_layout {
                table.columns().iter().cloned().collect()
            } else {
                mem::take(&mut builder.columns)
            };
            query.order_by = builder
                .order_by
                .into_iter()
                .map(|(column, direction)| OrderBy {
                    column,
                    direction,
                    group_position: None,
                })
                .collect();
        }
        Ok(query)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn is_stats(&self) -> bool {
        self.aggregating
    }

    /// Projected columns, or the group columns of a stats query
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn response_header(&self) -> ResponseHeader {
        self.response_header
    }

    pub fn auth_user(&self) -> Option<&str> {
        self.auth_user.as_deref()
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn rows_scanned(&self) -> usize {
        self.rows_scanned
    }

    pub fn rows_returned(&self) -> usize {
        self.rows_returned
    }

    /// Called once the table holds the core lock
    pub fn begin_scan(&mut self) -> QueryResult<()> {
        self.expect_state(&[QueryState::Parsed], "parsed")?;
        self.state = QueryState::Scanning;
        Ok(())
    }

    /// Feeds one visible row. Returns false when no further row can change
    /// the result (limit reached without sorting).
    pub fn process_dataset(&mut self, row: Row<'_>) -> bool {
        match self.state {
            QueryState::Scanning => {
                self.state = if self.aggregating {
                    QueryState::Aggregating
                } else {
                    QueryState::Projecting
                };
            }
            QueryState::Projecting | QueryState::Aggregating => {}
            QueryState::Parsed | QueryState::Rendered => return false,
        }

        self.rows_scanned += 1;
        if !self.filter.accepts(row) {
            return true;
        }

        match &mut self.stats {
            Some(stats) => {
                stats.consume(row);
                true
            }
            None => {
                self.rows.push(SortableRow {
                    values: self.columns.iter().map(|column| column.value(row)).collect(),
                    sort_key: self.order_by.iter().map(|o| o.column.value(row)).collect(),
                });
                let reached = self.limit.map_or(false, |limit| self.rows.len() >= limit);
                !(reached && self.order_by.is_empty())
            }
        }
    }

    /// Sorts, applies the limit and renders. The lock is no longer needed.
    pub fn finish(&mut self) -> QueryResult<()> {
        self.expect_state(
            &[QueryState::Scanning, QueryState::Projecting, QueryState::Aggregating],
            "scanning",
        )?;

        let mut table: Vec<Vec<Value>> = Vec::new();
        match self.stats.take() {
            Some(stats) => {
                let header = self.column_headers.then(|| {
                    let mut names: Vec<Value> = stats
                        .group_by()
                        .iter()
                        .map(|c| Value::String(c.name().to_string()))
                        .collect();
                    names.extend(
                        (1..=stats.specs().len()).map(|i| Value::String(format!("stats_{}", i))),
                    );
                    names
                });
                let mut rows = stats.into_rows();
                let positions: Vec<_> = self
                    .order_by
                    .iter()
                    .filter_map(|o| o.group_position.map(|pos| (pos, o.direction)))
                    .collect();
                ResultSorter::sort_by_positions(&mut rows, &positions);
                if let Some(limit) = self.limit {
                    rows.truncate(limit);
                }
                self.rows_returned = rows.len();
                table.extend(header);
                table.extend(rows);
            }
            None => {
                let directions: Vec<SortDirection> =
                    self.order_by.iter().map(|o| o.direction).collect();
                let mut rows = mem::take(&mut self.rows);
                ResultSorter::sort(&mut rows, &directions);
                if let Some(limit) = self.limit {
                    rows.truncate(limit);
                }
                self.rows_returned = rows.len();
                if self.column_headers {
                    table.push(
                        self.columns
                            .iter()
                            .map(|c| Value::String(c.name().to_string()))
                            .collect(),
                    );
                }
                table.extend(rows.into_iter().map(|row| row.values));
            }
        }

        let output = render(self.format, self.separators, table.iter().map(Vec::as_slice));
        self.state = QueryState::Rendered;
        if output.len() > self.limits.max_response_size {
            return Err(QueryError::ResponseTooLarge {
                size: output.len(),
                limit: self.limits.max_response_size,
            });
        }
        self.output = output;
        Ok(())
    }

    /// Rendered body, empty before `finish`
    pub fn take_output(&mut self) -> Vec<u8> {
        mem::take(&mut self.output)
    }

    /// Plan form used by `explain`
    pub fn to_plan(&self) -> JsonValue {
        json!({
            "table": self.table,
            "state": self.state.as_str(),
            "kind": if self.is_stats() { "stats" } else { "projection" },
            "columns": self.columns().iter().map(|c| c.name()).collect::<Vec<_>>(),
            "filter": self.filter.to_json(),
            "filter_text": self.filter.to_string(),
            "stats": self
                .stats
                .as_ref()
                .map(|s| s.specs().iter().map(StatsSpec::to_json).collect::<Vec<_>>())
                .unwrap_or_default(),
            "order_by": self
                .order_by
                .iter()
                .map(|o| json!({ "column": o.column.name(), "direction": o.direction.as_str() }))
                .collect::<Vec<_>>(),
            "limit": self.limit,
            "output_format": self.format,
            "column_headers": self.column_headers,
            "response_header": self.response_header,
            "auth_user": self.auth_user,
        })
    }

    fn expect_state(&self, allowed: &[QueryState], expected: &'static str) -> QueryResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(QueryError::InvalidState {
                expected,
                found: self.state.as_str(),
            })
        }
    }
}

/// Accumulates header effects while a query is being built
struct Builder<'t> {
    table: &'t dyn Table,
    limits: QueryLimits,
    columns: Vec<Arc<Column>>,
    filters: Vec<Filter>,
    stats: Vec<StatsSpec>,
    order_by: Vec<(Arc<Column>, SortDirection)>,
}

impl Builder<'_> {
    fn resolve(&self, name: &str) -> QueryResult<Arc<Column>> {
        self.table
            .column(name)
            .ok_or_else(|| QueryError::unknown_column(self.table.name(), name))
    }

    fn add_columns(&mut self, names: &[String]) -> QueryResult<()> {
        for name in names {
            let column = self.resolve(name)?;
            self.columns.push(column);
        }
        Ok(())
    }

    /// `<column> <op> <literal>`; the literal is the rest of the line after
    /// the operator and may be empty.
    fn comparison(&self, text: &str) -> QueryResult<Filter> {
        let text = text.trim_start();
        let (name, rest) = split_token(text);
        if name.is_empty() {
            return Err(QueryError::invalid_header("empty filter expression"));
        }
        let (op, literal) = split_token(rest);
        if op.is_empty() {
            return Err(QueryError::invalid_header(format!("missing operator in '{}'", text)));
        }
        let column = self.resolve(name)?;
        let op = RelationalOperator::parse(op)?;
        let leaf = ColumnFilter::new(column, op, literal, self.limits.regex_size_limit)?;
        Ok(Filter::Comparison(leaf))
    }

    fn stats_spec(&self, text: &str) -> QueryResult<StatsSpec> {
        let trimmed = text.trim();
        let (first, rest) = split_token(trimmed);
        if let Some(op) = AggregationOp::parse(first) {
            let column_name = rest.trim();
            if !column_name.is_empty() && !column_name.contains(char::is_whitespace) {
                return StatsSpec::aggregate(op, self.resolve(column_name)?);
            }
        }
        Ok(StatsSpec::Count(self.comparison(text)?))
    }

    fn combine(
        filters: &mut Vec<Filter>,
        n: usize,
        header: &str,
        make: fn(Vec<Filter>) -> Filter,
    ) -> QueryResult<()> {
        if n > filters.len() {
            return Err(QueryError::invalid_header(format!(
                "{}: {} exceeds the {} filters on the stack",
                header,
                n,
                filters.len()
            )));
        }
        let children = filters.split_off(filters.len() - n);
        filters.push(make(children));
        Ok(())
    }

    fn combine_stats(
        &mut self,
        n: usize,
        header: &str,
        make: fn(Vec<Filter>) -> Filter,
    ) -> QueryResult<()> {
        if n > self.stats.len() {
            return Err(QueryError::invalid_header(format!(
                "{}: {} exceeds the {} stats on the stack",
                header,
                n,
                self.stats.len()
            )));
        }
        let tail = self.stats.split_off(self.stats.len() - n);
        let mut children = Vec::with_capacity(n);
        for spec in tail {
            match spec {
                StatsSpec::Count(filter) => children.push(filter),
                StatsSpec::Aggregate { .. } => {
                    return Err(QueryError::invalid_header(format!(
                        "{} can only combine counting stats",
                        header
                    )))
                }
            }
        }
        self.stats.push(StatsSpec::Count(make(children)));
        Ok(())
    }

    fn negate_stats(&mut self) -> QueryResult<()> {
        match self.stats.pop() {
            Some(StatsSpec::Count(filter)) => {
                self.stats.push(StatsSpec::Count(filter.negated()));
                Ok(())
            }
            _ => Err(QueryError::invalid_header("StatsNegate requires a counting stat")),
        }
    }

    /// In stats queries only group columns can order the result
    fn grouped_order_by(&self) -> QueryResult<Vec<OrderBy>> {
        self.order_by
            .iter()
            .map(|(column, direction)| {
                let position = self
                    .columns
                    .iter()
                    .position(|group| group.name() == column.name())
                    .ok_or_else(|| {
                        QueryError::invalid_header(format!(
                            "OrderBy column '{}' is not a group column",
                            column.name()
                        ))
                    })?;
                Ok(OrderBy {
                    column: column.clone(),
                    direction: *direction,
                    group_position: Some(position),
                })
            })
            .collect()
    }
}

/// Splits at the first whitespace run: `("name", "rest")`
fn split_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => {
            let (token, rest) = text.split_at(idx);
            (token, rest.trim_start())
        }
        None => (text, ""),
    }
}
