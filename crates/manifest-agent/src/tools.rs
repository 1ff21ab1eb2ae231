//! `query_dataset`: the tool the model calls to compute over every row.
//!
//! The model sends a JSON [`DatasetQuery`]; the result goes back to it as a
//! JSON string. Filters select rows, an optional `group_by` splits them and
//! the aggregate is applied per group.

use std::collections::{BTreeMap, HashSet};

use manifest_core::Dataset;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Name the tool is advertised under.
pub const QUERY_TOOL: &str = "query_dataset";

const DEFAULT_ROW_LIMIT: usize = 20;
const MAX_ROW_LIMIT: usize = 50;

/// Errors reported back to the model as the tool result.
#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("aggregate '{0}' needs a column")]
    ColumnRequired(&'static str),

    #[error("filter on '{column}' needs a numeric value, got '{value}'")]
    NotNumeric { column: String, value: String },

    #[error("filter on '{0}' needs a value")]
    MissingValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Missing,
    Present,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Distinct,
    Rows,
}

impl Aggregate {
    fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Distinct => "distinct",
            Aggregate::Rows => "rows",
        }
    }
}

/// Arguments of one `query_dataset` call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetQuery {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub group_by: Option<String>,
    pub aggregate: Aggregate,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// OpenAI `tools` entry describing [`QUERY_TOOL`].
pub fn tool_definition() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": QUERY_TOOL,
            "description": "Compute over every row of the passenger dataset. \
                Filters are ANDed. Comparisons are numeric when both sides are \
                numbers, otherwise case-insensitive text equality. \
                'count' counts matching rows (or non-empty cells of 'column'); \
                'sum', 'mean', 'min', 'max' use the numeric cells of 'column'; \
                'distinct' counts distinct values of 'column'; \
                'rows' returns matching rows as CSV (up to 'limit').",
            "parameters": {
                "type": "object",
                "properties": {
                    "filters": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "column": { "type": "string" },
                                "op": {
                                    "type": "string",
                                    "enum": ["eq", "ne", "lt", "le", "gt", "ge", "missing", "present"]
                                },
                                "value": { "type": ["string", "number"] }
                            },
                            "required": ["column", "op"]
                        }
                    },
                    "group_by": { "type": "string" },
                    "aggregate": {
                        "type": "string",
                        "enum": ["count", "sum", "mean", "min", "max", "distinct", "rows"]
                    },
                    "column": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_ROW_LIMIT }
                },
                "required": ["aggregate"]
            }
        }
    })
}

/// Dispatch a tool call by name with its raw JSON arguments.
pub fn call_tool(dataset: &Dataset, name: &str, arguments: &str) -> Result<Value, ToolError> {
    if name != QUERY_TOOL {
        return Err(ToolError::UnknownTool(name.to_string()));
    }
    let query: DatasetQuery = serde_json::from_str(arguments)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    run_query(dataset, &query)
}

/// Evaluate `query` over the whole dataset.
pub fn run_query(dataset: &Dataset, query: &DatasetQuery) -> Result<Value, ToolError> {
    let index = |name: &str| {
        dataset
            .column_index(name)
            .ok_or_else(|| ToolError::MissingColumn(name.to_string()))
    };

    let mut filters = Vec::with_capacity(query.filters.len());
    for filter in &query.filters {
        filters.push(CompiledFilter::new(index(&filter.column)?, filter)?);
    }
    let target = query.column.as_deref().map(index).transpose()?;
    let group = query.group_by.as_deref().map(index).transpose()?;

    if target.is_none()
        && matches!(
            query.aggregate,
            Aggregate::Sum | Aggregate::Mean | Aggregate::Min | Aggregate::Max | Aggregate::Distinct
        )
    {
        return Err(ToolError::ColumnRequired(query.aggregate.as_str()));
    }

    let matched: Vec<usize> = (0..dataset.row_count())
        .filter(|&row| filters.iter().all(|f| f.matches(dataset.cell(row, f.column))))
        .collect();

    let Some(group) = group else {
        return Ok(json!({
            "matched_rows": matched.len(),
            "result": aggregate(dataset, query, target, &matched),
        }));
    };

    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for &row in &matched {
        let key = dataset.cell(row, group).unwrap_or("<missing>").to_string();
        groups.entry(key).or_default().push(row);
    }
    let groups: Vec<Value> = groups
        .iter()
        .map(|(key, rows)| {
            json!({
                "key": key,
                "rows": rows.len(),
                "result": aggregate(dataset, query, target, rows),
            })
        })
        .collect();

    Ok(json!({ "matched_rows": matched.len(), "groups": groups }))
}

fn aggregate(dataset: &Dataset, query: &DatasetQuery, target: Option<usize>, rows: &[usize]) -> Value {
    let cells = move || {
        rows.iter()
            .filter_map(move |&row| target.and_then(|col| dataset.cell(row, col)))
    };
    let numbers = move || cells().filter_map(parse_number);

    match query.aggregate {
        Aggregate::Count => match target {
            Some(_) => json!(cells().count()),
            None => json!(rows.len()),
        },
        Aggregate::Sum => json!(round(numbers().sum())),
        Aggregate::Mean => {
            let values: Vec<f64> = numbers().collect();
            if values.is_empty() {
                Value::Null
            } else {
                json!(round(values.iter().sum::<f64>() / values.len() as f64))
            }
        }
        Aggregate::Min => numbers().reduce(f64::min).map_or(Value::Null, |v| json!(v)),
        Aggregate::Max => numbers().reduce(f64::max).map_or(Value::Null, |v| json!(v)),
        Aggregate::Distinct => json!(cells().collect::<HashSet<_>>().len()),
        Aggregate::Rows => {
            let limit = query.limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT);
            match dataset.rows_csv(rows.iter().copied().take(limit)) {
                Ok(csv) => json!({ "returned": rows.len().min(limit), "csv": csv }),
                Err(e) => json!({ "error": e.to_string() }),
            }
        }
    }
}

/// A filter with its column resolved and its value parsed once.
struct CompiledFilter {
    column: usize,
    op: FilterOp,
    text: String,
    number: Option<f64>,
}

impl CompiledFilter {
    fn new(column: usize, filter: &Filter) -> Result<Self, ToolError> {
        let text = match &filter.value {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let number = parse_number(&text);

        match filter.op {
            FilterOp::Missing | FilterOp::Present => {}
            FilterOp::Eq | FilterOp::Ne if filter.value.is_none() => {
                return Err(ToolError::MissingValue(filter.column.clone()));
            }
            FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge if number.is_none() => {
                return Err(ToolError::NotNumeric {
                    column: filter.column.clone(),
                    value: text,
                });
            }
            _ => {}
        }

        Ok(Self {
            column,
            op: filter.op,
            text,
            number,
        })
    }

    fn matches(&self, cell: Option<&str>) -> bool {
        match self.op {
            FilterOp::Missing => cell.is_none(),
            FilterOp::Present => cell.is_some(),
            FilterOp::Eq => cell.is_some_and(|c| self.equals(c)),
            FilterOp::Ne => !cell.is_some_and(|c| self.equals(c)),
            FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
                match (cell.and_then(parse_number), self.number) {
                    (Some(v), Some(bound)) => match self.op {
                        FilterOp::Lt => v < bound,
                        FilterOp::Le => v <= bound,
                        FilterOp::Gt => v > bound,
                        _ => v >= bound,
                    },
                    _ => false,
                }
            }
        }
    }

    fn equals(&self, cell: &str) -> bool {
        match (parse_number(cell), self.number) {
            (Some(a), Some(b)) => a == b,
            _ => cell.eq_ignore_ascii_case(&self.text),
        }
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn round(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
PassengerId,Survived,Pclass,Sex,Age
1,0,3,male,22
2,1,1,female,38
3,1,3,female,26
4,1,1,female,35
5,0,3,male,
6,0,1,male,54
";

    fn dataset() -> Dataset {
        Dataset::from_reader(MANIFEST.as_bytes()).unwrap()
    }

    fn query(json: &str) -> Value {
        call_tool(&dataset(), QUERY_TOOL, json).unwrap()
    }

    #[test]
    fn test_count_all_rows() {
        let out = query(r#"{"aggregate":"count"}"#);
        assert_eq!(out, json!({ "matched_rows": 6, "result": 6 }));
    }

    #[test]
    fn test_count_with_text_filter_is_case_insensitive() {
        let out = query(r#"{"filters":[{"column":"Sex","op":"eq","value":"Female"}],"aggregate":"count"}"#);
        assert_eq!(out["result"], 3);
    }

    #[test]
    fn test_numeric_filter_accepts_number_or_string() {
        let a = query(r#"{"filters":[{"column":"Age","op":"gt","value":30}],"aggregate":"count"}"#);
        let b = query(r#"{"filters":[{"column":"Age","op":"gt","value":"30"}],"aggregate":"count"}"#);
        assert_eq!(a["result"], 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_and_present() {
        let out = query(r#"{"filters":[{"column":"Age","op":"missing"}],"aggregate":"rows"}"#);
        assert_eq!(out["matched_rows"], 1);
        assert!(out["result"]["csv"].as_str().unwrap().contains("5,0,3,male,"));

        let out = query(r#"{"aggregate":"count","column":"Age"}"#);
        assert_eq!(out["result"], 5);
    }

    #[test]
    fn test_mean_skips_missing_cells() {
        let out = query(r#"{"aggregate":"mean","column":"Age"}"#);
        assert_eq!(out["result"], json!(35.0));
    }

    #[test]
    fn test_group_by_survival_rate() {
        let out = query(r#"{"group_by":"Sex","aggregate":"mean","column":"Survived"}"#);
        assert_eq!(
            out["groups"],
            json!([
                { "key": "female", "rows": 3, "result": 1.0 },
                { "key": "male", "rows": 3, "result": 0.0 }
            ])
        );
    }

    #[test]
    fn test_group_by_with_filter() {
        let out = query(
            r#"{"filters":[{"column":"Pclass","op":"eq","value":1}],"group_by":"Survived","aggregate":"count"}"#,
        );
        assert_eq!(out["matched_rows"], 3);
        assert_eq!(out["groups"][0], json!({ "key": "0", "rows": 1, "result": 1 }));
        assert_eq!(out["groups"][1], json!({ "key": "1", "rows": 2, "result": 2 }));
    }

    #[test]
    fn test_min_max_distinct() {
        assert_eq!(query(r#"{"aggregate":"min","column":"Age"}"#)["result"], json!(22.0));
        assert_eq!(query(r#"{"aggregate":"max","column":"Age"}"#)["result"], json!(54.0));
        assert_eq!(query(r#"{"aggregate":"distinct","column":"Pclass"}"#)["result"], 2);
    }

    #[test]
    fn test_rows_respects_limit() {
        let out = query(r#"{"aggregate":"rows","limit":2}"#);
        assert_eq!(out["result"]["returned"], 2);
        assert_eq!(out["result"]["csv"].as_str().unwrap().lines().count(), 3);
    }

    #[test]
    fn test_errors() {
        let ds = dataset();
        assert_eq!(
            call_tool(&ds, "python", "{}").unwrap_err(),
            ToolError::UnknownTool("python".to_string())
        );
        assert!(matches!(
            call_tool(&ds, QUERY_TOOL, "{not json").unwrap_err(),
            ToolError::InvalidArguments(_)
        ));
        assert_eq!(
            call_tool(&ds, QUERY_TOOL, r#"{"aggregate":"mean","column":"Cabin"}"#).unwrap_err(),
            ToolError::MissingColumn("Cabin".to_string())
        );
        assert_eq!(
            call_tool(&ds, QUERY_TOOL, r#"{"aggregate":"mean"}"#).unwrap_err(),
            ToolError::ColumnRequired("mean")
        );
        assert!(matches!(
            call_tool(
                &ds,
                QUERY_TOOL,
                r#"{"filters":[{"column":"Age","op":"lt","value":"old"}],"aggregate":"count"}"#
            )
            .unwrap_err(),
            ToolError::NotNumeric { .. }
        ));
    }

    #[test]
    fn test_tool_definition_names_query_tool() {
        let def = tool_definition();
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], QUERY_TOOL);
        assert_eq!(def["function"]["parameters"]["required"], json!(["aggregate"]));
    }
}
