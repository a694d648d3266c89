//! Text and JsonLogic search handlers.

use crate::mcp::tool_types::{ComplexSearchArgs, FindInFileArgs, parse_args};
use crate::models::{JsonSearchHit, SearchHit, SearchMatch};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

use super::super::{ToolContext, ToolResult};

/// Above this many matching files, `find_in_file` returns match counts only.
const SUMMARY_THRESHOLD: usize = 5;

/// JsonLogic operators forwarded to the backend.
const SUPPORTED_OPERATORS: &[&str] = &["glob", "var", "and", "or", "in", "not", "!", "==", "!="];

#[derive(Debug, Serialize)]
struct SearchResponse<T> {
    message: String,
    results: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchSummary {
    filename: String,
    match_count: usize,
}

#[derive(Debug, Serialize)]
struct MatchDetail {
    filename: String,
    matches: Vec<SearchMatch>,
    score: f64,
}

/// Executes the `find_in_file` tool.
pub async fn execute_find_in_file(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: FindInFileArgs = parse_args(arguments)?;
    if args.query.trim().is_empty() {
        return Err(Error::Validation(vec!["'query' must not be empty".to_string()]));
    }

    let hits = ctx.backend.search(&args.query, args.context_length).await?;
    tracing::debug!(query = %args.query, files = hits.len(), "Text search finished");

    if hits.len() > SUMMARY_THRESHOLD {
        ToolResult::json(&summarize(hits))
    } else {
        ToolResult::json(&detail(hits))
    }
}

fn summarize(hits: Vec<SearchHit>) -> SearchResponse<MatchSummary> {
    SearchResponse {
        message: format!("Found {} files with matches. Showing summary.", hits.len()),
        results: hits
            .into_iter()
            .map(|hit| MatchSummary {
                match_count: hit.matches.len(),
                filename: hit.filename,
            })
            .collect(),
    }
}

fn detail(hits: Vec<SearchHit>) -> SearchResponse<MatchDetail> {
    SearchResponse {
        message: format!("Found {} files with matches", hits.len()),
        results: hits
            .into_iter()
            .map(|hit| MatchDetail {
                filename: hit.filename,
                matches: hit.matches,
                score: hit.score,
            })
            .collect(),
    }
}

/// Executes the `complex_search` tool.
///
/// The query is checked for unsupported operators, then forwarded verbatim.
pub async fn execute_complex_search(ctx: &ToolContext, arguments: Value) -> Result<ToolResult> {
    let args: ComplexSearchArgs = parse_args(arguments)?;

    let mut errors = Vec::new();
    check_operators(&args.query, "query", &mut errors);
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let results: Vec<JsonSearchHit> = ctx.backend.search_json(&args.query).await?;
    ToolResult::json(&SearchResponse {
        message: format!("Found {} matching files", results.len()),
        results,
    })
}

/// Walks a JsonLogic rule, collecting every unsupported operator.
///
/// An object is an operation and must hold exactly one operator key.
/// Arrays are argument lists; scalars are literals.
fn check_operators(rule: &Value, location: &str, errors: &mut Vec<String>) {
    match rule {
        Value::Object(map) => {
            if map.len() != 1 {
                errors.push(format!(
                    "'{location}' must contain exactly one operator, found {}",
                    map.len()
                ));
            }
            for (operator, operands) in map {
                if !SUPPORTED_OPERATORS.contains(&operator.as_str()) {
                    errors.push(format!(
                        "'{location}' uses unsupported operator '{operator}'; supported: {}",
                        SUPPORTED_OPERATORS.join(", ")
                    ));
                    continue;
                }
                // `var` takes a variable name, never a nested rule.
                if operator != "var" {
                    check_operators(operands, &format!("{location}.{operator}"), errors);
                }
            }
        },
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_operators(item, &format!("{location}[{i}]"), errors);
            }
        },
        _ => {},
    }
}
