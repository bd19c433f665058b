//! placeholder paths
//!
//! `config.items[0]["key.with.dots"].name` splits into `config`, `items`, `0`, `key.with.dots`, `name`.
use super::TemplateError;
use crate::value::Value;

/// Segments that are never looked up
pub const FORBIDDEN_SEGMENTS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Splits a path on `.` outside of brackets
///
/// Bracket contents form one segment. Surrounding quotes are removed, everything inside quotes is kept verbatim.
pub fn parse_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;
    let mut quote: Option<char> = None;

    for c in path.chars() {
        match (c, in_bracket, quote) {
            (q, true, Some(open)) if q == open => quote = None,
            (_, true, Some(_)) => current.push(c),
            ('"' | '\'', true, None) => quote = Some(c),
            (']', true, None) => {
                segments.push(std::mem::take(&mut current));
                in_bracket = false;
            }
            ('[', false, _) => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                in_bracket = true;
            }
            ('.', false, _) => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Walks `context` along `path`
///
/// Missing keys, out of range indices and `null` values are `Ok(None)`. A forbidden segment anywhere in the path
/// is an error, whether or not the lookup would have reached it.
pub fn lookup<'c>(context: &'c Value, path: &str) -> Result<Option<&'c Value>, TemplateError> {
    let segments = parse_path(path);

    if let Some(segment) = segments
        .iter()
        .find(|segment| FORBIDDEN_SEGMENTS.contains(&segment.as_str()))
    {
        tracing::warn!(path, segment = segment.as_str(), "forbidden template path segment");
        return Err(TemplateError::Security {
            segment: segment.clone(),
            path: path.to_string(),
        });
    }

    if segments.is_empty() {
        return Ok(None);
    }

    let found = segments.iter().try_fold(context, |current, segment| match current {
        Value::Object(object) => object.get(segment),
        Value::Array(array) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| array.get(index)),
        _ => None,
    });

    Ok(found.filter(|value| !value.is_null()))
}
