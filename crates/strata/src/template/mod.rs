//! placeholder substitution in string values
//!
//! Two syntaxes are recognized:
//! - curly: `{{app.name}}`, optionally with a default: `{{region|"eu-west-1"}}`
//! - dotted: `$.config.servers[0].host`, `$.request.headers["x-id"]`
//!
//! A backslash right before `{{` or `$.` keeps the placeholder as literal text (the backslash is dropped).
//!
//! Lookups that find nothing leave the placeholder text untouched, unless a curly placeholder carries a default.
//! Found values are rendered by [Value::to_template_string]. Paths containing `__proto__`, `constructor` or
//! `prototype` fail with [TemplateError::Security].
//!
//! The template is scanned once, left to right. Substituted text is never scanned again.
mod path;

pub use path::{lookup, parse_path, FORBIDDEN_SEGMENTS};

use crate::context::{ContextFunctions, FunctionError, RequestContext};
use crate::value::Value;
use crate::visit::VisitStringsMut;
use regex::{Captures, Regex};
use std::sync::OnceLock;

#[derive(thiserror::Error, Debug, Clone)]
pub enum TemplateError {
    #[error("template path '{path}' uses forbidden segment '{segment}'")]
    Security { segment: String, path: String },
    #[error(transparent)]
    Function(#[from] FunctionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    Curly,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Placeholder {
    /// The placeholder as written
    pub raw: String,
    pub path: String,
    pub default: Option<String>,
    /// Byte offsets into the template
    pub start: usize,
    pub end: usize,
    pub syntax: Syntax,
}

fn scanner() -> &'static Regex {
    static SCANNER: OnceLock<Regex> = OnceLock::new();
    SCANNER.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<escape>\\(?:\{\{|\$\.))",
            r#"|\{\{(?P<curly>[^}|]+?)\s*(?:\|\s*"(?P<default>[^"]*)"\s*)?\}\}"#,
            r#"|\$\.(?P<dotted>[a-zA-Z_]\w*(?:\.\w+|\[\d+\]|\["[^"]+"\]|\['[^']+'\])*)"#,
        ))
        .expect("placeholder scanner is a valid regex")
    })
}

fn function_reference() -> &'static Regex {
    static FUNCTION: OnceLock<Regex> = OnceLock::new();
    FUNCTION.get_or_init(|| {
        Regex::new(r"^\s*\{\{fn:([a-zA-Z_][a-zA-Z0-9_]*)\}\}\s*$")
            .expect("function reference is a valid regex")
    })
}

fn placeholder(captures: &Captures) -> Option<Placeholder> {
    let whole = captures.get(0)?;
    let (path, syntax) = match (captures.name("curly"), captures.name("dotted")) {
        (Some(path), _) => (path.as_str().trim(), Syntax::Curly),
        (None, Some(path)) => (path.as_str(), Syntax::Dotted),
        (None, None) => return None,
    };

    Some(Placeholder {
        raw: whole.as_str().to_string(),
        path: path.to_string(),
        default: captures.name("default").map(|d| d.as_str().to_string()),
        start: whole.start(),
        end: whole.end(),
        syntax,
    })
}

/// All unescaped placeholders, in order of appearance
pub fn extract(template: &str) -> Vec<Placeholder> {
    scanner()
        .captures_iter(template)
        .filter_map(|captures| placeholder(&captures))
        .collect()
}

pub fn has_template(template: &str) -> bool {
    !extract(template).is_empty()
}

/// Substitutes every placeholder in `template` from `context`
pub fn resolve(template: &str, context: &Value) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut last_end = 0;

    for captures in scanner().captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        output.push_str(&template[last_end..whole.start()]);
        last_end = whole.end();

        if captures.name("escape").is_some() {
            // drop the backslash
            output.push_str(&whole.as_str()[1..]);
            continue;
        }

        let Some(placeholder) = placeholder(&captures) else {
            output.push_str(whole.as_str());
            continue;
        };

        match lookup(context, &placeholder.path)? {
            Some(value) => output.push_str(&value.to_template_string()),
            None => {
                tracing::trace!(path = placeholder.path.as_str(), "placeholder not found");
                match (&placeholder.default, placeholder.syntax) {
                    (Some(default), Syntax::Curly) => output.push_str(default),
                    _ => output.push_str(&placeholder.raw),
                }
            }
        }
    }

    output.push_str(&template[last_end..]);
    Ok(output)
}

/// Name of the function a whole-string `{{fn:name}}` reference points to
pub fn function_name(value: &str) -> Option<&str> {
    function_reference()
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// Resolves every string inside `value`
///
/// A string that is exactly `{{fn:name}}` is replaced by the value the named function returns, which need not be
/// a string. All other strings are resolved with [resolve]. Stops at the first error.
pub fn resolve_deep(
    value: &mut Value,
    context: &Value,
    functions: &ContextFunctions,
    request: Option<&RequestContext>,
) -> Result<(), TemplateError> {
    let mut error = None;

    value.visit_strings_mut(&mut |node: &mut Value| {
        if error.is_some() {
            return;
        }
        let Value::String(text) = node else {
            return;
        };

        let resolved = match function_name(text) {
            Some(name) => functions
                .call(name, context, request)
                .map_err(TemplateError::from),
            None if has_template(text) || text.contains('\\') => {
                resolve(text, context).map(Value::String)
            }
            None => return,
        };

        match resolved {
            Ok(resolved) => *node = resolved,
            Err(e) => error = Some(e),
        }
    });

    match error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> Value {
        Value::from_yaml_str(
            r#"
            env: { REGION: eu }
            app: { name: svc, debug: true, replicas: 3 }
            request: { headers: { x-user: ada }, query: {}, path: {} }
            config:
              servers: [{ host: a.local }, { host: b.local }]
              limits: { cpu: 2 }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn curly_substitution() {
        assert_eq!(
            resolve("Hello {{app.name}}", &context()).unwrap(),
            "Hello svc"
        );
        assert_eq!(
            resolve("{{ app.name }}@{{env.REGION}}", &context()).unwrap(),
            "svc@eu"
        );
        assert_eq!(
            resolve("user={{request.headers.x-user}}", &context()).unwrap(),
            "user=ada"
        );
    }

    #[test]
    fn curly_defaults() {
        assert_eq!(resolve(r#"{{missing|"N/A"}}"#, &context()).unwrap(), "N/A");
        assert_eq!(
            resolve(r#"{{ app.owner | "nobody" }}"#, &context()).unwrap(),
            "nobody"
        );
        assert_eq!(resolve(r#"{{app.name|"x"}}"#, &context()).unwrap(), "svc");
        assert_eq!(
            resolve("keep {{app.owner}}", &context()).unwrap(),
            "keep {{app.owner}}"
        );
    }

    #[test]
    fn dotted_substitution() {
        assert_eq!(
            resolve("$.config.servers[1].host:8080", &context()).unwrap(),
            "b.local:8080"
        );
        assert_eq!(
            resolve(r#"cpu=$.config["limits"].cpu"#, &context()).unwrap(),
            "cpu=2"
        );
        assert_eq!(
            resolve("$.config.nothing stays", &context()).unwrap(),
            "$.config.nothing stays"
        );
    }

    #[test]
    fn non_strings_are_rendered_consistently() {
        assert_eq!(
            resolve("{{app.debug}}/{{app.replicas}}", &context()).unwrap(),
            "true/3"
        );
        assert_eq!(
            resolve("{{config.limits}}", &context()).unwrap(),
            r#"{"cpu":2}"#
        );
        assert_eq!(
            resolve("$.config.servers[0]", &context()).unwrap(),
            r#"{"host":"a.local"}"#
        );
    }

    #[test]
    fn escapes_stay_literal() {
        assert_eq!(
            resolve(r"\{{app.name}} is {{app.name}}", &context()).unwrap(),
            "{{app.name}} is svc"
        );
        assert_eq!(
            resolve(r"price: \$.config.limits.cpu", &context()).unwrap(),
            "price: $.config.limits.cpu"
        );
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let context = Value::from_yaml_str("app: { name: '{{app.secret}}', secret: s }").unwrap();
        assert_eq!(resolve("{{app.name}}", &context).unwrap(), "{{app.secret}}");
    }

    #[test]
    fn forbidden_segments_raise() {
        assert!(matches!(
            resolve("{{constructor}}", &context()),
            Err(TemplateError::Security { segment, .. }) if segment == "constructor"
        ));
        assert!(matches!(
            resolve(r#"{{app.prototype|"fallback"}}"#, &context()),
            Err(TemplateError::Security { .. })
        ));
        assert!(matches!(
            resolve("$.config.__proto__", &context()),
            Err(TemplateError::Security { .. })
        ));
    }

    #[test]
    fn extracts_placeholders() {
        let template = r#"a {{x.y|"d"}} b $.config.servers[0].host \{{skip}}"#;

        assert_eq!(
            extract(template),
            [
                Placeholder {
                    raw: r#"{{x.y|"d"}}"#.into(),
                    path: "x.y".into(),
                    default: Some("d".into()),
                    start: 2,
                    end: 13,
                    syntax: Syntax::Curly,
                },
                Placeholder {
                    raw: "$.config.servers[0].host".into(),
                    path: "config.servers[0].host".into(),
                    default: None,
                    start: 16,
                    end: 40,
                    syntax: Syntax::Dotted,
                },
            ]
        );
        assert!(has_template("{{a}}"));
        assert!(!has_template(r"\{{a}} and $5"));
    }

    #[test]
    fn deep_resolution_with_functions() {
        let mut functions = ContextFunctions::new();
        functions.register_request("limits", |context, _| {
            Ok(context
                .get_path(&["config", "limits"])
                .cloned()
                .unwrap_or_default())
        });

        let mut value = Value::from_yaml_str(
            r#"
            greeting: "hi {{request.headers.x-user}}"
            limits: "{{fn:limits}}"
            list: ["$.app.name", 7]
            "#,
        )
        .unwrap();

        resolve_deep(&mut value, &context(), &functions, None).unwrap();

        assert_eq!(
            value,
            Value::from_yaml_str("{ greeting: hi ada, limits: { cpu: 2 }, list: [svc, 7] }")
                .unwrap()
        );
    }

    #[test]
    fn deep_resolution_stops_on_error() {
        let mut value = Value::from_yaml_str(r#"{ a: "{{fn:unknown}}" }"#).unwrap();

        let error = resolve_deep(&mut value, &context(), &ContextFunctions::new(), None)
            .unwrap_err();
        assert!(matches!(
            error,
            TemplateError::Function(FunctionError::NotFound(_))
        ));
    }
}
