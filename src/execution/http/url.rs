//! URL builder.
//!
//! Substitutes `:name` / `:name?` placeholders, joins relative templates onto
//! a base URL and appends a query string. Output depends only on the inputs,
//! which keeps cache keys and request URLs stable.

use crate::types::Params;
use serde_json::Value;

/// Build the final request URL.
///
/// - `:name` and `:name?` are replaced with the URL-encoded parameter value.
/// - An optional placeholder without a value is removed together with the
///   slash in front of it (`/users/:id?` -> `/users`).
/// - A required placeholder without a value is left untouched.
/// - Templates that do not start with `http` are joined onto `base` with
///   exactly one `/` between them.
/// - Query parameters whose value is `null` are dropped.
pub fn build_url(base: &str, template: &str, path: &Params, query: &Params) -> String {
    let resolved = substitute_placeholders(template, path);
    let mut url = if resolved.starts_with("http") || base.is_empty() {
        resolved
    } else {
        join_url(base, &resolved)
    };
    append_query(&mut url, query);
    url
}

/// Join a base URL and a relative path with a single `/`.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    format!("{base}/{path}")
}

fn substitute_placeholders(template: &str, path: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        let starts_name = matches!(chars.peek(), Some((_, c)) if c.is_ascii_alphabetic() || *c == '_');
        if ch != ':' || !starts_name {
            out.push(ch);
            continue;
        }

        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }
        let optional = matches!(chars.peek(), Some((_, '?')));
        if optional {
            chars.next();
        }

        match path.get(&name).and_then(stringify) {
            Some(value) => out.push_str(&urlencoding::encode(&value)),
            None if optional => {
                if out.ends_with('/') {
                    out.pop();
                }
            }
            None => {
                out.push(':');
                out.push_str(&name);
            }
        }
    }
    out
}

fn append_query(url: &mut String, query: &Params) {
    let pairs: Vec<String> = query
        .iter()
        .filter_map(|(k, v)| {
            stringify(v).map(|v| format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v)))
        })
        .collect();
    if pairs.is_empty() {
        return;
    }
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&pairs.join("&"));
}

/// Stringify a parameter value; `null` means "not supplied".
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| stringify(v).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn replaces_and_encodes_required_placeholder() {
        let url = build_url(
            "https://api.example.com",
            "/users/:id",
            &params(&[("id", json!("a b/c"))]),
            &Params::new(),
        );
        assert_eq!(url, "https://api.example.com/users/a%20b%2Fc");
    }

    #[test]
    fn strips_unresolved_optional_segment() {
        let url = build_url("", "/users/:id?", &Params::new(), &Params::new());
        assert_eq!(url, "/users");

        let url = build_url("http://x", "/users/:id?/posts", &Params::new(), &Params::new());
        assert_eq!(url, "http://x/users/posts");
    }

    #[test]
    fn fills_optional_placeholder_when_supplied() {
        let url = build_url("http://x", "/users/:id?", &params(&[("id", json!(7))]), &Params::new());
        assert_eq!(url, "http://x/users/7");
    }

    #[test]
    fn leaves_unknown_required_placeholder() {
        let url = build_url("", "/users/:id", &Params::new(), &Params::new());
        assert_eq!(url, "/users/:id");
    }

    #[test]
    fn placeholder_names_do_not_prefix_match() {
        let url = build_url(
            "",
            "/:id/:identifier",
            &params(&[("id", json!(1)), ("identifier", json!("x"))]),
            &Params::new(),
        );
        assert_eq!(url, "/1/x");
    }

    #[test]
    fn ports_are_not_placeholders() {
        let url = build_url("", "http://localhost:8080/users/:id", &params(&[("id", json!(3))]), &Params::new());
        assert_eq!(url, "http://localhost:8080/users/3");
    }

    #[test]
    fn joins_with_exactly_one_slash() {
        assert_eq!(join_url("http://x/", "/a"), "http://x/a");
        assert_eq!(join_url("http://x", "a"), "http://x/a");
        assert_eq!(join_url("http://x//", "//a"), "http://x/a");
    }

    #[test]
    fn absolute_templates_ignore_base() {
        let url = build_url("http://base", "https://other/path", &Params::new(), &Params::new());
        assert_eq!(url, "https://other/path");
    }

    #[test]
    fn query_drops_nulls_and_encodes() {
        let url = build_url(
            "http://x",
            "/search",
            &Params::new(),
            &params(&[("q", json!("a&b")), ("page", json!(2)), ("skip", Value::Null)]),
        );
        assert_eq!(url, "http://x/search?page=2&q=a%26b");
    }

    #[test]
    fn query_appends_with_ampersand_when_url_has_query() {
        let url = build_url("http://x", "/search?v=1", &Params::new(), &params(&[("q", json!("z"))]));
        assert_eq!(url, "http://x/search?v=1&q=z");
    }

    #[test]
    fn all_null_query_adds_nothing() {
        let url = build_url("http://x", "/a", &Params::new(), &params(&[("q", Value::Null)]));
        assert_eq!(url, "http://x/a");
    }

    #[test]
    fn same_inputs_same_output() {
        let p = params(&[("id", json!(1))]);
        let q = params(&[("b", json!(2)), ("a", json!(1))]);
        assert_eq!(
            build_url("http://x", "/u/:id", &p, &q),
            build_url("http://x", "/u/:id", &p, &q)
        );
    }
}
