//! Parameter rendering
//!
//! Parameters are spliced into SQL text as-is. Values are NOT escaped or bound:
//! only pass parameters from trusted configuration.

use modelrun_core::Params;

/// Substitutes named parameters into SQL text
pub trait ParameterRenderer {
    fn render(&self, sql: &str, params: &Params) -> String;
}

/// `{name}` placeholder substitution
///
/// `{{` and `}}` render as literal braces. Placeholders naming an unknown
/// parameter are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceRenderer;

impl ParameterRenderer for BraceRenderer {
    fn render(&self, sql: &str, params: &Params) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut rest = sql;

        while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("{{") {
                out.push('{');
                rest = after;
                continue;
            }
            if let Some(after) = tail.strip_prefix("}}") {
                out.push('}');
                rest = after;
                continue;
            }

            if tail.starts_with('{') {
                if let Some(end) = tail.find('}') {
                    let key = &tail[1..end];
                    if let Some(value) = params.get(key) {
                        out.push_str(value);
                        rest = &tail[end + 1..];
                        continue;
                    }
                    if is_placeholder(key) {
                        tracing::warn!("No value for parameter '{}', leaving placeholder", key);
                    }
                }
            }

            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }

        out.push_str(rest);
        out
    }
}

fn is_placeholder(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
