//! Template variable interpolation
//!
//! Expressions are interpolated before they are hashed into a target
//! signature, so the same panel bound to different variable values never
//! shares cached frames.

use tsq_core::ScopedVars;

/// Trait for components that resolve template variables in an expression
pub trait Interpolator: Send + Sync {
    /// Return `expr` with every known variable replaced by its value
    fn interpolate(&self, expr: &str, vars: &ScopedVars) -> String;
}

/// An interpolator that returns expressions unchanged
#[derive(Debug, Default, Clone)]
pub struct NoOpInterpolator;

impl Interpolator for NoOpInterpolator {
    fn interpolate(&self, expr: &str, _vars: &ScopedVars) -> String {
        expr.to_string()
    }
}

/// Resolves `$name`, `${name}`, `${name:format}` and `[[name]]` from the scoped variables.
///
/// Unknown variables are left in place.
#[derive(Debug, Default, Clone)]
pub struct TemplateInterpolator;

impl Interpolator for TemplateInterpolator {
    fn interpolate(&self, expr: &str, vars: &ScopedVars) -> String {
        let mut out = String::with_capacity(expr.len());
        let mut rest = expr;

        while let Some(pos) = rest.find(['$', '[']) {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some((name, len)) = variable_at(rest) {
                if let Some(value) = vars.get(name) {
                    out.push_str(value);
                    rest = &rest[len..];
                    continue;
                }
            }

            // '$' and '[' are single-byte
            out.push_str(&rest[..1]);
            rest = &rest[1..];
        }

        out.push_str(rest);
        out
    }
}

impl<F> Interpolator for F
where
    F: Fn(&str, &ScopedVars) -> String + Send + Sync,
{
    fn interpolate(&self, expr: &str, vars: &ScopedVars) -> String {
        self(expr, vars)
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Variable reference at the start of `s`: its name and the byte length of the reference
fn variable_at(s: &str) -> Option<(&str, usize)> {
    if let Some(body) = s.strip_prefix("${") {
        let end = body.find('}')?;
        let name = body[..end].split(':').next().unwrap_or_default();
        return is_variable_name(name).then_some((name, end + 3));
    }

    if let Some(body) = s.strip_prefix("[[") {
        let end = body.find("]]")?;
        let name = &body[..end];
        return is_variable_name(name).then_some((name, end + 4));
    }

    let body = s.strip_prefix('$')?;
    let len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    (len > 0).then(|| (&body[..len], len + 1))
}
