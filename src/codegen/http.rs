// HTTP verb and path of a method: from its `google.api.http` option when present,
// otherwise from the `method` comment tag and the `/package.Service/Method` default path.

use std::fmt;

use super::descriptor::http_rule::Pattern;
use super::schema::{FileSchema, MethodSchema, ServiceSchema};
use super::tags::Tags;
use crate::GenerateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpVerb {
    /// Case-insensitive parse of a verb name.
    pub fn parse(verb: &str) -> Option<Self> {
        Some(match verb.to_ascii_uppercase().as_str() {
            "GET" => HttpVerb::Get,
            "POST" => HttpVerb::Post,
            "PUT" => HttpVerb::Put,
            "DELETE" => HttpVerb::Delete,
            "PATCH" => HttpVerb::Patch,
            "HEAD" => HttpVerb::Head,
            "OPTIONS" => HttpVerb::Options,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verb and path a method is served on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpInfo {
    pub verb: HttpVerb,
    /// Path in axum router syntax (`/orders/:id`).
    pub path: String,
}

pub fn resolve_http_info(
    file: &FileSchema,
    service: &ServiceSchema,
    method: &MethodSchema,
    tags: &Tags,
) -> Result<HttpInfo, GenerateError> {
    let unsupported_verb = |verb: &str| GenerateError::UnsupportedVerb {
        verb: verb.to_string(),
        method: method.full_name.clone(),
    };

    let mut verb = None;
    let mut template = String::new();
    if let Some(pattern) = method.http.as_ref().and_then(|rule| rule.pattern.as_ref()) {
        let (v, path) = match pattern {
            Pattern::Get(path) => (HttpVerb::Get, path),
            Pattern::Put(path) => (HttpVerb::Put, path),
            Pattern::Post(path) => (HttpVerb::Post, path),
            Pattern::Delete(path) => (HttpVerb::Delete, path),
            Pattern::Patch(path) => (HttpVerb::Patch, path),
            Pattern::Custom(custom) => (
                HttpVerb::parse(&custom.kind).ok_or_else(|| unsupported_verb(&custom.kind))?,
                &custom.path,
            ),
        };
        verb = Some(v);
        template = path.clone();
    }

    let verb = match verb {
        Some(verb) => verb,
        None => match tags.get("method") {
            Some(name) => HttpVerb::parse(name).ok_or_else(|| unsupported_verb(name))?,
            None => HttpVerb::Get,
        },
    };

    if template.is_empty() {
        template = default_path(file, service, method);
    }
    let path = router_path(&template).map_err(|reason| GenerateError::UnsupportedPath {
        path: template.clone(),
        method: method.full_name.clone(),
        reason,
    })?;

    Ok(HttpInfo { verb, path })
}

fn default_path(file: &FileSchema, service: &ServiceSchema, method: &MethodSchema) -> String {
    if file.package.is_empty() {
        format!("/{}/{}", service.name, method.name)
    } else {
        format!("/{}.{}/{}", file.package, service.name, method.name)
    }
}

/// Convert a google.api.http path template into axum router syntax.
///
/// `{var}` and `{var=*}` become `:var`, a trailing `{var=**}` becomes `*var`. Dotted field
/// paths use `_` in the parameter name. Literal text may not contain `:` or `*`, which the
/// router would read as parameters, so custom-verb suffixes (`/v1/orders:batchGet`) are
/// rejected.
pub fn router_path(template: &str) -> Result<String, &'static str> {
    if !template.starts_with('/') {
        return Err("path must start with '/'");
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        push_literal(&mut out, &rest[..open])?;
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or("unterminated '{'")?;
        let variable = &after[..close];
        rest = &after[close + 1..];

        if !out.ends_with('/') {
            return Err("variable must span a whole path segment");
        }
        let (name, pattern) = variable.split_once('=').unwrap_or((variable, "*"));
        if name.is_empty() {
            return Err("empty variable name");
        }
        let name = name.replace('.', "_");
        match pattern {
            "*" => {
                out.push(':');
                out.push_str(&name);
                if !(rest.is_empty() || rest.starts_with('/')) {
                    return Err("variable must span a whole path segment");
                }
            }
            "**" => {
                if !rest.is_empty() {
                    return Err("'**' is only allowed in the last segment");
                }
                out.push('*');
                out.push_str(&name);
            }
            _ => return Err("variable sub-patterns are not supported"),
        }
    }
    if rest.contains('}') {
        return Err("unbalanced '}'");
    }
    push_literal(&mut out, rest)?;
    Ok(out)
}

fn push_literal(out: &mut String, literal: &str) -> Result<(), &'static str> {
    if literal.contains([':', '*']) {
        return Err("':' and '*' are only allowed as parameters (custom verbs are not supported)");
    }
    out.push_str(literal);
    Ok(())
}

/// Route path with parameter names erased: `/a/:id` and `/a/:name` are the same route.
pub fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                ":"
            } else if segment.starts_with('*') {
                "*"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
