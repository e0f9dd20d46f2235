//! Value interpolation over a merged document.
//!
//! String values may embed `{{ expr }}` where `expr` is a path into the same
//! document: `env`, `db.host`, `hosts[0]`, `hosts.0` or `labels['app.kind']`.
//! Referenced strings are rendered before use, so templates may chain; a
//! chain that returns to a value already being rendered is a cycle.
//!
//! Keys are never rendered, only values.

use crate::error::InterpolationError;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// `{{ ... }}`, possibly spanning lines.
static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid template pattern"));

/// What to do with an expression that cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedPolicy {
    /// Fail the render.
    #[default]
    Strict,
    /// Leave the `{{ ... }}` text in place.
    Preserve,
}

/// One step of a path into a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Accessor {
    Key(String),
    Index(usize),
}

/// Location of a value inside the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
struct Location(Vec<Accessor>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, step) in self.0.iter().enumerate() {
            match step {
                Accessor::Key(k) if i == 0 => write!(f, "{k}")?,
                Accessor::Key(k) => write!(f, ".{k}")?,
                Accessor::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

impl Location {
    fn child(&self, step: Accessor) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }
}

/// Render every string in `document` against the document itself.
pub fn interpolate(
    document: &Value,
    policy: UndefinedPolicy,
) -> Result<Value, InterpolationError> {
    Renderer {
        root: document,
        policy,
        rendered: HashMap::new(),
        in_progress: Vec::new(),
    }
    .render_value(document, &Location::default())
}

/// True if `text` contains at least one `{{ ... }}` expression.
pub fn has_expressions(text: &str) -> bool {
    EXPRESSION.is_match(text)
}

struct Renderer<'a> {
    root: &'a Value,
    policy: UndefinedPolicy,
    /// Finished strings, by location.
    rendered: HashMap<Location, String>,
    /// Strings currently being rendered, outermost first.
    in_progress: Vec<Location>,
}

impl Renderer<'_> {
    fn render_value(
        &mut self,
        value: &Value,
        location: &Location,
    ) -> Result<Value, InterpolationError> {
        Ok(match value {
            Value::String(s) => Value::String(self.render_string(s, location)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.render_value(item, &location.child(Accessor::Index(i)))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let child = location.child(Accessor::Key(k.clone()));
                        let rendered = self.render_value(v, &child)?;
                        Ok((k.clone(), rendered))
                    })
                    .collect::<Result<_, InterpolationError>>()?,
            ),
            other => other.clone(),
        })
    }

    fn render_string(
        &mut self,
        raw: &str,
        location: &Location,
    ) -> Result<String, InterpolationError> {
        if !has_expressions(raw) {
            return Ok(raw.to_string());
        }
        if let Some(done) = self.rendered.get(location) {
            return Ok(done.clone());
        }
        if let Some(start) = self.in_progress.iter().position(|l| l == location) {
            let mut chain: Vec<String> = self.in_progress[start..]
                .iter()
                .map(ToString::to_string)
                .collect();
            chain.push(location.to_string());
            return Err(InterpolationError::Cycle { chain });
        }

        self.in_progress.push(location.clone());
        let result = self.substitute(raw, location);
        self.in_progress.pop();

        let rendered = result?;
        self.rendered.insert(location.clone(), rendered.clone());
        Ok(rendered)
    }

    fn substitute(
        &mut self,
        raw: &str,
        location: &Location,
    ) -> Result<String, InterpolationError> {
        let mut out = String::with_capacity(raw.len());
        let mut last = 0;

        for caps in EXPRESSION.captures_iter(raw) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let expression = caps.get(1).map_or("", |m| m.as_str()).trim();
            out.push_str(&raw[last..whole.start()]);
            last = whole.end();

            let Some(target) = parse_expression(expression) else {
                match self.policy {
                    UndefinedPolicy::Preserve => out.push_str(whole.as_str()),
                    UndefinedPolicy::Strict => {
                        return Err(InterpolationError::Syntax {
                            expression: expression.to_string(),
                            location: location.to_string(),
                        });
                    }
                }
                continue;
            };

            match lookup(self.root, &target) {
                Some((value, canonical)) => {
                    let value = self.render_value(value, &canonical)?;
                    out.push_str(&to_text(&value));
                }
                None => match self.policy {
                    UndefinedPolicy::Preserve => out.push_str(whole.as_str()),
                    UndefinedPolicy::Strict => {
                        return Err(InterpolationError::Undefined {
                            expression: expression.to_string(),
                            location: location.to_string(),
                        });
                    }
                },
            }
        }

        out.push_str(&raw[last..]);
        Ok(out)
    }
}

/// Find the value at `target` along with its canonical location.
///
/// Numeric keys address list elements, so `hosts.0` and `hosts[0]` name the
/// same value.
fn lookup<'v>(root: &'v Value, target: &Location) -> Option<(&'v Value, Location)> {
    let mut current = root;
    let mut canonical = Vec::with_capacity(target.0.len());

    for step in &target.0 {
        current = match (current, step) {
            (Value::Object(map), Accessor::Key(key)) => {
                canonical.push(step.clone());
                map.get(key)?
            }
            (Value::Array(items), Accessor::Index(i)) => {
                canonical.push(Accessor::Index(*i));
                items.get(*i)?
            }
            (Value::Array(items), Accessor::Key(key)) => {
                let i: usize = key.parse().ok()?;
                canonical.push(Accessor::Index(i));
                items.get(i)?
            }
            _ => return None,
        };
    }

    Some((current, Location(canonical)))
}

/// Parse `a.b[0]['c.d']` into a location. `None` if it is not a plain path.
fn parse_expression(expression: &str) -> Option<Location> {
    let mut steps = Vec::new();
    let mut rest = expression;

    let ident_end = |s: &str| {
        s.find(|c: char| c.is_whitespace() || ".[]|+*/~(){}'\"".contains(c))
            .unwrap_or(s.len())
    };

    let end = ident_end(rest);
    if end == 0 {
        return None;
    }
    steps.push(Accessor::Key(rest[..end].to_string()));
    rest = &rest[end..];

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = ident_end(after);
            if end == 0 {
                return None;
            }
            steps.push(Accessor::Key(after[..end].to_string()));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']')?;
            let inner = after[..close].trim();
            let step = if let Some(quoted) = unquote(inner) {
                Accessor::Key(quoted.to_string())
            } else {
                Accessor::Index(inner.parse().ok()?)
            };
            steps.push(step);
            rest = &after[close + 1..];
        } else {
            return None;
        }
    }

    Some(Location(steps))
}

fn unquote(s: &str) -> Option<&str> {
    s.strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|r| r.strip_suffix('"')))
}

/// Text form of a rendered value.
fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
