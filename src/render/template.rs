//! Minimal component template renderer.
//!
//! Supported markup:
//!
//! | Syntax                       | Meaning                                        |
//! |------------------------------|------------------------------------------------|
//! | `{{ post.title }}`           | HTML-escaped value of a dotted data path       |
//! | `{{ 'text' }}`               | string literal                                 |
//! | `<Card title="x" :post="p">` | dependency component; `:` binds an expression  |
//! | `<slot>fallback</slot>`      | children passed by the parent                  |
//!
//! Everything else is copied through, HTML comments are dropped. A binding
//! that does not resolve is an error rather than an empty string.

use super::{InstanceSpec, RenderError, Renderer};
use crate::component::{RenderContext, parse_open_tag};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateRenderer;

/// A compiled component: default data plus a node tree whose child
/// components are already resolved.
#[derive(Debug)]
pub struct TemplateInstance {
    name: String,
    defaults: Map<String, Value>,
    nodes: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Text(String),
    Expr(String),
    Component {
        instance: Arc<TemplateInstance>,
        attrs: Vec<(String, Binding)>,
        children: Vec<Node>,
    },
    Slot(Vec<Node>),
}

#[derive(Debug)]
enum Binding {
    Literal(String),
    Expr(String),
    Flag,
}

impl Renderer for TemplateRenderer {
    type Instance = TemplateInstance;

    fn instantiate(&self, spec: InstanceSpec<'_, TemplateInstance>) -> Result<TemplateInstance, RenderError> {
        let defaults = match &spec.exports.render_props {
            Some(props) => match props.render_props(&RenderContext::default()) {
                Ok(Value::Object(map)) => map,
                Ok(Value::Null) => Map::new(),
                Ok(_) => {
                    return Err(RenderError::DataShape {
                        component: spec.name.to_owned(),
                    });
                }
                Err(source) => {
                    return Err(RenderError::Data {
                        component: spec.name.to_owned(),
                        source,
                    });
                }
            },
            None => Map::new(),
        };

        let nodes = Compiler {
            component: spec.name,
            dependencies: &spec.dependencies,
        }
        .compile(spec.template)?;

        Ok(TemplateInstance {
            name: spec.name.to_owned(),
            defaults,
            nodes,
        })
    }

    fn render(&self, instance: &TemplateInstance, data: &Value) -> Result<String, RenderError> {
        let mut scope = instance.defaults.clone();
        match data {
            Value::Object(map) => scope.extend(map.iter().map(|(k, v)| (k.clone(), v.clone()))),
            Value::Null => {}
            _ => {
                return Err(RenderError::DataShape {
                    component: instance.name.clone(),
                });
            }
        }

        let mut out = String::new();
        render_nodes(&instance.name, &instance.nodes, &scope, None, &mut out)?;
        Ok(out)
    }
}

// ============================================================================
// Compilation
// ============================================================================

struct Compiler<'a> {
    component: &'a str,
    dependencies: &'a FxHashMap<String, Arc<TemplateInstance>>,
}

/// An element whose closing tag has not been seen yet.
struct Open {
    tag: String,
    target: Option<Arc<TemplateInstance>>,
    attrs: Vec<(String, Binding)>,
    nodes: Vec<Node>,
}

impl Compiler<'_> {
    fn compile(&self, template: &str) -> Result<Vec<Node>, RenderError> {
        let mut root: Vec<Node> = Vec::new();
        let mut stack: Vec<Open> = Vec::new();
        let mut text = String::new();
        let mut pos = 0;

        while let Some(offset) = template[pos..].find('<') {
            let lt = pos + offset;
            text.push_str(&template[pos..lt]);
            let rest = &template[lt..];

            if rest.starts_with("<!--") {
                pos = rest.find("-->").map_or(template.len(), |end| lt + end + 3);
                continue;
            }

            if let Some(close) = rest.strip_prefix("</") {
                let end = close.find('>').map(|i| i + 1);
                let name = close[..end.map_or(0, |e| e - 1)].trim();
                if let Some(end) = end
                    && self.is_special(name)
                {
                    self.flush(&mut text, current(&mut root, &mut stack))?;
                    let open = stack.pop().filter(|open| open.tag == name).ok_or_else(|| {
                        RenderError::UnexpectedClose {
                            component: self.component.to_owned(),
                            tag: name.to_owned(),
                        }
                    })?;
                    let node = match open.target {
                        Some(instance) => Node::Component {
                            instance,
                            attrs: open.attrs,
                            children: open.nodes,
                        },
                        None => Node::Slot(open.nodes),
                    };
                    current(&mut root, &mut stack).push(node);
                    pos = lt + 2 + end;
                    continue;
                }
                text.push_str("</");
                pos = lt + 2;
                continue;
            }

            match parse_open_tag(template, lt) {
                Some(tag) if self.is_special(&tag.name) => {
                    self.flush(&mut text, current(&mut root, &mut stack))?;
                    let target = self.dependencies.get(&tag.name).cloned();
                    let attrs = tag
                        .attrs
                        .into_iter()
                        .map(|attr| match (attr.name.strip_prefix(':'), attr.value) {
                            (Some(name), Some(expr)) => (name.to_owned(), Binding::Expr(expr)),
                            (_, Some(value)) => (attr.name, Binding::Literal(value)),
                            (_, None) => (attr.name, Binding::Flag),
                        })
                        .collect();

                    let open = Open {
                        tag: tag.name,
                        target,
                        attrs,
                        nodes: Vec::new(),
                    };
                    if tag.self_closing {
                        let node = match open.target {
                            Some(instance) => Node::Component {
                                instance,
                                attrs: open.attrs,
                                children: Vec::new(),
                            },
                            None => Node::Slot(Vec::new()),
                        };
                        current(&mut root, &mut stack).push(node);
                    } else {
                        stack.push(open);
                    }
                    pos = tag.end;
                }
                Some(tag) => {
                    text.push_str(&template[lt..tag.end]);
                    pos = tag.end;
                }
                None => {
                    text.push('<');
                    pos = lt + 1;
                }
            }
        }
        text.push_str(&template[pos..]);
        self.flush(&mut text, current(&mut root, &mut stack))?;

        if let Some(open) = stack.pop() {
            return Err(RenderError::UnclosedTag {
                component: self.component.to_owned(),
                tag: open.tag,
            });
        }
        Ok(root)
    }

    fn is_special(&self, tag: &str) -> bool {
        tag == "slot" || self.dependencies.contains_key(tag)
    }

    /// Split buffered text into text and `{{ }}` nodes.
    fn flush(&self, text: &mut String, nodes: &mut Vec<Node>) -> Result<(), RenderError> {
        let mut rest = text.as_str();
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                nodes.push(Node::Text(rest[..open].to_owned()));
            }
            let close = rest[open..].find("}}").ok_or_else(|| RenderError::UnclosedInterpolation {
                component: self.component.to_owned(),
                offset: text.len() - rest.len() + open,
            })?;
            nodes.push(Node::Expr(rest[open + 2..open + close].trim().to_owned()));
            rest = &rest[open + close + 2..];
        }
        if !rest.is_empty() {
            nodes.push(Node::Text(rest.to_owned()));
        }
        text.clear();
        Ok(())
    }
}

fn current<'n>(root: &'n mut Vec<Node>, stack: &'n mut [Open]) -> &'n mut Vec<Node> {
    match stack.last_mut() {
        Some(open) => &mut open.nodes,
        None => root,
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Children handed to a component, rendered in the parent's scope.
type SlotContent<'a> = (&'a [Node], &'a Map<String, Value>, &'a str);

fn render_nodes(
    component: &str,
    nodes: &[Node],
    scope: &Map<String, Value>,
    slot: Option<SlotContent<'_>>,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Expr(expr) => {
                let value = evaluate(component, expr, scope)?;
                push_escaped(out, &value);
            }
            Node::Component {
                instance,
                attrs,
                children,
            } => {
                let mut child_scope = instance.defaults.clone();
                for (name, binding) in attrs {
                    let value = match binding {
                        Binding::Literal(text) => Value::String(text.clone()),
                        Binding::Expr(expr) => evaluate(component, expr, scope)?,
                        Binding::Flag => Value::Bool(true),
                    };
                    child_scope.insert(name.clone(), value);
                }
                render_nodes(
                    &instance.name,
                    &instance.nodes,
                    &child_scope,
                    Some((children, scope, component)),
                    out,
                )?;
            }
            Node::Slot(fallback) => match slot {
                Some((children, parent_scope, parent)) if !children.is_empty() => {
                    render_nodes(parent, children, parent_scope, None, out)?;
                }
                _ => render_nodes(component, fallback, scope, None, out)?,
            },
        }
    }
    Ok(())
}

fn evaluate(component: &str, expr: &str, scope: &Map<String, Value>) -> Result<Value, RenderError> {
    let unknown = || RenderError::UnknownBinding {
        component: component.to_owned(),
        expr: expr.to_owned(),
    };

    for quote in ['\'', '"', '`'] {
        if let Some(inner) = expr
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Ok(Value::String(inner.to_owned()));
        }
    }
    match expr {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(number) = expr.parse::<i64>() {
        return Ok(Value::from(number));
    }

    let mut segments = expr.split('.').map(str::trim);
    let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(unknown)?;
    let mut value = scope.get(first).ok_or_else(unknown)?;
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(unknown)?;
    }
    Ok(value.clone())
}

fn push_escaped(out: &mut String, value: &Value) {
    let text = match value {
        Value::Null => return,
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
