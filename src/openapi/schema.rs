//! JSON Schema helpers: local `$ref` resolution and example synthesis.

use serde_json::{Map, Value};

/// How many `$ref` hops [`resolve`] follows, and how deeply a synthesized
/// example may nest.
pub const MAX_REF_DEPTH: usize = 16;

/// Values one example may contain; past it, remaining members are `{}`.
pub const MAX_EXAMPLE_NODES: usize = 10_000;

/// Looks up a local reference such as `#/components/schemas/User`.
///
/// Only same-document references are supported. `~1` and `~0` escapes in
/// pointer segments are honored.
pub fn lookup_ref<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    document.pointer(pointer)
}

/// Follows `$ref` chains until a concrete value is reached.
///
/// Returns `None` for external or dangling references and when the chain is
/// longer than [`MAX_REF_DEPTH`].
pub fn resolve<'a>(document: &'a Value, value: &'a Value) -> Option<&'a Value> {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        match current.get("$ref").and_then(Value::as_str) {
            Some(reference) => current = lookup_ref(document, reference)?,
            None => return Some(current),
        }
    }
    log::warn!("Gave up resolving $ref chain after {} hops", MAX_REF_DEPTH);
    None
}

/// Synthesizes an example value from a schema.
///
/// Rules, first match wins: an explicit `example`; `object` recurses into
/// `properties`; `array` wraps one example of `items` (or is empty without
/// `items`); `string` uses the first `enum` entry or `"string"`; numbers are
/// `0`; booleans are `false`; anything else is `{}`.
///
/// A `$ref` to a schema that is already being expanded higher up yields
/// `{}`, as does anything past [`MAX_EXAMPLE_NODES`] values.
///
/// # Examples
///
/// ```
/// use rest_workbench::openapi::generate_example;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {
///         "name": {"type": "string"},
///         "tags": {"type": "array", "items": {"type": "string", "enum": ["a", "b"]}}
///     }
/// });
///
/// assert_eq!(
///     generate_example(&schema, &json!({})),
///     json!({"name": "string", "tags": ["a"]})
/// );
/// ```
pub fn generate_example(schema: &Value, document: &Value) -> Value {
    let mut synthesis = Synthesis {
        document,
        refs: Vec::new(),
        nodes: 0,
    };
    synthesis.example(schema, 0)
}

/// State of one [`generate_example`] call.
struct Synthesis<'a> {
    document: &'a Value,
    /// `$ref`s being expanded on the current path.
    refs: Vec<&'a str>,
    nodes: usize,
}

impl<'a> Synthesis<'a> {
    fn example(&mut self, schema: &'a Value, depth: usize) -> Value {
        self.nodes += 1;
        if depth > MAX_REF_DEPTH || self.nodes > MAX_EXAMPLE_NODES {
            return Value::Object(Map::new());
        }

        let entered = self.refs.len();
        let mut schema = schema;
        while let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            let target = match lookup_ref(self.document, reference) {
                Some(target) if !self.refs.contains(&reference) => target,
                _ => {
                    self.refs.truncate(entered);
                    return Value::Object(Map::new());
                }
            };
            self.refs.push(reference);
            schema = target;
        }

        let example = self.synthesize(schema, depth);
        self.refs.truncate(entered);
        example
    }

    fn synthesize(&mut self, schema: &'a Value, depth: usize) -> Value {
        if let Some(example) = schema.get("example") {
            return example.clone();
        }

        match schema.get("type").and_then(Value::as_str) {
            Some("object") => {
                let mut object = Map::new();
                if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                    for (name, property) in properties {
                        object.insert(name.clone(), self.example(property, depth + 1));
                    }
                }
                Value::Object(object)
            }
            Some("array") => match schema.get("items") {
                Some(items) => Value::Array(vec![self.example(items, depth + 1)]),
                None => Value::Array(Vec::new()),
            },
            _ => primitive_example(schema),
        }
    }
}

fn primitive_example(schema: &Value) -> Value {
    match schema.get("type").and_then(Value::as_str) {
        Some("string") => schema
            .get("enum")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_else(|| Value::String("string".to_string())),
        Some("number") | Some("integer") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        _ => Value::Object(Map::new()),
    }
}
