//! Runtime values of the script interpreter.

use super::ast::Function;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Longest string a script may build, in bytes.
pub(crate) const MAX_STRING_LENGTH: usize = 1 << 24;
/// Most values a single conversion may visit.
const MAX_CONVERSION_NODES: usize = 1 << 20;
/// Deepest nesting a conversion follows.
const MAX_CONVERSION_DEPTH: usize = 256;

/// Why converting a nested value to text or JSON failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionError {
    Circular,
    TooLarge,
    TooDeep,
}

/// Bookkeeping for conversions of nested values: the containers on the
/// current path, and how much work has been done so far.
///
/// Shared values are visited once per path they are reached by, so the node
/// count is what bounds the work, not the number of distinct containers.
#[derive(Debug, Default)]
pub struct Walk {
    path: HashSet<*const ()>,
    nodes: usize,
    bytes: usize,
    recorded_nodes: usize,
    recorded_bytes: usize,
}

impl Walk {
    /// Values visited plus recorded work.
    pub fn nodes(&self) -> usize {
        self.nodes.saturating_add(self.recorded_nodes)
    }

    /// Bytes produced plus recorded work.
    pub fn bytes(&self) -> usize {
        self.bytes.saturating_add(self.recorded_bytes)
    }

    /// Records work done outside a conversion, such as copying a response.
    pub fn record(&mut self, nodes: usize, bytes: usize) {
        self.recorded_nodes = self.recorded_nodes.saturating_add(nodes);
        self.recorded_bytes = self.recorded_bytes.saturating_add(bytes);
    }

    fn visit(&mut self) -> Result<(), ConversionError> {
        self.nodes += 1;
        if self.nodes > MAX_CONVERSION_NODES {
            return Err(ConversionError::TooLarge);
        }
        Ok(())
    }

    fn produce(&mut self, len: usize) -> Result<(), ConversionError> {
        self.bytes = self.bytes.saturating_add(len);
        if self.bytes > MAX_STRING_LENGTH {
            return Err(ConversionError::TooLarge);
        }
        Ok(())
    }

    /// Puts a container on the current path; `false` if it is already there.
    fn enter(&mut self, container: *const ()) -> Result<bool, ConversionError> {
        if self.path.len() >= MAX_CONVERSION_DEPTH {
            return Err(ConversionError::TooDeep);
        }
        Ok(self.path.insert(container))
    }

    fn leave(&mut self, container: *const ()) {
        self.path.remove(&container);
    }
}

/// Host functions reachable through `pm` and `console`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFn {
    ConsoleLog,
    ConsoleInfo,
    ConsoleWarn,
    ConsoleError,
    EnvironmentGet,
    EnvironmentSet,
    EnvironmentUnset,
    ResponseJson,
    ResponseText,
    HeadersGet,
}

/// Insertion-ordered property bag.
#[derive(Debug, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }
}

/// A function value together with the scope it closes over.
#[derive(Debug)]
pub struct Closure {
    pub function: Rc<Function>,
    pub scope: usize,
}

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Closure>),
    Host(HostFn),
}

impl Value {
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Host(_))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Host(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else if let Some(hex) = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                {
                    u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64)
                } else {
                    match trimmed {
                        "Infinity" | "+Infinity" => f64::INFINITY,
                        "-Infinity" => f64::NEG_INFINITY,
                        // Rust accepts "inf" and "nan", which are not numbers here
                        t if t.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') => {
                            f64::NAN
                        }
                        t => t.parse().unwrap_or(f64::NAN),
                    }
                }
            }
            Value::Array(items) => array_to_number(items),
            Value::Object(_) | Value::Function(_) | Value::Host(_) => f64::NAN,
        }
    }

    /// String conversion as done by concatenation and template literals.
    ///
    /// An array reached again while it is being converted renders as an
    /// empty string, like `Array.prototype.join`.
    pub fn display(&self, walk: &mut Walk) -> Result<String, ConversionError> {
        let mut out = String::new();
        self.write_display(&mut out, walk)?;
        Ok(out)
    }

    /// [`display`](Self::display) for messages; a failed conversion gives
    /// an empty string.
    pub fn to_display(&self) -> String {
        self.display(&mut Walk::default()).unwrap_or_default()
    }

    fn write_display(&self, out: &mut String, walk: &mut Walk) -> Result<(), ConversionError> {
        walk.visit()?;
        match self {
            Value::Str(s) => {
                walk.produce(s.len())?;
                out.push_str(s);
                Ok(())
            }
            Value::Array(items) => {
                let container = Rc::as_ptr(items) as *const ();
                if !walk.enter(container)? {
                    return Ok(());
                }
                let result = write_joined(&items.borrow(), ",", out, walk);
                walk.leave(container);
                result
            }
            other => {
                let text = match other {
                    Value::Undefined => "undefined".to_string(),
                    Value::Null => "null".to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => format_number(*n),
                    Value::Object(_) => "[object Object]".to_string(),
                    _ => "function () { [native code] }".to_string(),
                };
                walk.produce(text.len())?;
                out.push_str(&text);
                Ok(())
            }
        }
    }

    /// Conversion used by `console.*` and `pm.environment.set`: arrays and
    /// objects as compact JSON, everything else as its display string.
    pub fn log_string(&self, walk: &mut Walk) -> Result<String, ConversionError> {
        match self {
            Value::Array(_) | Value::Object(_) => {
                let text = serde_json::to_string(&self.to_json(walk)?).unwrap_or_default();
                if text.len() > MAX_STRING_LENGTH {
                    return Err(ConversionError::TooLarge);
                }
                Ok(text)
            }
            other => other.display(walk),
        }
    }

    /// [`log_string`](Self::log_string) falling back to the display string.
    pub fn to_log_string(&self) -> String {
        self.log_string(&mut Walk::default())
            .unwrap_or_else(|_| self.to_display())
    }

    /// Converts to JSON following `JSON.stringify` rules: functions and
    /// `undefined` members are dropped, non-finite numbers become `null`,
    /// and a container that contains itself is an error.
    pub fn to_json(&self, walk: &mut Walk) -> Result<serde_json::Value, ConversionError> {
        walk.visit()?;
        Ok(match self {
            Value::Undefined | Value::Null | Value::Function(_) | Value::Host(_) => {
                serde_json::Value::Null
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => {
                walk.produce(s.len())?;
                serde_json::Value::String(s.clone())
            }
            Value::Array(items) => {
                let container = Rc::as_ptr(items) as *const ();
                if !walk.enter(container)? {
                    return Err(ConversionError::Circular);
                }
                let result: Result<Vec<_>, _> =
                    items.borrow().iter().map(|item| item.to_json(walk)).collect();
                walk.leave(container);
                serde_json::Value::Array(result?)
            }
            Value::Object(object) => {
                let container = Rc::as_ptr(object) as *const ();
                if !walk.enter(container)? {
                    return Err(ConversionError::Circular);
                }
                let result = object_to_json(&object.borrow(), walk);
                walk.leave(container);
                serde_json::Value::Object(result?)
            }
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut object = Object::default();
                for (key, value) in map {
                    object.set(key.clone(), Value::from_json(value));
                }
                Value::object(object)
            }
        }
    }

    /// `===` semantics.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => a == b,
            _ => false,
        }
    }

    /// `==` semantics for the primitive cases scripts actually hit.
    pub fn loose_equals(&self, other: &Value, walk: &mut Walk) -> Result<bool, ConversionError> {
        Ok(match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Array(_) | Value::Object(_), Value::Str(_) | Value::Number(_)) => {
                Value::Str(self.display(walk)?).loose_equals(other, walk)?
            }
            (Value::Str(_) | Value::Number(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_equals(&Value::Str(other.display(walk)?), walk)?
            }
            _ => self.strict_equals(other),
        })
    }
}

/// Joins array items the way `Array.prototype.join` does: `null` and
/// `undefined` become empty strings.
pub fn write_joined(
    items: &[Value],
    separator: &str,
    out: &mut String,
    walk: &mut Walk,
) -> Result<(), ConversionError> {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            walk.produce(separator.len())?;
            out.push_str(separator);
        }
        if item.is_nullish() {
            walk.visit()?;
        } else {
            item.write_display(out, walk)?;
        }
    }
    Ok(())
}

fn object_to_json(
    object: &Object,
    walk: &mut Walk,
) -> Result<serde_json::Map<String, serde_json::Value>, ConversionError> {
    let mut map = serde_json::Map::new();
    for (key, value) in object.entries() {
        if matches!(value, Value::Undefined | Value::Function(_) | Value::Host(_)) {
            continue;
        }
        walk.produce(key.len())?;
        map.insert(key.clone(), value.to_json(walk)?);
    }
    Ok(map)
}

/// An array converts to a number through its joined string: empty and
/// single-`null` arrays give 0, several elements always give `NaN`.
fn array_to_number(items: &Rc<RefCell<Vec<Value>>>) -> f64 {
    let mut seen = HashSet::new();
    let mut current = Rc::clone(items);
    loop {
        if !seen.insert(Rc::as_ptr(&current)) {
            // joining a cycle gives ""
            return 0.0;
        }
        let only = {
            let inner = current.borrow();
            match inner.len() {
                0 => return 0.0,
                1 => inner[0].clone(),
                _ => return f64::NAN,
            }
        };
        match only {
            Value::Array(next) => current = next,
            Value::Undefined | Value::Null => return 0.0,
            other => return Value::Str(other.to_display()).to_number(),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Formats a number the way scripts expect: integers without a fraction,
/// `NaN` and `Infinity` spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Str(String::new()).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(!Value::Null.truthy());
        assert!(Value::array(Vec::new()).truthy());
        assert!(Value::Str("0".to_string()).truthy());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::Str(" 42 ".to_string()).to_number(), 42.0);
        assert_eq!(Value::Str("".to_string()).to_number(), 0.0);
        assert!(Value::Str("abc".to_string()).to_number().is_nan());
        assert!(Value::Str("inf".to_string()).to_number().is_nan());
        assert_eq!(Value::Str("1e3".to_string()).to_number(), 1000.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let source = json!({"z": 1, "a": [true, null, "x"], "m": {"k": 1.5}});
        let value = Value::from_json(&source);
        assert_eq!(value.to_json(&mut Walk::default()).unwrap(), source);
        assert_eq!(
            value.to_log_string(),
            r#"{"z":1,"a":[true,null,"x"],"m":{"k":1.5}}"#
        );
    }

    #[test]
    fn test_to_json_drops_undefined_members() {
        let mut object = Object::default();
        object.set("a", Value::Undefined);
        object.set("b", Value::Host(HostFn::ConsoleLog));
        object.set("c", Value::Number(f64::NAN));
        assert_eq!(
            Value::object(object).to_json(&mut Walk::default()).unwrap(),
            json!({"c": null})
        );
    }

    #[test]
    fn test_equality() {
        let loose = |a: &Value, b: &Value| a.loose_equals(b, &mut Walk::default()).unwrap();
        let one = Value::Number(1.0);
        assert!(loose(&one, &Value::Str("1".to_string())));
        assert!(!one.strict_equals(&Value::Str("1".to_string())));
        assert!(loose(&Value::Null, &Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(!loose(&Value::Null, &Value::Number(0.0)));
        assert!(loose(&Value::array(vec![Value::Number(1.0)]), &one));

        let array = Value::array(vec![]);
        assert!(array.strict_equals(&array.clone()));
        assert!(!array.strict_equals(&Value::array(vec![])));
    }

    #[test]
    fn test_display() {
        let array = Value::array(vec![Value::Number(1.0), Value::Null, Value::Str("a".into())]);
        assert_eq!(array.to_display(), "1,,a");
        assert_eq!(Value::object(Object::default()).to_display(), "[object Object]");
        assert_eq!(Value::Undefined.to_display(), "undefined");
    }

    fn self_containing_array() -> Value {
        let array = Value::array(vec![Value::Number(1.0)]);
        if let Value::Array(items) = &array {
            items.borrow_mut().push(array.clone());
        }
        array
    }

    #[test]
    fn test_cyclic_array_displays_empty_member() {
        let array = self_containing_array();
        assert_eq!(array.to_display(), "1,");
        assert_eq!(
            array.display(&mut Walk::default()),
            Ok("1,".to_string())
        );
    }

    #[test]
    fn test_cyclic_values_are_not_json() {
        let array = self_containing_array();
        assert_eq!(
            array.to_json(&mut Walk::default()),
            Err(ConversionError::Circular)
        );

        let object = Value::object(Object::default());
        if let Value::Object(inner) = &object {
            inner.borrow_mut().set("me", object.clone());
        }
        assert_eq!(
            object.log_string(&mut Walk::default()),
            Err(ConversionError::Circular)
        );
        assert_eq!(object.to_log_string(), "[object Object]");
    }

    #[test]
    fn test_shared_members_are_not_cycles() {
        let shared = Value::array(vec![Value::Number(1.0)]);
        let outer = Value::array(vec![shared.clone(), shared]);
        assert_eq!(outer.to_log_string(), "[[1],[1]]");
        assert_eq!(outer.to_display(), "1,1");
    }

    #[test]
    fn test_fan_out_conversion_is_bounded() {
        // each level holds the previous one three times: 3^30 paths
        let mut value = Value::array(Vec::new());
        for _ in 0..30 {
            value = Value::array(vec![value.clone(), value.clone(), value]);
        }
        let mut walk = Walk::default();
        assert_eq!(value.to_json(&mut walk), Err(ConversionError::TooLarge));
        assert!(walk.nodes() <= MAX_CONVERSION_NODES + 1);

        let mut walk = Walk::default();
        assert_eq!(value.display(&mut walk), Err(ConversionError::TooLarge));
        assert_eq!(value.to_display(), "");
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let mut value = Value::Null;
        for _ in 0..(MAX_CONVERSION_DEPTH + 10) {
            value = Value::array(vec![value]);
        }
        assert_eq!(
            value.to_json(&mut Walk::default()),
            Err(ConversionError::TooDeep)
        );
    }

    #[test]
    fn test_array_to_number() {
        assert_eq!(Value::array(vec![]).to_number(), 0.0);
        assert_eq!(Value::array(vec![Value::Str(" 7 ".into())]).to_number(), 7.0);
        assert_eq!(Value::array(vec![Value::Undefined]).to_number(), 0.0);
        assert!(Value::array(vec![Value::Bool(true)]).to_number().is_nan());
        assert!(Value::array(vec![Value::Null, Value::Null]).to_number().is_nan());

        let cyclic = Value::array(Vec::new());
        if let Value::Array(items) = &cyclic {
            items.borrow_mut().push(cyclic.clone());
        }
        assert_eq!(cyclic.to_number(), 0.0);
    }
}
