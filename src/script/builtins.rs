//! Built-in methods on strings, arrays and numbers.

use std::cell::RefCell;
use std::rc::Rc;

use super::interpreter::{
    check_array_length, check_length, range_error, type_error, Exec, Interpreter,
};
use super::value::{format_number, write_joined, Value, Walk};

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "lastIndexOf",
    "slice",
    "substring",
    "split",
    "replace",
    "replaceAll",
    "charAt",
    "at",
    "padStart",
    "padEnd",
    "repeat",
    "concat",
    "toString",
];

const ARRAY_METHODS: &[&str] = &[
    "push",
    "pop",
    "shift",
    "unshift",
    "includes",
    "indexOf",
    "join",
    "slice",
    "concat",
    "reverse",
    "map",
    "filter",
    "find",
    "findIndex",
    "forEach",
    "some",
    "every",
    "reduce",
    "at",
    "toString",
];

const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn string_arg(args: &[Value], index: usize, walk: &mut Walk) -> Exec<String> {
    Ok(arg(args, index).display(walk)?)
}

/// Clamps a relative index the way `slice` does.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn pad(s: &str, args: &[Value], at_start: bool, walk: &mut Walk) -> Exec<Value> {
    let target = arg(args, 0).to_number();
    let filler = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        other => other.display(walk)?,
    };
    let current = s.chars().count();
    if target.is_nan() || target <= current as f64 || filler.is_empty() {
        return Ok(Value::Str(s.to_string()));
    }
    check_length(target as usize)?;
    let padding: String = filler.chars().cycle().take(target as usize - current).collect();
    Ok(Value::Str(if at_start {
        padding + s
    } else {
        format!("{}{}", s, padding)
    }))
}

fn string_method(s: &str, name: &str, args: &[Value], walk: &mut Walk) -> Exec<Value> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let char_index = |needle: &str, from: usize| -> Option<usize> {
        let byte_start = s.char_indices().nth(from).map_or(s.len(), |(i, _)| i);
        s[byte_start..]
            .find(needle)
            .map(|found| s[..byte_start + found].chars().count())
    };

    Ok(match name {
        "toUpperCase" => Value::Str(s.to_uppercase()),
        "toLowerCase" => Value::Str(s.to_lowercase()),
        "trim" => Value::Str(s.trim().to_string()),
        "trimStart" => Value::Str(s.trim_start().to_string()),
        "trimEnd" => Value::Str(s.trim_end().to_string()),
        "includes" => Value::Bool(s.contains(&string_arg(args, 0, walk)?)),
        "startsWith" => Value::Bool(s.starts_with(&string_arg(args, 0, walk)?)),
        "endsWith" => Value::Bool(s.ends_with(&string_arg(args, 0, walk)?)),
        "indexOf" => {
            let from = relative_index(&arg(args, 1), len, 0);
            let needle = string_arg(args, 0, walk)?;
            Value::Number(char_index(&needle, from).map_or(-1.0, |i| i as f64))
        }
        "lastIndexOf" => {
            let needle = string_arg(args, 0, walk)?;
            Value::Number(
                s.rfind(&needle)
                    .map_or(-1.0, |i| s[..i].chars().count() as f64),
            )
        }
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            Value::Str(chars[start..end.max(start)].iter().collect())
        }
        "substring" => {
            let clamp = |v: Value, default: usize| {
                if matches!(v, Value::Undefined) {
                    return default;
                }
                let n = v.to_number();
                if n.is_nan() {
                    0
                } else {
                    n.max(0.0).min(len as f64) as usize
                }
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), len);
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::Str(chars[start..end].iter().collect())
        }
        "split" => match arg(args, 0) {
            Value::Undefined => Value::array(vec![Value::Str(s.to_string())]),
            separator => {
                let separator = separator.display(walk)?;
                let count = if separator.is_empty() {
                    len
                } else {
                    s.matches(separator.as_str()).count() + 1
                };
                check_array_length(count)?;
                let parts: Vec<Value> = if separator.is_empty() {
                    chars.iter().map(|c| Value::Str(c.to_string())).collect()
                } else {
                    s.split(separator.as_str())
                        .map(|part| Value::Str(part.to_string()))
                        .collect()
                };
                Value::array(parts)
            }
        },
        "replace" => {
            let needle = string_arg(args, 0, walk)?;
            let replacement = string_arg(args, 1, walk)?;
            let replaced = s.replacen(&needle, &replacement, 1);
            check_length(replaced.len())?;
            Value::Str(replaced)
        }
        "replaceAll" => {
            let needle = string_arg(args, 0, walk)?;
            if needle.is_empty() {
                return Err(type_error("replaceAll with an empty pattern is not supported"));
            }
            let replacement = string_arg(args, 1, walk)?;
            let replaced = s.replace(&needle, &replacement);
            check_length(replaced.len())?;
            Value::Str(replaced)
        }
        "charAt" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index.trunc() };
            Value::Str(
                (index >= 0.0)
                    .then(|| chars.get(index as usize))
                    .flatten()
                    .map_or(String::new(), |c| c.to_string()),
            )
        }
        "at" => {
            let index = arg(args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index.trunc() };
            let index = if index < 0.0 { len as f64 + index } else { index };
            (index >= 0.0)
                .then(|| chars.get(index as usize))
                .flatten()
                .map_or(Value::Undefined, |c| Value::Str(c.to_string()))
        }
        "padStart" => return pad(s, args, true, walk),
        "padEnd" => return pad(s, args, false, walk),
        "repeat" => {
            let count = arg(args, 0).to_number();
            if count < 0.0 || count.is_infinite() {
                return Err(range_error(format!("Invalid count value: {}", format_number(count))));
            }
            let count = if count.is_nan() { 0 } else { count as usize };
            check_length(s.len().saturating_mul(count))?;
            Value::Str(s.repeat(count))
        }
        "concat" => {
            let mut out = s.to_string();
            for value in args {
                out.push_str(&value.display(walk)?);
                check_length(out.len())?;
            }
            check_length(out.len())?;
            Value::Str(out)
        }
        _ => Value::Str(s.to_string()),
    })
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Exec<Value> {
    match name {
        "toFixed" => {
            let digits = match arg(args, 0) {
                Value::Undefined => 0.0,
                other => other.to_number(),
            };
            if !(0.0..=100.0).contains(&digits) {
                return Err(range_error("toFixed() digits argument must be between 0 and 100"));
            }
            if !n.is_finite() {
                return Ok(Value::Str(format_number(n)));
            }
            Ok(Value::Str(format!("{:.*}", digits as usize, n)))
        }
        _ => match arg(args, 0) {
            Value::Undefined => Ok(Value::Str(format_number(n))),
            radix => {
                let radix = radix.to_number();
                if !(2.0..=36.0).contains(&radix) {
                    return Err(range_error("toString() radix must be between 2 and 36"));
                }
                if radix == 10.0 || n.fract() != 0.0 || !n.is_finite() {
                    return Ok(Value::Str(format_number(n)));
                }
                Ok(Value::Str(to_radix(n as i64, radix as u32)))
            }
        },
    }
}

fn to_radix(n: i64, radix: u32) -> String {
    let mut magnitude = n.unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % u64::from(radix)) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        magnitude /= u64::from(radix);
    }
    if n < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

impl Interpreter {
    pub(super) fn has_builtin_method(&self, target: &Value, name: &str) -> bool {
        match target {
            Value::Str(_) => STRING_METHODS.contains(&name),
            Value::Array(_) => ARRAY_METHODS.contains(&name),
            Value::Number(_) => NUMBER_METHODS.contains(&name),
            _ => false,
        }
    }

    pub(super) fn call_builtin_method(
        &mut self,
        target: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> Exec<Value> {
        match target {
            Value::Str(s) => {
                let mut walk = Walk::default();
                walk.record(0, s.len());
                let result = string_method(s, name, &args, &mut walk);
                self.charge_walk(&walk)?;
                let result = result?;
                match &result {
                    Value::Str(out) => self.charge_bytes(out.len())?,
                    Value::Array(parts) => self.charge_elements(parts.borrow().len())?,
                    _ => {}
                }
                Ok(result)
            }
            Value::Number(n) => number_method(*n, name, &args),
            Value::Array(_) => self.array_method(target, name, args),
            _ => Err(type_error(format!("{} is not a function", name))),
        }
    }

    fn callback(&self, args: &[Value], method: &str) -> Exec<Value> {
        let callback = arg(args, 0);
        if !callback.is_callable() {
            return Err(type_error(format!(
                "{} is not a function (in Array.prototype.{})",
                callback.type_of(),
                method
            )));
        }
        Ok(callback)
    }

    /// Copy of the array that callbacks iterate; they may mutate the original.
    fn snapshot(&mut self, items: &Rc<RefCell<Vec<Value>>>) -> Exec<Vec<Value>> {
        let len = items.borrow().len();
        self.charge_elements(len)?;
        Ok(items.borrow().clone())
    }

    fn array_method(&mut self, target: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
        let Value::Array(items) = target else {
            return Ok(Value::Undefined);
        };
        match name {
            "push" => {
                let len = items.borrow().len() + args.len();
                check_array_length(len)?;
                self.charge_elements(args.len())?;
                items.borrow_mut().extend(args);
                Ok(Value::Number(len as f64))
            }
            "pop" => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
            "shift" => {
                let len = items.borrow().len();
                self.charge_elements(len)?;
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    Ok(Value::Undefined)
                } else {
                    Ok(items.remove(0))
                }
            }
            "unshift" => {
                let len = items.borrow().len() + args.len();
                check_array_length(len)?;
                self.charge_elements(len)?;
                let mut items = items.borrow_mut();
                let rest = std::mem::take(&mut *items);
                items.extend(args);
                items.extend(rest);
                Ok(Value::Number(len as f64))
            }
            "includes" => {
                let len = items.borrow().len();
                self.charge_elements(len)?;
                let needle = arg(&args, 0);
                Ok(Value::Bool(items.borrow().iter().any(|item| {
                    item.strict_equals(&needle)
                        || matches!((item, &needle), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
                })))
            }
            "indexOf" => {
                let len = items.borrow().len();
                self.charge_elements(len)?;
                let needle = arg(&args, 0);
                Ok(Value::Number(
                    items
                        .borrow()
                        .iter()
                        .position(|item| item.strict_equals(&needle))
                        .map_or(-1.0, |i| i as f64),
                ))
            }
            "join" | "toString" => {
                let separator = match arg(&args, 0) {
                    Value::Undefined => ",".to_string(),
                    other if name == "join" => self.display(&other)?,
                    _ => ",".to_string(),
                };
                let mut walk = Walk::default();
                let mut joined = String::new();
                let result = write_joined(&items.borrow(), &separator, &mut joined, &mut walk);
                self.charge_walk(&walk)?;
                result?;
                check_length(joined.len())?;
                Ok(Value::Str(joined))
            }
            "slice" => {
                let items = items.borrow();
                let len = items.len();
                let start = relative_index(&arg(&args, 0), len, 0);
                let end = relative_index(&arg(&args, 1), len, len);
                let slice = items[start..end.max(start)].to_vec();
                drop(items);
                self.charge_elements(slice.len())?;
                Ok(Value::array(slice))
            }
            "concat" => {
                let total = args.iter().fold(items.borrow().len(), |total, value| {
                    total.saturating_add(match value {
                        Value::Array(other) => other.borrow().len(),
                        _ => 1,
                    })
                });
                check_array_length(total)?;
                let mut out = self.snapshot(items)?;
                self.charge_elements(total - out.len())?;
                for value in args {
                    match value {
                        Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                        other => out.push(other),
                    }
                }
                Ok(Value::array(out))
            }
            "reverse" => {
                let len = items.borrow().len();
                self.charge_elements(len)?;
                items.borrow_mut().reverse();
                Ok(target.clone())
            }
            "at" => {
                let items = items.borrow();
                let index = arg(&args, 0).to_number();
                let index = if index.is_nan() { 0.0 } else { index.trunc() };
                let index = if index < 0.0 {
                    items.len() as f64 + index
                } else {
                    index
                };
                Ok((index >= 0.0)
                    .then(|| items.get(index as usize).cloned())
                    .flatten()
                    .unwrap_or(Value::Undefined))
            }
            "map" => {
                let callback = self.callback(&args, name)?;
                let mut out = Vec::new();
                for (index, item) in self.snapshot(items)?.into_iter().enumerate() {
                    self.tick()?;
                    out.push(self.call(
                        &callback,
                        vec![item, Value::Number(index as f64), target.clone()],
                    )?);
                }
                Ok(Value::array(out))
            }
            "filter" => {
                let callback = self.callback(&args, name)?;
                let mut out = Vec::new();
                for (index, item) in self.snapshot(items)?.into_iter().enumerate() {
                    self.tick()?;
                    let keep = self.call(
                        &callback,
                        vec![item.clone(), Value::Number(index as f64), target.clone()],
                    )?;
                    if keep.truthy() {
                        out.push(item);
                    }
                }
                Ok(Value::array(out))
            }
            "forEach" => {
                let callback = self.callback(&args, name)?;
                for (index, item) in self.snapshot(items)?.into_iter().enumerate() {
                    self.tick()?;
                    self.call(
                        &callback,
                        vec![item, Value::Number(index as f64), target.clone()],
                    )?;
                }
                Ok(Value::Undefined)
            }
            "find" | "findIndex" | "some" | "every" => {
                let callback = self.callback(&args, name)?;
                for (index, item) in self.snapshot(items)?.into_iter().enumerate() {
                    self.tick()?;
                    let hit = self
                        .call(
                            &callback,
                            vec![item.clone(), Value::Number(index as f64), target.clone()],
                        )?
                        .truthy();
                    match (name, hit) {
                        ("find", true) => return Ok(item),
                        ("findIndex", true) => return Ok(Value::Number(index as f64)),
                        ("some", true) => return Ok(Value::Bool(true)),
                        ("every", false) => return Ok(Value::Bool(false)),
                        _ => {}
                    }
                }
                Ok(match name {
                    "find" => Value::Undefined,
                    "findIndex" => Value::Number(-1.0),
                    "some" => Value::Bool(false),
                    _ => Value::Bool(true),
                })
            }
            "reduce" => {
                let callback = self.callback(&args, name)?;
                let mut values = self.snapshot(items)?.into_iter().enumerate();
                let mut accumulator = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match values.next() {
                        Some((_, first)) => first,
                        None => {
                            return Err(type_error("Reduce of empty array with no initial value"))
                        }
                    },
                };
                for (index, item) in values {
                    self.tick()?;
                    accumulator = self.call(
                        &callback,
                        vec![
                            accumulator,
                            item,
                            Value::Number(index as f64),
                            target.clone(),
                        ],
                    )?;
                }
                Ok(accumulator)
            }
            _ => Err(type_error(format!("{} is not a function", name))),
        }
    }
}
