//! Tree-walking evaluator.
//!
//! Every statement and expression costs one step. The interpreter aborts
//! with [`ScriptError::StepBudgetExceeded`] once the budget is spent and
//! checks the wall clock every [`CLOCK_CHECK_INTERVAL`] steps. Neither abort
//! can be caught by the script's own `try`/`catch`.
//!
//! Work that is not a single evaluation step is charged as extra steps:
//! one per [`BYTES_PER_STEP`] bytes of string produced or scanned, and one
//! per [`ELEMENTS_PER_STEP`] array elements copied or values converted.

use super::ast::*;
use super::host::Host;
use super::value::{
    format_number, Closure, ConversionError, Object, Value, Walk, MAX_STRING_LENGTH,
};
use super::{ScriptError, ScriptLimits};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

const CLOCK_CHECK_INTERVAL: u64 = 256;
const MAX_CALL_DEPTH: usize = 128;
const MAX_ARRAY_GROWTH: usize = 1 << 20;
/// Longest array a script may build.
pub(crate) const MAX_ARRAY_LENGTH: usize = 1 << 22;
const BYTES_PER_STEP: usize = 1024;
const ELEMENTS_PER_STEP: usize = 32;

/// Non-local exit from evaluation.
#[derive(Debug)]
pub enum Interrupt {
    /// A script-level exception; `try`/`catch` can handle it.
    Throw(Value),
    /// A limit was hit; unwinds to the top.
    Fatal(ScriptError),
}

pub type Exec<T> = Result<T, Interrupt>;

enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Builds an `{ name, message }` error object the way built-in errors look.
pub fn error_value(name: &str, message: impl Into<String>) -> Value {
    let mut object = Object::default();
    object.set("name", Value::Str(name.to_string()));
    object.set("message", Value::Str(message.into()));
    Value::object(object)
}

pub fn type_error(message: impl Into<String>) -> Interrupt {
    Interrupt::Throw(error_value("TypeError", message))
}

pub fn range_error(message: impl Into<String>) -> Interrupt {
    Interrupt::Throw(error_value("RangeError", message))
}

impl From<ConversionError> for Interrupt {
    fn from(error: ConversionError) -> Self {
        match error {
            ConversionError::Circular => type_error("Converting circular structure to JSON"),
            ConversionError::TooLarge => range_error("Invalid string length"),
            ConversionError::TooDeep => range_error("Maximum call stack size exceeded"),
        }
    }
}

fn reference_error(name: &str) -> Interrupt {
    Interrupt::Throw(error_value(
        "ReferenceError",
        format!("{} is not defined", name),
    ))
}

/// Converts an uncaught exception into the error reported to the caller.
pub fn uncaught(value: &Value) -> ScriptError {
    if let Value::Object(object) = value {
        let object = object.borrow();
        if let (Some(Value::Str(name)), Some(message)) = (object.get("name"), object.get("message"))
        {
            let message = message.to_display();
            return match name.as_str() {
                "ReferenceError" => ScriptError::Reference(message),
                "TypeError" => ScriptError::Type(message),
                _ => ScriptError::Thrown(format!("{}: {}", name, message)),
            };
        }
    }
    ScriptError::Thrown(value.to_log_string())
}

struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Default)]
struct Scope {
    vars: HashMap<String, Binding>,
    parent: Option<usize>,
}

enum Reference {
    Variable(String),
    Property(Value, String),
}

pub struct Interpreter {
    scopes: Vec<Scope>,
    pub(super) host: Host,
    steps: u64,
    step_budget: u64,
    timeout_ms: u64,
    deadline: Instant,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(host: Host, limits: &ScriptLimits) -> Self {
        let mut global = Scope::default();
        for (name, value) in host.globals() {
            global.vars.insert(
                name.to_string(),
                Binding {
                    value,
                    mutable: false,
                },
            );
        }
        Self {
            scopes: vec![global],
            host,
            steps: 0,
            step_budget: limits.step_budget,
            timeout_ms: limits.timeout.as_millis() as u64,
            deadline: Instant::now() + limits.timeout,
            call_depth: 0,
        }
    }

    /// Runs a parsed program in a fresh scope below the globals.
    pub fn run(&mut self, program: &[Stmt]) -> Result<(), ScriptError> {
        let scope = self.new_scope(0);
        match self.exec_block(program, scope) {
            Ok(_) => Ok(()),
            Err(Interrupt::Throw(value)) => Err(uncaught(&value)),
            Err(Interrupt::Fatal(error)) => Err(error),
        }
    }

    pub fn into_host(self) -> Host {
        self.host
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub(super) fn tick(&mut self) -> Exec<()> {
        self.steps += 1;
        if self.steps > self.step_budget {
            return Err(Interrupt::Fatal(ScriptError::StepBudgetExceeded(
                self.step_budget,
            )));
        }
        if self.steps % CLOCK_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(Interrupt::Fatal(ScriptError::Timeout(self.timeout_ms)));
        }
        Ok(())
    }

    /// Adds `steps` for work done outside a single evaluation step.
    pub(super) fn charge(&mut self, steps: usize) -> Exec<()> {
        if steps == 0 {
            return Ok(());
        }
        self.steps = self.steps.saturating_add(steps as u64);
        if self.steps > self.step_budget {
            return Err(Interrupt::Fatal(ScriptError::StepBudgetExceeded(
                self.step_budget,
            )));
        }
        if Instant::now() >= self.deadline {
            return Err(Interrupt::Fatal(ScriptError::Timeout(self.timeout_ms)));
        }
        Ok(())
    }

    pub(super) fn charge_bytes(&mut self, len: usize) -> Exec<()> {
        self.charge(len / BYTES_PER_STEP)
    }

    pub(super) fn charge_elements(&mut self, count: usize) -> Exec<()> {
        self.charge(count / ELEMENTS_PER_STEP)
    }

    pub(super) fn charge_walk(&mut self, walk: &Walk) -> Exec<()> {
        self.charge(walk.nodes() / ELEMENTS_PER_STEP + walk.bytes() / BYTES_PER_STEP)
    }

    /// Display string of `value`, paid for in steps.
    pub(super) fn display(&mut self, value: &Value) -> Exec<String> {
        let mut walk = Walk::default();
        let result = value.display(&mut walk);
        self.charge_walk(&walk)?;
        Ok(result?)
    }

    // Scopes

    fn new_scope(&mut self, parent: usize) -> usize {
        self.scopes.push(Scope {
            vars: HashMap::new(),
            parent: Some(parent),
        });
        self.scopes.len() - 1
    }

    fn declare(&mut self, scope: usize, name: &str, value: Value, mutable: bool) -> Exec<()> {
        let vars = &mut self.scopes[scope].vars;
        if let Some(existing) = vars.get(name) {
            if !existing.mutable {
                return Err(type_error(format!(
                    "Identifier '{}' has already been declared",
                    name
                )));
            }
        }
        vars.insert(name.to_string(), Binding { value, mutable });
        Ok(())
    }

    fn find_scope(&self, mut scope: usize, name: &str) -> Option<usize> {
        loop {
            if self.scopes[scope].vars.contains_key(name) {
                return Some(scope);
            }
            scope = self.scopes[scope].parent?;
        }
    }

    fn lookup(&self, scope: usize, name: &str) -> Exec<Value> {
        self.find_scope(scope, name)
            .and_then(|s| self.scopes[s].vars.get(name))
            .map(|binding| binding.value.clone())
            .ok_or_else(|| reference_error(name))
    }

    fn assign_variable(&mut self, scope: usize, name: &str, value: Value) -> Exec<()> {
        let owner = self.find_scope(scope, name).ok_or_else(|| reference_error(name))?;
        match self.scopes[owner].vars.get_mut(name) {
            Some(binding) if binding.mutable => {
                binding.value = value;
                Ok(())
            }
            Some(_) => Err(type_error("Assignment to constant variable.")),
            None => Err(reference_error(name)),
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        mutable: bool,
        scope: usize,
    ) -> Exec<()> {
        match pattern {
            Pattern::Name(name) => self.declare(scope, name, value, mutable),
            Pattern::Object(entries) => {
                if value.is_nullish() {
                    return Err(type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_display(),
                        value.to_display()
                    )));
                }
                for (key, binding) in entries {
                    let property = self.get_property(&value, key)?;
                    self.declare(scope, binding, property, mutable)?;
                }
                Ok(())
            }
            Pattern::Array(elements) => {
                let items = self.iterate(&value)?;
                for (index, name) in elements.iter().enumerate() {
                    if let Some(name) = name {
                        let item = items.get(index).cloned().unwrap_or(Value::Undefined);
                        self.declare(scope, name, item, mutable)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Snapshot of the values a `for-of` loop or array pattern walks.
    fn iterate(&mut self, value: &Value) -> Exec<Vec<Value>> {
        match value {
            Value::Array(items) => {
                let len = items.borrow().len();
                self.charge_elements(len)?;
                Ok(items.borrow().clone())
            }
            Value::Str(s) => {
                let len = s.chars().count();
                check_array_length(len)?;
                self.charge_elements(len)?;
                Ok(s.chars().map(|c| Value::Str(c.to_string())).collect())
            }
            other => Err(type_error(format!("{} is not iterable", other.type_of()))),
        }
    }

    // Statements

    fn exec_block(&mut self, statements: &[Stmt], scope: usize) -> Exec<Completion> {
        for statement in statements {
            if let Stmt::Function(function) = statement {
                if let Some(name) = &function.name {
                    let closure = self.closure(function, scope);
                    self.declare(scope, name, closure, true)?;
                }
            }
        }
        for statement in statements {
            match self.exec(statement, scope)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    /// Runs a loop body; `Some` means the loop must stop with that completion.
    fn loop_body(&mut self, body: &Stmt, scope: usize) -> Exec<Option<Completion>> {
        match self.exec(body, scope)? {
            Completion::Break => Ok(Some(Completion::Normal)),
            Completion::Return(value) => Ok(Some(Completion::Return(value))),
            Completion::Normal | Completion::Continue => Ok(None),
        }
    }

    fn exec(&mut self, statement: &Stmt, scope: usize) -> Exec<Completion> {
        self.tick()?;
        match statement {
            Stmt::Declare {
                kind, declarations, ..
            } => {
                for (pattern, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, *kind != DeclKind::Const, scope)?;
                }
                Ok(Completion::Normal)
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Completion::Normal),
            Stmt::Expr(expr, _) => {
                self.eval(expr, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test, scope)?.truthy() {
                    if let Some(done) = self.loop_body(body, scope)? {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let loop_scope = self.new_scope(scope);
                if let Some(init) = init {
                    self.exec(init, loop_scope)?;
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval(test, loop_scope)?.truthy() {
                            break;
                        }
                    }
                    if let Some(done) = self.loop_body(body, loop_scope)? {
                        return Ok(done);
                    }
                    if let Some(update) = update {
                        self.eval(update, loop_scope)?;
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, scope)?;
                for item in self.iterate(&iterable)? {
                    let iteration = self.new_scope(scope);
                    self.bind_pattern(pattern, item, *kind != DeclKind::Const, iteration)?;
                    if let Some(done) = self.loop_body(body, iteration)? {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::ForIn {
                kind,
                name,
                object,
                body,
            } => {
                let keys: Vec<String> = match self.eval(object, scope)? {
                    Value::Object(object) => object.borrow().keys().map(str::to_string).collect(),
                    Value::Array(items) => {
                        let len = items.borrow().len();
                        self.charge_elements(len)?;
                        (0..len).map(|i| i.to_string()).collect()
                    }
                    Value::Str(s) => {
                        let len = s.chars().count();
                        check_array_length(len)?;
                        self.charge_elements(len)?;
                        (0..len).map(|i| i.to_string()).collect()
                    }
                    _ => Vec::new(),
                };
                for key in keys {
                    let iteration = self.new_scope(scope);
                    self.declare(iteration, name, Value::Str(key), *kind != DeclKind::Const)?;
                    if let Some(done) = self.loop_body(body, iteration)? {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Block(statements) => {
                let block_scope = self.new_scope(scope);
                self.exec_block(statements, block_scope)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::Break => Ok(Completion::Break),
            Stmt::Continue => Ok(Completion::Continue),
            Stmt::Throw(expr, _) => {
                let value = self.eval(expr, scope)?;
                Err(Interrupt::Throw(value))
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let try_scope = self.new_scope(scope);
                let mut result = self.exec_block(block, try_scope);

                if let Some(handler) = handler {
                    if let Err(Interrupt::Throw(exception)) = result {
                        let catch_scope = self.new_scope(scope);
                        result = match param {
                            Some(param) => self
                                .bind_pattern(param, exception, true, catch_scope)
                                .and_then(|_| self.exec_block(handler, catch_scope)),
                            None => self.exec_block(handler, catch_scope),
                        };
                    }
                }

                if let Err(Interrupt::Fatal(_)) = result {
                    return result;
                }
                if let Some(finalizer) = finalizer {
                    let finally_scope = self.new_scope(scope);
                    match self.exec_block(finalizer, finally_scope)? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                result
            }
        }
    }

    // Expressions

    fn closure(&self, function: &Rc<Function>, scope: usize) -> Value {
        Value::Function(Rc::new(Closure {
            function: Rc::clone(function),
            scope,
        }))
    }

    pub(super) fn eval(&mut self, expr: &Expr, scope: usize) -> Exec<Value> {
        self.tick()?;
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            let value = self.eval(expr, scope)?;
                            out.push_str(&self.display(&value)?)
                        }
                    }
                    check_length(out.len())?;
                }
                Ok(Value::Str(out))
            }
            Expr::Ident(name) => self.lookup(scope, name),
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element, scope)?);
                }
                Ok(Value::array(items))
            }
            Expr::Object(properties) => {
                let mut object = Object::default();
                for (key, value) in properties {
                    let key = match key {
                        PropertyKey::Named(name) => name.clone(),
                        PropertyKey::Computed(expr) => {
                            let key = self.eval(expr, scope)?;
                            self.property_string(&key)?
                        }
                    };
                    let value = self.eval(value, scope)?;
                    object.set(key, value);
                }
                Ok(Value::object(object))
            }
            Expr::Member { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr, scope)?.unwrap_or(Value::Undefined))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::Str(value.type_of().to_string()),
                })
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional(test, consequent, alternate) => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Assign { op, target, value } => {
                let reference = self.reference(target, scope)?;
                let value = match op {
                    None => self.eval(value, scope)?,
                    Some(op) => {
                        let current = self.get_reference(&reference, scope)?;
                        let rhs = self.eval(value, scope)?;
                        self.binary(*op, &current, &rhs)?
                    }
                };
                self.put_reference(reference, value.clone(), scope)?;
                Ok(value)
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let reference = self.reference(target, scope)?;
                let old = self.get_reference(&reference, scope)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.put_reference(reference, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Function(function) => Ok(self.closure(function, scope)),
        }
    }

    /// Evaluates member and call chains. `None` means an optional link hit
    /// `null`/`undefined` and the rest of the chain was skipped.
    fn eval_chain(&mut self, expr: &Expr, scope: usize) -> Exec<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.eval_chain(object, scope)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.property_key(property, scope)?;
                Ok(Some(self.get_property(&target, &key)?))
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let function = if let Expr::Member {
                    object,
                    property,
                    optional: member_optional,
                } = callee.as_ref()
                {
                    let Some(target) = self.eval_chain(object, scope)? else {
                        return Ok(None);
                    };
                    if *member_optional && target.is_nullish() {
                        return Ok(None);
                    }
                    let key = self.property_key(property, scope)?;
                    if self.has_builtin_method(&target, &key) {
                        let args = self.eval_args(args, scope)?;
                        return self.call_builtin_method(&target, &key, args).map(Some);
                    }
                    self.get_property(&target, &key)?
                } else {
                    match self.eval_chain(callee, scope)? {
                        Some(function) => function,
                        None => return Ok(None),
                    }
                };

                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                if !function.is_callable() {
                    return Err(type_error(format!(
                        "{} is not a function",
                        callee_name(callee)
                    )));
                }
                let args = self.eval_args(args, scope)?;
                self.call(&function, args).map(Some)
            }
            other => self.eval(other, scope).map(Some),
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: usize) -> Exec<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, scope)?);
        }
        Ok(values)
    }

    fn property_key(&mut self, property: &Property, scope: usize) -> Exec<String> {
        match property {
            Property::Named(name) => Ok(name.clone()),
            Property::Computed(expr) => {
                let key = self.eval(expr, scope)?;
                self.property_string(&key)
            }
        }
    }

    /// Key used when a value is used as a property name.
    fn property_string(&mut self, key: &Value) -> Exec<String> {
        match key {
            Value::Number(n) => Ok(format_number(*n)),
            other => self.display(other),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Exec<Value> {
        let mut walk = Walk::default();
        let result = binary_op(op, left, right, &mut walk);
        self.charge_walk(&walk)?;
        result
    }

    pub(super) fn get_property(&mut self, target: &Value, key: &str) -> Exec<Value> {
        match target {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_display(),
                key
            ))),
            Value::Str(s) => match key {
                "length" => {
                    self.charge_bytes(s.len())?;
                    Ok(Value::Number(s.chars().count() as f64))
                }
                _ => match array_index(key) {
                    Some(index) => {
                        self.charge_bytes(s.len())?;
                        Ok(s.chars()
                            .nth(index)
                            .map_or(Value::Undefined, |c| Value::Str(c.to_string())))
                    }
                    None => Ok(Value::Undefined),
                },
            },
            Value::Array(items) => {
                let items = items.borrow();
                Ok(match key {
                    "length" => Value::Number(items.len() as f64),
                    _ => array_index(key)
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(Value::Undefined),
                })
            }
            Value::Object(object) => Ok(object
                .borrow()
                .get(key)
                .cloned()
                .unwrap_or(Value::Undefined)),
            _ => Ok(Value::Undefined),
        }
    }

    fn reference(&mut self, target: &Expr, scope: usize) -> Exec<Reference> {
        match target {
            Expr::Ident(name) => Ok(Reference::Variable(name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval(object, scope)?;
                let key = self.property_key(property, scope)?;
                Ok(Reference::Property(object, key))
            }
            _ => Err(type_error("Invalid assignment target")),
        }
    }

    fn get_reference(&mut self, reference: &Reference, scope: usize) -> Exec<Value> {
        match reference {
            Reference::Variable(name) => self.lookup(scope, name),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn put_reference(&mut self, reference: Reference, value: Value, scope: usize) -> Exec<()> {
        match reference {
            Reference::Variable(name) => self.assign_variable(scope, &name, value),
            Reference::Property(target, key) => match &target {
                Value::Undefined | Value::Null => Err(type_error(format!(
                    "Cannot set properties of {} (setting '{}')",
                    target.to_display(),
                    key
                ))),
                Value::Object(object) => {
                    object.borrow_mut().set(key, value);
                    Ok(())
                }
                Value::Array(items) => {
                    let mut items = items.borrow_mut();
                    if key == "length" {
                        let length = value.to_number();
                        if length >= 0.0 && length.fract() == 0.0 && (length as usize) <= items.len() {
                            items.truncate(length as usize);
                            return Ok(());
                        }
                        return Err(range_error("Invalid array length"));
                    }
                    if let Some(index) = array_index(&key) {
                        if index >= items.len() + MAX_ARRAY_GROWTH {
                            return Err(range_error("Invalid array length"));
                        }
                        if index >= items.len() {
                            check_array_length(index + 1)?;
                            self.charge_elements(index + 1 - items.len())?;
                            items.resize(index + 1, Value::Undefined);
                        }
                        items[index] = value;
                    }
                    Ok(())
                }
                // assignments to primitives are silently ignored
                _ => Ok(()),
            },
        }
    }

    /// Invokes a script function or host function.
    pub(super) fn call(&mut self, function: &Value, args: Vec<Value>) -> Exec<Value> {
        match function {
            Value::Host(host_fn) => {
                let mut walk = Walk::default();
                let result = self.host.call(*host_fn, &args, &mut walk);
                self.charge_walk(&walk)?;
                result
            }
            Value::Function(closure) => {
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(range_error("Maximum call stack size exceeded"));
                }
                self.call_depth += 1;
                let result = self.call_closure(closure, args);
                self.call_depth -= 1;
                result
            }
            other => Err(type_error(format!("{} is not a function", other.type_of()))),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Exec<Value> {
        let scope = self.new_scope(closure.scope);
        let function = Rc::clone(&closure.function);
        if let Some(name) = &function.name {
            self.declare(scope, name, Value::Function(Rc::clone(closure)), true)?;
        }
        let mut args = args.into_iter();
        for param in &function.params {
            let value = args.next().unwrap_or(Value::Undefined);
            self.bind_pattern(param, value, true, scope)?;
        }
        match &function.body {
            FunctionBody::Expr(expr) => self.eval(expr, scope),
            FunctionBody::Block(statements) => match self.exec_block(statements, scope)? {
                Completion::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }
}

pub(super) fn check_length(len: usize) -> Exec<()> {
    if len > MAX_STRING_LENGTH {
        return Err(range_error("Invalid string length"));
    }
    Ok(())
}

pub(super) fn check_array_length(len: usize) -> Exec<()> {
    if len > MAX_ARRAY_LENGTH {
        return Err(range_error("Invalid array length"));
    }
    Ok(())
}

/// Parses a canonical array index (`"0"`, `"12"`, not `"01"`).
pub(super) fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

/// Source-like name of a callee for error messages.
fn callee_name(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            property: Property::Named(name),
            ..
        } => format!("{}.{}", callee_name(object), name),
        Expr::Member { object, .. } => format!("{}[...]", callee_name(object)),
        Expr::Call { callee, .. } => format!("{}(...)", callee_name(callee)),
        _ => "expression".to_string(),
    }
}

pub(super) fn binary_op(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    walk: &mut Walk,
) -> Exec<Value> {
    let numeric = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    Ok(match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::Str(_) | Value::Array(_) | Value::Object(_));
            if stringy(left) || stringy(right) {
                let mut joined = left.display(walk)?;
                joined.push_str(&right.display(walk)?);
                check_length(joined.len())?;
                Value::Str(joined)
            } else {
                numeric(|a, b| a + b)
            }
        }
        BinaryOp::Sub => numeric(|a, b| a - b),
        BinaryOp::Mul => numeric(|a, b| a * b),
        BinaryOp::Div => numeric(|a, b| a / b),
        BinaryOp::Rem => numeric(|a, b| a % b),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right, walk)?),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right, walk)?),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let result = match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Gt => ordering.is_gt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    _ => ordering.is_ge(),
                },
            };
            Value::Bool(result)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_add() {
        let add = |a: Value, b: Value| {
            binary_op(BinaryOp::Add, &a, &b, &mut Walk::default())
                .unwrap()
                .to_display()
        };
        assert_eq!(add(Value::Number(1.0), Value::Number(2.0)), "3");
        assert_eq!(add(Value::Str("a".into()), Value::Number(1.0)), "a1");
        assert_eq!(add(Value::Number(1.0), Value::Null), "1");
        assert_eq!(add(Value::Number(1.0), Value::Undefined), "NaN");
        assert_eq!(add(Value::Bool(true), Value::Number(1.0)), "2");
    }

    #[test]
    fn test_comparisons() {
        let cmp = |op, a: Value, b: Value| {
            binary_op(op, &a, &b, &mut Walk::default()).unwrap().truthy()
        };
        assert!(cmp(BinaryOp::Lt, Value::Str("a".into()), Value::Str("b".into())));
        assert!(cmp(BinaryOp::GtEq, Value::Str("10".into()), Value::Number(9.0)));
        assert!(!cmp(BinaryOp::Lt, Value::Number(f64::NAN), Value::Number(1.0)));
    }

    #[test]
    fn test_conversion_errors_are_exceptions() {
        let thrown = |error: ConversionError| match Interrupt::from(error) {
            Interrupt::Throw(value) => uncaught(&value),
            Interrupt::Fatal(error) => panic!("not catchable: {}", error),
        };
        assert_eq!(
            thrown(ConversionError::Circular),
            ScriptError::Type("Converting circular structure to JSON".to_string())
        );
        assert_eq!(
            thrown(ConversionError::TooLarge),
            ScriptError::Thrown("RangeError: Invalid string length".to_string())
        );
        assert_eq!(
            thrown(ConversionError::TooDeep),
            ScriptError::Thrown("RangeError: Maximum call stack size exceeded".to_string())
        );
    }

    #[test]
    fn test_concatenating_self_containing_array() {
        let items = Value::array(Vec::new());
        if let Value::Array(inner) = &items {
            inner.borrow_mut().push(items.clone());
        }
        let mut walk = Walk::default();
        let joined = binary_op(BinaryOp::Add, &Value::Str("x".into()), &items, &mut walk);
        assert_eq!(joined.unwrap().to_display(), "x");
        assert!(walk.nodes() <= 4);
    }

    #[test]
    fn test_array_index() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
    }

    #[test]
    fn test_uncaught_mapping() {
        assert_eq!(
            uncaught(&error_value("TypeError", "x is not a function")),
            ScriptError::Type("x is not a function".to_string())
        );
        assert_eq!(
            uncaught(&error_value("ReferenceError", "fetch is not defined")),
            ScriptError::Reference("fetch is not defined".to_string())
        );
        assert_eq!(
            uncaught(&Value::Str("boom".to_string())),
            ScriptError::Thrown("boom".to_string())
        );
        assert_eq!(
            uncaught(&error_value("RangeError", "Invalid string length")),
            ScriptError::Thrown("RangeError: Invalid string length".to_string())
        );
    }
}
