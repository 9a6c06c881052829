//! Expression interpreter
//!
//! Walks a [`Program`] against an [`Environment`]. The environment owns all
//! state: instance fields are reached through `$this`, loop variables through
//! `$loop`, and the current event through `$event`. Reads and writes go
//! through [`Place`]s so that assignments land back in the store and trigger
//! re-rendering there.

use crate::ast::{BinaryOp, Expr, LogicalOp, Program, Stmt, TemplatePart, UnaryOp, UpdateOp};
use crate::error::EvalError;
use crate::node::NodeId;
use crate::path::{DataPath, PathKey};
use crate::rewrite::{INSTANCE_ROOT, LOOP_ROOT};
use crate::token::EVENT_ROOT;
use crate::value::Value;

/// A readable and possibly writable location.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    /// A path into the instance store.
    Data(DataPath),
    /// A path into the current event (`$event.target.value`).
    Event(DataPath),
    /// A value with no backing storage, such as a numeric loop item.
    Detached(Value, DataPath),
}

impl Place {
    pub fn child(&self, key: PathKey) -> Place {
        match self {
            Place::Data(path) => Place::Data(path.child(key)),
            Place::Event(path) => Place::Event(path.child(key)),
            Place::Detached(value, path) => Place::Detached(value.clone(), path.child(key)),
        }
    }

    /// The store path, when the place is backed by the store.
    pub fn data_path(&self) -> Option<&DataPath> {
        match self {
            Place::Data(path) => Some(path),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Place::Data(path) => format!("{INSTANCE_ROOT}.{path}"),
            Place::Event(path) if path.is_empty() => EVENT_ROOT.to_string(),
            Place::Event(path) => format!("{EVENT_ROOT}.{path}"),
            Place::Detached(value, path) if path.is_empty() => value.to_display_string(),
            Place::Detached(value, path) => format!("{}.{path}", value.to_display_string()),
        }
    }
}

/// Everything an expression can touch.
pub trait Environment {
    type Error: From<EvalError>;

    /// The place a loop-local name is bound to.
    fn loop_binding(&self, name: &str) -> Option<Place>;

    fn read(&self, place: &Place) -> Value;

    fn write(&mut self, place: &Place, value: Value) -> Result<(), Self::Error>;

    fn has_method(&self, name: &str) -> bool;

    fn call_method(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Self::Error>;

    /// Property of a document element referenced by a [`Value::Node`].
    fn node_property(&self, _node: NodeId, _key: &str) -> Value {
        Value::Undefined
    }

    fn log(&mut self, message: &str) {
        tracing::info!(target: "whisker::console", "{message}");
    }

    fn alert(&mut self, message: &str) {
        tracing::info!(target: "whisker::alert", "{message}");
    }
}

/// Follow `keys` from `value`, asking the environment about element properties.
pub fn descend<E: Environment + ?Sized>(env: &E, value: Value, keys: &[PathKey]) -> Value {
    let mut current = value;
    for (i, key) in keys.iter().enumerate() {
        current = match &current {
            Value::Node(node) => match key {
                PathKey::Field(name) => env.node_property(*node, name),
                PathKey::Index(_) => Value::Undefined,
            },
            other => other.property(key),
        };
        if current.is_nullish() && i + 1 < keys.len() {
            return Value::Undefined;
        }
    }
    current
}

pub fn evaluate<E: Environment + ?Sized>(program: &Program, env: &mut E) -> Result<Value, E::Error> {
    let mut last = Value::Undefined;
    for stmt in &program.body {
        last = exec(stmt, env)?;
    }
    Ok(last)
}

/// Evaluate a program, also reporting the place it reads when it is a single
/// place expression such as `$this.todos` or `$loop.item.children`.
pub fn evaluate_with_place<E: Environment + ?Sized>(
    program: &Program,
    env: &mut E,
) -> Result<(Value, Option<Place>), E::Error> {
    if let Some(expr) = program.single_expression() {
        if let Some(place) = place_of(expr, env)? {
            return Ok((env.read(&place), Some(place)));
        }
    }
    Ok((evaluate(program, env)?, None))
}

/// Resolve a place expression to its location without reading it.
pub fn place_of<E: Environment + ?Sized>(expr: &Expr, env: &mut E) -> Result<Option<Place>, E::Error> {
    let place = match expr {
        Expr::Ident(name) if name == EVENT_ROOT => Some(Place::Event(DataPath::new())),
        Expr::Member { object, property } => match object.as_ref() {
            Expr::Ident(root) if root == INSTANCE_ROOT => {
                Some(Place::Data(DataPath::from(PathKey::Field(property.clone()))))
            }
            Expr::Ident(root) if root == LOOP_ROOT => Some(
                env.loop_binding(property)
                    .ok_or_else(|| EvalError::UnknownLoopVariable(property.clone()))?,
            ),
            inner => place_of(inner, env)?.map(|base| base.child(PathKey::Field(property.clone()))),
        },
        Expr::Index { object, index } => match place_of(object, env)? {
            Some(base) => {
                let key = key_of(&eval(index, env)?);
                Some(base.child(key))
            }
            None => None,
        },
        _ => None,
    };
    Ok(place)
}

fn key_of(value: &Value) -> PathKey {
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => PathKey::Index(*n as usize),
        Value::String(s) => PathKey::from(s.as_str()),
        other => PathKey::Field(other.to_display_string()),
    }
}

fn exec<E: Environment + ?Sized>(stmt: &Stmt, env: &mut E) -> Result<Value, E::Error> {
    match stmt {
        Stmt::Expr(expr) => eval(expr, env),
        Stmt::Block(body) => {
            let mut last = Value::Undefined;
            for stmt in body {
                last = exec(stmt, env)?;
            }
            Ok(last)
        }
        Stmt::If {
            test,
            then,
            otherwise,
        } => {
            if eval(test, env)?.is_truthy() {
                exec(then, env)
            } else if let Some(otherwise) = otherwise {
                exec(otherwise, env)
            } else {
                Ok(Value::Undefined)
            }
        }
    }
}

fn eval<E: Environment + ?Sized>(expr: &Expr, env: &mut E) -> Result<Value, E::Error> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Template(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    TemplatePart::Text(literal) => text.push_str(literal),
                    TemplatePart::Expr(expr) => text.push_str(&eval(expr, env)?.to_display_string()),
                }
            }
            Ok(Value::String(text))
        }
        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(item, env)?);
            }
            Ok(Value::Array(values))
        }
        Expr::Ident(name) if name == EVENT_ROOT => Ok(env.read(&Place::Event(DataPath::new()))),
        Expr::Ident(name) if name == INSTANCE_ROOT || name == LOOP_ROOT => {
            Err(EvalError::Type(format!("`{name}` cannot be used as a value")).into())
        }
        Expr::Ident(name) => Err(EvalError::NotDefined(name.clone()).into()),
        Expr::Member { object, property } => {
            if let Some(place) = place_of(expr, env)? {
                return Ok(env.read(&place));
            }
            let receiver = eval(object, env)?;
            Ok(descend(env, receiver, &[PathKey::Field(property.clone())]))
        }
        Expr::Index { object, index } => {
            if let Some(place) = place_of(expr, env)? {
                return Ok(env.read(&place));
            }
            let receiver = eval(object, env)?;
            let key = key_of(&eval(index, env)?);
            Ok(descend(env, receiver, &[key]))
        }
        Expr::Call { callee, args } => call(callee, args, env),
        Expr::Unary { op, operand } => {
            let value = eval(operand, env)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical { op, left, right } => {
            let left = eval(left, env)?;
            match (op, left.is_truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => eval(right, env),
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if eval(test, env)?.is_truthy() {
                eval(consequent, env)
            } else {
                eval(alternate, env)
            }
        }
        Expr::Assign { op, target, value } => {
            let place = writable_place(target, env)?;
            let rhs = eval(value, env)?;
            let result = match op.binary() {
                None => rhs,
                Some(arith) => binary(arith, &env.read(&place), &rhs),
            };
            env.write(&place, result.clone())?;
            Ok(result)
        }
        Expr::Update { op, prefix, target } => {
            let place = writable_place(target, env)?;
            let old = env.read(&place).to_number();
            let new = match op {
                UpdateOp::Increment => old + 1.0,
                UpdateOp::Decrement => old - 1.0,
            };
            env.write(&place, Value::Number(new))?;
            Ok(Value::Number(if *prefix { new } else { old }))
        }
    }
}

fn writable_place<E: Environment + ?Sized>(target: &Expr, env: &mut E) -> Result<Place, E::Error> {
    match place_of(target, env)? {
        Some(place) => Ok(place),
        None => Err(EvalError::ReadOnly(target.describe()).into()),
    }
}

/// Arithmetic, comparison and equality on two values.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    use std::cmp::Ordering::{Equal, Greater, Less};

    let concatenates = |v: &Value| {
        matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Node(_))
    };
    match op {
        BinaryOp::Add if concatenates(left) || concatenates(right) => Value::String(format!(
            "{}{}",
            left.to_display_string(),
            right.to_display_string()
        )),
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
        BinaryOp::Lt => Value::Bool(left.compare(right) == Some(Less)),
        BinaryOp::LtEq => Value::Bool(matches!(left.compare(right), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(left.compare(right) == Some(Greater)),
        BinaryOp::GtEq => Value::Bool(matches!(left.compare(right), Some(Greater | Equal))),
    }
}

const MUTATING_ARRAY_METHODS: [&str; 6] = ["push", "pop", "shift", "unshift", "splice", "reverse"];

fn call<E: Environment + ?Sized>(callee: &Expr, args: &[Expr], env: &mut E) -> Result<Value, E::Error> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, env)?);
    }

    let Expr::Member { object, property } = callee else {
        return match callee {
            Expr::Ident(name) if name == "alert" => {
                let message = values
                    .first()
                    .map(Value::to_display_string)
                    .unwrap_or_default();
                env.alert(&message);
                Ok(Value::Undefined)
            }
            other => Err(EvalError::NotCallable(other.describe()).into()),
        };
    };

    match object.as_ref() {
        Expr::Ident(root) if root == "console" && property == "log" => {
            let message = values
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(" ");
            env.log(&message);
            return Ok(Value::Undefined);
        }
        Expr::Ident(root) if root == INSTANCE_ROOT => {
            return if env.has_method(property) {
                env.call_method(property, values)
            } else {
                Err(EvalError::NotCallable(property.clone()).into())
            };
        }
        _ => {}
    }

    if MUTATING_ARRAY_METHODS.contains(&property.as_str()) {
        if let Some(place) = place_of(object, env)? {
            if let Value::Array(mut items) = env.read(&place) {
                let result = mutate_array(&mut items, property, values);
                env.write(&place, Value::Array(items))?;
                return Ok(result);
            }
        }
    }

    let receiver = eval(object, env)?;
    Ok(builtin_method(&receiver, property, values)?)
}

/// Apply a mutating array method in place, returning the method's result.
pub fn mutate_array(items: &mut Vec<Value>, method: &str, args: Vec<Value>) -> Value {
    match method {
        "push" => {
            items.extend(args);
            Value::from(items.len())
        }
        "pop" => items.pop().unwrap_or_default(),
        "shift" => {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        }
        "unshift" => {
            items.splice(0..0, args);
            Value::from(items.len())
        }
        "splice" => {
            let len = items.len();
            let start = relative_index(args.first(), len, 0);
            let count = match args.get(1) {
                Some(count) => (count.to_number().max(0.0) as usize).min(len - start),
                None => len - start,
            };
            let inserted = args.into_iter().skip(2);
            Value::Array(items.splice(start..start + count, inserted).collect())
        }
        "reverse" => {
            items.reverse();
            Value::Array(items.clone())
        }
        _ => Value::Undefined,
    }
}

/// Resolve a possibly negative index argument against `len`.
fn relative_index(arg: Option<&Value>, len: usize, default: usize) -> usize {
    let Some(arg) = arg.filter(|arg| !matches!(arg, Value::Undefined)) else {
        return default;
    };
    let n = arg.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index)
        .map(Value::to_display_string)
        .unwrap_or_else(|| "undefined".to_string())
}

/// Non-mutating builtin methods on arrays, strings and numbers.
pub fn builtin_method(receiver: &Value, method: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    if method == "toString" {
        return Ok(Value::String(receiver.to_display_string()));
    }

    let result = match receiver {
        Value::Array(items) => match method {
            m if MUTATING_ARRAY_METHODS.contains(&m) => {
                let mut copy = items.clone();
                mutate_array(&mut copy, m, args)
            }
            "includes" => {
                let needle = args.first().cloned().unwrap_or_default();
                Value::Bool(items.iter().any(|item| item.strict_eq(&needle)))
            }
            "indexOf" => {
                let needle = args.first().cloned().unwrap_or_default();
                let position = items.iter().position(|item| item.strict_eq(&needle));
                Value::Number(position.map_or(-1.0, |i| i as f64))
            }
            "join" => {
                let separator = match args.first() {
                    None | Some(Value::Undefined) => ",".to_string(),
                    Some(sep) => sep.to_display_string(),
                };
                Value::String(
                    items
                        .iter()
                        .map(|item| {
                            if item.is_nullish() {
                                String::new()
                            } else {
                                item.to_display_string()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(&separator),
                )
            }
            "slice" => {
                let start = relative_index(args.first(), items.len(), 0);
                let end = relative_index(args.get(1), items.len(), items.len());
                Value::Array(items.get(start..end.max(start)).unwrap_or_default().to_vec())
            }
            "concat" => {
                let mut joined = items.clone();
                for arg in args {
                    match arg {
                        Value::Array(more) => joined.extend(more),
                        other => joined.push(other),
                    }
                }
                Value::Array(joined)
            }
            _ => return Err(not_callable(receiver, method)),
        },
        Value::String(s) => match method {
            "toUpperCase" => Value::String(s.to_uppercase()),
            "toLowerCase" => Value::String(s.to_lowercase()),
            "trim" => Value::String(s.trim().to_string()),
            "includes" => Value::Bool(s.contains(&string_arg(&args, 0))),
            "startsWith" => Value::Bool(s.starts_with(&string_arg(&args, 0))),
            "endsWith" => Value::Bool(s.ends_with(&string_arg(&args, 0))),
            "indexOf" => {
                let needle = string_arg(&args, 0);
                Value::Number(
                    s.find(&needle)
                        .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
                )
            }
            "slice" => {
                let chars: Vec<char> = s.chars().collect();
                let start = relative_index(args.first(), chars.len(), 0);
                let end = relative_index(args.get(1), chars.len(), chars.len());
                Value::String(
                    chars
                        .get(start..end.max(start))
                        .unwrap_or_default()
                        .iter()
                        .collect(),
                )
            }
            "split" => match args.first() {
                None | Some(Value::Undefined) => Value::Array(vec![Value::String(s.clone())]),
                Some(separator) => {
                    let separator = separator.to_display_string();
                    let parts: Vec<Value> = if separator.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str()).map(Value::from).collect()
                    };
                    Value::Array(parts)
                }
            },
            "repeat" => {
                let count = args.first().map_or(0.0, Value::to_number);
                if count.is_finite() && count >= 0.0 {
                    Value::String(s.repeat(count as usize))
                } else {
                    return Err(EvalError::Type(format!("invalid repeat count {count}")));
                }
            }
            "concat" => {
                let mut joined = s.clone();
                for arg in &args {
                    joined.push_str(&arg.to_display_string());
                }
                Value::String(joined)
            }
            _ => return Err(not_callable(receiver, method)),
        },
        Value::Number(n) => match method {
            "toFixed" => {
                let digits = args.first().map_or(0.0, Value::to_number);
                let digits = if digits.is_finite() { digits.clamp(0.0, 100.0) as usize } else { 0 };
                Value::String(format!("{n:.digits$}"))
            }
            _ => return Err(not_callable(receiver, method)),
        },
        _ => return Err(not_callable(receiver, method)),
    };
    Ok(result)
}

fn not_callable(receiver: &Value, method: &str) -> EvalError {
    EvalError::NotCallable(format!("{}.{method}", receiver.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::store::Store;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// A store-backed environment with a fixed loop binding and one method.
    #[derive(Default)]
    struct TestEnv {
        store: Store,
        event: Value,
        loops: Vec<(String, Place)>,
        log: Vec<String>,
        alerts: Vec<String>,
    }

    impl Environment for TestEnv {
        type Error = EvalError;

        fn loop_binding(&self, name: &str) -> Option<Place> {
            self.loops
                .iter()
                .find(|(local, _)| local == name)
                .map(|(_, place)| place.clone())
        }

        fn read(&self, place: &Place) -> Value {
            match place {
                Place::Data(path) => self.store.get(path),
                Place::Event(path) => self.event.lookup(path.keys()),
                Place::Detached(value, path) => value.lookup(path.keys()),
            }
        }

        fn write(&mut self, place: &Place, value: Value) -> Result<(), EvalError> {
            match place {
                Place::Data(path) => Ok(self.store.set(path, value)?),
                other => Err(EvalError::ReadOnly(other.describe())),
            }
        }

        fn has_method(&self, name: &str) -> bool {
            name == "double"
        }

        fn call_method(&mut self, _name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
            Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0))
        }

        fn log(&mut self, message: &str) {
            self.log.push(message.to_string());
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
    }

    fn env(data: serde_json::Value) -> TestEnv {
        let mut env = TestEnv::default();
        if let Value::Object(fields) = Value::from(data) {
            for (name, value) in fields {
                env.store.declare(name, value);
            }
        }
        env
    }

    fn run(env: &mut TestEnv, source: &str) -> Value {
        evaluate(&parse(source).unwrap(), env).unwrap()
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        let mut env = env(json!({"a": 2, "s": "x"}));
        assert_eq!(run(&mut env, "1 + 2 * 3"), Value::from(7));
        assert_eq!(run(&mut env, "$this.s + $this.a"), Value::from("x2"));
        assert_eq!(run(&mut env, "'2' * 3"), Value::from(6));
        assert_eq!(run(&mut env, "7 % 4"), Value::from(3));
        assert_eq!(run(&mut env, "-$this.a"), Value::from(-2));
    }

    #[test]
    fn test_comparison_and_logic() {
        let mut env = env(json!({"n": 5, "name": ""}));
        assert_eq!(run(&mut env, "$this.n > 3 && $this.n <= 5"), Value::Bool(true));
        assert_eq!(run(&mut env, "$this.name || 'anon'"), Value::from("anon"));
        assert_eq!(run(&mut env, "$this.n == '5'"), Value::Bool(true));
        assert_eq!(run(&mut env, "$this.n === '5'"), Value::Bool(false));
        assert_eq!(run(&mut env, "!$this.name ? 'empty' : 'set'"), Value::from("empty"));
    }

    #[test]
    fn test_assignment_writes_through_store() {
        let mut env = env(json!({"count": 1, "user": {"name": "a"}}));
        run(&mut env, "$this.count += 2");
        assert_eq!(env.store.get(&"count".into()), Value::from(3));
        assert_eq!(run(&mut env, "$this.count++"), Value::from(3));
        assert_eq!(run(&mut env, "++$this.count"), Value::from(5));
        run(&mut env, "$this.user.name = 'b'");
        assert_eq!(env.store.get(&"user.name".into()), Value::from("b"));
    }

    #[test]
    fn test_if_statement_and_sequence() {
        let mut env = env(json!({"a": true, "b": 0}));
        run(&mut env, "if ($this.a) $this.b = 1 else $this.b = 2; $this.a = false");
        assert_eq!(env.store.get(&"b".into()), Value::from(1));
        run(&mut env, "if ($this.a) { $this.b = 10 } else { $this.b = 20 }");
        assert_eq!(env.store.get(&"b".into()), Value::from(20));
    }

    #[test]
    fn test_mutating_array_methods_write_back() {
        let mut env = env(json!({"todos": ["a"]}));
        assert_eq!(run(&mut env, "$this.todos.push('b', 'c')"), Value::from(3));
        assert_eq!(run(&mut env, "$this.todos.shift()"), Value::from("a"));
        run(&mut env, "$this.todos.splice(0, 1, 'x', 'y')");
        assert_eq!(env.store.get(&"todos".into()), Value::from(json!(["x", "y", "c"])));
        run(&mut env, "$this.todos.reverse()");
        assert_eq!(run(&mut env, "$this.todos.join('-')"), Value::from("c-y-x"));
    }

    #[test]
    fn test_string_and_array_builtins() {
        let mut env = env(json!({"s": " Hello ", "xs": [1, 2, 3]}));
        assert_eq!(run(&mut env, "$this.s.trim().toUpperCase()"), Value::from("HELLO"));
        assert_eq!(run(&mut env, "$this.s.length"), Value::from(7));
        assert_eq!(run(&mut env, "$this.xs.includes(2)"), Value::Bool(true));
        assert_eq!(run(&mut env, "$this.xs.slice(-2)"), Value::from(json!([2, 3])));
        assert_eq!(run(&mut env, "'a,b'.split(',')"), Value::from(json!(["a", "b"])));
        assert_eq!(run(&mut env, "(3.14159).toFixed(2)"), Value::from("3.14"));
        assert_eq!(run(&mut env, "`n=${$this.xs.length}`"), Value::from("n=3"));
    }

    #[test]
    fn test_loop_bindings_and_events() {
        let mut env = env(json!({"todos": [{"done": false}]}));
        env.loops.push((
            "todo".into(),
            Place::Data(DataPath::parse("todos.0")),
        ));
        env.event = Value::from(json!({"type": "click"}));
        run(&mut env, "$loop.todo.done = !$loop.todo.done");
        assert_eq!(env.store.get(&"todos.0.done".into()), Value::Bool(true));
        assert_eq!(run(&mut env, "$event.type"), Value::from("click"));

        let err = evaluate(&parse("$loop.missing").unwrap(), &mut env).unwrap_err();
        assert_eq!(err, EvalError::UnknownLoopVariable("missing".into()));
    }

    #[test]
    fn test_methods_alert_and_console() {
        let mut env = env(json!({"n": 4}));
        assert_eq!(run(&mut env, "$this.double($this.n)"), Value::from(8));
        run(&mut env, "alert('hi ' + $this.n); console.log('n', $this.n)");
        assert_eq!(env.alerts, vec!["hi 4".to_string()]);
        assert_eq!(env.log, vec!["n 4".to_string()]);

        let err = evaluate(&parse("$this.n()").unwrap(), &mut env).unwrap_err();
        assert_eq!(err, EvalError::NotCallable("n".into()));
    }

    #[test]
    fn test_place_reporting() {
        let mut env = env(json!({"items": [1]}));
        let (value, place) = evaluate_with_place(&parse("$this.items").unwrap(), &mut env).unwrap();
        assert_eq!(value, Value::from(json!([1])));
        assert_eq!(place, Some(Place::Data(DataPath::parse("items"))));

        let (_, place) = evaluate_with_place(&parse("$this.items.length + 1").unwrap(), &mut env).unwrap();
        assert_eq!(place, None);
    }
}
