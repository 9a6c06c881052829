//! Integration tests for the expression pipeline
//!
//! These tests verify that:
//! - Tokenized text survives rewriting and parsing unchanged in meaning
//! - Rewritten expressions read and write instance fields through the store
//! - Loop variables resolve through scope places and write back to the store
//! - Watch patterns and registry registrations follow written paths

use whisker_core::token::join;
use whisker_core::{
    evaluate, rewrite, tokenize, BindingRegistry, DataPath, Environment, EvalError,
    ExpressionCache, NameResolver, Place, Store, Value, Watchers,
};

/// A minimal instance: a store, a list of loop bindings and its method names.
struct Instance {
    store: Store,
    loops: Vec<(&'static str, Place)>,
    writes: Vec<String>,
}

impl Instance {
    fn new(data: serde_json::Value) -> Self {
        let store = match Value::from(data) {
            Value::Object(fields) => fields.into_iter().collect(),
            _ => Store::new(),
        };
        Self {
            store,
            loops: Vec::new(),
            writes: Vec::new(),
        }
    }

    fn run(&mut self, source: &str, cache: &mut ExpressionCache) -> Value {
        let rewritten = rewrite(source, &*self);
        assert!(rewritten.unresolved().next().is_none(), "{source}");
        let program = cache.get_or_parse(&rewritten.text).unwrap();
        evaluate(&program, self).unwrap()
    }
}

impl NameResolver for Instance {
    fn is_loop_local(&self, name: &str) -> bool {
        self.loops.iter().any(|(local, _)| *local == name)
    }

    fn is_instance_member(&self, name: &str) -> bool {
        self.store.contains(name)
    }
}

impl Environment for Instance {
    type Error = EvalError;

    fn loop_binding(&self, name: &str) -> Option<Place> {
        self.loops
            .iter()
            .find(|(local, _)| *local == name)
            .map(|(_, place)| place.clone())
    }

    fn read(&self, place: &Place) -> Value {
        match place {
            Place::Data(path) => self.store.get(path),
            Place::Event(_) => Value::Undefined,
            Place::Detached(value, path) => value.lookup(path.keys()),
        }
    }

    fn write(&mut self, place: &Place, value: Value) -> Result<(), EvalError> {
        let path = place
            .data_path()
            .ok_or_else(|| EvalError::ReadOnly(place.describe()))?;
        self.writes.push(path.to_string());
        Ok(self.store.set(path, value)?)
    }

    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn call_method(&mut self, name: &str, _args: Vec<Value>) -> Result<Value, EvalError> {
        Err(EvalError::NotCallable(name.to_string()))
    }
}

/// Test that tokens join back into the exact source text
#[test]
fn test_tokens_reconstruct_source() {
    let source = "todos.push({{ ignored }}) ; `a ${b}` + 'c d'";
    assert_eq!(join(&tokenize(source)), source);
}

/// Test that an instance variable rewritten and evaluated yields its value
#[test]
fn test_rewritten_instance_variable_reads_field() {
    let mut instance = Instance::new(serde_json::json!({"message": "hello"}));
    let mut cache = ExpressionCache::new();
    assert_eq!(instance.run("message", &mut cache), Value::from("hello"));
    assert_eq!(
        instance.run("`${message}, world`.toUpperCase()", &mut cache),
        Value::from("HELLO, WORLD")
    );
}

/// Test that handler statements write through the store
#[test]
fn test_handler_statements_mutate_store() {
    let mut instance = Instance::new(serde_json::json!({"count": 0, "todos": [], "draft": "milk"}));
    let mut cache = ExpressionCache::new();

    instance.run("count++; count++", &mut cache);
    instance.run("todos.push(draft); draft = ''", &mut cache);

    assert_eq!(instance.store.get(&"count".into()), Value::from(2));
    assert_eq!(
        instance.store.to_json(),
        serde_json::json!({"count": 2, "todos": ["milk"], "draft": ""})
    );
    assert_eq!(instance.writes, vec!["count", "count", "todos", "draft"]);
}

/// Test that loop variables bound to store places write back
#[test]
fn test_loop_variable_writes_back() {
    let mut instance = Instance::new(serde_json::json!({"todos": [{"done": false}, {"done": false}]}));
    instance
        .loops
        .push(("todo", Place::Data(DataPath::parse("todos.1"))));
    instance.loops.push((
        "i",
        Place::Detached(Value::from(1), DataPath::new()),
    ));
    let mut cache = ExpressionCache::new();

    instance.run("todo.done = !todo.done", &mut cache);
    assert_eq!(instance.store.get(&"todos.1.done".into()), Value::Bool(true));
    assert_eq!(instance.run("todos[i].done", &mut cache), Value::Bool(true));
    assert_eq!(instance.writes, vec!["todos.1.done"]);
}

/// Test that the same expression text is parsed once across nodes
#[test]
fn test_cache_shares_programs() {
    let mut instance = Instance::new(serde_json::json!({"a": 1}));
    let mut cache = ExpressionCache::new();
    for _ in 0..5 {
        instance.run("a + 1", &mut cache);
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().hits, 4);
}

/// Test that registrations and watchers follow the written field
#[test]
fn test_registry_and_watchers_follow_writes() {
    let mut instance = Instance::new(serde_json::json!({"user": {"name": "a"}, "count": 0}));
    let source = rewrite("user.name + count", &instance);
    let fields: Vec<_> = source.instance_roots().collect();
    assert_eq!(fields, vec!["user", "count"]);

    let mut arena: slotmap::SlotMap<whisker_core::NodeId, ()> = slotmap::SlotMap::with_key();
    let node = arena.insert(());
    let mut registry = BindingRegistry::new();
    for (name, _) in instance.store.fields() {
        registry.declare(name);
    }
    for field in fields {
        registry.register(field, node);
    }

    let mut watchers = Watchers::new();
    watchers.add("user", "user watcher");
    watchers.add("user.name", "name watcher");

    let mut cache = ExpressionCache::new();
    instance.run("user.name = 'b'", &mut cache);
    let written = &instance.writes[0];
    assert_eq!(watchers.matching(written), vec!["user watcher", "name watcher"]);
    let field = DataPath::parse(written).field().map(str::to_string).unwrap();
    assert_eq!(registry.dependents(&field), vec![node]);
}
