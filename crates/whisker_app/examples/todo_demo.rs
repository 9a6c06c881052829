//! Todo list demo
//!
//! Mounts a small todo page, adds an item by typing and clicking, toggles it
//! through its checkbox and prints the HTML after each step.
//!
//! Run with: cargo run -p whisker_app --example todo_demo

use serde_json::json;
use whisker_app::prelude::*;
use whisker_app::PathKey;

const PAGE: &str = r#"<div id="app" hidden>
<input data-ref="draft" data-model="draft">
<button data-ref="add" data-on-click="add()">Add</button>
<ul><li data-loop="(todo, i) in todos"><input type="checkbox" data-model="todo.done"> {{ i }}: {{ todo.text }}</li></ul>
<p data-if="todos.length == 0">Nothing to do</p>
<p data-else>{{ remaining(todos) }} left</p>
</div>"#;

fn is_done(todo: &Value) -> bool {
    todo.get(&PathKey::Field("done".to_string()))
        .is_some_and(Value::is_truthy)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let options = Options::new()
        .el("#app")
        .data_json(json!({ "draft": "", "todos": [] }))
        .method("add", |todos, _| {
            let text = todos.get("draft");
            todos.push("todos", json!({ "text": text.to_display_string(), "done": false }))?;
            todos.set("draft", "")?;
            Ok(Value::Undefined)
        })
        .method("remaining", |todos, _| {
            let open = todos
                .get("todos")
                .as_array()
                .map_or(0, |items| items.iter().filter(|todo| !is_done(todo)).count());
            Ok(Value::from(open))
        });

    let mut app = Instance::new(options)?;
    app.mount(Document::parse(PAGE))?;
    println!("{}\n", app.to_html());

    let draft = app.ref_node("draft").ok_or(EngineError::NotMounted)?;
    let add = app.ref_node("add").ok_or(EngineError::NotMounted)?;
    app.input(draft, "Write docs")?;
    app.click(add)?;
    println!("{}\n", app.to_html());

    app.set("todos.0.done", true)?;
    println!("{}", app.to_html());
    Ok(())
}
