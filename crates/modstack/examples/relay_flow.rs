#![forbid(unsafe_code)]

//! A checkout flow driven through the modal engine.
//!
//! The cart relays to a confirmation dialog, the confirmation replaces itself
//! with a receipt, and submitting the receipt closes the whole relay chain
//! back to the cart. Each "frame" renders the top modal to text and then
//! clicks one button through the control captured during render.
//!
//! Run: `RUST_LOG=modstack_runtime=debug cargo run -p modstack --example relay_flow`

use modstack::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// What a renderer hands back to the host loop.
struct Screen {
    text: String,
    control: ModalControl<Screen>,
}

fn data(value: serde_json::Value) -> Option<DataMap> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

fn register_screens(engine: &ModalEngine<Screen>) {
    engine.register(
        "cart",
        |m| Screen {
            text: format!("[cart] {} item(s)", m.get("items").unwrap_or(&json!(0))),
            control: m.clone(),
        },
        true,
    );
    engine.register(
        "confirm",
        |m| Screen {
            text: format!("[confirm] pay {}?", m.get("total").unwrap_or(&json!("?"))),
            control: m.clone(),
        },
        true,
    );
    engine.register(
        "receipt",
        |m| Screen {
            text: format!("[receipt] order {}", m.get("order").unwrap_or(&json!("-"))),
            control: m.clone(),
        },
        true,
    );
}

fn frame(engine: &ModalEngine<Screen>) -> Option<ModalControl<Screen>> {
    let rendered = engine.render()?;
    println!(
        "{:>2} | key {} | {}",
        engine.depth(),
        rendered.key,
        rendered.output.text
    );
    Some(rendered.output.control)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::from_env()?;
    let engine: ModalEngine<Screen> = ModalEngine::with_config(config);
    register_screens(&engine);

    let reader = engine.reader();
    let _sub = engine.subscribe(|stack| {
        println!("   | stack {:?}", stack.names());
    });

    engine.push("cart", data(json!({"items": 3})))?;

    let cart = frame(&engine).ok_or("cart did not render")?;
    cart.update(data(json!({"items": 4})))?;

    let cart = frame(&engine).ok_or("cart did not render")?;
    cart.relay("confirm", data(json!({"total": "42.00"})))?;

    if let Err(err) = cart.relay("confirm", None) {
        println!("   | rejected: {err}");
    }

    let confirm = frame(&engine).ok_or("confirm did not render")?;
    confirm.replace("receipt", data(json!({"order": 1017})))?;

    let receipt = frame(&engine).ok_or("receipt did not render")?;
    receipt.submit()?;

    frame(&engine);
    println!("   | reader sees depth {}", reader.depth());
    Ok(())
}
