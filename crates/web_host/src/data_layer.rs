use client_core::DataLayer;
use js_sys::{Array, Function, Reflect, JSON};
use serde_json::Value;
use shared::protocol::GtagCommand;
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Window;

const QUEUE: &str = "dataLayer";
const DISPATCH: &str = "gtag";

/// `window.dataLayer` with `window.gtag` as its dispatch function.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowDataLayer;

fn window_property(window: &Window, name: &str) -> JsValue {
    Reflect::get(window, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
}

fn command_arguments(command: &GtagCommand) -> Result<Array, JsValue> {
    let args = Array::new();
    args.push(&JsValue::from_str(command.name()));
    match command {
        GtagCommand::Js { at } => {
            args.push(&js_sys::Date::new(&JsValue::from_f64(at.timestamp_millis() as f64)));
        }
        GtagCommand::Config {
            measurement_id,
            params,
        } => {
            args.push(&JsValue::from_str(measurement_id));
            args.push(&JSON::parse(&Value::Object(params.clone()).to_string())?);
        }
    }
    Ok(args)
}

impl DataLayer for WindowDataLayer {
    fn ensure_queue(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if window_property(&window, QUEUE).is_falsy() {
            if let Err(err) = Reflect::set(&window, &JsValue::from_str(QUEUE), &Array::new()) {
                warn!(error = ?err, "failed to create window.dataLayer");
            }
        }
    }

    fn install_dispatch(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        // gtag.js only accepts `arguments` objects, so the function must be plain JS.
        let gtag = Function::new_no_args("dataLayer.push(arguments);");
        if let Err(err) = Reflect::set(&window, &JsValue::from_str(DISPATCH), &gtag) {
            warn!(error = ?err, "failed to expose window.gtag");
        }
    }

    fn dispatch(&self, command: &GtagCommand) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let args = match command_arguments(command) {
            Ok(args) => args,
            Err(err) => {
                warn!(command = command.name(), error = ?err, "failed to encode gtag call");
                return;
            }
        };

        let result = match window_property(&window, DISPATCH).dyn_into::<Function>() {
            Ok(gtag) => gtag.apply(&JsValue::NULL, &args).map(|_| ()),
            Err(_) => window_property(&window, QUEUE)
                .dyn_into::<Array>()
                .map(|queue| {
                    queue.push(&args);
                })
                .map_err(|_| JsValue::from_str("window.dataLayer is not an array")),
        };
        if let Err(err) = result {
            warn!(command = command.name(), error = ?err, "gtag dispatch failed");
        }
    }
}
