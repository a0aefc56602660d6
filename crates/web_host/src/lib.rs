//! Browser bindings for the consent gate.
//!
//! Built for `wasm32` only: the real DOM behind [`client_core::PageHost`],
//! `window.localStorage` behind the consent store, and `window.dataLayer` /
//! `window.gtag` behind the data layer. Page settings may be supplied as JSON
//! in a `<script type="application/json" id="consent-settings">` element.
#![cfg(target_arch = "wasm32")]

mod data_layer;
mod page;
mod store;

use client_core::{runtime, ConsentController, ConsentSettings};
use tracing::{debug, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};
use tracing_web::MakeWebConsoleWriter;
use wasm_bindgen::prelude::*;
use web_sys::Document;

pub use data_layer::WindowDataLayer;
pub use page::BrowserPage;
pub use store::LocalStorageStore;

const SETTINGS_ELEMENT_ID: &str = "consent-settings";

#[wasm_bindgen(start)]
pub fn start() {
    init_logging();

    let (events_tx, events_rx) = futures::channel::mpsc::unbounded();

    let page = match BrowserPage::new(events_tx) {
        Ok(page) => page,
        Err(err) => {
            warn!(error = %err, "consent gate disabled: no usable document");
            return;
        }
    };
    let settings = read_page_settings(page.document());

    let mut controller =
        match ConsentController::new(settings, LocalStorageStore, page, WindowDataLayer) {
            Ok(controller) => controller,
            Err(err) => {
                warn!(error = %err, "consent gate disabled: invalid settings");
                return;
            }
        };

    wasm_bindgen_futures::spawn_local(async move {
        runtime::start(&mut controller).await;
        runtime::run(&mut controller, events_rx).await;
    });
}

/// Routes `tracing` events to the browser console.
fn init_logging() {
    // `std::time::SystemTime` is unavailable in the browser, so no timestamps.
    let console = fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());
    if tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(console)
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
}

fn read_page_settings(document: &Document) -> ConsentSettings {
    let Some(raw) = document
        .get_element_by_id(SETTINGS_ELEMENT_ID)
        .and_then(|element| element.text_content())
    else {
        return ConsentSettings::default();
    };

    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(error = %err, "ignoring malformed #{SETTINGS_ELEMENT_ID} settings");
        ConsentSettings::default()
    })
}
