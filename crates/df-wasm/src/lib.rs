//! WebAssembly content script for DisFilter
//!
//! Binds the `df-core` engine to the live listing page: the DOM through
//! `web_sys`, the debounce timer through `setTimeout`, the popup through
//! `runtime.sendMessage`/`runtime.onMessage` and settings through
//! `storage.local`.

mod dom;
mod extension;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use df_core::protocol::{PersistedState, LOAD_KEYS};
use df_core::styles::stylesheet;
use df_core::{Filter, FilterConfig, FilterError};
use js_sys::{Array, Promise};
use log::{debug, info};
use wasm_bindgen::prelude::*;
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord};

pub use dom::{WebDocument, WebElement};
pub use extension::{from_js, to_js, ExtensionApi, RuntimeChannel, StorageStore, WebTimer};

use extension::js_error;

type Engine = Filter<WebDocument, WebTimer, RuntimeChannel, StorageStore>;

/// Callbacks handed to the page. Dropping one while the page still holds it
/// would make the next invocation throw, so they live as long as the app.
/// The settings-load callbacks are not here: see [`load_settings`].
struct Listeners {
    on_mutations: Closure<dyn FnMut(Array, MutationObserver)>,
    on_message: Closure<dyn FnMut(JsValue)>,
    on_click: Closure<dyn FnMut(web_sys::Event)>,
}

struct App {
    engine: Rc<RefCell<Engine>>,
    api: ExtensionApi,
    document: web_sys::Document,
    observer: MutationObserver,
    listeners: Listeners,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

/// Run `f` against the engine unless it is gone or already borrowed.
fn with_engine<R>(engine: &Weak<RefCell<Engine>>, f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
    let engine = engine.upgrade()?;
    let result = match engine.try_borrow_mut() {
        Ok(mut engine) => Some(f(&mut engine)),
        Err(_) => {
            debug!("DisFilter: engine busy, dropping callback");
            None
        }
    };
    result
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

/// Start filtering the current page. Calling it again while running is a no-op.
#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    if is_running() {
        return Ok(());
    }

    let config = FilterConfig::default();
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    let api = ExtensionApi::detect()?;

    let page = WebDocument::new(window.clone(), document.clone(), &config.toast_class);
    page.inject_style(&config.style_id, &stylesheet(&config))?;

    let engine: Rc<RefCell<Engine>> = Rc::new_cyclic(|weak: &Weak<RefCell<Engine>>| {
        let weak = weak.clone();
        let on_fire: Rc<dyn Fn()> = Rc::new(move || {
            with_engine(&weak, |engine| engine.on_timer());
        });
        RefCell::new(Filter::new(
            page,
            WebTimer::new(window.clone(), on_fire),
            RuntimeChannel::new(api.clone()),
            StorageStore::new(api.clone()),
            config.clone(),
        ))
    });

    let listeners = Listeners {
        on_mutations: on_mutations(Rc::downgrade(&engine)),
        on_message: on_message(Rc::downgrade(&engine)),
        on_click: on_click(Rc::downgrade(&engine), &config),
    };

    // Without a readable store the filter still runs on defaults.
    if let Err(e) = load_settings(&api, &engine) {
        debug!("DisFilter: storage.local.get threw: {}", js_error(&e));
        engine.borrow_mut().load(Err(FilterError::Store(js_error(&e))));
    }

    let observer = MutationObserver::new(listeners.on_mutations.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    let target: web_sys::Node = match document.get_element_by_id(&config.observe_root_id) {
        Some(root) => root.into(),
        None => match document.body() {
            Some(body) => body.into(),
            None => document.clone().into(),
        },
    };
    observer.observe_with_options(&target, &init)?;

    api.call(
        &["runtime", "onMessage"],
        "addListener",
        &Array::of1(listeners.on_message.as_ref()),
    )?;
    document.add_event_listener_with_callback_and_bool(
        "click",
        listeners.on_click.as_ref().unchecked_ref(),
        true,
    )?;

    info!("DisFilter: content script running");
    APP.with(|app| {
        *app.borrow_mut() = Some(App {
            engine,
            api,
            document,
            observer,
            listeners,
        })
    });
    Ok(())
}

/// Detach from the page. Markers and toggles already in the DOM stay.
#[wasm_bindgen]
pub fn stop() {
    let Some(app) = APP.with(|app| app.borrow_mut().take()) else {
        return;
    };
    app.observer.disconnect();
    if let Ok(mut engine) = app.engine.try_borrow_mut() {
        engine.stop();
    }
    if let Err(e) = app.document.remove_event_listener_with_callback_and_bool(
        "click",
        app.listeners.on_click.as_ref().unchecked_ref(),
        true,
    ) {
        debug!("DisFilter: could not remove click listener: {}", js_error(&e));
    }
    if let Err(e) = app.api.call(
        &["runtime", "onMessage"],
        "removeListener",
        &Array::of1(app.listeners.on_message.as_ref()),
    ) {
        debug!("DisFilter: could not remove message listener: {}", js_error(&e));
    }
}

#[wasm_bindgen]
pub fn is_running() -> bool {
    APP.with(|app| app.borrow().is_some())
}

/// Last computed hidden count, 0 when not running.
#[wasm_bindgen]
pub fn hidden_count() -> u32 {
    APP.with(|app| {
        app.borrow()
            .as_ref()
            .and_then(|app| app.engine.try_borrow().ok().map(|engine| engine.state().hidden_count()))
            .unwrap_or(0) as u32
    })
}

/// `storage.local.get(LOAD_KEYS)`. Promise-based hosts settle through
/// `then`; callback-only hosts get `on_loaded` as the callback.
///
/// The read may settle after [`stop`], so its callbacks are leaked once
/// attached instead of living in [`Listeners`]. A late settle only finds the
/// engine gone. An `Err` means nothing was attached.
fn load_settings(api: &ExtensionApi, engine: &Rc<RefCell<Engine>>) -> Result<(), JsValue> {
    let keys: Array = LOAD_KEYS.iter().map(|key| JsValue::from_str(key)).collect();
    let result = api.call(&["storage", "local"], "get", &Array::of1(&keys))?;
    let loaded = on_loaded(Rc::downgrade(engine));
    match result.dyn_into::<Promise>() {
        Ok(promise) => {
            let failed = on_load_failed(Rc::downgrade(engine));
            let _ = promise.then2(&loaded, &failed);
            failed.forget();
        }
        Err(_) => {
            api.call(&["storage", "local"], "get", &Array::of2(&keys, loaded.as_ref()))?;
        }
    }
    loaded.forget();
    Ok(())
}

fn on_loaded(engine: Weak<RefCell<Engine>>) -> Closure<dyn FnMut(JsValue)> {
    Closure::wrap(Box::new(move |items: JsValue| {
        let persisted = from_js(&items)
            .map(|value| PersistedState::from_value(&value))
            .map_err(|e| FilterError::Store(js_error(&e)));
        with_engine(&engine, |engine| engine.load(persisted));
    }) as Box<dyn FnMut(JsValue)>)
}

fn on_load_failed(engine: Weak<RefCell<Engine>>) -> Closure<dyn FnMut(JsValue)> {
    Closure::wrap(Box::new(move |reason: JsValue| {
        let failure = FilterError::Store(js_error(&reason));
        with_engine(&engine, |engine| engine.load(Err(failure)));
    }) as Box<dyn FnMut(JsValue)>)
}

fn on_mutations(engine: Weak<RefCell<Engine>>) -> Closure<dyn FnMut(Array, MutationObserver)> {
    Closure::wrap(Box::new(move |records: Array, _observer: MutationObserver| {
        let added: Vec<WebElement> = records
            .iter()
            .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
            .flat_map(|record| {
                let nodes = record.added_nodes();
                (0..nodes.length()).filter_map(move |i| nodes.get(i)).collect::<Vec<_>>()
            })
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .map(WebElement)
            .collect();
        if !added.is_empty() {
            with_engine(&engine, |engine| engine.on_mutations(&added));
        }
    }) as Box<dyn FnMut(Array, MutationObserver)>)
}

fn on_message(engine: Weak<RefCell<Engine>>) -> Closure<dyn FnMut(JsValue)> {
    Closure::wrap(Box::new(move |message: JsValue| match from_js(&message) {
        Ok(raw) => {
            with_engine(&engine, |engine| engine.handle_raw_message(raw));
        }
        Err(e) => debug!("DisFilter: unreadable message: {}", js_error(&e)),
    }) as Box<dyn FnMut(JsValue)>)
}

/// Delegated toggle activation, registered in the capture phase so the card's
/// own link never sees the click.
fn on_click(engine: Weak<RefCell<Engine>>, config: &FilterConfig) -> Closure<dyn FnMut(web_sys::Event)> {
    let toggle_selector = config.toggle_selector();
    let id_attribute = config.toggle_id_attribute.clone();
    Closure::wrap(Box::new(move |event: web_sys::Event| {
        let toggle = event
            .target()
            .and_then(|target| target.dyn_into::<web_sys::Element>().ok())
            .and_then(|element| element.closest(&toggle_selector).ok().flatten());
        let Some(id) = toggle.and_then(|toggle| toggle.get_attribute(&id_attribute)) else {
            return;
        };
        event.prevent_default();
        event.stop_propagation();
        with_engine(&engine, |engine| engine.toggle_id(&id));
    }) as Box<dyn FnMut(web_sys::Event)>)
}
