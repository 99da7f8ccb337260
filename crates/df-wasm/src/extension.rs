//! Extension host bindings: the `browser`/`chrome` namespace, the outbound
//! channel, the settings store and the debounce timer.

use std::rc::Rc;
use std::time::Duration;

use df_core::protocol::{Channel, OutboundMessage, ProtocolError, Store, SETTINGS_KEY};
use df_core::scheduler::Timer;
use df_core::{FilterError, Ruleset};
use js_sys::{Function, Promise, Reflect};
use log::debug;
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// The WebExtension namespace object. Firefox exposes `browser`, Chromium
/// only `chrome`.
#[derive(Clone)]
pub struct ExtensionApi(JsValue);

impl ExtensionApi {
    pub fn detect() -> Result<Self, JsValue> {
        let global = js_sys::global();
        for name in ["browser", "chrome"] {
            let api = Reflect::get(&global, &JsValue::from_str(name))?;
            if api.is_object() && !Reflect::get(&api, &JsValue::from_str("runtime"))?.is_undefined() {
                return Ok(Self(api));
            }
        }
        Err(JsValue::from_str("no extension API in this context"))
    }

    /// Walk `path` from the namespace root, e.g. `["storage", "local"]`.
    pub fn object(&self, path: &[&str]) -> Result<JsValue, JsValue> {
        let mut target = self.0.clone();
        for key in path {
            target = Reflect::get(&target, &JsValue::from_str(key))?;
            if target.is_undefined() {
                return Err(JsValue::from_str(&format!("missing extension API: {}", path.join("."))));
            }
        }
        Ok(target)
    }

    /// Call `path.method(args...)` with `path` as the receiver.
    pub fn call(&self, path: &[&str], method: &str, args: &js_sys::Array) -> Result<JsValue, JsValue> {
        let receiver = self.object(path)?;
        let function: Function = Reflect::get(&receiver, &JsValue::from_str(method))?.dyn_into()?;
        Reflect::apply(&function, &receiver, args)
    }
}

/// Serialize through JSON text into a JS value.
pub fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&value.to_string())
}

/// Read a JS value back as JSON.
pub fn from_js(value: &JsValue) -> Result<Value, JsValue> {
    let text: String = js_sys::JSON::stringify(value)?.into();
    serde_json::from_str(&text).map_err(|e| JsValue::from_str(&e.to_string()))
}

pub(crate) fn js_error(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// Rejections from fire-and-forget API calls end up here.
fn swallow_rejections(context: &'static str) -> Closure<dyn FnMut(JsValue)> {
    Closure::wrap(Box::new(move |reason: JsValue| {
        debug!("DisFilter: {} rejected: {}", context, js_error(&reason));
    }) as Box<dyn FnMut(JsValue)>)
}

fn observe_rejection(result: JsValue, on_reject: &Closure<dyn FnMut(JsValue)>) {
    if let Ok(promise) = result.dyn_into::<Promise>() {
        let _ = promise.catch(on_reject);
    }
}

/// `runtime.sendMessage` to the popup. A closed popup rejects; that is only
/// logged.
pub struct RuntimeChannel {
    api: ExtensionApi,
    on_reject: Closure<dyn FnMut(JsValue)>,
}

impl RuntimeChannel {
    pub fn new(api: ExtensionApi) -> Self {
        Self {
            api,
            on_reject: swallow_rejections("runtime.sendMessage"),
        }
    }
}

impl Channel for RuntimeChannel {
    fn send(&self, message: &OutboundMessage) -> Result<(), FilterError> {
        let value = to_js(&message.to_value()?).map_err(|e| FilterError::Channel(js_error(&e)))?;
        let result = self
            .api
            .call(&["runtime"], "sendMessage", &js_sys::Array::of1(&value))
            .map_err(|e| FilterError::Channel(js_error(&e)))?;
        observe_rejection(result, &self.on_reject);
        Ok(())
    }
}

/// `storage.local`, written under the settings key.
pub struct StorageStore {
    api: ExtensionApi,
    on_reject: Closure<dyn FnMut(JsValue)>,
}

impl StorageStore {
    pub fn new(api: ExtensionApi) -> Self {
        Self {
            api,
            on_reject: swallow_rejections("storage.local.set"),
        }
    }
}

impl Store for StorageStore {
    fn save_ruleset(&self, ruleset: &Ruleset) -> Result<(), FilterError> {
        let mut items = serde_json::Map::new();
        items.insert(
            SETTINGS_KEY.to_string(),
            serde_json::to_value(ruleset).map_err(ProtocolError::from)?,
        );
        let items = to_js(&Value::Object(items)).map_err(|e| FilterError::Store(js_error(&e)))?;
        let result = self
            .api
            .call(&["storage", "local"], "set", &js_sys::Array::of1(&items))
            .map_err(|e| FilterError::Store(js_error(&e)))?;
        observe_rejection(result, &self.on_reject);
        Ok(())
    }
}

/// `setTimeout`/`clearTimeout`. The pending callback is owned here until the
/// next `start`, so a fired timer never frees its own closure mid-call.
pub struct WebTimer {
    window: web_sys::Window,
    on_fire: Rc<dyn Fn()>,
    pending: Option<Closure<dyn FnMut()>>,
}

impl WebTimer {
    pub fn new(window: web_sys::Window, on_fire: Rc<dyn Fn()>) -> Self {
        Self {
            window,
            on_fire,
            pending: None,
        }
    }
}

impl Timer for WebTimer {
    type Handle = i32;

    fn start(&mut self, delay: Duration) -> i32 {
        let on_fire = Rc::clone(&self.on_fire);
        let callback = Closure::wrap(Box::new(move || on_fire()) as Box<dyn FnMut()>);
        let handle = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                delay.as_millis() as i32,
            )
            .unwrap_or_else(|e| {
                debug!("DisFilter: setTimeout failed: {}", js_error(&e));
                -1
            });
        self.pending = Some(callback);
        handle
    }

    fn cancel(&mut self, handle: i32) {
        self.window.clear_timeout_with_handle(handle);
    }
}
