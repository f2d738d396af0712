//! WebAssembly front-end for the Myo operator console.
//!
//! Load the module from the console page and create a [`Console`]:
//!
//! ```js
//! import init, { Console } from "./pkg/myo_web.js";
//!
//! await init();
//! const console = new Console();
//! document.getElementById("ID_TRAIN").onmousedown = () => console.press("Train");
//! ```

mod dom;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use myo_types::control::{self, Button, MotionTesterParams, Switch, TacParams, TacVariant};
use myo_types::status::dispatch_frame;
use myo_types::{Gallery, GalleryEntry, Message};
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

pub use dom::DomView;

/// Id of the operator log input.
pub const LOG_INPUT_ID: &str = "ID_LOG_MSG";

/// Initialize the WASM module (called automatically)
#[wasm_bindgen(start)]
pub fn init() {
    log("Myo console module initialized");
}

/// Log a message to the browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

pub(crate) fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

/// WebSocket URL for a console page served from `hostname:port`.
pub fn socket_url(hostname: &str, port: &str) -> String {
    if port.is_empty() {
        format!("ws://{hostname}/ws")
    } else {
        format!("ws://{hostname}:{port}/ws")
    }
}

/// Find the switch whose element has the given id.
pub fn switch_for_element(id: &str) -> Option<Switch> {
    Switch::ALL.into_iter().find(|s| s.element_id() == id)
}

/// TAC variant by joint count (`1` or `3`).
pub fn tac_variant(joints: u8) -> Option<TacVariant> {
    match joints {
        1 => Some(TacVariant::Tac1),
        3 => Some(TacVariant::Tac3),
        _ => None,
    }
}

/// Connection between the console page and the backend.
#[wasm_bindgen]
pub struct Console {
    socket: WebSocket,
    gallery: Rc<RefCell<Gallery>>,
    view: DomView,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

#[wasm_bindgen]
impl Console {
    /// Connect to `/ws` on the host that served the page.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Console, JsValue> {
        let location = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))?
            .location();
        let url = socket_url(&location.hostname()?, &location.port()?);
        Self::connect(&url)
    }

    /// Connect to an explicit WebSocket URL.
    pub fn connect(url: &str) -> Result<Console, JsValue> {
        let view = DomView::from_window().ok_or_else(|| JsValue::from_str("no document"))?;
        log(&format!("Connecting to {url}"));
        let socket = WebSocket::new(url)?;

        let open_socket = socket.clone();
        let on_open = Closure::wrap(Box::new(move |_: Event| {
            log("Console connected");
            let sync = control::time_sync(js_sys::Date::now() as i64);
            if let Err(e) = open_socket.send_with_str(&sync.encode()) {
                warn(&format!("Failed to send clock sync: {e:?}"));
            }
        }) as Box<dyn FnMut(Event)>);
        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let mut status_view = view.clone();
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(frame) = event.data().as_string() else {
                warn("Ignoring non-text frame");
                return;
            };
            if !dispatch_frame(&mut status_view, &frame) {
                web_sys::console::debug_1(&format!("Unhandled status frame '{frame}'").into());
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
            log(&format!("Console connection closed ({})", event.code()));
        }) as Box<dyn FnMut(CloseEvent)>);
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Console {
            socket,
            gallery: Rc::new(RefCell::new(Gallery::default())),
            view,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        })
    }

    /// Send a raw `<Tag>:<Payload>` frame.
    #[wasm_bindgen(js_name = sendCommand)]
    pub fn send_command(&self, frame: &str) -> Result<(), JsValue> {
        log(&format!("SEND: {frame}"));
        self.socket.send_with_str(frame)
    }

    /// Press a console button by its command word (e.g. `"Train"`).
    pub fn press(&self, button: &str) -> Result<(), JsValue> {
        let button = Button::from_str(button).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.send(&button.command())
    }

    /// Report a switch position by the switch's element id.
    pub fn toggle(&self, element_id: &str, on: bool) -> Result<(), JsValue> {
        let switch = switch_for_element(element_id)
            .ok_or_else(|| JsValue::from_str(&format!("unknown switch '{element_id}'")))?;
        self.send(&switch.command(on))
    }

    /// Start the motion tester assessment.
    #[wasm_bindgen(js_name = startMotionTester)]
    pub fn start_motion_tester(
        &self,
        repetitions: u32,
        timeout: f64,
        max_classifications: u32,
    ) -> Result<(), JsValue> {
        let params = MotionTesterParams {
            repetitions,
            timeout,
            max_classifications,
        };
        self.send(&params.command())
    }

    /// Start a target achievement control assessment with 1 or 3 joints.
    #[wasm_bindgen(js_name = startTac)]
    pub fn start_tac(
        &self,
        joints: u8,
        repetitions: u32,
        timeout: f64,
        dwell_time: f64,
        degree_error: f64,
        grasp_error: f64,
    ) -> Result<(), JsValue> {
        let variant = tac_variant(joints)
            .ok_or_else(|| JsValue::from_str(&format!("no TAC variant for {joints} joints")))?;
        let params = TacParams {
            repetitions,
            timeout,
            dwell_time,
            degree_error,
            grasp_error,
        };
        self.send(&params.command(variant))
    }

    /// Drive a motion class manually.
    pub fn manual(&self, class: &str) -> Result<(), JsValue> {
        self.send(&control::manual(class))
    }

    /// Replace the gallery with the JSON returned by `/api/gallery`.
    #[wasm_bindgen(js_name = setGallery)]
    pub fn set_gallery(&self, json: &str) -> Result<usize, JsValue> {
        let entries: Vec<GalleryEntry> =
            serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let count = entries.len();
        *self.gallery.borrow_mut() = Gallery::new(entries);
        Ok(count)
    }

    /// Gallery slide change hook: selects the slide's class for training.
    #[wasm_bindgen(js_name = onSlide)]
    pub fn on_slide(&self, index: usize) -> Result<(), JsValue> {
        let command = self.gallery.borrow().slide_command(index);
        match command {
            Some(command) => self.send(&command),
            None => {
                warn(&format!("No gallery slide {index}"));
                Ok(())
            }
        }
    }

    /// Log submit hook: sends the operator log input as a `Log:` entry.
    #[wasm_bindgen(js_name = submitLog)]
    pub fn submit_log(&self) -> Result<(), JsValue> {
        let text = self
            .view
            .input_value(LOG_INPUT_ID)
            .ok_or_else(|| JsValue::from_str("log input not found"))?;
        self.send(&control::log_entry(&text))
    }

    pub fn close(&self) -> Result<(), JsValue> {
        self.socket.close()
    }
}

impl Console {
    fn send(&self, message: &Message) -> Result<(), JsValue> {
        self.send_command(&message.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url() {
        assert_eq!(socket_url("localhost", "8080"), "ws://localhost:8080/ws");
        assert_eq!(socket_url("console.lan", ""), "ws://console.lan/ws");
    }

    #[test]
    fn test_switch_for_element() {
        assert_eq!(switch_for_element("trainSwitch"), Some(Switch::Train));
        assert_eq!(switch_for_element("autoSave"), Some(Switch::AutoSave));
        assert_eq!(switch_for_element("ID_TRAIN"), None);
    }

    #[test]
    fn test_tac_variant() {
        assert_eq!(tac_variant(1), Some(TacVariant::Tac1));
        assert_eq!(tac_variant(3), Some(TacVariant::Tac3));
        assert_eq!(tac_variant(2), None);
    }
}
