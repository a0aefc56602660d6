use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use client_core::{ElementHandle, FrameToken, Mount, PageEvent, PageHost, TimerToken};
use futures::channel::mpsc::UnboundedSender;
use shared::error::HostError;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, Element, Window};

fn js_failure(operation: &'static str) -> impl Fn(JsValue) -> HostError {
    move |err| HostError::operation(operation, format!("{err:?}"))
}

/// The live document. Callbacks are forwarded to the consent event pump.
pub struct BrowserPage {
    window: Window,
    document: Document,
    elements: Vec<Element>,
    events: UnboundedSender<PageEvent>,
    click_handlers: Vec<Closure<dyn FnMut()>>,
    next_token: u64,
}

impl BrowserPage {
    pub fn new(events: UnboundedSender<PageEvent>) -> Result<Self, HostError> {
        let window = web_sys::window().ok_or(HostError::MissingMount("window"))?;
        let document = window
            .document()
            .ok_or(HostError::MissingMount("document"))?;
        Ok(Self {
            window,
            document,
            elements: Vec::new(),
            events,
            click_handlers: Vec::new(),
            next_token: 1,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn element(&self, handle: ElementHandle) -> Result<&Element, HostError> {
        self.elements
            .get(handle.0)
            .ok_or(HostError::UnknownElement(handle.0))
    }

    fn token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    /// A one-shot JS callback that forwards `event` to the pump.
    fn forward_once(&self, event: PageEvent) -> JsValue {
        let events = self.events.clone();
        Closure::once_into_js(move || {
            let _ = events.unbounded_send(event);
        })
    }
}

impl PageHost for BrowserPage {
    fn create_element(&mut self, tag: &str) -> Result<ElementHandle, HostError> {
        let element = self
            .document
            .create_element(tag)
            .map_err(js_failure("createElement"))?;
        self.elements.push(element);
        Ok(ElementHandle(self.elements.len() - 1))
    }

    fn set_attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        self.element(element)?
            .set_attribute(name, value)
            .map_err(js_failure("setAttribute"))
    }

    fn set_text_content(&mut self, element: ElementHandle, text: &str) -> Result<(), HostError> {
        self.element(element)?.set_text_content(Some(text));
        Ok(())
    }

    fn set_inner_html(&mut self, element: ElementHandle, html: &str) -> Result<(), HostError> {
        self.element(element)?.set_inner_html(html);
        Ok(())
    }

    fn append_child(&mut self, mount: Mount, element: ElementHandle) -> Result<(), HostError> {
        let child = self.element(element)?;
        let appended = match mount {
            Mount::Head => self
                .document
                .head()
                .ok_or(HostError::MissingMount(mount.name()))?
                .append_child(child),
            Mount::Body => self
                .document
                .body()
                .ok_or(HostError::MissingMount(mount.name()))?
                .append_child(child),
        };
        appended.map(|_| ()).map_err(js_failure("appendChild"))
    }

    fn add_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError> {
        self.element(element)?
            .class_list()
            .add_1(class)
            .map_err(js_failure("classList.add"))
    }

    fn remove_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError> {
        self.element(element)?
            .class_list()
            .remove_1(class)
            .map_err(js_failure("classList.remove"))
    }

    fn remove_element(&mut self, element: ElementHandle) -> Result<(), HostError> {
        self.element(element)?.remove();
        Ok(())
    }

    fn listen_click(&mut self, scope: ElementHandle, element_id: &str) -> Result<(), HostError> {
        let target = self
            .element(scope)?
            .query_selector(&format!("#{element_id}"))
            .map_err(js_failure("querySelector"))?
            .ok_or_else(|| HostError::MissingControl(element_id.to_string()))?;

        let events = self.events.clone();
        let id = element_id.to_string();
        let handler = Closure::<dyn FnMut()>::new(move || {
            let _ = events.unbounded_send(PageEvent::Click {
                element_id: id.clone(),
            });
        });
        target
            .add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())
            .map_err(js_failure("addEventListener"))?;
        self.click_handlers.push(handler);
        Ok(())
    }

    fn schedule_after_paint(&mut self) -> Result<FrameToken, HostError> {
        let token = FrameToken(self.token());
        let callback = self.forward_once(PageEvent::AnimationFrame(token));
        self.window
            .request_animation_frame(callback.unchecked_ref())
            .map_err(js_failure("requestAnimationFrame"))?;
        Ok(token)
    }

    fn schedule_after_delay(&mut self, delay: Duration) -> Result<TimerToken, HostError> {
        let token = TimerToken(self.token());
        let callback = self.forward_once(PageEvent::TimerElapsed(token));
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                millis,
            )
            .map_err(js_failure("setTimeout"))?;
        Ok(token)
    }

    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(js_sys::Date::now() as i64)
            .single()
            .unwrap_or_default()
    }
}
