//! In-memory [`PageHost`] with a virtual clock, for tests and the simulation CLI.

use std::{collections::BTreeMap, fmt::Write as _, time::Duration};

use chrono::{DateTime, Utc};
use shared::error::HostError;

use crate::{
    banner::escape_html,
    host::{ElementHandle, FrameToken, Mount, PageEvent, PageHost, TimerToken},
};

#[derive(Debug, Clone, Default)]
pub struct VirtualElement {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub text_content: Option<String>,
    pub inner_html: Option<String>,
    pub mount: Option<Mount>,
}

impl VirtualElement {
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn contains_control(&self, element_id: &str) -> bool {
        self.inner_html
            .as_deref()
            .is_some_and(|html| html.contains(&format!(r#"id="{element_id}""#)))
    }
}

#[derive(Debug, Clone)]
struct PendingTimer {
    due: Duration,
    token: TimerToken,
}

#[derive(Debug, Clone)]
pub struct VirtualPage {
    elements: Vec<VirtualElement>,
    mount_order: Vec<ElementHandle>,
    listeners: Vec<(ElementHandle, String)>,
    pending_frames: Vec<FrameToken>,
    timers: Vec<PendingTimer>,
    next_token: u64,
    started_at: DateTime<Utc>,
    elapsed: Duration,
}

impl Default for VirtualPage {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl VirtualPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            elements: Vec::new(),
            mount_order: Vec::new(),
            listeners: Vec::new(),
            pending_frames: Vec::new(),
            timers: Vec::new(),
            next_token: 1,
            started_at,
            elapsed: Duration::ZERO,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn element(&self, handle: ElementHandle) -> Option<&VirtualElement> {
        self.elements.get(handle.0)
    }

    /// Attached elements under `mount`, in insertion order.
    pub fn attached(&self, mount: Mount) -> impl Iterator<Item = &VirtualElement> + '_ {
        self.mount_order
            .iter()
            .filter_map(|handle| self.elements.get(handle.0))
            .filter(move |element| element.mount == Some(mount))
    }

    pub fn element_by_id(&self, id: &str) -> Option<&VirtualElement> {
        self.mount_order
            .iter()
            .filter_map(|handle| self.elements.get(handle.0))
            .find(|element| element.id() == Some(id))
    }

    pub fn scripts(&self) -> Vec<&VirtualElement> {
        self.attached(Mount::Head)
            .filter(|element| element.tag == "script")
            .collect()
    }

    pub fn pending_frames(&self) -> usize {
        self.pending_frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Paints the current layout and returns the animation-frame callbacks it releases.
    pub fn next_frame(&mut self) -> Vec<PageEvent> {
        self.pending_frames
            .drain(..)
            .map(PageEvent::AnimationFrame)
            .collect()
    }

    /// Moves the clock forward and returns every timer that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<PageEvent> {
        self.elapsed += by;
        let now = self.elapsed;

        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|timer| timer.due <= now);
        self.timers = pending;
        due.sort_by_key(|timer| (timer.due, timer.token.0));
        due.into_iter()
            .map(|timer| PageEvent::TimerElapsed(timer.token))
            .collect()
    }

    /// A click on `#element_id`, if a listener is registered and its banner is on the page.
    pub fn click(&self, element_id: &str) -> Option<PageEvent> {
        let reachable = self.listeners.iter().any(|(scope, id)| {
            id == element_id
                && self
                    .element(*scope)
                    .is_some_and(|el| el.mount.is_some() && el.contains_control(element_id))
        });
        reachable.then(|| PageEvent::Click {
            element_id: element_id.to_string(),
        })
    }

    /// Serializes the attached tree, one element per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for mount in [Mount::Head, Mount::Body] {
            let _ = writeln!(out, "<{}>", mount.name());
            for element in self.attached(mount) {
                let _ = write!(out, "  <{}", element.tag);
                for (name, value) in &element.attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, r#" {name}="{}""#, escape_html(value));
                    }
                }
                if !element.classes.is_empty() {
                    let _ = write!(out, r#" class="{}""#, element.classes.join(" "));
                }
                let body_len = element
                    .inner_html
                    .as_deref()
                    .or(element.text_content.as_deref())
                    .map_or(0, str::len);
                let _ = writeln!(out, "> ({body_len} bytes) </{}>", element.tag);
            }
            let _ = writeln!(out, "</{}>", mount.name());
        }
        out
    }

    fn token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    fn element_mut(&mut self, handle: ElementHandle) -> Result<&mut VirtualElement, HostError> {
        self.elements
            .get_mut(handle.0)
            .ok_or(HostError::UnknownElement(handle.0))
    }
}

impl PageHost for VirtualPage {
    fn create_element(&mut self, tag: &str) -> Result<ElementHandle, HostError> {
        self.elements.push(VirtualElement {
            tag: tag.to_ascii_lowercase(),
            ..VirtualElement::default()
        });
        Ok(ElementHandle(self.elements.len() - 1))
    }

    fn set_attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        self.element_mut(element)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_text_content(&mut self, element: ElementHandle, text: &str) -> Result<(), HostError> {
        let element = self.element_mut(element)?;
        element.text_content = Some(text.to_string());
        element.inner_html = None;
        Ok(())
    }

    fn set_inner_html(&mut self, element: ElementHandle, html: &str) -> Result<(), HostError> {
        let element = self.element_mut(element)?;
        element.inner_html = Some(html.to_string());
        element.text_content = None;
        Ok(())
    }

    fn append_child(&mut self, mount: Mount, element: ElementHandle) -> Result<(), HostError> {
        self.element_mut(element)?.mount = Some(mount);
        self.mount_order.retain(|handle| *handle != element);
        self.mount_order.push(element);
        Ok(())
    }

    fn add_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError> {
        let element = self.element_mut(element)?;
        if !element.has_class(class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError> {
        self.element_mut(element)?.classes.retain(|c| c != class);
        Ok(())
    }

    fn remove_element(&mut self, element: ElementHandle) -> Result<(), HostError> {
        self.element_mut(element)?.mount = None;
        self.mount_order.retain(|handle| *handle != element);
        Ok(())
    }

    fn listen_click(&mut self, scope: ElementHandle, element_id: &str) -> Result<(), HostError> {
        let contains = self.element_mut(scope)?.contains_control(element_id);
        if !contains {
            return Err(HostError::MissingControl(element_id.to_string()));
        }
        self.listeners.push((scope, element_id.to_string()));
        Ok(())
    }

    fn schedule_after_paint(&mut self) -> Result<FrameToken, HostError> {
        let token = FrameToken(self.token());
        self.pending_frames.push(token);
        Ok(token)
    }

    fn schedule_after_delay(&mut self, delay: Duration) -> Result<TimerToken, HostError> {
        let token = TimerToken(self.token());
        self.timers.push(PendingTimer {
            due: self.elapsed + delay,
            token,
        });
        Ok(token)
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed).unwrap_or(chrono::Duration::zero());
        self.started_at + elapsed
    }
}

#[cfg(test)]
#[path = "tests/virtual_page_tests.rs"]
mod tests;
