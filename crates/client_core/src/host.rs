//! Page capabilities the consent controller needs, and the events a page feeds back.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::error::HostError;

/// Opaque reference to an element created through a [`PageHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    Head,
    Body,
}

impl Mount {
    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
        }
    }
}

/// Callbacks scheduled through a [`PageHost`] come back as events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Click { element_id: String },
    AnimationFrame(FrameToken),
    TimerElapsed(TimerToken),
}

/// The DOM surface used by the consent controller.
///
/// Everything is synchronous; deferred work is requested with
/// [`schedule_after_paint`](PageHost::schedule_after_paint) and
/// [`schedule_after_delay`](PageHost::schedule_after_delay) and delivered
/// later as a [`PageEvent`].
pub trait PageHost {
    fn create_element(&mut self, tag: &str) -> Result<ElementHandle, HostError>;
    fn set_attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
        value: &str,
    ) -> Result<(), HostError>;
    fn set_text_content(&mut self, element: ElementHandle, text: &str) -> Result<(), HostError>;
    fn set_inner_html(&mut self, element: ElementHandle, html: &str) -> Result<(), HostError>;
    fn append_child(&mut self, mount: Mount, element: ElementHandle) -> Result<(), HostError>;
    fn add_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError>;
    fn remove_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError>;
    fn remove_element(&mut self, element: ElementHandle) -> Result<(), HostError>;
    /// Delivers clicks on `#element_id` inside `scope` as [`PageEvent::Click`].
    fn listen_click(&mut self, scope: ElementHandle, element_id: &str) -> Result<(), HostError>;
    /// Fires [`PageEvent::AnimationFrame`] once the current layout has painted.
    fn schedule_after_paint(&mut self) -> Result<FrameToken, HostError>;
    /// Fires [`PageEvent::TimerElapsed`] no earlier than `delay` from now.
    fn schedule_after_delay(&mut self, delay: Duration) -> Result<TimerToken, HostError>;
    fn now(&self) -> DateTime<Utc>;
}
