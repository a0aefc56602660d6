use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use shared::{
    domain::CONSENT_STORAGE_KEY, error::HostError, protocol::DataLayerEntry,
    store::MemoryConsentStore,
};

use super::*;
use crate::{data_layer::SharedDataLayer, runtime, virtual_page::VirtualPage};

type TestController = ConsentController<MemoryConsentStore, VirtualPage, SharedDataLayer>;

fn test_page() -> VirtualPage {
    VirtualPage::starting_at(
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0)
            .single()
            .expect("start time"),
    )
}

fn controller_with(store: MemoryConsentStore, layer: SharedDataLayer) -> TestController {
    ConsentController::new(ConsentSettings::default(), store, test_page(), layer)
        .expect("controller")
}

async fn pump(controller: &mut TestController, events: Vec<PageEvent>) {
    for event in events {
        controller.handle_event(event).await.expect("handle event");
    }
}

async fn paint(controller: &mut TestController) {
    let events = controller.host_mut().next_frame();
    pump(controller, events).await;
}

async fn click(controller: &mut TestController, element_id: &str) {
    let event = controller
        .host()
        .click(element_id)
        .expect("control should be clickable");
    controller.handle_event(event).await.expect("click");
}

async fn advance(controller: &mut TestController, by: Duration) {
    let events = controller.host_mut().advance(by);
    pump(controller, events).await;
}

fn stored(store: &MemoryConsentStore) -> Option<String> {
    store.snapshot().get(CONSENT_STORAGE_KEY).cloned()
}

#[tokio::test]
async fn unset_status_shows_banner_without_analytics() {
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(MemoryConsentStore::new(), layer.clone());

    let status = controller.initialize().await.expect("init");

    assert_eq!(status, ConsentStatus::Unset);
    assert!(controller.host().element_by_id(BANNER_ID).is_some());
    assert!(controller.host().scripts().is_empty());
    assert_eq!(controller.analytics_loads(), 0);
    assert!(!layer.exists());
}

#[tokio::test]
async fn granted_status_loads_analytics_without_banner() {
    let store = MemoryConsentStore::with_item(CONSENT_STORAGE_KEY, "granted");
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(store, layer.clone());

    controller.initialize().await.expect("init");

    assert!(controller.host().element_by_id(BANNER_ID).is_none());
    assert_eq!(controller.analytics_loads(), 1);

    let scripts = controller.host().scripts();
    assert_eq!(scripts.len(), 1);
    assert_eq!(
        scripts[0].attribute("src"),
        Some("https://www.googletagmanager.com/gtag/js?id=G-NDB2TZPVDS")
    );
    assert_eq!(scripts[0].attribute("async"), Some(""));

    assert!(layer.dispatch_installed());
    let entries = layer.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0],
        DataLayerEntry(vec![json!("js"), json!("2026-10-18T09:00:00.000Z")])
    );
    assert_eq!(
        entries[1],
        DataLayerEntry(vec![
            json!("config"),
            json!("G-NDB2TZPVDS"),
            json!({"anonymize_ip": true})
        ])
    );
}

#[tokio::test]
async fn denied_status_shows_nothing_and_loads_nothing() {
    let store = MemoryConsentStore::with_item(CONSENT_STORAGE_KEY, "denied");
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(store, layer.clone());

    let status = controller.initialize().await.expect("init");

    assert_eq!(status, ConsentStatus::Denied);
    assert!(controller.host().element_by_id(BANNER_ID).is_none());
    assert!(controller.host().scripts().is_empty());
    assert_eq!(controller.host().pending_frames(), 0);
    assert!(!layer.exists());
}

#[tokio::test]
async fn banner_slides_in_only_after_first_frame() {
    let mut controller = controller_with(MemoryConsentStore::new(), SharedDataLayer::new());
    controller.initialize().await.expect("init");

    let banner = controller.host().element_by_id(BANNER_ID).expect("banner");
    assert!(!banner.has_class(VISIBLE_CLASS));
    assert!(matches!(
        controller.banner_phase(),
        Some(BannerPhase::Entering(_))
    ));

    paint(&mut controller).await;

    let banner = controller.host().element_by_id(BANNER_ID).expect("banner");
    assert!(banner.has_class(VISIBLE_CLASS));
    assert_eq!(controller.banner_phase(), Some(BannerPhase::Visible));
}

#[tokio::test]
async fn accept_persists_grant_and_loads_analytics_once() {
    let store = MemoryConsentStore::new();
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(store.clone(), layer.clone());
    controller.initialize().await.expect("init");
    paint(&mut controller).await;

    click(&mut controller, ACCEPT_ID).await;
    // Second click lands while the banner is sliding out.
    click(&mut controller, ACCEPT_ID).await;

    assert_eq!(stored(&store).as_deref(), Some("granted"));
    assert_eq!(controller.status(), ConsentStatus::Granted);
    assert_eq!(controller.analytics_loads(), 1);
    assert_eq!(controller.host().scripts().len(), 1);
    assert_eq!(layer.entries().len(), 2);
}

#[tokio::test]
async fn accept_loads_analytics_before_banner_is_removed() {
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(MemoryConsentStore::new(), layer.clone());
    controller.initialize().await.expect("init");
    paint(&mut controller).await;

    click(&mut controller, ACCEPT_ID).await;

    let banner = controller.host().element_by_id(BANNER_ID).expect("still mounted");
    assert!(!banner.has_class(VISIBLE_CLASS));
    assert_eq!(controller.analytics_loads(), 1);
    assert_eq!(layer.entries().len(), 2);
}

#[tokio::test]
async fn decline_persists_denial_without_analytics() {
    let store = MemoryConsentStore::new();
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(store.clone(), layer.clone());
    controller.initialize().await.expect("init");
    paint(&mut controller).await;

    click(&mut controller, DECLINE_ID).await;
    advance(&mut controller, Duration::from_millis(500)).await;

    assert_eq!(stored(&store).as_deref(), Some("denied"));
    assert_eq!(controller.status(), ConsentStatus::Denied);
    assert_eq!(controller.analytics_loads(), 0);
    assert!(controller.host().scripts().is_empty());
    assert!(!layer.exists());
}

#[tokio::test]
async fn banner_is_removed_only_after_transition_elapses() {
    let mut controller = controller_with(MemoryConsentStore::new(), SharedDataLayer::new());
    controller.initialize().await.expect("init");
    paint(&mut controller).await;
    click(&mut controller, DECLINE_ID).await;

    advance(&mut controller, Duration::from_millis(499)).await;
    assert!(controller.host().element_by_id(BANNER_ID).is_some());

    advance(&mut controller, Duration::from_millis(1)).await;
    assert!(controller.host().element_by_id(BANNER_ID).is_none());
    assert_eq!(controller.banner_phase(), None);
    assert!(controller.host().click(ACCEPT_ID).is_none());
}

#[tokio::test]
async fn existing_queue_entries_survive_analytics_loading() {
    let prior = DataLayerEntry(vec![json!("consent"), json!("default")]);
    let layer = SharedDataLayer::with_entries(vec![prior.clone()]);
    let mut controller = controller_with(MemoryConsentStore::new(), layer.clone());
    controller.initialize().await.expect("init");
    paint(&mut controller).await;

    click(&mut controller, ACCEPT_ID).await;

    let entries = layer.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0], prior);
    assert_eq!(entries[1].command_name(), Some("js"));
    assert_eq!(entries[2].command_name(), Some("config"));
}

#[tokio::test]
async fn click_before_first_frame_skips_slide_in() {
    let mut controller = controller_with(MemoryConsentStore::new(), SharedDataLayer::new());
    controller.initialize().await.expect("init");

    click(&mut controller, DECLINE_ID).await;
    paint(&mut controller).await;

    let banner = controller.host().element_by_id(BANNER_ID).expect("banner");
    assert!(!banner.has_class(VISIBLE_CLASS));
    assert!(matches!(
        controller.banner_phase(),
        Some(BannerPhase::Dismissing(_))
    ));
}

#[tokio::test]
async fn unrecognized_stored_value_is_reported_and_ignored() {
    let store = MemoryConsentStore::with_item(CONSENT_STORAGE_KEY, "maybe");
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(store, layer.clone());

    let err = controller.initialize().await.expect_err("foreign value");

    assert!(matches!(err, ConsentError::UnrecognizedStatus(_)));
    assert!(controller.host().element_by_id(BANNER_ID).is_none());
    assert!(!layer.exists());
}

#[tokio::test]
async fn duplicate_show_banner_keeps_single_banner() {
    let mut controller = controller_with(MemoryConsentStore::new(), SharedDataLayer::new());
    controller.initialize().await.expect("init");

    controller.show_banner().expect("second show");

    let banners = controller
        .host()
        .attached(Mount::Body)
        .filter(|element| element.id() == Some(BANNER_ID))
        .count();
    assert_eq!(banners, 1);
    assert_eq!(controller.host().pending_frames(), 1);
}

#[tokio::test]
async fn load_analytics_is_not_guarded_against_repeat_calls() {
    let layer = SharedDataLayer::new();
    let mut controller = controller_with(MemoryConsentStore::new(), layer.clone());

    controller.load_analytics().expect("first load");
    controller.load_analytics().expect("second load");

    assert_eq!(controller.analytics_loads(), 2);
    assert_eq!(controller.host().scripts().len(), 2);
    assert_eq!(layer.entries().len(), 4);
}

#[tokio::test]
async fn decline_then_reload_stays_silent() {
    let store = MemoryConsentStore::new();
    let mut first_visit = controller_with(store.clone(), SharedDataLayer::new());
    first_visit.initialize().await.expect("init");
    paint(&mut first_visit).await;
    click(&mut first_visit, DECLINE_ID).await;
    let transition = first_visit.settings().transition();
    advance(&mut first_visit, transition).await;
    assert!(first_visit.host().element_by_id(BANNER_ID).is_none());

    let layer = SharedDataLayer::new();
    let mut reload = controller_with(store.clone(), layer.clone());
    let status = reload.initialize().await.expect("reload");

    assert_eq!(status, ConsentStatus::Denied);
    assert!(reload.host().element_by_id(BANNER_ID).is_none());
    assert!(reload.host().scripts().is_empty());
    assert!(!layer.exists());
}

#[tokio::test]
async fn event_stream_drives_full_accept_flow() {
    let store = MemoryConsentStore::new();
    let mut controller = controller_with(store.clone(), SharedDataLayer::new());
    runtime::start(&mut controller).await;

    let mut events = controller.host_mut().next_frame();
    events.push(PageEvent::Click {
        element_id: ACCEPT_ID.to_string(),
    });
    runtime::run(&mut controller, futures::stream::iter(events)).await;

    let removal = controller.host_mut().advance(Duration::from_millis(500));
    runtime::run(&mut controller, futures::stream::iter(removal)).await;

    assert_eq!(stored(&store).as_deref(), Some("granted"));
    assert!(controller.host().element_by_id(BANNER_ID).is_none());
    assert_eq!(controller.analytics_loads(), 1);
}

#[test]
fn rejects_invalid_script_endpoint() {
    let settings = ConsentSettings {
        script_endpoint: "ftp://example.com/gtag".into(),
        ..ConsentSettings::default()
    };
    let result = ConsentController::new(
        settings,
        MemoryConsentStore::new(),
        test_page(),
        SharedDataLayer::new(),
    );
    assert!(matches!(
        result,
        Err(ConsentError::InvalidEndpoint { .. })
    ));
}

struct UnavailableStore;

#[async_trait]
impl ConsentStore for UnavailableStore {
    async fn get_item(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Err(anyhow::anyhow!("storage disabled"))
    }

    async fn set_item(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("storage disabled"))
    }
}

#[tokio::test]
async fn unavailable_store_shows_nothing() {
    let layer = SharedDataLayer::new();
    let mut controller = ConsentController::new(
        ConsentSettings::default(),
        UnavailableStore,
        test_page(),
        layer.clone(),
    )
    .expect("controller");

    let err = controller.initialize().await.expect_err("store error");

    assert!(matches!(err, ConsentError::Store(_)));
    assert!(controller.host().element_by_id(BANNER_ID).is_none());
    assert!(!layer.exists());
}

/// A [`VirtualPage`] whose named host operation always fails.
struct FaultyPage {
    page: VirtualPage,
    failing: &'static str,
}

impl FaultyPage {
    fn failing(failing: &'static str) -> Self {
        Self {
            page: test_page(),
            failing,
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), HostError> {
        if self.failing == operation {
            return Err(HostError::operation(operation, "injected failure"));
        }
        Ok(())
    }
}

impl PageHost for FaultyPage {
    fn create_element(&mut self, tag: &str) -> Result<ElementHandle, HostError> {
        self.check("create_element")?;
        self.page.create_element(tag)
    }

    fn set_attribute(
        &mut self,
        element: ElementHandle,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        self.check("set_attribute")?;
        self.page.set_attribute(element, name, value)
    }

    fn set_text_content(&mut self, element: ElementHandle, text: &str) -> Result<(), HostError> {
        self.check("set_text_content")?;
        self.page.set_text_content(element, text)
    }

    fn set_inner_html(&mut self, element: ElementHandle, html: &str) -> Result<(), HostError> {
        self.check("set_inner_html")?;
        self.page.set_inner_html(element, html)
    }

    fn append_child(&mut self, mount: Mount, element: ElementHandle) -> Result<(), HostError> {
        self.check("append_child")?;
        self.page.append_child(mount, element)
    }

    fn add_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError> {
        self.check("add_class")?;
        self.page.add_class(element, class)
    }

    fn remove_class(&mut self, element: ElementHandle, class: &str) -> Result<(), HostError> {
        self.check("remove_class")?;
        self.page.remove_class(element, class)
    }

    fn remove_element(&mut self, element: ElementHandle) -> Result<(), HostError> {
        self.check("remove_element")?;
        self.page.remove_element(element)
    }

    fn listen_click(&mut self, scope: ElementHandle, element_id: &str) -> Result<(), HostError> {
        self.check("listen_click")?;
        self.page.listen_click(scope, element_id)
    }

    fn schedule_after_paint(&mut self) -> Result<FrameToken, HostError> {
        self.check("schedule_after_paint")?;
        self.page.schedule_after_paint()
    }

    fn schedule_after_delay(&mut self, delay: Duration) -> Result<TimerToken, HostError> {
        self.check("schedule_after_delay")?;
        self.page.schedule_after_delay(delay)
    }

    fn now(&self) -> DateTime<Utc> {
        self.page.now()
    }
}

fn faulty_controller(
    store: MemoryConsentStore,
    layer: SharedDataLayer,
    failing: &'static str,
) -> ConsentController<MemoryConsentStore, FaultyPage, SharedDataLayer> {
    ConsentController::new(
        ConsentSettings::default(),
        store,
        FaultyPage::failing(failing),
        layer,
    )
    .expect("controller")
}

#[tokio::test]
async fn accept_loads_analytics_even_when_hiding_banner_fails() {
    let store = MemoryConsentStore::new();
    let layer = SharedDataLayer::new();
    let mut controller = faulty_controller(store.clone(), layer.clone(), "remove_class");
    controller.initialize().await.expect("init");
    let events = controller.host_mut().page.next_frame();
    for event in events {
        controller.handle_event(event).await.expect("frame");
    }

    let accept = PageEvent::Click {
        element_id: ACCEPT_ID.to_string(),
    };
    let err = controller
        .handle_event(accept.clone())
        .await
        .expect_err("hide fails");
    assert!(matches!(err, ConsentError::Host(HostError::Operation { .. })));

    assert_eq!(stored(&store).as_deref(), Some("granted"));
    assert_eq!(controller.analytics_loads(), 1);
    assert_eq!(layer.entries().len(), 2);

    // Repeat clicks after a stored decision are ignored.
    controller.handle_event(accept).await.expect("repeat click");
    assert_eq!(controller.analytics_loads(), 1);
}

#[tokio::test]
async fn banner_is_unmounted_when_controls_cannot_be_wired() {
    let mut controller =
        faulty_controller(MemoryConsentStore::new(), SharedDataLayer::new(), "listen_click");

    let err = controller.initialize().await.expect_err("listen fails");

    assert!(matches!(err, ConsentError::Host(HostError::Operation { .. })));
    assert!(controller.host().page.element_by_id(BANNER_ID).is_none());
    assert_eq!(controller.host().page.pending_frames(), 0);
    assert_eq!(controller.banner_phase(), None);
}

#[tokio::test]
async fn failed_write_leaves_choice_open() {
    let layer = SharedDataLayer::new();
    let mut controller = ConsentController::new(
        ConsentSettings::default(),
        UnavailableStore,
        test_page(),
        layer.clone(),
    )
    .expect("controller");
    controller.show_banner().expect("banner");

    let err = controller
        .handle_event(PageEvent::Click {
            element_id: ACCEPT_ID.to_string(),
        })
        .await
        .expect_err("write fails");

    assert!(matches!(err, ConsentError::Store(_)));
    assert_eq!(controller.status(), ConsentStatus::Unset);
    assert!(matches!(
        controller.banner_phase(),
        Some(BannerPhase::Entering(_))
    ));
    assert!(!layer.exists());
}
