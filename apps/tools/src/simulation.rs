//! One simulated page load against a real consent store.

use anyhow::{Context, Result};
use client_core::{
    banner::{ACCEPT_ID, BANNER_ID, DECLINE_ID},
    ConsentController, ConsentSettings, DataLayer, PageEvent, PageHost, SharedDataLayer,
    VirtualPage,
};
use serde::Serialize;
use shared::{
    domain::{ConsentChoice, ConsentStatus},
    protocol::DataLayerEntry,
    store::ConsentStore,
};

#[derive(Debug, Serialize)]
pub struct VisitReport {
    pub status_on_load: ConsentStatus,
    pub status_after: ConsentStatus,
    pub banner_shown: bool,
    /// `None` when no click was requested; `Some(false)` when there was no banner to click.
    pub choice_applied: Option<bool>,
    pub banner_present_at_end: bool,
    pub analytics_loads: u32,
    pub script_requests: Vec<String>,
    pub data_layer: Vec<DataLayerEntry>,
    pub page: String,
}

/// Loads the page, paints the first frame, optionally clicks one banner
/// control, then lets the dismissal transition run out.
pub async fn simulate_visit<S: ConsentStore>(
    store: S,
    settings: ConsentSettings,
    data_layer: SharedDataLayer,
    choice: Option<ConsentChoice>,
) -> Result<VisitReport> {
    let mut controller = ConsentController::new(settings, store, VirtualPage::new(), data_layer)?;

    let status_on_load = controller
        .initialize()
        .await
        .context("page initialization failed")?;
    let banner_shown = controller.host().element_by_id(BANNER_ID).is_some();

    let frame_events = controller.host_mut().next_frame();
    pump(&mut controller, frame_events).await?;

    let choice_applied = match choice {
        None => None,
        Some(choice) => {
            let control = match choice {
                ConsentChoice::Accept => ACCEPT_ID,
                ConsentChoice::Decline => DECLINE_ID,
            };
            match controller.host().click(control) {
                Some(click) => {
                    controller.handle_event(click).await?;
                    Some(true)
                }
                None => {
                    tracing::warn!(?choice, status = ?status_on_load, "no banner on this visit; choice not recorded");
                    Some(false)
                }
            }
        }
    };

    let transition = controller.settings().transition();
    let timer_events = controller.host_mut().advance(transition);
    pump(&mut controller, timer_events).await?;

    let host = controller.host();
    Ok(VisitReport {
        status_on_load,
        status_after: controller.status(),
        banner_shown,
        choice_applied,
        banner_present_at_end: host.element_by_id(BANNER_ID).is_some(),
        analytics_loads: controller.analytics_loads(),
        script_requests: host
            .scripts()
            .into_iter()
            .filter_map(|script| script.attribute("src").map(str::to_string))
            .collect(),
        data_layer: controller.data_layer().entries(),
        page: host.render(),
    })
}

async fn pump<S, H, D>(
    controller: &mut ConsentController<S, H, D>,
    events: Vec<PageEvent>,
) -> Result<()>
where
    S: ConsentStore,
    H: PageHost,
    D: DataLayer,
{
    for event in events {
        controller.handle_event(event).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/simulation_tests.rs"]
mod tests;
