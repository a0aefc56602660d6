use shared::{
    domain::{ConsentChoice, ConsentStatus},
    error::ConsentError,
    protocol::GtagCommand,
    store::ConsentStore,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    banner::{banner_css, banner_markup, ACCEPT_ID, BANNER_ID, DECLINE_ID, VISIBLE_CLASS},
    data_layer::DataLayer,
    host::{ElementHandle, FrameToken, Mount, PageEvent, PageHost, TimerToken},
    settings::ConsentSettings,
};

/// Where the mounted banner is in its slide-in / slide-out lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerPhase {
    /// Mounted off-screen, waiting for the first painted frame.
    Entering(FrameToken),
    Visible,
    /// A choice was made; the element goes away when the timer fires.
    Dismissing(TimerToken),
}

#[derive(Debug)]
struct MountedBanner {
    root: ElementHandle,
    phase: BannerPhase,
}

/// Gates analytics on the visitor's stored consent for one page load.
pub struct ConsentController<S, H, D> {
    settings: ConsentSettings,
    script_url: Url,
    store: S,
    host: H,
    data_layer: D,
    status: ConsentStatus,
    banner: Option<MountedBanner>,
    analytics_loads: u32,
}

impl<S, H, D> ConsentController<S, H, D>
where
    S: ConsentStore,
    H: PageHost,
    D: DataLayer,
{
    pub fn new(
        settings: ConsentSettings,
        store: S,
        host: H,
        data_layer: D,
    ) -> Result<Self, ConsentError> {
        let script_url = settings.script_url()?;
        Ok(Self {
            settings,
            script_url,
            store,
            host,
            data_layer,
            status: ConsentStatus::Unset,
            banner: None,
            analytics_loads: 0,
        })
    }

    pub fn settings(&self) -> &ConsentSettings {
        &self.settings
    }

    pub fn status(&self) -> ConsentStatus {
        self.status
    }

    pub fn banner_phase(&self) -> Option<BannerPhase> {
        self.banner.as_ref().map(|banner| banner.phase)
    }

    /// Number of times analytics loading ran during this page load.
    pub fn analytics_loads(&self) -> u32 {
        self.analytics_loads
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn data_layer(&self) -> &D {
        &self.data_layer
    }

    /// Reads the stored decision and acts on it: load analytics, show the banner, or nothing.
    pub async fn initialize(&mut self) -> Result<ConsentStatus, ConsentError> {
        let raw = self
            .store
            .get_item(&self.settings.storage_key)
            .await
            .map_err(ConsentError::store)?;
        let status = ConsentStatus::from_stored(raw.as_deref())?;
        self.status = status;

        match status {
            ConsentStatus::Granted => self.load_analytics()?,
            ConsentStatus::Unset => self.show_banner()?,
            ConsentStatus::Denied => debug!("consent previously denied; staying idle"),
        }
        Ok(status)
    }

    /// Requests the analytics loader and queues its `js` and `config` commands.
    ///
    /// Not guarded: every call requests the script again and appends another pair.
    pub fn load_analytics(&mut self) -> Result<(), ConsentError> {
        let script = self.host.create_element("script")?;
        self.host.set_attribute(script, "async", "")?;
        self.host
            .set_attribute(script, "src", self.script_url.as_str())?;
        self.host.append_child(Mount::Head, script)?;

        self.data_layer.ensure_queue();
        self.data_layer.install_dispatch();
        self.data_layer.dispatch(&GtagCommand::js(self.host.now()));
        self.data_layer.dispatch(&GtagCommand::config(
            self.settings.measurement_id.clone(),
            self.settings.anonymize_ip,
        ));

        self.analytics_loads += 1;
        info!(
            measurement_id = %self.settings.measurement_id,
            src = %self.script_url,
            "analytics loaded (consent granted)"
        );
        Ok(())
    }

    /// Mounts the stylesheet and the off-screen banner, and requests the slide-in frame.
    ///
    /// A second call while a banner is mounted does nothing.
    pub fn show_banner(&mut self) -> Result<(), ConsentError> {
        if self.banner.is_some() {
            warn!("consent banner already mounted; ignoring duplicate request");
            return Ok(());
        }

        let style = self.host.create_element("style")?;
        self.host
            .set_text_content(style, &banner_css(self.settings.transition()))?;
        self.host.append_child(Mount::Head, style)?;

        let root = self.host.create_element("div")?;
        self.host.set_attribute(root, "id", BANNER_ID)?;
        self.host
            .set_inner_html(root, &banner_markup(&self.settings.copy))?;
        self.host.append_child(Mount::Body, root)?;

        let frame = match self.arm_banner(root) {
            Ok(frame) => frame,
            Err(err) => {
                // An unreachable banner must not stay on the page.
                if let Err(cleanup) = self.host.remove_element(root) {
                    warn!(error = %cleanup, "failed to unmount unarmed consent banner");
                }
                return Err(err);
            }
        };

        self.banner = Some(MountedBanner {
            root,
            phase: BannerPhase::Entering(frame),
        });
        debug!(?frame, "consent banner mounted off-screen");
        Ok(())
    }

    fn arm_banner(&mut self, root: ElementHandle) -> Result<FrameToken, ConsentError> {
        self.host.listen_click(root, ACCEPT_ID)?;
        self.host.listen_click(root, DECLINE_ID)?;
        Ok(self.host.schedule_after_paint()?)
    }

    pub async fn handle_event(&mut self, event: PageEvent) -> Result<(), ConsentError> {
        match event {
            PageEvent::AnimationFrame(token) => self.on_frame(token),
            PageEvent::TimerElapsed(token) => self.on_timer(token),
            PageEvent::Click { element_id } => {
                let choice = match element_id.as_str() {
                    ACCEPT_ID => ConsentChoice::Accept,
                    DECLINE_ID => ConsentChoice::Decline,
                    other => {
                        debug!(element_id = other, "ignoring click outside banner controls");
                        return Ok(());
                    }
                };
                self.record_choice(choice).await
            }
        }
    }

    fn on_frame(&mut self, token: FrameToken) -> Result<(), ConsentError> {
        let Some(banner) = self.banner.as_mut() else {
            return Ok(());
        };
        if banner.phase != BannerPhase::Entering(token) {
            debug!(?token, phase = ?banner.phase, "stale animation frame");
            return Ok(());
        }

        self.host.add_class(banner.root, VISIBLE_CLASS)?;
        banner.phase = BannerPhase::Visible;
        Ok(())
    }

    fn on_timer(&mut self, token: TimerToken) -> Result<(), ConsentError> {
        let Some(banner) = self.banner.as_ref() else {
            return Ok(());
        };
        if banner.phase != BannerPhase::Dismissing(token) {
            debug!(?token, phase = ?banner.phase, "stale removal timer");
            return Ok(());
        }

        self.host.remove_element(banner.root)?;
        self.banner = None;
        debug!("consent banner removed");
        Ok(())
    }

    async fn record_choice(&mut self, choice: ConsentChoice) -> Result<(), ConsentError> {
        let root = match self.banner.as_ref() {
            Some(banner) if !self.status.is_terminal() => banner.root,
            _ => {
                debug!(?choice, "consent already recorded; ignoring click");
                return Ok(());
            }
        };

        self.store
            .set_item(&self.settings.storage_key, choice.stored_value())
            .await
            .map_err(ConsentError::store)?;
        self.status = choice.status();
        info!(?choice, status = ?self.status, "consent recorded");

        // Analytics follows the stored grant even when hiding the banner fails.
        if choice.enables_analytics() {
            self.load_analytics()?;
        }

        self.host.remove_class(root, VISIBLE_CLASS)?;
        let timer = self.host.schedule_after_delay(self.settings.transition())?;
        if let Some(banner) = self.banner.as_mut() {
            banner.phase = BannerPhase::Dismissing(timer);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
