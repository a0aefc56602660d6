use futures::{Stream, StreamExt};
use shared::store::ConsentStore;
use tracing::warn;

use crate::{
    controller::ConsentController,
    data_layer::DataLayer,
    host::{PageEvent, PageHost},
};

/// Feeds page events to the controller until the stream ends.
///
/// Failures are logged and the pump keeps going; nothing is retried.
pub async fn run<S, H, D, E>(controller: &mut ConsentController<S, H, D>, events: E)
where
    S: ConsentStore,
    H: PageHost,
    D: DataLayer,
    E: Stream<Item = PageEvent>,
{
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        if let Err(err) = controller.handle_event(event.clone()).await {
            warn!(?event, error = %err, "consent event handling failed");
        }
    }
}

/// Runs initialization, logging instead of propagating a failure.
pub async fn start<S, H, D>(controller: &mut ConsentController<S, H, D>)
where
    S: ConsentStore,
    H: PageHost,
    D: DataLayer,
{
    match controller.initialize().await {
        Ok(status) => tracing::debug!(?status, "consent gate initialized"),
        Err(err) => warn!(error = %err, "consent gate initialization failed; nothing shown"),
    }
}
