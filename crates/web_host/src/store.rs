use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::store::ConsentStore;

/// `window.localStorage` of the current origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageStore;

fn local_storage() -> Result<web_sys::Storage> {
    let window = web_sys::window().ok_or_else(|| anyhow!("no window object"))?;
    window
        .local_storage()
        .map_err(|err| anyhow!("localStorage access denied: {err:?}"))?
        .ok_or_else(|| anyhow!("localStorage is unavailable"))
}

#[async_trait]
impl ConsentStore for LocalStorageStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        local_storage()?
            .get_item(key)
            .map_err(|err| anyhow!("localStorage.getItem({key}) failed: {err:?}"))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        local_storage()?
            .set_item(key, value)
            .map_err(|err| anyhow!("localStorage.setItem({key}) failed: {err:?}"))
    }
}
