use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_CLEANUP_PERIOD: Duration = Duration::from_secs(3600);

/// Runs the daily block cleanup on every tick, the first one immediately.
/// Failures are logged and the loop keeps going; abort the handle to stop it.
pub fn spawn_daily_cleanup(store: Arc<Store>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(error) = store.daily_cleanup() {
                tracing::warn!(error = %error, "daily block cleanup failed");
            }
        }
    })
}
