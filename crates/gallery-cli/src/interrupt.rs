use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::signal;
use tracing::{error, warn};

/// Watch for Ctrl+C on a background thread. The first interrupt sets
/// `cancel_token` so files already being copied finish cleanly; a second
/// one exits immediately.
pub fn cancel_on_interrupt(cancel_token: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Ctrl+C handling unavailable: {}", e);
                    return;
                }
            };

            runtime.block_on(async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    return;
                }
                warn!("Interrupted, finishing files in progress (Ctrl+C again to abort)");
                cancel_token.store(true, Ordering::Relaxed);

                if signal::ctrl_c().await.is_ok() {
                    error!("Aborted");
                    process::exit(130);
                }
            });
        });

    if let Err(e) = spawned {
        warn!("Ctrl+C handling unavailable: {}", e);
    }
}
