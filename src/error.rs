//! Errors reported synchronously by `start`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to spawn {thread} thread")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}
