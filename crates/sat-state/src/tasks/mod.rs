mod registration;
pub use registration::{RegistrationTask, register_satellite};

mod reconcile;
pub use reconcile::ReconcileTask;

mod refresh;
pub use refresh::ConfigRefreshTask;

use tokio_util::sync::CancellationToken;

use crate::errors::StateError;

/// Race `fut` against cancellation of `ctx`.
pub(crate) async fn cancellable<F, T>(ctx: &CancellationToken, fut: F) -> Result<T, StateError>
where
    F: Future<Output = Result<T, StateError>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(StateError::Canceled),
        res = fut => res,
    }
}

pub(crate) fn http_client(use_unsecure: bool) -> Result<reqwest::Client, StateError> {
    Ok(reqwest::Client::builder()
        .timeout(crate::REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(use_unsecure)
        .build()?)
}
