//! Profile lookup with a bounded retry.
//!
//! The profile row is created by a backend trigger after sign-up, so a session
//! can exist for a moment before its profile does.

use crate::{
    backend::{Backend, BackendError},
    models::Profile,
};
use std::time::Duration;
use tokio_retry::{RetryIf, strategy::FixedInterval};
use uuid::Uuid;

enum ProfileFetch {
    Missing,
    Failed(BackendError),
}

/// Fetch a profile, retrying up to `attempts` times with a fixed `delay`
///
/// Only a missing row is retried; backend errors are returned at once.
/// Returns `Ok(None)` when the row is still missing after the last attempt.
pub async fn fetch_profile_with_retry(
    backend: &dyn Backend,
    access_token: &str,
    user_id: Uuid,
    attempts: u32,
    delay: Duration,
) -> Result<Option<Profile>, BackendError> {
    let strategy = FixedInterval::new(delay).take(attempts.saturating_sub(1) as usize);

    let result = RetryIf::start(
        strategy,
        || async {
            match backend.fetch_profile(Some(access_token), user_id).await {
                Ok(Some(profile)) => Ok(profile),
                Ok(None) => {
                    tracing::debug!(user_id = %user_id, "Profile not found yet");
                    Err(ProfileFetch::Missing)
                }
                Err(e) => {
                    tracing::debug!(user_id = %user_id, error = %e, "Profile fetch failed");
                    Err(ProfileFetch::Failed(e))
                }
            }
        },
        |e: &ProfileFetch| matches!(e, ProfileFetch::Missing),
    )
    .await;

    match result {
        Ok(profile) => Ok(Some(profile)),
        Err(ProfileFetch::Missing) => Ok(None),
        Err(ProfileFetch::Failed(e)) => Err(e),
    }
}
