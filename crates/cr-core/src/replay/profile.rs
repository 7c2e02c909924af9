//! Connection profile validation.

use super::ReplayError;
use crate::transcript::ConnectionProfile;
use tracing::warn;

/// Refuse to replay a transcript recorded against a differently shaped
/// connection (host, port, transport, or which credentials were used).
pub fn validate_profile(
    recorded: &ConnectionProfile,
    observed: &ConnectionProfile,
) -> Result<(), ReplayError> {
    if recorded == observed {
        return Ok(());
    }
    let differences = recorded.differences(observed).join(", ");
    warn!(%differences, "connection profile mismatch");
    Err(ReplayError::ProfileMismatch { differences })
}
