//! Delivery seam for rendered digests.
//!
//! Actual email transport lives outside this crate. A scheduler wires in a
//! [`Notifier`] that hands the digest to its mail system; [`LogNotifier`]
//! only reports what would be sent.

use crate::digest::Digest;
use crate::error::Result;

/// Trait for handing a rendered digest to a delivery mechanism.
pub trait Notifier {
    /// Deliver one digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest could not be handed off.
    fn send(&self, digest: &Digest) -> Result<()>;
}

/// Notifier that writes digests to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, digest: &Digest) -> Result<()> {
        tracing::info!(
            user_id = digest.user.id,
            username = %digest.user.username,
            email = %digest.user.email,
            subject = %digest.subject,
            tasks = digest.tasks.len(),
            "digest ready for delivery"
        );
        tracing::debug!(body = %digest.body, "digest body");
        Ok(())
    }
}
