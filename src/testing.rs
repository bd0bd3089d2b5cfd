//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.

#![allow(dead_code)]

use crate::digest::{Digest, Notifier};
use crate::error::{Error, Result};
use crate::tasks::models::UserId;
use std::cell::RefCell;

/// A notifier that keeps every digest it is given.
///
/// Users listed with [`RecordingNotifier::failing_for`] get a delivery
/// error instead, which is also how tests simulate a broken mail relay.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<Digest>>,
    fail_for: Vec<UserId>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier that rejects digests for the given users.
    #[must_use]
    pub fn failing_for(users: &[UserId]) -> Self {
        Self { sent: RefCell::default(), fail_for: users.to_vec() }
    }

    /// Digests accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Digest> {
        self.sent.borrow().clone()
    }

    /// Number of digests accepted so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }

    /// Recipients of the accepted digests, in delivery order.
    #[must_use]
    pub fn recipients(&self) -> Vec<UserId> {
        self.sent.borrow().iter().map(|d| d.user.id).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, digest: &Digest) -> Result<()> {
        if self.fail_for.contains(&digest.user.id) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("mail relay refused digest for {}", digest.user.username),
            )));
        }
        self.sent.borrow_mut().push(digest.clone());
        Ok(())
    }
}
