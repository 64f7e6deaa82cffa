//! Transient administrator credential
//!
//! The password is held in a buffer that is zeroized on drop. It cannot be
//! cloned, its `Debug` output is redacted, and the executor consumes it by
//! value so the caller keeps no copy once a task is submitted.

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

pub struct Credential {
    secret: Zeroizing<String>,
}

impl Credential {
    /// Take ownership of a password string
    pub fn new(secret: String) -> Self {
        Self {
            secret: Zeroizing::new(secret),
        }
    }

    /// True when the password has no non-whitespace characters
    pub fn is_empty(&self) -> bool {
        !is_credential_non_empty(&self.secret)
    }

    /// Bytes fed to the elevation helper: the password and a newline
    ///
    /// The returned buffer is wiped when dropped; `self` is consumed so the
    /// original string is wiped here.
    pub(crate) fn into_stdin_bytes(self) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(self.secret.len() + 1));
        bytes.extend_from_slice(self.secret.as_bytes());
        bytes.push(b'\n');
        bytes
    }

    /// Explicitly clear the password before the value goes out of scope
    pub fn wipe(&mut self) {
        self.secret.zeroize();
    }
}

impl From<String> for Credential {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Simple non-emptiness check used before prompting the elevation helper
pub fn is_credential_non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}
