//! In-memory session key material.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key material for an unlocked account, held only in memory.
///
/// Every envelope gets a fresh salt, so the AEAD key is re-derived for
/// each seal/open; what survives between operations is the password the
/// user entered at login. It is wiped when the session ends or the value
/// is dropped, and is never serialized.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    material: Vec<u8>,
}

impl SessionKey {
    /// Take ownership of the entered password as session key material.
    pub fn new(password: &[u8]) -> Self {
        Self {
            material: password.to_vec(),
        }
    }

    /// Access the raw material (e.g. to pass to `seal` or `open`).
    pub fn as_bytes(&self) -> &[u8] {
        &self.material
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("material", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let key = SessionKey::new(b"hunter2hunter2");
        let shown = format!("{key:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("REDACTED"));
    }

    #[test]
    fn zeroize_clears_material() {
        let mut key = SessionKey::new(b"hunter2hunter2");
        key.zeroize();
        assert!(key.as_bytes().is_empty());
    }
}
