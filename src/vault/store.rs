//! High-level vault operations used by the CLI and the session.
//!
//! `VaultStore` owns the one unlocked account of this process: its
//! account record, its `SessionKey` and its decrypted entry list. Every
//! mutation re-seals the whole list into a new envelope and replaces
//! the stored blob; the in-memory list only changes once that write has
//! succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::kdf::{DEFAULT_ITERATIONS, KEY_LEN, SALT_LEN};
use crate::crypto::{
    hash_password_with_iterations, open_with_iterations, seal_with_iterations,
    verify_password_with_iterations, Envelope, SessionKey,
};
use crate::errors::{Result, ValidationError, VaultFillError};

use super::blob::{
    entries_key, BlobStore, CURRENT_USER_KEY, ENTRIES_PREFIX, MAX_KEY_LEN, USERS_KEY,
};
use super::record::{AccountSession, UserAccount, VaultRecord};

/// Minimum master password length in bytes.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Longest accepted email, so its entry-list key stays a valid file name.
pub const MAX_EMAIL_LEN: usize = MAX_KEY_LEN - ENTRIES_PREFIX.len();

/// The unlocked state of the active account.
struct ActiveSession {
    account: UserAccount,
    key: SessionKey,
    entries: Vec<VaultRecord>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        wipe(&mut self.entries);
    }
}

/// Non-sensitive marker used to pre-select the login email on restart.
#[derive(Serialize, Deserialize)]
struct RememberedUser {
    email: String,
}

/// The main vault handle. Build one over a `BlobStore`, `login`, then
/// use its methods to manage entries.
pub struct VaultStore {
    /// Opaque persistence for accounts, envelopes and the login marker.
    blobs: Arc<dyn BlobStore>,

    /// PBKDF2 iterations for new accounts and password changes.
    kdf_iterations: u32,

    /// At most one unlocked account per store.
    session: Option<ActiveSession>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a store using the default iteration count.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_kdf_iterations(blobs, DEFAULT_ITERATIONS)
    }

    /// Create a store whose new accounts use `kdf_iterations`.
    ///
    /// Existing accounts keep opening with the count stored in their
    /// record.
    pub fn with_kdf_iterations(blobs: Arc<dyn BlobStore>, kdf_iterations: u32) -> Self {
        Self {
            blobs,
            kdf_iterations,
            session: None,
        }
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Register a new account. Does not log in.
    pub fn register(&self, email: &str, password: &[u8]) -> Result<UserAccount> {
        let email = validate_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword(MIN_PASSWORD_LEN).into());
        }

        let mut accounts = load_accounts(self.blobs.as_ref())?;
        if accounts.contains_key(&email) {
            return Err(VaultFillError::AccountExists(email));
        }

        let password_hash = hash_password_with_iterations(password, None, self.kdf_iterations)?;
        let account = UserAccount {
            email: email.clone(),
            password_hash,
            created_at: Utc::now(),
            kdf_iterations: self.kdf_iterations,
        };

        accounts.insert(email.clone(), account.clone());
        save_accounts(self.blobs.as_ref(), &accounts)?;

        info!(%email, "account registered");
        Ok(account)
    }

    /// Emails of every registered account, sorted.
    pub fn registered_emails(&self) -> Result<Vec<String>> {
        Ok(load_accounts(self.blobs.as_ref())?.into_keys().collect())
    }

    /// Unlock `email` with `password` and load its entries.
    ///
    /// Any active session is logged out first, even if this login fails.
    pub fn login(&mut self, email: &str, password: &[u8]) -> Result<AccountSession> {
        let email = normalize_email(email);
        self.logout();

        let accounts = load_accounts(self.blobs.as_ref())?;
        let Some(account) = accounts.get(&email).cloned() else {
            // Burn the same KDF cost so timing does not reveal which
            // emails are registered.
            let decoy = Envelope::from_bytes(&[0u8; SALT_LEN + KEY_LEN]);
            let _ = verify_password_with_iterations(password, &decoy, self.kdf_iterations);
            debug!("login for unknown account");
            return Err(VaultFillError::UserNotFound);
        };

        if !verify_password_with_iterations(password, &account.password_hash, account.kdf_iterations)
        {
            debug!(%email, "login rejected");
            return Err(VaultFillError::InvalidCredentials);
        }

        self.session = Some(ActiveSession {
            account,
            key: SessionKey::new(password),
            entries: Vec::new(),
        });

        let entry_count = match self.load_entries() {
            Ok(entries) => entries.len(),
            Err(e) => {
                self.session = None;
                return Err(e);
            }
        };

        if let Err(e) = self.remember_user(&email) {
            warn!(error = %e, "could not write the remembered-user marker");
        }

        info!(%email, entry_count, "logged in");
        Ok(AccountSession { email, entry_count })
    }

    /// Discard the session key and decrypted entries. Persisted
    /// envelopes are untouched. Returns whether a session was active.
    pub fn logout(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                info!(email = %session.account.email, "logged out");
                true
            }
            None => false,
        }
    }

    /// Change the master password of the unlocked account.
    ///
    /// Re-hashes with a fresh salt, re-seals the entry list under the new
    /// password and swaps the session key.
    pub fn change_password(&mut self, current: &[u8], new: &[u8]) -> Result<()> {
        if new.len() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword(MIN_PASSWORD_LEN).into());
        }
        let iterations = self.kdf_iterations;
        let blobs = self.blobs.as_ref();
        let session = self.session.as_mut().ok_or(VaultFillError::NotLoggedIn)?;

        if !verify_password_with_iterations(
            current,
            &session.account.password_hash,
            session.account.kdf_iterations,
        ) {
            return Err(VaultFillError::InvalidCredentials);
        }

        let mut account = session.account.clone();
        account.password_hash = hash_password_with_iterations(new, None, iterations)?;
        account.kdf_iterations = iterations;
        let new_key = SessionKey::new(new);

        let plaintext = serialize_entries(&session.entries)?;
        let envelope = seal_with_iterations(&plaintext, new_key.as_bytes(), iterations)?;

        // Entries first, then the account. If the account write fails,
        // put the previous envelope back so the old password still opens
        // the old data.
        let key = entries_key(&account.email);
        let previous = blobs.get(&key)?;
        blobs.put(&key, envelope.as_str())?;

        let mut accounts = load_accounts(blobs)?;
        accounts.insert(account.email.clone(), account.clone());
        if let Err(e) = save_accounts(blobs, &accounts) {
            let restored = match previous {
                Some(old) => blobs.put(&key, &old),
                None => blobs.remove(&key),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "could not restore the previous entry envelope");
            }
            return Err(e);
        }

        info!(email = %account.email, "master password changed");
        session.account = account;
        session.key = new_key;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry list persistence
    // ------------------------------------------------------------------

    /// Read and decrypt the active account's entry list.
    ///
    /// No envelope yet means an empty list. An envelope that fails
    /// authentication also yields an empty list instead of failing the
    /// login; the next save then replaces the unreadable envelope.
    pub fn load_entries(&mut self) -> Result<&[VaultRecord]> {
        let blobs = self.blobs.as_ref();
        let session = self.session.as_mut().ok_or(VaultFillError::NotLoggedIn)?;

        let entries = match blobs.get(&entries_key(&session.account.email))? {
            None => {
                debug!(email = %session.account.email, "no entry envelope yet, starting empty");
                Vec::new()
            }
            Some(encoded) => match open_with_iterations(
                &Envelope::from_encoded(encoded),
                session.key.as_bytes(),
                session.account.kdf_iterations,
            ) {
                Ok(plaintext) => serde_json::from_slice(&plaintext)
                    .map_err(|e| VaultFillError::SerializationError(format!("entry list: {e}")))?,
                Err(VaultFillError::AuthenticationFailure) => {
                    warn!(
                        email = %session.account.email,
                        "entry envelope failed authentication, resetting to an empty list"
                    );
                    Vec::new()
                }
                Err(e) => return Err(e),
            },
        };

        wipe(&mut session.entries);
        session.entries = entries;
        Ok(&session.entries)
    }

    /// Seal the current entry list and replace the stored envelope.
    pub fn save_entries(&self) -> Result<()> {
        let session = self.session.as_ref().ok_or(VaultFillError::NotLoggedIn)?;
        persist(self.blobs.as_ref(), session)
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Add a new entry and persist it.
    pub fn add_entry(&mut self, platform: &str, username: &str, secret: &str) -> Result<VaultRecord> {
        let blobs = self.blobs.as_ref();
        let session = self.session.as_mut().ok_or(VaultFillError::NotLoggedIn)?;

        let fields = EntryFields::parse(platform, username, secret)?;
        ensure_unique_platform(&session.entries, &fields.platform, None)?;

        let record = VaultRecord {
            id: uuid::Uuid::new_v4().to_string(),
            platform: fields.platform,
            username: fields.username,
            secret: fields.secret,
            created_at: Utc::now(),
            updated_at: None,
        };

        session.entries.push(record.clone());
        if let Err(e) = persist(blobs, session) {
            if let Some(mut rolled_back) = session.entries.pop() {
                rolled_back.secret.zeroize();
            }
            return Err(e);
        }

        info!(id = %record.id, platform = %record.platform, "entry added");
        Ok(record)
    }

    /// Replace the fields of entry `id` and persist it.
    pub fn edit_entry(
        &mut self,
        id: &str,
        platform: &str,
        username: &str,
        secret: &str,
    ) -> Result<VaultRecord> {
        let blobs = self.blobs.as_ref();
        let session = self.session.as_mut().ok_or(VaultFillError::NotLoggedIn)?;

        let fields = EntryFields::parse(platform, username, secret)?;
        let index = position_of(&session.entries, id)?;
        ensure_unique_platform(&session.entries, &fields.platform, Some(id))?;

        let previous = session.entries[index].clone();
        let updated = VaultRecord {
            id: previous.id.clone(),
            platform: fields.platform,
            username: fields.username,
            secret: fields.secret,
            created_at: previous.created_at,
            updated_at: Some(Utc::now()),
        };

        let mut replaced = std::mem::replace(&mut session.entries[index], updated.clone());
        if let Err(e) = persist(blobs, session) {
            let mut failed = std::mem::replace(&mut session.entries[index], previous);
            failed.secret.zeroize();
            replaced.secret.zeroize();
            return Err(e);
        }
        replaced.secret.zeroize();

        info!(id = %updated.id, platform = %updated.platform, "entry edited");
        Ok(updated)
    }

    /// Remove entry `id` and persist the shorter list.
    pub fn delete_entry(&mut self, id: &str) -> Result<()> {
        let blobs = self.blobs.as_ref();
        let session = self.session.as_mut().ok_or(VaultFillError::NotLoggedIn)?;

        let index = position_of(&session.entries, id)?;
        let mut removed = session.entries.remove(index);
        if let Err(e) = persist(blobs, session) {
            session.entries.insert(index, removed);
            return Err(e);
        }

        info!(id = %removed.id, platform = %removed.platform, "entry deleted");
        removed.secret.zeroize();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remembered user
    // ------------------------------------------------------------------

    /// The email of the last successful login, if any. Never unlocks.
    pub fn remembered_user(&self) -> Result<Option<String>> {
        let Some(raw) = self.blobs.get(CURRENT_USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<RememberedUser>(&raw) {
            Ok(marker) => Ok(Some(marker.email)),
            Err(e) => {
                debug!(error = %e, "ignoring unreadable remembered-user marker");
                Ok(None)
            }
        }
    }

    /// Clear the remembered-user marker.
    pub fn forget_user(&self) -> Result<()> {
        self.blobs.remove(CURRENT_USER_KEY)
    }

    fn remember_user(&self, email: &str) -> Result<()> {
        let marker = serde_json::to_string(&RememberedUser {
            email: email.to_string(),
        })
        .map_err(|e| VaultFillError::SerializationError(format!("remembered user: {e}")))?;
        self.blobs.put(CURRENT_USER_KEY, &marker)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns `true` while an account is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// The unlocked account, if any.
    pub fn account(&self) -> Option<&UserAccount> {
        self.session.as_ref().map(|s| &s.account)
    }

    pub fn current_email(&self) -> Option<&str> {
        self.account().map(|a| a.email.as_str())
    }

    /// The decrypted entries in insertion order (empty when locked).
    pub fn entries(&self) -> &[VaultRecord] {
        match &self.session {
            Some(session) => &session.entries,
            None => &[],
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries().len()
    }

    /// Look up one entry by id.
    pub fn get_entry(&self, id: &str) -> Result<&VaultRecord> {
        self.entries()
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| VaultFillError::NotFound(id.to_string()))
    }

    /// Look up one entry by platform, normalized the way `add_entry` stores it
/// and ignoring case.
    pub fn find_by_platform(&self, platform: &str) -> Option<&VaultRecord> {
        let platform = normalize_platform(platform);
        self.entries().iter().find(|e| e.same_platform(&platform))
    }

    /// Iteration count applied to new accounts.
    pub fn kdf_iterations(&self) -> u32 {
        self.kdf_iterations
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

/// Validated, normalized entry fields.
struct EntryFields {
    platform: String,
    username: String,
    secret: String,
}

impl EntryFields {
    fn parse(platform: &str, username: &str, secret: &str) -> Result<Self> {
        let platform = normalize_platform(platform);
        if platform.is_empty() {
            return Err(ValidationError::MissingField("platform").into());
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingField("username").into());
        }
        // Secrets are stored verbatim; only an all-blank one is refused.
        if secret.trim().is_empty() {
            return Err(ValidationError::MissingField("secret").into());
        }
        Ok(Self {
            platform,
            username: username.to_string(),
            secret: secret.to_string(),
        })
    }
}

/// Trim, collapse inner whitespace and capitalize the first letter.
pub fn normalize_platform(platform: &str) -> String {
    let collapsed = platform.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize an email and check it can serve as an account id and a
/// storage key.
fn validate_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ValidationError::MissingField("email").into());
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    let safe_chars = email
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'@' | b'+'));
    if !well_formed || !safe_chars || email.starts_with('.') || email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::InvalidEmail(email).into());
    }
    Ok(email)
}

fn ensure_unique_platform(entries: &[VaultRecord], platform: &str, except_id: Option<&str>) -> Result<()> {
    let clash = entries
        .iter()
        .filter(|e| Some(e.id.as_str()) != except_id)
        .any(|e| e.same_platform(platform));
    if clash {
        return Err(ValidationError::DuplicatePlatform(platform.to_string()).into());
    }
    Ok(())
}

fn position_of(entries: &[VaultRecord], id: &str) -> Result<usize> {
    entries.iter().position(|e| e.id == id).ok_or_else(|| {
        warn!(%id, "entry id not found, caller state may be out of sync");
        VaultFillError::NotFound(id.to_string())
    })
}

fn serialize_entries(entries: &[VaultRecord]) -> Result<Zeroizing<Vec<u8>>> {
    serde_json::to_vec(entries)
        .map(Zeroizing::new)
        .map_err(|e| VaultFillError::SerializationError(format!("entry list: {e}")))
}

/// Seal the session's entry list and replace its envelope.
fn persist(blobs: &dyn BlobStore, session: &ActiveSession) -> Result<()> {
    let plaintext = serialize_entries(&session.entries)?;
    let envelope = seal_with_iterations(
        &plaintext,
        session.key.as_bytes(),
        session.account.kdf_iterations,
    )?;
    blobs.put(&entries_key(&session.account.email), envelope.as_str())?;
    debug!(
        email = %session.account.email,
        count = session.entries.len(),
        "entry envelope replaced"
    );
    Ok(())
}

fn load_accounts(blobs: &dyn BlobStore) -> Result<BTreeMap<String, UserAccount>> {
    match blobs.get(USERS_KEY)? {
        None => Ok(BTreeMap::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| VaultFillError::SerializationError(format!("accounts: {e}"))),
    }
}

fn save_accounts(blobs: &dyn BlobStore, accounts: &BTreeMap<String, UserAccount>) -> Result<()> {
    let raw = serde_json::to_string(accounts)
        .map_err(|e| VaultFillError::SerializationError(format!("accounts: {e}")))?;
    blobs.put(USERS_KEY, &raw)
}

fn wipe(entries: &mut Vec<VaultRecord>) {
    for entry in entries.iter_mut() {
        entry.secret.zeroize();
    }
    entries.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_is_display_normalized() {
        assert_eq!(normalize_platform("  twitter "), "Twitter");
        assert_eq!(normalize_platform("my   bank"), "My bank");
        assert_eq!(normalize_platform("GitHub"), "GitHub");
        assert_eq!(normalize_platform("   "), "");
    }

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(validate_email("  A@X.com ").unwrap(), "a@x.com");
        assert_eq!(validate_email("first.last+tag@mail.example").unwrap(), "first.last+tag@mail.example");
        assert!(matches!(
            validate_email(""),
            Err(VaultFillError::Validation(ValidationError::MissingField("email")))
        ));
        for bad in ["no-at-sign", "@x.com", "a@", "a@b@c", "a b@x.com", "../a@x.com", "a/b@x.com"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn blank_fields_are_missing() {
        let err = EntryFields::parse("Gmail", " ", "pw").err().unwrap();
        assert!(matches!(
            err,
            VaultFillError::Validation(ValidationError::MissingField("username"))
        ));
        let err = EntryFields::parse("", "bob", "pw").err().unwrap();
        assert!(matches!(
            err,
            VaultFillError::Validation(ValidationError::MissingField("platform"))
        ));
        let err = EntryFields::parse("Gmail", "bob", "").err().unwrap();
        assert!(matches!(
            err,
            VaultFillError::Validation(ValidationError::MissingField("secret"))
        ));
    }

    #[test]
    fn secrets_keep_surrounding_whitespace() {
        let fields = EntryFields::parse("Gmail", " bob ", " pw ").unwrap();
        assert_eq!(fields.username, "bob");
        assert_eq!(fields.secret, " pw ");
    }
}
