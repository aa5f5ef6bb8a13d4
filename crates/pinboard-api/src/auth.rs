use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use pinboard_db::{Storage, keys, read_json, write_json};
use pinboard_types::api::ProfileUpdate;
use pinboard_types::events::StoreEvent;
use pinboard_types::models::{User, UserRecord};

use crate::credentials::{hash_secret, verify_secret};
use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Owns the session and the registered-users collection.
///
/// Credentials are kept as Argon2id hashes; the session snapshot never
/// carries one.
pub struct AuthStore {
    storage: Storage,
    dispatcher: Dispatcher,
    user: Option<User>,
    loading: bool,
}

impl AuthStore {
    pub fn new(storage: Storage, dispatcher: Dispatcher) -> Self {
        Self {
            storage,
            dispatcher,
            user: None,
            loading: true,
        }
    }

    /// True until `restore_session` has run. Protected views wait on this.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Load the persisted session, if any. A corrupt session record is
    /// treated as no session.
    pub fn restore_session(&mut self) -> Result<()> {
        self.user = read_json(self.storage.as_ref(), keys::CURRENT_USER)?;
        self.loading = false;

        if let Some(user) = &self.user {
            info!("Restored session for {}", user.username);
        }
        Ok(())
    }

    pub fn login(&mut self, email: &str, secret: &str) -> Result<bool> {
        let users = self.load_users()?;

        let Some(record) = users
            .into_iter()
            .find(|r| r.user.email == email && verify_secret(secret, &r.password))
        else {
            debug!("Login rejected for {}", email);
            return Ok(false);
        };

        self.start_session(record.user)?;
        Ok(true)
    }

    /// Register a new account and sign it in. Fails when the email is taken.
    pub fn signup(&mut self, username: &str, email: &str, secret: &str) -> Result<bool> {
        let mut users = self.load_users()?;

        if users.iter().any(|r| r.user.email == email) {
            debug!("Signup rejected, email already registered: {}", email);
            return Ok(false);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            avatar: None,
            bio: None,
            website: None,
            created_at: Utc::now(),
        };

        users.push(UserRecord {
            user: user.clone(),
            password: hash_secret(secret)?,
        });
        write_json(self.storage.as_ref(), keys::USERS, &users)?;

        info!("Registered user {} ({})", user.username, user.id);
        self.start_session(user)?;
        Ok(true)
    }

    /// Clear the session. Registered users are untouched.
    pub fn logout(&mut self) -> Result<()> {
        self.user = None;
        self.storage.remove(keys::CURRENT_USER)?;
        self.dispatcher.broadcast(StoreEvent::SessionEnded);
        Ok(())
    }

    /// Merge `updates` into the session and the stored user entry.
    /// Returns false when signed out or when the new email belongs to
    /// another account.
    pub fn update_profile(&mut self, updates: ProfileUpdate) -> Result<bool> {
        let Some(current) = self.user.as_ref() else {
            return Ok(false);
        };

        let mut users = self.load_users()?;

        if let Some(email) = &updates.email {
            if users.iter().any(|r| r.user.email == *email && r.user.id != current.id) {
                debug!("Profile update rejected, email in use: {}", email);
                return Ok(false);
            }
        }

        let mut updated = current.clone();
        updates.apply(&mut updated);

        if let Some(record) = users.iter_mut().find(|r| r.user.id == updated.id) {
            record.user = updated.clone();
            write_json(self.storage.as_ref(), keys::USERS, &users)?;
        }
        write_json(self.storage.as_ref(), keys::CURRENT_USER, &updated)?;

        self.dispatcher.broadcast(StoreEvent::ProfileUpdated {
            user_id: updated.id.clone(),
        });
        self.user = Some(updated);
        Ok(true)
    }

    /// Credential-free snapshots of every registered user.
    pub fn users(&self) -> Result<Vec<User>> {
        Ok(self.load_users()?.into_iter().map(|r| r.user).collect())
    }

    fn load_users(&self) -> Result<Vec<UserRecord>> {
        Ok(read_json(self.storage.as_ref(), keys::USERS)?.unwrap_or_default())
    }

    fn start_session(&mut self, user: User) -> Result<()> {
        write_json(self.storage.as_ref(), keys::CURRENT_USER, &user)?;

        info!("Session started for {}", user.username);
        self.dispatcher.broadcast(StoreEvent::SessionStarted {
            user_id: user.id.clone(),
        });
        self.user = Some(user);
        Ok(())
    }
}
