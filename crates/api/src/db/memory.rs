//! In-memory store geared towards testing and local development.
//!
//! # Limitations
//!
//! Data is lost on restart and is not shared between server instances.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, MutexGuard};

use receipts_core::{ReceiptId, SessionId, UserId};

use super::{ReceiptStore, RepositoryError, SessionStore, UserStore};
use crate::models::{LoginIdentity, NewReceipt, NewUser, Receipt, ReceiptChanges, Session, User};

/// An in-memory implementation of every store trait.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
    session_ttl: Duration,
}

#[derive(Default)]
struct Tables {
    sessions: HashMap<SessionId, Session>,
    users: Vec<(User, String)>,
    receipts: Vec<Receipt>,
    next_user_id: i32,
    next_receipt_id: i32,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store issuing sessions with the default 7 day lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tables::default())),
            session_ttl: Session::ttl(),
        }
    }

    /// Override the lifetime of sessions created from now on.
    ///
    /// A non-positive lifetime creates sessions that are already expired, which
    /// is how tests exercise the expiry filter.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Number of session rows physically present, live or expired.
    pub async fn session_rows(&self) -> usize {
        self.lock().await.sessions.len()
    }

    async fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().await
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, user_id: UserId) -> Result<SessionId, RepositoryError> {
        let mut tables = self.lock().await;
        let session_id = SessionId::generate();
        if tables.sessions.contains_key(&session_id) {
            return Err(RepositoryError::Conflict("session already exists".to_owned()));
        }

        tables.sessions.insert(
            session_id.clone(),
            Session {
                session_id: session_id.clone(),
                user_id,
                expires_at: Utc::now() + self.session_ttl,
            },
        );
        Ok(session_id)
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let tables = self.lock().await;
        let now = Utc::now();
        Ok(tables
            .sessions
            .get(session_id)
            .filter(|session| session.is_live_at(now))
            .cloned())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), RepositoryError> {
        self.lock().await.sessions.remove(session_id);
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        let mut tables = self.lock().await;
        let now = Utc::now();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.is_live_at(now));
        Ok(u64::try_from(before - tables.sessions.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock().await;

        let taken = tables.users.iter().any(|(existing, _)| {
            existing.email == user.email
                || (user.username.is_some() && existing.username == user.username)
        });
        if taken {
            return Err(RepositoryError::Conflict("account already exists".to_owned()));
        }

        tables.next_user_id += 1;
        let created = User {
            id: UserId::new(tables.next_user_id),
            email: user.email,
            username: user.username,
            created_at: Utc::now(),
        };
        tables.users.push((created.clone(), user.password_hash));
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone()))
    }

    async fn get_password_hash(
        &self,
        identity: &LoginIdentity,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|(user, _)| match identity {
                LoginIdentity::Email(email) => &user.email == email,
                LoginIdentity::Username(name) => user.username.as_ref() == Some(name),
            })
            .cloned())
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn list(&self, owner: UserId) -> Result<Vec<Receipt>, RepositoryError> {
        let tables = self.lock().await;
        let mut receipts: Vec<Receipt> = tables
            .receipts
            .iter()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect();
        receipts.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(receipts)
    }

    async fn get(&self, owner: UserId, id: ReceiptId) -> Result<Option<Receipt>, RepositoryError> {
        let tables = self.lock().await;
        Ok(tables
            .receipts
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn create(&self, owner: UserId, receipt: NewReceipt) -> Result<Receipt, RepositoryError> {
        let mut tables = self.lock().await;
        tables.next_receipt_id += 1;
        let now = Utc::now();
        let created = Receipt {
            id: ReceiptId::new(tables.next_receipt_id),
            user_id: owner,
            title: receipt.title,
            template: receipt.template,
            data: receipt.data,
            created_at: now,
            updated_at: now,
        };
        tables.receipts.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        owner: UserId,
        id: ReceiptId,
        changes: ReceiptChanges,
    ) -> Result<Option<Receipt>, RepositoryError> {
        let mut tables = self.lock().await;
        let Some(receipt) = tables
            .receipts
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            receipt.title = title;
        }
        if let Some(template) = changes.template {
            receipt.template = Some(template);
        }
        if let Some(data) = changes.data {
            receipt.data = data;
        }
        receipt.updated_at = Utc::now();
        Ok(Some(receipt.clone()))
    }

    async fn delete(&self, owner: UserId, id: ReceiptId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock().await;
        let before = tables.receipts.len();
        tables.receipts.retain(|r| !(r.id == id && r.user_id == owner));
        Ok(tables.receipts.len() < before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use receipts_core::Email;

    use super::*;

    fn new_user(email: &str, username: Option<&str>) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            username: username.map(str::to_owned),
            password_hash: "hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_absent() {
        let store = MemoryStore::new();
        let found = SessionStore::get(&store, &SessionId::from_token("never-issued"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_then_get_returns_owner() {
        let store = MemoryStore::new();
        let id = SessionStore::create(&store, UserId::new(7)).await.unwrap();

        let session = SessionStore::get(&store, &id).await.unwrap().unwrap();
        assert_eq!(session.user_id, UserId::new(7));
        assert_eq!(session.session_id, id);
        assert!(session.expires_at > Utc::now() + Duration::days(6));
    }

    #[tokio::test]
    async fn test_expired_session_is_absent_until_swept() {
        let store = MemoryStore::new().with_session_ttl(Duration::seconds(-1));
        let id = SessionStore::create(&store, UserId::new(1)).await.unwrap();

        assert!(SessionStore::get(&store, &id).await.unwrap().is_none());
        // The row still physically exists until a sweep removes it
        assert_eq!(store.session_rows().await, 1);

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert_eq!(store.session_rows().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_sessions() {
        let store = MemoryStore::new();
        let id = SessionStore::create(&store, UserId::new(1)).await.unwrap();

        assert_eq!(store.sweep_expired().await.unwrap(), 0);
        assert!(SessionStore::get(&store, &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let id = SessionStore::create(&store, UserId::new(1)).await.unwrap();

        SessionStore::delete(&store, &id).await.unwrap();
        assert!(SessionStore::get(&store, &id).await.unwrap().is_none());
        SessionStore::delete(&store, &id).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        UserStore::create(&store, new_user("a@example.com", None))
            .await
            .unwrap();

        let err = UserStore::create(&store, new_user("a@example.com", Some("other")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        UserStore::create(&store, new_user("a@example.com", Some("jo")))
            .await
            .unwrap();

        let err = UserStore::create(&store, new_user("b@example.com", Some("jo")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_lookup_by_username() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, new_user("a@example.com", Some("jo")))
            .await
            .unwrap();

        let (found, hash) = store
            .get_password_hash(&LoginIdentity::Username("jo".to_owned()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_receipts_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let receipt = ReceiptStore::create(
            &store,
            UserId::new(1),
            NewReceipt {
                title: "Lunch".to_owned(),
                template: None,
                data: json!({"items": []}),
            },
        )
        .await
        .unwrap();

        assert!(
            ReceiptStore::get(&store, UserId::new(2), receipt.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            !ReceiptStore::delete(&store, UserId::new(2), receipt.id)
                .await
                .unwrap()
        );
        assert!(
            ReceiptStore::delete(&store, UserId::new(1), receipt.id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_update_changes_only_given_fields() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let receipt = ReceiptStore::create(
            &store,
            owner,
            NewReceipt {
                title: "Lunch".to_owned(),
                template: Some("thermal".to_owned()),
                data: json!({"total": 12}),
            },
        )
        .await
        .unwrap();

        let updated = store
            .update(
                owner,
                receipt.id,
                ReceiptChanges {
                    title: Some("Dinner".to_owned()),
                    ..ReceiptChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Dinner");
        assert_eq!(updated.template.as_deref(), Some("thermal"));
        assert_eq!(updated.data, json!({"total": 12}));
    }

    #[tokio::test]
    async fn test_list_orders_most_recent_first() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        for title in ["first", "second"] {
            ReceiptStore::create(
                &store,
                owner,
                NewReceipt {
                    title: title.to_owned(),
                    template: None,
                    data: json!({}),
                },
            )
            .await
            .unwrap();
        }

        let titles: Vec<String> = store
            .list(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["second", "first"]);
    }
}
