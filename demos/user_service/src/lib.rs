//! Example service: users kept in an in-memory store.
//!
//! The business logic lives in [`UserService`] and knows nothing about HTTP.
//! Its operations are exposed by listing them in the [`Service`] impl:
//!
//! | Operation | Verb | Parameters |
//! |-----------|------|------------|
//! | `Create` | `POST` | JSON body `{"Name":..,"Email":..}` |
//! | `Get` | `GET` | `?ID=` |
//! | `Recent` | `GET` | `?Page=&PerPage=` |
//! | `Delete` | `POST` | JSON body `{"ID":..}` |

use serde::{Deserialize, Serialize};
use servicehandler::{Operations, Params, Service};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::RwLock;

/// Domain model of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Params)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Name")]
    #[validate(alphanum, required)]
    pub name: String,
    #[serde(rename = "Email")]
    #[validate(email, required)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Params)]
pub struct GetParams {
    #[serde(rename = "ID")]
    #[validate(required)]
    pub id: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Params)]
pub struct RecentParams {
    #[serde(rename = "Page")]
    pub page: u32,
    #[serde(rename = "PerPage")]
    #[validate(range(min = 1, max = 100))]
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Params)]
pub struct DeleteParams {
    #[serde(rename = "ID")]
    #[validate(required)]
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    Unavailable,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "User not found"),
            StoreError::Unavailable => write!(f, "User store unavailable"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence seam; any backend works as long as it implements this.
pub trait UserStore: Send + Sync {
    /// Store `user`, assigning the next id when its id is zero.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn save(&self, user: User) -> Result<i32, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id.
    fn get_by_id(&self, id: i32) -> Result<User, StoreError>;

    /// Users ordered newest first, `per_page` at a time.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn recent(&self, page: u32, per_page: u32) -> Result<Vec<User>, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id.
    fn delete(&self, id: i32) -> Result<(), StoreError>;
}

/// In-memory [`UserStore`] handing out sequential ids from 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sequence: AtomicI32,
    users: RwLock<BTreeMap<i32, User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn save(&self, mut user: User) -> Result<i32, StoreError> {
        if user.id == 0 {
            user.id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        }
        let id = user.id;
        self.users
            .write()
            .map_err(|_| StoreError::Unavailable)?
            .insert(id, user);
        Ok(id)
    }

    fn get_by_id(&self, id: i32) -> Result<User, StoreError> {
        self.users
            .read()
            .map_err(|_| StoreError::Unavailable)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn recent(&self, page: u32, per_page: u32) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Unavailable)?;
        let skip = page.saturating_sub(1) as usize * per_page as usize;
        Ok(users
            .values()
            .rev()
            .skip(skip)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    fn delete(&self, id: i32) -> Result<(), StoreError> {
        self.users
            .write()
            .map_err(|_| StoreError::Unavailable)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// Business logic over a [`UserStore`].
pub struct UserService {
    store: Box<dyn UserStore>,
}

impl UserService {
    pub fn new(store: impl UserStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn create(&self, user: User) -> Result<i32, StoreError> {
        self.store.save(user)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id.
    pub fn get(&self, params: GetParams) -> Result<User, StoreError> {
        self.store.get_by_id(params.id)
    }

    /// # Errors
    ///
    /// Store failure.
    pub fn recent(&self, params: RecentParams) -> Result<Vec<User>, StoreError> {
        self.store.recent(params.page, params.per_page)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id.
    pub fn delete(&self, params: DeleteParams) -> Result<(), StoreError> {
        self.store.delete(params.id)
    }
}

impl Service for UserService {
    fn operations(ops: &mut Operations<Self>) {
        ops.body("Create", UserService::create)
            .query("Get", UserService::get)
            .query("Recent", UserService::recent)
            .body("Delete", UserService::delete);
    }
}
