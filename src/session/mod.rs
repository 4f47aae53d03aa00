//! Authentication Session
//!
//! - **SessionStore**: authentication status, bearer token and current user
//! - **TokenStore**: durable home of the token between runs
//!
//! ## Lifecycle
//!
//! 1. `SessionStore::new` starts in the pending phase (`loading == true`)
//! 2. `initialize` validates any persisted token against `GET /api/users/`
//! 3. `login` / `logout` move between signed-in and signed-out

mod store;
mod token_store;

pub use store::{fetch_current_user, Session, SessionStore, UserSummary, CURRENT_USER_PATH};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
