//! # Subtrack
//!
//! Client-side core of a personal subscription tracker: authentication
//! session handling, subscription state synchronized with a REST backend,
//! and the cost derivations shown on the dashboard.
//!
//! ## Modules
//!
//! - [`session`]: Session store with a persisted bearer token
//! - [`gateway`]: Authenticated HTTP gateway to the backend
//! - [`auth`]: Login and registration flows
//! - [`subscriptions`]: Subscription repository, types and CSV bulk upload
//! - [`derive`]: Pure cost derivations (totals, chart series, savings)
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use subtrack::config::Config;
//! use subtrack::derive::{local_totals, savings_projections, SavingsPolicy};
//! use subtrack::gateway::Gateway;
//! use subtrack::session::{FileTokenStore, SessionStore};
//! use subtrack::subscriptions::SubscriptionRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let gateway = Gateway::new(&config.api)?;
//!
//!     // Restore the session from the persisted token
//!     let mut session = SessionStore::new(FileTokenStore::new(config.session.token_path()));
//!     session.initialize(&gateway).await;
//!
//!     // Load subscriptions and backend totals
//!     let mut repo = SubscriptionRepository::new(session.authorized(&gateway)?);
//!     repo.refresh().await?;
//!
//!     let totals = local_totals(repo.subscriptions());
//!     println!("Monthly: ${}", totals.total_monthly);
//!
//!     for p in savings_projections(repo.subscriptions(), SavingsPolicy::default()) {
//!         println!("{}: save ${} per year", p.name, p.savings.round_dp(2));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod derive;
pub mod error;
pub mod gateway;
pub mod session;
pub mod subscriptions;

#[cfg(test)]
pub(crate) mod testing;

// Re-export top-level types for convenience
pub use error::{ClientError, ClientResult, RejectionBody};

pub use gateway::{Expect, Gateway};

pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionStore, TokenStore, UserSummary};

pub use auth::{Credentials, Registration};

pub use subscriptions::{
    BulkUploadFile, NewSubscription, RenewalType, StatsSummary, Subscription, SubscriptionId,
    SubscriptionRepository,
};

pub use derive::{
    ChartPoint, LocalTotals, SavingsPolicy, SavingsProjection, DEFAULT_YEARLY_DISCOUNT,
};

pub use config::{Config, ConfigError};
