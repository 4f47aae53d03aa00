//! Subscriptions
//!
//! - **types**: records, stats and the add-subscription input
//! - **repository**: list/stats/create/upload/delete against the backend
//! - **csv_import**: bulk upload file handling and local preview

mod csv_import;
mod repository;
mod types;

pub use csv_import::{BulkUploadFile, CsvPreview, PreviewRow, FILE_FIELD, REQUIRED_COLUMNS};
pub use repository::{SubscriptionRepository, BULK_UPLOAD_PATH, STATS_PATH, SUBSCRIPTIONS_PATH};
pub use types::{
    NewSubscription, RenewalType, ServiceCost, StatsSummary, Subscription, SubscriptionDraft,
    SubscriptionId,
};
