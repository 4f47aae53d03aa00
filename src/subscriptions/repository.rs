//! Subscription Repository
//!
//! Client-side view of the user's subscriptions: the in-memory list, the
//! last backend stats, and totals recomputed locally from the list.
//!
//! Backend stats are authoritative. After a successful create, upload or
//! delete they are re-fetched (unless disabled); the locally computed
//! [`LocalTotals`] are always derived from the in-memory list and are what
//! `delete` hands back immediately.

use serde_json::Value;

use super::csv_import::BulkUploadFile;
use super::types::{NewSubscription, StatsSummary, Subscription, SubscriptionId};
use crate::derive::{local_totals, LocalTotals};
use crate::error::ClientResult;
use crate::gateway::{Expect, Gateway};

pub const SUBSCRIPTIONS_PATH: &str = "/api/subscriptions/";
pub const STATS_PATH: &str = "/api/subscriptions/stats/";
pub const BULK_UPLOAD_PATH: &str = "/api/subscriptions/bulk_upload/";

fn delete_path(id: SubscriptionId) -> String {
    format!("/api/subscriptions/delete/{}/", id)
}

/// In-memory subscription state synchronized with the backend
pub struct SubscriptionRepository {
    gateway: Gateway,
    subscriptions: Vec<Subscription>,
    stats: Option<StatsSummary>,
    stats_stale: bool,
    totals: LocalTotals,
    refresh_stats_after_mutation: bool,
}

impl SubscriptionRepository {
    /// `gateway` should carry the session's token
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            subscriptions: Vec::new(),
            stats: None,
            stats_stale: false,
            totals: LocalTotals::default(),
            refresh_stats_after_mutation: true,
        }
    }

    /// Whether to re-fetch backend stats after each successful mutation
    pub fn refresh_stats_after_mutation(mut self, enabled: bool) -> Self {
        self.refresh_stats_after_mutation = enabled;
        self
    }

    /// Current in-memory list, in backend order
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Last stats received from the backend
    pub fn cached_stats(&self) -> Option<&StatsSummary> {
        self.stats.as_ref()
    }

    /// True when a mutation succeeded but the following stats refresh did not
    pub fn stats_stale(&self) -> bool {
        self.stats_stale
    }

    /// Totals computed from the in-memory list
    pub fn local_totals(&self) -> LocalTotals {
        self.totals
    }

    fn set_subscriptions(&mut self, subscriptions: Vec<Subscription>) {
        self.subscriptions = subscriptions;
        self.totals = local_totals(&self.subscriptions);
    }

    /// Fetch the full list, replacing the in-memory one
    pub async fn list(&mut self) -> ClientResult<&[Subscription]> {
        let subscriptions: Vec<Subscription> =
            self.gateway.get_json(SUBSCRIPTIONS_PATH, Expect::OK).await?;

        tracing::debug!(count = subscriptions.len(), "Fetched subscriptions");
        self.set_subscriptions(subscriptions);
        Ok(&self.subscriptions)
    }

    /// Fetch backend totals
    pub async fn stats(&mut self) -> ClientResult<StatsSummary> {
        let stats: StatsSummary = self.gateway.get_json(STATS_PATH, Expect::OK).await?;

        tracing::debug!(
            monthly = %stats.monthly_cost,
            yearly = %stats.yearly_cost,
            "Fetched stats"
        );
        self.stats = Some(stats.clone());
        self.stats_stale = false;
        Ok(stats)
    }

    /// List then stats, as on first load
    pub async fn refresh(&mut self) -> ClientResult<()> {
        self.list().await?;
        self.stats().await?;
        Ok(())
    }

    /// Validate and create a subscription.
    ///
    /// Invalid input fails before any request is sent. Only `201 Created`
    /// counts as success.
    pub async fn create(&mut self, input: &NewSubscription) -> ClientResult<Subscription> {
        let draft = input.validate()?;

        let created: Subscription = self
            .gateway
            .post_json(SUBSCRIPTIONS_PATH, &draft, Expect::CREATED)
            .await?;

        tracing::info!(id = created.id, name = %created.name, "Created subscription");

        let mut subscriptions = self.subscriptions.clone();
        subscriptions.push(created.clone());
        self.set_subscriptions(subscriptions);

        self.after_mutation().await;
        Ok(created)
    }

    /// Upload a CSV file; the backend's reply is returned as-is.
    ///
    /// The imported rows are unknown to the client, so the list is re-fetched
    /// together with the stats when refreshing is enabled.
    pub async fn bulk_upload(&mut self, file: BulkUploadFile) -> ClientResult<Value> {
        let file_name = file.file_name().to_string();
        let result: Value = self
            .gateway
            .post_multipart(BULK_UPLOAD_PATH, file.into_form()?, Expect::OK_OR_CREATED)
            .await?;

        tracing::info!(file = %file_name, "Bulk upload accepted");

        if self.refresh_stats_after_mutation {
            if let Err(e) = self.list().await {
                tracing::warn!(error = %e, "Failed to refresh subscriptions after upload");
            }
        }
        self.after_mutation().await;
        Ok(result)
    }

    /// Delete a subscription and return the recomputed local totals
    pub async fn delete(&mut self, id: SubscriptionId) -> ClientResult<LocalTotals> {
        self.gateway.delete(&delete_path(id), Expect::Success).await?;

        tracing::info!(id, "Deleted subscription");

        let remaining = self
            .subscriptions
            .iter()
            .filter(|sub| sub.id != id)
            .cloned()
            .collect();
        self.set_subscriptions(remaining);

        self.after_mutation().await;
        Ok(self.totals)
    }

    async fn after_mutation(&mut self) {
        if !self.refresh_stats_after_mutation {
            self.stats_stale = self.stats.is_some();
            return;
        }

        if let Err(e) = self.stats().await {
            tracing::warn!(error = %e, "Failed to refresh stats after mutation");
            self.stats_stale = true;
        }
    }
}
