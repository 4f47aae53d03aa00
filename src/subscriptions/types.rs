//! Subscription types
//!
//! Records as delivered by the backend, the stats summary, and the
//! add-subscription form input with its client-side validation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::derive::round_money;
use crate::error::{ClientError, ClientResult};

/// Backend identifier of a subscription
pub type SubscriptionId = i64;

/// Billing cadence of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalType {
    #[default]
    Monthly,
    Yearly,
}

impl RenewalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalType::Monthly => "monthly",
            RenewalType::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RenewalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenewalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "monthly" => Ok(RenewalType::Monthly),
            "yearly" => Ok(RenewalType::Yearly),
            other => Err(format!(
                "Invalid renewal type '{}': expected 'monthly' or 'yearly'",
                other
            )),
        }
    }
}

/// A subscription record owned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub cost: Decimal,
    pub subscription_date: NaiveDate,
    pub renewal_type: RenewalType,
    /// Next renewal, computed by the backend
    pub renewal_date: NaiveDate,
    /// Computed by the backend
    #[serde(default)]
    pub renewing_in_7_days: bool,
    /// Timestamps are kept as delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Pre-computed totals from the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub monthly_cost: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub yearly_cost: Decimal,
    #[serde(default)]
    pub subscription_count: Option<u64>,
    #[serde(default)]
    pub service_costs: Vec<ServiceCost>,
}

/// Per-service breakdown included in the backend stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub name: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub monthly_cost: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub yearly_cost: Decimal,
}

/// The backend reports `null` totals for an empty list.
fn decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw add-subscription input, before validation
#[derive(Debug, Clone, Default)]
pub struct NewSubscription {
    pub name: String,
    pub cost: String,
    pub subscription_date: Option<NaiveDate>,
    pub renewal_type: RenewalType,
}

impl NewSubscription {
    pub fn new(name: impl Into<String>, cost: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cost: cost.into(),
            ..Default::default()
        }
    }

    pub fn subscription_date(mut self, date: NaiveDate) -> Self {
        self.subscription_date = Some(date);
        self
    }

    pub fn renewal_type(mut self, renewal_type: RenewalType) -> Self {
        self.renewal_type = renewal_type;
        self
    }

    /// Check the input and normalize the cost to two decimal places
    pub fn validate(&self) -> ClientResult<SubscriptionDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation(
                "Please enter a subscription name".to_string(),
            ));
        }

        // Positive after rounding, so nothing is sent as "0.00"
        let cost = parse_cost(&self.cost)
            .map(round_money)
            .filter(|c| c.is_sign_positive() && !c.is_zero())
            .ok_or_else(|| ClientError::Validation("Please enter a valid cost".to_string()))?;

        let subscription_date = self.subscription_date.ok_or_else(|| {
            ClientError::Validation("Please select a subscription date".to_string())
        })?;

        Ok(SubscriptionDraft {
            name: name.to_string(),
            cost: cost.to_string(),
            subscription_date,
            renewal_type: self.renewal_type,
        })
    }
}

/// Plain decimal or exponent notation only; `Decimal` alone would also take
/// digit-group underscores such as `1_0`.
fn parse_cost(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty()
        || !raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Validated payload for `POST /api/subscriptions/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionDraft {
    pub name: String,
    /// Fixed two-decimal string, e.g. `"15.90"`
    pub cost: String,
    pub subscription_date: NaiveDate,
    pub renewal_type: RenewalType,
}
