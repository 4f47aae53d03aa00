//! Cost derivations
//!
//! Pure functions over the in-memory subscription list: per-subscription
//! monthly and annual equivalents, locally computed totals, chart series,
//! savings projections, renewal helpers and display dates.
//!
//! All money math uses [`Decimal`]; nothing here touches the network.

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::subscriptions::{RenewalType, Subscription, SubscriptionId};

/// Assumed discount for moving a monthly plan to yearly billing (10%)
pub const DEFAULT_YEARLY_DISCOUNT: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Window used by the backend for its `renewing_in_7_days` flag
pub const RENEWAL_WINDOW_DAYS: i64 = 7;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Round to cents, half away from zero, always carrying two decimal places
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Cost normalized to a per-month figure
pub fn monthly_equivalent(sub: &Subscription) -> Decimal {
    match sub.renewal_type {
        RenewalType::Monthly => sub.cost,
        RenewalType::Yearly => sub.cost / MONTHS_PER_YEAR,
    }
}

/// Cost normalized to a per-year figure
pub fn annual_equivalent(sub: &Subscription) -> Decimal {
    match sub.renewal_type {
        RenewalType::Monthly => sub.cost * MONTHS_PER_YEAR,
        RenewalType::Yearly => sub.cost,
    }
}

/// Totals recomputed client-side from the in-memory list.
///
/// These are a different basis from the backend's [`StatsSummary`]
/// (the backend sums unrounded per-row values with its own precision), so the
/// two are kept as separate types.
///
/// [`StatsSummary`]: crate::subscriptions::StatsSummary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalTotals {
    pub total_monthly: Decimal,
    pub total_annual: Decimal,
}

/// Sum monthly and annual equivalents, each rounded to two places
pub fn local_totals(subs: &[Subscription]) -> LocalTotals {
    let (monthly, annual) = subs.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(monthly, annual), sub| (monthly + monthly_equivalent(sub), annual + annual_equivalent(sub)),
    );

    LocalTotals {
        total_monthly: round_money(monthly),
        total_annual: round_money(annual),
    }
}

/// One bar of the monthly-cost chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub name: String,
    pub monthly_cost: Decimal,
}

/// Monthly-equivalent cost per subscription, in list order
pub fn chart_series(subs: &[Subscription]) -> Vec<ChartPoint> {
    subs.iter()
        .map(|sub| ChartPoint {
            name: sub.name.clone(),
            monthly_cost: monthly_equivalent(sub),
        })
        .collect()
}

/// Discount assumption for savings projections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavingsPolicy {
    pub yearly_discount: Decimal,
}

impl Default for SavingsPolicy {
    fn default() -> Self {
        Self {
            yearly_discount: DEFAULT_YEARLY_DISCOUNT,
        }
    }
}

impl SavingsPolicy {
    pub fn new(yearly_discount: Decimal) -> Self {
        Self { yearly_discount }
    }
}

/// Projected savings from switching one monthly subscription to yearly
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsProjection {
    pub id: SubscriptionId,
    pub name: String,
    pub monthly_cost: Decimal,
    pub yearly_cost: Decimal,
    pub potential_yearly_cost: Decimal,
    pub savings: Decimal,
}

/// Savings for every monthly subscription; yearly ones are skipped.
///
/// Values are exact; round with [`round_money`] for display.
pub fn savings_projections(subs: &[Subscription], policy: SavingsPolicy) -> Vec<SavingsProjection> {
    subs.iter()
        .filter(|sub| sub.renewal_type == RenewalType::Monthly)
        .map(|sub| {
            let yearly_cost = sub.cost * MONTHS_PER_YEAR;
            let discount = yearly_cost * policy.yearly_discount;
            let potential_yearly_cost = yearly_cost - discount;

            SavingsProjection {
                id: sub.id,
                name: sub.name.clone(),
                monthly_cost: sub.cost,
                yearly_cost,
                potential_yearly_cost,
                savings: yearly_cost - potential_yearly_cost,
            }
        })
        .collect()
}

/// Subscriptions the backend flagged as renewing within the week
pub fn upcoming_renewals(subs: &[Subscription]) -> Vec<&Subscription> {
    subs.iter().filter(|sub| sub.renewing_in_7_days).collect()
}

/// Next renewal after `start`: one calendar month or one calendar year later,
/// clamped to the end of shorter months.
pub fn renewal_date(start: NaiveDate, renewal_type: RenewalType) -> Option<NaiveDate> {
    let months = match renewal_type {
        RenewalType::Monthly => Months::new(1),
        RenewalType::Yearly => Months::new(12),
    };
    start.checked_add_months(months)
}

/// Whether a subscription started on `start` renews within `days` of `today`.
///
/// Renewals already in the past count as due.
pub fn renews_within(
    start: NaiveDate,
    renewal_type: RenewalType,
    today: NaiveDate,
    days: i64,
) -> bool {
    renewal_date(start, renewal_type)
        .map(|renewal| (renewal - today).num_days() <= days)
        .unwrap_or(false)
}

/// Long-form display date, e.g. `January 5, 2025`
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
