use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use common_money::{parse_loose, round_cents};
use serde::Serialize;
use sqlx::FromRow;

/// Customer dimension row as synced from the ERP. Monetary columns are TEXT
/// (the sync pipeline writes upstream decimal strings verbatim) and must go
/// through the normalization boundary before any arithmetic.
#[derive(Debug, Clone, FromRow)]
pub struct RawCustomerRow {
    pub ns_id: i64,
    pub company_name: String,
    pub category: Option<String>,
    pub lifetime_revenue: Option<String>,
    pub ytd_revenue: Option<String>,
    pub avg_order_value: Option<String>,
    pub revenue_trend: Option<String>,
    pub first_sale_date: Option<NaiveDate>,
    pub last_sale_date: Option<NaiveDate>,
    pub lifetime_orders: Option<i64>,
    pub health_status: Option<String>,
    pub segment: Option<String>,
    pub manually_churned: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One wholesale transaction. Totals are negative for credit memos.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub customer_id: i64,
    pub tran_date: NaiveDate,
    pub total: f64,
    pub tran_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    AtRisk,
    Churning,
    Churned,
    NeverOrdered,
    Unknown,
}

impl HealthStatus {
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("healthy") => HealthStatus::Healthy,
            Some("at_risk") | Some("at risk") => HealthStatus::AtRisk,
            Some("churning") => HealthStatus::Churning,
            Some("churned") => HealthStatus::Churned,
            Some("never_ordered") | Some("never ordered") => HealthStatus::NeverOrdered,
            _ => HealthStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::AtRisk => "at_risk",
            HealthStatus::Churning => "churning",
            HealthStatus::Churned => "churned",
            HealthStatus::NeverOrdered => "never_ordered",
            HealthStatus::Unknown => "unknown",
        }
    }

    /// The band the at-risk cohort is drawn from.
    pub fn is_at_risk_band(&self) -> bool {
        matches!(
            self,
            HealthStatus::AtRisk | HealthStatus::Churning | HealthStatus::Churned
        )
    }
}

/// Canonical customer segment. The 6-tier scheme that predates the segment
/// migration survives only as [`LegacySegment`] and its translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Major,
    Mid,
    Small,
}

impl Segment {
    /// Resolve a stored label (either scheme) or, when absent or
    /// unrecognized, derive from lifetime revenue via the legacy breakpoints.
    pub fn parse(label: Option<&str>, lifetime_revenue: f64) -> Self {
        if let Some(label) = label {
            match label.trim().to_ascii_lowercase().as_str() {
                "major" => return Segment::Major,
                "large" | "mid" | "medium" => return Segment::Mid,
                "small" | "starter" | "minimal" => return Segment::Small,
                _ => {}
            }
        }
        LegacySegment::from_revenue(lifetime_revenue).canonical()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Major => "major",
            Segment::Mid => "mid",
            Segment::Small => "small",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacySegment {
    Major,
    Large,
    Mid,
    Small,
    Starter,
    Minimal,
}

impl LegacySegment {
    /// Revenue breakpoints from before the segment migration. Data synced
    /// under the old scheme still resolves through these.
    pub fn from_revenue(lifetime_revenue: f64) -> Self {
        if lifetime_revenue >= 50_000.0 {
            LegacySegment::Major
        } else if lifetime_revenue >= 20_000.0 {
            LegacySegment::Large
        } else if lifetime_revenue >= 10_000.0 {
            LegacySegment::Mid
        } else if lifetime_revenue >= 5_000.0 {
            LegacySegment::Small
        } else if lifetime_revenue >= 2_000.0 {
            LegacySegment::Starter
        } else {
            LegacySegment::Minimal
        }
    }

    pub fn canonical(self) -> Segment {
        match self {
            LegacySegment::Major => Segment::Major,
            LegacySegment::Large | LegacySegment::Mid => Segment::Mid,
            LegacySegment::Small | LegacySegment::Starter | LegacySegment::Minimal => {
                Segment::Small
            }
        }
    }
}

/// Presentation-ready customer record, normalized once per request.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRecord {
    pub customer_id: i64,
    pub company_name: String,
    pub category: Option<String>,
    pub is_corporate_gifting: bool,
    pub manually_churned: bool,
    pub lifetime_revenue: f64,
    pub ytd_revenue: f64,
    pub avg_order_value: f64,
    pub revenue_trend: f64,
    pub lifetime_orders: i64,
    pub first_sale_date: Option<NaiveDate>,
    pub last_sale_date: Option<NaiveDate>,
    pub days_since_last_order: Option<i64>,
    pub health_status: HealthStatus,
    pub segment: Segment,
    pub created_at: Option<DateTime<Utc>>,
}

/// First and last transaction date observed for a customer in the bulk load.
#[derive(Debug, Clone, Copy)]
pub struct DateSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

pub fn observed_spans(transactions: &[TransactionRecord]) -> HashMap<i64, DateSpan> {
    let mut spans: HashMap<i64, DateSpan> = HashMap::new();
    for txn in transactions {
        spans
            .entry(txn.customer_id)
            .and_modify(|span| {
                if txn.tran_date < span.first {
                    span.first = txn.tran_date;
                }
                if txn.tran_date > span.last {
                    span.last = txn.tran_date;
                }
            })
            .or_insert(DateSpan {
                first: txn.tran_date,
                last: txn.tran_date,
            });
    }
    spans
}

impl CustomerRecord {
    /// Single normalization boundary for customer dimension rows.
    ///
    /// Malformed monetary strings coerce to zero. `days_since_last_order` is
    /// computed from `now`, never read from a stored column. Observed
    /// transaction dates reconcile against the possibly-stale dimension dates:
    /// earliest wins for the first sale, latest wins for the last.
    pub fn from_row(row: RawCustomerRow, observed: Option<&DateSpan>, now: NaiveDate) -> Self {
        let lifetime_revenue = round_cents(parse_loose(row.lifetime_revenue.as_deref()));
        let ytd_revenue = round_cents(parse_loose(row.ytd_revenue.as_deref()));
        let avg_order_value = round_cents(parse_loose(row.avg_order_value.as_deref()));
        // trend is a percentage, not a monetary amount; no cent rounding
        let revenue_trend = parse_loose(row.revenue_trend.as_deref());
        let lifetime_orders = row.lifetime_orders.unwrap_or(0).max(0);

        let first_sale_date = match (row.first_sale_date, observed.map(|s| s.first)) {
            (Some(stored), Some(seen)) => Some(stored.min(seen)),
            (stored, seen) => stored.or(seen),
        };
        let last_sale_date = match (row.last_sale_date, observed.map(|s| s.last)) {
            (Some(stored), Some(seen)) => Some(stored.max(seen)),
            (stored, seen) => stored.or(seen),
        };
        let days_since_last_order = last_sale_date.map(|d| (now - d).num_days());

        let is_corporate_gifting = row
            .category
            .as_deref()
            .map(|c| c.to_ascii_lowercase().contains("corporate"))
            .unwrap_or(false);

        // A customer with no orders can never sit in an ordered health bucket,
        // whatever the synced label claims.
        let health_status = if lifetime_orders == 0 {
            HealthStatus::NeverOrdered
        } else {
            HealthStatus::parse(row.health_status.as_deref())
        };
        let segment = Segment::parse(row.segment.as_deref(), lifetime_revenue);

        Self {
            customer_id: row.ns_id,
            company_name: row.company_name,
            category: row.category,
            is_corporate_gifting,
            manually_churned: row.manually_churned.unwrap_or(false),
            lifetime_revenue,
            ytd_revenue,
            avg_order_value,
            revenue_trend,
            lifetime_orders,
            first_sale_date,
            last_sale_date,
            days_since_last_order,
            health_status,
            segment,
            created_at: row.created_at,
        }
    }
}
