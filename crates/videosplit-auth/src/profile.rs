//! Cached user profile
//!
//! The profile is a snapshot of `GET /api/v1/auth/me`. It is derived data:
//! it may be stale and is only refreshed when a profile fetch succeeds. The
//! plan tier it carries decides how many uploads may be queued at once.

use serde::{Deserialize, Serialize};

/// Subscription plan of the signed-in user.
///
/// Unknown tiers sent by a newer server deserialize as `Free`, the most
/// restrictive plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl PlanTier {
    pub fn label(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "starter" => Ok(PlanTier::Starter),
            "pro" => Ok(PlanTier::Pro),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(format!(
                "unknown plan tier '{other}' (expected free, starter, pro or enterprise)"
            )),
        }
    }
}

impl From<String> for PlanTier {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// Last-fetched user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub plan_tier: PlanTier,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub monthly_minutes_limit: i64,
    #[serde(default)]
    pub monthly_minutes_used: i64,
    #[serde(default)]
    pub subscription_status: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Profile {
    /// Minutes left this month, or `None` for unlimited plans.
    pub fn minutes_remaining(&self) -> Option<i64> {
        match self.plan_tier {
            PlanTier::Pro | PlanTier::Enterprise => None,
            PlanTier::Free | PlanTier::Starter => {
                Some((self.monthly_minutes_limit - self.monthly_minutes_used).max(0))
            }
        }
    }
}
