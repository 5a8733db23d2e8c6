// src/leave/service.rs
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Business operations behind leave expiration. Each one is idempotent.
#[async_trait]
pub trait LeaveManagementService: Send + Sync {
    /// Activate future leaves whose start date has arrived.
    async fn activate_future_leaves(&self) -> Result<()>;

    /// Expire kitchen leaves, moving staff back to active or their next leave.
    async fn expire_kitchen_leaves(&self) -> Result<()>;

    /// Flag expired on-leave records. Does not change their status.
    async fn check_expired_on_leaves(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaveStep {
    ActivateFutureLeaves,
    ExpireKitchenLeaves,
    CheckExpiredOnLeaves,
}

impl LeaveStep {
    /// Execution order of one expiration run.
    pub const SEQUENCE: [LeaveStep; 3] = [
        LeaveStep::ActivateFutureLeaves,
        LeaveStep::ExpireKitchenLeaves,
        LeaveStep::CheckExpiredOnLeaves,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStep::ActivateFutureLeaves => "activate_future_leaves",
            LeaveStep::ExpireKitchenLeaves => "expire_kitchen_leaves",
            LeaveStep::CheckExpiredOnLeaves => "check_expired_on_leaves",
        }
    }

    pub async fn run(self, service: &dyn LeaveManagementService) -> Result<()> {
        match self {
            LeaveStep::ActivateFutureLeaves => service.activate_future_leaves().await,
            LeaveStep::ExpireKitchenLeaves => service.expire_kitchen_leaves().await,
            LeaveStep::CheckExpiredOnLeaves => service.check_expired_on_leaves().await,
        }
    }
}

impl fmt::Display for LeaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
