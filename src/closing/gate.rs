//! Mutation gate
//!
//! Every create, update and delete on a dated record passes through here
//! before touching storage. The check and the subsequent write are not atomic:
//! a period closed between the two does not stop a write already past the
//! gate.

use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry::ClosingRegistry;
use crate::types::{Result, SawitError};

/// Kind of write being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Create => write!(f, "create"),
            Mutation::Update => write!(f, "update"),
            Mutation::Delete => write!(f, "delete"),
        }
    }
}

/// Rejects writes whose date falls inside an active closing period
#[derive(Clone)]
pub struct MutationGate {
    registry: Arc<dyn ClosingRegistry>,
}

impl MutationGate {
    pub fn new(registry: Arc<dyn ClosingRegistry>) -> Self {
        Self { registry }
    }

    /// Check a single date for the given operation
    pub async fn check(&self, op: Mutation, day: NaiveDate) -> Result<()> {
        match self.registry.find_covering(day).await? {
            Some(period) => {
                warn!(
                    operation = %op,
                    date = %day,
                    period_id = %period.id,
                    "Write blocked by closed period"
                );
                Err(SawitError::PeriodClosed(day))
            }
            None => {
                debug!(operation = %op, date = %day, "Gate passed");
                Ok(())
            }
        }
    }

    /// Check an update against the stored date and, if it moves, the new date
    pub async fn check_update(&self, existing: NaiveDate, incoming: Option<NaiveDate>) -> Result<()> {
        self.check(Mutation::Update, existing).await?;
        match incoming {
            Some(day) if day != existing => self.check(Mutation::Update, day).await,
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closing::{MemoryClosingRegistry, NewClosingPeriod};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn gate_with_january_closed() -> (MutationGate, Arc<MemoryClosingRegistry>) {
        let registry = Arc::new(MemoryClosingRegistry::new());
        registry
            .create_closing_period(
                NewClosingPeriod::new(day(2025, 1, 1), day(2025, 1, 31), Some(1), Some(2025), None, None)
                    .unwrap(),
            )
            .await
            .unwrap();
        (MutationGate::new(registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_blocks_all_operations_inside_period() {
        let (gate, _) = gate_with_january_closed().await;
        for op in [Mutation::Create, Mutation::Update, Mutation::Delete] {
            let err = gate.check(op, day(2025, 1, 15)).await.unwrap_err();
            assert!(matches!(err, SawitError::PeriodClosed(d) if d == day(2025, 1, 15)));
        }
    }

    #[tokio::test]
    async fn test_allows_outside_period() {
        let (gate, _) = gate_with_january_closed().await;
        assert!(gate.check(Mutation::Create, day(2025, 2, 1)).await.is_ok());
        assert!(gate.check(Mutation::Delete, day(2024, 12, 31)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_checks_existing_and_incoming() {
        let (gate, _) = gate_with_january_closed().await;

        // Stored inside the closed month
        assert!(gate.check_update(day(2025, 1, 20), Some(day(2025, 2, 3))).await.is_err());
        // Moving into the closed month
        assert!(gate.check_update(day(2025, 2, 3), Some(day(2025, 1, 20))).await.is_err());
        // Staying open
        assert!(gate.check_update(day(2025, 2, 3), Some(day(2025, 2, 4))).await.is_ok());
        assert!(gate.check_update(day(2025, 2, 3), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_reopen_lifts_block() {
        let (gate, registry) = gate_with_january_closed().await;
        let id = registry.list().await.unwrap()[0].id.clone();
        assert!(gate.check(Mutation::Create, day(2025, 1, 15)).await.is_err());

        registry.reopen_period(&id).await.unwrap();
        assert!(gate.check(Mutation::Create, day(2025, 1, 15)).await.is_ok());
    }
}
