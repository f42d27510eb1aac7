//! Period repository for the global ledger lock and budget period locks.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use socai_core::actor::ActorRole;
use socai_core::budget::types::BudgetPeriod;
use socai_core::period::{validate_unlock_request, PeriodError};

use crate::entities::{budget_periods, ledger_lock};

const LOCK_ROW_ID: i32 = 1;

fn db_err(err: sea_orm::DbErr) -> PeriodError {
    PeriodError::Database(err.to_string())
}

fn to_core_period(model: budget_periods::Model) -> Result<BudgetPeriod, PeriodError> {
    let period = u32::try_from(model.period)
        .map_err(|_| PeriodError::Database(format!("corrupt period number {}", model.period)))?;
    Ok(BudgetPeriod {
        id: model.id,
        fiscal_year: model.fiscal_year,
        period,
        warning_threshold: model.warning_threshold,
        block_threshold: model.block_threshold,
        allow_override: model.allow_override,
        is_locked: model.is_locked,
    })
}

/// Repository for lock state reads and writes.
#[derive(Debug)]
pub struct PeriodRepository {
    db: DatabaseConnection,
}

impl PeriodRepository {
    /// Creates a new period repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads the global "locked until" accounting date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn locked_until(&self) -> Result<Option<NaiveDate>, PeriodError> {
        let row = ledger_lock::Entity::find_by_id(LOCK_ROW_ID)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.and_then(|r| r.locked_until))
    }

    /// Moves the global lock date, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_locked_until(
        &self,
        locked_until: Option<NaiveDate>,
        actor: &str,
    ) -> Result<Option<NaiveDate>, PeriodError> {
        let previous = self.locked_until().await?;

        let row = ledger_lock::ActiveModel {
            id: Set(LOCK_ROW_ID),
            locked_until: Set(locked_until),
            updated_by: Set(Some(actor.to_string())),
            updated_at: Set(Utc::now().into()),
        };
        ledger_lock::Entity::update(row)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(previous)
    }

    /// Finds the budget period settings for a fiscal year and period, if
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_period(
        &self,
        fiscal_year: i32,
        period: u32,
    ) -> Result<Option<BudgetPeriod>, PeriodError> {
        let period = i32::try_from(period)
            .map_err(|_| PeriodError::Database(format!("period number {period} out of range")))?;
        let model = budget_periods::Entity::find()
            .filter(budget_periods::Column::FiscalYear.eq(fiscal_year))
            .filter(budget_periods::Column::Period.eq(period))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(to_core_period).transpose()
    }

    /// Locks a budget period against spending.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown period id.
    pub async fn lock_period(
        &self,
        id: Uuid,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<BudgetPeriod, PeriodError> {
        let model = budget_periods::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(PeriodError::NotFound(id))?;

        let mut active: budget_periods::ActiveModel = model.into();
        active.is_locked = Set(true);
        active.locked_by = Set(Some(actor.to_string()));
        active.lock_reason = Set(reason.map(String::from));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await.map_err(db_err)?;
        to_core_period(updated)
    }

    /// Unlocks a budget period. Requires an elevated role and a reason.
    ///
    /// `locked_by` and `lock_reason` describe who currently holds the
    /// lock, so both are cleared; the unlocking actor and the reason
    /// belong to the audit trail.
    ///
    /// # Errors
    ///
    /// Returns `UnlockReasonRequired`, `UnlockForbidden` or `NotFound`
    /// per the unlock rules.
    pub async fn unlock_period(
        &self,
        id: Uuid,
        reason: &str,
        role: ActorRole,
    ) -> Result<BudgetPeriod, PeriodError> {
        validate_unlock_request(reason, role)?;

        let model = budget_periods::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(PeriodError::NotFound(id))?;

        let mut active: budget_periods::ActiveModel = model.into();
        active.is_locked = Set(false);
        active.locked_by = Set(None);
        active.lock_reason = Set(None);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await.map_err(db_err)?;
        to_core_period(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn period_model(period: i32) -> budget_periods::Model {
        budget_periods::Model {
            id: Uuid::new_v4(),
            fiscal_year: 2025,
            period,
            warning_threshold: dec!(0.8),
            block_threshold: dec!(1.0),
            allow_override: true,
            is_locked: false,
            locked_by: None,
            lock_reason: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_period_model_converts() {
        let period = to_core_period(period_model(3)).unwrap();
        assert_eq!(period.period, 3);
        assert_eq!(period.warning_threshold, dec!(0.8));
        assert!(period.allow_override);
    }

    #[test]
    fn test_negative_period_number_is_corrupt() {
        assert!(to_core_period(period_model(-1)).is_err());
    }

    // Unlocking must not leave the unlocker recorded as the lock holder.
    #[tokio::test]
    async fn test_unlock_clears_lock_attribution() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let mut locked = period_model(6);
        locked.is_locked = true;
        locked.locked_by = Some("ke.toan@don-vi.vn".to_string());
        locked.lock_reason = Some("thang 6 closed".to_string());
        let id = locked.id;

        let mut unlocked = locked.clone();
        unlocked.is_locked = false;
        unlocked.locked_by = None;
        unlocked.lock_reason = None;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![locked]])
            .append_query_results([vec![unlocked]])
            .into_connection();

        // `DatabaseConnection` is not `Clone` with the mock feature; keep a
        // second handle over the same mocker by cloning the inner `Arc`.
        let db_handle = match &db {
            DatabaseConnection::MockDatabaseConnection(conn) => {
                DatabaseConnection::MockDatabaseConnection(std::sync::Arc::clone(conn))
            }
            _ => unreachable!("not a mock connection"),
        };
        let repo = PeriodRepository::new(db_handle);
        let period = repo
            .unlock_period(id, "correction approved by management", ActorRole::ChiefAccountant)
            .await
            .unwrap();
        assert!(!period.is_locked);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("UPDATE \"budget_periods\""));
        assert!(!log.contains("correction approved by management"));
        assert!(!log.contains("ke.toan@don-vi.vn"));
    }
}
