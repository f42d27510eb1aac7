//! Budget repository: estimates, the append-only transaction log,
//! authorizations and alerts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use socai_core::budget::{
    AlertStatus, AuthorizationStatus, BudgetAlert, BudgetAuthorization, BudgetBalances,
    BudgetError, BudgetEstimate, BudgetTransaction, BudgetTransactionKind,
};
use socai_shared::types::PageRequest;

use crate::entities::{budget_alerts, budget_authorizations, budget_estimates, budget_transactions};

fn db_err(err: sea_orm::DbErr) -> BudgetError {
    BudgetError::Database(err.to_string())
}

fn corrupt(what: &str, value: &str) -> BudgetError {
    BudgetError::Database(format!("corrupt {what} value '{value}'"))
}

fn to_core_transaction(model: budget_transactions::Model) -> Result<BudgetTransaction, BudgetError> {
    let kind = BudgetTransactionKind::parse(&model.kind)
        .ok_or_else(|| corrupt("transaction kind", &model.kind))?;
    Ok(BudgetTransaction {
        id: model.id,
        estimate_id: model.estimate_id,
        kind,
        amount: model.amount,
        voucher_id: model.voucher_id,
        doc_no: model.doc_no,
        description: model.description,
        created_at: model.created_at.into(),
    })
}

fn to_core_authorization(
    model: budget_authorizations::Model,
) -> Result<BudgetAuthorization, BudgetError> {
    let status = AuthorizationStatus::parse(&model.status)
        .ok_or_else(|| corrupt("authorization status", &model.status))?;
    Ok(BudgetAuthorization {
        id: model.id,
        estimate_id: model.estimate_id,
        requested_amount: model.requested_amount,
        approved_amount: model.approved_amount,
        available_snapshot: model.available_snapshot,
        status,
        requested_by: model.requested_by,
        decided_by: model.decided_by,
        reason: model.reason,
        justification: model.justification,
        expires_at: model.expires_at.into(),
        created_at: model.created_at.into(),
    })
}

fn to_core_alert(model: budget_alerts::Model) -> Result<BudgetAlert, BudgetError> {
    let severity = socai_core::budget::AlertSeverity::parse(&model.severity)
        .ok_or_else(|| corrupt("alert severity", &model.severity))?;
    let status =
        AlertStatus::parse(&model.status).ok_or_else(|| corrupt("alert status", &model.status))?;
    Ok(BudgetAlert {
        id: model.id,
        estimate_id: model.estimate_id,
        severity,
        status,
        utilization: model.utilization,
        message: model.message,
        acknowledged_by: model.acknowledged_by,
        resolution_notes: model.resolution_notes,
        created_at: model.created_at.into(),
    })
}

/// Budget repository.
#[derive(Debug)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads an estimate with its balances folded from the transaction
    /// log on top of the stored base amounts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_estimate(&self, id: Uuid) -> Result<BudgetEstimate, BudgetError> {
        let model = budget_estimates::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::NotFound(id))?;
        self.fold_estimate(model).await
    }

    /// Lists all estimates of a fiscal year with folded balances.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_estimates(&self, fiscal_year: i32) -> Result<Vec<BudgetEstimate>, BudgetError> {
        let models = budget_estimates::Entity::find()
            .filter(budget_estimates::Column::FiscalYear.eq(fiscal_year))
            .order_by_asc(budget_estimates::Column::Code)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut estimates = Vec::with_capacity(models.len());
        for model in models {
            estimates.push(self.fold_estimate(model).await?);
        }
        Ok(estimates)
    }

    async fn fold_estimate(
        &self,
        model: budget_estimates::Model,
    ) -> Result<BudgetEstimate, BudgetError> {
        let log = self.transactions_for_estimate(model.id).await?;
        let base = BudgetBalances {
            allocated: model.allocated_amount,
            committed: model.committed_amount,
            spent: model.spent_amount,
        };
        let balances = BudgetBalances::fold(base, &log);
        Ok(BudgetEstimate {
            id: model.id,
            code: model.code,
            name: model.name,
            fiscal_year: model.fiscal_year,
            allocated_amount: balances.allocated,
            committed_amount: balances.committed,
            spent_amount: balances.spent,
        })
    }

    /// Lists the transaction log of one estimate, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn transactions_for_estimate(
        &self,
        estimate_id: Uuid,
    ) -> Result<Vec<BudgetTransaction>, BudgetError> {
        let models = budget_transactions::Entity::find()
            .filter(budget_transactions::Column::EstimateId.eq(estimate_id))
            .order_by_asc(budget_transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(to_core_transaction).collect()
    }

    /// Lists the transaction log across all estimates of a fiscal year.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn transactions_for_fiscal_year(
        &self,
        fiscal_year: i32,
    ) -> Result<Vec<BudgetTransaction>, BudgetError> {
        let estimate_ids: Vec<Uuid> = budget_estimates::Entity::find()
            .filter(budget_estimates::Column::FiscalYear.eq(fiscal_year))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| m.id)
            .collect();

        if estimate_ids.is_empty() {
            return Ok(vec![]);
        }

        let models = budget_transactions::Entity::find()
            .filter(budget_transactions::Column::EstimateId.is_in(estimate_ids))
            .order_by_asc(budget_transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(to_core_transaction).collect()
    }

    /// Appends one entry to the transaction log. There is no update or
    /// delete path for this table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive amount and `NotFound`
    /// for an unknown estimate.
    pub async fn record_transaction(
        &self,
        estimate_id: Uuid,
        kind: BudgetTransactionKind,
        amount: Decimal,
        voucher_id: Option<Uuid>,
        doc_no: Option<&str>,
        description: &str,
    ) -> Result<BudgetTransaction, BudgetError> {
        if amount <= Decimal::ZERO {
            return Err(BudgetError::InvalidAmount(amount));
        }
        budget_estimates::Entity::find_by_id(estimate_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::NotFound(estimate_id))?;

        let model = budget_transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            estimate_id: Set(estimate_id),
            kind: Set(kind.as_str().to_string()),
            amount: Set(amount),
            voucher_id: Set(voucher_id),
            doc_no: Set(doc_no.map(String::from)),
            description: Set(description.to_string()),
            created_at: Set(Utc::now().into()),
        };
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        to_core_transaction(inserted)
    }

    /// Persists a new authorization request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_authorization(
        &self,
        auth: &BudgetAuthorization,
    ) -> Result<(), BudgetError> {
        let model = budget_authorizations::ActiveModel {
            id: Set(auth.id),
            estimate_id: Set(auth.estimate_id),
            requested_amount: Set(auth.requested_amount),
            approved_amount: Set(auth.approved_amount),
            available_snapshot: Set(auth.available_snapshot),
            status: Set(auth.status.as_str().to_string()),
            requested_by: Set(auth.requested_by.clone()),
            decided_by: Set(auth.decided_by.clone()),
            reason: Set(auth.reason.clone()),
            justification: Set(auth.justification.clone()),
            expires_at: Set(auth.expires_at.into()),
            created_at: Set(auth.created_at.into()),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Loads an authorization.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_authorization(&self, id: Uuid) -> Result<BudgetAuthorization, BudgetError> {
        let model = budget_authorizations::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::NotFound(id))?;
        to_core_authorization(model)
    }

    /// Writes back a decided authorization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn save_authorization_decision(
        &self,
        auth: &BudgetAuthorization,
    ) -> Result<(), BudgetError> {
        let model = budget_authorizations::Entity::find_by_id(auth.id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::NotFound(auth.id))?;

        let mut active: budget_authorizations::ActiveModel = model.into();
        active.status = Set(auth.status.as_str().to_string());
        active.approved_amount = Set(auth.approved_amount);
        active.decided_by = Set(auth.decided_by.clone());
        active.reason = Set(auth.reason.clone());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Finds an approved, unexpired authorization covering a spending of
    /// `amount` against the estimate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_covering_authorization(
        &self,
        estimate_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetAuthorization>, BudgetError> {
        let models = budget_authorizations::Entity::find()
            .filter(budget_authorizations::Column::EstimateId.eq(estimate_id))
            .filter(
                budget_authorizations::Column::Status.eq(AuthorizationStatus::Approved.as_str()),
            )
            .all(&self.db)
            .await
            .map_err(db_err)?;

        for model in models {
            let auth = to_core_authorization(model)?;
            if auth.covers(amount, now) {
                return Ok(Some(auth));
            }
        }
        Ok(None)
    }

    /// Persists a new alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_alert(&self, alert: &BudgetAlert) -> Result<(), BudgetError> {
        let model = budget_alerts::ActiveModel {
            id: Set(alert.id),
            estimate_id: Set(alert.estimate_id),
            severity: Set(alert.severity.as_str().to_string()),
            status: Set(alert.status.as_str().to_string()),
            utilization: Set(alert.utilization),
            message: Set(alert.message.clone()),
            acknowledged_by: Set(alert.acknowledged_by.clone()),
            resolution_notes: Set(alert.resolution_notes.clone()),
            created_at: Set(alert.created_at.into()),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Loads an alert.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_alert(&self, id: Uuid) -> Result<BudgetAlert, BudgetError> {
        let model = budget_alerts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::NotFound(id))?;
        to_core_alert(model)
    }

    /// Lists alerts, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        page: &PageRequest,
    ) -> Result<(Vec<BudgetAlert>, u64), BudgetError> {
        let mut query = budget_alerts::Entity::find();
        if let Some(status) = status {
            query = query.filter(budget_alerts::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let models = query
            .order_by_desc(budget_alerts::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let alerts = models
            .into_iter()
            .map(to_core_alert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((alerts, total))
    }

    /// Writes back an alert's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn save_alert(&self, alert: &BudgetAlert) -> Result<(), BudgetError> {
        let model = budget_alerts::Entity::find_by_id(alert.id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(BudgetError::NotFound(alert.id))?;

        let mut active: budget_alerts::ActiveModel = model.into();
        active.status = Set(alert.status.as_str().to_string());
        active.acknowledged_by = Set(alert.acknowledged_by.clone());
        active.resolution_notes = Set(alert.resolution_notes.clone());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
