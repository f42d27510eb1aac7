//! Audit repository: append-only trail, anomalies and reconciliations.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use socai_core::audit::{
    Anomaly, AnomalyKind, AnomalyStatus, AuditAction, AuditError, AuditRecordContent,
    AuditTrailRecord, ReconciliationRecord, ReconciliationStatus, VerificationOutcome,
};
use socai_shared::types::PageRequest;

use crate::entities::{anomalies, audit_trail, reconciliations};

fn db_err(err: sea_orm::DbErr) -> AuditError {
    AuditError::Database(err.to_string())
}

fn corrupt(what: &str, value: &str) -> AuditError {
    AuditError::Database(format!("corrupt {what} value '{value}'"))
}

fn to_core_record(model: audit_trail::Model) -> Result<AuditTrailRecord, AuditError> {
    let action =
        AuditAction::parse(&model.action).ok_or_else(|| corrupt("audit action", &model.action))?;
    let changed_fields: Vec<String> = serde_json::from_value(model.changed_fields)
        .map_err(|e| AuditError::Database(format!("corrupt changed_fields: {e}")))?;
    Ok(AuditTrailRecord {
        id: model.id,
        content: AuditRecordContent {
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            action,
            actor: model.actor,
            reason: model.reason,
            before: model.before_snapshot,
            after: model.after_snapshot,
            changed_fields,
            occurred_at: model.occurred_at.into(),
        },
        fingerprint: model.fingerprint,
    })
}

fn to_core_anomaly(model: anomalies::Model) -> Result<Anomaly, AuditError> {
    let kind =
        AnomalyKind::parse(&model.kind).ok_or_else(|| corrupt("anomaly kind", &model.kind))?;
    let status = AnomalyStatus::parse(&model.status)
        .ok_or_else(|| corrupt("anomaly status", &model.status))?;
    Ok(Anomaly {
        id: model.id,
        fiscal_year: model.fiscal_year,
        kind,
        root_cause_key: model.root_cause_key,
        description: model.description,
        status,
        acknowledged_by: model.acknowledged_by,
        resolution_notes: model.resolution_notes,
        created_at: model.created_at.into(),
    })
}

fn to_core_reconciliation(model: reconciliations::Model) -> Result<ReconciliationRecord, AuditError> {
    let status = ReconciliationStatus::parse(&model.status)
        .ok_or_else(|| corrupt("reconciliation status", &model.status))?;
    let outstanding_items = serde_json::from_value(model.outstanding_items)
        .map_err(|e| AuditError::Database(format!("corrupt outstanding_items: {e}")))?;
    let adjustments = serde_json::from_value(model.adjustments)
        .map_err(|e| AuditError::Database(format!("corrupt adjustments: {e}")))?;
    Ok(ReconciliationRecord {
        id: model.id,
        account_code: model.account_code,
        as_of_date: model.as_of_date,
        book_balance: model.book_balance,
        external_balance: model.external_balance,
        difference: model.difference,
        outstanding_items,
        adjustments,
        status,
        created_by: model.created_by,
        approved_by: model.approved_by,
        created_at: model.created_at.into(),
    })
}

/// Filter options for querying the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by entity type.
    pub entity_type: Option<String>,
    /// Filter by actor.
    pub actor: Option<String>,
    /// Filter by action.
    pub action: Option<String>,
    /// Occurrence range start.
    pub from: Option<DateTime<Utc>>,
    /// Occurrence range end.
    pub to: Option<DateTime<Utc>>,
}

/// Audit repository.
#[derive(Debug)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a sealed record to the trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn append(&self, record: &AuditTrailRecord) -> Result<(), AuditError> {
        let changed_fields = serde_json::to_value(&record.content.changed_fields)
            .map_err(|e| AuditError::Database(e.to_string()))?;
        let model = audit_trail::ActiveModel {
            id: Set(record.id),
            entity_type: Set(record.content.entity_type.clone()),
            entity_id: Set(record.content.entity_id.clone()),
            action: Set(record.content.action.as_str().to_string()),
            actor: Set(record.content.actor.clone()),
            reason: Set(record.content.reason.clone()),
            before_snapshot: Set(record.content.before.clone()),
            after_snapshot: Set(record.content.after.clone()),
            changed_fields: Set(changed_fields),
            fingerprint: Set(record.fingerprint.clone()),
            occurred_at: Set(record.content.occurred_at.into()),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Queries the trail, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn query(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> Result<(Vec<AuditTrailRecord>, u64), AuditError> {
        let mut query = audit_trail::Entity::find();
        if let Some(entity_type) = &filter.entity_type {
            query = query.filter(audit_trail::Column::EntityType.eq(entity_type));
        }
        if let Some(actor) = &filter.actor {
            query = query.filter(audit_trail::Column::Actor.eq(actor));
        }
        if let Some(action) = &filter.action {
            query = query.filter(audit_trail::Column::Action.eq(action));
        }
        if let Some(from) = filter.from {
            query = query.filter(audit_trail::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(audit_trail::Column::OccurredAt.lte(to));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let models = query
            .order_by_desc(audit_trail::Column::OccurredAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let records = models
            .into_iter()
            .map(to_core_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    /// Returns the entire trail, oldest first, for export.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn export_all(&self) -> Result<Vec<AuditTrailRecord>, AuditError> {
        let models = audit_trail::Entity::find()
            .order_by_asc(audit_trail::Column::OccurredAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(to_core_record).collect()
    }

    /// Returns the full history of one entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn entity_history(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditTrailRecord>, AuditError> {
        let models = audit_trail::Entity::find()
            .filter(audit_trail::Column::EntityType.eq(entity_type))
            .filter(audit_trail::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_trail::Column::OccurredAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(to_core_record).collect()
    }

    /// Loads one record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_record(&self, id: Uuid) -> Result<AuditTrailRecord, AuditError> {
        let model = audit_trail::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuditError::NotFound(id))?;
        to_core_record(model)
    }

    /// Recomputes a record's fingerprint, compares it with the stored one
    /// and appends the verification itself to the trail.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn verify_integrity(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<VerificationOutcome, AuditError> {
        let record = self.find_record(id).await?;
        let outcome = record.verify();

        let verification = AuditTrailRecord::seal(AuditRecordContent {
            entity_type: "audit_record".to_string(),
            entity_id: id.to_string(),
            action: AuditAction::Verify,
            actor: actor.to_string(),
            reason: None,
            before: None,
            after: Some(json!({ "outcome": outcome })),
            changed_fields: vec![],
            occurred_at: Utc::now(),
        });
        self.append(&verification).await?;

        Ok(outcome)
    }

    /// Returns the root-cause keys of all OPEN anomalies in a fiscal
    /// year.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn open_root_cause_keys(
        &self,
        fiscal_year: i32,
    ) -> Result<HashSet<String>, AuditError> {
        let models = anomalies::Entity::find()
            .filter(anomalies::Column::FiscalYear.eq(fiscal_year))
            .filter(anomalies::Column::Status.eq(AnomalyStatus::Open.as_str()))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.root_cause_key).collect())
    }

    /// Persists freshly detected anomalies.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_anomalies(&self, found: &[Anomaly]) -> Result<(), AuditError> {
        for anomaly in found {
            let model = anomalies::ActiveModel {
                id: Set(anomaly.id),
                fiscal_year: Set(anomaly.fiscal_year),
                kind: Set(anomaly.kind.as_str().to_string()),
                root_cause_key: Set(anomaly.root_cause_key.clone()),
                description: Set(anomaly.description.clone()),
                status: Set(anomaly.status.as_str().to_string()),
                acknowledged_by: Set(anomaly.acknowledged_by.clone()),
                resolution_notes: Set(anomaly.resolution_notes.clone()),
                created_at: Set(anomaly.created_at.into()),
            };
            model.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    /// Loads an anomaly.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_anomaly(&self, id: Uuid) -> Result<Anomaly, AuditError> {
        let model = anomalies::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuditError::NotFound(id))?;
        to_core_anomaly(model)
    }

    /// Lists anomalies of a fiscal year, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_anomalies(&self, fiscal_year: i32) -> Result<Vec<Anomaly>, AuditError> {
        let models = anomalies::Entity::find()
            .filter(anomalies::Column::FiscalYear.eq(fiscal_year))
            .order_by_desc(anomalies::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(to_core_anomaly).collect()
    }

    /// Writes back an anomaly's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn save_anomaly(&self, anomaly: &Anomaly) -> Result<(), AuditError> {
        let model = anomalies::Entity::find_by_id(anomaly.id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuditError::NotFound(anomaly.id))?;

        let mut active: anomalies::ActiveModel = model.into();
        active.status = Set(anomaly.status.as_str().to_string());
        active.acknowledged_by = Set(anomaly.acknowledged_by.clone());
        active.resolution_notes = Set(anomaly.resolution_notes.clone());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Persists a new reconciliation draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_reconciliation(
        &self,
        record: &ReconciliationRecord,
    ) -> Result<(), AuditError> {
        let outstanding_items = serde_json::to_value(&record.outstanding_items)
            .map_err(|e| AuditError::Database(e.to_string()))?;
        let adjustments = serde_json::to_value(&record.adjustments)
            .map_err(|e| AuditError::Database(e.to_string()))?;
        let model = reconciliations::ActiveModel {
            id: Set(record.id),
            account_code: Set(record.account_code.clone()),
            as_of_date: Set(record.as_of_date),
            book_balance: Set(record.book_balance),
            external_balance: Set(record.external_balance),
            difference: Set(record.difference),
            outstanding_items: Set(outstanding_items),
            adjustments: Set(adjustments),
            status: Set(record.status.as_str().to_string()),
            created_by: Set(record.created_by.clone()),
            approved_by: Set(record.approved_by.clone()),
            created_at: Set(record.created_at.into()),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Loads a reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_reconciliation(&self, id: Uuid) -> Result<ReconciliationRecord, AuditError> {
        let model = reconciliations::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuditError::NotFound(id))?;
        to_core_reconciliation(model)
    }

    /// Writes back a reconciliation's approval state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn save_reconciliation(
        &self,
        record: &ReconciliationRecord,
    ) -> Result<(), AuditError> {
        let model = reconciliations::Entity::find_by_id(record.id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AuditError::NotFound(record.id))?;

        let mut active: reconciliations::ActiveModel = model.into();
        active.status = Set(record.status.as_str().to_string());
        active.approved_by = Set(record.approved_by.clone());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
