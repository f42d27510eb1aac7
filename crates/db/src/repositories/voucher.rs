//! Voucher repository for posting, deleting and duplicating vouchers.
//!
//! Every mutation that touches the general ledger runs in one database
//! transaction: a voucher's header, lines and expanded ledger rows are
//! always written or removed together.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use socai_core::posting::{
    PostingError, PostingMode, PostingService, ValidatedPosting, VoucherHeaderInput,
    VoucherLineInput, VoucherStatus,
};
use socai_shared::types::PageRequest;

use crate::entities::{general_ledger_entries, voucher_lines, vouchers};

fn db_err(err: sea_orm::DbErr) -> PostingError {
    PostingError::Database(err.to_string())
}

fn tags_json(tags: &socai_core::posting::LineTags) -> Result<serde_json::Value, PostingError> {
    serde_json::to_value(tags).map_err(|e| PostingError::Internal(e.to_string()))
}

/// Filter options for listing vouchers.
#[derive(Debug, Clone, Default)]
pub struct VoucherFilter {
    /// Filter by voucher type.
    pub voucher_type: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Posting date range start.
    pub date_from: Option<chrono::NaiveDate>,
    /// Posting date range end.
    pub date_to: Option<chrono::NaiveDate>,
}

/// A voucher header with its lines.
#[derive(Debug, Clone)]
pub struct VoucherWithLines {
    /// Voucher header.
    pub voucher: vouchers::Model,
    /// Lines ordered by line index.
    pub lines: Vec<voucher_lines::Model>,
}

/// Voucher repository.
#[derive(Debug)]
pub struct VoucherRepository {
    db: DatabaseConnection,
}

impl VoucherRepository {
    /// Creates a new voucher repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads a voucher and its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<VoucherWithLines, PostingError> {
        let voucher = vouchers::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(PostingError::NotFound(id))?;

        let lines = voucher_lines::Entity::find()
            .filter(voucher_lines::Column::VoucherId.eq(id))
            .order_by_asc(voucher_lines::Column::LineIndex)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(VoucherWithLines { voucher, lines })
    }

    /// Finds a voucher header by document number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_doc_no(
        &self,
        doc_no: &str,
    ) -> Result<Option<vouchers::Model>, PostingError> {
        vouchers::Entity::find()
            .filter(vouchers::Column::DocNo.eq(doc_no))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists vouchers matching a filter, newest posting date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(
        &self,
        filter: &VoucherFilter,
        page: &PageRequest,
    ) -> Result<(Vec<vouchers::Model>, u64), PostingError> {
        let mut query = vouchers::Entity::find();
        if let Some(voucher_type) = &filter.voucher_type {
            query = query.filter(vouchers::Column::VoucherType.eq(voucher_type));
        }
        if let Some(status) = &filter.status {
            query = query.filter(vouchers::Column::Status.eq(status));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(vouchers::Column::PostingDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(vouchers::Column::PostingDate.lte(to));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(vouchers::Column::PostingDate)
            .order_by_asc(vouchers::Column::DocNo)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok((rows, total))
    }

    /// Lists the general ledger rows for a document number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn gl_entries_by_doc_no(
        &self,
        doc_no: &str,
    ) -> Result<Vec<general_ledger_entries::Model>, PostingError> {
        general_ledger_entries::Entity::find()
            .filter(general_ledger_entries::Column::DocNo.eq(doc_no))
            .order_by_asc(general_ledger_entries::Column::EntryRef)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Writes a posted voucher: header, lines and expanded ledger rows,
    /// all in one transaction. Updates are a full replace of the prior
    /// state, never a merge.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the update target does not exist and
    /// `DuplicateDocNo` when the document number is taken by another
    /// voucher.
    pub async fn save_posted(
        &self,
        header: &VoucherHeaderInput,
        lines: &[VoucherLineInput],
        validated: &ValidatedPosting,
        mode: PostingMode,
    ) -> Result<vouchers::Model, PostingError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(db_err)?;

        let saved = match mode {
            PostingMode::Create => {
                if self.find_by_doc_no(&header.doc_no).await?.is_some() {
                    return Err(PostingError::DuplicateDocNo(header.doc_no.clone()));
                }
                let model = vouchers::ActiveModel {
                    id: Set(validated.voucher_id),
                    doc_no: Set(header.doc_no.clone()),
                    doc_date: Set(header.doc_date),
                    posting_date: Set(header.posting_date),
                    description: Set(header.description.clone()),
                    voucher_type: Set(header.voucher_type.as_str().to_string()),
                    status: Set(VoucherStatus::Posted.as_str().to_string()),
                    original_doc_no: Set(header.original_doc_no.clone()),
                    budget_estimate_id: Set(header.budget_estimate_id),
                    fund_source_code: Set(header.fund_source_code.clone()),
                    total_amount: Set(validated.totals.voucher_amount()),
                    created_by: Set(header.created_by.clone()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                model.insert(&txn).await.map_err(db_err)?
            }
            PostingMode::Update => {
                let existing = vouchers::Entity::find_by_id(validated.voucher_id)
                    .one(&txn)
                    .await
                    .map_err(db_err)?
                    .ok_or(PostingError::NotFound(validated.voucher_id))?;

                if existing.doc_no != header.doc_no
                    && self.find_by_doc_no(&header.doc_no).await?.is_some()
                {
                    return Err(PostingError::DuplicateDocNo(header.doc_no.clone()));
                }

                Self::clear_voucher_state(&txn, validated.voucher_id, &existing.doc_no).await?;

                let mut active: vouchers::ActiveModel = existing.into();
                active.doc_no = Set(header.doc_no.clone());
                active.doc_date = Set(header.doc_date);
                active.posting_date = Set(header.posting_date);
                active.description = Set(header.description.clone());
                active.voucher_type = Set(header.voucher_type.as_str().to_string());
                active.status = Set(VoucherStatus::Posted.as_str().to_string());
                active.original_doc_no = Set(header.original_doc_no.clone());
                active.budget_estimate_id = Set(header.budget_estimate_id);
                active.fund_source_code = Set(header.fund_source_code.clone());
                active.total_amount = Set(validated.totals.voucher_amount());
                active.updated_at = Set(now.into());
                active.update(&txn).await.map_err(db_err)?
            }
        };

        Self::insert_lines(&txn, validated.voucher_id, lines).await?;
        Self::insert_gl_entries(&txn, &saved.doc_no, validated).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(saved)
    }

    /// Deletes a voucher with its lines and ledger rows, returning the
    /// removed state for auditing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn delete_voucher(&self, id: Uuid) -> Result<VoucherWithLines, PostingError> {
        let snapshot = self.find_by_id(id).await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        Self::clear_voucher_state(&txn, id, &snapshot.voucher.doc_no).await?;
        vouchers::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        Ok(snapshot)
    }

    /// Copies a voucher into a new draft with a fresh document number and
    /// dates advanced one accounting period. Drafts carry no ledger rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown source id.
    pub async fn duplicate_as_draft(
        &self,
        id: Uuid,
        created_by: &str,
    ) -> Result<VoucherWithLines, PostingError> {
        let source = self.find_by_id(id).await?;
        let new_doc_no = self.next_copy_doc_no(&source.voucher.doc_no).await?;
        let new_id = Uuid::new_v4();
        let now = Utc::now();

        let doc_date = PostingService::next_period_date(source.voucher.doc_date)?;
        let posting_date = PostingService::next_period_date(source.voucher.posting_date)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let header = vouchers::ActiveModel {
            id: Set(new_id),
            doc_no: Set(new_doc_no),
            doc_date: Set(doc_date),
            posting_date: Set(posting_date),
            description: Set(source.voucher.description.clone()),
            voucher_type: Set(source.voucher.voucher_type.clone()),
            status: Set(VoucherStatus::Draft.as_str().to_string()),
            original_doc_no: Set(Some(source.voucher.doc_no.clone())),
            budget_estimate_id: Set(source.voucher.budget_estimate_id),
            fund_source_code: Set(source.voucher.fund_source_code.clone()),
            total_amount: Set(source.voucher.total_amount),
            created_by: Set(created_by.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let voucher = header.insert(&txn).await.map_err(db_err)?;

        let mut lines = Vec::with_capacity(source.lines.len());
        for line in &source.lines {
            let copy = voucher_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                voucher_id: Set(new_id),
                line_index: Set(line.line_index),
                debit_account: Set(line.debit_account.clone()),
                credit_account: Set(line.credit_account.clone()),
                amount: Set(line.amount),
                description: Set(line.description.clone()),
                tags: Set(line.tags.clone()),
                created_at: Set(now.into()),
            };
            lines.push(copy.insert(&txn).await.map_err(db_err)?);
        }

        txn.commit().await.map_err(db_err)?;
        Ok(VoucherWithLines { voucher, lines })
    }

    /// Removes lines and ledger rows so a full replace can follow.
    async fn clear_voucher_state(
        txn: &DatabaseTransaction,
        voucher_id: Uuid,
        doc_no: &str,
    ) -> Result<(), PostingError> {
        general_ledger_entries::Entity::delete_many()
            .filter(general_ledger_entries::Column::DocNo.eq(doc_no))
            .exec(txn)
            .await
            .map_err(db_err)?;
        voucher_lines::Entity::delete_many()
            .filter(voucher_lines::Column::VoucherId.eq(voucher_id))
            .exec(txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_lines(
        txn: &DatabaseTransaction,
        voucher_id: Uuid,
        lines: &[VoucherLineInput],
    ) -> Result<(), PostingError> {
        let now = Utc::now();
        for (line_index, line) in lines.iter().enumerate() {
            let line_index = i32::try_from(line_index)
                .map_err(|_| PostingError::Internal("line index out of range".to_string()))?;
            let model = voucher_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                voucher_id: Set(voucher_id),
                line_index: Set(line_index),
                debit_account: Set(line.debit_account.clone()),
                credit_account: Set(line.credit_account.clone()),
                amount: Set(line.amount),
                description: Set(line.description.clone()),
                tags: Set(tags_json(&line.tags)?),
                created_at: Set(now.into()),
            };
            model.insert(txn).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn insert_gl_entries(
        txn: &DatabaseTransaction,
        doc_no: &str,
        validated: &ValidatedPosting,
    ) -> Result<(), PostingError> {
        let now = Utc::now();
        for entry in &validated.entries {
            let line_index = i32::try_from(entry.line_index)
                .map_err(|_| PostingError::Internal("line index out of range".to_string()))?;
            let model = general_ledger_entries::ActiveModel {
                entry_ref: Set(entry.entry_ref.clone()),
                voucher_id: Set(entry.voucher_id),
                doc_no: Set(doc_no.to_string()),
                line_index: Set(line_index),
                side: Set(entry.side.suffix().to_string()),
                account_code: Set(entry.account_code.clone()),
                counter_account: Set(entry.counter_account.clone()),
                amount: Set(entry.amount),
                posting_date: Set(entry.posting_date),
                description: Set(entry.description.clone()),
                tags: Set(tags_json(&entry.tags)?),
                off_balance: Set(entry.off_balance),
                created_at: Set(now.into()),
            };
            model.insert(txn).await.map_err(db_err)?;
        }
        Ok(())
    }

    /// Computes the balance of every fund source from posted vouchers:
    /// receipts add, expenses subtract, other types leave the fund
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn fund_balances(
        &self,
    ) -> Result<Vec<(String, rust_decimal::Decimal)>, PostingError> {
        let posted = vouchers::Entity::find()
            .filter(vouchers::Column::Status.eq(VoucherStatus::Posted.as_str()))
            .filter(vouchers::Column::FundSourceCode.is_not_null())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut balances: std::collections::BTreeMap<String, rust_decimal::Decimal> =
            std::collections::BTreeMap::new();
        for voucher in posted {
            let Some(fund_code) = voucher.fund_source_code else {
                continue;
            };
            let Some(voucher_type) =
                socai_core::posting::VoucherType::parse(&voucher.voucher_type)
            else {
                continue;
            };
            let entry = balances.entry(fund_code).or_default();
            if voucher_type.is_receipt() {
                *entry += voucher.total_amount;
            } else if voucher_type.is_expense() {
                *entry -= voucher.total_amount;
            }
        }
        Ok(balances.into_iter().collect())
    }

    /// Finds the first free "-COPY-{n}" document number for a duplicate.
    async fn next_copy_doc_no(&self, doc_no: &str) -> Result<String, PostingError> {
        for n in 1..=99u32 {
            let candidate = format!("{doc_no}-COPY-{n}");
            if self.find_by_doc_no(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(PostingError::Internal(format!(
            "no free copy number for document '{doc_no}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use socai_core::posting::{LineTags, VoucherType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header(id: Uuid, doc_no: &str) -> VoucherHeaderInput {
        VoucherHeaderInput {
            id: Some(id),
            doc_no: doc_no.to_string(),
            doc_date: date(2025, 6, 1),
            posting_date: date(2025, 6, 1),
            description: "stationery purchase".to_string(),
            voucher_type: VoucherType::CashOut,
            original_doc_no: None,
            budget_estimate_id: None,
            fund_source_code: None,
            created_by: "tester".to_string(),
        }
    }

    // One two-sided line (expands to a debit and a credit row) and one
    // single-entry memo line on an off-balance account (one row).
    fn replacement_lines() -> Vec<VoucherLineInput> {
        vec![
            VoucherLineInput {
                debit_account: Some("642".to_string()),
                credit_account: Some("111".to_string()),
                amount: dec!(500000),
                description: None,
                tags: LineTags::default(),
            },
            VoucherLineInput {
                debit_account: Some("001".to_string()),
                credit_account: None,
                amount: dec!(200000),
                description: None,
                tags: LineTags::default(),
            },
        ]
    }

    fn stored_voucher(id: Uuid, doc_no: &str) -> vouchers::Model {
        let now = Utc::now();
        vouchers::Model {
            id,
            doc_no: doc_no.to_string(),
            doc_date: date(2025, 6, 1),
            posting_date: date(2025, 6, 1),
            description: "stationery purchase".to_string(),
            voucher_type: "cash_out".to_string(),
            status: "posted".to_string(),
            original_doc_no: None,
            budget_estimate_id: None,
            fund_source_code: None,
            total_amount: dec!(500000),
            created_by: "tester".to_string(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn stored_line(voucher_id: Uuid, line_index: i32) -> voucher_lines::Model {
        voucher_lines::Model {
            id: Uuid::new_v4(),
            voucher_id,
            line_index,
            debit_account: Some("642".to_string()),
            credit_account: Some("111".to_string()),
            amount: dec!(500000),
            description: None,
            tags: serde_json::json!({}),
            created_at: Utc::now().into(),
        }
    }

    fn stored_gl_entry(voucher_id: Uuid, doc_no: &str, entry_ref: &str) -> general_ledger_entries::Model {
        general_ledger_entries::Model {
            entry_ref: entry_ref.to_string(),
            voucher_id,
            doc_no: doc_no.to_string(),
            line_index: 0,
            side: "D".to_string(),
            account_code: "642".to_string(),
            counter_account: Some("111".to_string()),
            amount: dec!(500000),
            posting_date: date(2025, 6, 1),
            description: "stationery purchase".to_string(),
            tags: serde_json::json!({}),
            off_balance: false,
            created_at: Utc::now().into(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    // `DatabaseConnection` is not `Clone` with the mock feature; build a
    // second handle over the same mocker by cloning the inner `Arc`.
    fn mock_handle(db: &DatabaseConnection) -> DatabaseConnection {
        match db {
            DatabaseConnection::MockDatabaseConnection(conn) => {
                DatabaseConnection::MockDatabaseConnection(std::sync::Arc::clone(conn))
            }
            _ => unreachable!("not a mock connection"),
        }
    }

    // An update clears the prior ledger state and writes exactly the new
    // line set's rows: two per two-sided line, one per memo line.
    #[tokio::test]
    async fn test_update_replaces_prior_rows_with_new_line_set() {
        let voucher_id = Uuid::new_v4();
        let doc_no = "PC-2025-001";
        let h = header(voucher_id, doc_no);
        let lines = replacement_lines();
        let validated = PostingService::validate_voucher(&h, &lines, None).unwrap();
        assert_eq!(validated.entries.len(), 3);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored_voucher(voucher_id, doc_no)]])
            .append_query_results([vec![stored_voucher(voucher_id, doc_no)]])
            .append_query_results([
                vec![stored_line(voucher_id, 0)],
                vec![stored_line(voucher_id, 1)],
            ])
            .append_query_results([
                vec![stored_gl_entry(voucher_id, doc_no, "PC-2025-001-0-D")],
                vec![stored_gl_entry(voucher_id, doc_no, "PC-2025-001-0-C")],
                vec![stored_gl_entry(voucher_id, doc_no, "PC-2025-001-1-D")],
            ])
            .append_exec_results([exec(2), exec(1)])
            .into_connection();

        let repo = VoucherRepository::new(mock_handle(&db));
        let saved = repo
            .save_posted(&h, &lines, &validated, PostingMode::Update)
            .await
            .unwrap();
        assert_eq!(saved.doc_no, doc_no);

        let log = format!("{:?}", db.into_transaction_log());
        assert_eq!(log.matches("DELETE FROM \"general_ledger_entries\"").count(), 1);
        assert_eq!(log.matches("DELETE FROM \"voucher_lines\"").count(), 1);
        assert_eq!(log.matches("INSERT INTO \"voucher_lines\"").count(), 2);
        assert_eq!(log.matches("INSERT INTO \"general_ledger_entries\"").count(), 3);
        assert_eq!(log.matches("UPDATE \"vouchers\"").count(), 1);
        assert_eq!(log.matches("INSERT INTO \"vouchers\"").count(), 0);
    }

    // A delete removes the header, its lines and every ledger row carrying
    // the document number, and writes nothing.
    #[tokio::test]
    async fn test_delete_removes_lines_and_ledger_rows() {
        let voucher_id = Uuid::new_v4();
        let doc_no = "PC-2025-002";

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored_voucher(voucher_id, doc_no)]])
            .append_query_results([vec![stored_line(voucher_id, 0)]])
            .append_exec_results([exec(2), exec(1), exec(1)])
            .into_connection();

        let repo = VoucherRepository::new(mock_handle(&db));
        let snapshot = repo.delete_voucher(voucher_id).await.unwrap();
        assert_eq!(snapshot.voucher.doc_no, doc_no);
        assert_eq!(snapshot.lines.len(), 1);

        let log = format!("{:?}", db.into_transaction_log());
        assert_eq!(log.matches("DELETE FROM \"general_ledger_entries\"").count(), 1);
        assert_eq!(log.matches("DELETE FROM \"voucher_lines\"").count(), 1);
        assert_eq!(log.matches("DELETE FROM \"vouchers\"").count(), 1);
        assert!(log.contains(doc_no));
        assert_eq!(log.matches("INSERT INTO").count(), 0);
    }
}
