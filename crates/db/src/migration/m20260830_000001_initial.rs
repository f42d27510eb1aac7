//! Initial database migration.
//!
//! Creates all ledger, budget and audit tables plus their indexes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: VOUCHERS & GENERAL LEDGER
        // ============================================================
        db.execute_unprepared(VOUCHERS_SQL).await?;
        db.execute_unprepared(VOUCHER_LINES_SQL).await?;
        db.execute_unprepared(GENERAL_LEDGER_ENTRIES_SQL).await?;

        // ============================================================
        // PART 2: BUDGET CONTROL
        // ============================================================
        db.execute_unprepared(BUDGET_ESTIMATES_SQL).await?;
        db.execute_unprepared(BUDGET_PERIODS_SQL).await?;
        db.execute_unprepared(BUDGET_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(BUDGET_AUTHORIZATIONS_SQL).await?;
        db.execute_unprepared(BUDGET_ALERTS_SQL).await?;

        // ============================================================
        // PART 3: AUDIT TRAIL
        // ============================================================
        db.execute_unprepared(AUDIT_TRAIL_SQL).await?;
        db.execute_unprepared(ANOMALIES_SQL).await?;
        db.execute_unprepared(RECONCILIATIONS_SQL).await?;

        // ============================================================
        // PART 4: LEDGER LOCK
        // ============================================================
        db.execute_unprepared(LEDGER_LOCK_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const VOUCHERS_SQL: &str = r"
CREATE TABLE vouchers (
    id UUID PRIMARY KEY,
    doc_no VARCHAR(50) NOT NULL UNIQUE,
    doc_date DATE NOT NULL,
    posting_date DATE NOT NULL,
    description TEXT NOT NULL,
    voucher_type VARCHAR(20) NOT NULL,
    status VARCHAR(10) NOT NULL DEFAULT 'draft',
    original_doc_no VARCHAR(50),
    budget_estimate_id UUID,
    fund_source_code VARCHAR(20),
    total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_by VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_vouchers_posting_date ON vouchers(posting_date);
CREATE INDEX idx_vouchers_voucher_type ON vouchers(voucher_type);
CREATE INDEX idx_vouchers_budget_estimate ON vouchers(budget_estimate_id);
";

const VOUCHER_LINES_SQL: &str = r"
CREATE TABLE voucher_lines (
    id UUID PRIMARY KEY,
    voucher_id UUID NOT NULL REFERENCES vouchers(id) ON DELETE CASCADE,
    line_index INTEGER NOT NULL,
    debit_account VARCHAR(20),
    credit_account VARCHAR(20),
    amount NUMERIC(19, 4) NOT NULL,
    description TEXT,
    tags JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_line_has_account CHECK (
        debit_account IS NOT NULL OR credit_account IS NOT NULL
    ),
    CONSTRAINT chk_line_amount_positive CHECK (amount > 0),
    CONSTRAINT uq_voucher_line UNIQUE (voucher_id, line_index)
);

CREATE INDEX idx_voucher_lines_voucher ON voucher_lines(voucher_id);
";

const GENERAL_LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE general_ledger_entries (
    entry_ref VARCHAR(70) PRIMARY KEY,
    voucher_id UUID NOT NULL REFERENCES vouchers(id) ON DELETE CASCADE,
    doc_no VARCHAR(50) NOT NULL,
    line_index INTEGER NOT NULL,
    side VARCHAR(6) NOT NULL,
    account_code VARCHAR(20) NOT NULL,
    counter_account VARCHAR(20),
    amount NUMERIC(19, 4) NOT NULL,
    posting_date DATE NOT NULL,
    description TEXT NOT NULL,
    tags JSONB NOT NULL DEFAULT '{}',
    off_balance BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_gl_entries_doc_no ON general_ledger_entries(doc_no);
CREATE INDEX idx_gl_entries_account ON general_ledger_entries(account_code);
CREATE INDEX idx_gl_entries_posting_date ON general_ledger_entries(posting_date);
";

const BUDGET_ESTIMATES_SQL: &str = r"
CREATE TABLE budget_estimates (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    fiscal_year INTEGER NOT NULL,
    allocated_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    committed_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    spent_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_estimate_code_year UNIQUE (code, fiscal_year)
);

CREATE INDEX idx_budget_estimates_year ON budget_estimates(fiscal_year);
";

const BUDGET_PERIODS_SQL: &str = r"
CREATE TABLE budget_periods (
    id UUID PRIMARY KEY,
    fiscal_year INTEGER NOT NULL,
    period INTEGER NOT NULL CHECK (period BETWEEN 1 AND 12),
    warning_threshold NUMERIC(5, 4) NOT NULL DEFAULT 0.8,
    block_threshold NUMERIC(5, 4) NOT NULL DEFAULT 1.0,
    allow_override BOOLEAN NOT NULL DEFAULT FALSE,
    is_locked BOOLEAN NOT NULL DEFAULT FALSE,
    locked_by VARCHAR(100),
    lock_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_budget_period UNIQUE (fiscal_year, period)
);
";

const BUDGET_TRANSACTIONS_SQL: &str = r"
CREATE TABLE budget_transactions (
    id UUID PRIMARY KEY,
    estimate_id UUID NOT NULL REFERENCES budget_estimates(id),
    kind VARCHAR(12) NOT NULL CHECK (
        kind IN ('ALLOCATION', 'COMMITMENT', 'SPENDING', 'REVERSAL')
    ),
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    voucher_id UUID,
    doc_no VARCHAR(50),
    description TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_budget_tx_estimate ON budget_transactions(estimate_id);
CREATE INDEX idx_budget_tx_voucher ON budget_transactions(voucher_id);
";

const BUDGET_AUTHORIZATIONS_SQL: &str = r"
CREATE TABLE budget_authorizations (
    id UUID PRIMARY KEY,
    estimate_id UUID NOT NULL REFERENCES budget_estimates(id),
    requested_amount NUMERIC(19, 4) NOT NULL,
    approved_amount NUMERIC(19, 4),
    available_snapshot NUMERIC(19, 4) NOT NULL,
    status VARCHAR(10) NOT NULL DEFAULT 'PENDING',
    requested_by VARCHAR(100) NOT NULL,
    decided_by VARCHAR(100),
    reason TEXT,
    justification TEXT NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_budget_auth_estimate ON budget_authorizations(estimate_id);
CREATE INDEX idx_budget_auth_status ON budget_authorizations(status);
";

const BUDGET_ALERTS_SQL: &str = r"
CREATE TABLE budget_alerts (
    id UUID PRIMARY KEY,
    estimate_id UUID NOT NULL REFERENCES budget_estimates(id),
    severity VARCHAR(10) NOT NULL,
    status VARCHAR(15) NOT NULL DEFAULT 'ACTIVE',
    utilization NUMERIC(9, 4) NOT NULL,
    message TEXT NOT NULL,
    acknowledged_by VARCHAR(100),
    resolution_notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_budget_alerts_status ON budget_alerts(status);
";

const AUDIT_TRAIL_SQL: &str = r"
CREATE TABLE audit_trail (
    id UUID PRIMARY KEY,
    entity_type VARCHAR(50) NOT NULL,
    entity_id VARCHAR(100) NOT NULL,
    action VARCHAR(20) NOT NULL,
    actor VARCHAR(100) NOT NULL,
    reason TEXT,
    before_snapshot JSONB,
    after_snapshot JSONB,
    changed_fields JSONB NOT NULL DEFAULT '[]',
    fingerprint CHAR(64) NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_audit_entity ON audit_trail(entity_type, entity_id);
CREATE INDEX idx_audit_occurred_at ON audit_trail(occurred_at);
CREATE INDEX idx_audit_actor ON audit_trail(actor);
";

const ANOMALIES_SQL: &str = r"
CREATE TABLE anomalies (
    id UUID PRIMARY KEY,
    fiscal_year INTEGER NOT NULL,
    kind VARCHAR(30) NOT NULL,
    root_cause_key VARCHAR(255) NOT NULL,
    description TEXT NOT NULL,
    status VARCHAR(15) NOT NULL DEFAULT 'OPEN',
    acknowledged_by VARCHAR(100),
    resolution_notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE UNIQUE INDEX uq_anomalies_open_root_cause
    ON anomalies(root_cause_key) WHERE status = 'OPEN';
";

const RECONCILIATIONS_SQL: &str = r"
CREATE TABLE reconciliations (
    id UUID PRIMARY KEY,
    account_code VARCHAR(20) NOT NULL,
    as_of_date DATE NOT NULL,
    book_balance NUMERIC(19, 4) NOT NULL,
    external_balance NUMERIC(19, 4) NOT NULL,
    difference NUMERIC(19, 4) NOT NULL,
    outstanding_items JSONB NOT NULL DEFAULT '[]',
    adjustments JSONB NOT NULL DEFAULT '[]',
    status VARCHAR(10) NOT NULL DEFAULT 'DRAFT',
    created_by VARCHAR(100) NOT NULL,
    approved_by VARCHAR(100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_reconciliations_account ON reconciliations(account_code);
";

const LEDGER_LOCK_SQL: &str = r"
CREATE TABLE ledger_lock (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    locked_until DATE,
    updated_by VARCHAR(100),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

INSERT INTO ledger_lock (id, locked_until) VALUES (1, NULL);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ledger_lock;
DROP TABLE IF EXISTS reconciliations;
DROP TABLE IF EXISTS anomalies;
DROP TABLE IF EXISTS audit_trail;
DROP TABLE IF EXISTS budget_alerts;
DROP TABLE IF EXISTS budget_authorizations;
DROP TABLE IF EXISTS budget_transactions;
DROP TABLE IF EXISTS budget_periods;
DROP TABLE IF EXISTS budget_estimates;
DROP TABLE IF EXISTS general_ledger_entries;
DROP TABLE IF EXISTS voucher_lines;
DROP TABLE IF EXISTS vouchers;
";
