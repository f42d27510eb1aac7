//! `SeaORM` Entity for the general ledger entries table.
//!
//! The primary key is the derived entry reference
//! `{doc_no}-{line_index}-{D|C}`, which makes cleanup by document number
//! a plain prefix-free equality filter on `doc_no`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "general_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_ref: String,
    pub voucher_id: Uuid,
    pub doc_no: String,
    pub line_index: i32,
    pub side: String,
    pub account_code: String,
    pub counter_account: Option<String>,
    pub amount: Decimal,
    pub posting_date: Date,
    pub description: String,
    pub tags: Json,
    pub off_balance: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vouchers::Entity",
        from = "Column::VoucherId",
        to = "super::vouchers::Column::Id"
    )]
    Vouchers,
}

impl Related<super::vouchers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vouchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
