//! `SeaORM` Entity for the reconciliations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_code: String,
    pub as_of_date: Date,
    pub book_balance: Decimal,
    pub external_balance: Decimal,
    pub difference: Decimal,
    pub outstanding_items: Json,
    pub adjustments: Json,
    pub status: String,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
