//! `SeaORM` Entity for the append-only budget transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub estimate_id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub voucher_id: Option<Uuid>,
    pub doc_no: Option<String>,
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budget_estimates::Entity",
        from = "Column::EstimateId",
        to = "super::budget_estimates::Column::Id"
    )]
    BudgetEstimates,
}

impl Related<super::budget_estimates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetEstimates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
