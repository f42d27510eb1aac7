//! `SeaORM` Entity for the budget authorizations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_authorizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub estimate_id: Uuid,
    pub requested_amount: Decimal,
    pub approved_amount: Option<Decimal>,
    pub available_snapshot: Decimal,
    pub status: String,
    pub requested_by: String,
    pub decided_by: Option<String>,
    pub reason: Option<String>,
    pub justification: String,
    pub expires_at: DateTimeWithTimeZone,
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
