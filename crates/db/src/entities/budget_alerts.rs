//! `SeaORM` Entity for the budget alerts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub estimate_id: Uuid,
    pub severity: String,
    pub status: String,
    pub utilization: Decimal,
    pub message: String,
    pub acknowledged_by: Option<String>,
    pub resolution_notes: Option<String>,
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
