//! `SeaORM` Entity for the budget estimates table.
//!
//! The amount columns hold the opening base; current balances are a fold
//! of the budget transaction log on top of them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_estimates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub fiscal_year: i32,
    pub allocated_amount: Decimal,
    pub committed_amount: Decimal,
    pub spent_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_transactions::Entity")]
    BudgetTransactions,
    #[sea_orm(has_many = "super::budget_authorizations::Entity")]
    BudgetAuthorizations,
    #[sea_orm(has_many = "super::budget_alerts::Entity")]
    BudgetAlerts,
}

impl Related<super::budget_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetTransactions.def()
    }
}

impl Related<super::budget_authorizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetAuthorizations.def()
    }
}

impl Related<super::budget_alerts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetAlerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
