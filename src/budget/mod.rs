//! Spending budgets, one per category for each user.

mod db;
mod domain;
mod endpoints;

pub use db::{create_budget, create_budget_table, delete_budget, get_budgets, update_budget};
pub use domain::{Budget, BudgetAmount, BudgetCategory, BudgetForm, BudgetId};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, get_budgets_endpoint, update_budget_endpoint,
};

#[cfg(test)]
pub use db::get_budget;
