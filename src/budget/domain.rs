//! Core budget domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, UserID};

/// A validated, non-empty budget category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct BudgetCategory(String);

impl BudgetCategory {
    /// Create a budget category.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyField] if `category` is empty or only whitespace.
    pub fn new(category: &str) -> Result<Self, Error> {
        let category = category.trim();

        if category.is_empty() {
            Err(Error::EmptyField("category"))
        } else {
            Ok(Self(category.to_owned()))
        }
    }
}

impl AsRef<str> for BudgetCategory {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated budget amount: finite and not negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BudgetAmount(f64);

impl BudgetAmount {
    /// Create a budget amount.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidBudgetAmount] if `amount`
    /// is negative, infinite or NaN.
    pub fn new(amount: f64) -> Result<Self, Error> {
        if amount.is_finite() && amount >= 0.0 {
            Ok(Self(amount))
        } else {
            Err(Error::InvalidBudgetAmount(amount))
        }
    }

    /// The amount as a plain number.
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// Database identifier for a budget.
pub type BudgetId = i64;

/// How much a user plans to spend on a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserID,
    /// The category the budget applies to.
    pub category: BudgetCategory,
    /// The planned amount.
    pub amount: BudgetAmount,
}

/// The request body for creating or updating a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    /// The category the budget applies to.
    pub category: String,
    /// The planned amount.
    pub amount: f64,
}

impl BudgetForm {
    /// Check the form's fields.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyField] for a blank category or
    /// [Error::InvalidBudgetAmount] for a bad amount.
    pub fn validate(&self) -> Result<(BudgetCategory, BudgetAmount), Error> {
        Ok((
            BudgetCategory::new(&self.category)?,
            BudgetAmount::new(self.amount)?,
        ))
    }
}
