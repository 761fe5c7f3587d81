//! The fixed table of provider category codes that can be categorized without a human.

use std::{collections::HashSet, sync::LazyLock};

/// Provider primary category codes that are categorized automatically.
///
/// These cover money movements whose category is unambiguous from the
/// provider's code alone: income, transfers, fees, interest, debt payments,
/// insurance, taxes and housing costs.
static AUTO_CATEGORY_CODES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "INCOME",
        "PAYROLL",
        "DEPOSIT",
        "TRANSFER_IN",
        "TRANSFER_OUT",
        "BANK_FEES",
        "ATM_FEES",
        "INTEREST",
        "INTEREST_EARNED",
        "INTEREST_CHARGED",
        "LOAN_PAYMENTS",
        "CREDIT_CARD_PAYMENT",
        "INSURANCE",
        "TAXES",
        "TAX_PAYMENT",
        "RENT_AND_UTILITIES",
        "UTILITIES",
        "RENT",
        "MORTGAGE",
    ])
});

/// Whether transactions with the provider category `code` are categorized automatically.
///
/// Codes are matched exactly, the provider sends them in upper snake case.
pub fn is_auto_categorizable(code: &str) -> bool {
    AUTO_CATEGORY_CODES.contains(code)
}

/// Turn a provider category code into the category name shown to users,
/// e.g. `TRANSFER_IN` becomes `Transfer In`.
pub fn display_category(code: &str) -> String {
    code.replace('_', " ")
        .to_lowercase()
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
