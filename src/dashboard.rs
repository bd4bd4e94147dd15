//! Datos del panel principal (saldos, puntuación de crédito, gastos y movimientos).
//! No hay almacenamiento: todo son datos de demostración fijos.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub masked_number: String,
    pub balance: f64,
    pub balance_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgCard {
    pub score: u32,
    pub out_of: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditScore {
    pub score: u32,
    pub min: u32,
    pub max: u32,
    pub updated: NaiveDate,
    pub update_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub accounts: Vec<Account>,
    pub esg: EsgCard,
    pub credit_score: CreditScore,
    pub rewards_cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingCategory {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySpending {
    pub month: String,
    pub spending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingOverview {
    pub categories: Vec<SpendingCategory>,
    pub total: f64,
    pub as_of: NaiveDate,
    pub trends: Vec<MonthlySpending>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub merchant: String,
    pub category: String,
    pub date: NaiveDate,
    pub amount: f64,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn account(name: &str, masked_number: &str, balance: f64, balance_label: &str) -> Account {
    Account {
        name: name.to_string(),
        masked_number: masked_number.to_string(),
        balance,
        balance_label: balance_label.to_string(),
    }
}

pub fn dashboard() -> Dashboard {
    Dashboard {
        accounts: vec![
            account("QUICKSILVER", "0501", 524.63, "Current balance"),
            account("360 Checking", "0217", 2134.78, "Available balance"),
        ],
        esg: EsgCard {
            score: 42,
            out_of: 100,
            description: "Environment, Social, Governance".to_string(),
        },
        credit_score: CreditScore {
            score: 757,
            min: 300,
            max: 850,
            updated: date(2025, 1, 25),
            update_available: true,
        },
        rewards_cash: 296.69,
    }
}

pub fn spending_categories() -> Vec<SpendingCategory> {
    [
        ("Grocery", 400.0),
        ("Dining", 200.0),
        ("Transportation", 150.0),
        ("Entertainment", 100.0),
        ("Others", 50.0),
    ]
    .into_iter()
    .map(|(name, value)| SpendingCategory {
        name: name.to_string(),
        value,
    })
    .collect()
}

pub fn spending_total(categories: &[SpendingCategory]) -> f64 {
    categories.iter().map(|c| c.value).sum()
}

pub fn spending_overview() -> SpendingOverview {
    let categories = spending_categories();
    let total = spending_total(&categories);
    let trends = [
        ("Sep", 600.0),
        ("Oct", 700.0),
        ("Nov", 800.0),
        ("Dec", 900.0),
        ("Jan", 750.0),
    ]
    .into_iter()
    .map(|(month, spending)| MonthlySpending {
        month: month.to_string(),
        spending,
    })
    .collect();

    SpendingOverview {
        categories,
        total,
        as_of: date(2025, 1, 25),
        trends,
    }
}

/// Movimientos recientes, del más nuevo al más antiguo.
pub fn recent_transactions() -> Vec<Transaction> {
    [
        ("Walmart", "Grocery", date(2025, 1, 3), 6.47),
        ("McDonald's", "Dining", date(2024, 12, 31), 8.31),
        ("TST* Village Burger BA", "Dining", date(2024, 12, 16), 10.77),
        ("Ulta Beauty", "Merchandise", date(2024, 12, 14), 36.54),
        ("Five Below", "Merchandise", date(2024, 12, 13), 35.45),
    ]
    .into_iter()
    .map(|(merchant, category, date, amount)| Transaction {
        merchant: merchant.to_string(),
        category: category.to_string(),
        date,
        amount,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_total_sums_categories() {
        let overview = spending_overview();
        assert_eq!(overview.total, 900.0);
        assert_eq!(overview.categories.len(), 5);
        assert_eq!(overview.trends.last().unwrap().month, "Jan");
    }

    #[test]
    fn transactions_are_newest_first() {
        let list = recent_transactions();
        assert_eq!(list.len(), 5);
        assert!(list.windows(2).all(|w| w[0].date >= w[1].date));
        assert_eq!(list[0].merchant, "Walmart");
    }

    #[test]
    fn dashboard_cards() {
        let data = dashboard();
        assert_eq!(data.accounts.len(), 2);
        assert_eq!(data.accounts[1].balance, 2134.78);
        assert!(data.credit_score.score >= data.credit_score.min);
        assert!(data.credit_score.score <= data.credit_score.max);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["creditScore"]["updated"], "2025-01-25");
        assert_eq!(json["accounts"][0]["maskedNumber"], "0501");
    }
}
