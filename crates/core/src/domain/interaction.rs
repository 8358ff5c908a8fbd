use serde::{Deserialize, Serialize};

use super::customer::{CustomerId, Gender};

/// A single customer interaction: the free-text utterance plus the
/// demographic, temporal, and purchase-category signals the rule engine
/// scores against. Missing demographics stay `None` and score as neutral.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub customer_id: CustomerId,
    pub free_text: String,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub hour_of_day: u32,
    pub purchased_categories: Vec<String>,
}
