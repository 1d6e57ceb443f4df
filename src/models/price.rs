use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Listing price as the backend returns it: either a JSON number or a
/// numeric string. Anything else (`null`, a missing column, a bool or an
/// object) decodes as `Missing` so one bad row never fails the whole list.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Price {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64().map_or(Price::Missing, Price::Number),
            Value::String(s) => Price::Text(s),
            _ => Price::Missing,
        })
    }
}

impl Price {
    /// Numeric value, or `None` when the price cannot be read as a finite number
    pub fn amount(&self) -> Option<f64> {
        let value = match self {
            Price::Number(n) => *n,
            Price::Text(s) => s.trim().parse::<f64>().ok()?,
            Price::Missing => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Value used for display and totals: invalid or negative prices count as zero
    pub fn display_amount(&self) -> f64 {
        match self.amount() {
            Some(value) if value > 0.0 => value,
            _ => 0.0,
        }
    }
}

impl From<f64> for Price {
    fn from(value: f64) -> Self {
        Price::Number(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_price(self.display_amount()))
    }
}

/// Format an amount in Naira with thousands separators and no decimals
pub fn format_price(amount: f64) -> String {
    if !amount.is_finite() || amount <= 0.0 {
        return "₦0".to_string();
    }

    let digits = format!("{:.0}", amount.round());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("₦{}", grouped)
}
