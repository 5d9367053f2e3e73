//! Three-state indicator signal and indicator categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single indicator reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Caution,
    Sell,
}

impl Signal {
    pub fn label(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Caution => "CAUTION",
            Signal::Sell => "SELL",
        }
    }

}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Sentiment,
    OnChain,
    PriceModel,
    Technical,
    MarketStructure,
    Macro,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Sentiment => "Sentiment",
            Category::OnChain => "On-Chain",
            Category::PriceModel => "Price Model",
            Category::Technical => "Technical",
            Category::MarketStructure => "Market Structure",
            Category::Macro => "Macro",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
