//! Core business logic modules

pub mod formulas;
pub mod odds;

// Re-export commonly used types
pub use formulas::{market_points, project, round2, QbInputs, SkillInputs};
pub use odds::{
    american_to_decimal, implied_probability, overround, parse_decimal_odds, parse_price_text,
};
