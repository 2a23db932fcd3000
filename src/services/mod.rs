pub mod engine;
pub mod financial;
pub mod location;
pub mod narrative;
pub mod sizing;
pub mod subsidy;
pub mod tariff;
