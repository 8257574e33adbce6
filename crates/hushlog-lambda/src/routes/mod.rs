pub mod anonymize;
pub mod health;
