//! Request handlers

pub mod aml;
pub mod health;
pub mod wallet;
