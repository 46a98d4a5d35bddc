//! Intake Engine — conversational intake and psychologist matching.

pub mod config;
pub mod error;
pub mod intake;
