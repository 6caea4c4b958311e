//! Domain errors

mod normalization_error;

pub use normalization_error::NormalizationError;
