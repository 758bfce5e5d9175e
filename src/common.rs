pub mod error;
pub mod normalization;
