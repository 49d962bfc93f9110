//! Unit tests - Pure logic with no I/O or server startup.

mod classification_robustness_tests;
mod statement_classification_tests;
