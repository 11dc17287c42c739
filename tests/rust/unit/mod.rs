//! Unit tests - Tests that exercise single components through the public API
//!
//! None of these need a schema import; they cover configuration loading, the
//! ECSQL parser and the raw-text reference scan.

mod config_tests;
mod ecsql_parser_tests;
mod reference_extractor_tests;
