//! Integration tests - Tests that drive schema import and statement
//! preparation end to end through a `Connection`
//!
//! Everything runs in memory; instance data for the extraction functions comes
//! from an in-memory reader.

mod fixtures;

mod cycle_detection_tests;
mod extraction_tests;
mod import_tests;
mod view_compilation_tests;
mod view_shape_tests;
