//! Integration test harness: wires the real `AppService` to recording
//! mock adapters and drives whole duty cycles tick by tick.

#![cfg(not(target_os = "espidf"))]

mod mock_hw;

mod acquisition_tests;
mod pm_pipeline_tests;
