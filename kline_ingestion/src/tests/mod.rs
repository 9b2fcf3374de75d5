// @file: kline_ingestion/src/tests/mod.rs
// @description: In-crate test suites and the shared exchange doubles.
// @author: LAS.


mod orchestrator_scenarios;
