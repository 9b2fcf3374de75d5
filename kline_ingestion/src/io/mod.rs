// @file: kline_ingestion/src/io/mod.rs
// @description: File boundaries: the business extract in, JSONL series and summary out.
// @author: LAS.

pub mod extract;
pub mod sink;
