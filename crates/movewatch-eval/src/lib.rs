// Cloud evaluator client: scores positions through the remote analysis API.

pub mod client;

pub use client::CloudEvaluator;
