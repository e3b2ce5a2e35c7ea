//! Integration tests for nlq-console.

pub mod http_test;
pub mod live_test;
pub mod results_test;
pub mod session_test;
