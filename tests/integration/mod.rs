//! Integration tests
//!
//! Services are driven through their public API over the in-memory store;
//! `api_test` goes through the full router, `database_test` needs a real
//! Postgres and is ignored by default.

mod api_test;
mod database_test;
mod sync_test;
mod tasks_test;
