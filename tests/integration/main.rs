//! Integration tests for the BookHub booking engine.
//!
//! These tests need a PostgreSQL instance; they skip themselves when
//! `BOOKHUB_TEST_DATABASE_URL` is not set.

mod helpers;

mod allocation_test;
mod batch_test;
mod booking_test;
mod waitlist_test;
