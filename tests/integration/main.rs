//! Integration tests for silverline.
//!
//! The `pipeline_test` module runs the whole ingest-to-silver path against the
//! in-memory adapters and always runs. The LocalStack tests are marked
//! `#[ignore]` so they only run with a LocalStack instance available.
//!
//! ## Running LocalStack Tests
//!
//! 1. Start LocalStack:
//!    ```bash
//!    docker run -d -p 4566:4566 localstack/localstack
//!    ```
//!
//! 2. Run the ignored tests:
//!    ```bash
//!    LOCALSTACK_ENDPOINT=http://localhost:4566 cargo test -p integration-tests -- --ignored
//!    ```

mod common;
mod localstack_test;
mod pipeline_test;
