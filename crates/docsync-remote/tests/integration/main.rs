//! Integration tests for docsync-remote
//!
//! Uses wiremock to simulate the remote document service and verifies
//! end-to-end behavior of the duplicate check and upload endpoints through
//! the `IRemoteSyncClient` port.

mod common;

mod test_check_duplicate;
mod test_upload;
