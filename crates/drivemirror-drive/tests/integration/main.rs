//! Integration tests for drivemirror-drive
//!
//! Uses wiremock to simulate the Drive v3 `files` endpoints and verifies the
//! request shapes, error classification and retry behavior of the
//! DriveClient and DriveDirectory.


mod test_mutations;
