mod edit_cmd;
mod validate_cmd;

use std::{fs, path::PathBuf};

/// The canonical fixture shared with the library tests.
pub(crate) fn fixture() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../ngxed_file/tests/fixtures/nginx.conf");
    fs::read_to_string(path).expect("Failed to read fixture file")
}
