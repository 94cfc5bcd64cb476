//! Test support shared across the workspace: golden fixture loading,
//! result and response builders, and an in-memory answer source.

pub mod answer_source;
pub mod builders;

pub use answer_source::InMemoryAnswerSource;

use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Golden files every calculation crate reads.
const GOLDEN_FILES: [&str; 2] = ["golden/market_average.json", "golden/significance.json"];

/// The workspace's `test-fixtures` directory, found by walking up from the
/// calling crate's manifest.
fn fixtures_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);
    while !path.join("test-fixtures").join("golden").is_dir() {
        if !path.pop() {
            panic!("no test-fixtures/golden above {manifest_dir}");
        }
    }
    path.join("test-fixtures")
}

/// Deserialize the JSON fixture at `relative_path`.
///
/// # Panics
/// When the file is missing or does not match `T`.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("reading fixture {}: {e}", path.display()));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("parsing fixture {}: {e}", path.display()))
}
