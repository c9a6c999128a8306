//! Fuzz test for build database decoding
//!
//! Feeds arbitrary bytes to the decoder to find:
//! - Panics or crashes
//! - Databases that decode but do not survive an encode/decode cycle
//!
//! Run with: cargo +nightly fuzz run builddb_decode_fuzz -- -max_total_time=60

#![no_main]

use buildview_core::{branch_history, BuildDatabase, DecodeError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match BuildDatabase::decode(data) {
        Ok(db) => {
            let encoded = db.encode().expect("decoded database should encode");
            let again = BuildDatabase::decode(&encoded)
                .expect("encoded database should decode again");

            assert_eq!(again.len(), db.len());
            assert_eq!(branch_history(&again), branch_history(&db));
        }
        Err(DecodeError::Malformed { reason }) => {
            assert!(!reason.is_empty(), "Malformed error should carry a reason");
        }
        // Structurally valid JSON with bad branch content
        Err(_) => {}
    }
});
