//! Output equivalence between a candidate and the reference run.
//!
//! Comparison is exact over the raw stdout bytes: no whitespace normalization,
//! no text decoding and no structural diffing. Captured output is bounded, so
//! the comparison runs on a digest of the whole stream taken while it is read.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length and SHA-256 of a complete output stream, including bytes past the
/// capture limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDigest {
    pub len: u64,
    pub sha256: String,
}

impl StreamDigest {
    pub fn of(bytes: &[u8]) -> Self {
        let mut digester = StreamDigester::default();
        digester.update(bytes);
        digester.finish()
    }
}

/// Incremental [`StreamDigest`] builder fed chunk by chunk.
#[derive(Clone, Default)]
pub struct StreamDigester {
    hasher: Sha256,
    len: u64,
}

impl StreamDigester {
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    pub fn finish(self) -> StreamDigest {
        StreamDigest {
            len: self.len,
            sha256: hex::encode(self.hasher.finalize()),
        }
    }
}

/// Returns true when the candidate stdout is byte-identical to the reference stdout.
pub fn matches(reference_stdout: &StreamDigest, candidate_stdout: &StreamDigest) -> bool {
    reference_stdout == candidate_stdout
}
