// SHA-256 digests used for process-log hashes and key fingerprints.

use sha2::{Digest, Sha256};

/// SHA-256 hash of `data`, returning a 32-byte digest.
pub fn hash_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(hash_sha256(data))
}

/// Hash of a wipe process log: the lines joined with `\n`.
pub fn process_log_hash<S: AsRef<str>>(lines: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(line.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}
