use std::fmt;
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

/// Read buffer size for streaming hash computation.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// BLAKE3 digest of a file's full content. Sole arbiter of "same content"
/// during collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    pub fn from_hex(s: &str) -> io::Result<Self> {
        blake3::Hash::from_hex(s)
            .map(|h| Self(*h.as_bytes()))
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Invalid digest '{}': {}", s, e)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash everything `reader` yields, one fixed-size buffer at a time.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

pub fn fingerprint(path: &Path) -> io::Result<Fingerprint> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Error opening {}: {}", path.display(), e))
    })?;
    fingerprint_reader(file).map_err(|e| {
        io::Error::new(e.kind(), format!("Error reading {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    /// Reader that fails once its data runs out.
    struct Broken<'a> {
        data: &'a [u8],
    }

    impl Read for Broken<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(ErrorKind::Other, "device removed"));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_file_digest_matches_one_shot_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        // Spans several buffers with a ragged tail.
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 517)).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let fp = fingerprint(&path).unwrap();
        assert_eq!(fp.as_bytes(), blake3::hash(&data).as_bytes());
    }

    #[test]
    fn test_digest_independent_of_read_size() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let whole = fingerprint_reader(&data[..]).unwrap();
        for step in [1, 3, 4096, 9999] {
            let chunked = fingerprint_reader(Trickle { data: &data, step }).unwrap();
            assert_eq!(whole, chunked, "step {}", step);
        }
    }

    #[test]
    fn test_distinct_content_distinct_digest() {
        let a = fingerprint_reader(&b"content x"[..]).unwrap();
        let b = fingerprint_reader(&b"content y"[..]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_read_failure_partway_propagates() {
        let err = fingerprint_reader(Broken { data: b"partial" }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = fingerprint(&dir.path().join("nope.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = fingerprint_reader(&b"abc"[..]).unwrap();
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Fingerprint::from_hex(&hex).unwrap(), fp);
        assert!(Fingerprint::from_hex("zz").is_err());
    }
}
