pub mod digest;

pub use digest::{fingerprint, fingerprint_reader, Fingerprint, CHUNK_SIZE};
