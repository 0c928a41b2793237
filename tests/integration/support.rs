//! Shared fixtures: self-cleaning temp dirs and reproducible byte streams.

use std::fs;
use std::io;
use std::path::PathBuf;

use crossrep_rs::rng::XorShift64;

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> io::Result<Self> {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "crossrep_{}_{}_{}",
            prefix,
            std::process::id(),
            stamp
        ));
        fs::create_dir(&path)?;
        Ok(Self { path })
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

pub fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = XorShift64::new(seed);
    (0..len).map(|_| rng.next_byte()).collect()
}
