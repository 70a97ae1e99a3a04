use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Passes writes through while feeding every byte into a SHA-256 digest.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Copies `src` to `dst` and returns the hex SHA-256 of the copied bytes.
pub fn copy_and_hash(src: &Path, dst: &Path) -> io::Result<String> {
    let mut input = File::open(src)?;
    let mut writer = HashingWriter {
        inner: File::create(dst)?,
        hasher: Sha256::new(),
    };
    io::copy(&mut input, &mut writer)?;
    writer.flush()?;
    Ok(const_hex::encode(writer.hasher.finalize()))
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(const_hex::encode(hasher.finalize()))
}
