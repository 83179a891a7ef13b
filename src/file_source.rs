// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Random-access read of the requested file. The sender never reads it
//! sequentially end-to-end; `read_at` is always called with the transfer's
//! current `read_offset`.

use crate::fail::Fail;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub struct FileSource {
    file: File,
    size: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, Fail> {
        let file = File::open(path).map_err(|_| Fail::FileNotFound {
            path: path.display().to_string(),
        })?;
        let size = file.metadata()?.len();
        Ok(FileSource { file, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads up to `max_len` bytes starting at `offset`. Returns fewer than
    /// `max_len` bytes iff EOF was reached; a zero-length read at
    /// `offset == size()` is valid and signals EOF.
    pub fn read_at(&mut self, offset: u64, max_len: usize) -> Result<Vec<u8>, Fail> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; max_len];
        let mut total = 0;
        loop {
            let n = self.file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            if total == max_len {
                break;
            }
        }
        buf.truncate(total);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_exact_and_eof() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![7u8; 2500]).unwrap();
        tmp.flush().unwrap();

        let mut source = FileSource::open(tmp.path()).unwrap();
        assert_eq!(source.size(), 2500);

        let first = source.read_at(0, 984).unwrap();
        assert_eq!(first.len(), 984);

        let last = source.read_at(1968, 984).unwrap();
        assert_eq!(last.len(), 532);

        let eof = source.read_at(2500, 984).unwrap();
        assert!(eof.is_empty());
    }

    #[test]
    fn open_missing_file_is_file_not_found() {
        let result = FileSource::open(Path::new("/nonexistent/does-not-exist.bin"));
        match result {
            Err(Fail::FileNotFound { .. }) => (),
            other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
        }
    }
}
