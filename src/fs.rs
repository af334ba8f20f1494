use std::fs::File;
use std::io::{self, Read};
use std::os::unix::fs::FileExt;
use std::path::Path;

/// A file read front to back with positioned reads.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    offset: u64,
}

impl FileSource {
    pub fn open<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        File::open(path).map(Self::new)
    }

    pub fn new(file: File) -> Self {
        if let Err(e) = advise_sequential(&file) {
            log::debug!("posix_fadvise: {}", e);
        }
        Self { file, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read_at(buf, self.offset)?;
        self.offset += n as u64;
        Ok(n)
    }
}

#[cfg(target_os = "linux")]
fn advise_sequential(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let e = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
    if e == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(e))
    }
}

#[cfg(not(target_os = "linux"))]
fn advise_sequential(_: &File) -> io::Result<()> {
    Ok(())
}
