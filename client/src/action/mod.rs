pub mod cache;
pub mod conn;
pub mod delete_file;
pub mod get_file;
pub mod put_file;

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread::JoinHandle;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Scratch directory removed on drop.
    pub struct ScratchDir(PathBuf);

    impl ScratchDir {
        pub fn new(prefix: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "ferry_client_{}_{}_{}",
                prefix,
                std::process::id(),
                COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            std::fs::create_dir_all(&path).unwrap();
            Self(path)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    /// Leftover temporary download files in `dir`.
    pub fn part_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".part"))
            .collect()
    }

    /// A one-shot server: reads the request (the first line, or everything
    /// up to EOF), answers with `reply`, and hands back what it read.
    pub fn canned_server(reply: Vec<u8>, read_to_eof: bool) -> (SocketAddr, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut got = Vec::new();
            let mut buf = [0u8; 256];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                got.extend_from_slice(&buf[..n]);
                if !read_to_eof && got.contains(&b'\n') {
                    break;
                }
            }
            stream.write_all(&reply).unwrap();
            got
        });
        (addr, handle)
    }
}
