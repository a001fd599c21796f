// ── Line input ──
//
// The command loop pulls lines from a `LineSource`. Any tokio buffered
// reader works; for process stdin a dedicated OS thread does the blocking
// reads so a pending read never holds up runtime shutdown.

use std::future::Future;
use std::io::{self, BufRead, BufReader, Read};

use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;
use tracing::debug;

/// Lines consumed by the command loop. `Ok(None)` is end of input.
///
/// A line that is not valid UTF-8 is reported as an
/// [`io::ErrorKind::InvalidData`] error; the source stays usable afterwards.
pub trait LineSource: Send {
    fn next_line(&mut self) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

impl<R: AsyncBufRead + Unpin + Send> LineSource for Lines<R> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

const CHANNEL_DEPTH: usize = 16;

/// Lines read from a blocking reader on a background thread.
pub struct ThreadedLines {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl ThreadedLines {
    /// Read the process's standard input.
    pub fn stdin() -> io::Result<Self> {
        Self::spawn(io::stdin())
    }

    /// Read `reader` line by line on a new thread.
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        std::thread::Builder::new()
            .name("line-reader".into())
            .spawn(move || read_lines(BufReader::new(reader), &tx))?;
        Ok(Self { rx })
    }
}

impl LineSource for ThreadedLines {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

fn read_lines<R: BufRead>(mut reader: R, tx: &mpsc::Sender<io::Result<String>>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let item = match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => decode(&buf),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
        let fatal = item.as_ref().is_err_and(|e| e.kind() != io::ErrorKind::InvalidData);
        if tx.blocking_send(item).is_err() || fatal {
            break;
        }
    }
    debug!("line reader finished");
}

fn decode(raw: &[u8]) -> io::Result<String> {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8(line.to_vec()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
