use crate::config::types::{JudgeError, OutputIntegrity, Result};
use crate::core::types::StreamCapture;
use crate::harness::report::HarnessReport;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{FromRawFd, OwnedFd};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Create the result channel: a close-on-exec pipe whose write end is handed
/// to the context and whose read end stays with the host.
pub fn result_pipe() -> Result<(File, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(JudgeError::Channel(format!(
            "pipe2(result): {}",
            std::io::Error::last_os_error()
        )));
    }
    let read = unsafe { File::from_raw_fd(fds[0]) };
    let write = unsafe { OwnedFd::from_raw_fd(fds[1]) };
    Ok((read, write))
}

/// Reader thread collecting one stream.
///
/// Bytes land in a shared buffer as they arrive, so whatever was received is
/// still available when the stream never reaches end of file.
pub struct StreamDrain {
    done: Receiver<()>,
    received: Arc<Mutex<StreamCapture>>,
}

/// State of a stream after the drain grace.
#[derive(Debug)]
pub enum Drained {
    /// End of file reached (or the reader failed)
    Closed(StreamCapture),
    /// A writer still holds the stream open; bytes received so far
    Open(StreamCapture),
}

impl Drained {
    pub fn into_capture(self) -> StreamCapture {
        match self {
            Drained::Closed(capture) | Drained::Open(capture) => capture,
        }
    }
}

/// Drain `reader` on its own thread, keeping at most `limit` bytes.
///
/// Reading continues past the limit so the writer never blocks on a full pipe;
/// the excess is discarded and the capture is marked truncated.
pub fn drain_async<R>(reader: Option<R>, limit: usize) -> StreamDrain
where
    R: Read + Send + 'static,
{
    let (tx, done) = crossbeam_channel::bounded(1);
    let received = Arc::new(Mutex::new(StreamCapture::default()));
    let drain = StreamDrain {
        done,
        received: Arc::clone(&received),
    };
    let Some(mut reader) = reader else {
        let _ = tx.send(());
        return drain;
    };

    thread::spawn(move || {
        let mut buf = [0u8; 8192];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let mut capture = lock(&received);
                    let room = limit.saturating_sub(capture.bytes.len());
                    if n > room {
                        capture.bytes.extend_from_slice(&buf[..room]);
                        capture.integrity = OutputIntegrity::TruncatedByJudgeLimit;
                    } else {
                        capture.bytes.extend_from_slice(&buf[..n]);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("stream drain stopped: {}", e);
                    lock(&received).integrity = OutputIntegrity::WriteError;
                    break;
                }
            }
        }

        // The receiver is gone when the caller stopped waiting.
        let _ = tx.send(());
    });

    drain
}

impl StreamDrain {
    /// Wait up to `grace` for end of file.
    pub fn finish(&self, grace: Duration) -> Drained {
        match self.done.recv_timeout(grace) {
            Ok(()) => Drained::Closed(self.snapshot()),
            Err(RecvTimeoutError::Timeout) => Drained::Open(self.snapshot()),
            Err(RecvTimeoutError::Disconnected) => {
                let mut capture = self.snapshot();
                capture.integrity = OutputIntegrity::WriteError;
                Drained::Closed(capture)
            }
        }
    }

    fn snapshot(&self) -> StreamCapture {
        lock(&self.received).clone()
    }
}

fn lock(capture: &Mutex<StreamCapture>) -> MutexGuard<'_, StreamCapture> {
    capture.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write the launch payload to the context's stdin on a helper thread, then
/// close it so the harness sees end of input.
pub fn feed_stdin<W>(writer: Option<W>, payload: Vec<u8>)
where
    W: Write + Send + 'static,
{
    let Some(mut writer) = writer else {
        return;
    };
    thread::spawn(move || {
        if let Err(e) = writer.write_all(&payload).and_then(|_| writer.flush()) {
            // The context died before reading its input; its exit is reported instead.
            log::debug!("stdin feed stopped: {}", e);
        }
    });
}

/// Decode the bytes collected from the result channel.
pub fn decode_report(capture: &StreamCapture, limit: usize) -> Result<HarnessReport> {
    if capture.integrity == OutputIntegrity::TruncatedByJudgeLimit {
        return Err(JudgeError::Channel(format!(
            "report exceeded {} bytes",
            limit
        )));
    }
    serde_json::from_slice(&capture.bytes)
        .map_err(|e| JudgeError::Channel(format!("failed to decode report: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_drain_keeps_prefix_and_consumes_rest() {
        let drain = drain_async(Some(Cursor::new(vec![b'x'; 20_000])), 100);
        let capture = match drain.finish(Duration::from_secs(5)) {
            Drained::Closed(capture) => capture,
            other => panic!("stream should be closed: {:?}", other),
        };
        assert_eq!(capture.bytes.len(), 100);
        assert_eq!(capture.integrity, OutputIntegrity::TruncatedByJudgeLimit);
    }

    #[test]
    fn test_drain_without_stream() {
        let drain = drain_async::<Cursor<Vec<u8>>>(None, 100);
        let capture = drain.finish(Duration::from_millis(100)).into_capture();
        assert!(capture.bytes.is_empty());
        assert_eq!(capture.integrity, OutputIntegrity::Complete);
    }

    #[test]
    fn test_result_pipe_round_trip() {
        let (read, write) = result_pipe().unwrap();
        let drain = drain_async(Some(read), 1024);

        let mut writer = File::from(write);
        writer
            .write_all(br#"{"kind":"internal_error","message":"x"}"#)
            .unwrap();
        drop(writer);

        let capture = drain.finish(Duration::from_secs(5)).into_capture();
        let report = decode_report(&capture, 1024).unwrap();
        assert_eq!(
            report,
            HarnessReport::InternalError {
                message: "x".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_truncated_and_garbage() {
        let capture = StreamCapture {
            bytes: b"{\"kind\":".to_vec(),
            integrity: OutputIntegrity::TruncatedByJudgeLimit,
        };
        let err = decode_report(&capture, 8).unwrap_err();
        assert!(err.to_string().contains("exceeded 8 bytes"));

        let capture = StreamCapture {
            bytes: b"not json".to_vec(),
            integrity: OutputIntegrity::Complete,
        };
        assert!(matches!(
            decode_report(&capture, 1024),
            Err(JudgeError::Channel(_))
        ));
    }

    #[test]
    fn test_open_stream_keeps_received_bytes() {
        let (read, write) = result_pipe().unwrap();
        let drain = drain_async(Some(read), 1024);

        let mut writer = File::from(write);
        writer.write_all(b"partial").unwrap();
        writer.flush().unwrap();
        // Give the reader thread a moment to pick the bytes up.
        thread::sleep(Duration::from_millis(200));

        match drain.finish(Duration::from_millis(100)) {
            Drained::Open(capture) => assert_eq!(capture.bytes, b"partial"),
            other => panic!("stream should still be open: {:?}", other),
        }
        drop(writer);
    }
}
