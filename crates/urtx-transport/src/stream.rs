//! Split byte stream shared by every link implementation.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::ConnectionError;

/// The two halves of an established stream, each behind its own lock so
/// a pending read never blocks a write.
pub(crate) struct StreamHalves<R, W> {
    reader: Mutex<Option<R>>,
    writer: Mutex<Option<W>>,
}

impl<R, W> StreamHalves<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub(crate) fn new() -> Self {
        Self {
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    pub(crate) async fn attach(&self, reader: R, writer: W) {
        *self.reader.lock().await = Some(reader);
        *self.writer.lock().await = Some(writer);
    }

    pub(crate) async fn read_exact(&self, len: usize) -> Result<Option<Vec<u8>>, ConnectionError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(ConnectionError::NotConnected)?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = reader
                .read(&mut buf[filled..])
                .await
                .map_err(ConnectionError::ReceiveFailed)?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 && len > 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    pub(crate) async fn write_all(&self, data: &[u8]) -> Result<(), ConnectionError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ConnectionError::NotConnected)?;
        writer
            .write_all(data)
            .await
            .map_err(ConnectionError::SendFailed)?;
        writer.flush().await.map_err(ConnectionError::SendFailed)
    }

    pub(crate) async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.reader.lock().await.take();
    }
}
