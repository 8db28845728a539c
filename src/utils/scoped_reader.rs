use tokio::io::{AsyncRead, ReadBuf};
use std::{pin::Pin, task::{Context, Poll}};

use crate::utils::scratch::ScratchDir;

/// Reader that owns the scratch directory its file lives in.
///
/// At end of file the inner reader is closed and the directory removed, so
/// the directory is gone by the time the last byte has been handed out.
/// Dropping the reader early (client went away) releases both as well.
pub struct ScopedReader<R>
where
    R: AsyncRead + Unpin,
{
    inner: Option<R>,
    scratch: Option<ScratchDir>,
    sent: u64,
    total: u64,
    label: String,
}

impl<R> ScopedReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R, scratch: ScratchDir, total: u64, label: impl Into<String>) -> Self {
        Self { inner: Some(inner), scratch: Some(scratch), sent: 0, total, label: label.into() }
    }

    fn release(&mut self) {
        self.inner.take();
        if self.scratch.take().is_some() {
            log::info!("Served {} ({} of {} bytes)", self.label, self.sent, self.total);
        }
    }
}

impl<R> AsyncRead for ScopedReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let inner = match this.inner.as_mut() {
            Some(inner) => inner,
            None => return Poll::Ready(Ok(())),
        };

        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        match Pin::new(inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let delta = (buf.filled().len() - before) as u64;
                if delta == 0 {
                    this.release();
                } else {
                    this.sent += delta;
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                log::error!("Read failed while serving {}: {}", this.label, e);
                this.release();
                Poll::Ready(Err(e))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R> Drop for ScopedReader<R>
where
    R: AsyncRead + Unpin,
{
    fn drop(&mut self) {
        // A sized body may be dropped after its last byte without reaching EOF.
        if self.scratch.is_some() && self.sent < self.total {
            log::warn!("Stopped serving {} after {} of {} bytes", self.label, self.sent, self.total);
            self.inner.take();
            self.scratch.take();
        } else {
            self.release();
        }
    }
}
