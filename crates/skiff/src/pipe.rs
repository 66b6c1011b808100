//! Splice an established tunnel onto this process's stdin and
//! stdout.

use futures::future::{select, Either};
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use futures::pin_mut;
use skiff_client::Tunnel;
use std::io::Result as IoResult;
use tokio_crate as tokio;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

/// Relay bytes between the tunnel and stdin/stdout until either side
/// reaches EOF or fails.
pub(crate) async fn splice<S>(tunnel: Tunnel<S>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (tunnel_r, tunnel_w) = tunnel.split();
    let stdin = tokio::io::stdin().compat();
    let stdout = tokio::io::stdout().compat_write();

    let up = copy_interactive(stdin, tunnel_w);
    let down = copy_interactive(tunnel_r, stdout);
    pin_mut!(up);
    pin_mut!(down);

    // Whichever direction finishes first ends the session; an SSH
    // client hanging up should not leave us waiting on the remote.
    match select(up, down).await {
        Either::Left((res, _)) | Either::Right((res, _)) => res?,
    }
    Ok(())
}

/// Copy all the data from `reader` into `writer` until we encounter
/// an EOF or an error.
///
/// Unlike futures::io::copy(), this function is meant for use with
/// interactive readers and writers, where the reader might pause for
/// a while, but where we want to send data on the writer as soon as
/// it is available.
///
/// This function assumes that the writer might need to be flushed for
/// any buffered data to be sent.  It tries to minimize the number of
/// flushes, however, by only flushing the writer when the reader has
/// no data.
async fn copy_interactive<R, W>(mut reader: R, mut writer: W) -> IoResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    use futures::{poll, task::Poll};

    let mut buf = [0_u8; 1024];

    let loop_result: IoResult<()> = loop {
        let mut read_future = reader.read(&mut buf[..]);
        match poll!(&mut read_future) {
            Poll::Ready(Err(e)) => break Err(e),
            Poll::Ready(Ok(0)) => break Ok(()), // EOF
            Poll::Ready(Ok(n)) => {
                writer.write_all(&buf[..n]).await?;
                continue;
            }
            Poll::Pending => writer.flush().await?,
        }

        // The read future is pending, so we should wait on it.
        match read_future.await {
            Err(e) => break Err(e),
            Ok(0) => break Ok(()),
            Ok(n) => writer.write_all(&buf[..n]).await?,
        }
    };

    // Flush any lingering data, and close the writer if the reader
    // closed cleanly.
    let flush_result = if loop_result.is_ok() {
        writer.close().await
    } else {
        writer.flush().await
    };

    loop_result.or(flush_result)
}
