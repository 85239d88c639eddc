use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::Result;

/// Inbound half of a transport. Yields one raw text frame per call;
/// `Ok(None)` means the peer closed the connection.
///
/// Decoding is not the transport's job: frames reach the dispatch loop as
/// text so that parse failures can be reported with the offending frame
/// attached.
pub trait FrameRead {
    fn read(&mut self) -> impl Future<Output = Result<Option<String>>> + Send + Sync;
}

/// Line-delimited framing over any buffered reader. Blank lines are skipped.
impl<R> FrameRead for R
where
    R: AsyncBufRead + Send + Sync + Unpin,
{
    fn read(&mut self) -> impl Future<Output = Result<Option<String>>> + Send + Sync {
        async {
            let mut line = String::new();
            loop {
                line.clear();
                if self.read_line(&mut line).await? == 0 {
                    return Ok(None);
                }
                let len = line.trim_end().len();
                if len > 0 {
                    line.truncate(len);
                    return Ok(Some(line));
                }
            }
        }
    }
}
