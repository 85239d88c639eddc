use std::{future::Future, pin::Pin};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::Result;

/// Outbound half of a transport. Accepts one raw text frame per call.
pub trait FrameWrite {
    fn write(&mut self, frame: &str) -> impl Future<Output = Result<()>> + Send + Sync;

    fn boxed(self) -> BoxFrameWriter
    where
        Self: Sized + Send + Sync + 'static,
    {
        BoxFrameWriter(Box::new(self))
    }
}

/// Line-delimited framing over any writer.
impl<W> FrameWrite for W
where
    W: AsyncWrite + Send + Sync + Unpin,
{
    fn write(&mut self, frame: &str) -> impl Future<Output = Result<()>> + Send + Sync {
        async move {
            self.write_all(frame.as_bytes()).await?;
            self.write_all(b"\n").await?;
            self.flush().await?;
            Ok(())
        }
    }
}

pub struct BoxFrameWriter(Box<dyn DynFrameWrite + Send + Sync + 'static>);

impl FrameWrite for BoxFrameWriter {
    async fn write(&mut self, frame: &str) -> Result<()> {
        self.0.dyn_write(frame).await
    }
    fn boxed(self) -> BoxFrameWriter
    where
        Self: Sized + Send + Sync + 'static,
    {
        self
    }
}

trait DynFrameWrite {
    fn dyn_write<'a>(
        &'a mut self,
        frame: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + Sync + 'a>>;
}

impl<T: FrameWrite> DynFrameWrite for T {
    fn dyn_write<'a>(
        &'a mut self,
        frame: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + Sync + 'a>> {
        Box::pin(self.write(frame))
    }
}
