use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const FRAME_START: u8 = b'{';
const FRAME_END: u8 = b'}';

/// Pulls candidate JSON object frames out of an unframed byte stream.
///
/// Bytes before each `{` are discarded. A frame runs from that `{` up to and
/// including the next `}`. Brace depth is not tracked, so a nested object or a
/// `}` inside a string value cuts the frame short; the device never emits
/// either.
///
/// Every call to [`FrameExtractor::next_frame`] consumes the stream, so the
/// sequence cannot be restarted. There is no read timeout: a silent device
/// blocks the caller indefinitely.
pub struct FrameExtractor<R> {
    reader: R,
}

impl<R> FrameExtractor<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Waits for the next complete `{...}` span.
    ///
    /// Any read error is returned as-is. End of stream, whether between frames
    /// or inside one, is reported as [`io::ErrorKind::UnexpectedEof`].
    pub async fn next_frame(&mut self) -> io::Result<Vec<u8>> {
        self.skip_to_frame_start().await?;

        let mut frame = Vec::new();
        self.reader.read_until(FRAME_END, &mut frame).await?;
        if frame.last() != Some(&FRAME_END) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "telemetry stream ended inside a frame",
            ));
        }
        Ok(frame)
    }

    /// Discards bytes up to, but not including, the next `{`
    async fn skip_to_frame_start(&mut self) -> io::Result<()> {
        loop {
            let buffered = self.reader.fill_buf().await?;
            if buffered.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "telemetry stream closed",
                ));
            }
            let (skip, found) = match buffered.iter().position(|&b| b == FRAME_START) {
                Some(offset) => (offset, true),
                None => (buffered.len(), false),
            };
            self.reader.consume(skip);
            if found {
                return Ok(());
            }
        }
    }
}
