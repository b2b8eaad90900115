use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Local stream forwarded lines are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

/// Where the output of one remote stream ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// Prefixed with the host name and printed line by line
    Forward(Stream),
    /// Kept verbatim
    Capture,
    /// Read and dropped, so the remote side never blocks on a full pipe
    Discard,
}

/// Drains the output streams of one host.
///
/// Every host has its own router, and captured bytes are handed back to the
/// caller instead of being stored anywhere shared.
pub(crate) struct OutputRouter {
    host: String,
    prefix: Vec<u8>,
}

impl OutputRouter {
    pub(crate) fn new(host: &str) -> Self {
        OutputRouter {
            host: host.to_string(),
            prefix: format!("[{}] ", host).into_bytes(),
        }
    }

    /// Read `reader` until EOF and deliver it along `route`.
    /// Returns the captured bytes, which are empty unless the route is
    /// [`Route::Capture`].
    pub(crate) async fn drain<R>(&self, reader: R, route: Route) -> io::Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        match route {
            Route::Forward(Stream::Stdout) => self.forward(reader, io::stdout()).await?,
            Route::Forward(Stream::Stderr) => self.forward(reader, io::stderr()).await?,
            Route::Capture => return capture(reader).await,
            Route::Discard => {
                let mut reader = reader;
                tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
            }
        }
        Ok(Vec::new())
    }

    /// Write every line of `reader` to `out` as `[host] line`.
    ///
    /// Lines are split on `\n` bytes only; the content is never decoded. A
    /// final line without newline gets one appended. Each line goes out in a
    /// single write so lines of different hosts never mix.
    ///
    /// Only read errors are returned. Once `out` fails the rest of the stream
    /// is drained without being written, and the host's status is unaffected.
    pub(crate) async fn forward<R, W>(&self, reader: R, mut out: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: Write,
    {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        let mut buf = Vec::new();
        let mut writable = true;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            // Keep reading after a failed write, the process would stall otherwise
            if !writable {
                continue;
            }

            buf.clear();
            buf.extend_from_slice(&self.prefix);
            buf.extend_from_slice(&line);
            if !line.ends_with(b"\n") {
                buf.push(b'\n');
            }
            if let Err(e) = out.write_all(&buf).and_then(|_| out.flush()) {
                warn!("Cannot forward output of {}: {}", self.host, e);
                writable = false;
            }
        }
        Ok(())
    }
}

async fn capture<R>(mut reader: R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}
