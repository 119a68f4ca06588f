//! Bounded, timed reads from an async byte stream.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::IngestError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Drains `reader` into memory.
///
/// Each individual read must make progress within `read_timeout`, and the
/// total may not exceed `max_bytes`. The whole feed is committed in one batch
/// anyway, so the cap is the ingestion memory bound.
pub(crate) async fn read_bounded<R>(
    mut reader: R,
    read_timeout: Duration,
    max_bytes: usize,
) -> Result<Vec<u8>, IngestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = vec![0_u8; CHUNK_SIZE];

    loop {
        let n = tokio::time::timeout(read_timeout, reader.read(&mut chunk))
            .await
            .map_err(|_| IngestError::Timeout(read_timeout))??;
        if n == 0 {
            break;
        }
        if buf.len() + n > max_bytes {
            return Err(IngestError::TooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_everything_under_the_cap() {
        let bytes = read_bounded(&b"a,b\n1,2\n"[..], Duration::from_secs(1), 64)
            .await
            .unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn input_at_the_cap_is_accepted() {
        let bytes = read_bounded(&b"12345"[..], Duration::from_secs(1), 5)
            .await
            .unwrap();
        assert_eq!(bytes.len(), 5);
    }

    #[tokio::test]
    async fn input_over_the_cap_is_rejected() {
        let err = read_bounded(&b"123456"[..], Duration::from_secs(1), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { limit: 5 }));
    }

    #[tokio::test]
    async fn stalled_stream_times_out() {
        let (_writer, reader) = tokio::io::duplex(16);
        let err = read_bounded(reader, Duration::from_millis(20), 64)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Timeout(_)));
    }
}
