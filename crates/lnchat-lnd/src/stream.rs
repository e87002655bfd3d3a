//! Newline-delimited JSON stream decoding.
//!
//! Server-streaming calls on the REST gateway return one JSON object per
//! line, either `{"result": ...}` or `{"error": ...}`. Chunks from the HTTP
//! body do not respect line boundaries, so lines are reassembled here.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::RpcError;
use crate::wire::StreamFrame;

struct LineReader<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    done: bool,
}

/// Decode a byte stream into a stream of `{"result": T}` frames.
///
/// A transport error or an `{"error": ...}` frame is yielded once, after
/// which the stream ends.
pub fn json_frames<S, E, T>(body: S) -> BoxStream<'static, Result<T, RpcError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<RpcError> + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let reader = LineReader {
        inner: Box::pin(body),
        buf: Vec::new(),
        done: false,
    };

    futures::stream::unfold(reader, |mut st| async move {
        loop {
            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                let line = trim(&line);
                if line.is_empty() {
                    continue;
                }
                let frame = parse_frame::<T>(line);
                if frame.is_err() {
                    st.done = true;
                    st.buf.clear();
                }
                return Some((frame, st));
            }

            if st.done {
                let rest = std::mem::take(&mut st.buf);
                let rest = trim(&rest);
                if rest.is_empty() {
                    return None;
                }
                return Some((parse_frame::<T>(rest), st));
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    trace!(len = chunk.len(), "stream chunk");
                    st.buf.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.buf.clear();
                    return Some((Err(e.into()), st));
                }
                None => st.done = true,
            }
        }
    })
    .boxed()
}

fn trim(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace());
    match (start, end) {
        (Some(s), Some(e)) => &line[s..=e],
        _ => &[],
    }
}

fn parse_frame<T: DeserializeOwned>(line: &[u8]) -> Result<T, RpcError> {
    let frame: StreamFrame<T> = serde_json::from_slice(line)?;
    if let Some(err) = frame.error {
        return Err(RpcError::Stream {
            code: err.code,
            message: err.message,
        });
    }
    frame
        .result
        .ok_or_else(|| RpcError::Decode("stream frame without result".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        n: i64,
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, RpcError>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let body = chunks(&[
            "{\"result\":{\"n\":1}}\n{\"res",
            "ult\":{\"n\":2}}\n\n",
            "{\"result\":{\"n\":3}}",
        ]);
        let items: Vec<_> = json_frames::<_, _, Item>(body)
            .map(|r| r.unwrap().n)
            .collect()
            .await;
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_error_frame_ends_stream() {
        let body = chunks(&[
            "{\"result\":{\"n\":1}}\n",
            "{\"error\":{\"code\":2,\"message\":\"boom\"}}\n",
            "{\"result\":{\"n\":3}}\n",
        ]);
        let mut stream = json_frames::<_, _, Item>(body);

        assert_eq!(stream.next().await.unwrap().unwrap(), Item { n: 1 });
        match stream.next().await.unwrap() {
            Err(RpcError::Stream { code, message }) => {
                assert_eq!(code, 2);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"result\":{\"n\":1}}\n")),
            Err(RpcError::Decode("connection reset".into())),
            Ok(Bytes::from_static(b"{\"result\":{\"n\":2}}\n")),
        ]);
        let results: Vec<_> = json_frames::<_, _, Item>(body).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
