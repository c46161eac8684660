/// Asserts the next item of a stream, waiting at most `timeout` seconds (default 5).
///
/// Compare by value, or against a pattern with `matches`:
///
/// ```ignore
/// assert_next!(stream.events, expected_event);
/// assert_next!(stream.errors, matches ConfirmError::HeadHeight(_));
/// ```
#[macro_export]
macro_rules! assert_next {
    ($stream: expr, matches $pattern: pat) => {
        $crate::assert_next!($stream, matches $pattern, timeout = 5)
    };
    ($stream: expr, matches $pattern: pat, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        match message {
            std::option::Option::Some(msg) => {
                assert!(
                    matches!(msg, $pattern),
                    "Expected {}, got {:?}",
                    stringify!($pattern),
                    msg
                );
            }
            std::option::Option::None => {
                panic!("Expected {}, but channel was closed", stringify!($pattern));
            }
        }
    };
    ($stream: expr, $expected: expr) => {
        $crate::assert_next!($stream, $expected, timeout = 5)
    };
    ($stream: expr, $expected: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        let expected = $expected;
        match message {
            std::option::Option::Some(msg) => {
                assert_eq!(msg, expected, "Expected {:?}, got {:?}", expected, msg);
            }
            std::option::Option::None => {
                panic!("Expected {:?}, but channel was closed", expected);
            }
        }
    };
}

/// Asserts that a stream ends within `timeout` seconds (default 5).
#[macro_export]
macro_rules! assert_closed {
    ($stream: expr) => {
        $crate::assert_closed!($stream, timeout = 5)
    };
    ($stream: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        assert!(message.is_none(), "Expected closed stream, got {:?}", message)
    };
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    #[tokio::test]
    async fn assert_next_accepts_values_and_patterns() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = ReceiverStream::new(rx);
        tx.send(Some(1u64)).await.unwrap();
        tx.send(None).await.unwrap();
        drop(tx);

        assert_next!(stream, Some(1u64));
        assert_next!(stream, matches None);
        assert_closed!(stream);
    }

    #[tokio::test]
    #[should_panic = "but channel was closed"]
    async fn assert_next_on_closed_stream_panics() {
        let (tx, rx) = mpsc::channel::<u64>(1);
        let mut stream = ReceiverStream::new(rx);
        drop(tx);

        assert_next!(stream, 1u64);
    }
}
