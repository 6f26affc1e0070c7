//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pinst_errors::{Error, NetworkError};
    use pinst_events::{channel, AppEvent, DownloadEvent};
    use pinst_hash::Hash;
    use pinst_net::*;
    use pinst_types::HashAlgorithm;
    use std::time::Duration;

    fn fetcher(max_retries: u32) -> Fetcher {
        let config = FetchConfig {
            attempt_timeout: Duration::from_secs(5),
            retry: RetryConfig {
                max_retries,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                ..RetryConfig::default()
            },
            ..FetchConfig::default()
        };
        Fetcher::new(NetClient::with_defaults().unwrap(), config)
    }

    #[tokio::test]
    async fn test_fetch_archive() {
        let server = MockServer::start_async().await;
        let (tx, mut rx) = channel();

        let content = b"test archive content";
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/demo-1.0.0.tar.gz");
                then.status(200)
                    .header("content-length", content.len().to_string())
                    .body(content);
            })
            .await;

        let archive = fetcher(0)
            .fetch(
                &server.url("/demo-1.0.0.tar.gz"),
                HashAlgorithm::Sha256,
                &tx,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(archive.size, content.len() as u64);
        assert_eq!(archive.file_name, "demo-1.0.0.tar.gz");
        assert_eq!(
            archive.digest,
            Hash::from_data(HashAlgorithm::Sha256, content)
        );
        assert_eq!(tokio::fs::read(&archive.path).await.unwrap(), content);

        let workdir = archive.workdir().to_path_buf();
        assert!(workdir.exists());
        drop(archive);
        assert!(!workdir.exists(), "temp dir must be removed on drop");

        let mut saw_start = false;
        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Download(DownloadEvent::Started { .. }) => saw_start = true,
                AppEvent::Download(DownloadEvent::Completed { .. }) => saw_complete = true,
                _ => {}
            }
        }
        assert!(saw_start);
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start_async().await;
        let (tx, _rx) = channel();

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/flaky.tar.gz");
                then.status(503);
            })
            .await;

        let error = fetcher(2)
            .fetch(&server.url("/flaky.tar.gz"), HashAlgorithm::Sha256, &tx)
            .await
            .unwrap_err();

        assert_eq!(mock.hits_async().await, 3);
        assert!(matches!(
            error,
            Error::Network(NetworkError::HttpStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let (tx, mut rx) = channel();

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.tar.gz");
                then.status(404).body("Not Found");
            })
            .await;

        let error = fetcher(3)
            .fetch(&server.url("/missing.tar.gz"), HashAlgorithm::Sha256, &tx)
            .await
            .unwrap_err();

        assert_eq!(mock.hits_async().await, 1);
        assert!(matches!(
            error,
            Error::Network(NetworkError::HttpStatus { status: 404, .. })
        ));

        let mut saw_failed = false;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(
                event,
                AppEvent::Download(DownloadEvent::Retrying { .. })
            ));
            if let AppEvent::Download(DownloadEvent::Failed { attempts, .. }) = event {
                assert_eq!(attempts, 1);
                saw_failed = true;
            }
        }
        assert!(saw_failed);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let server = MockServer::start_async().await;
        let (tx, _rx) = channel();

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/slow.tar.gz");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .body("late");
            })
            .await;

        let config = FetchConfig {
            attempt_timeout: Duration::from_millis(200),
            retry: RetryConfig {
                max_retries: 1,
                initial_delay: Duration::from_millis(1),
                ..RetryConfig::default()
            },
            ..FetchConfig::default()
        };
        let fetcher = Fetcher::new(NetClient::with_defaults().unwrap(), config);

        let error = fetcher
            .fetch(&server.url("/slow.tar.gz"), HashAlgorithm::Sha256, &tx)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Network(NetworkError::Timeout { .. })));
        assert!(mock.hits_async().await >= 1);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let server = MockServer::start_async().await;
        let (tx, _rx) = channel();

        server
            .mock_async(|when, then| {
                when.method(GET).path("/big.tar.gz");
                then.status(200).body(vec![0u8; 4096]);
            })
            .await;

        let config = FetchConfig {
            max_file_size: 1024,
            ..FetchConfig::default()
        };
        let fetcher = Fetcher::new(NetClient::with_defaults().unwrap(), config);

        let error = fetcher
            .fetch(&server.url("/big.tar.gz"), HashAlgorithm::Sha256, &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::FileSizeExceeded { limit: 1024, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let (tx, _rx) = channel();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tool.sh");
        tokio::fs::write(&source, b"#!/bin/sh\necho hi\n")
            .await
            .unwrap();

        let url = url::Url::from_file_path(&source).unwrap();
        let archive = fetcher(0)
            .fetch(url.as_str(), HashAlgorithm::Blake3, &tx)
            .await
            .unwrap();
        assert_eq!(archive.file_name, "tool.sh");
        assert_eq!(archive.digest.algorithm(), HashAlgorithm::Blake3);

        let missing = url::Url::from_file_path(dir.path().join("absent.tar.gz")).unwrap();
        let error = fetcher(3)
            .fetch(missing.as_str(), HashAlgorithm::Sha256, &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::FileUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let (tx, _rx) = channel();
        let error = fetcher(3)
            .fetch("ftp://example.com/a.tar.gz", HashAlgorithm::Sha256, &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::UnsupportedProtocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let server = MockServer::start_async().await;
        let (tx, _rx) = channel();

        let content = r#"[{"name":"v1.0.0"}]"#;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/releases");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(content);
            })
            .await;

        let text = fetcher(0)
            .fetch_text(&server.url("/releases"), &tx)
            .await
            .unwrap();
        assert_eq!(text, content);
    }
}
