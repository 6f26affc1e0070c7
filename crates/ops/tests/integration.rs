//! Integration tests for ops crate

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use httpmock::prelude::*;
    use pinst_config::Config;
    use pinst_errors::{Error, IntegrityError, ResolveError};
    use pinst_events::{AppEvent, EventReceiver, InstallEvent};
    use pinst_hash::Hash;
    use pinst_ops::*;
    use pinst_types::{FailureKind, HashAlgorithm, InstallPhase, SmokeTestOutcome, Version};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    const DEMO_SCRIPT: &[u8] = b"#!/bin/sh\necho \"Demo CLI 1.0.0\"\n";

    fn demo_tarball() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(DEMO_SCRIPT.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "demo-1.0.0/demo", DEMO_SCRIPT)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn context(formula_dir: &Path) -> (OpsCtx, EventReceiver) {
        let (tx, rx) = pinst_events::channel();
        let mut config = Config::default();
        config.install.formula_dir = Some(formula_dir.to_path_buf());
        config.network.retries = 0;
        let ctx = OpsContextBuilder::new()
            .with_config(config)
            .with_event_sender(tx)
            .build()
            .unwrap();
        (ctx, rx)
    }

    fn request(server: &MockServer, dest: &Path, checksum: &str) -> InstallRequest {
        InstallRequest {
            version: Some("1.0.0".to_string()),
            url: Some(server.url("/demo/v{version}.tar.gz")),
            checksum: Some(checksum.to_string()),
            destination: Some(dest.to_path_buf()),
            ..InstallRequest::new("demo")
        }
    }

    #[tokio::test]
    async fn test_install_pinned_release() {
        let server = MockServer::start_async().await;
        let archive = demo_tarball();
        let sha256 = Hash::from_data(HashAlgorithm::Sha256, &archive).to_hex();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/demo/v1.0.0.tar.gz");
                then.status(200).body(&archive);
            })
            .await;

        let formulas = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let (ctx, _rx) = context(formulas.path());

        let report = install(&ctx, &request(&server, dest.path(), &sha256))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(report.result.version, Version::new(1, 0, 0));
        assert_eq!(report.result.phase, InstallPhase::Done);
        assert!(report.result.verification.is_verified());
        assert!(report.warnings.is_empty());

        let path = dest.path().join("demo");
        assert_eq!(std::fs::read(&path).unwrap(), DEMO_SCRIPT);
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_keeps_destination() {
        let server = MockServer::start_async().await;
        let archive = demo_tarball();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/demo/v1.0.0.tar.gz");
                then.status(200).body(&archive);
            })
            .await;

        let formulas = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let (ctx, mut rx) = context(formulas.path());

        let err = install(&ctx, &request(&server, dest.path(), "deadbeef"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::ChecksumMismatch { .. })
        ));
        assert_eq!(FailureKind::from(&err), FailureKind::ChecksumMismatch);
        assert!(std::fs::read_dir(dest.path()).unwrap().next().is_none());

        let mut last_phase = None;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Install(InstallEvent::PhaseChanged { to, .. }) = event {
                last_phase = Some(to);
            }
        }
        assert_eq!(
            last_phase,
            Some(InstallPhase::Failed(FailureKind::ChecksumMismatch))
        );
    }

    #[tokio::test]
    async fn test_formula_install_runs_smoke_test() {
        let server = MockServer::start_async().await;
        let archive = demo_tarball();
        let sha256 = Hash::from_data(HashAlgorithm::Sha256, &archive).to_hex();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/demo/v1.0.0.tar.gz");
                then.status(200).body(&archive);
            })
            .await;

        let formulas = TempDir::new().unwrap();
        let formula = format!(
            r#"
name = "demo"
desc = "Demo CLI"
url = "{}"
version = "1.0.0"
sha256 = "{sha256}"
depends_on = ["sh", "pinst-no-such-command"]
caveats = "Add {{bin_dir}} to PATH"

[install]
bin = "demo-cli"

[test]
args = ["--help"]
expect = "Demo CLI"
"#,
            server.url("/demo/v{version}.tar.gz")
        );
        std::fs::write(formulas.path().join("demo.toml"), formula).unwrap();

        let dest = TempDir::new().unwrap();
        let (ctx, _rx) = context(formulas.path());
        let request = InstallRequest {
            destination: Some(dest.path().to_path_buf()),
            ..InstallRequest::new("demo")
        };

        let report = install(&ctx, &request).await.unwrap();
        assert_eq!(report.result.smoke_test, SmokeTestOutcome::Passed);
        assert!(report.result.path.ends_with("demo-cli"));
        assert_eq!(
            report.missing_requirements,
            vec!["pinst-no-such-command".to_string()]
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.caveats,
            Some(format!("Add {} to PATH", dest.path().display()))
        );

        let skipped = InstallRequest {
            skip_smoke_test: true,
            ..request
        };
        let report = install(&ctx, &skipped).await.unwrap();
        assert_eq!(report.result.smoke_test, SmokeTestOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_exact_version_survives_unavailable_release_index() {
        let server = MockServer::start_async().await;
        let archive = demo_tarball();
        let sha256 = Hash::from_data(HashAlgorithm::Sha256, &archive).to_hex();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/demo/v1.0.0.tar.gz");
                then.status(200).body(&archive);
            })
            .await;
        let tags = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/demo/tags");
                then.status(403).body("API rate limit exceeded");
            })
            .await;

        let formulas = TempDir::new().unwrap();
        let formula = format!(
            r#"
name = "demo"
url = "{}"
version = "1.0.0"
sha256 = "{sha256}"
releases_url = "{}"
"#,
            server.url("/demo/v{version}.tar.gz"),
            server.url("/repos/demo/tags")
        );
        std::fs::write(formulas.path().join("demo.toml"), formula).unwrap();

        let dest = TempDir::new().unwrap();
        let (ctx, _rx) = context(formulas.path());
        let request = InstallRequest {
            destination: Some(dest.path().to_path_buf()),
            ..InstallRequest::new("demo")
        };

        let report = install(&ctx, &request).await.unwrap();
        tags.assert_async().await;
        assert_eq!(report.result.version, Version::new(1, 0, 0));
        assert!(report.result.verification.is_verified());
        assert_eq!(std::fs::read(dest.path().join("demo")).unwrap(), DEMO_SCRIPT);

        // `latest` has nothing to fall back to
        let latest = InstallRequest {
            version: Some("latest".to_string()),
            ..request
        };
        let err = resolve(&ctx, &latest).await.unwrap_err();
        assert_eq!(FailureKind::from(&err), FailureKind::HttpStatus);
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_install() {
        let formulas = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let (ctx, _rx) = context(formulas.path());
        ctx.cancel.cancel();

        let request = InstallRequest {
            version: Some("1.0.0".to_string()),
            url: Some("https://example.invalid/demo/v{version}.tar.gz".to_string()),
            destination: Some(dest.path().to_path_buf()),
            ..InstallRequest::new("demo")
        };
        let err = install(&ctx, &request).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(std::fs::read_dir(dest.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_missing_formula_without_url() {
        let formulas = TempDir::new().unwrap();
        let (ctx, _rx) = context(formulas.path());

        let err = resolve(&ctx, &InstallRequest::new("demo")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Resolve(ResolveError::FormulaNotFound { .. })
        ));
        assert_eq!(FailureKind::from(&err), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_latest_from_formula_releases() {
        let formulas = TempDir::new().unwrap();
        std::fs::write(
            formulas.path().join("demo.toml"),
            r#"
name = "demo"
url = "https://example.com/demo/{tag}.tar.gz"
releases = ["v1.0.0", "v1.2.0", "v1.10.0", "v2.0.0-rc.1"]
"#,
        )
        .unwrap();
        let (ctx, _rx) = context(formulas.path());

        let release = resolve(&ctx, &InstallRequest::new("demo")).await.unwrap();
        assert_eq!(release.version, Version::new(1, 10, 0));
        assert_eq!(release.url, "https://example.com/demo/v1.10.0.tar.gz");
        assert!(release.checksum.is_none());
    }

    #[tokio::test]
    async fn test_latest_without_index_is_ambiguous() {
        let formulas = TempDir::new().unwrap();
        let (ctx, _rx) = context(formulas.path());
        let request = InstallRequest {
            url: Some("https://example.com/demo/{tag}.tar.gz".to_string()),
            ..InstallRequest::new("demo")
        };

        let err = resolve(&ctx, &request).await.unwrap_err();
        assert_eq!(FailureKind::from(&err), FailureKind::AmbiguousVersion);
    }

    #[tokio::test]
    async fn test_info_reports_requirements() {
        let formulas = TempDir::new().unwrap();
        std::fs::write(
            formulas.path().join("slack.toml"),
            r#"
name = "slack"
desc = "Command-line interface for Slack"
url = "https://github.com/nitaiaharoni/slack-cli/archive/refs/tags/v{version}.tar.gz"
version = "1.0.0"
sha256 = ""
license = "MIT"
depends_on = ["sh", "pinst-no-such-command"]

[install]
entry = "slack-cli.sh"
bin = "slack"
"#,
        )
        .unwrap();
        let (ctx, _rx) = context(formulas.path());

        let info = info(&ctx, "slack", None).await.unwrap();
        assert_eq!(info.bin, "slack");
        assert!(!info.pinned);
        assert_eq!(info.entry.as_deref(), Some("slack-cli.sh"));
        assert!(info.requirements[0].found.is_some());
        assert!(info.requirements[1].found.is_none());
    }

    #[tokio::test]
    async fn test_builder_requires_event_sender() {
        assert!(OpsContextBuilder::new().build().is_err());
    }
}
