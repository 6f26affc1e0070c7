//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pinst_errors::{Error, InstallError, IntegrityError};
    use pinst_events::{channel, AppEvent, InstallEvent, VerifyEvent};
    use pinst_hash::Hash;
    use pinst_install::*;
    use pinst_net::{FetchConfig, FetchedArchive, Fetcher, NetClient};
    use pinst_types::{
        Checksum, HashAlgorithm, InstallPhase, InstallTarget, ResolvedRelease, SmokeTest,
        SmokeTestOutcome, Verification, Version,
    };
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    const DEMO_SCRIPT: &[u8] = b"#!/bin/sh\necho \"Demo CLI 1.0.0 $1\"\n";

    fn tarball(dir: &Path, name: &str, files: &[(&str, &[u8], u32)]) -> PathBuf {
        let path = dir.join(name);
        let encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (entry, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, entry, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    async fn fetch(path: &Path) -> FetchedArchive {
        let fetcher = Fetcher::new(NetClient::with_defaults().unwrap(), FetchConfig::default());
        let url = url::Url::from_file_path(path).unwrap();
        fetcher
            .fetch(url.as_str(), HashAlgorithm::Sha256, &None::<pinst_events::EventSender>)
            .await
            .unwrap()
    }

    fn release(checksum: Option<Checksum>) -> ResolvedRelease {
        ResolvedRelease {
            identifier: "demo".to_string(),
            version: Version::new(1, 0, 0),
            tag: "v1.0.0".to_string(),
            url: "https://example.com/demo/v1.0.0.tar.gz".to_string(),
            checksum,
        }
    }

    fn sha256_of(path: &Path) -> Checksum {
        Hash::from_data(HashAlgorithm::Sha256, &std::fs::read(path).unwrap()).to_checksum()
    }

    fn fetched_tracker() -> PhaseTracker {
        let mut tracker = PhaseTracker::new("demo", None);
        tracker.advance(InstallPhase::Fetched).unwrap();
        tracker
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn smoke() -> InstallOptions {
        InstallOptions {
            smoke_test: Some(SmokeTest {
                args: vec!["--help".to_string()],
                expect: Some("Demo CLI".to_string()),
                ..SmokeTest::default()
            }),
            ..InstallOptions::default()
        }
    }

    fn stage_request(archive: &Path, format: ArchiveFormat, target: &InstallTarget) -> StageRequest {
        StageRequest {
            archive: archive.to_path_buf(),
            format,
            entry: None,
            target: target.clone(),
            max_size: u64::MAX,
        }
    }

    fn fifo(dir: &Path) -> PathBuf {
        let path = dir.join("demo.pipe");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    fn staging_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_install_tarball_and_reinstall() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(
            src.path(),
            "v1.0.0.tar.gz",
            &[
                ("demo-1.0.0/README.md", b"readme", 0o644),
                ("demo-1.0.0/demo", DEMO_SCRIPT, 0o755),
            ],
        );
        let release = release(Some(sha256_of(&path)));
        let target = InstallTarget::new(dest.path(), "demo");

        let archive = fetch(&path).await;
        let mut tracker = fetched_tracker();
        let first = install_archive(&archive, &release, &target, &smoke(), &mut tracker)
            .await
            .unwrap();

        assert_eq!(first.phase, InstallPhase::Done);
        assert_eq!(first.smoke_test, SmokeTestOutcome::Passed);
        assert!(first.verification.is_verified());
        let installed = std::fs::read(target.path()).unwrap();
        assert_eq!(installed, DEMO_SCRIPT);
        let mode = std::fs::metadata(target.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let archive = fetch(&path).await;
        let mut tracker = fetched_tracker();
        let second = install_archive(&archive, &release, &target, &smoke(), &mut tracker)
            .await
            .unwrap();
        assert_eq!(second.smoke_test, SmokeTestOutcome::Passed);
        assert_eq!(std::fs::read(target.path()).unwrap(), installed);
        assert_eq!(dir_entries(dest.path()), vec!["demo".to_string()]);
    }

    #[tokio::test]
    async fn test_mismatch_leaves_destination_untouched() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        std::fs::write(dest.path().join("demo"), b"old").unwrap();

        let (tx, mut rx) = channel();
        let mut tracker = PhaseTracker::new("demo", Some(tx));
        tracker.advance(InstallPhase::Fetched).unwrap();
        let archive = fetch(&path).await;
        let release = release(Some(Checksum::parse("deadbeef").unwrap()));
        let target = InstallTarget::new(dest.path(), "demo");

        let err = install_archive(&archive, &release, &target, &smoke(), &mut tracker)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::ChecksumMismatch { .. })
        ));
        assert_eq!(tracker.phase(), InstallPhase::Fetched);
        assert_eq!(std::fs::read(target.path()).unwrap(), b"old");
        assert_eq!(dir_entries(dest.path()), vec!["demo".to_string()]);

        let mut saw_mismatch = false;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Verify(VerifyEvent::Mismatch { expected, .. }) = event {
                assert_eq!(expected, "deadbeef");
                saw_mismatch = true;
            }
        }
        assert!(saw_mismatch);
    }

    #[tokio::test]
    async fn test_unpinned_archive_is_unverified() {
        let src = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let archive = fetch(&path).await;

        let verification = verify(&archive, None).await.unwrap();
        assert_eq!(verification, Verification::Unverified(sha256_of(&path)));

        let blake3 = Hash::from_data(HashAlgorithm::Blake3, &std::fs::read(&path).unwrap());
        let verification = verify(&archive, Some(&blake3.to_checksum())).await.unwrap();
        assert!(verification.is_verified());
    }

    #[tokio::test]
    async fn test_candidate_count_must_be_one() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let target = InstallTarget::new(dest.path(), "demo");

        let none = tarball(src.path(), "none.tar.gz", &[("docs/README", b"x", 0o644)]);
        let two = tarball(
            src.path(),
            "two.tar.gz",
            &[("bin/demo", DEMO_SCRIPT, 0o755), ("bin/helper", b"#!/bin/sh\n", 0o755)],
        );

        for path in [&none, &two] {
            let archive = fetch(path).await;
            let mut tracker = fetched_tracker();
            let err = install_archive(
                &archive,
                &release(None),
                &target,
                &InstallOptions::default(),
                &mut tracker,
            )
            .await
            .unwrap_err();
            assert!(matches!(
                err,
                Error::Install(InstallError::MalformedArchive { .. })
            ));
            assert!(dir_entries(dest.path()).is_empty());
        }

        let archive = fetch(&two).await;
        let mut tracker = fetched_tracker();
        let options = InstallOptions {
            entry: Some("demo".to_string()),
            ..InstallOptions::default()
        };
        let result = install_archive(&archive, &release(None), &target, &options, &mut tracker)
            .await
            .unwrap();
        assert_eq!(result.smoke_test, SmokeTestOutcome::Skipped);
        assert_eq!(std::fs::read(target.path()).unwrap(), DEMO_SCRIPT);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let src = TempDir::new().unwrap();
        let path = src.path().join("evil.tar");
        let mut builder = tar::Builder::new(std::fs::File::create(&path).unwrap());
        let mut header = tar::Header::new_gnu();
        let name = b"../evil";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(DEMO_SCRIPT.len() as u64);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, DEMO_SCRIPT).unwrap();
        builder.into_inner().unwrap();

        let dest = TempDir::new().unwrap();
        let archive = fetch(&path).await;
        let target = InstallTarget::new(dest.path(), "demo");
        let lock = Arc::new(DestinationLock::acquire(&target).await.unwrap());
        let err = stage_entry(
            stage_request(&archive.path, ArchiveFormat::Tar, &target),
            lock,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("escapes the archive root"));
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_zip_and_raw_downloads() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let zip_path = src.path().join("demo.zip");
        let mut writer = zip::ZipWriter::new(std::fs::File::create(&zip_path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o755);
        writer.start_file("demo-1.0.0/demo", options).unwrap();
        writer.write_all(DEMO_SCRIPT).unwrap();
        writer.finish().unwrap();

        let archive = fetch(&zip_path).await;
        let target = InstallTarget::new(dest.path(), "demo");
        let mut tracker = fetched_tracker();
        install_archive(&archive, &release(None), &target, &smoke(), &mut tracker)
            .await
            .unwrap();
        assert_eq!(std::fs::read(target.path()).unwrap(), DEMO_SCRIPT);

        let raw_path = src.path().join("slack-cli.sh");
        std::fs::write(&raw_path, DEMO_SCRIPT).unwrap();
        let archive = fetch(&raw_path).await;
        assert_eq!(ArchiveFormat::detect(&archive.path).unwrap(), ArchiveFormat::Raw);
        let target = InstallTarget::new(dest.path(), "slack");
        let mut tracker = fetched_tracker();
        let result = install_archive(&archive, &release(None), &target, &smoke(), &mut tracker)
            .await
            .unwrap();
        assert_eq!(result.smoke_test, SmokeTestOutcome::Passed);
        let mode = std::fs::metadata(target.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_special_mode_bits_are_never_applied() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let mut target = InstallTarget::new(dest.path(), "demo");
        target.mode = 0o6755;

        let archive = fetch(&path).await;
        let mut tracker = fetched_tracker();
        install_archive(
            &archive,
            &release(None),
            &target,
            &InstallOptions::default(),
            &mut tracker,
        )
        .await
        .unwrap();
        let mode = std::fs::metadata(target.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o755);
    }

    #[tokio::test]
    async fn test_held_lock_blocks_install() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let target = InstallTarget::new(dest.path(), "demo");

        let held = DestinationLock::acquire(&target).await.unwrap();
        let archive = fetch(&path).await;
        let mut tracker = fetched_tracker();
        let err = install_archive(&archive, &release(None), &target, &smoke(), &mut tracker)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::DestinationLocked { .. })
        ));
        assert!(!target.path().exists());

        drop(held);
        assert!(!DestinationLock::lock_path(&target).exists());
    }

    #[tokio::test]
    async fn test_dropped_staging_file_is_removed() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let target = InstallTarget::new(dest.path(), "demo");

        let lock = Arc::new(DestinationLock::acquire(&target).await.unwrap());
        let staged = stage_entry(
            stage_request(&path, ArchiveFormat::TarGz, &target),
            Arc::clone(&lock),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(staged.path().starts_with(dest.path()));
        drop(staged);
        drop(lock);

        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_copy_keeps_previous_artifact() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let target = InstallTarget::new(dest.path(), "demo");
        std::fs::write(target.path(), b"previous").unwrap();
        let pipe = fifo(src.path());

        let cancel = CancellationToken::new();
        let lock = Arc::new(DestinationLock::acquire(&target).await.unwrap());
        let staging = tokio::spawn({
            let request = stage_request(&pipe, ArchiveFormat::Raw, &target);
            let cancel = cancel.clone();
            async move { stage_entry(request, lock, &cancel).await }
        });

        // opening the write end waits for the staging task to open the pipe
        let mut writer = tokio::task::spawn_blocking(move || {
            std::fs::OpenOptions::new().write(true).open(pipe).unwrap()
        })
        .await
        .unwrap();
        writer.write_all(&[0u8; 16 * 1024]).unwrap();
        wait_until("partial staging file", || {
            staging_files(dest.path())
                .iter()
                .any(|p| std::fs::metadata(p).is_ok_and(|m| m.len() > 0))
        })
        .await;

        cancel.cancel();
        // the copy is blocked on the pipe; more data lets it observe the cancellation
        let _ = writer.write_all(&[0u8; 1024]);
        let err = staging.await.unwrap().unwrap_err();
        drop(writer);

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(dir_entries(dest.path()), vec!["demo".to_string()]);
        assert_eq!(std::fs::read(target.path()).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_dropped_stage_future_keeps_lock_until_cleanup() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let target = InstallTarget::new(dest.path(), "demo");
        std::fs::write(target.path(), b"previous").unwrap();
        let pipe = fifo(src.path());
        let lock_path = DestinationLock::lock_path(&target);

        let lock = Arc::new(DestinationLock::acquire(&target).await.unwrap());
        let open_writer = tokio::task::spawn_blocking({
            let pipe = pipe.clone();
            move || std::fs::OpenOptions::new().write(true).open(pipe).unwrap()
        });
        let timed_out = tokio::time::timeout(
            Duration::from_millis(200),
            stage_entry(
                stage_request(&pipe, ArchiveFormat::Raw, &target),
                lock,
                &CancellationToken::new(),
            ),
        )
        .await;
        assert!(timed_out.is_err());

        // the blocking copy is still waiting on the pipe and still owns the lock
        assert!(lock_path.exists());
        let err = DestinationLock::acquire(&target).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::DestinationLocked { .. })
        ));

        let mut writer = open_writer.await.unwrap();
        let _ = writer.write_all(&[0u8; 1024]);
        wait_until("lock release", || !lock_path.exists()).await;
        drop(writer);

        assert_eq!(dir_entries(dest.path()), vec!["demo".to_string()]);
        assert_eq!(std::fs::read(target.path()).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_cancelled_install_writes_nothing() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let target = InstallTarget::new(dest.path(), "demo");
        let archive = fetch(&path).await;

        let options = InstallOptions::default();
        options.cancel.cancel();
        let mut tracker = fetched_tracker();
        let err = install_archive(&archive, &release(None), &target, &options, &mut tracker)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_oversized_entry_is_refused() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let target = InstallTarget::new(dest.path(), "demo");
        let archive = fetch(&path).await;

        let options = InstallOptions {
            max_entry_size: 8,
            ..InstallOptions::default()
        };
        let mut tracker = fetched_tracker();
        let err = install_archive(&archive, &release(None), &target, &options, &mut tracker)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::MalformedArchive { .. })
        ));
        assert!(err.to_string().contains("expands beyond 8 bytes"));
        assert!(dir_entries(dest.path()).is_empty());
    }

    #[tokio::test]
    async fn test_smoke_test_failures_are_reported() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("tool");
        std::fs::write(&script, b"#!/bin/sh\necho nope\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = run_smoke_test(
            &script,
            &SmokeTest {
                expect: Some("Demo CLI".to_string()),
                ..SmokeTest::default()
            },
        )
        .await;
        assert!(matches!(outcome, SmokeTestOutcome::Failed { reason } if reason.contains("Demo CLI")));

        let outcome = run_smoke_test(
            &script,
            &SmokeTest {
                expect_status: Some(0),
                ..SmokeTest::default()
            },
        )
        .await;
        assert!(matches!(outcome, SmokeTestOutcome::Failed { reason } if reason.contains("exit status 3")));

        let sleeper = dir.path().join("sleeper");
        std::fs::write(&sleeper, b"#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&sleeper, std::fs::Permissions::from_mode(0o755)).unwrap();
        let outcome = run_smoke_test(
            &sleeper,
            &SmokeTest {
                timeout_secs: 1,
                ..SmokeTest::default()
            },
        )
        .await;
        assert!(matches!(outcome, SmokeTestOutcome::Failed { reason } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn test_preflight_rejects_directory_target() {
        let dest = TempDir::new().unwrap();
        let nested = dest.path().join("bin");
        let target = InstallTarget::new(&nested, "demo");
        check_destination(&target).await.unwrap();
        assert!(nested.is_dir());

        std::fs::create_dir(target.path()).unwrap();
        assert!(check_destination(&target).await.is_err());
    }

    #[tokio::test]
    async fn test_events_follow_phases() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = tarball(src.path(), "v1.0.0.tar.gz", &[("demo", DEMO_SCRIPT, 0o755)]);
        let (tx, mut rx) = channel();
        let mut tracker = PhaseTracker::new("demo", Some(tx));
        tracker.advance(InstallPhase::Fetched).unwrap();

        let archive = fetch(&path).await;
        let target = InstallTarget::new(dest.path(), "demo");
        install_archive(&archive, &release(None), &target, &smoke(), &mut tracker)
            .await
            .unwrap();
        drop(tracker);

        let mut phases = Vec::new();
        let mut placed = false;
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::Install(InstallEvent::PhaseChanged { to, .. }) => phases.push(to),
                AppEvent::Install(InstallEvent::Placed { replaced, .. }) => {
                    assert!(!replaced);
                    placed = true;
                }
                _ => {}
            }
        }
        assert!(placed);
        assert_eq!(
            phases,
            vec![
                InstallPhase::Fetched,
                InstallPhase::Verified,
                InstallPhase::Placed,
                InstallPhase::Tested,
                InstallPhase::Done,
            ]
        );
    }
}
