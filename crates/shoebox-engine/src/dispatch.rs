//! File dispatcher.
//!
//! Walks the input directory, hands every candidate to the resolver, and
//! carries the file into its `<label> <day>` folder. One bad file never ends
//! the run; failures are logged, counted, and skipped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use shoebox_exif::CaptureMetadata;
use shoebox_geo::Geocoder;
use shoebox_ops::{ensure_output_dir, RunSummary};
use shoebox_types::{config::DispatchConfig, Result, ShoeboxError};
use tracing::{debug, error, info};

use crate::{prompt::LabelPrompt, LabelResolver};

pub async fn run<M, G, P>(
    config: &DispatchConfig,
    resolver: &mut LabelResolver<M, G, P>,
) -> Result<RunSummary>
where
    M: CaptureMetadata,
    G: Geocoder,
    P: LabelPrompt,
{
    let output_root = ensure_output_dir(&config.output_dir)?;
    let files = candidate_files(Path::new(&config.input_dir))?;
    let filter = config.normalized_extensions();

    let mut summary = RunSummary::new();
    let mut taken: u64 = 0;

    for path in files {
        if let Some(filter) = &filter {
            let ext = extension_of(&path);
            if !filter.iter().any(|allowed| *allowed == ext) {
                info!(path = %path.display(), "skipping file due to extension");
                summary.record_skipped();
                continue;
            }
        }

        taken += 1;
        if let Some(max) = config.max_files {
            if taken > max {
                break;
            }
        }

        debug!(path = %path.display(), "processing");
        let resolution = match resolver.resolve(&path).await {
            Ok(resolution) => resolution,
            Err(err) => {
                error!(path = %path.display(), %err, "resolution failed; skipping file");
                summary.record_failure(format!("{}: {err}", path.display()));
                continue;
            }
        };
        summary.record_resolved();

        let target_dir = output_root.join(resolution.folder_name());
        if let Err(err) = transfer(&path, &target_dir, config.move_files) {
            error!(path = %path.display(), %err, "transfer failed; continuing");
            summary.record_failure(format!("{}: {err}", path.display()));
            continue;
        }
        summary.record_transferred();
    }

    info!(%summary, "run complete");
    Ok(summary)
}

/// Files of the input directory, ordered by extension group so images
/// resolve before videos sharing their day, then by name for determinism.
fn candidate_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(input_dir).map_err(|err| {
        dispatch_error(format!("unable to list {}: {err}", input_dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            dispatch_error(format!("unable to list {}: {err}", input_dir.display()))
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by_key(|path| (extension_of(path), path.file_name().map(|name| name.to_owned())));
    Ok(files)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Copies (or moves) one file into the target folder, creating it on demand.
fn transfer(path: &Path, target_dir: &Path, move_file: bool) -> Result<()> {
    fs::create_dir_all(target_dir).map_err(|err| {
        dispatch_error(format!("unable to create {}: {err}", target_dir.display()))
    })?;
    let file_name = path
        .file_name()
        .ok_or_else(|| dispatch_error(format!("{} has no file name", path.display())))?;
    let target = target_dir.join(file_name);

    if move_file {
        // Rename when the filesystem allows it; copy-and-remove otherwise.
        if fs::rename(path, &target).is_err() {
            copy_file(path, &target)?;
            fs::remove_file(path).map_err(|err| {
                dispatch_error(format!("unable to remove {}: {err}", path.display()))
            })?;
        }
    } else {
        copy_file(path, &target)?;
    }
    Ok(())
}

fn copy_file(path: &Path, target: &Path) -> Result<()> {
    fs::copy(path, target)
        .map(|_| ())
        .map_err(|err| {
            dispatch_error(format!(
                "unable to copy {} to {}: {err}",
                path.display(),
                target.display()
            ))
        })
}

pub fn dispatch_error(message: impl Into<String>) -> ShoeboxError {
    ShoeboxError::Dispatch(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;
    use chrono::{DateTime, Local, NaiveDate};
    use shoebox_exif::{GpsTags, StaticEntry, StaticMetadata};
    use shoebox_geo::FixedGeocoder;
    use shoebox_types::{config::ResolverConfig, geo::Address};

    fn resolver_config() -> ResolverConfig {
        ResolverConfig {
            explicit_labels: false,
            telemetry_assist: false,
            image_extensions: vec!["jpg".into(), "jpeg".into()],
        }
    }

    fn dispatch_config(input: &Path, output: &Path) -> DispatchConfig {
        DispatchConfig {
            input_dir: input.display().to_string(),
            output_dir: output.display().to_string(),
            extensions: None,
            max_files: None,
            move_files: false,
        }
    }

    fn denver_tags() -> GpsTags {
        GpsTags {
            latitude: (39.0, 44.0, 21.12),
            latitude_ref: 'N',
            longitude: (104.0, 59.0, 25.08),
            longitude_ref: 'W',
        }
    }

    fn geotagged_image(timestamp: &str) -> StaticEntry {
        StaticEntry {
            timestamp: Some(timestamp.into()),
            gps: Some(denver_tags()),
        }
    }

    fn file_day(path: &Path) -> NaiveDate {
        let metadata = fs::metadata(path).expect("stat file");
        let stamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .expect("filesystem timestamp");
        DateTime::<Local>::from(stamp).date_naive()
    }

    #[tokio::test]
    async fn images_and_videos_land_in_their_folders() {
        let workspace = tempfile::tempdir().expect("temp dir");
        let input = workspace.path().join("in");
        let output = workspace.path().join("out");
        fs::create_dir(&input).expect("create input dir");

        let photo = input.join("IMG_0001.jpg");
        let clip = input.join("DJI_0001.mp4");
        fs::write(&photo, b"jpeg payload").expect("write photo");
        fs::write(&clip, b"video payload").expect("write clip");

        let metadata =
            StaticMetadata::new().with_entry(&photo, geotagged_image("2023:05:01 10:00:00"));
        let geocoder = FixedGeocoder::new(Some(Address::with_city("Denver")));
        let prompt = ScriptedPrompt::new(["Trip"]);
        let mut resolver = LabelResolver::new(resolver_config(), metadata, geocoder, prompt);

        let summary = run(&dispatch_config(&input, &output), &mut resolver)
            .await
            .expect("run succeeds");

        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.transferred, 2);
        assert_eq!(summary.failed(), 0);

        assert!(output.join("Denver 2023-05-01").join("IMG_0001.jpg").is_file());
        let clip_folder = format!("Trip {}", file_day(&clip).format("%Y-%m-%d"));
        assert!(output.join(clip_folder).join("DJI_0001.mp4").is_file());
        // Copy mode leaves the sources alone.
        assert!(photo.is_file());
        assert!(clip.is_file());
    }

    #[tokio::test]
    async fn extension_filter_skips_unselected_files() {
        let workspace = tempfile::tempdir().expect("temp dir");
        let input = workspace.path().join("in");
        let output = workspace.path().join("out");
        fs::create_dir(&input).expect("create input dir");

        let photo = input.join("IMG_0001.jpg");
        let clip = input.join("DJI_0001.mp4");
        fs::write(&photo, b"jpeg payload").expect("write photo");
        fs::write(&clip, b"video payload").expect("write clip");

        let metadata =
            StaticMetadata::new().with_entry(&photo, geotagged_image("2023:05:01 10:00:00"));
        let geocoder = FixedGeocoder::new(Some(Address::with_city("Denver")));
        let prompt = ScriptedPrompt::new(Vec::<String>::new());
        let mut resolver = LabelResolver::new(resolver_config(), metadata, geocoder, prompt);

        let mut config = dispatch_config(&input, &output);
        config.extensions = Some(vec![".JPG".into()]);
        let summary = run(&config, &mut resolver).await.expect("run succeeds");

        assert_eq!(summary.transferred, 1);
        assert_eq!(summary.skipped, 1);
        assert!(output.join("Denver 2023-05-01").join("IMG_0001.jpg").is_file());
    }

    #[tokio::test]
    async fn file_limit_stops_the_run() {
        let workspace = tempfile::tempdir().expect("temp dir");
        let input = workspace.path().join("in");
        let output = workspace.path().join("out");
        fs::create_dir(&input).expect("create input dir");

        let first = input.join("IMG_0001.jpg");
        let second = input.join("IMG_0002.jpg");
        fs::write(&first, b"jpeg payload").expect("write photo");
        fs::write(&second, b"jpeg payload").expect("write photo");

        let metadata = StaticMetadata::new()
            .with_entry(&first, geotagged_image("2023:05:01 10:00:00"))
            .with_entry(&second, geotagged_image("2023:05:01 11:00:00"));
        let geocoder = FixedGeocoder::new(Some(Address::with_city("Denver")));
        let prompt = ScriptedPrompt::new(Vec::<String>::new());
        let mut resolver = LabelResolver::new(resolver_config(), metadata, geocoder, prompt);

        let mut config = dispatch_config(&input, &output);
        config.max_files = Some(1);
        let summary = run(&config, &mut resolver).await.expect("run succeeds");

        assert_eq!(summary.transferred, 1);
        assert!(output.join("Denver 2023-05-01").join("IMG_0001.jpg").is_file());
        assert!(!output.join("Denver 2023-05-01").join("IMG_0002.jpg").exists());
    }

    #[tokio::test]
    async fn move_mode_removes_the_source() {
        let workspace = tempfile::tempdir().expect("temp dir");
        let input = workspace.path().join("in");
        let output = workspace.path().join("out");
        fs::create_dir(&input).expect("create input dir");

        let photo = input.join("IMG_0001.jpg");
        fs::write(&photo, b"jpeg payload").expect("write photo");

        let metadata =
            StaticMetadata::new().with_entry(&photo, geotagged_image("2023:05:01 10:00:00"));
        let geocoder = FixedGeocoder::new(Some(Address::with_city("Denver")));
        let prompt = ScriptedPrompt::new(Vec::<String>::new());
        let mut resolver = LabelResolver::new(resolver_config(), metadata, geocoder, prompt);

        let mut config = dispatch_config(&input, &output);
        config.move_files = true;
        let summary = run(&config, &mut resolver).await.expect("run succeeds");

        assert_eq!(summary.transferred, 1);
        assert!(output.join("Denver 2023-05-01").join("IMG_0001.jpg").is_file());
        assert!(!photo.exists());
    }

    #[tokio::test]
    async fn one_unresolvable_file_does_not_end_the_run() {
        let workspace = tempfile::tempdir().expect("temp dir");
        let input = workspace.path().join("in");
        let output = workspace.path().join("out");
        fs::create_dir(&input).expect("create input dir");

        let broken = input.join("IMG_0001.jpg");
        let good = input.join("IMG_0002.jpg");
        fs::write(&broken, b"jpeg payload").expect("write photo");
        fs::write(&good, b"jpeg payload").expect("write photo");

        // The first photo has no capture timestamp at all.
        let metadata = StaticMetadata::new()
            .with_entry(&good, geotagged_image("2023:05:01 11:00:00"));
        let geocoder = FixedGeocoder::new(Some(Address::with_city("Denver")));
        let prompt = ScriptedPrompt::new(Vec::<String>::new());
        let mut resolver = LabelResolver::new(resolver_config(), metadata, geocoder, prompt);

        let summary = run(&dispatch_config(&input, &output), &mut resolver)
            .await
            .expect("run succeeds");

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.transferred, 1);
        assert!(output.join("Denver 2023-05-01").join("IMG_0002.jpg").is_file());
    }
}
