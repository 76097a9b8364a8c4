//! The end-to-end unpack orchestrator.
//!
//! Sequences discovery → decode → dispatch → fallback → report for every
//! container under the content root, strictly one file at a time. Every
//! failure below the whole-run level is caught at the per-file boundary,
//! reported, and answered with a verbatim copy of the original container, so
//! every discovered file produces *some* output and a single bad asset never
//! aborts the run.

use crate::loader::ContentLoader;
use crate::progress::{ProgressReporter, ProgressStep, UnpackFailedReason};
use crate::writers::{path_with_extension, WriterError, WriterRegistry};
use crate::UnpackOptions;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// The binary container extension the unpacker looks for.
const CONTAINER_EXTENSION: &str = "xnb";

/// One discovered binary container, identified relative to the content root.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    /// Path within the content folder, `/`-separated, with the container
    /// extension.
    pub relative_path: String,
    /// Absolute path to the container file.
    pub container_path: PathBuf,
}

impl AssetRecord {
    /// The loader key: the relative path without the container extension.
    pub fn asset_key(&self) -> &str {
        strip_container_extension(&self.relative_path)
    }
}

/// The result of one file's unpack attempt. Exactly one is produced per
/// [`AssetRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackOutcome {
    Success,
    ReadError(String),
    UnsupportedType(String),
    WriteError(String),
    UnknownError(String),
}

impl UnpackOutcome {
    /// The reporter-facing reason and message, or `None` for a success.
    pub fn failure(&self) -> Option<(UnpackFailedReason, &str)> {
        match self {
            UnpackOutcome::Success => None,
            UnpackOutcome::ReadError(msg) => Some((UnpackFailedReason::ReadError, msg)),
            UnpackOutcome::UnsupportedType(msg) => {
                Some((UnpackFailedReason::UnsupportedFileType, msg))
            }
            UnpackOutcome::WriteError(msg) => Some((UnpackFailedReason::WriteError, msg)),
            UnpackOutcome::UnknownError(msg) => Some((UnpackFailedReason::UnknownError, msg)),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// How many containers were processed.
    pub total_files: usize,
    pub elapsed: Duration,
    pub export_root: PathBuf,
}

/// A pre-run setup failure: the only fatal, run-aborting condition.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("can't find the content folder at {0}")]
    ContentRootMissing(PathBuf),

    #[error("can't prepare the export folder at {path}: {source}")]
    ExportRootUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Owns one end-to-end unpack run.
pub struct Unpacker {
    writers: WriterRegistry,
}

impl Unpacker {
    /// Create an unpacker with the standard writer set.
    pub fn new(options: &UnpackOptions) -> Self {
        Self {
            writers: WriterRegistry::standard(options),
        }
    }

    /// Create an unpacker with an explicit writer registry.
    pub fn with_registry(writers: WriterRegistry) -> Self {
        Self { writers }
    }

    /// Enumerate container files under a content root, sorted by relative
    /// path for deterministic runs. Unreadable directory entries are skipped
    /// with a warning.
    pub fn discover(content_root: &Path) -> Vec<AssetRecord> {
        let mut records = Vec::new();

        for entry in WalkDir::new(content_root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let is_container = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(CONTAINER_EXTENSION));
            if !is_container {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(content_root) else {
                continue;
            };
            let relative_path = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            records.push(AssetRecord {
                relative_path,
                container_path: entry.path().to_path_buf(),
            });
        }

        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        records
    }

    /// Unpack every container under `content_root` into `export_root`,
    /// mirroring the relative directory structure.
    ///
    /// `files` overrides discovery with an explicit list (the caller may
    /// have enumerated already, e.g. to size a progress bar).
    ///
    /// Only a pre-run setup failure returns an error; per-file failures are
    /// reported, answered with a fallback copy, and the run continues.
    pub fn run(
        &self,
        loader: &mut dyn ContentLoader,
        reporter: &mut dyn ProgressReporter,
        content_root: &Path,
        export_root: &Path,
        files: Option<Vec<AssetRecord>>,
    ) -> Result<RunSummary, StartError> {
        let timer = Instant::now();

        if !content_root.is_dir() {
            let error = StartError::ContentRootMissing(content_root.to_path_buf());
            reporter.on_start_error(&error.to_string());
            return Err(error);
        }
        if let Err(source) = fs::create_dir_all(export_root) {
            let error = StartError::ExportRootUnavailable {
                path: export_root.to_path_buf(),
                source,
            };
            reporter.on_start_error(&error.to_string());
            return Err(error);
        }

        reporter.on_step_changed(
            ProgressStep::GameFound,
            &format!("Found content folder: {}.", content_root.display()),
        );
        reporter.on_step_changed(ProgressStep::LoadingRuntime, "Preparing content loader...");

        reporter.on_step_changed(ProgressStep::Unpacking, "Unpacking files...");
        let records = files.unwrap_or_else(|| Self::discover(content_root));
        info!("unpacking {} files from {}", records.len(), content_root.display());

        for record in &records {
            reporter.on_file_unpacking(&record.relative_path);

            let outcome = self.unpack_one(loader, record, export_root);
            if let Some((reason, message)) = outcome.failure() {
                warn!("{}: {reason}: {message}", record.relative_path);
                reporter.on_file_unpack_failed(&record.relative_path, reason, message);
            }

            // release the loader's cache before the next file to bound
            // peak memory across the run
            loader.unload();
        }

        let summary = RunSummary {
            total_files: records.len(),
            elapsed: timer.elapsed(),
            export_root: export_root.to_path_buf(),
        };

        reporter.on_step_changed(
            ProgressStep::Done,
            &format!(
                "Done! Unpacked {} files in {}.\nUnpacked into {}.",
                summary.total_files,
                human_time(summary.elapsed),
                export_root.display()
            ),
        );
        reporter.on_ended(&summary);

        Ok(summary)
    }

    /// Run the per-file sub-sequence for one record: decode, dispatch,
    /// convert; export a verbatim copy on any failure.
    pub(crate) fn unpack_one(
        &self,
        loader: &mut dyn ContentLoader,
        record: &AssetRecord,
        export_root: &Path,
    ) -> UnpackOutcome {
        let stem = export_root.join(Path::new(record.asset_key()));

        if let Some(parent) = stem.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                self.export_raw(record, &stem);
                return UnpackOutcome::UnknownError(format!(
                    "can't create output folder: {err}"
                ));
            }
        }

        // decode
        let mut asset = match loader.load(record.asset_key()) {
            Ok(asset) => asset,
            Err(err) => {
                self.export_raw(record, &stem);
                return UnpackOutcome::ReadError(format!("read error: {err}"));
            }
        };

        // dispatch and convert
        match self.writers.dispatch(&asset) {
            None => {
                self.export_raw(record, &stem);
                UnpackOutcome::UnsupportedType(format!(
                    "{} isn't a supported asset type.",
                    asset.type_name()
                ))
            }
            Some(writer) => {
                let type_name = asset.type_name().to_string();
                match writer.write(&mut asset, &stem, &record.relative_path) {
                    Ok(()) => UnpackOutcome::Success,
                    Err(WriterError::Write { reason }) => {
                        self.export_raw(record, &stem);
                        UnpackOutcome::WriteError(format!(
                            "{type_name} file could not be saved: {reason}."
                        ))
                    }
                    Err(WriterError::Io(err)) => {
                        self.export_raw(record, &stem);
                        UnpackOutcome::WriteError(format!(
                            "{type_name} file could not be saved: {err}."
                        ))
                    }
                    Err(WriterError::Other(err)) => {
                        self.export_raw(record, &stem);
                        UnpackOutcome::UnknownError(format!("unhandled export error: {err:#}"))
                    }
                }
            }
        }
    }

    /// Copy the original container verbatim to the export tree, preserving
    /// its original extension. Partial converted output is not cleaned up;
    /// the copy is strictly additive.
    fn export_raw(&self, record: &AssetRecord, stem: &Path) {
        let extension = record
            .container_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(CONTAINER_EXTENSION);
        let to_path = path_with_extension(stem, extension);

        if let Err(err) = fs::copy(&record.container_path, &to_path) {
            warn!(
                "can't export raw copy of {}: {err}",
                record.relative_path
            );
        }
    }
}

/// Strip the trailing container extension, case-insensitively. Paths with
/// any other extension (including non-ASCII names where `len - 4` isn't a
/// char boundary) are returned unchanged.
fn strip_container_extension(relative_path: &str) -> &str {
    let suffix_len = CONTAINER_EXTENSION.len() + 1;
    if relative_path.len() > suffix_len
        && relative_path.is_char_boundary(relative_path.len() - suffix_len)
    {
        let (head, tail) = relative_path.split_at(relative_path.len() - suffix_len);
        if tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(CONTAINER_EXTENSION) {
            return head;
        }
    }
    relative_path
}

/// A human-readable representation of elapsed time.
fn human_time(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::with_capacity(2);
    if minutes >= 1 {
        parts.push(format!(
            "{minutes} minute{}",
            if minutes >= 2 { "s" } else { "" }
        ));
    }
    if seconds > 0 {
        parts.push(format!(
            "{seconds} second{}",
            if seconds > 1 { "s" } else { "" }
        ));
    }

    if parts.is_empty() {
        "less than a second".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{DecodedAsset, Texture, XmlSource};
    use crate::loader::LoadError;
    use crate::platform::Platform;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Serves pre-decoded assets by key; counts unload calls.
    struct MockLoader {
        assets: HashMap<String, DecodedAsset>,
        failing_keys: Vec<String>,
        unload_calls: usize,
    }

    impl MockLoader {
        fn new() -> Self {
            Self {
                assets: HashMap::new(),
                failing_keys: Vec::new(),
                unload_calls: 0,
            }
        }

        fn with_asset(mut self, key: &str, asset: DecodedAsset) -> Self {
            self.assets.insert(key.to_string(), asset);
            self
        }

        fn with_failure(mut self, key: &str) -> Self {
            self.failing_keys.push(key.to_string());
            self
        }
    }

    impl ContentLoader for MockLoader {
        fn load(&mut self, asset_key: &str) -> Result<DecodedAsset, LoadError> {
            if self.failing_keys.iter().any(|key| key == asset_key) {
                return Err(LoadError::Malformed("container is corrupt".to_string()));
            }
            self.assets
                .get(asset_key)
                .cloned()
                .ok_or_else(|| LoadError::Malformed(format!("no such asset: {asset_key}")))
        }

        fn unload(&mut self) {
            self.unload_calls += 1;
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        start_errors: Vec<String>,
        steps: Vec<ProgressStep>,
        unpacking: Vec<String>,
        failures: Vec<(String, UnpackFailedReason)>,
        ended: usize,
    }

    impl ProgressReporter for RecordingReporter {
        fn on_start_error(&mut self, error: &str) {
            self.start_errors.push(error.to_string());
        }

        fn on_step_changed(&mut self, step: ProgressStep, _message: &str) {
            self.steps.push(step);
        }

        fn on_file_unpacking(&mut self, relative_path: &str) {
            self.unpacking.push(relative_path.to_string());
        }

        fn on_file_unpack_failed(
            &mut self,
            relative_path: &str,
            reason: UnpackFailedReason,
            _message: &str,
        ) {
            self.failures.push((relative_path.to_string(), reason));
        }

        fn on_ended(&mut self, _summary: &RunSummary) {
            self.ended += 1;
        }
    }

    fn options() -> UnpackOptions {
        UnpackOptions {
            platform: Platform::Linux,
            ..UnpackOptions::default()
        }
    }

    fn texture_asset() -> DecodedAsset {
        DecodedAsset::Texture(Texture::rgba8(1, 1, vec![64, 32, 0, 128]))
    }

    /// Write a placeholder container file and return its record.
    fn seed_container(content_root: &Path, relative_path: &str) -> AssetRecord {
        let container_path = content_root.join(relative_path);
        fs::create_dir_all(container_path.parent().unwrap()).unwrap();
        fs::write(&container_path, b"XNB\x04mock").unwrap();
        AssetRecord {
            relative_path: relative_path.to_string(),
            container_path,
        }
    }

    #[test]
    fn discover_finds_containers_recursively_and_sorted() {
        let dir = TempDir::new().unwrap();
        seed_container(dir.path(), "Portraits/Abigail.xnb");
        seed_container(dir.path(), "Data/Fish.xnb");
        fs::write(dir.path().join("readme.txt"), "not a container").unwrap();

        let records = Unpacker::discover(dir.path());
        let paths: Vec<&str> = records.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["Data/Fish.xnb", "Portraits/Abigail.xnb"]);
        assert_eq!(records[0].asset_key(), "Data/Fish");
    }

    #[test]
    fn missing_content_root_is_a_start_error() {
        let dir = TempDir::new().unwrap();
        let mut loader = MockLoader::new();
        let mut reporter = RecordingReporter::default();

        let result = Unpacker::new(&options()).run(
            &mut loader,
            &mut reporter,
            &dir.path().join("nope"),
            &dir.path().join("out"),
            None,
        );

        assert!(matches!(result, Err(StartError::ContentRootMissing(_))));
        assert_eq!(reporter.start_errors.len(), 1);
        assert!(reporter.steps.is_empty());
    }

    #[test]
    fn steps_are_signalled_once_each_in_order() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();
        let mut loader = MockLoader::new();
        let mut reporter = RecordingReporter::default();

        Unpacker::new(&options())
            .run(&mut loader, &mut reporter, content.path(), export.path(), None)
            .unwrap();

        assert_eq!(
            reporter.steps,
            vec![
                ProgressStep::GameFound,
                ProgressStep::LoadingRuntime,
                ProgressStep::Unpacking,
                ProgressStep::Done,
            ]
        );
        assert_eq!(reporter.ended, 1);
    }

    #[test]
    fn converted_asset_lands_at_its_relative_stem() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();
        seed_container(content.path(), "Portraits/Abigail.xnb");

        let mut loader = MockLoader::new().with_asset("Portraits/Abigail", texture_asset());
        let mut reporter = RecordingReporter::default();

        let summary = Unpacker::new(&options())
            .run(&mut loader, &mut reporter, content.path(), export.path(), None)
            .unwrap();

        assert_eq!(summary.total_files, 1);
        assert!(reporter.failures.is_empty());
        assert!(export.path().join("Portraits/Abigail.png").exists());
        // converted successfully, so no fallback copy
        assert!(!export.path().join("Portraits/Abigail.xnb").exists());
    }

    #[test]
    fn unsupported_type_exports_verbatim_copy_and_continues() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();
        seed_container(content.path(), "Effects/Wavy.xnb");
        seed_container(content.path(), "Portraits/Abigail.xnb");

        let mut loader = MockLoader::new()
            .with_asset(
                "Effects/Wavy",
                DecodedAsset::Other {
                    type_name: "Effect".to_string(),
                },
            )
            .with_asset("Portraits/Abigail", texture_asset());
        let mut reporter = RecordingReporter::default();

        Unpacker::new(&options())
            .run(&mut loader, &mut reporter, content.path(), export.path(), None)
            .unwrap();

        assert_eq!(reporter.failures.len(), 1);
        assert_eq!(
            reporter.failures[0],
            (
                "Effects/Wavy.xnb".to_string(),
                UnpackFailedReason::UnsupportedFileType
            )
        );
        // verbatim copy with the original extension at the mapped stem
        let copy = export.path().join("Effects/Wavy.xnb");
        assert_eq!(fs::read(copy).unwrap(), b"XNB\x04mock");
        // the run continued past the failure
        assert!(export.path().join("Portraits/Abigail.png").exists());
    }

    #[test]
    fn one_decode_failure_among_ten_doesnt_abort_the_run() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();

        let mut loader = MockLoader::new().with_failure("Data/File3");
        for i in 0..10 {
            let relative = format!("Data/File{i}.xnb");
            seed_container(content.path(), &relative);
            if i != 3 {
                loader = loader.with_asset(
                    &format!("Data/File{i}"),
                    DecodedAsset::Data(serde_json::json!({"index": i})),
                );
            }
        }
        let mut reporter = RecordingReporter::default();

        let summary = Unpacker::new(&options())
            .run(&mut loader, &mut reporter, content.path(), export.path(), None)
            .unwrap();

        assert_eq!(summary.total_files, 10);
        assert_eq!(reporter.unpacking.len(), 10);
        assert_eq!(reporter.failures.len(), 1);
        assert_eq!(
            reporter.failures[0],
            ("Data/File3.xnb".to_string(), UnpackFailedReason::ReadError)
        );

        // the failed file still produced its fallback output
        assert!(export.path().join("Data/File3.xnb").exists());
        for i in [0usize, 1, 2, 4, 5, 6, 7, 8, 9] {
            assert!(export.path().join(format!("Data/File{i}.json")).exists());
        }
    }

    #[test]
    fn loader_cache_is_released_after_every_file() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();
        seed_container(content.path(), "Data/Good.xnb");
        seed_container(content.path(), "Data/Bad.xnb");

        let mut loader = MockLoader::new()
            .with_asset("Data/Good", DecodedAsset::Data(serde_json::json!([1])))
            .with_failure("Data/Bad");
        let mut reporter = RecordingReporter::default();

        Unpacker::new(&options())
            .run(&mut loader, &mut reporter, content.path(), export.path(), None)
            .unwrap();

        // unload after success and after failure alike
        assert_eq!(loader.unload_calls, 2);
    }

    #[test]
    fn every_record_yields_one_outcome_and_one_artifact() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();
        let unpacker = Unpacker::new(&options());

        let cases = vec![
            ("Portraits/Abigail.xnb", Some(texture_asset())),
            (
                "Data/Fish.xnb",
                Some(DecodedAsset::Data(serde_json::json!({"128": "Pufferfish"}))),
            ),
            (
                "Fonts/SmallFont.xnb",
                Some(DecodedAsset::XmlSource(XmlSource {
                    source: "<font/>".to_string(),
                })),
            ),
            ("Effects/Wavy.xnb", None), // decode failure
        ];

        let mut loader = MockLoader::new();
        let mut records = Vec::new();
        for (relative, asset) in cases {
            let record = seed_container(content.path(), relative);
            match asset {
                Some(asset) => loader = loader.with_asset(record.asset_key(), asset),
                None => loader = loader.with_failure(record.asset_key()),
            }
            records.push(record);
        }

        for record in &records {
            let outcome = unpacker.unpack_one(&mut loader, record, export.path());

            // exactly one outcome per record, and at least one artifact at
            // the mapped stem (converted output, fallback copy, or both)
            let stem = export.path().join(record.asset_key());
            let parent = stem.parent().unwrap();
            let file_name = stem.file_name().unwrap().to_string_lossy().to_string();
            let artifacts = fs::read_dir(parent)
                .unwrap()
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_string_lossy()
                        .starts_with(&format!("{file_name}."))
                })
                .count();
            assert!(
                artifacts >= 1,
                "{} produced no output ({outcome:?})",
                record.relative_path
            );
        }
    }

    #[test]
    fn writer_failure_reports_write_error_and_exports_copy() {
        let content = TempDir::new().unwrap();
        let export = TempDir::new().unwrap();
        let record = seed_container(content.path(), "Fonts/Broken.xnb");

        // font with a mismatched platform layout: the Linux strategy can't
        // find its parallel arrays
        let font = crate::asset::SpriteFont {
            texture: Texture::rgba8(1, 1, vec![0, 0, 0, 255]),
            line_spacing: 20,
            spacing: 0.0,
            default_character: None,
            characters: vec![],
            glyphs: crate::asset::GlyphData::Table(vec![]),
        };
        let mut loader =
            MockLoader::new().with_asset("Fonts/Broken", DecodedAsset::SpriteFont(font));

        let outcome =
            Unpacker::new(&options()).unpack_one(&mut loader, &record, export.path());

        assert!(matches!(outcome, UnpackOutcome::WriteError(_)));
        assert!(export.path().join("Fonts/Broken.xnb").exists());
    }

    #[test]
    fn human_time_formats_minutes_and_seconds() {
        assert_eq!(human_time(Duration::from_millis(300)), "less than a second");
        assert_eq!(human_time(Duration::from_secs(1)), "1 second");
        assert_eq!(human_time(Duration::from_secs(61)), "1 minute 1 second");
        assert_eq!(human_time(Duration::from_secs(150)), "2 minutes 30 seconds");
    }

    #[test]
    fn strip_container_extension_is_case_insensitive() {
        assert_eq!(strip_container_extension("Data/Fish.xnb"), "Data/Fish");
        assert_eq!(strip_container_extension("Data/Fish.XNB"), "Data/Fish");
        assert_eq!(strip_container_extension("Data/Fish.png"), "Data/Fish.png");
    }

    #[test]
    fn asset_key_handles_non_ascii_names_without_an_extension() {
        // caller-supplied records aren't guaranteed to end in the container
        // extension; multibyte names must come back unchanged, not panic
        let record = AssetRecord {
            relative_path: "日本".to_string(),
            container_path: PathBuf::from("/content/日本"),
        };
        assert_eq!(record.asset_key(), "日本");
        assert_eq!(strip_container_extension("Data/魚.xnb"), "Data/魚");
    }
}
