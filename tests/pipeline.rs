//! End-to-end pipeline tests with a scripted transcription bridge.
//!
//! The vision model is the only unfakeable dependency, so it is replaced
//! with [`ScriptedBridge`], which records every context string it receives
//! and returns deterministic per-page Markdown. Everything else — policy,
//! sidecar, templates, image moves — runs for real on a temp filesystem.

use async_trait::async_trait;
use note2md::extract::ImageExtractor;
use note2md::{
    convert_directory, convert_file, hash, metadata, Config, ConvertOptions, Note2MdError,
    Notebook, TranscriptionBridge,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Extractor that fabricates `pages` fake PNGs per input. The pipeline
/// never decodes page images, so plain bytes suffice.
struct FakeExtractor {
    pages: usize,
}

#[async_trait]
impl ImageExtractor for FakeExtractor {
    async fn extract_images(
        &self,
        input: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, Note2MdError> {
        let basename = input
            .file_stem()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let mut paths = Vec::new();
        for i in 0..self.pages {
            let path = scratch.join(format!("{basename}_{i}.png"));
            std::fs::write(&path, format!("png-bytes-{i}")).unwrap();
            paths.push(path);
        }
        Ok(paths)
    }

    fn read_notebook(&self, _input: &Path) -> Result<Option<Notebook>, Note2MdError> {
        Ok(None)
    }
}

/// Bridge that returns fixed page text and records the context it was given.
struct ScriptedBridge {
    contexts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedBridge {
    fn new() -> Self {
        ScriptedBridge {
            contexts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }

    fn page_text(n: usize) -> String {
        format!("## Page {n}\n\nThe quick brown fox number {n} jumps over the lazy dog again.")
    }
}

#[async_trait]
impl TranscriptionBridge for ScriptedBridge {
    async fn transcribe_page(&self, _image: &Path, context: &str) -> Result<String, Note2MdError> {
        self.contexts.lock().unwrap().push(context.to_string());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::page_text(n))
    }

    async fn transcribe_title(&self, _png: &[u8]) -> Result<String, Note2MdError> {
        Ok("A Title".into())
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    // Minimal body template keeps assertions focused.
    config.template = "{{ markdown }}\n{% for i in images %}![{{ i.name }}]({{ i.rel_path }})\n{% endfor %}".into();
    config
}

struct World {
    _dir: tempfile::TempDir,
    root: PathBuf,
    output_root: PathBuf,
}

impl World {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let output_root = root.join("supernote");
        World {
            _dir: dir,
            root,
            output_root,
        }
    }

    fn write_input(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

async fn convert(
    world: &World,
    input: &Path,
    pages: usize,
    config: &Config,
    force: bool,
) -> Result<PathBuf, Note2MdError> {
    convert_file(
        &FakeExtractor { pages },
        &ScriptedBridge::new(),
        input,
        &world.output_root,
        config,
        &ConvertOptions {
            force,
            progress: None,
        },
    )
    .await
}

#[tokio::test]
async fn first_run_writes_document_and_sidecar_with_live_hashes() {
    let world = World::new();
    let input = world.write_input("meeting.note", b"stroke bytes v1");
    let config = test_config();

    let output = convert(&world, &input, 2, &config, false).await.unwrap();

    assert_eq!(output, world.output_root.join("meeting/meeting.md"));
    let body = std::fs::read_to_string(&output).unwrap();
    assert!(body.contains("## Page 0"));
    assert!(body.contains("![meeting_0.png](meeting_0.png)"));

    let record = metadata::read(output.parent().unwrap()).unwrap().unwrap();
    assert_eq!(record.input_file, input);
    assert_eq!(record.output_file, output);
    assert_eq!(record.input_hash, hash::hash_file(&input).unwrap());
    assert_eq!(record.output_hash, hash::hash_file(&output).unwrap());
}

#[tokio::test]
async fn rerun_on_unchanged_input_is_refused() {
    let world = World::new();
    let input = world.write_input("meeting.note", b"stroke bytes v1");
    let config = test_config();

    convert(&world, &input, 1, &config, false).await.unwrap();
    let err = convert(&world, &input, 1, &config, false).await.unwrap_err();
    assert!(matches!(err, Note2MdError::InputUnchanged { .. }));
    assert!(err.is_refusal());
}

#[tokio::test]
async fn force_reconverts_unchanged_input() {
    let world = World::new();
    let input = world.write_input("meeting.note", b"stroke bytes v1");
    let config = test_config();

    let first = convert(&world, &input, 1, &config, false).await.unwrap();
    let second = convert(&world, &input, 1, &config, true).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn edited_output_is_protected_until_forced() {
    let world = World::new();
    let input = world.write_input("meeting.note", b"stroke bytes v1");
    let config = test_config();

    let output = convert(&world, &input, 1, &config, false).await.unwrap();

    // Input changes AND someone hand-edited the generated document.
    std::fs::write(&input, b"stroke bytes v2").unwrap();
    std::fs::write(&output, "my precious hand edits").unwrap();

    let err = convert(&world, &input, 1, &config, false).await.unwrap_err();
    assert!(matches!(err, Note2MdError::OutputTampered { .. }));
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "my precious hand edits"
    );

    // Force discards the edits and records fresh hashes.
    convert(&world, &input, 1, &config, true).await.unwrap();
    let body = std::fs::read_to_string(&output).unwrap();
    assert!(body.contains("## Page 0"));
    let record = metadata::read(output.parent().unwrap()).unwrap().unwrap();
    assert_eq!(record.output_hash, hash::hash_file(&output).unwrap());
}

#[tokio::test]
async fn changed_input_with_pristine_output_reconverts() {
    let world = World::new();
    let input = world.write_input("meeting.note", b"stroke bytes v1");
    let config = test_config();

    convert(&world, &input, 1, &config, false).await.unwrap();
    std::fs::write(&input, b"stroke bytes v2").unwrap();
    convert(&world, &input, 1, &config, false).await.unwrap();

    let record = metadata::read(world.output_root.join("meeting").as_path())
        .unwrap()
        .unwrap();
    assert_eq!(record.input_hash, hash::hash_bytes(b"stroke bytes v2"));
}

#[tokio::test]
async fn context_chains_the_last_fifty_chars_page_to_page() {
    let world = World::new();
    let input = world.write_input("chain.note", b"strokes");
    let config = test_config();
    let bridge = ScriptedBridge::new();

    convert_file(
        &FakeExtractor { pages: 3 },
        &bridge,
        &input,
        &world.output_root,
        &config,
        &ConvertOptions::default(),
    )
    .await
    .unwrap();

    let contexts = bridge.contexts();
    assert_eq!(contexts.len(), 3);
    assert_eq!(contexts[0], "", "first page sees empty context");

    let p0 = ScriptedBridge::page_text(0);
    let expected1: String = {
        let chars: Vec<char> = p0.chars().collect();
        chars[chars.len() - 50..].iter().collect()
    };
    assert_eq!(contexts[1], expected1);

    let accumulated = format!("{}\n{}", p0, ScriptedBridge::page_text(1));
    let expected2: String = {
        let chars: Vec<char> = accumulated.chars().collect();
        chars[chars.len() - 50..].iter().collect()
    };
    assert_eq!(contexts[2], expected2);
}

#[tokio::test]
async fn images_land_next_to_document_and_scratch_is_gone() {
    let world = World::new();
    let input = world.write_input("draw.note", b"strokes");
    let config = test_config();

    let output = convert(&world, &input, 3, &config, false).await.unwrap();
    let output_dir = output.parent().unwrap();

    for i in 0..3 {
        let img = output_dir.join(format!("draw_{i}.png"));
        assert!(img.exists(), "missing {}", img.display());
        assert_eq!(
            std::fs::read(&img).unwrap(),
            format!("png-bytes-{i}").into_bytes()
        );
    }

    // No scratch directory droppings anywhere under the output root.
    for entry in walkdir::WalkDir::new(&world.output_root) {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy();
        assert!(
            !name.starts_with(".note2md-"),
            "scratch left behind: {}",
            entry.path().display()
        );
    }
}

#[tokio::test]
async fn nested_output_path_template_resolves_consistently() {
    let world = World::new();
    let input = world.write_input("nested.note", b"strokes");
    let mut config = test_config();
    config.output_path_template = "{{ year }}/{{ month }}/{{ file_basename }}".into();

    let output = convert(&world, &input, 1, &config, false).await.unwrap();
    let year = chrono::Local::now().format("%Y").to_string();
    assert!(
        output.starts_with(world.output_root.join(&year)),
        "got {}",
        output.display()
    );

    // The policy re-resolves the same nested path: a rerun refuses rather
    // than converting into a fresh directory.
    let err = convert(&world, &input, 1, &config, false).await.unwrap_err();
    assert!(matches!(err, Note2MdError::InputUnchanged { .. }));
}

#[tokio::test]
async fn custom_filename_template_is_used() {
    let world = World::new();
    let input = world.write_input("named.note", b"strokes");
    let mut config = test_config();
    config.output_filename_template = "{{ file_basename }}-notes.md".into();

    let output = convert(&world, &input, 1, &config, false).await.unwrap();
    assert_eq!(output.file_name().unwrap(), "named-notes.md");
}

#[tokio::test]
async fn directory_mode_converts_new_and_skips_unchanged() {
    let world = World::new();
    let notes = world.root.join("notes");
    std::fs::create_dir(&notes).unwrap();
    std::fs::write(notes.join("a.png"), b"png a").unwrap();
    std::fs::write(notes.join("b.png"), b"png b").unwrap();
    std::fs::write(notes.join("ignore.txt"), b"not convertible").unwrap();

    let config = test_config();
    let bridge = ScriptedBridge::new();
    let options = ConvertOptions::default();

    let first = convert_directory(&bridge, &notes, &world.output_root, &config, &options)
        .await
        .unwrap();
    assert_eq!(first.len(), 2, "both PNGs converted, txt ignored");

    // Second sweep: nothing changed, nothing converted, no error.
    let second = convert_directory(&bridge, &notes, &world.output_root, &config, &options)
        .await
        .unwrap();
    assert!(second.is_empty());

    // Touch one input; only it reconverts.
    std::fs::write(notes.join("a.png"), b"png a v2").unwrap();
    let third = convert_directory(&bridge, &notes, &world.output_root, &config, &options)
        .await
        .unwrap();
    assert_eq!(third.len(), 1);
    assert!(third[0].ends_with("a/a.md"));
}

#[tokio::test]
async fn directory_mode_skips_hand_edited_outputs() {
    let world = World::new();
    let notes = world.root.join("notes");
    std::fs::create_dir(&notes).unwrap();
    std::fs::write(notes.join("a.png"), b"png a").unwrap();

    let config = test_config();
    let bridge = ScriptedBridge::new();
    let options = ConvertOptions::default();

    let first = convert_directory(&bridge, &notes, &world.output_root, &config, &options)
        .await
        .unwrap();
    std::fs::write(notes.join("a.png"), b"png a v2").unwrap();
    std::fs::write(&first[0], "hand edited").unwrap();

    let second = convert_directory(&bridge, &notes, &world.output_root, &config, &options)
        .await
        .unwrap();
    assert!(second.is_empty(), "tampered output skipped, batch continues");
    assert_eq!(std::fs::read_to_string(&first[0]).unwrap(), "hand edited");
}

#[tokio::test]
async fn missing_input_file_is_reported() {
    let world = World::new();
    let config = test_config();
    let err = convert(&world, &world.root.join("ghost.note"), 1, &config, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Note2MdError::FileNotFound { .. }));
}
