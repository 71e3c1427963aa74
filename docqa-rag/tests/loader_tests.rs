//! Filesystem loader tests.

use std::fs;

use docqa_rag::document::{FILE_TYPE_KEY, SOURCE_KEY};
use docqa_rag::loader::{DocumentLoader, FileKind, SourceLoader, SourceLocation, discover_files};
use docqa_rag::RagError;

#[test]
fn discovery_is_recursive_sorted_and_skips_hidden() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::create_dir_all(root.join(".cache")).unwrap();

    fs::write(root.join("b.txt"), "b").unwrap();
    fs::write(root.join("nested/a.md"), "a").unwrap();
    fs::write(root.join("nested/c.pdf"), "not really a pdf").unwrap();
    fs::write(root.join(".hidden.txt"), "hidden").unwrap();
    fs::write(root.join(".cache/d.txt"), "cached").unwrap();

    let text = discover_files(root, &[FileKind::Text, FileKind::Markdown]).unwrap();
    assert_eq!(text, vec![root.join("b.txt"), root.join("nested/a.md")]);

    let pdfs = discover_files(root, &[FileKind::Pdf]).unwrap();
    assert_eq!(pdfs, vec![root.join("nested/c.pdf")]);
}

#[test]
fn discovering_a_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("a.txt");
    fs::write(&file, "a").unwrap();
    assert!(matches!(discover_files(&file, &FileKind::ALL), Err(RagError::IngestionError { .. })));
}

#[tokio::test]
async fn text_files_carry_source_and_file_type() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("notes.md");
    fs::write(&path, "# Title\n\nBody text.").unwrap();

    let loader = SourceLoader::new().unwrap();
    let documents = loader.load(&SourceLocation::File(path.clone())).await.unwrap();
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.text, "# Title\n\nBody text.");
    assert_eq!(document.metadata[SOURCE_KEY], path.display().to_string());
    assert_eq!(document.metadata[FILE_TYPE_KEY], "md");
    assert!(document.validate().is_ok());
}

#[tokio::test]
async fn loading_the_same_file_twice_gives_the_same_id() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("a.txt");
    fs::write(&path, "stable").unwrap();

    let loader = SourceLoader::new().unwrap();
    let first = loader.load(&SourceLocation::File(path.clone())).await.unwrap();
    let second = loader.load(&SourceLocation::File(path)).await.unwrap();
    assert_eq!(first[0].id, second[0].id);
}

#[tokio::test]
async fn expand_turns_directories_into_files() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join("b.txt"), "b").unwrap();

    let loader = SourceLoader::new().unwrap();
    let expanded = loader.expand(&SourceLocation::text_dir(temp.path())).unwrap();
    assert_eq!(
        expanded,
        vec![
            SourceLocation::File(temp.path().join("a.txt")),
            SourceLocation::File(temp.path().join("b.txt")),
        ]
    );

    let documents = loader.load(&SourceLocation::text_dir(temp.path())).await.unwrap();
    assert_eq!(documents.len(), 2);
}

#[tokio::test]
async fn unreadable_sources_are_ingestion_errors() {
    let temp = tempfile::tempdir().unwrap();
    let loader = SourceLoader::new().unwrap();

    let missing = loader.load(&SourceLocation::File(temp.path().join("missing.txt"))).await;
    assert!(matches!(missing, Err(RagError::IngestionError { .. })));

    let binary = temp.path().join("binary.txt");
    fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();
    let err = loader.load(&SourceLocation::File(binary.clone())).await.unwrap_err();
    match err {
        RagError::IngestionError { location, .. } => {
            assert_eq!(location, binary.display().to_string())
        }
        other => panic!("unexpected error: {other}"),
    }

    let unsupported = temp.path().join("slides.pptx");
    fs::write(&unsupported, "x").unwrap();
    let err = loader.load(&SourceLocation::File(unsupported)).await.unwrap_err();
    assert_eq!(err.kind(), "ingestion");
}
