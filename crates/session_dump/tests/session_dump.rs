use std::fs;

use session_dump::{
    generate_dump_path, load_dump, render_dump, write_dump, DumpFormat, DumpItem, DumpTurn,
    SessionDump,
};
use tempfile::tempdir;

fn sample_dump() -> SessionDump {
    SessionDump {
        session_id: Some("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".to_string()),
        model: Some("gemini-flash".to_string()),
        stack: vec![
            DumpItem::File {
                path: "/work/notes.txt".to_string(),
                body: Some(b"file body\nwith lines\n".to_vec()),
            },
            DumpItem::Capture {
                command: "ls -la /work".to_string(),
                output: "total 0\n".to_string(),
            },
        ],
        convo: vec![
            DumpTurn {
                role: "user".to_string(),
                text: "hello <there> & welcome".to_string(),
            },
            DumpTurn {
                role: "assistant".to_string(),
                text: "hi".to_string(),
            },
        ],
        prompt: Some("You are Synergy.".to_string()),
    }
}

#[test]
fn v2_roundtrip_reproduces_the_session() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("session.xml");

    let original = sample_dump();
    write_dump(&original, &path).expect("dump writes");

    let (loaded, format) = load_dump(&path).expect("dump loads");
    assert_eq!(format, DumpFormat::V2);
    assert_eq!(loaded, original);
}

#[test]
fn v2_document_base64_encodes_every_text_body() {
    let rendered = render_dump(&sample_dump());

    assert!(rendered.starts_with("<dump session=\"aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee\">"));
    assert!(rendered.contains("<model>gemini-flash</model>"));
    assert!(rendered.contains("encoding=\"base64\""));
    // Raw turn text must not appear; only its encoding does.
    assert!(!rendered.contains("hello <there>"));
    assert!(!rendered.contains("You are Synergy."));
    // LF endings only.
    assert!(!rendered.contains('\r'));
}

#[test]
fn v1_document_loads_without_session_identity() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("legacy.xml");
    fs::write(
        &path,
        "<dump>\n  <stack>\n    <file path=\"/old/a.txt\"/>\n    <file path=\"/old/b.txt\"/>\n  </stack>\n  <convo>\n    <elem role=\"user\">plain question</elem>\n    <elem role=\"assistant\">plain answer</elem>\n  </convo>\n  <prompt>legacy prompt</prompt>\n</dump>\n",
    )
    .expect("seed legacy dump");

    let (loaded, format) = load_dump(&path).expect("legacy dump loads");
    assert_eq!(format, DumpFormat::V1);
    assert_eq!(loaded.session_id, None);
    assert_eq!(loaded.model, None);
    assert_eq!(loaded.stack.len(), 2);
    assert_eq!(
        loaded.stack[0],
        DumpItem::File {
            path: "/old/a.txt".to_string(),
            body: None,
        }
    );
    assert_eq!(loaded.convo[0].text, "plain question");
    assert_eq!(loaded.prompt.as_deref(), Some("legacy prompt"));
}

#[test]
fn malformed_document_is_a_load_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("broken.xml");
    fs::write(&path, "<dump><stack>").expect("seed broken dump");

    let error = load_dump(&path).expect_err("malformed dump must fail");
    assert!(error.to_string().contains("malformed dump XML"));
}

#[test]
fn wrong_root_element_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("not_a_dump.xml");
    fs::write(&path, "<session/>").expect("seed file");

    let error = load_dump(&path).expect_err("wrong root must fail");
    assert!(error.to_string().contains("no <dump> root element"));
}

#[test]
fn generated_path_lands_under_etc_dumps() {
    let dir = tempdir().expect("tempdir");
    let path = generate_dump_path(dir.path(), "0000-1111");

    assert!(path.starts_with(dir.path().join("etc").join("dumps")));
    let name = path.file_name().expect("file name").to_string_lossy();
    assert!(name.starts_with("dump-0000-1111-"));
    assert!(name.ends_with(".xml"));
}

#[test]
fn capture_entries_survive_binaryish_output() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("capture.xml");

    let dump = SessionDump {
        session_id: Some("s".to_string()),
        stack: vec![DumpItem::Capture {
            command: "grep -r \"x\" .".to_string(),
            output: "a\u{0}b\nweird\t bytes".to_string(),
        }],
        ..SessionDump::default()
    };
    write_dump(&dump, &path).expect("dump writes");

    let (loaded, _) = load_dump(&path).expect("dump loads");
    assert_eq!(loaded.stack, dump.stack);
}
