//! Loading and exercising YAML pair templates from disk.

use std::path::PathBuf;

use pairsync_core::{Document, PairTemplate, Row, TemplateError};
use pairsync_template::{DeclarativeTemplate, RenderError, CHANGED_MARK};
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

const RACE_PAIR: &str = r#"
viewer_path: "/race/{{ row.Election | slugify }}/{{ row.Race | slugify }}"
recorder_path: "/race/{{ row.Election | slugify }}/{{ row.Race | slugify }}/recorder"
viewer:
  subject: "{{ row.Race }}"
  path: "{{ viewer_path }}"
  description: "Candidate conversation for {{ row.Race }}"
  component:
    component: CcWrapper
    participants: []
    seats: 2
recorder:
  subject: "{{ row.Race }} candidate recorder"
  path: "{{ recorder_path }}"
  component:
    component: CandidateRecorder
viewer_overrides:
  bp.duplicates: "{{ occurrences }}"
recorder_overrides:
  component.viewer: "{{ viewer._id }}"
  component.viewerPath: "{{ viewer.path }}"
row_updates:
  Viewer Link: "https://vote.example.org{{ viewer.path }}"
  Recorder Link: "https://vote.example.org{{ recorder.path }}"
changed_column: Changed
"#;

fn write_template(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("race-pair.yaml");
    std::fs::write(&path, contents).expect("write template");
    path
}

fn row(election: &str, race: &str) -> Row {
    [("Election", election), ("Race", race)].into_iter().collect()
}

#[test]
fn full_pair_cycle_from_file() {
    let dir = TempDir::new().expect("tempdir");
    let mut template =
        DeclarativeTemplate::load(&write_template(&dir, RACE_PAIR)).expect("load template");
    let rows = vec![row("2026 General", "City Council"), row("2026 General", "Mayor")];
    template.setup(&rows).expect("setup");

    let r = &rows[0];
    let mut viewer = template.viewer(r).expect("viewer body");
    template.overwrite_viewer_info(&mut viewer, r).expect("viewer hook");
    viewer.insert("_id".into(), json!("v-100"));
    assert_eq!(viewer["path"], json!("/race/2026-general/city-council"));
    assert_eq!(viewer["component"]["seats"], json!(2));
    assert_eq!(viewer["bp"]["duplicates"], json!("1"));

    let mut recorder = template.recorder(r).expect("recorder body");
    template
        .overwrite_recorder_info(&mut recorder, &viewer, r)
        .expect("recorder hook");
    assert_eq!(recorder["component"]["component"], json!("CandidateRecorder"));
    assert_eq!(recorder["component"]["viewer"], json!("v-100"));

    let mut out = r.clone();
    template
        .update_properties(&mut out, &viewer, &recorder)
        .expect("update row");
    assert_eq!(
        out.get("Viewer Link"),
        Some("https://vote.example.org/race/2026-general/city-council")
    );
    assert_eq!(
        out.get("Recorder Link"),
        Some("https://vote.example.org/race/2026-general/city-council/recorder")
    );
    assert_eq!(out.get("Changed"), Some(""));
    assert_ne!(out.get("Changed"), Some(CHANGED_MARK));
}

#[test]
fn missing_required_key_reports_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_template(&dir, "viewer_path: /a\nviewer: {}\nrecorder: {}\n");
    let err = DeclarativeTemplate::load(&path).unwrap_err();
    assert!(matches!(err, RenderError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("race-pair.yaml"), "must contain file path, got: {msg}");
    assert!(msg.contains("recorder_path"), "must name the missing key, got: {msg}");
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = DeclarativeTemplate::load(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, RenderError::Io { .. }), "got: {err}");
}

#[rstest]
#[case::unknown_column("{{ row.Nope }}")]
#[case::viewer_before_resolved("{{ viewer._id }}")]
#[case::bad_filter("{{ row.Race | no_such_filter }}")]
fn render_failures_surface_as_template_errors(#[case] subject: &str) {
    let yaml = format!(
        "viewer_path: /a\nrecorder_path: /a/r\nviewer:\n  subject: \"{subject}\"\nrecorder: {{}}\n"
    );
    let dir = TempDir::new().expect("tempdir");
    let path = write_template(&dir, &yaml);
    let outcome = DeclarativeTemplate::load(&path)
        .map_err(TemplateError::from)
        .and_then(|t| t.viewer(&row("2026", "Mayor")).map(|_: Document| ()));
    match outcome {
        Err(TemplateError::Render { name, .. }) => {
            assert!(name.starts_with("viewer"), "name: {name}")
        }
        other => panic!("expected render error, got {other:?}"),
    }
}

#[test]
fn rendering_handles_many_string_shapes() {
    let samples = [
        "",
        "simple",
        "emoji-rocket-🚀",
        "quotes-'\"`",
        "braces-{}[]()",
        "arabic-مرحبا",
        "japanese-日本語",
        "math-<= >= !=",
    ];
    let dir = TempDir::new().expect("tempdir");
    let template =
        DeclarativeTemplate::load(&write_template(&dir, RACE_PAIR)).expect("load template");
    for race in samples {
        let viewer = template
            .viewer(&row("2026", race))
            .unwrap_or_else(|e| panic!("render failed for {race:?}: {e}"));
        assert_eq!(viewer["subject"], json!(race), "subject must be copied verbatim");
        let path = viewer["path"].as_str().expect("path is a string");
        assert!(path.starts_with("/race/2026"), "path: {path}");
    }
}
