use glasspane::dock::PanelCorner;
use glasspane::ide::build_open_uri;
use glasspane::settings::InspectorSettings;
use glasspane::store::{JsonFileStore, KvStore, KEY_CORNER, KEY_ENABLED};

#[test]
fn store_survives_a_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.json");

    {
        let store = JsonFileStore::load(&path).expect("load empty");
        store.set(KEY_CORNER, PanelCorner::TopRight.as_str());
        store.set_bool(KEY_ENABLED, true);
    }

    let store = JsonFileStore::load(&path).expect("reload");
    assert_eq!(
        store.get(KEY_CORNER).as_deref().and_then(PanelCorner::parse),
        Some(PanelCorner::TopRight)
    );
    assert_eq!(store.get_bool(KEY_ENABLED), Some(true));
}

#[test]
fn store_tolerates_a_missing_parent_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("store.json");

    let store = JsonFileStore::load(&path).expect("load");
    store.set(KEY_CORNER, "bottom-left");

    let store = JsonFileStore::load(&path).expect("reload");
    assert_eq!(store.get(KEY_CORNER).as_deref(), Some("bottom-left"));
}

#[test]
fn corrupt_store_file_is_an_error_not_a_panic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    std::fs::write(&path, "not json {{{").expect("write");
    assert!(JsonFileStore::load(&path).is_err());
}

#[test]
fn settings_round_trip_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");
    let path_str = path.to_str().expect("utf8 path");

    let mut settings = InspectorSettings::default();
    settings.editor_scheme = "vscode".to_string();
    settings.default_corner = PanelCorner::TopLeft;
    settings.save(path_str).expect("save");

    let loaded = InspectorSettings::load(path_str).expect("load");
    assert_eq!(loaded.editor_scheme, "vscode");
    assert_eq!(loaded.default_corner, PanelCorner::TopLeft);
    assert_eq!(loaded.marker_attribute, settings.marker_attribute);
}

#[test]
fn missing_settings_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let loaded = InspectorSettings::load(path.to_str().expect("utf8 path")).expect("load");
    assert_eq!(loaded.highlight_duration_ms, 750);
}

#[test]
fn open_uri_escapes_path_and_carries_line() {
    assert_eq!(
        build_open_uri("vscode", "src/app dir/main.rs", Some("42")),
        "vscode://open?file=src%2Fapp%20dir%2Fmain.rs&line=42"
    );
    assert_eq!(
        build_open_uri("glasspane", "lib.rs", None),
        "glasspane://open?file=lib.rs"
    );
}
