mod common;

use common::{page, ScriptedFetcher};
use jtv::paginator::{LoadMode, PaginationCursor};
use jtv::persistence::{FileStatePort, StatePort, STATE_FILE};
use jtv::{load, TabCollection, TableEvent};
use tempfile::TempDir;

#[test]
fn tab_layout_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let port = FileStatePort::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::pages(vec![page(0, 2)]);

    let mut tabs = TabCollection::new(PaginationCursor::with_limit(2));
    let second = tabs.add_tab();
    {
        let tab = tabs.active_mut();
        tab.update(TableEvent::EndpointChanged("http://localhost/api/users".to_string()));
        tab.update(TableEvent::Renamed("Users".to_string()));
        load(tab, LoadMode::Single, &fetcher, Some("secret-token")).unwrap();
        tab.update(TableEvent::VisibilityChanged {
            column: "id".to_string(),
            visible: false,
        });
    }
    port.save(&tabs.snapshot()).unwrap();

    let snapshot = port.load().unwrap().expect("snapshot saved");
    let restored = TabCollection::from_snapshot(snapshot, PaginationCursor::default());

    assert_eq!(restored.len(), 2);
    assert_eq!(restored.active().id, second);
    let tab = restored.active();
    assert_eq!(tab.title, "Users");
    assert_eq!(tab.endpoint, "http://localhost/api/users");
    assert_eq!(tab.cursor.offset, 2);
    assert_eq!(tab.cursor.limit, 2);
    assert_eq!(tab.column_settings.hidden_columns(), vec!["id"]);
    assert_eq!(tab.column_settings.visible_columns(), vec!["user.name"]);
    // Rows are not persisted
    assert!(tab.rows.is_empty());
}

#[test]
fn saved_file_holds_no_rows_or_tokens() {
    let dir = TempDir::new().unwrap();
    let port = FileStatePort::with_dir(dir.path().to_path_buf());
    let fetcher = ScriptedFetcher::pages(vec![page(0, 1)]);

    let mut tabs = TabCollection::new(PaginationCursor::default());
    let tab = tabs.active_mut();
    tab.update(TableEvent::EndpointChanged("http://localhost/api".to_string()));
    load(tab, LoadMode::Single, &fetcher, Some("secret-token")).unwrap();
    port.save(&tabs.snapshot()).unwrap();

    let content = std::fs::read_to_string(dir.path().join(STATE_FILE)).unwrap();
    assert!(!content.contains("secret-token"));
    assert!(!content.contains("user0"));
    assert!(content.contains("http://localhost/api"));
}

#[test]
fn nothing_saved_yet() {
    let dir = TempDir::new().unwrap();
    let port = FileStatePort::with_dir(dir.path().join("never-created"));
    assert!(port.load().unwrap().is_none());
}
