use hexvault::app::{App, EditSession};
use hexvault::store::{ChunkedStore, FileRecord, MemoryStore};

fn app_with(data: &[u8]) -> App<MemoryStore> {
    let mut app = App::new(ChunkedStore::new(MemoryStore::new()));
    app.load_bytes(
        FileRecord::new("sample.bin", data.len(), "application/octet-stream"),
        data.to_vec(),
    );
    app
}

#[test]
fn edit_save_and_reload() {
    let mut app = app_with(b"..A.");
    assert_eq!(app.status(), Some("sample.bin (4 bytes)"));

    app.enter_edit_mode(2);
    assert_eq!(app.edit_session().pending(), Some("41"));

    app.backspace();
    app.backspace();
    app.append_hex_digit('4');
    app.append_hex_digit('2');
    app.commit();

    assert_eq!(app.buffer().data(), b"..B.");
    assert_eq!(app.active(), 3);
    assert_eq!(*app.edit_session(), EditSession::Idle);
    assert!(app.is_modified());

    app.save();
    assert_eq!(app.status(), Some("File saved: sample.bin"));
    assert!(!app.is_modified());

    let kv = app.store().kv().clone();
    let mut other = App::new(ChunkedStore::new(kv));
    other.execute_command("load sample.bin");
    assert_eq!(other.buffer().data(), b"..B.");
    assert_eq!(other.filename(), Some("sample.bin"));
}

#[test]
fn commit_on_last_byte_keeps_active_in_range() {
    let mut app = app_with(&[0x00, 0x01]);
    app.enter_edit_mode(1);
    app.backspace();
    app.backspace();
    app.append_hex_digit('f');
    app.append_hex_digit('f');
    app.commit();

    assert_eq!(app.buffer().data(), &[0x00, 0xFF]);
    assert_eq!(app.active(), 1);
}

#[test]
fn moving_away_cancels_the_edit() {
    let mut app = app_with(&[0u8; 64]);
    app.enter_edit_mode(5);
    app.backspace();
    app.append_hex_digit('7');

    app.set_active_address(40);

    assert!(!app.edit_session().is_editing());
    assert_eq!(app.buffer().data(), &[0u8; 64][..]);
    assert_eq!(app.active(), 40);
}

#[test]
fn active_row_stays_visible() {
    let mut app = app_with(&[0u8; 16 * 100]).with_visible_rows(10);

    for address in [0, 16 * 50 + 3, 16 * 99 + 15, 16 * 20, 0] {
        app.set_active_address(address);
        let row = app.active() / 16;
        assert!(app.viewport().contains_row(row), "row {row} hidden");
    }
}

#[test]
fn commands_report_through_status() {
    let mut app = app_with(&[1, 2, 3]);

    app.execute_command("check");
    assert_eq!(
        app.status(),
        Some("Current file: sample.bin | Size: 3 bytes | Editor mode: View")
    );

    app.execute_command("load missing.bin");
    assert_eq!(app.status(), Some("File not found: missing.bin"));
    assert_eq!(app.buffer().data(), &[1, 2, 3]);

    app.execute_command("edit zz");
    assert_eq!(
        app.status(),
        Some("Invalid address format. Use hexadecimal (e.g., 0x100 or 100)")
    );

    app.execute_command("frobnicate");
    assert_eq!(
        app.status(),
        Some("Unknown command: frobnicate. Type 'help' for available commands.")
    );

    app.execute_command("exit");
    assert!(app.should_quit());
}
