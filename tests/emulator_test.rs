//! Emulator behavior tests
//!
//! Scenario tests feed byte streams into an emulator and check the screen
//! and its text projection; property tests cover cursor bounds, chunking,
//! scrollback capacity and resize.

use proptest::prelude::*;
use shellterm::render::{flatten, Projector};
use shellterm::terminal::{line_text, Cell, Cursor, Emulator, ParserState};

/// Everything observable about a screen, for equality checks
fn state_of(emulator: &Emulator) -> (Vec<Vec<Cell>>, Vec<Vec<Cell>>, Cursor, bool) {
    let screen = emulator.screen();
    (
        screen.visible_rows().map(<[Cell]>::to_vec).collect(),
        screen.scrollback().map(<[Cell]>::to_vec).collect(),
        screen.cursor(),
        screen.wrap_pending(),
    )
}

#[test]
fn test_hello_world_projection() {
    let mut emulator = Emulator::new(80, 5, 1000);
    emulator.feed(b"Hello\r\n");
    emulator.feed(b"World");

    let mut projector = Projector::new();
    assert_eq!(projector.project(emulator.screen()).text, "Hello\nWorld");
}

#[test]
fn test_cursor_up_at_top_is_clamped() {
    let mut emulator = Emulator::new(80, 24, 0);
    emulator.feed(b"\x1b[A");
    assert_eq!(emulator.cursor(), Cursor { row: 0, col: 0 });
}

#[test]
fn test_twenty_lines_into_ten_rows() {
    let mut emulator = Emulator::new(20, 10, 100);
    let lines: Vec<String> = (0..20).map(|i| format!("line{}", i)).collect();
    emulator.feed(lines.join("\r\n").as_bytes());

    let screen = emulator.screen();
    let history: Vec<String> = screen.scrollback().map(line_text).collect();
    assert_eq!(history, lines[..10].to_vec());

    let visible: Vec<String> = screen.visible_rows().map(line_text).collect();
    assert_eq!(visible, lines[10..].to_vec());
}

#[test]
fn test_newline_at_bottom_scrolls_once_per_line() {
    let mut emulator = Emulator::new(20, 10, 100);
    emulator.feed(b"\x1b[10;1H");
    emulator.feed(&[b'\n'; 20]);
    assert_eq!(emulator.screen().scrollback_len(), 20);
    assert_eq!(emulator.cursor().row, 9);
}

#[test]
fn test_clear_screen_and_home() {
    let mut emulator = Emulator::new(10, 3, 10);
    emulator.feed(b"abc\r\ndef\x1b[2J\x1b[Hxy");

    let (text, lines) = flatten(emulator.screen());
    assert_eq!(text, "xy");
    assert_eq!(lines, 1);
}

#[test]
fn test_erase_in_line_to_end() {
    let mut emulator = Emulator::new(10, 2, 0);
    emulator.feed(b"abcdef\x1b[1;3H\x1b[K");
    assert_eq!(emulator.screen().get_line_trimmed(0), "ab");
}

#[test]
fn test_sgr_sets_cell_attributes() {
    let mut emulator = Emulator::new(10, 2, 0);
    emulator.feed(b"\x1b[1;31mR\x1b[0mN");

    let screen = emulator.screen();
    let red = screen.get_cell(0, 0).unwrap();
    assert!(red.attrs.bold);
    assert_ne!(red.attrs.fg, Default::default());
    assert_eq!(screen.get_cell(1, 0).unwrap().attrs, Default::default());
}

#[test]
fn test_osc_title_is_discarded() {
    let mut emulator = Emulator::new(20, 2, 0);
    emulator.feed(b"\x1b]0;my title\x07ok");
    assert_eq!(emulator.screen().get_line_trimmed(0), "ok");
    assert_eq!(emulator.parser_state(), ParserState::Ground);
}

#[test]
fn test_unknown_sequences_are_skipped() {
    let mut emulator = Emulator::new(20, 2, 0);
    emulator.feed(b"a\x1b[?9999zb\x1b[5;5;5qc\x1bPdcs data\x1b\\d");
    assert_eq!(emulator.screen().get_line_trimmed(0), "abcd");
}

#[test]
fn test_utf8_split_across_feeds() {
    let mut emulator = Emulator::new(20, 2, 0);
    let bytes = "héllo".as_bytes();
    emulator.feed(&bytes[..2]);
    emulator.feed(&bytes[2..]);
    assert_eq!(emulator.screen().get_line_trimmed(0), "héllo");
}

#[test]
fn test_scroll_region_keeps_status_line() {
    let mut emulator = Emulator::new(10, 4, 10);
    emulator.feed(b"\x1b[4;1Hstatus\x1b[1;3r\x1b[1;1H");
    emulator.feed(b"1\r\n2\r\n3\r\n4\r\n5");

    let screen = emulator.screen();
    assert_eq!(screen.get_line_trimmed(0), "3");
    assert_eq!(screen.get_line_trimmed(2), "5");
    assert_eq!(screen.get_line_trimmed(3), "status");
    assert_eq!(screen.scrollback_len(), 2);
}

#[test]
fn test_alternate_screen_restores_primary() {
    let mut emulator = Emulator::new(10, 3, 10);
    emulator.feed(b"shell$ ");
    emulator.feed(b"\x1b[?1049h\x1b[2Jfullscreen app");
    assert!(emulator.screen().is_alternate());
    emulator.feed(b"\x1b[?1049l");

    assert!(!emulator.screen().is_alternate());
    assert_eq!(emulator.screen().get_line_trimmed(0), "shell$");
    assert_eq!(emulator.screen().scrollback_len(), 0);
}

#[test]
fn test_device_status_reply() {
    let mut emulator = Emulator::new(10, 5, 0);
    emulator.feed(b"\x1b[3;4H\x1b[6n");
    assert_eq!(emulator.take_replies(), b"\x1b[3;4R");
}

fn motion() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        (0u16..300).prop_map(|n| format!("\x1b[{}A", n).into_bytes()),
        (0u16..300).prop_map(|n| format!("\x1b[{}B", n).into_bytes()),
        (0u16..300).prop_map(|n| format!("\x1b[{}C", n).into_bytes()),
        (0u16..300).prop_map(|n| format!("\x1b[{}D", n).into_bytes()),
        (0u16..300, 0u16..300).prop_map(|(r, c)| format!("\x1b[{};{}H", r, c).into_bytes()),
        (0u16..300).prop_map(|n| format!("\x1b[{}G", n).into_bytes()),
        (0u16..300).prop_map(|n| format!("\x1b[{}d", n).into_bytes()),
        Just(b"\r".to_vec()),
        Just(b"\n".to_vec()),
        Just(b"\x08".to_vec()),
        Just(b"\t".to_vec()),
        Just(b"\x1bM".to_vec()),
        Just(b"x".to_vec()),
    ]
}

proptest! {
    #[test]
    fn cursor_always_in_bounds(
        cols in 1u16..40,
        rows in 1u16..20,
        moves in proptest::collection::vec(motion(), 0..60),
    ) {
        let mut emulator = Emulator::new(cols, rows, 10);
        for m in &moves {
            emulator.feed(m);
            let cursor = emulator.cursor();
            prop_assert!(cursor.row < rows);
            prop_assert!(cursor.col < cols);
        }
    }

    #[test]
    fn random_bytes_keep_cursor_in_bounds(bytes in proptest::collection::vec(any::<u8>(), 0..400)) {
        let mut emulator = Emulator::new(12, 6, 5);
        emulator.feed(&bytes);
        let cursor = emulator.cursor();
        prop_assert!(cursor.row < 6);
        prop_assert!(cursor.col < 12);
    }

    #[test]
    fn chunking_does_not_matter(
        moves in proptest::collection::vec(motion(), 1..30),
        text in "[a-z \u{e9}\u{4e16}]{0,40}",
        split in any::<prop::sample::Index>(),
    ) {
        let mut stream: Vec<u8> = moves.concat();
        stream.extend_from_slice(b"\x1b[1;33m");
        stream.extend_from_slice(text.as_bytes());
        stream.extend_from_slice(b"\x1b]2;title\x07\x1b[0m");

        let mut whole = Emulator::new(15, 5, 20);
        whole.feed(&stream);

        let at = split.index(stream.len() + 1);
        let mut halves = Emulator::new(15, 5, 20);
        halves.feed(&stream[..at]);
        halves.feed(&stream[at..]);

        let mut bytewise = Emulator::new(15, 5, 20);
        for byte in &stream {
            bytewise.feed(std::slice::from_ref(byte));
        }

        prop_assert_eq!(state_of(&whole), state_of(&halves));
        prop_assert_eq!(state_of(&whole), state_of(&bytewise));
    }

    #[test]
    fn scrollback_never_exceeds_capacity(
        capacity in 0usize..20,
        lines in 0usize..100,
    ) {
        let mut emulator = Emulator::new(8, 4, capacity);
        for i in 0..lines {
            emulator.feed(format!("{}\r\n", i).as_bytes());
        }

        let screen = emulator.screen();
        prop_assert!(screen.scrollback_len() <= capacity);

        // The newest evicted rows are the ones kept
        let scrolled = lines.saturating_sub(3);
        let kept = scrolled.min(capacity);
        let history: Vec<String> = screen.scrollback().map(line_text).collect();
        let expected: Vec<String> = (scrolled - kept..scrolled).map(|i| i.to_string()).collect();
        prop_assert_eq!(history, expected);
    }

    #[test]
    fn grow_then_shrink_restores_grid(
        text in "[a-z\r\n]{0,80}",
        extra_cols in 0u16..20,
        extra_rows in 0u16..10,
    ) {
        let mut emulator = Emulator::new(10, 5, 0);
        emulator.feed(text.replace('\n', "\r\n").as_bytes());
        let before: Vec<Vec<Cell>> = emulator.screen().visible_rows().map(<[Cell]>::to_vec).collect();

        emulator.resize(10 + extra_cols, 5 + extra_rows);
        emulator.resize(10, 5);

        let after: Vec<Vec<Cell>> = emulator.screen().visible_rows().map(<[Cell]>::to_vec).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn second_projection_reports_no_change(text in "[ -~\r\n]{0,200}") {
        let mut emulator = Emulator::new(20, 6, 50);
        emulator.feed(text.as_bytes());

        let mut projector = Projector::new();
        let first = projector.project(emulator.screen()).text.to_string();
        let second = projector.project(emulator.screen());
        prop_assert!(!second.changed);
        prop_assert_eq!(second.text, first.as_str());
    }
}
