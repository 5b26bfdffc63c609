use std::cell::Cell;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use shell_overlays::dom::{Document, ElementKind, InputKind, NodeId};
use shell_overlays::overlay::{CloseCallback, OverlayConfig, OverlayHost, TrapPhase};

fn place(doc: &Document, parent: NodeId, kind: ElementKind, label: &str, rect: Rect) -> NodeId {
    let id = doc.create_element(kind, label);
    doc.set_rect(id, rect);
    doc.append_child(parent, id).unwrap();
    id
}

fn detached(doc: &Document, label: &str, rect: Rect) -> NodeId {
    let id = doc.create_element(ElementKind::Container, label);
    doc.set_rect(id, rect);
    id
}

fn trigger(doc: &Document) -> NodeId {
    let id = place(
        doc,
        doc.body(),
        ElementKind::Button,
        "trigger",
        Rect::new(0, 0, 9, 1),
    );
    assert!(doc.focus(id));
    id
}

fn counter() -> (Rc<Cell<usize>>, CloseCallback) {
    let count = Rc::new(Cell::new(0));
    let sink = Rc::clone(&count);
    (count, Rc::new(move || sink.set(sink.get() + 1)))
}

fn key(doc: &Document, code: KeyCode) {
    doc.dispatch_key(KeyEvent::new(code, KeyModifiers::NONE));
}

#[test]
fn tab_wraps_inside_three_element_dialog() {
    let doc = Document::new();
    let trigger = trigger(&doc);
    let dialog = detached(&doc, "dialog", Rect::new(10, 5, 30, 6));
    let btn1 = place(&doc, dialog, ElementKind::Button, "btn1", Rect::new(12, 6, 6, 1));
    let input1 = place(
        &doc,
        dialog,
        ElementKind::Input(InputKind::Text),
        "input1",
        Rect::new(12, 7, 20, 1),
    );
    let btn2 = place(&doc, dialog, ElementKind::Button, "btn2", Rect::new(12, 8, 6, 1));
    let (_closes, on_close) = counter();
    let mut host = OverlayHost::new(&doc, dialog, OverlayConfig::modal(), on_close);

    host.set_open(true);
    doc.scheduler().run_frame();
    assert_eq!(host.trap_phase(), TrapPhase::Trapping);
    assert_eq!(doc.active_element(), Some(btn1));

    key(&doc, KeyCode::Tab);
    assert_eq!(doc.active_element(), Some(input1));
    key(&doc, KeyCode::Tab);
    assert_eq!(doc.active_element(), Some(btn2));
    key(&doc, KeyCode::Tab);
    assert_eq!(doc.active_element(), Some(btn1));
    key(&doc, KeyCode::BackTab);
    assert_eq!(doc.active_element(), Some(btn2));

    host.set_open(false);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(trigger));
}

#[test]
fn empty_dialog_focuses_root_then_restores_trigger() {
    let doc = Document::new();
    let trigger = trigger(&doc);
    let dialog = detached(&doc, "loading", Rect::new(10, 5, 30, 6));
    let (_closes, on_close) = counter();
    let mut host = OverlayHost::new(&doc, dialog, OverlayConfig::modal(), on_close);

    host.set_open(true);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(dialog));
    for _ in 0..3 {
        key(&doc, KeyCode::Tab);
        assert_eq!(doc.active_element(), Some(dialog));
    }
    key(&doc, KeyCode::BackTab);
    assert_eq!(doc.active_element(), Some(dialog));

    host.set_open(false);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(trigger));
}

#[test]
fn closing_stacked_overlay_restores_focus_inside_first() {
    let doc = Document::new();
    let trigger = trigger(&doc);
    let first = detached(&doc, "first", Rect::new(5, 3, 40, 10));
    let open_second = place(&doc, first, ElementKind::Button, "more", Rect::new(7, 5, 6, 1));
    let second = detached(&doc, "second", Rect::new(15, 6, 20, 4));
    let ok = place(&doc, second, ElementKind::Button, "ok", Rect::new(17, 7, 4, 1));
    let (_a, close_a) = counter();
    let (_b, close_b) = counter();
    let mut host_a = OverlayHost::new(&doc, first, OverlayConfig::modal(), close_a);
    let mut host_b = OverlayHost::new(&doc, second, OverlayConfig::modal(), close_b);

    host_a.set_open(true);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(open_second));

    host_b.set_open(true);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(ok));
    // the lower trap leaves focus in the upper overlay alone
    key(&doc, KeyCode::Tab);
    assert_eq!(doc.active_element(), Some(ok));

    host_b.set_open(false);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(open_second));

    host_a.set_open(false);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(trigger));
}

#[test]
fn escape_closes_only_the_topmost_overlay() {
    let doc = Document::new();
    trigger(&doc);
    let first = detached(&doc, "first", Rect::new(5, 3, 40, 10));
    let second = detached(&doc, "second", Rect::new(15, 6, 20, 4));
    let (a, close_a) = counter();
    let (b, close_b) = counter();
    let mut host_a = OverlayHost::new(&doc, first, OverlayConfig::modal(), close_a);
    let mut host_b = OverlayHost::new(&doc, second, OverlayConfig::modal(), close_b);
    host_a.set_open(true);
    host_b.set_open(true);

    key(&doc, KeyCode::Esc);
    assert_eq!((a.get(), b.get()), (0, 1));
}

#[test]
fn nested_scroll_locks_release_on_outer_close() {
    let doc = Document::new();
    let before = doc.scroll_style();
    let a = detached(&doc, "a", Rect::new(0, 0, 10, 3));
    let b = detached(&doc, "b", Rect::new(0, 4, 10, 3));
    let (_a, close_a) = counter();
    let (_b, close_b) = counter();
    let mut host_a = OverlayHost::new(&doc, a, OverlayConfig::modal(), close_a);
    let mut host_b = OverlayHost::new(&doc, b, OverlayConfig::modal(), close_b);

    host_a.set_open(true);
    assert!(!doc.scroll_style().scrollable());
    host_b.set_open(true);
    host_b.set_open(false);
    assert!(!doc.scroll_style().scrollable());
    host_a.set_open(false);
    assert_eq!(doc.scroll_style(), before);
}

#[test]
fn escape_and_outside_click_close_once_and_restore_once() {
    let doc = Document::new();
    let trigger = trigger(&doc);
    let other = place(&doc, doc.body(), ElementKind::Button, "other", Rect::new(0, 2, 7, 1));
    let dialog = detached(&doc, "dialog", Rect::new(20, 5, 20, 5));
    place(&doc, dialog, ElementKind::Button, "ok", Rect::new(22, 6, 4, 1));
    let (closes, on_close) = counter();
    let mut host = OverlayHost::new(&doc, dialog, OverlayConfig::modal(), on_close);
    host.set_open(true);
    doc.scheduler().run_frame();

    key(&doc, KeyCode::Esc);
    doc.dispatch_pointer_down(60, 20);
    assert_eq!(closes.get(), 1);
    host.set_open(false);
    host.set_open(false);

    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(trigger));
    // a second restore would have nothing left to do; make sure none is queued
    doc.focus(other);
    assert_eq!(doc.scheduler().run_frame(), 0);
    assert_eq!(doc.active_element(), Some(other));
}

#[test]
fn explicit_return_target_overrides_prior_focus() {
    let doc = Document::new();
    trigger(&doc);
    let elsewhere = place(
        &doc,
        doc.body(),
        ElementKind::Button,
        "elsewhere",
        Rect::new(0, 3, 9, 1),
    );
    let dialog = detached(&doc, "dialog", Rect::new(20, 5, 20, 5));
    let (_closes, on_close) = counter();
    let config = OverlayConfig::modal().with_return_focus(elsewhere);
    let mut host = OverlayHost::new(&doc, dialog, config, on_close);
    host.set_open(true);
    doc.scheduler().run_frame();
    host.set_open(false);
    doc.scheduler().run_frame();
    assert_eq!(doc.active_element(), Some(elsewhere));
}
