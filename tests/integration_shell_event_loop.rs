use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use shell_overlays::drivers::ScriptedInputDriver;
use shell_overlays::event_loop::{ControlFlow, EventLoop, LoopEvent};
use shell_overlays::shell::backend::InMemoryBackend;
use shell_overlays::shell::{EditorShell, ShellOptions, ShellOverlay, render};
use shell_overlays::ui::UiFrame;

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn typed(text: &str) -> impl Iterator<Item = Event> + '_ {
    text.chars().map(|c| key(KeyCode::Char(c)))
}

fn quit() -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL))
}

fn click(rect: Rect) -> Event {
    Event::Mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: rect.x + 1,
        row: rect.y,
        modifiers: KeyModifiers::NONE,
    })
}

/// Feeds one scripted event per frame so deferred focus work lands between
/// inputs, the way it does at human typing speed.
fn run_script(shell: &mut EditorShell<InMemoryBackend>, steps: Vec<Event>) -> u64 {
    let mut steps: VecDeque<Event> = steps.into();
    let mut event_loop = EventLoop::new(ScriptedInputDriver::default(), Duration::ZERO);
    let area = shell.area();
    let mut buf = Buffer::empty(area);
    event_loop
        .run(|driver, event| match event {
            LoopEvent::Frame => {
                shell.tick();
                render::draw(&mut UiFrame::from_parts(area, &mut buf), &*shell);
                match steps.pop_front() {
                    Some(next) => {
                        driver.push(next);
                        Ok(ControlFlow::Continue)
                    }
                    None => Ok(ControlFlow::Quit),
                }
            }
            LoopEvent::Input(event) => Ok(shell.handle_event(&event)),
        })
        .unwrap();
    event_loop.frames()
}

#[test]
fn keyboard_find_and_replace_round_trip() {
    let mut shell = EditorShell::new(InMemoryBackend::new(0), ShellOptions::default()).unwrap();
    let find_button = shell.toolbar_button(ShellOverlay::Find).unwrap();
    assert_eq!(shell.doc().active_element(), Some(find_button));

    let mut steps = vec![key(KeyCode::Enter)];
    steps.extend(typed("fox"));
    steps.push(key(KeyCode::Tab));
    steps.extend(typed("cat"));
    steps.push(key(KeyCode::Tab));
    steps.push(key(KeyCode::Enter));
    steps.push(key(KeyCode::Esc));
    steps.push(quit());
    let frames = run_script(&mut shell, steps);

    assert!(frames > 10);
    assert!(shell.text().starts_with("Teh quick brown cat jumps"));
    assert_eq!(shell.status(), "Replaced 1 occurrence(s)");
    assert!(!shell.is_open(ShellOverlay::Find));
    assert!(!shell.doc().scroll_lock().is_locked());
    assert_eq!(shell.doc().active_element(), Some(find_button));
}

#[test]
fn tab_never_leaves_open_dialog() {
    let mut shell = EditorShell::new(InMemoryBackend::new(0), ShellOptions::default()).unwrap();
    let mut steps = vec![key(KeyCode::Enter)];
    steps.extend((0..12).map(|_| key(KeyCode::Tab)));
    steps.extend((0..5).map(|_| key(KeyCode::BackTab)));
    run_script(&mut shell, steps);

    let root = shell.overlay_root(ShellOverlay::Find).unwrap();
    let active = shell.doc().active_element().unwrap();
    assert!(shell.doc().contains(root, active));
}

#[test]
fn mouse_menu_selection_updates_status_and_closes_menu() {
    let mut shell = EditorShell::new(InMemoryBackend::new(0), ShellOptions::default()).unwrap();
    let view = shell.toolbar_button(ShellOverlay::ViewMenu).unwrap();
    let view_rect = shell.doc().rect(view);
    let menu = shell.overlay_root(ShellOverlay::ViewMenu).unwrap();
    let zoom = shell.find_label(menu, "Zoom").unwrap();
    let zoom_rect = shell.doc().rect(zoom);
    assert!(zoom_rect.height > 0);

    run_script(&mut shell, vec![click(view_rect), click(zoom_rect)]);

    assert_eq!(shell.status(), "View > Zoom");
    assert!(!shell.is_open(ShellOverlay::ViewMenu));
}

#[test]
fn quit_key_stops_loop_with_dialog_open() {
    let mut shell = EditorShell::new(InMemoryBackend::new(3), ShellOptions::default()).unwrap();
    shell.open(ShellOverlay::Spelling);
    let frames = run_script(&mut shell, vec![quit(), key(KeyCode::Esc)]);
    assert_eq!(frames, 1);
    assert!(shell.is_open(ShellOverlay::Spelling));
}
