use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

/// Cleans raw crossterm key events before they reach the document.
///
/// - Shift+Tab arrives as `Tab` with SHIFT on some terminals; it becomes
///   `BackTab` without modifiers.
/// - Release events are dropped.
/// - Auto-repeated Escape is dropped so holding it does not close every
///   stacked overlay in turn.
#[derive(Debug, Default)]
pub struct KeyboardNormalizer {
    esc_down: bool,
}

impl KeyboardNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, evt: Event) -> Option<Event> {
        let Event::Key(mut key) = evt else {
            return Some(evt);
        };
        match key.kind {
            KeyEventKind::Release => {
                if key.code == KeyCode::Esc {
                    self.esc_down = false;
                }
                return None;
            }
            KeyEventKind::Repeat if key.code == KeyCode::Esc => return None,
            KeyEventKind::Repeat | KeyEventKind::Press => {}
        }
        if key.code == KeyCode::Tab && key.modifiers.contains(KeyModifiers::SHIFT) {
            key.code = KeyCode::BackTab;
            key.modifiers.remove(KeyModifiers::SHIFT);
        }
        if key.code == KeyCode::Esc {
            // windows reports a held key as repeated presses
            if cfg!(windows) && self.esc_down {
                return None;
            }
            self.esc_down = true;
        } else {
            self.esc_down = false;
        }
        Some(Event::Key(key))
    }
}
