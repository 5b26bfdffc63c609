//! Terminal editor shell: a toolbar, an editable document, dialogs and
//! dropdown menus, all hosted by the overlay engine.
//!
//! The shell owns one [`OverlayHost`] per dialog or menu. Hosts never close
//! themselves; their close callbacks queue a request that the shell answers
//! after the current event has finished dispatching.

pub mod backend;
pub mod render;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use ratatui::layout::Rect;

use crate::constants::{LOG_PANE_HEIGHT, STATUS_HEIGHT, TOOLBAR_HEIGHT};
use crate::debug_log::LogHandle;
use crate::dom::{Document, ElementKind, InputKind, NodeId};
use crate::error::DomError;
use crate::event_loop::ControlFlow;
use crate::keybindings::Action;
use crate::overlay::{OverlayConfig, OverlayHost, SessionId};
use crate::ui::centered_rect;
use backend::{BackendRequest, BackendResponse, RequestId, ShellBackend};

const INITIAL_TEXT: &str = "Teh quick brown fox jumps over the lazy dog.\n\
Press Tab to move between toolbar buttons, Enter to open a dialog.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellOverlay {
    Find,
    Spelling,
    Bookmarks,
    ConfirmDelete,
    FileMenu,
    ViewMenu,
}

impl ShellOverlay {
    pub const ALL: [ShellOverlay; 6] = [
        ShellOverlay::Find,
        ShellOverlay::Spelling,
        ShellOverlay::Bookmarks,
        ShellOverlay::ConfirmDelete,
        ShellOverlay::FileMenu,
        ShellOverlay::ViewMenu,
    ];

    pub fn is_menu(self) -> bool {
        matches!(self, ShellOverlay::FileMenu | ShellOverlay::ViewMenu)
    }

    pub fn title(self) -> &'static str {
        match self {
            ShellOverlay::Find => "Find & Replace",
            ShellOverlay::Spelling => "Spelling",
            ShellOverlay::Bookmarks => "Bookmarks",
            ShellOverlay::ConfirmDelete => "Delete bookmark",
            ShellOverlay::FileMenu => "File",
            ShellOverlay::ViewMenu => "View",
        }
    }

    /// Preferred dialog size (menus size themselves to their items).
    fn dialog_size(self) -> (u16, u16) {
        match self {
            ShellOverlay::Find => (44, 9),
            ShellOverlay::Spelling => (40, 10),
            ShellOverlay::Bookmarks => (40, 12),
            ShellOverlay::ConfirmDelete => (38, 6),
            ShellOverlay::FileMenu | ShellOverlay::ViewMenu => (0, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Close dialogs when the pointer goes down outside them.
    pub outside_dismiss: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            outside_dismiss: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Open(ShellOverlay),
    ToggleMenu(ShellOverlay),
    Close(ShellOverlay),
    ReplaceAll,
    ApplySuggestion(String),
    SelectBookmark(String),
    DeleteSelected,
    ConfirmDelete,
    MenuItem(ShellOverlay, &'static str),
}

#[derive(Debug, Clone, Copy)]
struct Toolbar {
    row: NodeId,
    find: NodeId,
    spelling: NodeId,
    bookmarks: NodeId,
    file: NodeId,
    view: NodeId,
}

impl Toolbar {
    fn buttons(&self) -> [NodeId; 5] {
        [self.find, self.spelling, self.bookmarks, self.file, self.view]
    }
}

#[derive(Debug, Clone, Copy)]
struct Widgets {
    find_field: NodeId,
    replace_field: NodeId,
    spelling_prompt: NodeId,
    suggestions: NodeId,
    bookmark_list: NodeId,
    confirm_prompt: NodeId,
}

fn add(doc: &Document, parent: NodeId, kind: ElementKind, label: &str) -> Result<NodeId, DomError> {
    let id = doc.create_element(kind, label);
    doc.append_child(parent, id)?;
    Ok(id)
}

/// Lay children of `parent` out one per row inside `inner`. Nested containers
/// take as many rows as their own children. Rows past the bottom get zero
/// height, which also takes them out of keyboard navigation.
fn stack_rows(doc: &Document, parent: NodeId, inner: Rect) -> u16 {
    let bottom = inner.y.saturating_add(inner.height);
    let mut y = inner.y;
    for child in doc.children(parent) {
        if doc.kind(child) == Some(ElementKind::Container) {
            let room = Rect::new(inner.x, y, inner.width, bottom.saturating_sub(y));
            let used = stack_rows(doc, child, room);
            doc.set_rect(child, Rect::new(inner.x, y, inner.width, used));
            y = y.saturating_add(used);
        } else {
            let height = u16::from(y < bottom);
            doc.set_rect(child, Rect::new(inner.x, y, inner.width, height));
            y = y.saturating_add(1);
        }
    }
    y.min(bottom).saturating_sub(inner.y)
}

pub struct EditorShell<B> {
    doc: Document,
    backend: B,
    options: ShellOptions,
    area: Rect,
    toolbar: Toolbar,
    editor: NodeId,
    widgets: Widgets,
    overlays: HashMap<ShellOverlay, OverlayHost>,
    /// Open dialogs, bottom first.
    modal_stack: Vec<ShellOverlay>,
    commands: HashMap<NodeId, Command>,
    fields: HashMap<NodeId, String>,
    text: String,
    status: String,
    spelling_word: Option<String>,
    selected_bookmark: Option<String>,
    pending: HashMap<RequestId, (ShellOverlay, SessionId)>,
    close_requests: Rc<RefCell<Vec<ShellOverlay>>>,
    log: Option<LogHandle>,
}

impl<B: ShellBackend> EditorShell<B> {
    pub fn new(backend: B, options: ShellOptions) -> Result<Self, DomError> {
        let doc = Document::new();
        let body = doc.body();
        let mut commands = HashMap::new();
        let mut fields = HashMap::new();

        let row = add(&doc, body, ElementKind::Container, "")?;
        let mut toolbar_button = |label: &str, command: Command| -> Result<NodeId, DomError> {
            let id = add(&doc, row, ElementKind::Button, label)?;
            commands.insert(id, command);
            Ok(id)
        };
        let toolbar = Toolbar {
            row,
            find: toolbar_button("Find", Command::Open(ShellOverlay::Find))?,
            spelling: toolbar_button("Spelling", Command::Open(ShellOverlay::Spelling))?,
            bookmarks: toolbar_button("Bookmarks", Command::Open(ShellOverlay::Bookmarks))?,
            file: toolbar_button("File", Command::ToggleMenu(ShellOverlay::FileMenu))?,
            view: toolbar_button("View", Command::ToggleMenu(ShellOverlay::ViewMenu))?,
        };
        let editor = add(&doc, body, ElementKind::Container, "Document")?;
        doc.set_editable(editor, true);

        let roots: HashMap<ShellOverlay, NodeId> = ShellOverlay::ALL
            .iter()
            .map(|name| (*name, doc.create_element(ElementKind::Container, name.title())))
            .collect();
        let root = |name: ShellOverlay| roots[&name];
        let mut button = |parent: NodeId, label: &str, command: Command| -> Result<NodeId, DomError> {
            let id = add(&doc, parent, ElementKind::Button, label)?;
            commands.insert(id, command);
            Ok(id)
        };

        let find = root(ShellOverlay::Find);
        add(&doc, find, ElementKind::Text, "Find what:")?;
        let find_field = add(&doc, find, ElementKind::Input(InputKind::Text), "find")?;
        add(&doc, find, ElementKind::Text, "Replace with:")?;
        let replace_field = add(&doc, find, ElementKind::Input(InputKind::Text), "replace")?;
        button(find, "Replace all", Command::ReplaceAll)?;
        button(find, "Close", Command::Close(ShellOverlay::Find))?;
        fields.insert(find_field, String::new());
        fields.insert(replace_field, String::new());

        // buttons arrive with the backend's answer
        let spelling = root(ShellOverlay::Spelling);
        let spelling_prompt = add(&doc, spelling, ElementKind::Text, "")?;
        let suggestions = add(&doc, spelling, ElementKind::Container, "")?;

        let bookmarks = root(ShellOverlay::Bookmarks);
        add(&doc, bookmarks, ElementKind::Text, "Pick a bookmark:")?;
        let bookmark_list = add(&doc, bookmarks, ElementKind::Container, "")?;
        button(bookmarks, "Delete", Command::DeleteSelected)?;
        button(bookmarks, "Close", Command::Close(ShellOverlay::Bookmarks))?;

        let confirm = root(ShellOverlay::ConfirmDelete);
        let confirm_prompt = add(&doc, confirm, ElementKind::Text, "")?;
        button(confirm, "Yes, delete", Command::ConfirmDelete)?;
        let confirm_cancel = button(confirm, "Cancel", Command::Close(ShellOverlay::ConfirmDelete))?;

        for (menu, items) in [
            (ShellOverlay::FileMenu, ["New", "Save", "Print"]),
            (ShellOverlay::ViewMenu, ["Word wrap", "Zoom", "Outline"]),
        ] {
            for item in items {
                button(root(menu), item, Command::MenuItem(menu, item))?;
            }
        }

        let close_requests: Rc<RefCell<Vec<ShellOverlay>>> = Rc::default();
        let overlays = ShellOverlay::ALL
            .iter()
            .map(|name| {
                let config = match name {
                    ShellOverlay::Find => OverlayConfig::modal().with_initial_focus(find_field),
                    ShellOverlay::ConfirmDelete => {
                        OverlayConfig::modal().with_initial_focus(confirm_cancel)
                    }
                    // clicks inside the stacked confirmation are not "outside" the list
                    ShellOverlay::Bookmarks => {
                        OverlayConfig::modal().with_exempt(root(ShellOverlay::ConfirmDelete))
                    }
                    ShellOverlay::Spelling => OverlayConfig::modal(),
                    ShellOverlay::FileMenu => OverlayConfig::popover().with_exempt(toolbar.file),
                    ShellOverlay::ViewMenu => OverlayConfig::popover().with_exempt(toolbar.view),
                };
                let config = if name.is_menu() {
                    config
                } else {
                    config.close_on_outside_activation(options.outside_dismiss)
                };
                let requests = Rc::clone(&close_requests);
                let name = *name;
                let on_close = Rc::new(move || requests.borrow_mut().push(name));
                (name, OverlayHost::new(&doc, root(name), config, on_close))
            })
            .collect();

        let mut shell = Self {
            doc,
            backend,
            options,
            area: Rect::new(0, 0, 80, 24),
            toolbar,
            editor,
            widgets: Widgets {
                find_field,
                replace_field,
                spelling_prompt,
                suggestions,
                bookmark_list,
                confirm_prompt,
            },
            overlays,
            modal_stack: Vec::new(),
            commands,
            fields,
            text: INITIAL_TEXT.to_string(),
            status: "Ready".to_string(),
            spelling_word: None,
            selected_bookmark: None,
            pending: HashMap::new(),
            close_requests,
            log: None,
        };
        shell.layout();
        shell.doc.focus(shell.toolbar.find);
        Ok(shell)
    }

    pub fn with_log(mut self, log: LogHandle) -> Self {
        self.log = Some(log);
        self
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &ShellOptions {
        &self.options
    }

    pub fn log(&self) -> Option<&LogHandle> {
        self.log.as_ref()
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn editor(&self) -> NodeId {
        self.editor
    }

    pub fn field_value(&self, node: NodeId) -> Option<&str> {
        self.fields.get(&node).map(String::as_str)
    }

    pub fn selected_bookmark(&self) -> Option<&str> {
        self.selected_bookmark.as_deref()
    }

    pub fn is_open(&self, name: ShellOverlay) -> bool {
        self.overlays.get(&name).is_some_and(OverlayHost::is_open)
    }

    pub fn open_overlays(&self) -> Vec<ShellOverlay> {
        ShellOverlay::ALL
            .into_iter()
            .filter(|name| self.is_open(*name))
            .collect()
    }

    pub fn top_modal(&self) -> Option<ShellOverlay> {
        self.modal_stack.last().copied()
    }

    pub fn overlay_root(&self, name: ShellOverlay) -> Option<NodeId> {
        self.overlays.get(&name).map(OverlayHost::content)
    }

    pub fn session(&self, name: ShellOverlay) -> Option<SessionId> {
        self.overlays.get(&name).and_then(OverlayHost::session)
    }

    pub fn toolbar_button(&self, name: ShellOverlay) -> Option<NodeId> {
        match name {
            ShellOverlay::Find => Some(self.toolbar.find),
            ShellOverlay::Spelling => Some(self.toolbar.spelling),
            ShellOverlay::Bookmarks => Some(self.toolbar.bookmarks),
            ShellOverlay::FileMenu => Some(self.toolbar.file),
            ShellOverlay::ViewMenu => Some(self.toolbar.view),
            ShellOverlay::ConfirmDelete => None,
        }
    }

    /// First attached node under `within` (inclusive) whose label is `label`.
    pub fn find_label(&self, within: NodeId, label: &str) -> Option<NodeId> {
        std::iter::once(within)
            .chain(self.doc.descendants(within))
            .find(|id| self.doc.is_attached(*id) && self.doc.label(*id).as_deref() == Some(label))
    }

    pub fn focused_label(&self) -> Option<String> {
        self.doc.active_element().and_then(|id| self.doc.label(id))
    }

    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        self.layout();
    }

    /// Area between the toolbar and the status line.
    pub fn editor_area(&self) -> Rect {
        let top = self.area.y.saturating_add(TOOLBAR_HEIGHT);
        let reserved = TOOLBAR_HEIGHT + STATUS_HEIGHT + LOG_PANE_HEIGHT;
        Rect::new(
            self.area.x,
            top,
            self.area.width,
            self.area.height.saturating_sub(reserved),
        )
    }

    pub fn status_area(&self) -> Rect {
        let editor = self.editor_area();
        Rect::new(self.area.x, editor.bottom(), self.area.width, STATUS_HEIGHT)
    }

    pub fn log_area(&self) -> Rect {
        let status = self.status_area();
        Rect::new(
            self.area.x,
            status.bottom(),
            self.area.width,
            self.area.bottom().saturating_sub(status.bottom()),
        )
    }

    /// One frame: run deferred focus work, then apply backend answers.
    pub fn tick(&mut self) {
        self.doc.scheduler().run_frame();
        for (id, response) in self.backend.poll() {
            self.apply_response(id, response);
        }
        self.layout();
    }

    pub fn handle_event(&mut self, event: &Event) -> ControlFlow {
        match event {
            Event::Resize(width, height) => self.resize(Rect::new(0, 0, *width, *height)),
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if self.doc.bindings().matches(Action::Quit, key) {
                    return ControlFlow::Quit;
                }
                let outcome = self.doc.dispatch_key(*key);
                if !outcome.default_prevented
                    && !self.type_key(key)
                    && self.doc.bindings().matches(Action::Activate, key)
                    && let Some(active) = self.doc.active_element()
                {
                    self.activate(active);
                }
            }
            Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                // the topmost dialog acts as a backdrop for everything beneath it
                let backdrop = self.top_modal().and_then(|name| self.overlay_root(name));
                let outcome = self.doc.dispatch_pointer_down(mouse.column, mouse.row);
                if let Some(target) = outcome.target
                    && !outcome.default_prevented
                    && backdrop.is_none_or(|root| self.doc.contains(root, target))
                {
                    self.activate(target);
                }
            }
            _ => {}
        }
        self.process_close_requests();
        ControlFlow::Continue
    }

    fn process_close_requests(&mut self) {
        let requests: Vec<ShellOverlay> = self.close_requests.borrow_mut().drain(..).collect();
        for name in requests {
            tracing::debug!(overlay = ?name, "close requested");
            self.close(name);
        }
    }

    fn type_key(&mut self, key: &KeyEvent) -> bool {
        let Some(active) = self.doc.active_element() else {
            return false;
        };
        let in_editor = active == self.editor;
        let target = if in_editor {
            &mut self.text
        } else if let Some(value) = self.fields.get_mut(&active) {
            value
        } else {
            return false;
        };
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => target.push(c),
            KeyCode::Enter if in_editor => target.push('\n'),
            KeyCode::Backspace => {
                target.pop();
            }
            _ => return false,
        }
        true
    }

    fn activate(&mut self, node: NodeId) {
        let Some(command) = self.commands.get(&node).cloned() else {
            return;
        };
        tracing::debug!(node = %node, command = ?command, "activate");
        match command {
            Command::Open(name) => self.open(name),
            Command::ToggleMenu(name) if self.is_open(name) => self.close(name),
            Command::ToggleMenu(name) => self.open(name),
            Command::Close(name) => self.close(name),
            Command::ReplaceAll => {
                let find = self.fields[&self.widgets.find_field].clone();
                let replace = self.fields[&self.widgets.replace_field].clone();
                if find.is_empty() {
                    self.status = "Nothing to find".to_string();
                    return;
                }
                let text = self.text.clone();
                self.submit(
                    ShellOverlay::Find,
                    BackendRequest::ReplaceAll {
                        text,
                        find,
                        replace,
                    },
                );
                self.status = "Replacing...".to_string();
            }
            Command::ApplySuggestion(fix) => {
                if let Some(word) = self.spelling_word.take() {
                    self.text = self.text.replacen(&word, &fix, 1);
                    self.status = format!("Replaced \"{word}\" with \"{fix}\"");
                }
                self.close(ShellOverlay::Spelling);
            }
            Command::SelectBookmark(name) => {
                self.status = format!("Selected bookmark \"{name}\"");
                self.selected_bookmark = Some(name);
            }
            Command::DeleteSelected => {
                let Some(name) = self.selected_bookmark.clone() else {
                    self.status = "Select a bookmark first".to_string();
                    return;
                };
                self.doc
                    .set_label(self.widgets.confirm_prompt, format!("Delete \"{name}\"?"));
                self.open(ShellOverlay::ConfirmDelete);
            }
            Command::ConfirmDelete => {
                if let Some(name) = self.selected_bookmark.take() {
                    // the list being edited owns the request, not the confirmation
                    self.submit(ShellOverlay::Bookmarks, BackendRequest::DeleteBookmark { name });
                }
                self.close(ShellOverlay::ConfirmDelete);
            }
            Command::MenuItem(menu, item) => {
                self.status = format!("{} > {item}", menu.title());
                self.close(menu);
            }
        }
    }

    pub fn open(&mut self, name: ShellOverlay) {
        if self.is_open(name) {
            return;
        }
        for menu in [ShellOverlay::FileMenu, ShellOverlay::ViewMenu] {
            if menu != name {
                self.close(menu);
            }
        }
        if let Some(host) = self.overlays.get_mut(&name) {
            host.set_open(true);
        }
        if !self.is_open(name) {
            tracing::warn!(overlay = ?name, "overlay failed to open");
            return;
        }
        match name {
            ShellOverlay::Spelling => {
                self.doc
                    .set_label(self.widgets.spelling_prompt, "Checking spelling...");
                self.clear_children(self.widgets.suggestions);
                self.spelling_word = None;
                let text = self.text.clone();
                self.submit(name, BackendRequest::CheckSpelling { text });
            }
            ShellOverlay::Bookmarks => {
                self.clear_children(self.widgets.bookmark_list);
                self.selected_bookmark = None;
                self.submit(name, BackendRequest::ListBookmarks);
            }
            _ => {}
        }
        self.layout();
        if name.is_menu() {
            // menus keep focus free; start on the first item for keyboard users
            if let Some(first) = self
                .overlay_root(name)
                .and_then(|root| self.doc.children(root).first().copied())
            {
                self.doc.focus(first);
            }
        } else {
            self.modal_stack.push(name);
        }
    }

    pub fn close(&mut self, name: ShellOverlay) {
        if !self.is_open(name) {
            return;
        }
        // a dialog never outlives the one it was opened from
        if let Some(pos) = self.modal_stack.iter().position(|open| *open == name) {
            let above: Vec<ShellOverlay> = self.modal_stack.drain(pos..).skip(1).collect();
            for stacked in above.into_iter().rev() {
                if let Some(host) = self.overlays.get_mut(&stacked) {
                    host.set_open(false);
                }
            }
        }
        if let Some(host) = self.overlays.get_mut(&name) {
            host.set_open(false);
        }
        if name.is_menu()
            && self.doc.active_element().is_none()
            && let Some(toggle) = self.toolbar_button(name)
        {
            self.doc.focus(toggle);
        }
    }

    fn submit(&mut self, owner: ShellOverlay, request: BackendRequest) {
        let Some(session) = self.session(owner) else {
            tracing::warn!(overlay = ?owner, "backend request outside an open session");
            return;
        };
        let id = self.backend.submit(request);
        self.pending.insert(id, (owner, session));
    }

    fn apply_response(&mut self, id: RequestId, response: BackendResponse) {
        let Some((owner, session)) = self.pending.remove(&id) else {
            tracing::warn!(request = %id, "response for unknown request");
            return;
        };
        if self.session(owner) != Some(session) {
            tracing::debug!(
                request = %id,
                session = %session,
                "dropping response for closed session"
            );
            return;
        }
        let applied = match response {
            BackendResponse::Spelling { word, suggestions } => self.show_suggestions(word, suggestions),
            BackendResponse::Bookmarks(names) => self.show_bookmarks(names),
            BackendResponse::Deleted { name, existed } => {
                self.status = if existed {
                    format!("Deleted bookmark \"{name}\"")
                } else {
                    format!("Bookmark \"{name}\" was already gone")
                };
                self.submit(owner, BackendRequest::ListBookmarks);
                Ok(())
            }
            BackendResponse::Replaced { text, count } => {
                self.text = text;
                self.status = format!("Replaced {count} occurrence(s)");
                Ok(())
            }
        };
        if let Err(err) = applied {
            tracing::warn!(request = %id, error = %err, "failed to apply backend response");
        }
    }

    fn show_suggestions(&mut self, word: Option<String>, suggestions: Vec<String>) -> Result<(), DomError> {
        let list = self.widgets.suggestions;
        self.clear_children(list);
        let prompt = match &word {
            Some(word) => format!("Not in dictionary: \"{word}\""),
            None => "No spelling issues found.".to_string(),
        };
        self.doc.set_label(self.widgets.spelling_prompt, prompt);
        for fix in suggestions {
            let id = add(&self.doc, list, ElementKind::Button, &fix)?;
            self.commands.insert(id, Command::ApplySuggestion(fix));
        }
        let close = add(&self.doc, list, ElementKind::Button, "Close")?;
        self.commands
            .insert(close, Command::Close(ShellOverlay::Spelling));
        self.spelling_word = word;
        self.layout();
        Ok(())
    }

    fn show_bookmarks(&mut self, names: Vec<String>) -> Result<(), DomError> {
        let list = self.widgets.bookmark_list;
        self.clear_children(list);
        if names.is_empty() {
            add(&self.doc, list, ElementKind::Text, "(no bookmarks)")?;
        }
        for name in names {
            let id = add(&self.doc, list, ElementKind::Button, &name)?;
            self.commands.insert(id, Command::SelectBookmark(name));
        }
        self.layout();
        Ok(())
    }

    fn clear_children(&mut self, parent: NodeId) {
        for child in self.doc.children(parent) {
            self.doc.remove(child);
            self.commands.remove(&child);
        }
    }

    fn layout(&mut self) {
        let doc = &self.doc;
        let area = self.area;
        doc.set_rect(
            self.toolbar.row,
            Rect::new(area.x, area.y, area.width, TOOLBAR_HEIGHT),
        );
        let mut x = area.x;
        for button in self.toolbar.buttons() {
            let width = doc.label(button).map_or(0, |l| l.chars().count() as u16) + 4;
            doc.set_rect(button, Rect::new(x, area.y, width, TOOLBAR_HEIGHT));
            x = x.saturating_add(width + 1);
        }
        doc.set_rect(self.editor, self.editor_area());

        for (name, host) in &self.overlays {
            let root = host.content();
            let rect = if name.is_menu() {
                let Some(toggle) = self.toolbar_button(*name) else {
                    continue;
                };
                let toggle = doc.rect(toggle);
                let items = doc.children(root);
                let width = items
                    .iter()
                    .filter_map(|item| doc.label(*item))
                    .map(|label| label.chars().count() as u16 + 4)
                    .max()
                    .unwrap_or(8);
                Rect::new(toggle.x, toggle.bottom(), width, items.len() as u16 + 2).intersection(area)
            } else {
                let (width, height) = name.dialog_size();
                centered_rect(area, width, height)
            };
            doc.set_rect(root, rect);
            let pad = if name.is_menu() { 1 } else { 2 };
            let inner = Rect::new(
                rect.x.saturating_add(pad),
                rect.y.saturating_add(1),
                rect.width.saturating_sub(pad * 2),
                rect.height.saturating_sub(2),
            );
            stack_rows(doc, root, inner);
        }
    }
}
