//! Request/response boundary between the shell's dialogs and the document
//! services behind them.

use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    /// Find the first misspelled word in `text` and suggest corrections.
    CheckSpelling { text: String },
    ListBookmarks,
    DeleteBookmark { name: String },
    ReplaceAll {
        text: String,
        find: String,
        replace: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    Spelling {
        word: Option<String>,
        suggestions: Vec<String>,
    },
    Bookmarks(Vec<String>),
    Deleted { name: String, existed: bool },
    Replaced { text: String, count: usize },
}

/// Asynchronous document services. Requests are answered on some later
/// `poll`, never inside `submit`.
pub trait ShellBackend {
    fn submit(&mut self, request: BackendRequest) -> RequestId;
    fn poll(&mut self) -> Vec<(RequestId, BackendResponse)>;
}

impl<T: ShellBackend + ?Sized> ShellBackend for Box<T> {
    fn submit(&mut self, request: BackendRequest) -> RequestId {
        (**self).submit(request)
    }

    fn poll(&mut self) -> Vec<(RequestId, BackendResponse)> {
        (**self).poll()
    }
}

const MISSPELLINGS: &[(&str, &[&str])] = &[
    ("teh", &["the", "ten", "tech"]),
    ("recieve", &["receive"]),
    ("wierd", &["weird", "wired"]),
    ("seperate", &["separate"]),
];

#[derive(Debug)]
struct Pending {
    id: RequestId,
    frames_left: u32,
    request: BackendRequest,
}

/// Backend that answers every request after a fixed number of polls.
#[derive(Debug)]
pub struct InMemoryBackend {
    latency_frames: u32,
    next_id: u64,
    pending: VecDeque<Pending>,
    bookmarks: Vec<String>,
}

impl InMemoryBackend {
    pub fn new(latency_frames: u32) -> Self {
        Self {
            latency_frames,
            next_id: 1,
            pending: VecDeque::new(),
            bookmarks: vec!["intro".into(), "methods".into(), "summary".into()],
        }
    }

    pub fn with_bookmarks(mut self, bookmarks: impl IntoIterator<Item = String>) -> Self {
        self.bookmarks = bookmarks.into_iter().collect();
        self
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn answer(&mut self, request: BackendRequest) -> BackendResponse {
        match request {
            BackendRequest::CheckSpelling { text } => {
                let hit = text.split_whitespace().find_map(|raw| {
                    let word = raw
                        .trim_matches(|c: char| !c.is_alphanumeric())
                        .to_lowercase();
                    MISSPELLINGS
                        .iter()
                        .find(|(wrong, _)| *wrong == word)
                        .map(|(_, fixes)| (raw.trim_matches(|c: char| !c.is_alphanumeric()), *fixes))
                });
                match hit {
                    Some((word, fixes)) => BackendResponse::Spelling {
                        word: Some(word.to_string()),
                        suggestions: fixes.iter().map(|s| s.to_string()).collect(),
                    },
                    None => BackendResponse::Spelling {
                        word: None,
                        suggestions: Vec::new(),
                    },
                }
            }
            BackendRequest::ListBookmarks => BackendResponse::Bookmarks(self.bookmarks.clone()),
            BackendRequest::DeleteBookmark { name } => {
                let before = self.bookmarks.len();
                self.bookmarks.retain(|b| *b != name);
                let existed = self.bookmarks.len() != before;
                BackendResponse::Deleted { name, existed }
            }
            BackendRequest::ReplaceAll {
                text,
                find,
                replace,
            } => {
                if find.is_empty() {
                    return BackendResponse::Replaced { text, count: 0 };
                }
                let count = text.matches(find.as_str()).count();
                BackendResponse::Replaced {
                    text: text.replace(find.as_str(), &replace),
                    count,
                }
            }
        }
    }
}

impl ShellBackend for InMemoryBackend {
    fn submit(&mut self, request: BackendRequest) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        tracing::debug!(request = %id, kind = ?request, "backend request submitted");
        self.pending.push_back(Pending {
            id,
            frames_left: self.latency_frames,
            request,
        });
        id
    }

    fn poll(&mut self) -> Vec<(RequestId, BackendResponse)> {
        let mut ready = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.pending.len());
        while let Some(mut pending) = self.pending.pop_front() {
            if pending.frames_left == 0 {
                ready.push(pending);
            } else {
                pending.frames_left -= 1;
                waiting.push_back(pending);
            }
        }
        self.pending = waiting;
        ready
            .into_iter()
            .map(|pending| (pending.id, self.answer(pending.request)))
            .collect()
    }
}
