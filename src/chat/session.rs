use tracing::{debug, info, warn};

use super::citations::{link_citations, scan_citations, scan_document_refs, CitationLink, DocumentRef};
use super::markup::{self, Trust};
use super::normalize::normalize;
use super::sources::{group_sources, render_groups, render_sources, SourceGroups};
use super::types::{ChatRequest, ChatResponse};

pub const GREETING: &str = "Operating in offline mode with cached Technical Order information. Ask questions about aircraft maintenance and refueling procedures.";
pub const FAILURE_TEXT: &str =
    "Sorry, there was an error processing your request. Please try again.";

pub type TurnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Pending(TurnId),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub role: Role,
    /// Complete message bubble markup.
    pub markup: String,
    pub at: i64,
}

/// Result of submitting a message to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The message was recorded and a request should be dispatched.
    Started { id: TurnId, request: ChatRequest },
    /// Blank input; nothing happened.
    Empty,
    /// Another request is still outstanding.
    Busy,
}

/// What a completed turn rendered.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Display text after the trust policy was applied.
    pub answer: String,
    pub sources: String,
    pub citations: Vec<CitationLink>,
    pub document_refs: Vec<DocumentRef>,
    pub online: bool,
}

/// State of one conversation: transcript, connection flag, selected
/// document, the current source groups and the in-flight turn.
#[derive(Debug, Clone)]
pub struct Session {
    online: bool,
    selected_document: Option<String>,
    transcript: Vec<Entry>,
    groups: SourceGroups,
    sources_markup: String,
    citations: Vec<CitationLink>,
    turn: TurnState,
    next_turn: TurnId,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut session = Self {
            online: false,
            selected_document: None,
            transcript: Vec::new(),
            groups: SourceGroups::new(),
            sources_markup: String::new(),
            citations: Vec::new(),
            turn: TurnState::Idle,
            next_turn: 1,
        };
        session.push(Role::System, markup::system_message(GREETING));
        session
    }

    fn push(&mut self, role: Role, markup: String) {
        self.transcript.push(Entry {
            role,
            markup,
            at: chrono::Utc::now().timestamp(),
        });
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.turn, TurnState::Pending(_))
    }

    pub fn transcript(&self) -> &[Entry] {
        &self.transcript
    }

    pub fn selected_document(&self) -> Option<&str> {
        self.selected_document.as_deref()
    }

    pub fn select_document(&mut self, document: Option<String>) {
        self.selected_document = document.filter(|d| !d.trim().is_empty());
    }

    pub fn groups(&self) -> &SourceGroups {
        &self.groups
    }

    /// Accordion markup from the last completed turn; empty before any.
    pub fn sources_markup(&self) -> &str {
        &self.sources_markup
    }

    pub fn citations(&self) -> &[CitationLink] {
        &self.citations
    }

    /// Record the user's message and enter the pending state.
    /// Refused while an earlier request is still outstanding.
    pub fn begin_turn(&mut self, message: &str) -> Submission {
        let message = message.trim();
        if message.is_empty() {
            return Submission::Empty;
        }
        if let TurnState::Pending(id) = self.turn {
            debug!(pending = id, "Submission refused, request in flight");
            return Submission::Busy;
        }

        let id = self.next_turn;
        self.next_turn += 1;
        self.turn = TurnState::Pending(id);
        self.push(Role::User, markup::user_message(message));

        Submission::Started {
            id,
            request: ChatRequest {
                message: message.to_string(),
                document: self.selected_document.clone(),
            },
        }
    }

    /// Leave the pending state if `id` is the outstanding turn.
    fn settle(&mut self, id: TurnId) -> bool {
        if self.turn == TurnState::Pending(id) {
            self.turn = TurnState::Done;
            true
        } else {
            warn!(turn = id, state = ?self.turn, "Ignoring completion for stale turn");
            false
        }
    }

    fn set_online(&mut self, online: bool) {
        if self.online != online {
            info!(online, "Connection status changed");
        }
        self.online = online;
    }

    /// Apply a successful reply. Returns `None` for a stale turn.
    pub fn complete_turn(
        &mut self,
        id: TurnId,
        response: &ChatResponse,
        trust: Trust,
    ) -> Option<TurnOutcome> {
        if !self.settle(id) {
            return None;
        }
        self.set_online(response.api_available);

        let answer = trust.apply(&normalize(&response.payload));
        self.push(Role::Assistant, markup::assistant_message(&answer));

        self.groups = group_sources(&response.sources);
        self.sources_markup = render_sources(&response.sources, trust);
        self.citations = link_citations(scan_citations(&answer), &self.groups);
        let document_refs = scan_document_refs(&answer, &self.groups);

        debug!(
            turn = id,
            groups = self.groups.len(),
            citations = self.citations.len(),
            "Turn completed"
        );

        Some(TurnOutcome {
            answer,
            sources: self.sources_markup.clone(),
            citations: self.citations.clone(),
            document_refs,
            online: self.online,
        })
    }

    /// Apply a transport or server failure: the session goes offline and
    /// the apology is shown in place of an answer. Returns `None` for a stale turn.
    pub fn fail_turn(&mut self, id: TurnId) -> Option<String> {
        if !self.settle(id) {
            return None;
        }
        self.set_online(false);
        self.push(Role::Assistant, markup::assistant_message(FAILURE_TEXT));
        Some(FAILURE_TEXT.to_string())
    }

    /// Follow citation `index` (zero-based) from the last answer: its document
    /// becomes the selected one. Returns the link and, when its group was
    /// rendered, that group's accordion markup.
    pub fn activate_citation(
        &mut self,
        index: usize,
        trust: Trust,
    ) -> Option<(CitationLink, Option<String>)> {
        let link = self.citations.get(index)?.clone();
        if let Some(document) = &link.citation.document {
            self.selected_document = Some(document.clone());
        }

        let markup = link
            .group
            .and_then(|pos| self.groups.nth(pos))
            .map(|(document, records)| {
                let mut single = SourceGroups::new();
                for record in records {
                    single.push(document.clone(), record.clone());
                }
                render_groups(&single, trust)
            });

        Some((link, markup))
    }

    /// Full conversation view: status bar, messages, loading indicator
    /// while a request is pending, then the sources panel.
    pub fn render_view(&self) -> String {
        let mut html = format!(
            r#"<div id="connection-status">{}</div><div id="chat-messages">"#,
            markup::connection_status(self.online)
        );
        for entry in &self.transcript {
            html.push_str(&entry.markup);
        }
        if self.is_pending() {
            html.push_str(&markup::loading_indicator());
        }
        html.push_str(r#"</div><div id="sources-container">"#);
        html.push_str(&self.sources_markup);
        html.push_str("</div>");
        html
    }
}
