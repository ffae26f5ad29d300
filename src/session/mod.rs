//! Reader session: one book/rendition pair, its settings, and the glue
//! between engine events, host events and outbound signals.
//!
//! Event flow:
//!   engine ──EngineEvent──▶ Session::pump ──▶ Signals (typed channels)
//!   host   ──key/hash/unload──▶ Session methods ──▶ Rendition commands
//!
//! `Reader` is the session factory. It owns the engine and the persistence
//! backend shared by every session it opens; each `Session` is an owned
//! value that the host drops (or `close`s) when it is replaced.

pub mod input;
pub mod location;

use std::rc::Rc;
use std::sync::mpsc;

use anyhow::Result;
use crossterm::event::KeyEvent;
use log::{debug, info};

use crate::config::Config;
use crate::engine::{
    BookSource, Direction, Engine, EngineEvent, Metadata, Navigation, Opened, Rendition, Turn,
};
use crate::settings::{
    Annotation, Settings, SettingsPatch, SettingsStore, parse_percent, parse_query,
};
use crate::signal::{PageTurn, Signals};
use crate::storage::Storage;

use input::{Command, InputHandler, KeyOutcome, TurnState};
use location::{History, LocationTracker};

// ---------------------------------------------------------------------------
// Reader — session factory
// ---------------------------------------------------------------------------

pub struct Reader {
    engine: Box<dyn Engine>,
    storage: Rc<dyn Storage>,
    config: Config,
    query: SettingsPatch,
}

impl Reader {
    pub fn new(engine: Box<dyn Engine>, storage: Rc<dyn Storage>, config: Config) -> Self {
        Self {
            engine,
            storage,
            config,
            query: SettingsPatch::default(),
        }
    }

    /// Use the page URL's query string as a settings layer.
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = parse_query(query);
        self
    }

    /// Open `source` as a new session.
    ///
    /// Initializes settings, opens the book in the engine, applies the
    /// stored font size and issues the initial display: the URL fragment if
    /// history is on and one is present, else the previous location, else
    /// the first position. Engine failures propagate unchanged.
    pub fn open(
        &mut self,
        source: BookSource,
        overrides: SettingsPatch,
        history: Box<dyn History>,
    ) -> Result<Session> {
        let store = SettingsStore::initialize(
            source.locator(),
            overrides,
            self.query.clone(),
            &self.config,
            self.storage.clone(),
        );
        let viewport = self.config.viewport.clone();
        info!(
            "session: opening {} into viewport '{viewport}' (key={})",
            source.locator(),
            store.book_key()
        );

        let Opened {
            mut rendition,
            events,
        } = self.engine.open(&source, &viewport)?;
        rendition.set_font_size(&store.settings().styles.font_size);

        let tracker = LocationTracker::new(history, store.settings().history);
        let from_fragment = if store.settings().history {
            tracker.fragment_position()
        } else {
            None
        };
        let start =
            from_fragment.or_else(|| store.settings().previous_location_cfi.clone());
        debug!("session: initial display at {start:?}");
        rendition.display(start.as_deref())?;

        Ok(Session {
            store,
            rendition,
            events,
            tracker,
            input: InputHandler::new(self.config.font),
            signals: Signals::default(),
            viewport,
            default_font: self.config.font.default_size,
            direction: Direction::Ltr,
            metadata: None,
            navigation: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    store: SettingsStore,
    rendition: Box<dyn Rendition>,
    events: mpsc::Receiver<EngineEvent>,
    tracker: LocationTracker,
    input: InputHandler,
    signals: Signals,
    viewport: String,
    default_font: u32,
    direction: Direction,
    metadata: Option<Metadata>,
    navigation: Option<Navigation>,
}

impl Session {
    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn book_key(&self) -> &str {
        self.store.book_key()
    }

    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    /// Last position reported by a relocation or selection.
    pub fn location(&self) -> Option<&str> {
        self.tracker.current()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    pub fn turn_state(&self) -> TurnState {
        self.input.state()
    }

    /// Current font size in percent.
    pub fn font_size(&self) -> u32 {
        parse_percent(&self.settings().styles.font_size).unwrap_or(self.default_font)
    }

    // -- engine events ------------------------------------------------------

    /// Drain every pending engine event (non-blocking). Returns how many
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        debug!("session: engine event {event:?}");
        match event {
            EngineEvent::Displayed => {
                self.signals.rendered.emit(self.viewport.clone());
            }
            EngineEvent::Ready => {
                if self.settings().generate_pagination {
                    debug!("session: pagination requested; not generated");
                }
                self.signals.ready.emit(());
                self.signals.loader.emit(false);
            }
            EngineEvent::MetadataLoaded(meta) => {
                self.direction = Direction::from_declared(meta.direction.as_deref());
                info!(
                    "session: metadata '{}' by '{}' ({:?})",
                    meta.title, meta.creator, self.direction
                );
                self.metadata = Some(meta.clone());
                self.signals.metadata.emit(meta);
            }
            EngineEvent::NavigationLoaded(nav) => {
                self.navigation = Some(nav.clone());
                self.signals.navigation.emit(nav);
            }
            EngineEvent::LayoutChanged(layout) => {
                self.signals.layout.emit(layout);
            }
            EngineEvent::Relocated(loc) => {
                self.tracker.set_location(&loc.start);
                self.finish_turn();
                self.signals.relocated.emit(loc);
            }
            EngineEvent::Selected(sel) => {
                self.tracker.set_location(&sel.cfi);
                self.signals.selected.emit(sel);
            }
            EngineEvent::Clicked { selection_len } => {
                if selection_len == 0 {
                    self.signals.unselected.emit(());
                }
            }
        }
    }

    // -- host events --------------------------------------------------------

    /// Offer a key event. The host must suppress its default behavior for
    /// anything but `KeyOutcome::Ignored`.
    pub fn key_down(&mut self, key: KeyEvent) -> Result<KeyOutcome> {
        let font_size = self.font_size();
        let outcome = self.input.handle_key(key, self.direction, font_size);
        match outcome {
            KeyOutcome::Handled(Some(Command::SetFontSize(size))) => self.set_font_size(size),
            KeyOutcome::Handled(Some(Command::Turn(turn))) => self.turn(turn)?,
            KeyOutcome::Handled(None) | KeyOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    fn turn(&mut self, turn: Turn) -> Result<()> {
        self.signals.page_turn.emit(PageTurn { turn, active: true });
        let moved = match turn {
            Turn::Next => self.rendition.next(),
            Turn::Prev => self.rendition.prev(),
        };
        match moved {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!("session: {turn:?} at the edge, nothing to relocate");
                self.finish_turn();
                Ok(())
            }
            Err(e) => {
                self.finish_turn();
                Err(e)
            }
        }
    }

    /// Release the turn lock and announce the end of the turn in flight.
    fn finish_turn(&mut self) {
        if let Some(turn) = self.input.complete_turn() {
            self.signals.page_turn.emit(PageTurn {
                turn,
                active: false,
            });
        }
    }

    pub fn set_font_size(&mut self, percent: u32) {
        let size = format!("{percent}%");
        self.rendition.set_font_size(&size);
        self.store.settings_mut().styles.font_size = size;
        self.signals.font_size.emit(percent);
    }

    /// The URL fragment changed. Displays the position it names unless it
    /// is empty or already the current location. Returns whether a display
    /// was requested.
    pub fn hash_changed(&mut self, fragment: &str) -> Result<bool> {
        let position = fragment.strip_prefix('#').unwrap_or(fragment);
        if position.is_empty() || self.tracker.current() == Some(position) {
            return Ok(false);
        }
        debug!("session: hash change → display {position}");
        self.rendition.display(Some(position))?;
        Ok(true)
    }

    pub fn display(&mut self, target: Option<&str>) -> Result<()> {
        self.rendition.display(target)
    }

    /// Page teardown. Persists settings when `restore` is on. Returns
    /// whether a record was written.
    pub fn unload(&mut self) -> bool {
        if !self.settings().restore {
            return false;
        }
        let current = self
            .rendition
            .current_location()
            .or_else(|| self.tracker.current().map(str::to_string));
        self.store.persist(current)
    }

    /// Unload and dispose of the session, handing the history back to the
    /// host for the next session.
    pub fn close(mut self) -> Box<dyn History> {
        let persisted = self.unload();
        info!(
            "session: closed {} (persisted={persisted})",
            self.store.book_key()
        );
        self.tracker.into_history()
    }

    // -- persistence --------------------------------------------------------

    pub fn is_persisted(&self) -> bool {
        self.store.is_persisted()
    }

    pub fn clear_persisted(&mut self) -> bool {
        self.store.clear_persisted()
    }

    // -- bookmarks ----------------------------------------------------------

    pub fn is_bookmarked(&self, cfi: &str) -> bool {
        self.settings().bookmarks.iter().any(|b| b == cfi)
    }

    /// Add `cfi` to the bookmarks. Returns false if it was already there.
    pub fn add_bookmark(&mut self, cfi: &str) -> bool {
        if self.is_bookmarked(cfi) {
            return false;
        }
        self.store.settings_mut().bookmarks.push(cfi.to_string());
        self.signals.bookmarked.emit(cfi.to_string());
        true
    }

    /// Returns whether `cfi` was bookmarked.
    pub fn remove_bookmark(&mut self, cfi: &str) -> bool {
        let bookmarks = &mut self.store.settings_mut().bookmarks;
        let before = bookmarks.len();
        bookmarks.retain(|b| b != cfi);
        let removed = bookmarks.len() != before;
        if removed {
            self.signals.unbookmarked.emit(cfi.to_string());
        }
        removed
    }

    pub fn clear_bookmarks(&mut self) {
        let removed = std::mem::take(&mut self.store.settings_mut().bookmarks);
        for cfi in removed {
            self.signals.unbookmarked.emit(cfi);
        }
    }

    // -- annotations --------------------------------------------------------

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.store.settings_mut().annotations.push(annotation);
    }

    /// Remove every annotation anchored at `cfi`. Returns how many went.
    pub fn remove_annotation(&mut self, cfi: &str) -> usize {
        let annotations = &mut self.store.settings_mut().annotations;
        let before = annotations.len();
        annotations.retain(|a| a.cfi != cfi);
        before - annotations.len()
    }

    pub fn clear_annotations(&mut self) {
        self.store.settings_mut().annotations.clear();
    }
}
