//! Rendering engine seam.
//!
//! Parsing, pagination, CFI resolution and text reflow all live behind
//! these traits. The session only issues display/turn commands and consumes
//! the lifecycle events the engine reports back.
//!
//! Completions are delivered over an `mpsc::Receiver<EngineEvent>` handed out
//! by `Engine::open`. The session drains it with `try_recv()`, so events are
//! processed in exactly the order the engine sent them.

use std::sync::mpsc;

use anyhow::Result;

/// Where the book comes from.
#[derive(Debug, Clone)]
pub enum BookSource {
    /// URL or filesystem path.
    Path(String),
    /// Raw bytes already read into memory (upload path).
    Bytes { name: String, data: Vec<u8> },
}

impl BookSource {
    /// Locator string used as `bookPath` (and thus for the persistence key).
    pub fn locator(&self) -> &str {
        match self {
            BookSource::Path(p) => p,
            BookSource::Bytes { name, .. } => name,
        }
    }
}

/// Declared page progression direction of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    /// Interpret a declared direction string. Anything but `rtl` is left-to-right.
    pub fn from_declared(declared: Option<&str>) -> Self {
        match declared {
            Some(d) if d.eq_ignore_ascii_case("rtl") => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }
}

/// A page turn request, in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Next,
    Prev,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub creator: String,
    pub language: Option<String>,
    /// Raw declared direction (`"rtl"`, `"ltr"`, or absent).
    pub direction: Option<String>,
}

/// One entry of the table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct NavPoint {
    pub label: String,
    pub href: String,
    pub children: Vec<NavPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Navigation {
    pub toc: Vec<NavPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Layout {
    pub spread: bool,
    pub width: u32,
    pub height: u32,
}

/// Current visible range after a relocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub start: String,
    pub end: Option<String>,
    pub at_start: bool,
    pub at_end: bool,
}

impl Location {
    pub fn at(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            at_start: false,
            at_end: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub cfi: String,
    pub text: Option<String>,
}

/// Lifecycle and interaction events reported by a rendition.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The initial display request completed.
    Displayed,
    Ready,
    MetadataLoaded(Metadata),
    NavigationLoaded(Navigation),
    LayoutChanged(Layout),
    Relocated(Location),
    Selected(Selection),
    /// A click inside the content; `selection_len` is the length of the
    /// selection left behind by the click.
    Clicked { selection_len: usize },
}

/// Live view of one book bound to a viewport.
pub trait Rendition {
    /// Display `target`, or the first position when `None`.
    fn display(&mut self, target: Option<&str>) -> Result<()>;
    /// Turn forward. Returns `false` when already at the end, in which case
    /// no `Relocated` event follows.
    fn next(&mut self) -> Result<bool>;
    /// Turn back. Returns `false` when already at the start.
    fn prev(&mut self) -> Result<bool>;
    /// Apply a font size such as `"102%"`.
    fn set_font_size(&mut self, size: &str);
    /// Start CFI of the currently displayed range, if anything is displayed.
    fn current_location(&self) -> Option<String>;
}

/// An opened book: the rendition plus its event stream.
pub struct Opened {
    pub rendition: Box<dyn Rendition>,
    pub events: mpsc::Receiver<EngineEvent>,
}

pub trait Engine {
    /// Open `source` and bind a rendition to the viewport named `viewport`.
    fn open(&mut self, source: &BookSource, viewport: &str) -> Result<Opened>;
}
