//! Statement segmentation: groups classified rows into per-statement segments.
//!
//! Statement documents are a flat run of pages; the only structure left is the
//! header block, the transaction body and the closing balance row. The
//! segmenter recovers it with a small state machine:
//!
//! ```text
//! Idle     --HeaderField-->             InHeader
//! InHeader --HeaderField-->             InHeader
//! InHeader --Transaction-->             InBody
//! InHeader --Footer-->                  Closed   (statement without movements)
//! InBody   --Transaction|Continuation-> InBody
//! InBody   --Footer-->                  Closed
//! InBody   --HeaderField-->             InHeader (open segment is incomplete)
//! Closed   --*-->                       as Idle
//! ```
//!
//! Noise never causes a transition. A transaction line seen while Idle is
//! reported as stray; other rows outside a statement are dropped.

use tracing::debug;
use vypis_core::{ClassifiedRow, IncompleteReason, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    Idle,
    InHeader,
    InBody,
    Closed,
}

/// Rows of one logical statement, owned exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSegment {
    pub header: Vec<ClassifiedRow>,
    pub body: Vec<ClassifiedRow>,
    pub footer: ClassifiedRow,
}

impl StatementSegment {
    /// Provenance of the row that opened the segment.
    pub fn opened_at(&self) -> (u32, u32) {
        self.header
            .first()
            .map(|r| (r.row.page, r.row.index))
            .unwrap_or((self.footer.row.page, self.footer.row.index))
    }

    /// Header rows followed by the footer row.
    pub fn metadata_rows(&self) -> impl Iterator<Item = &ClassifiedRow> {
        self.header.iter().chain(std::iter::once(&self.footer))
    }
}

/// What the segmenter produced for one input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentEvent {
    Closed(StatementSegment),
    Incomplete {
        page: u32,
        index: u32,
        reason: IncompleteReason,
    },
    /// Transaction line outside any statement.
    Stray { page: u32, index: u32 },
}

#[derive(Debug, Default)]
struct OpenSegment {
    header: Vec<ClassifiedRow>,
    body: Vec<ClassifiedRow>,
}

impl OpenSegment {
    fn opened_at(&self) -> (u32, u32) {
        self.header
            .first()
            .map(|r| (r.row.page, r.row.index))
            .unwrap_or_default()
    }

    fn abandon(self) -> SegmentEvent {
        let (page, index) = self.opened_at();
        SegmentEvent::Incomplete {
            page,
            index,
            reason: IncompleteReason::MissingFooter,
        }
    }
}

#[derive(Debug)]
pub struct Segmenter {
    state: SegmenterState,
    open: Option<OpenSegment>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            open: None,
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Feed the next classified row.
    pub fn push(&mut self, row: ClassifiedRow) -> Option<SegmentEvent> {
        if self.state == SegmenterState::Closed {
            self.state = SegmenterState::Idle;
        }

        match (self.state, row.role) {
            (_, Role::Noise) => None,

            (SegmenterState::Idle, Role::HeaderField) => {
                self.open_with(row);
                None
            }
            (SegmenterState::Idle, Role::Transaction) => Some(SegmentEvent::Stray {
                page: row.row.page,
                index: row.row.index,
            }),
            (SegmenterState::Idle, role) => {
                debug!(
                    "Ignoring {} row outside a statement (page {}, row {})",
                    role, row.row.page, row.row.index
                );
                None
            }

            (SegmenterState::InHeader, Role::HeaderField) => {
                self.current().header.push(row);
                None
            }
            (SegmenterState::InHeader, Role::Transaction) => {
                self.current().body.push(row);
                self.state = SegmenterState::InBody;
                None
            }
            (SegmenterState::InHeader, Role::Continuation) => {
                // Cannot follow a header row by construction of the classifier.
                debug!("Ignoring continuation row inside header block");
                None
            }

            (SegmenterState::InBody, Role::Transaction | Role::Continuation) => {
                self.current().body.push(row);
                None
            }
            (SegmenterState::InBody, Role::HeaderField) => {
                let abandoned = self.open.take().map(OpenSegment::abandon);
                self.open_with(row);
                abandoned
            }

            (SegmenterState::InHeader | SegmenterState::InBody, Role::Footer) => {
                let open = self.open.take().unwrap_or_default();
                self.state = SegmenterState::Closed;
                Some(SegmentEvent::Closed(StatementSegment {
                    header: open.header,
                    body: open.body,
                    footer: row,
                }))
            }

            (SegmenterState::Closed, _) => unreachable!("closed state is reset on entry"),
        }
    }

    /// Signal end of input. An open segment is reported as incomplete.
    pub fn finish(mut self) -> Option<SegmentEvent> {
        self.state = SegmenterState::Idle;
        self.open.take().map(OpenSegment::abandon)
    }

    fn open_with(&mut self, row: ClassifiedRow) {
        self.open = Some(OpenSegment {
            header: vec![row],
            body: Vec::new(),
        });
        self.state = SegmenterState::InHeader;
    }

    fn current(&mut self) -> &mut OpenSegment {
        self.open.get_or_insert_with(OpenSegment::default)
    }
}
