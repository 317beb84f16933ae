//! Highlight rendering seam and the in-memory host document.
//!
//! The highlight engine never touches document structure itself.  It asks a
//! [`HighlightSurface`] to *render a highlight region for (container, text,
//! sentence index)* and later to *unrender by handle*.
//!
//! [`TextDocument`] is the in-process surface: an ordered list of
//! containers, each holding a sequence of text nodes.  A sentence is found
//! by searching the concatenation of consecutive text nodes, so it may span
//! node boundaries.  Wrapping splits the first and last touched nodes and
//! replaces the span with a mark; unwrapping puts the original nodes back
//! exactly.
//!
//! ```text
//! before:  Text("Hello wor") Text("ld. Bye.")
//! wrap "Hello world.":
//!          Mark{"Hello world."} Text(" Bye.")        original = both nodes
//! unwrap:  Text("Hello wor") Text("ld. Bye.")
//! ```

/// Index of a container in the document.
pub type ContainerId = usize;

/// Handle to one rendered highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightHandle {
    pub id: u64,
    pub sentence: usize,
}

/// Where highlights are drawn.
pub trait HighlightSurface {
    /// Wrap the first occurrence of `text`, searching `container` first and
    /// then the whole document.  `None` when the text is nowhere to be found.
    fn render(
        &mut self,
        container: ContainerId,
        text: &str,
        sentence: usize,
    ) -> Option<HighlightHandle>;

    /// Remove the highlight and restore what it covered.  Unknown handles
    /// are ignored.  Overlapping highlights must be removed newest first.
    fn unrender(&mut self, handle: HighlightHandle);

    /// Remove every highlight marker still present.  Returns how many were
    /// found.
    fn sweep_orphans(&mut self) -> usize;

    fn is_fully_visible(&self, handle: HighlightHandle) -> bool;

    /// Smoothly scroll so the highlight sits in the middle of the viewport.
    fn scroll_to_center(&mut self, handle: HighlightHandle);
}

// ---------------------------------------------------------------------------
// TextDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Mark(Mark),
}

#[derive(Debug, Clone, PartialEq)]
struct Mark {
    handle: HighlightHandle,
    text: String,
    /// A split-off prefix node sits immediately before the mark.
    before: bool,
    /// A split-off suffix node sits immediately after the mark.
    after: bool,
    original: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
struct Container {
    nodes: Vec<Node>,
    /// Layout: top edge and height in pixels.
    top: f64,
    height: f64,
}

impl Container {
    fn plain_text(&self) -> String {
        self.nodes
            .iter()
            .map(|n| match n {
                Node::Text(t) => t.as_str(),
                Node::Mark(m) => m.text.as_str(),
            })
            .collect()
    }
}

/// Vertical window onto the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
}

/// In-memory host document with a simple vertical layout.
#[derive(Debug, Clone)]
pub struct TextDocument {
    containers: Vec<Container>,
    viewport: Viewport,
    line_height: f64,
    next_id: u64,
    scrolls: Vec<f64>,
}

impl TextDocument {
    /// One container per paragraph, each made of the given text nodes.
    /// Containers are stacked with `line_height` per 80 characters.
    pub fn new<P, N>(paragraphs: P, viewport_height: f64) -> Self
    where
        P: IntoIterator<Item = N>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let line_height = 20.0;
        let mut top = 0.0;
        let containers = paragraphs
            .into_iter()
            .map(|nodes| {
                let texts: Vec<String> = nodes.into_iter().map(Into::into).collect();
                let chars: usize = texts.iter().map(|t| t.chars().count()).sum();
                let nodes = texts.into_iter().map(Node::Text).collect();
                let height = ((chars / 80) + 1) as f64 * line_height;
                let c = Container { nodes, top, height };
                top += height;
                c
            })
            .collect();

        Self {
            containers,
            viewport: Viewport {
                scroll_top: 0.0,
                height: viewport_height,
            },
            line_height,
            next_id: 1,
            scrolls: Vec::new(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Every scroll target requested so far.
    pub fn scroll_history(&self) -> &[f64] {
        &self.scrolls
    }

    /// Text content of `container`, marks included.
    pub fn container_text(&self, container: ContainerId) -> Option<String> {
        self.containers.get(container).map(Container::plain_text)
    }

    /// Number of highlight markers present anywhere.
    pub fn mark_count(&self) -> usize {
        self.containers
            .iter()
            .flat_map(|c| &c.nodes)
            .filter(|n| matches!(n, Node::Mark(_)))
            .count()
    }

    /// Text of the marker for `handle`, if rendered.
    pub fn marked_text(&self, handle: HighlightHandle) -> Option<&str> {
        self.find_mark(handle)
            .and_then(|(c, i)| match &self.containers[c].nodes[i] {
                Node::Mark(m) => Some(m.text.as_str()),
                Node::Text(_) => None,
            })
    }

    /// Structural snapshot for equality checks.
    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.containers
            .iter()
            .map(|c| {
                c.nodes
                    .iter()
                    .map(|n| match n {
                        Node::Text(t) => t.clone(),
                        Node::Mark(m) => format!("<mark>{}</mark>", m.text),
                    })
                    .collect()
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Search / wrap helpers
    // -----------------------------------------------------------------------

    /// First match of `needle` in `container`: (first node, byte offset in
    /// it, last node, byte end in it).
    fn locate(&self, container: ContainerId, needle: &str) -> Option<(usize, usize, usize, usize)> {
        let nodes = &self.containers.get(container)?.nodes;
        let mut i = 0;
        while i < nodes.len() {
            if matches!(nodes[i], Node::Mark(_)) {
                i += 1;
                continue;
            }
            // A run of consecutive text nodes.
            let run_start = i;
            let mut joined = String::new();
            let mut starts = Vec::new();
            while let Some(Node::Text(t)) = nodes.get(i) {
                starts.push(joined.len());
                joined.push_str(t);
                i += 1;
            }
            if let Some(at) = joined.find(needle) {
                let end = at + needle.len();
                let node_of = |offset: usize, inclusive_end: bool| {
                    starts
                        .iter()
                        .rposition(|&s| if inclusive_end { s < offset } else { s <= offset })
                        .unwrap_or(0)
                };
                let first = node_of(at, false);
                let last = node_of(end, true);
                return Some((
                    run_start + first,
                    at - starts[first],
                    run_start + last,
                    end - starts[last],
                ));
            }
        }
        None
    }

    fn wrap(
        &mut self,
        container: ContainerId,
        span: (usize, usize, usize, usize),
        sentence: usize,
    ) -> HighlightHandle {
        let (first, start, last, end) = span;
        let handle = HighlightHandle {
            id: self.next_id,
            sentence,
        };
        self.next_id += 1;

        let nodes = &mut self.containers[container].nodes;
        let original: Vec<Node> = nodes[first..=last].to_vec();
        let text_of = |n: &Node| match n {
            Node::Text(t) => t.clone(),
            Node::Mark(m) => m.text.clone(),
        };
        let first_text = text_of(&original[0]);
        let last_text = text_of(&original[original.len() - 1]);

        let prefix = first_text[..start].to_string();
        let suffix = last_text[end..].to_string();
        let marked: String = if first == last {
            first_text[start..end].to_string()
        } else {
            let mut s = first_text[start..].to_string();
            for n in &original[1..original.len() - 1] {
                s.push_str(&text_of(n));
            }
            s.push_str(&last_text[..end]);
            s
        };

        let mut replacement = Vec::with_capacity(3);
        if !prefix.is_empty() {
            replacement.push(Node::Text(prefix.clone()));
        }
        replacement.push(Node::Mark(Mark {
            handle,
            text: marked,
            before: !prefix.is_empty(),
            after: !suffix.is_empty(),
            original,
        }));
        if !suffix.is_empty() {
            replacement.push(Node::Text(suffix));
        }
        nodes.splice(first..=last, replacement);
        handle
    }

    fn find_mark(&self, handle: HighlightHandle) -> Option<(ContainerId, usize)> {
        self.containers.iter().enumerate().find_map(|(c, container)| {
            container
                .nodes
                .iter()
                .position(|n| matches!(n, Node::Mark(m) if m.handle == handle))
                .map(|i| (c, i))
        })
    }

    fn newest_mark(&self) -> Option<(ContainerId, usize)> {
        self.containers
            .iter()
            .enumerate()
            .flat_map(|(c, container)| {
                container.nodes.iter().enumerate().filter_map(move |(i, n)| match n {
                    Node::Mark(m) => Some((m.handle.id, c, i)),
                    Node::Text(_) => None,
                })
            })
            .max_by_key(|&(id, _, _)| id)
            .map(|(_, c, i)| (c, i))
    }

    fn unwrap_at(&mut self, container: ContainerId, index: usize) {
        let nodes = &mut self.containers[container].nodes;
        let Node::Mark(mark) = nodes[index].clone() else {
            return;
        };
        let from = if mark.before { index - 1 } else { index };
        let to = if mark.after { index + 1 } else { index };
        nodes.splice(from..=to, mark.original);
    }

    /// Vertical extent of a mark: (top, bottom).
    fn extent(&self, handle: HighlightHandle) -> Option<(f64, f64)> {
        let (c, index) = self.find_mark(handle)?;
        let container = &self.containers[c];
        let total: usize = container.plain_text().chars().count().max(1);
        let preceding: usize = container.nodes[..index]
            .iter()
            .map(|n| match n {
                Node::Text(t) => t.chars().count(),
                Node::Mark(m) => m.text.chars().count(),
            })
            .sum();
        let top = container.top
            + (preceding as f64 / total as f64) * (container.height - self.line_height).max(0.0);
        Some((top, top + self.line_height))
    }
}

impl HighlightSurface for TextDocument {
    fn render(
        &mut self,
        container: ContainerId,
        text: &str,
        sentence: usize,
    ) -> Option<HighlightHandle> {
        if text.is_empty() {
            return None;
        }
        if let Some(span) = self.locate(container, text) {
            return Some(self.wrap(container, span, sentence));
        }
        let fallback = (0..self.containers.len())
            .filter(|&c| c != container)
            .find_map(|c| self.locate(c, text).map(|span| (c, span)));
        match fallback {
            Some((c, span)) => {
                log::debug!("highlight: sentence {sentence} found outside its container");
                Some(self.wrap(c, span, sentence))
            }
            None => None,
        }
    }

    fn unrender(&mut self, handle: HighlightHandle) {
        if let Some((c, i)) = self.find_mark(handle) {
            self.unwrap_at(c, i);
        }
    }

    fn sweep_orphans(&mut self) -> usize {
        let mut swept = 0;
        // Newest first: a later mark may have split a node owned by an
        // earlier one.
        while let Some((c, i)) = self.newest_mark() {
            self.unwrap_at(c, i);
            swept += 1;
        }
        swept
    }

    fn is_fully_visible(&self, handle: HighlightHandle) -> bool {
        match self.extent(handle) {
            Some((top, bottom)) => {
                top >= self.viewport.scroll_top
                    && bottom <= self.viewport.scroll_top + self.viewport.height
            }
            None => false,
        }
    }

    fn scroll_to_center(&mut self, handle: HighlightHandle) {
        if let Some((top, bottom)) = self.extent(handle) {
            let target = ((top + bottom) / 2.0 - self.viewport.height / 2.0).max(0.0);
            self.viewport.scroll_top = target;
            self.scrolls.push(target);
        }
    }
}
