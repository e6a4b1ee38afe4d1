//! Copy buttons for code blocks.
//!
//! The [`Augmentor`] runs once, after the page structure is available: it
//! finds every code block, puts one copy control next to each, and handles
//! activations of those controls by sending the block's text to a
//! [`Clipboard`].
//!
//! A control has two visible states. It starts with the default label
//! ("Copy"), switches to the confirmed label ("Copied!") when a copy succeeds,
//! and a one-shot timer switches it back after the revert delay. Every
//! activation schedules its own timer and nothing is ever cancelled, so
//! overlapping activations resolve to whichever write lands last.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::clipboard::Clipboard;
use crate::config::Settings;
use crate::document::{Document, NodeId};

/// A page shared between the host and pending activations.
pub type SharedDocument = Arc<Mutex<Document>>;

pub fn share(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Lock a shared page. A panic elsewhere never leaves the tree half-edited
/// (every mutation is a single call), so a poisoned lock is still usable.
pub fn lock(document: &SharedDocument) -> MutexGuard<'_, Document> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An element holding snippet text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeBlock(NodeId);

impl CodeBlock {
    pub fn node(self) -> NodeId {
        self.0
    }
}

/// Where a control went relative to its block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Sibling right before the block's wrapper container.
    BeforeContainer,
    /// First child of the block's container, next to the code.
    FirstChild,
}

/// The button attached to one code block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyControl {
    node: NodeId,
    block: CodeBlock,
    placement: Placement,
}

impl CopyControl {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn block(&self) -> CodeBlock {
        self.block
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

/// What an activation did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// The text reached the clipboard and the control shows the confirmation.
    Copied,
    /// The clipboard refused the text. The error has been logged.
    Failed,
    /// The control or its block is no longer part of the page; nothing was sent.
    Inert,
}

pub struct Augmentor<C> {
    settings: Settings,
    clipboard: Arc<C>,
}

impl<C> Augmentor<C> {
    pub fn new(settings: Settings, clipboard: C) -> Self {
        Self::with_shared_clipboard(settings, Arc::new(clipboard))
    }

    pub fn with_shared_clipboard(settings: Settings, clipboard: Arc<C>) -> Self {
        Self {
            settings,
            clipboard,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn clipboard(&self) -> &Arc<C> {
        &self.clipboard
    }

    /// Every code block currently in `document`, in document order.
    pub fn discover<'d>(&self, document: &'d Document) -> impl Iterator<Item = CodeBlock> + 'd {
        let tag = self.settings.block_tag.to_ascii_lowercase();
        let parent_tag = self
            .settings
            .block_parent_tag
            .as_deref()
            .map(str::to_ascii_lowercase);
        document
            .descendants(document.root())
            .filter(move |n| document.tag(*n) == Some(tag.as_str()))
            .filter(move |n| match &parent_tag {
                Some(want) => document
                    .parent(*n)
                    .and_then(|p| document.tag(p))
                    .is_some_and(|t| t == want.as_str()),
                None => true,
            })
            .map(CodeBlock)
    }

    /// Create a control for `block` and insert it into the page.
    pub fn attach(&self, document: &mut Document, block: CodeBlock) -> CopyControl {
        let control = document.create_element(&self.settings.control_tag);
        document.set_attr(control, "type", "button");
        if !self.settings.control_class.is_empty() {
            document.set_attr(control, "class", &self.settings.control_class);
        }
        document.set_text_content(control, &self.settings.default_label);

        let container = document.parent(block.0).unwrap_or(document.root());
        let wrapper_parent = document
            .parent(container)
            .filter(|_| document.has_class(container, &self.settings.container_class));

        let placement = match wrapper_parent {
            Some(outer) => {
                document.insert_before(outer, control, container);
                Placement::BeforeContainer
            }
            None => {
                document.prepend_child(container, control);
                Placement::FirstChild
            }
        };
        debug!(block = %block.0, control = %control, ?placement, "attached copy control");

        CopyControl {
            node: control,
            block,
            placement,
        }
    }

    /// One augmentation pass: attach a control to every block found.
    ///
    /// Call this once per page. A second pass would put a second control on
    /// every block.
    pub fn run(&self, document: &mut Document) -> Vec<CopyControl> {
        let blocks: Vec<CodeBlock> = self.discover(document).collect();
        let controls: Vec<CopyControl> = blocks
            .into_iter()
            .map(|block| self.attach(document, block))
            .collect();
        info!(controls = controls.len(), "code blocks augmented");
        controls
    }
}

impl<C: Clipboard> Augmentor<C> {
    /// Handle a click on `control`.
    ///
    /// Reads the block's current text, sends it to the clipboard and, once
    /// the clipboard accepts it, shows the confirmed label and schedules the
    /// revert. A refused copy is logged and never reaches the caller.
    ///
    /// The revert timer runs on the current tokio runtime. Polled outside
    /// one, the copy still happens but the label is left at its default.
    pub async fn on_activate(&self, document: &SharedDocument, control: &CopyControl) -> Activation {
        let text = {
            let doc = lock(document);
            if !doc.is_attached(control.node) || !doc.is_attached(control.block.0) {
                debug!(control = %control.node, "ignoring activation of orphaned control");
                return Activation::Inert;
            }
            doc.text_content(control.block.0)
        };

        debug!(control = %control.node, bytes = text.len(), "copying code block");
        match self.clipboard.write(text).await {
            Ok(()) => {
                self.show_transient(document, control.node, &self.settings.confirmed_label);
                Activation::Copied
            }
            Err(e) => {
                warn!(control = %control.node, "copy failed: {e}");
                if let Some(label) = &self.settings.failure_label {
                    self.show_transient(document, control.node, label);
                }
                Activation::Failed
            }
        }
    }

    /// Set `label` now and put the default label back after the revert delay.
    fn show_transient(&self, document: &SharedDocument, control: NodeId, label: &str) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(control = %control, "no tokio runtime to revert the label, leaving it as is");
            return;
        };
        set_label(document, control, label);

        let document = Arc::clone(document);
        let default_label = self.settings.default_label.clone();
        let delay = self.settings.revert_delay();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            set_label(&document, control, &default_label);
        });
    }
}

/// Replace the visible label of a control that is still on the page.
fn set_label(document: &SharedDocument, control: NodeId, label: &str) {
    let mut doc = lock(document);
    if doc.is_attached(control) {
        doc.set_text(control, label);
    }
}

/// Current label of a control.
pub fn label(document: &Document, control: &CopyControl) -> String {
    document.text_content(control.node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::RecordingClipboard;
    use crate::html;

    fn augmentor() -> Augmentor<RecordingClipboard> {
        Augmentor::new(Settings::default(), RecordingClipboard::new())
    }

    #[test]
    fn test_discover_requires_pre_parent() {
        let doc = html::parse("<p><code>inline</code></p><pre><code>block</code></pre>");
        let aug = augmentor();
        let blocks: Vec<CodeBlock> = aug.discover(&doc).collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(doc.text_content(blocks[0].node()), "block");
    }

    #[test]
    fn test_discover_any_parent() {
        let doc = html::parse("<p><code>inline</code></p><pre><code>block</code></pre>");
        let settings = Settings {
            block_parent_tag: None,
            ..Settings::default()
        };
        let aug = Augmentor::new(settings, RecordingClipboard::new());
        assert_eq!(aug.discover(&doc).count(), 2);
    }

    #[test]
    fn test_attach_inside_plain_pre() {
        let mut doc = html::parse("<pre><code>x</code></pre>");
        let aug = augmentor();
        let controls = aug.run(&mut doc);
        assert_eq!(controls[0].placement(), Placement::FirstChild);
        assert_eq!(
            html::serialize(&doc),
            r#"<pre><button type="button" class="copy-button">Copy</button><code>x</code></pre>"#
        );
    }

    #[test]
    fn test_attach_before_wrapper() {
        let mut doc = html::parse(r#"<div><pre class="highlight"><code>x</code></pre></div>"#);
        let aug = augmentor();
        let controls = aug.run(&mut doc);
        assert_eq!(controls[0].placement(), Placement::BeforeContainer);
        assert_eq!(
            html::serialize(&doc),
            r#"<div><button type="button" class="copy-button">Copy</button><pre class="highlight"><code>x</code></pre></div>"#
        );
    }

    #[test]
    fn test_control_text_not_part_of_block() {
        let mut doc = html::parse("<pre><code>let x = 1;</code></pre>");
        let aug = augmentor();
        let controls = aug.run(&mut doc);
        assert_eq!(doc.text_content(controls[0].block().node()), "let x = 1;");
        assert_eq!(label(&doc, &controls[0]), "Copy");
    }
}
