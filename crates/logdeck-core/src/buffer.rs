//! Log buffer and autoscroll policy.
//!
//! [`LogBuffer`] orders the lines of the current selection by arrival.
//! Lines enter in two steps: [`stage`](LogBuffer::stage) on arrival, then
//! [`reveal`](LogBuffer::reveal) once their display delay has passed.
//! Reveals may come back in any order; lines still come out strictly in the
//! order they were staged. Revealed text is handed to the caller and not
//! kept here; only the count is.
//!
//! Every [`clear`](LogBuffer::clear) starts a new *epoch*. Tickets from an
//! older epoch are ignored, so a delayed line from a previous container can
//! never show up after a switch.
//!
//! [`Viewport`] is the scroll half: it follows new output only when it was
//! already at the bottom.

use std::collections::BTreeMap;
use std::ops::Range;

// ── LineTicket ──────────────────────────────────────────────────────

/// Claim on one staged line, redeemed by [`LogBuffer::reveal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTicket {
    epoch: u64,
    seq: u64,
}

impl LineTicket {
    pub fn epoch(self) -> u64 {
        self.epoch
    }
}

#[derive(Debug)]
struct PendingLine {
    text: String,
    ready: bool,
}

// ── LogBuffer ───────────────────────────────────────────────────────

/// Ordering state for the lines of one selection.
#[derive(Debug, Default)]
pub struct LogBuffer {
    epoch: u64,
    revealed: usize,
    pending: BTreeMap<u64, PendingLine>,
    next_seq: u64,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `line` behind everything already staged.
    pub fn stage(&mut self, line: String) -> LineTicket {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            seq,
            PendingLine {
                text: line,
                ready: false,
            },
        );
        LineTicket {
            epoch: self.epoch,
            seq,
        }
    }

    /// Mark a staged line as due and flush every line that is now visible.
    ///
    /// Returns the lines that became visible by this call, in order. Empty
    /// when the ticket is stale or an earlier line is still waiting.
    pub fn reveal(&mut self, ticket: LineTicket) -> Vec<String> {
        let mut flushed = Vec::new();
        if ticket.epoch != self.epoch {
            return flushed;
        }

        if let Some(line) = self.pending.get_mut(&ticket.seq) {
            line.ready = true;
        }

        while let Some(entry) = self.pending.first_entry() {
            if !entry.get().ready {
                break;
            }
            flushed.push(entry.remove().text);
        }

        self.revealed += flushed.len();
        flushed
    }

    /// Stage and reveal in one step, for a zero display delay.
    pub fn push(&mut self, line: String) -> Vec<String> {
        let ticket = self.stage(line);
        self.reveal(ticket)
    }

    /// Drop every line, visible or pending, and start a new epoch.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.revealed = 0;
        self.pending.clear();
        self.next_seq = 0;
    }

    /// Lines revealed in this epoch.
    pub fn len(&self) -> usize {
        self.revealed
    }

    pub fn is_empty(&self) -> bool {
        self.revealed == 0
    }

    /// Lines staged but not yet visible.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

// ── Viewport ────────────────────────────────────────────────────────

/// Scroll position over a list of `total` rows, `height` of them visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    top: usize,
    height: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self { top: 0, height }
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the last of `total` rows is on screen.
    pub fn is_at_bottom(&self, total: usize) -> bool {
        self.top + self.height >= total
    }

    /// Autoscroll policy: content grew from `before` to `after` rows.
    ///
    /// Follows to the new bottom only if the view was at the bottom before
    /// the change; otherwise the position is left alone.
    pub fn follow(&mut self, before: usize, after: usize) {
        if self.is_at_bottom(before) {
            self.scroll_to_bottom(after);
        }
    }

    /// Content was re-laid out from `before` to `after` rows (a rewrap).
    /// A view at the bottom stays there; any other position is clamped.
    pub fn reflow(&mut self, before: usize, after: usize) {
        if self.is_at_bottom(before) {
            self.scroll_to_bottom(after);
        } else {
            self.clamp(after);
        }
    }

    /// Resize the view. A view pinned to the bottom stays pinned.
    pub fn resize(&mut self, height: usize, total: usize) {
        let pinned = self.is_at_bottom(total);
        self.height = height;
        if pinned {
            self.scroll_to_bottom(total);
        } else {
            self.clamp(total);
        }
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.top = self.top.saturating_sub(rows);
    }

    pub fn scroll_down(&mut self, rows: usize, total: usize) {
        self.top = self.top.saturating_add(rows);
        self.clamp(total);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height.max(1));
    }

    pub fn page_down(&mut self, total: usize) {
        self.scroll_down(self.height.max(1), total);
    }

    pub fn scroll_to_top(&mut self) {
        self.top = 0;
    }

    pub fn scroll_to_bottom(&mut self, total: usize) {
        self.top = total.saturating_sub(self.height);
    }

    /// Back to the top, keeping the height. Used when the content is replaced.
    pub fn reset(&mut self) {
        self.top = 0;
    }

    /// Row indices currently on screen.
    pub fn visible_range(&self, total: usize) -> Range<usize> {
        let start = self.top.min(total);
        let end = (self.top + self.height).min(total);
        start..end
    }

    fn clamp(&mut self, total: usize) {
        self.top = self.top.min(total.saturating_sub(self.height));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // ── LogBuffer ──

    #[test]
    fn reveal_in_arrival_order() {
        let mut buf = LogBuffer::new();
        let boot = buf.stage("boot".into());
        let ready = buf.stage("ready".into());

        assert_eq!(buf.reveal(boot), ["boot"]);
        assert_eq!(buf.reveal(ready), ["ready"]);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn out_of_order_reveal_waits_for_earlier_lines() {
        let mut buf = LogBuffer::new();
        let first = buf.stage("one".into());
        let second = buf.stage("two".into());
        let third = buf.stage("three".into());

        assert!(buf.reveal(third).is_empty());
        assert!(buf.reveal(second).is_empty());
        assert_eq!(buf.pending_len(), 3);

        assert_eq!(buf.reveal(first), ["one", "two", "three"]);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn clear_discards_pending_and_stale_tickets() {
        let mut buf = LogBuffer::new();
        buf.push("visible".into());
        let late = buf.stage("late".into());

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.pending_len(), 0);

        let fresh = buf.stage("fresh".into());
        assert_eq!(late.epoch() + 1, fresh.epoch());

        // Same sequence number as `late`, different epoch.
        assert!(buf.reveal(late).is_empty());
        assert_eq!(buf.reveal(fresh), ["fresh"]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn repeated_reveal_is_harmless() {
        let mut buf = LogBuffer::new();
        let t = buf.stage("once".into());
        buf.reveal(t);
        assert!(buf.reveal(t).is_empty());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn revealed_text_is_handed_off() {
        let mut buf = LogBuffer::new();
        assert_eq!(buf.push("a".into()), ["a"]);
        let b = buf.stage("b".into());
        assert_eq!(buf.pending_len(), 1);

        // Only the count stays behind once a line is out.
        assert_eq!(buf.reveal(b), ["b"]);
        assert_eq!(buf.pending_len(), 0);
        assert_eq!(buf.len(), 2);
        assert!(!buf.is_empty());
    }

    // ── Viewport ──

    #[test]
    fn follows_when_at_bottom() {
        let mut vp = Viewport::new(3);
        vp.follow(0, 2);
        assert_eq!(vp.top(), 0);

        vp.follow(2, 5);
        assert_eq!(vp.top(), 2);
        assert!(vp.is_at_bottom(5));
        assert_eq!(vp.visible_range(5), 2..5);
    }

    #[test]
    fn stays_put_when_scrolled_up() {
        let mut vp = Viewport::new(3);
        vp.scroll_to_bottom(10);
        vp.scroll_up(4);
        assert_eq!(vp.top(), 3);

        vp.follow(10, 12);
        assert_eq!(vp.top(), 3);
        assert!(!vp.is_at_bottom(12));
    }

    #[test]
    fn scrolling_back_down_rejoins_follow() {
        let mut vp = Viewport::new(3);
        vp.scroll_to_bottom(10);
        vp.scroll_up(2);
        vp.scroll_down(100, 10);
        assert_eq!(vp.top(), 7);

        vp.follow(10, 11);
        assert_eq!(vp.top(), 8);
    }

    #[test]
    fn paging_and_bounds() {
        let mut vp = Viewport::new(4);
        vp.page_down(10);
        assert_eq!(vp.top(), 4);
        vp.page_down(10);
        assert_eq!(vp.top(), 6);
        vp.page_up();
        assert_eq!(vp.top(), 2);
        vp.page_up();
        assert_eq!(vp.top(), 0);
        vp.scroll_up(1);
        assert_eq!(vp.top(), 0);
    }

    #[test]
    fn resize_keeps_bottom_pinned() {
        let mut vp = Viewport::new(5);
        vp.scroll_to_bottom(20);
        vp.resize(10, 20);
        assert_eq!(vp.top(), 10);

        vp.scroll_to_top();
        vp.resize(4, 20);
        assert_eq!(vp.top(), 0);
    }

    #[test]
    fn reflow_keeps_bottom_and_clamps_the_rest() {
        let mut vp = Viewport::new(4);
        vp.scroll_to_bottom(10);
        vp.reflow(10, 16);
        assert_eq!(vp.top(), 12);

        vp.scroll_up(10);
        vp.reflow(16, 5);
        assert_eq!(vp.top(), 1);
        vp.reflow(5, 8);
        assert_eq!(vp.top(), 1);
    }
}
