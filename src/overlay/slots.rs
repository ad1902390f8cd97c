/// Ownership of the two independent overlay channels
///
/// Selection and hover each hold at most one attached overlay. Rendering into
/// a channel tears down that channel's previous overlay first and never
/// touches the other channel.

use crate::host::Canvas;
use crate::overlay::path::PathOverlay;

/// Canvas-issued id of an attached overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayChannel {
    /// Token selected by the local participant
    Selection,
    /// Token under the pointer
    Hover,
}

#[derive(Debug, Default)]
pub struct OverlaySlots {
    selection: Option<OverlayHandle>,
    hover: Option<OverlayHandle>,
}

impl OverlaySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, channel: OverlayChannel) -> Option<OverlayHandle> {
        *self.slot(channel)
    }

    /// Replace the channel's overlay; `None` just clears it
    pub fn replace<C>(
        &mut self,
        canvas: &mut C,
        channel: OverlayChannel,
        overlay: Option<PathOverlay>,
    ) -> Option<OverlayHandle>
    where
        C: Canvas + ?Sized,
    {
        self.clear(canvas, channel);
        let handle = canvas.attach_overlay(overlay?);
        *self.slot_mut(channel) = Some(handle);
        Some(handle)
    }

    /// Tear down one channel; no-op when empty
    pub fn clear<C>(&mut self, canvas: &mut C, channel: OverlayChannel)
    where
        C: Canvas + ?Sized,
    {
        if let Some(handle) = self.slot_mut(channel).take() {
            canvas.detach_overlay(handle);
        }
    }

    pub fn clear_all<C>(&mut self, canvas: &mut C)
    where
        C: Canvas + ?Sized,
    {
        self.clear(canvas, OverlayChannel::Selection);
        self.clear(canvas, OverlayChannel::Hover);
    }

    fn slot(&self, channel: OverlayChannel) -> &Option<OverlayHandle> {
        match channel {
            OverlayChannel::Selection => &self.selection,
            OverlayChannel::Hover => &self.hover,
        }
    }

    fn slot_mut(&mut self, channel: OverlayChannel) -> &mut Option<OverlayHandle> {
        match channel {
            OverlayChannel::Selection => &mut self.selection,
            OverlayChannel::Hover => &mut self.hover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathStyle;
    use crate::host::Role;
    use crate::movement::record::Ledger;
    use crate::overlay::path::build_path;
    use crate::testing::{record, token, MockHost};

    fn overlay(token_id: &str) -> PathOverlay {
        let ledger = Ledger::from_records(vec![record(token_id, 1, (0.0, 0.0), (100.0, 0.0))]);
        build_path(&ledger, &token(token_id, (100.0, 0.0)), 100.0, &PathStyle::default()).unwrap()
    }

    #[test]
    fn test_channels_coexist() {
        let mut canvas = MockHost::new(Role::Player);
        let mut slots = OverlaySlots::new();

        slots.replace(&mut canvas, OverlayChannel::Selection, Some(overlay("a")));
        slots.replace(&mut canvas, OverlayChannel::Hover, Some(overlay("b")));

        assert_eq!(canvas.overlays.len(), 2);
        assert!(slots.handle(OverlayChannel::Selection).is_some());
        assert!(slots.handle(OverlayChannel::Hover).is_some());
    }

    #[test]
    fn test_replace_tears_down_previous_first() {
        let mut canvas = MockHost::new(Role::Player);
        let mut slots = OverlaySlots::new();

        let first = slots
            .replace(&mut canvas, OverlayChannel::Selection, Some(overlay("a")))
            .unwrap();
        let second = slots
            .replace(&mut canvas, OverlayChannel::Selection, Some(overlay("a")))
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(canvas.detached, vec![first]);
        assert_eq!(canvas.overlays.len(), 1);
    }

    #[test]
    fn test_empty_overlay_leaves_channel_clear() {
        let mut canvas = MockHost::new(Role::Player);
        let mut slots = OverlaySlots::new();

        slots.replace(&mut canvas, OverlayChannel::Hover, Some(overlay("a")));
        assert!(slots.replace(&mut canvas, OverlayChannel::Hover, None).is_none());
        assert!(slots.handle(OverlayChannel::Hover).is_none());
        assert!(canvas.overlays.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent_and_scoped() {
        let mut canvas = MockHost::new(Role::Player);
        let mut slots = OverlaySlots::new();

        slots.replace(&mut canvas, OverlayChannel::Selection, Some(overlay("a")));
        slots.clear(&mut canvas, OverlayChannel::Hover);
        slots.clear(&mut canvas, OverlayChannel::Hover);
        assert!(canvas.detached.is_empty());
        assert_eq!(canvas.overlays.len(), 1);

        slots.clear_all(&mut canvas);
        slots.clear_all(&mut canvas);
        assert_eq!(canvas.detached.len(), 1);
        assert!(canvas.overlays.is_empty());
    }
}
