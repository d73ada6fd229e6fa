use gpui::{Bounds, Pixels, point};
use gpui_component::VirtualListScrollHandle;

/// Scroll jitter ignored when checking whether the user moved away.
const PIN_TOLERANCE: f32 = 1.0;

/// Keeps the transcript pinned to its newest entry after each append.
///
/// Requests are latched and applied on the next render, once the virtual
/// list knows its new maximum offset.
pub struct ScrollManager {
    scroll_handle: VirtualListScrollHandle,
    pending_scroll_to_bottom: bool,
    last_applied_offset: Option<Pixels>,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: VirtualListScrollHandle::new(),
            pending_scroll_to_bottom: false,
            last_applied_offset: None,
        }
    }

    pub fn handle(&self) -> &VirtualListScrollHandle {
        &self.scroll_handle
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.pending_scroll_to_bottom = true;
    }

    /// Returns true when a latched request was applied.
    pub fn apply_pending_scroll(&mut self) -> bool {
        if !std::mem::take(&mut self.pending_scroll_to_bottom) {
            return false;
        }

        // Scrolling down means negative Y offsets in gpui.
        let max_offset = self.scroll_handle.max_offset().height;
        let target_y = if max_offset > Pixels::ZERO {
            -max_offset
        } else {
            Pixels::ZERO
        };
        let current_x = self.scroll_handle.offset().x;
        self.scroll_handle.set_offset(point(current_x, target_y));
        self.last_applied_offset = Some(target_y);
        true
    }

    /// True while the view still sits where the last scroll-to-bottom left it.
    pub fn is_pinned_to_bottom(&self) -> bool {
        self.last_applied_offset.is_some_and(|applied| {
            let current = self.scroll_handle.offset().y;
            (f32::from(current) - f32::from(applied)).abs() <= PIN_TOLERANCE
        })
    }

    pub fn bounds(&self) -> Bounds<Pixels> {
        self.scroll_handle.bounds()
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}
