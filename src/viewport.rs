use std::ops::Range;

// Contiguous sub-range of rows that must be materialized for rendering,
// given scroll state, row height, and a symmetric preload margin. Both
// bounds are clamped independently, and a stale scroll offset is first
// clamped to the scrollable extent, so a list that shrinks while scrolled
// deep into it still yields a valid window.
pub fn window(
    scroll_offset: f32,
    viewport_size: f32,
    item_size: f32,
    item_count: usize,
    preload_margin: f32,
) -> Range<usize> {
    if item_count == 0 || item_size <= 0.0 {
        return 0..0;
    }

    let content_size = item_size * item_count as f32;
    let max_offset = (content_size - viewport_size).max(0.0);
    let offset = scroll_offset.clamp(0.0, max_offset);

    let start = ((offset - preload_margin) / item_size).floor() as isize - 1;
    let start = start.clamp(0, item_count as isize) as usize;
    let end = ((offset + viewport_size + preload_margin) / item_size).ceil() as isize;
    let end = end.clamp(0, item_count as isize) as usize;

    start..end
}
