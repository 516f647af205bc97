// -------------------------------------------------------------------------------------------------

/// Number of complete interleaved frames in the given buffer.
#[inline]
pub fn frame_count(buffer: &[f32], channel_count: usize) -> usize {
    debug_assert!(channel_count > 0, "Invalid channel count");
    buffer.len() / channel_count
}

// -------------------------------------------------------------------------------------------------

/// Fill the given buffer with silence.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

// -------------------------------------------------------------------------------------------------

/// Move `frame_count` interleaved frames, starting at frame `offset`, to the front of the buffer.
/// Samples behind the moved range keep their old values.
pub fn shift_frames_to_front(
    buffer: &mut [f32],
    offset: usize,
    frame_count: usize,
    channel_count: usize,
) {
    if offset == 0 || frame_count == 0 {
        return;
    }
    let start = offset * channel_count;
    let end = start + frame_count * channel_count;
    buffer.copy_within(start..end, 0);
}

// -------------------------------------------------------------------------------------------------

/// Move `frame_count` interleaved frames from the front of the buffer back by `offset` frames
/// and fill the gap in front with silence. The buffer must hold `offset + frame_count` frames.
pub fn insert_silence_at_front(
    buffer: &mut [f32],
    offset: usize,
    frame_count: usize,
    channel_count: usize,
) {
    if offset == 0 {
        return;
    }
    let len = frame_count * channel_count;
    let gap = offset * channel_count;
    buffer.copy_within(0..len, gap);
    clear_buffer(&mut buffer[..gap]);
}

// -------------------------------------------------------------------------------------------------
