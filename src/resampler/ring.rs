use crate::utils::buffer::{clear_buffer, insert_silence_at_front, shift_frames_to_front};

// -------------------------------------------------------------------------------------------------

/// Interleaved buffer of input frames which got received but not yet consumed by the
/// interpolation engine.
///
/// Frame 0 is the oldest retained frame: fractional read positions of the engine are relative
/// to it. The buffer's length may exceed the committed frames: the region behind the committed
/// frames is used as write area for new input and as zero padding when flushing.
#[derive(Debug, Default, Clone)]
pub struct InputRing {
    samples: Vec<f32>,
    channel_count: usize,
    frames: usize,
    tap_span: usize,
}

impl InputRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel layout of the buffered frames. 0 when no layout got set yet.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of committed, readable frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of frames the active interpolation engine needs, starting at the integer read
    /// position, to render a single output frame.
    pub fn tap_span(&self) -> usize {
        self.tap_span
    }

    pub fn set_tap_span(&mut self, tap_span: usize) {
        debug_assert!(tap_span > 0, "Invalid tap span");
        self.tap_span = tap_span;
    }

    /// Minimum number of frames which need to be buffered to render a frame at `position`.
    pub fn required_frames(&self, position: f64) -> usize {
        (position as usize).saturating_add(self.tap_span)
    }

    /// Change the channel layout. Discards all buffered frames when the layout changed.
    /// Returns true when frames got discarded.
    pub fn set_channel_count(&mut self, channel_count: usize) -> bool {
        if self.channel_count == channel_count {
            return false;
        }
        let discarded = self.frames > 0;
        self.channel_count = channel_count;
        self.frames = 0;
        discarded
    }

    /// Ensure there's space for `frames` frames in total without reallocating.
    pub fn reserve(&mut self, frames: usize, channel_count: usize) {
        let len = frames * channel_count;
        if len > self.samples.len() {
            self.samples.reserve_exact(len - self.samples.len());
        }
    }

    /// Allocated sample capacity.
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Prepend silent frames in front of the buffered frames.
    pub fn prepend_silence(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }
        self.ensure_len(self.frames + frames);
        insert_silence_at_front(&mut self.samples, frames, self.frames, self.channel_count);
        self.frames += frames;
    }

    /// Access the region behind the committed frames, where `frames` new frames can be
    /// written to.
    pub fn write_region(&mut self, frames: usize) -> &mut [f32] {
        self.ensure_len(self.frames + frames);
        let start = self.frames * self.channel_count;
        &mut self.samples[start..start + frames * self.channel_count]
    }

    /// Make `frames` frames of the write region readable.
    pub fn commit(&mut self, frames: usize) {
        debug_assert!(
            (self.frames + frames) * self.channel_count <= self.samples.len(),
            "Committing frames which never got written"
        );
        self.frames += frames;
    }

    /// Zero the `frames` frames behind the committed ones, without committing them.
    /// Returns the number of frames which then can be read, including the padding.
    pub fn pad_silence(&mut self, frames: usize) -> usize {
        self.ensure_len(self.frames + frames);
        let start = self.frames * self.channel_count;
        clear_buffer(&mut self.samples[start..start + frames * self.channel_count]);
        self.frames + frames
    }

    /// Interleaved samples of the first `frames` frames, which may include padding.
    pub fn samples(&self, frames: usize) -> &[f32] {
        &self.samples[..frames * self.channel_count]
    }

    /// Drop up to `frames` frames from the front. Returns the number of dropped frames.
    pub fn consume(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.frames);
        let remaining = self.frames - frames;
        shift_frames_to_front(&mut self.samples, frames, remaining, self.channel_count);
        self.frames = remaining;
        frames
    }

    /// Drop all buffered frames.
    pub fn clear(&mut self) {
        self.frames = 0;
    }

    fn ensure_len(&mut self, frames: usize) {
        let len = frames * self.channel_count;
        if self.samples.len() < len {
            self.samples.resize(len, 0.0);
        }
    }
}

// -------------------------------------------------------------------------------------------------
