//! Streaming, variable ratio sample rate conversion of interleaved audio.

use strum::{Display, EnumIter, EnumString};

use crate::{
    utils::{buffer::frame_count, dsp::filters::biquad::BiquadFilterCoefficients},
    Error,
};

pub(crate) mod cascade;
pub(crate) mod engine;
pub(crate) mod kernel;
pub(crate) mod ring;

use cascade::CascadeFilter;
use engine::{InterpolationEngine, InterpolationMode};
use kernel::SincKernel;
use ring::InputRing;

// -------------------------------------------------------------------------------------------------

/// Defines how the frame count argument of [`Resampler::prepare`] is interpreted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum FeedMode {
    /// The caller asks for a number of output frames, and gets told how many input frames are
    /// needed to render them.
    #[default]
    OutputDriven,
    /// The caller tells how many input frames it has, and renders as much output as possible.
    InputDriven,
}

// -------------------------------------------------------------------------------------------------

/// Resampling mode presets, from cheapest to best quality.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum ResamplingQuality {
    /// Nearest neighbour without any filtering. Aliases a lot, but is as cheap as it gets.
    Nearest,
    /// Linear interpolation without any filtering.
    Linear,
    /// Linear interpolation, smoothed with a single low-pass stage. Your daily workhorse when
    /// CPU resources are a problem.
    #[default]
    Default,
    /// Band-limited windowed-sinc interpolation with 64 taps.
    HighQuality,
}

// -------------------------------------------------------------------------------------------------

/// Configuration of a [`Resampler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResamplerOptions {
    /// By default 44100. Input sample rate in Hz.
    pub rate_in: f64,
    /// By default 44100. Output sample rate in Hz.
    pub rate_out: f64,

    /// By default true. When false and not using sinc, use nearest neighbour sampling.
    pub interpolate: bool,
    /// By default 1. Number of low-pass stages used to smooth non-sinc interpolation.
    pub filter_count: usize,
    /// By default false. When true, use windowed-sinc interpolation. Overrides `interpolate`
    /// and `filter_count`.
    pub sinc: bool,
    /// By default 64. Number of sinc taps.
    pub sinc_size: usize,
    /// By default 32. Number of sinc kernel phases per input frame.
    pub sinc_interp_size: usize,

    /// By default 0.693. Cutoff of the smoothing filter stages, relative to Nyquist.
    pub filter_position: f64,
    /// By default 0.707. Resonance of the smoothing filter stages.
    pub filter_q: f64,

    /// By default [`FeedMode::OutputDriven`].
    pub feed_mode: FeedMode,
}

impl Default for ResamplerOptions {
    fn default() -> Self {
        Self {
            rate_in: Resampler::DEFAULT_SAMPLE_RATE,
            rate_out: Resampler::DEFAULT_SAMPLE_RATE,
            interpolate: true,
            filter_count: 1,
            sinc: false,
            sinc_size: SincKernel::DEFAULT_SIZE,
            sinc_interp_size: SincKernel::DEFAULT_INTERPOLATION_SIZE,
            filter_position: Resampler::DEFAULT_FILTER_POSITION,
            filter_q: Resampler::DEFAULT_FILTER_Q,
            feed_mode: FeedMode::default(),
        }
    }
}

impl ResamplerOptions {
    pub fn rates(mut self, rate_in: f64, rate_out: f64) -> Self {
        self.rate_in = rate_in;
        self.rate_out = rate_out;
        self
    }

    pub fn quality(mut self, quality: ResamplingQuality) -> Self {
        match quality {
            ResamplingQuality::Nearest => self.mode(false, 0),
            ResamplingQuality::Linear => self.mode(true, 0),
            ResamplingQuality::Default => self.mode(true, 1),
            ResamplingQuality::HighQuality => {
                self.sinc(SincKernel::DEFAULT_SIZE, SincKernel::DEFAULT_INTERPOLATION_SIZE)
            }
        }
    }

    /// Use nearest or linear interpolation, smoothed with `filter_count` low-pass stages.
    pub fn mode(mut self, interpolate: bool, filter_count: usize) -> Self {
        self.sinc = false;
        self.interpolate = interpolate;
        self.filter_count = filter_count;
        self
    }

    /// Use windowed-sinc interpolation.
    pub fn sinc(mut self, sinc_size: usize, sinc_interp_size: usize) -> Self {
        self.sinc = true;
        self.sinc_size = sinc_size;
        self.sinc_interp_size = sinc_interp_size;
        self
    }

    pub fn filter_parameters(mut self, position: f64, q: f64) -> Self {
        self.filter_position = position;
        self.filter_q = q;
        self
    }

    pub fn feed_mode(mut self, feed_mode: FeedMode) -> Self {
        self.feed_mode = feed_mode;
        self
    }

    /// Validate all parameters. Returns Error::ConfigurationError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        validate_rate("rate_in", self.rate_in)?;
        validate_rate("rate_out", self.rate_out)?;
        if self.sinc {
            validate_sinc_sizes(self.sinc_size, self.sinc_interp_size)?;
        }
        validate_filter_parameters(self.filter_position, self.filter_q)?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Streaming sample rate converter for interleaved audio with a two-phase prepare/out protocol.
///
/// For each block, call [`prepare`](Self::prepare) to get a buffer to write new input into,
/// then [`out`](Self::out) to render output from it:
///
/// ```rust
/// use phonic_resampler::{Error, Resampler, ResamplerOptions, ResamplingQuality};
///
/// let mut resampler = Resampler::with_options(
///     ResamplerOptions::default()
///         .rates(48000.0, 44100.0)
///         .quality(ResamplingQuality::HighQuality),
/// )?;
/// let mut output = vec![0.0; 2 * 256];
/// // ask for 256 output frames: returns a buffer for the required input frames
/// let input = resampler.prepare(256, 2)?;
/// let input_frames = input.len() / 2;
/// input.fill(0.25);
/// let written = resampler.out(&mut output, input_frames, 256, 2)?;
/// assert_eq!(written, 256);
/// # Ok::<(), Error>(())
/// ```
///
/// Passing fewer input frames to `out` than `prepare` asked for flushes the stream: all
/// remaining output is rendered and the session starts over with the next `prepare`.
#[derive(Debug, Clone)]
pub struct Resampler {
    rate_in: f64,
    rate_out: f64,
    ratio: f64,
    position: f64,
    feed_mode: FeedMode,
    filter_position: f64,
    filter_q: f64,
    engine: InterpolationEngine,
    ring: InputRing,
    last_requested: usize,
    authorized_frames: usize,
    prepared_output_frames: Option<usize>,
    primed: bool,
    drained: bool,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler {
    pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
    pub const DEFAULT_FILTER_POSITION: f64 = BiquadFilterCoefficients::DEFAULT_CUTOFF;
    pub const DEFAULT_FILTER_Q: f64 = BiquadFilterCoefficients::DEFAULT_Q;

    /// Maximum supported number of interleaved channels.
    pub const MAX_CHANNELS: usize = 64;
    /// Maximum number of smoothing filter stages.
    pub const MAX_FILTER_STAGES: usize = CascadeFilter::MAX_STAGES;

    /// Create a new resampler with default options: 44100 Hz in and out, linear interpolation
    /// with one smoothing filter stage, output driven.
    pub fn new() -> Self {
        let engine = InterpolationEngine::interpolating(true, 1);
        let mut ring = InputRing::new();
        ring.set_tap_span(engine.tap_span());
        Self {
            rate_in: Self::DEFAULT_SAMPLE_RATE,
            rate_out: Self::DEFAULT_SAMPLE_RATE,
            ratio: 1.0,
            position: 0.0,
            feed_mode: FeedMode::default(),
            filter_position: Self::DEFAULT_FILTER_POSITION,
            filter_q: Self::DEFAULT_FILTER_Q,
            engine,
            ring,
            last_requested: 0,
            authorized_frames: 0,
            prepared_output_frames: None,
            primed: false,
            drained: false,
        }
    }

    /// Create a new resampler with the given options.
    pub fn with_options(options: ResamplerOptions) -> Result<Self, Error> {
        options.validate()?;
        let mut resampler = Self::new();
        resampler.set_rates(options.rate_in, options.rate_out)?;
        resampler.set_mode(
            options.interpolate,
            options.filter_count,
            options.sinc,
            options.sinc_size,
            options.sinc_interp_size,
        )?;
        resampler.set_filter_parameters(options.filter_position, options.filter_q)?;
        resampler.set_feed_mode(options.feed_mode);
        Ok(resampler)
    }

    /// Input sample rate in Hz.
    pub fn rate_in(&self) -> f64 {
        self.rate_in
    }

    /// Output sample rate in Hz.
    pub fn rate_out(&self) -> f64 {
        self.rate_out
    }

    /// Input frames the read position advances per output frame: `rate_in / rate_out`.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Current fractional read position, relative to the oldest buffered frame.
    pub fn fractional_position(&self) -> f64 {
        self.position
    }

    pub fn feed_mode(&self) -> FeedMode {
        self.feed_mode
    }

    pub fn interpolation_mode(&self) -> InterpolationMode {
        self.engine.mode()
    }

    /// Number of active smoothing filter stages. Always 0 in sinc mode.
    pub fn filter_count(&self) -> usize {
        self.engine.filter_count()
    }

    /// Cutoff position and resonance of the smoothing filter stages.
    pub fn filter_parameters(&self) -> (f64, f64) {
        (self.filter_position, self.filter_q)
    }

    /// The sinc kernel that is in use, if the sinc mode is active and a kernel got built.
    pub fn kernel(&self) -> Option<&SincKernel> {
        self.engine.kernel()
    }

    /// Number of input frames a single output frame depends on.
    pub fn tap_span(&self) -> usize {
        self.engine.tap_span()
    }

    /// Number of buffered input frames, including retained history.
    pub fn buffered_frames(&self) -> usize {
        self.ring.frames()
    }

    /// True after a flush rendered all remaining output, until new input is supplied.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Select the interpolation engine. When `sinc` is set, it overrides `interpolate` and
    /// `filter_count`. Filter memory and the cached sinc kernel are dropped.
    ///
    /// Buffered input is kept while streaming, and the ring gets realigned to the new engine's
    /// history, so the next output frame continues at the same input time.
    pub fn set_mode(
        &mut self,
        interpolate: bool,
        filter_count: usize,
        sinc: bool,
        sinc_size: usize,
        sinc_interp_size: usize,
    ) -> Result<(), Error> {
        let engine = if sinc {
            validate_sinc_sizes(sinc_size, sinc_interp_size)?;
            let size = sinc_size.clamp(SincKernel::MIN_SIZE, SincKernel::MAX_SIZE) & !1;
            if size != sinc_size {
                log::warn!("Sinc size {sinc_size} is not supported: using {size} instead");
            }
            let oversize = sinc_interp_size.min(SincKernel::MAX_INTERPOLATION_SIZE);
            if oversize != sinc_interp_size {
                log::warn!(
                    "Sinc interpolation size {sinc_interp_size} is not supported: using {oversize} instead"
                );
            }
            InterpolationEngine::sinc(size, oversize)
        } else {
            let stages = filter_count.min(Self::MAX_FILTER_STAGES);
            if stages != filter_count {
                log::warn!("Filter count {filter_count} is not supported: using {stages} instead");
            }
            InterpolationEngine::interpolating(interpolate, stages)
        };
        log::debug!(
            "Resampler mode: {} interpolation, {} filter stages, {} taps",
            engine.mode(),
            engine.filter_count(),
            engine.tap_span()
        );
        if self.primed {
            let old_history = self.engine.history_frames();
            let new_history = engine.history_frames();
            if new_history > old_history {
                self.ring.prepend_silence(new_history - old_history);
            } else {
                // frames which can't be dropped yet are skipped from future input
                let skip = old_history - new_history;
                let dropped = self.ring.consume(skip);
                self.position += (skip - dropped) as f64;
            }
        }
        self.ring.set_tap_span(engine.tap_span());
        self.engine = engine;
        Ok(())
    }

    /// Apply one of the mode presets.
    pub fn set_quality(&mut self, quality: ResamplingQuality) -> Result<(), Error> {
        let options = ResamplerOptions::default().quality(quality);
        self.set_mode(
            options.interpolate,
            options.filter_count,
            options.sinc,
            options.sinc_size,
            options.sinc_interp_size,
        )
    }

    /// Set cutoff position (relative to Nyquist, in range `(0, 1]`) and resonance of the
    /// smoothing filter stages. Only used by the non-sinc modes.
    pub fn set_filter_parameters(&mut self, position: f64, q: f64) -> Result<(), Error> {
        validate_filter_parameters(position, q)?;
        self.filter_position = position;
        self.filter_q = q;
        Ok(())
    }

    /// Change how the frame count argument of [`prepare`](Self::prepare) is interpreted.
    pub fn set_feed_mode(&mut self, feed_mode: FeedMode) {
        self.feed_mode = feed_mode;
    }

    /// Set new sample rates. Buffered input and the read position are kept, so rates can be
    /// changed while streaming. The sinc kernel gets rebuilt lazily when needed.
    pub fn set_rates(&mut self, rate_in: f64, rate_out: f64) -> Result<(), Error> {
        validate_rate("rate_in", rate_in)?;
        validate_rate("rate_out", rate_out)?;
        if rate_in != self.rate_in || rate_out != self.rate_out {
            log::debug!(
                "Resampler rates changed from {}->{} to {rate_in}->{rate_out} Hz",
                self.rate_in,
                self.rate_out
            );
            self.rate_in = rate_in;
            self.rate_out = rate_out;
            self.ratio = rate_in / rate_out;
        }
        Ok(())
    }

    /// Drop all buffered input and filter memory and restart at read position 0.
    pub fn reset(&mut self) {
        self.restart(0.0);
    }

    /// Drop all buffered input and filter memory and restart at the given fractional read
    /// position, which must be in range `[0, 1)`.
    pub fn reset_with_position(&mut self, position: f64) -> Result<(), Error> {
        if !(0.0..1.0).contains(&position) {
            return Err(Error::ConfigurationError(format!(
                "read position must be in range [0, 1), but is {position}"
            )));
        }
        self.restart(position);
        Ok(())
    }

    fn restart(&mut self, position: f64) {
        self.position = position;
        self.primed = false;
        self.ring.clear();
        self.engine.reset();
        self.last_requested = 0;
        self.authorized_frames = 0;
        self.prepared_output_frames = None;
        self.drained = false;
    }

    /// Duration of the input that got received but not yet converted, in seconds: the buffered
    /// input behind the read position's interpolation center.
    ///
    /// Silent history frames which prime the sinc kernel at stream start are not counted. The
    /// kernel's look-ahead is part of the buffered input, so it is included.
    pub fn current_latency(&self) -> f64 {
        let center = self.position + self.engine.history_frames() as f64;
        (self.ring.frames() as f64 - center).max(0.0) / self.rate_in
    }

    /// Number of input frames which need to be supplied, in addition to the buffered ones,
    /// to render `output_frames` frames without flushing.
    pub fn required_input_frames(&self, output_frames: usize) -> usize {
        if output_frames == 0 {
            return 0;
        }
        let last_position = self.position + (output_frames - 1) as f64 * self.ratio;
        let next_position = self.position + output_frames as f64 * self.ratio;
        // one extra frame covers rounding differences of the accumulated read position
        let required = (self.ring.required_frames(last_position).saturating_add(1))
            .max(next_position as usize);
        required.saturating_sub(self.ring.frames())
    }

    /// Number of output frames the buffered input can render without flushing.
    pub fn available_output_frames(&self) -> usize {
        let frames = self.ring.frames();
        let tap_span = self.ring.tap_span();
        if self.ring.required_frames(self.position) > frames {
            return 0;
        }
        let limit = (frames + 1 - tap_span) as f64;
        ((limit - self.position) / self.ratio).ceil() as usize
    }

    /// Reserve memory, so following `prepare` and `out` calls with up to the given frame counts
    /// don't allocate. This never changes the resampler's output.
    pub fn prealloc(
        &mut self,
        channel_count: usize,
        input_frames: usize,
        output_frames: usize,
    ) -> Result<(), Error> {
        validate_channel_count(channel_count)?;
        let tap_span = self.engine.tap_span();
        let output_input_frames = ((output_frames as f64 * self.ratio).ceil() as usize)
            .saturating_add(tap_span + 2);
        let frames = input_frames
            .max(output_input_frames)
            .saturating_add(self.engine.history_frames() + tap_span);
        let max_frames = Self::max_prepared_frames(channel_count);
        if frames > max_frames {
            return Err(Error::CapacityExceeded {
                requested: frames,
                available: max_frames,
            });
        }
        let padding = 2 * frames + 2 * tap_span;
        self.ring.reserve(frames + padding, channel_count);
        log::debug!(
            "Preallocated {} input samples for {channel_count} channels",
            self.ring.capacity()
        );
        if self.engine.update_kernel(self.ratio) {
            log::debug!("Built sinc kernel for ratio {}", self.ratio);
        }
        let stream_channel_count = self.ring.channel_count();
        if stream_channel_count == 0 || stream_channel_count == channel_count {
            self.engine.update_filter(
                self.ratio,
                self.filter_position,
                self.filter_q,
                channel_count,
            )?;
        }
        Ok(())
    }

    /// First phase of the streaming protocol: returns an interleaved buffer the caller needs to
    /// fill with new input, before calling [`out`](Self::out).
    ///
    /// In [`FeedMode::OutputDriven`] mode `requested_frames` is the number of output frames the
    /// caller wants, and the buffer is sized for the input frames that are needed to render
    /// them. In [`FeedMode::InputDriven`] mode `requested_frames` is the number of input frames
    /// the caller has, and the buffer has exactly that size.
    ///
    /// Calling `prepare` again without `out` is fine: the requested size replaces the previous
    /// one.
    pub fn prepare(
        &mut self,
        requested_frames: usize,
        channel_count: usize,
    ) -> Result<&mut [f32], Error> {
        validate_channel_count(channel_count)?;
        let previous_channel_count = self.ring.channel_count();
        if previous_channel_count != channel_count {
            if self.ring.set_channel_count(channel_count) {
                log::warn!(
                    "Resampler channel layout changed to {channel_count} channels: discarding buffered input"
                );
            }
            if previous_channel_count != 0 {
                self.reset();
            }
        }
        if !self.primed {
            self.ring.prepend_silence(self.engine.history_frames());
            self.primed = true;
        }
        let required = match self.feed_mode {
            FeedMode::OutputDriven => self.required_input_frames(requested_frames),
            FeedMode::InputDriven => requested_frames,
        };
        let max_frames = Self::max_prepared_frames(channel_count);
        if required > max_frames.saturating_sub(self.ring.frames()) {
            return Err(Error::CapacityExceeded {
                requested: required,
                available: max_frames.saturating_sub(self.ring.frames()),
            });
        }
        self.last_requested = required;
        self.authorized_frames = required;
        self.prepared_output_frames = match self.feed_mode {
            FeedMode::OutputDriven => Some(requested_frames),
            FeedMode::InputDriven => None,
        };
        Ok(self.ring.write_region(required))
    }

    /// Second phase of the streaming protocol: consume `input_frames` frames of the buffer
    /// returned by [`prepare`](Self::prepare) and render up to `output_frames` frames into the
    /// interleaved `output` buffer. Returns the number of rendered frames.
    ///
    /// When `input_frames` is smaller than the frame count `prepare` returned, the stream gets
    /// flushed: all remaining valid output is rendered. Once everything is rendered, the session
    /// is drained and starts over with the next `prepare` call.
    pub fn out(
        &mut self,
        output: &mut [f32],
        input_frames: usize,
        output_frames: usize,
        channel_count: usize,
    ) -> Result<usize, Error> {
        validate_channel_count(channel_count)?;
        if self.ring.channel_count() != channel_count {
            return Err(Error::ProtocolViolation(if self.ring.channel_count() == 0 {
                "out got called without a preceding prepare".to_string()
            } else {
                format!(
                    "out got called with {channel_count} channels, but prepare with {}",
                    self.ring.channel_count()
                )
            }));
        }
        if input_frames > self.authorized_frames {
            return Err(Error::ProtocolViolation(format!(
                "out got called with {input_frames} input frames, but prepare authorized {}",
                self.authorized_frames
            )));
        }
        let output_len = output_frames * channel_count;
        if output.len() < output_len {
            return Err(Error::CapacityExceeded {
                requested: output_frames,
                available: output.len() / channel_count,
            });
        }
        let flush = input_frames < self.last_requested;
        if let (false, Some(prepared)) = (flush, self.prepared_output_frames) {
            if output_frames > prepared {
                return Err(Error::CapacityExceeded {
                    requested: output_frames,
                    available: prepared,
                });
            }
        }

        // apply mode and rate changes
        if self.engine.update_kernel(self.ratio) {
            log::debug!("Built sinc kernel for ratio {}", self.ratio);
        }
        self.engine.update_filter(
            self.ratio,
            self.filter_position,
            self.filter_q,
            channel_count,
        )?;

        // take over new input
        self.authorized_frames = 0;
        if input_frames > 0 {
            let input = self.ring.write_region(input_frames);
            self.engine.prefilter(input, channel_count, self.ratio);
            self.ring.commit(input_frames);
            self.drained = false;
        }

        // render
        let real_frames = self.ring.frames();
        let available_frames = if flush {
            let padding = 2 * (self.last_requested - input_frames) + 2 * self.engine.tap_span();
            self.ring.pad_silence(padding)
        } else {
            real_frames
        };
        let production = {
            let input = self.ring.samples(available_frames);
            let output = &mut output[..output_len];
            let engine = &mut self.engine;
            let (position, ratio) = (self.position, self.ratio);
            Self::assert_no_alloc(|| {
                engine.produce(input, real_frames, position, ratio, output, channel_count)
            })
        };
        let written = if available_frames > real_frames {
            production.valid
        } else {
            production.written
        };

        // drop consumed input
        let consumed = self.ring.consume(production.position as usize);
        self.position = production.position - consumed as f64;

        if flush && written < output_frames {
            log::debug!("Resampler got flushed: rendered {written} final frames");
            self.reset();
            self.drained = true;
        }
        Ok(written)
    }

    /// Upper bound for buffered plus prepared frames, which leaves room for the flush padding.
    fn max_prepared_frames(channel_count: usize) -> usize {
        isize::MAX as usize / std::mem::size_of::<f32>() / channel_count / 4
    }

    #[inline]
    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);
        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------

/// Block based resampling interface on top of the prepare/out protocol.
pub trait AudioResampler {
    /// Channel layout of the interleaved buffers.
    fn channel_count(&self) -> usize;

    /// Process interleaved input samples into the given interleaved output buffer.
    /// Only as much input as needed to fill the output is consumed, so the caller should pass
    /// the remaining input again with the next call.
    /// Returns `(input_consumed, output_written)` in samples.
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<(usize, usize), Error>;

    /// Render remaining buffered output at the end of a stream. Returns the number of written
    /// samples. Call repeatedly until it writes less than the output buffer can hold.
    fn flush(&mut self, output: &mut [f32]) -> Result<usize, Error>;

    /// Reset internal resampler state. Make an existing resampler ready for a new source.
    fn reset(&mut self);
}

// -------------------------------------------------------------------------------------------------

/// [`AudioResampler`] impl which drives a [`Resampler`] with a fixed channel layout.
#[derive(Debug, Clone)]
pub struct BlockResampler {
    resampler: Resampler,
    channel_count: usize,
}

impl BlockResampler {
    pub fn new(options: ResamplerOptions, channel_count: usize) -> Result<Self, Error> {
        validate_channel_count(channel_count)?;
        let resampler = Resampler::with_options(options.feed_mode(FeedMode::InputDriven))?;
        Ok(Self {
            resampler,
            channel_count,
        })
    }

    pub fn resampler(&self) -> &Resampler {
        &self.resampler
    }

    /// Mutable access to the wrapped resampler, e.g. to change rates while streaming.
    pub fn resampler_mut(&mut self) -> &mut Resampler {
        &mut self.resampler
    }
}

impl AudioResampler for BlockResampler {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<(usize, usize), Error> {
        let channel_count = self.channel_count;
        let output_frames = frame_count(output, channel_count);
        let input_frames = frame_count(input, channel_count)
            .min(self.resampler.required_input_frames(output_frames));
        let buffer = self.resampler.prepare(input_frames, channel_count)?;
        buffer.copy_from_slice(&input[..input_frames * channel_count]);
        let written = self
            .resampler
            .out(output, input_frames, output_frames, channel_count)?;
        Ok((input_frames * channel_count, written * channel_count))
    }

    fn flush(&mut self, output: &mut [f32]) -> Result<usize, Error> {
        let channel_count = self.channel_count;
        let output_frames = frame_count(output, channel_count);
        // authorize a single frame, but supply none to trigger a flush
        self.resampler.prepare(1, channel_count)?;
        let written = self.resampler.out(output, 0, output_frames, channel_count)?;
        Ok(written * channel_count)
    }

    fn reset(&mut self) {
        self.resampler.reset();
    }
}

// -------------------------------------------------------------------------------------------------

fn validate_rate(name: &str, rate: f64) -> Result<(), Error> {
    if rate > 0.0 && rate.is_finite() {
        Ok(())
    } else {
        Err(Error::ConfigurationError(format!(
            "'{name}' must be > 0, but is {rate}"
        )))
    }
}

fn validate_channel_count(channel_count: usize) -> Result<(), Error> {
    if (1..=Resampler::MAX_CHANNELS).contains(&channel_count) {
        Ok(())
    } else {
        Err(Error::ConfigurationError(format!(
            "channel count must be in range 1..={}, but is {channel_count}",
            Resampler::MAX_CHANNELS
        )))
    }
}

fn validate_sinc_sizes(sinc_size: usize, sinc_interp_size: usize) -> Result<(), Error> {
    if sinc_size == 0 {
        return Err(Error::ConfigurationError(
            "'sinc_size' must be > 0".to_string(),
        ));
    }
    if sinc_interp_size == 0 {
        return Err(Error::ConfigurationError(
            "'sinc_interp_size' must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_filter_parameters(position: f64, q: f64) -> Result<(), Error> {
    if !(position > 0.0 && position <= 1.0) {
        return Err(Error::ConfigurationError(format!(
            "'filter_position' must be in range (0, 1], but is {position}"
        )));
    }
    if !(q > 0.0 && q.is_finite()) {
        return Err(Error::ConfigurationError(format!(
            "'filter_q' must be > 0, but is {q}"
        )));
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use strum::IntoEnumIterator;

    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    /// Push the whole input through the prepare/out protocol in output driven mode, using the
    /// given output block sizes, then drain the resampler.
    fn stream(
        resampler: &mut Resampler,
        input: &[f32],
        channel_count: usize,
        mut block_size: impl FnMut() -> usize,
    ) -> Result<Vec<f32>, Error> {
        let frames = input.len() / channel_count;
        let mut output = Vec::new();
        let mut block = Vec::new();
        let mut offset = 0;
        while offset < frames {
            let block_frames = block_size();
            block.resize(block_frames * channel_count, 0.0);
            let buffer = resampler.prepare(block_frames, channel_count)?;
            let count = (buffer.len() / channel_count).min(frames - offset);
            buffer[..count * channel_count].copy_from_slice(
                &input[offset * channel_count..(offset + count) * channel_count],
            );
            let written = resampler.out(&mut block, count, block_frames, channel_count)?;
            output.extend_from_slice(&block[..written * channel_count]);
            offset += count;
        }
        while !resampler.is_drained() {
            let block_frames = block_size();
            block.resize(block_frames * channel_count, 0.0);
            resampler.prepare(block_frames, channel_count)?;
            let written = resampler.out(&mut block, 0, block_frames, channel_count)?;
            output.extend_from_slice(&block[..written * channel_count]);
        }
        Ok(output)
    }

    fn sine(frames: usize, frequency: f64, sample_rate: f64) -> Vec<f32> {
        (0..frames)
            .map(|frame| (2.0 * PI * frequency * frame as f64 / sample_rate).sin() as f32)
            .collect()
    }

    fn rms(buffer: &[f32]) -> f64 {
        let sum: f64 = buffer.iter().map(|sample| (*sample as f64).powi(2)).sum();
        (sum / buffer.len() as f64).sqrt()
    }

    #[test]
    fn unity_ratio_is_identity() -> Result<(), Box<Error>> {
        for interpolate in [false, true] {
            for channel_count in [1, 2, 5] {
                for block_frames in [1, 17, 256] {
                    let mut resampler =
                        Resampler::with_options(ResamplerOptions::default().mode(interpolate, 0))?;
                    let input: Vec<f32> = (0..1000 * channel_count).map(|i| i as f32).collect();
                    let output = stream(&mut resampler, &input, channel_count, || block_frames)?;
                    assert_eq!(output, input);
                    assert_eq!(resampler.current_latency(), 0.0);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn read_position_does_not_drift() -> Result<(), Box<Error>> {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let rates = [
            (44100.0, 48000.0),
            (48000.0, 44100.0),
            (96000.0, 44100.0),
            (22050.0, 96000.0),
            (44100.0, 44100.0),
            (384000.0, 8000.0),
        ];
        let modes = [
            ResamplerOptions::default().quality(ResamplingQuality::Linear),
            ResamplerOptions::default().quality(ResamplingQuality::HighQuality),
            ResamplerOptions::default().sinc(4, 32),
        ];
        for mode in modes {
            for (rate_in, rate_out) in rates {
                let mut resampler = Resampler::with_options(mode.rates(rate_in, rate_out))?;
                let ratio = resampler.ratio();
                let primed = if mode.sinc { mode.sinc_size / 2 - 1 } else { 0 };
                let channel_count = 2;
                let mut output = vec![0.0; 128 * channel_count];
                let mut committed = 0;
                let mut total_written = 0;
                for _ in 0..200 {
                    let block_frames = rng.random_range(1..=128);
                    let buffer = resampler.prepare(block_frames, channel_count)?;
                    let input_frames = buffer.len() / channel_count;
                    for sample in buffer.iter_mut() {
                        *sample = rng.random_range(-1.0..1.0);
                    }
                    let written =
                        resampler.out(&mut output, input_frames, block_frames, channel_count)?;
                    assert_eq!(written, block_frames, "{rate_in}->{rate_out}");
                    committed += input_frames;
                    total_written += written;

                    // priming only happens once at the stream start
                    let consumed = committed + primed - resampler.buffered_frames();
                    let position = resampler.fractional_position();
                    assert!((0.0..1.0).contains(&position), "position {position}");
                    assert_eq_with_epsilon!(
                        consumed as f64 + position,
                        total_written as f64 * ratio,
                        1e-6
                    );
                }
            }
        }
        Ok(())
    }

    #[test]
    fn high_downsampling_ratios_keep_the_stream_continuous() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(384000.0, 8000.0)
                .quality(ResamplingQuality::HighQuality),
        )?;
        let history = SincKernel::DEFAULT_SIZE / 2 - 1;
        let mut output = vec![0.0; 64];
        let mut committed = 0;
        for block in 0..200 {
            let buffer = resampler.prepare(64, 1)?;
            let input_frames = buffer.len();
            buffer.fill(1.0);
            assert_eq!(resampler.out(&mut output, input_frames, 64, 1)?, 64);
            committed += input_frames;
            // skip the fade-in from the silent history
            if block > 0 {
                for sample in &output {
                    assert_eq_with_epsilon!(*sample, 1.0, 1e-3);
                }
            }
        }
        let consumed = committed + history - resampler.buffered_frames();
        assert_eq_with_epsilon!(
            consumed as f64 + resampler.fractional_position(),
            200.0 * 64.0 * 48.0,
            1e-6
        );
        Ok(())
    }

    #[test]
    fn flush_renders_all_remaining_frames() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(48000.0, 44100.0)
                .quality(ResamplingQuality::HighQuality),
        )?;
        let input = sine(4800, 1000.0, 48000.0);
        let output = stream(&mut resampler, &input, 1, || 512)?;
        let expected = (4800.0_f64 * 44100.0 / 48000.0).ceil() as isize;
        assert!((output.len() as isize - expected).abs() <= 1, "{}", output.len());
        assert!(resampler.is_drained());
        assert_eq!(resampler.buffered_frames(), 0);

        // a drained resampler starts a new session with the next prepare
        let output = stream(&mut resampler, &input, 1, || 100)?;
        assert!((output.len() as isize - expected).abs() <= 1, "{}", output.len());
        Ok(())
    }

    #[test]
    fn latency_decreases_while_draining() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(48000.0, 44100.0)
                .quality(ResamplingQuality::HighQuality),
        )?;
        assert_eq!(resampler.current_latency(), 0.0);

        let mut output = vec![0.0; 256];
        for _ in 0..2 {
            let input = resampler.prepare(256, 1)?;
            let input_frames = input.len();
            input.fill(0.5);
            resampler.out(&mut output, input_frames, 256, 1)?;
            assert!(resampler.current_latency() > 0.0);
        }

        // reset in the middle of a stream
        resampler.reset();
        assert_eq!(resampler.current_latency(), 0.0);

        let input = resampler.prepare(256, 1)?;
        let input_frames = input.len();
        input.fill(0.5);
        resampler.out(&mut output, input_frames, 256, 1)?;
        let mut latency = resampler.current_latency();
        assert!(latency > 0.0);

        for _ in 0..1000 {
            resampler.prepare(16, 1)?;
            resampler.out(&mut output, 0, 16, 1)?;
            let next_latency = resampler.current_latency();
            if resampler.is_drained() {
                assert_eq!(next_latency, 0.0);
                break;
            }
            assert!(next_latency < latency, "{next_latency} >= {latency}");
            latency = next_latency;
        }
        assert!(resampler.is_drained());
        Ok(())
    }

    #[test]
    fn prepare_is_idempotent() -> Result<(), Box<Error>> {
        for quality in ResamplingQuality::iter() {
            let mut resampler = Resampler::with_options(
                ResamplerOptions::default()
                    .rates(44100.0, 32000.0)
                    .quality(quality),
            )?;
            let first = resampler.prepare(100, 2)?.len();
            let buffered = resampler.buffered_frames();
            let second = resampler.prepare(100, 2)?.len();
            assert_eq!(first, second);
            assert_eq!(buffered, resampler.buffered_frames());
        }
        Ok(())
    }

    #[test]
    fn rates_can_change_while_streaming() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(ResamplerOptions::default().mode(true, 0))?;
        let input: Vec<f32> = (0..4096).map(|i| i as f32).collect();
        let mut offset = 0;
        let mut output = Vec::new();
        let mut block = vec![0.0; 64];
        for index in 0..10 {
            if index == 5 {
                let buffered = resampler.buffered_frames();
                let position = resampler.fractional_position();
                resampler.set_rates(22050.0, 44100.0)?;
                assert_eq!(resampler.ratio(), 0.5);
                assert_eq!(resampler.buffered_frames(), buffered);
                assert_eq!(resampler.fractional_position(), position);
            }
            let buffer = resampler.prepare(64, 1)?;
            let count = buffer.len();
            buffer.copy_from_slice(&input[offset..offset + count]);
            offset += count;
            let written = resampler.out(&mut block, count, 64, 1)?;
            assert_eq!(written, 64);
            output.extend_from_slice(&block);
        }
        // a continuous ramp: full steps before, half steps after the change
        for pair in output.windows(2) {
            let step = pair[1] - pair[0];
            assert!(
                (step - 1.0).abs() < 1e-4 || (step - 0.5).abs() < 1e-4,
                "step {step}"
            );
        }
        assert_eq!(output[319], 319.0);
        assert_eq!(output[320], 320.0);
        assert_eq!(output[321], 320.5);
        Ok(())
    }

    #[test]
    fn protocol_errors() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::new();
        let mut output = vec![0.0; 64];

        // out without prepare
        assert!(matches!(
            resampler.out(&mut output, 0, 16, 1),
            Err(Error::ProtocolViolation(_))
        ));
        // invalid channel layouts
        assert!(matches!(
            resampler.prepare(16, 0),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            resampler.prepare(16, Resampler::MAX_CHANNELS + 1),
            Err(Error::ConfigurationError(_))
        ));

        let authorized = resampler.prepare(16, 2)?.len() / 2;
        // more input than authorized
        assert!(matches!(
            resampler.out(&mut output, authorized + 1, 16, 2),
            Err(Error::ProtocolViolation(_))
        ));
        // other channel layout than prepared
        assert!(matches!(
            resampler.out(&mut output, authorized, 16, 1),
            Err(Error::ProtocolViolation(_))
        ));
        // output buffer too small
        assert_eq!(
            resampler.out(&mut output, authorized, 40, 2),
            Err(Error::CapacityExceeded {
                requested: 40,
                available: 32
            })
        );
        // more output than prepared
        assert_eq!(
            resampler.out(&mut output, authorized, 20, 2),
            Err(Error::CapacityExceeded {
                requested: 20,
                available: 16
            })
        );
        // errors don't break the session
        assert_eq!(resampler.out(&mut output, authorized, 16, 2), Ok(16));
        Ok(())
    }

    #[test]
    fn configuration_errors() {
        let mut resampler = Resampler::new();
        assert!(resampler.set_rates(0.0, 44100.0).is_err());
        assert!(resampler.set_rates(44100.0, -1.0).is_err());
        assert!(resampler.set_rates(f64::NAN, 44100.0).is_err());
        assert!(resampler.set_rates(f64::INFINITY, 44100.0).is_err());
        assert_eq!(resampler.ratio(), 1.0);

        assert!(resampler.set_mode(true, 0, true, 0, 32).is_err());
        assert!(resampler.set_mode(true, 0, true, 64, 0).is_err());
        assert_eq!(resampler.interpolation_mode(), InterpolationMode::Linear);

        assert!(resampler.set_filter_parameters(0.0, 0.707).is_err());
        assert!(resampler.set_filter_parameters(1.2, 0.707).is_err());
        assert!(resampler.set_filter_parameters(0.5, 0.0).is_err());
        assert_eq!(
            resampler.filter_parameters(),
            (Resampler::DEFAULT_FILTER_POSITION, Resampler::DEFAULT_FILTER_Q)
        );

        assert!(Resampler::with_options(ResamplerOptions::default().rates(0.0, 1.0)).is_err());
        assert!(Resampler::with_options(ResamplerOptions::default().sinc(0, 32)).is_err());
        assert!(BlockResampler::new(ResamplerOptions::default(), 0).is_err());
    }

    #[test]
    fn mode_parameters_get_clamped() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::new();
        resampler.set_mode(true, 0, true, 3, 32)?;
        assert_eq!(resampler.tap_span(), SincKernel::MIN_SIZE);
        resampler.set_mode(true, 0, true, 65, 32)?;
        assert_eq!(resampler.tap_span(), 64);
        resampler.set_mode(true, 0, true, 4000, 32)?;
        assert_eq!(resampler.tap_span(), SincKernel::MAX_SIZE);
        resampler.set_mode(true, 0, true, 16, 8000)?;
        resampler.prealloc(1, 16, 16)?;
        assert!(resampler
            .kernel()
            .is_some_and(|kernel| kernel.oversize() == SincKernel::MAX_INTERPOLATION_SIZE));

        resampler.set_mode(false, 9, false, 64, 32)?;
        assert_eq!(resampler.filter_count(), Resampler::MAX_FILTER_STAGES);
        assert_eq!(resampler.interpolation_mode(), InterpolationMode::Nearest);
        assert_eq!(resampler.tap_span(), 1);
        Ok(())
    }

    #[test]
    fn cascade_filters_at_unity_ratio() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default().quality(ResamplingQuality::Default),
        )?;
        assert_eq!(resampler.filter_count(), 1);
        let input: Vec<f32> = (0..4096)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let output = stream(&mut resampler, &input, 1, || 128)?;
        assert_eq!(output.len(), input.len());
        assert!(rms(&output[1024..3072]) < 0.1);
        Ok(())
    }

    #[test]
    fn all_qualities_keep_the_signal() -> Result<(), Box<Error>> {
        for quality in ResamplingQuality::iter() {
            for (rate_in, rate_out) in [(44100.0, 48000.0), (48000.0, 44100.0)] {
                let mut resampler = Resampler::with_options(
                    ResamplerOptions::default()
                        .rates(rate_in, rate_out)
                        .quality(quality),
                )?;
                let input = sine(8192, 440.0, rate_in);
                let output = stream(&mut resampler, &input, 1, || 333)?;
                let expected = 8192.0 * rate_out / rate_in;
                assert!((output.len() as f64 - expected).abs() <= 2.0, "{quality}");
                let level = rms(&output[1024..output.len() - 1024]);
                assert_eq_with_epsilon!(level, std::f64::consts::FRAC_1_SQRT_2, 0.05);
            }
        }
        Ok(())
    }

    #[test]
    fn sinc_interpolation_is_accurate() -> Result<(), Box<Error>> {
        let (rate_in, rate_out) = (44100.0, 48000.0);
        let frequency = 1000.0;
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(rate_in, rate_out)
                .quality(ResamplingQuality::HighQuality),
        )?;
        let input = sine(4410, frequency, rate_in);
        let output = stream(&mut resampler, &input, 1, || 441)?;
        let ratio = rate_in / rate_out;
        // skip the kernel's fade-in and fade-out at the stream's edges
        for (frame, sample) in output.iter().enumerate().skip(200).take(output.len() - 400) {
            let expected = (2.0 * PI * frequency * frame as f64 * ratio / rate_in).sin();
            assert_eq_with_epsilon!(*sample as f64, expected, 2e-3);
        }
        Ok(())
    }

    #[test]
    fn linear_upsampling_of_a_ramp() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(22050.0, 44100.0)
                .mode(true, 0),
        )?;
        let input: Vec<f32> = (0..500).map(|i| i as f32).collect();
        let output = stream(&mut resampler, &input, 1, || 64)?;
        assert_eq!(output.len(), 1000);
        for (frame, sample) in output.iter().enumerate().take(999) {
            assert_eq!(*sample, frame as f32 * 0.5);
        }
        Ok(())
    }

    #[test]
    fn input_driven_feeding() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(22050.0, 44100.0)
                .mode(true, 0)
                .feed_mode(FeedMode::InputDriven),
        )?;
        let mut output = vec![0.0; 1000];

        let buffer = resampler.prepare(100, 1)?;
        assert_eq!(buffer.len(), 100);
        for (index, sample) in buffer.iter_mut().enumerate() {
            *sample = index as f32;
        }
        let written = resampler.out(&mut output, 100, 1000, 1)?;
        assert_eq!(written, 198);
        assert_eq!(output[197], 98.5);
        assert_eq!(resampler.available_output_frames(), 0);

        let buffer = resampler.prepare(10, 1)?;
        for (index, sample) in buffer.iter_mut().enumerate() {
            *sample = (100 + index) as f32;
        }
        assert_eq!(resampler.out(&mut output, 10, 0, 1)?, 0);
        assert_eq!(resampler.available_output_frames(), 20);

        resampler.prepare(0, 1)?;
        assert_eq!(resampler.out(&mut output, 0, 20, 1)?, 20);
        assert_eq!(output[0], 99.0);
        assert_eq!(output[19], 108.5);
        assert!(!resampler.is_drained());
        Ok(())
    }

    #[test]
    fn block_resampler() -> Result<(), Box<Error>> {
        let channel_count = 2;
        let mut block_resampler = BlockResampler::new(
            ResamplerOptions::default().rates(44100.0, 48000.0),
            channel_count,
        )?;
        assert_eq!(block_resampler.channel_count(), channel_count);
        assert_eq!(block_resampler.resampler().feed_mode(), FeedMode::InputDriven);

        let input: Vec<f32> = sine(1000, 440.0, 44100.0)
            .into_iter()
            .flat_map(|sample| [sample, -sample])
            .collect();
        let mut output = vec![0.0; 256 * channel_count];
        let mut offset = 0;
        let mut total = 0;
        loop {
            let (consumed, written) = block_resampler.process(&input[offset..], &mut output)?;
            for frame in output[..written].chunks_exact(channel_count) {
                assert_eq!(frame[0], -frame[1]);
            }
            offset += consumed;
            total += written;
            if consumed == 0 && written == 0 {
                break;
            }
        }
        assert_eq!(offset, input.len());
        loop {
            let written = block_resampler.flush(&mut output)?;
            total += written;
            if written < output.len() {
                break;
            }
        }
        let frames = total / channel_count;
        let expected = (1000.0_f64 * 48000.0 / 44100.0).ceil() as isize;
        assert!((frames as isize - expected).abs() <= 1, "{frames}");
        assert!(block_resampler.resampler().is_drained());

        block_resampler.reset();
        assert_eq!(block_resampler.resampler().buffered_frames(), 0);
        assert!(!block_resampler.resampler().is_drained());
        Ok(())
    }

    #[test]
    fn channel_layout_changes_restart_the_stream() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(
            ResamplerOptions::default()
                .rates(44100.0, 48000.0)
                .mode(true, 0),
        )?;
        let mut output = vec![0.0; 64];
        let buffer = resampler.prepare(10, 2)?;
        let frames = buffer.len() / 2;
        buffer.fill(1.0);
        resampler.out(&mut output, frames, 10, 2)?;
        assert!(resampler.buffered_frames() > 0);
        assert!(resampler.fractional_position() > 0.0);

        resampler.prepare(10, 1)?;
        assert_eq!(resampler.buffered_frames(), 0);
        assert_eq!(resampler.fractional_position(), 0.0);
        Ok(())
    }

    #[test]
    fn reset_with_position() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(ResamplerOptions::default().mode(true, 0))?;
        for position in [1.0, -0.1, 1e20, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resampler.reset_with_position(position),
                Err(Error::ConfigurationError(_))
            ));
        }
        resampler.reset_with_position(0.5)?;
        let input: Vec<f32> = (0..64).map(|i| i as f32).collect();
        let mut output = vec![0.0; 16];
        let buffer = resampler.prepare(16, 1)?;
        let frames = buffer.len();
        buffer.copy_from_slice(&input[..frames]);
        assert_eq!(resampler.out(&mut output, frames, 16, 1)?, 16);
        assert_eq!(output[0], 0.5);
        assert_eq!(output[15], 15.5);
        Ok(())
    }

    #[test]
    fn huge_frame_counts_are_rejected() -> Result<(), Box<Error>> {
        for feed_mode in FeedMode::iter() {
            let mut resampler = Resampler::with_options(
                ResamplerOptions::default()
                    .rates(44100.0, 48000.0)
                    .feed_mode(feed_mode),
            )?;
            assert!(matches!(
                resampler.prepare(usize::MAX, 2),
                Err(Error::CapacityExceeded { .. })
            ));
            assert!(matches!(
                resampler.prealloc(2, usize::MAX, 0),
                Err(Error::CapacityExceeded { .. })
            ));
            assert!(matches!(
                resampler.prealloc(2, 0, usize::MAX),
                Err(Error::CapacityExceeded { .. })
            ));
            // the session still works afterwards
            let mut output = vec![0.0; 32];
            let buffer = resampler.prepare(16, 2)?;
            let frames = buffer.len() / 2;
            buffer.fill(0.25);
            resampler.out(&mut output, frames, 16, 2)?;
        }
        let resampler = Resampler::new();
        assert_eq!(resampler.required_input_frames(usize::MAX), usize::MAX);
        Ok(())
    }

    #[test]
    fn mode_changes_keep_the_stream_aligned() -> Result<(), Box<Error>> {
        let mut resampler = Resampler::with_options(ResamplerOptions::default().mode(true, 0))?;
        let input: Vec<f32> = (0..8192).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut offset = 0;
        let mut output = Vec::new();
        let mut block = vec![0.0; 64];
        let qualities = [
            ResamplingQuality::Linear,
            ResamplingQuality::HighQuality,
            ResamplingQuality::Nearest,
            ResamplingQuality::HighQuality,
            ResamplingQuality::Linear,
        ];
        for quality in qualities {
            resampler.set_quality(quality)?;
            for _ in 0..8 {
                let buffer = resampler.prepare(64, 1)?;
                let count = buffer.len();
                buffer.copy_from_slice(&input[offset..offset + count]);
                offset += count;
                assert_eq!(resampler.out(&mut block, count, 64, 1)?, 64);
                output.extend_from_slice(&block);
            }
        }
        // unity ratio: every output frame lands on its input frame, whatever the mode
        for (frame, sample) in output.iter().enumerate() {
            assert_eq_with_epsilon!(*sample, input[frame], 1e-3);
        }
        Ok(())
    }

    #[test]
    fn prealloc_reserves_enough() -> Result<(), Box<Error>> {
        for quality in ResamplingQuality::iter() {
            let mut resampler = Resampler::with_options(
                ResamplerOptions::default()
                    .rates(48000.0, 44100.0)
                    .quality(quality),
            )?;
            resampler.prealloc(2, 0, 512)?;
            let capacity = resampler.ring.capacity();
            let input = sine(2 * 5000, 440.0, 48000.0);
            let mut rng = SmallRng::seed_from_u64(42);
            stream(&mut resampler, &input, 2, || rng.random_range(1..=512))?;
            assert_eq!(resampler.ring.capacity(), capacity, "{quality}");
        }
        Ok(())
    }
}
