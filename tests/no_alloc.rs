//! Checks that the render path of a preallocated resampler never allocates.

use phonic_resampler::{Error, Resampler, ResamplerOptions, ResamplingQuality};
use strum::IntoEnumIterator;

// -------------------------------------------------------------------------------------------------

#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

#[test]
fn preallocated_streams_do_not_allocate() -> Result<(), Error> {
    const CHANNEL_COUNT: usize = 2;
    const BLOCK_SIZE: usize = 256;

    for quality in ResamplingQuality::iter() {
        for (rate_in, rate_out) in [(44100.0, 48000.0), (48000.0, 44100.0), (96000.0, 22050.0)] {
            let mut resampler = Resampler::with_options(
                ResamplerOptions::default()
                    .rates(rate_in, rate_out)
                    .quality(quality),
            )?;
            resampler.prealloc(CHANNEL_COUNT, 0, BLOCK_SIZE)?;

            let mut output = vec![0.0; BLOCK_SIZE * CHANNEL_COUNT];
            assert_no_alloc::assert_no_alloc(|| -> Result<(), Error> {
                // stream a few blocks, then flush until drained
                for block in 0..64 {
                    let buffer = resampler.prepare(BLOCK_SIZE, CHANNEL_COUNT)?;
                    let input_frames = buffer.len() / CHANNEL_COUNT;
                    for (index, sample) in buffer.iter_mut().enumerate() {
                        *sample = ((block * BLOCK_SIZE + index) as f32 * 0.01).sin();
                    }
                    resampler.out(&mut output, input_frames, BLOCK_SIZE, CHANNEL_COUNT)?;
                }
                while !resampler.is_drained() {
                    resampler.prepare(BLOCK_SIZE, CHANNEL_COUNT)?;
                    resampler.out(&mut output, 0, BLOCK_SIZE, CHANNEL_COUNT)?;
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}
