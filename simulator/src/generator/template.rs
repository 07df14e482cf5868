use rand::{rngs::StdRng, Rng};

/// Samples of the bright bed return right after the water column.
const BED_RETURN_SAMPLES: usize = 3;

/// One flat-bottom side-scan ping: a dark water column down to the bed,
/// a bright bed return, then seabed backscatter fading with range.
pub fn flat_bottom_ping(samples: usize, depth_samples: usize, rng: &mut StdRng) -> Vec<u8> {
    let fade = (samples as f64 * 0.6).max(1.0);
    (0..samples)
        .map(|i| {
            if i < depth_samples {
                return rng.gen_range(2..8);
            }
            let beyond = i - depth_samples;
            if beyond < BED_RETURN_SAMPLES {
                return 230;
            }
            let backscatter = 40.0 + 140.0 * (-(beyond as f64) / fade).exp();
            let speckle = rng.gen_range(-15.0..15.0);
            (backscatter + speckle).round().clamp(1.0, 255.0) as u8
        })
        .collect()
}
