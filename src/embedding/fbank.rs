//! Kaldi-compatible log-mel filterbank features for the speaker encoder.
//!
//! Mirrors `kaldi.fbank` defaults used when training WeSpeaker models:
//! 25ms Povey-windowed frames every 10ms, DC removal, 0.97 pre-emphasis,
//! power spectrum, 80 triangular bins on the `1127 ln(1 + f/700)` mel scale
//! between 20 Hz and Nyquist - 400 Hz.

use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct FbankConfig {
    pub sample_rate: u32,
    pub num_mels: usize,
    /// Frame length in samples (400 = 25ms at 16kHz)
    pub frame_length: usize,
    /// Frame shift in samples (160 = 10ms at 16kHz)
    pub frame_shift: usize,
    pub pre_emphasis: f64,
    pub low_freq: f64,
    /// Upper edge; zero or negative is an offset from Nyquist
    pub high_freq: f64,
    pub remove_dc: bool,
    /// Scale normalized input back to the int16 range before analysis
    pub scale_to_pcm16: bool,
}

impl Default for FbankConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            num_mels: 80,
            frame_length: 400,
            frame_shift: 160,
            pre_emphasis: 0.97,
            low_freq: 20.0,
            high_freq: -400.0,
            remove_dc: true,
            scale_to_pcm16: true,
        }
    }
}

/// Precomputed window and mel weights for one configuration.
#[derive(Debug, Clone)]
pub struct Fbank {
    config: FbankConfig,
    fft_size: usize,
    window: Vec<f64>,
    /// Per mel bin: first FFT bin index and its weights
    filters: Vec<(usize, Vec<f64>)>,
}

impl Fbank {
    pub fn new(config: FbankConfig) -> Self {
        let fft_size = config.frame_length.max(1).next_power_of_two();
        let window = povey_window(config.frame_length);
        let filters = mel_filters(&config, fft_size);
        Self {
            config,
            fft_size,
            window,
            filters,
        }
    }

    pub fn config(&self) -> &FbankConfig {
        &self.config
    }

    /// Number of frames `samples` produces (no padding at the tail).
    pub fn num_frames(&self, samples: usize) -> usize {
        let cfg = &self.config;
        if cfg.frame_shift == 0 || samples < cfg.frame_length {
            return 0;
        }
        (samples - cfg.frame_length) / cfg.frame_shift + 1
    }

    /// Log-mel energies, `[frames][num_mels]`.
    ///
    /// `None` when the waveform does not fill a single frame.
    pub fn compute(&self, samples: &[f32]) -> Option<Vec<Vec<f32>>> {
        let cfg = &self.config;
        let frames = self.num_frames(samples.len());
        if frames == 0 || cfg.num_mels == 0 {
            return None;
        }

        let scale = if cfg.scale_to_pcm16 { 32768.0 } else { 1.0 };
        let mut re = vec![0.0f64; self.fft_size];
        let mut im = vec![0.0f64; self.fft_size];
        let mut power = vec![0.0f64; self.fft_size / 2 + 1];
        let mut out = Vec::with_capacity(frames);

        for frame_idx in 0..frames {
            let start = frame_idx * cfg.frame_shift;
            let frame = &samples[start..start + cfg.frame_length];

            re.iter_mut().for_each(|v| *v = 0.0);
            im.iter_mut().for_each(|v| *v = 0.0);
            for (dst, &s) in re.iter_mut().zip(frame) {
                *dst = s as f64 * scale;
            }

            let n = cfg.frame_length;
            if cfg.remove_dc {
                let mean = re[..n].iter().sum::<f64>() / n as f64;
                re[..n].iter_mut().for_each(|v| *v -= mean);
            }
            if cfg.pre_emphasis != 0.0 {
                for i in (1..n).rev() {
                    re[i] -= cfg.pre_emphasis * re[i - 1];
                }
                re[0] -= cfg.pre_emphasis * re[0];
            }
            for (v, w) in re[..n].iter_mut().zip(&self.window) {
                *v *= w;
            }

            fft_in_place(&mut re, &mut im);
            for (k, p) in power.iter_mut().enumerate() {
                *p = re[k] * re[k] + im[k] * im[k];
            }

            let energies = self
                .filters
                .iter()
                .map(|(first, weights)| {
                    let energy: f64 = weights
                        .iter()
                        .zip(&power[*first..])
                        .map(|(w, p)| w * p)
                        .sum();
                    energy.max(f32::EPSILON as f64).ln() as f32
                })
                .collect();
            out.push(energies);
        }

        Some(out)
    }
}

/// Subtract each bin's mean over all frames (utterance-level CMN).
pub fn subtract_mean(features: &mut [Vec<f32>]) {
    let Some(first) = features.first() else {
        return;
    };
    let bins = first.len();
    let frames = features.len() as f64;

    let mut means = vec![0.0f64; bins];
    for frame in features.iter() {
        for (m, &v) in means.iter_mut().zip(frame) {
            *m += v as f64;
        }
    }
    means.iter_mut().for_each(|m| *m /= frames);

    for frame in features.iter_mut() {
        for (v, &m) in frame.iter_mut().zip(&means) {
            *v = (*v as f64 - m) as f32;
        }
    }
}

fn povey_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos()).powf(0.85))
        .collect()
}

fn mel(hz: f64) -> f64 {
    1127.0 * (1.0 + hz / 700.0).ln()
}

/// Triangular filters evaluated on the mel value of each FFT bin centre.
fn mel_filters(cfg: &FbankConfig, fft_size: usize) -> Vec<(usize, Vec<f64>)> {
    let nyquist = cfg.sample_rate as f64 / 2.0;
    let high = if cfg.high_freq <= 0.0 {
        nyquist + cfg.high_freq
    } else {
        cfg.high_freq
    };
    let mel_low = mel(cfg.low_freq);
    let mel_high = mel(high);
    let delta = (mel_high - mel_low) / (cfg.num_mels + 1) as f64;
    let bin_hz = cfg.sample_rate as f64 / fft_size as f64;
    let bins = fft_size / 2;

    (0..cfg.num_mels)
        .map(|m| {
            let left = mel_low + m as f64 * delta;
            let centre = left + delta;
            let right = centre + delta;

            let mut first = None;
            let mut weights = Vec::new();
            for k in 0..bins {
                let x = mel(k as f64 * bin_hz);
                let w = if x > left && x <= centre {
                    (x - left) / (centre - left)
                } else if x > centre && x < right {
                    (right - x) / (right - centre)
                } else {
                    0.0
                };
                if w > 0.0 {
                    first.get_or_insert(k);
                    weights.push(w);
                } else if first.is_some() {
                    break;
                }
            }
            (first.unwrap_or(0), weights)
        })
        .collect()
}

/// Iterative radix-2 FFT over split real/imaginary buffers.
///
/// Length must be a power of two.
fn fft_in_place(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    if n <= 1 {
        return;
    }

    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let step = -2.0 * PI / len as f64;
        for start in (0..n).step_by(len) {
            for k in 0..half {
                let (sin, cos) = (step * k as f64).sin_cos();
                let a = start + k;
                let b = a + half;
                let t_re = re[b] * cos - im[b] * sin;
                let t_im = re[b] * sin + im[b] * cos;
                re[b] = re[a] - t_re;
                im[b] = im[a] - t_im;
                re[a] += t_re;
                im[a] += t_im;
            }
        }
        len <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, seconds: f64) -> Vec<f32> {
        let n = (16000.0 * seconds) as usize;
        (0..n)
            .map(|i| (0.5 * (2.0 * PI * freq * i as f64 / 16000.0).sin()) as f32)
            .collect()
    }

    #[test]
    fn too_short_for_one_frame() {
        let fbank = Fbank::new(FbankConfig::default());
        assert!(fbank.compute(&[0.0; 399]).is_none());
        assert_eq!(fbank.num_frames(399), 0);
    }

    #[test]
    fn frame_count_and_shape() {
        let fbank = Fbank::new(FbankConfig::default());
        // (16000 - 400) / 160 + 1
        let features = fbank.compute(&tone(440.0, 1.0)).unwrap();
        assert_eq!(features.len(), 98);
        assert!(features.iter().all(|f| f.len() == 80));
        assert!(features.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn silence_hits_the_energy_floor() {
        let fbank = Fbank::new(FbankConfig::default());
        let features = fbank.compute(&[0.0; 800]).unwrap();
        assert_eq!(features.len(), 3);
        let floor = (f32::EPSILON as f64).ln() as f32;
        assert!(features.iter().flatten().all(|&v| (v - floor).abs() < 1e-4));
    }

    #[test]
    fn tone_energy_peaks_near_its_frequency() {
        let fbank = Fbank::new(FbankConfig::default());
        let low = fbank.compute(&tone(300.0, 0.5)).unwrap();
        let high = fbank.compute(&tone(3000.0, 0.5)).unwrap();

        let argmax = |frame: &Vec<f32>| {
            frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap()
        };
        assert!(argmax(&low[10]) < argmax(&high[10]));
    }

    #[test]
    fn every_filter_has_weights() {
        let fbank = Fbank::new(FbankConfig::default());
        assert_eq!(fbank.filters.len(), 80);
        assert!(fbank.filters.iter().all(|(_, w)| !w.is_empty()));
        // Filters move up the spectrum monotonically.
        assert!(fbank.filters.windows(2).all(|p| p[0].0 <= p[1].0));
    }

    #[test]
    fn subtract_mean_zeroes_each_bin() {
        let mut features = vec![vec![1.0f32, 10.0], vec![3.0, 20.0], vec![5.0, 30.0]];
        subtract_mean(&mut features);
        for bin in 0..2 {
            let sum: f32 = features.iter().map(|f| f[bin]).sum();
            assert!(sum.abs() < 1e-5);
        }
        assert_eq!(features[0], vec![-2.0, -10.0]);
    }

    #[test]
    fn subtract_mean_empty_is_noop() {
        let mut features: Vec<Vec<f32>> = Vec::new();
        subtract_mean(&mut features);
        assert!(features.is_empty());
    }

    #[test]
    fn fft_of_impulse_is_flat() {
        let mut re = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut im = vec![0.0; 8];
        fft_in_place(&mut re, &mut im);
        assert!(re.iter().all(|v| (v - 1.0).abs() < 1e-12));
        assert!(im.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn fft_finds_pure_cosine_bin() {
        let n = 16;
        let mut re: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 3.0 * i as f64 / n as f64).cos())
            .collect();
        let mut im = vec![0.0; n];
        fft_in_place(&mut re, &mut im);
        let mags: Vec<f64> = re.iter().zip(&im).map(|(r, i)| (r * r + i * i).sqrt()).collect();
        assert!((mags[3] - 8.0).abs() < 1e-9);
        assert!((mags[13] - 8.0).abs() < 1e-9);
        assert!(mags[5] < 1e-9);
    }
}
