//! Mixer - sums instrument outputs, applies master gain and a hard clip.

/// A summing bus with a fixed capacity, allocated once.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
    len: usize,
}

impl Mixer {
    pub fn new(master_gain: f64, capacity: usize) -> Self {
        Mixer {
            master_gain,
            buffer: vec![0.0; capacity],
            len: 0,
        }
    }

    /// Largest chunk the bus can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Zero the first `num_samples` slots and make them the active chunk.
    pub fn clear(&mut self, num_samples: usize) {
        debug_assert!(num_samples <= self.buffer.len(), "chunk larger than mixer");
        self.len = num_samples.min(self.buffer.len());
        self.buffer[..self.len].fill(0.0);
    }

    /// Add a rendered source into the active chunk.
    pub fn accumulate(&mut self, source: &[f64]) {
        for (acc, &s) in self.buffer[..self.len].iter_mut().zip(source) {
            *acc += s;
        }
    }

    /// Write the active chunk to `out` with master gain and hard clipping.
    pub fn write_output(&self, out: &mut [f32]) {
        for (o, &s) in out.iter_mut().zip(&self.buffer[..self.len]) {
            *o = hard_clip(s * self.master_gain) as f32;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Clamp to [-1, 1]. NaN maps to silence so the clip is total.
#[inline]
pub fn hard_clip(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) }
}
