// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pass scheduler.
//!
//! A render is a sequence of passes.  Each pass visits every pixel
//! once, takes one jittered sample inside it, runs the formula to
//! completion there, and adds the resulting linear-light color into
//! that pixel's slot of the accumulator.  When all passes are done the
//! accumulator is divided by the pass count and encoded for output.
//!
//! Within a pass, rows are handed out to worker threads one at a time
//! from a shared queue.  Each row is a disjoint `&mut` slice of the
//! accumulator, so two workers can never touch the same pixel, and the
//! crossbeam scope ends (joining every worker) before the next pass
//! begins.

use color::{Color, ColorMapper, Gradient};
use crossbeam;
use error::RenderError;
use fractal::{escape, Fractal};
use num_cpus;
use planes::{PlaneMapper, RenderConfig};
use sampling::Jitter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Where an accumulator is in its life.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RenderState {
    /// No pass has started.
    Pending,
    /// Passes are under way; the value is the next pass to run.
    Running(u32),
    /// Every pass has been accumulated.
    Done,
    /// A worker panicked part-way through this pass, leaving some rows
    /// added to and some not.  Nothing more can be run or finished.
    Failed(u32),
}

/// One running sum of linear-light color per pixel, row-major.
pub struct Accumulator {
    width: usize,
    height: usize,
    total: u32,
    state: RenderState,
    sums: Vec<Color>,
}

impl Accumulator {
    /// A zeroed buffer for `total` passes over a `width` x `height`
    /// image.
    pub fn new(width: usize, height: usize, total: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        if total == 0 {
            return Err(RenderError::InvalidPassCount);
        }
        Ok(Accumulator {
            width,
            height,
            total,
            state: RenderState::Pending,
            sums: vec![Color::black(); width * height],
        })
    }

    /// The current state.
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Passes accumulated so far.
    pub fn completed(&self) -> u32 {
        match self.state {
            RenderState::Pending => 0,
            RenderState::Running(pass) | RenderState::Failed(pass) => pass,
            RenderState::Done => self.total,
        }
    }

    /// The raw sums, for inspection.
    pub fn sums(&self) -> &[Color] {
        &self.sums
    }

    /// Run the next pass.  `sample(pass, x, y)` produces the color to
    /// add for pixel (x, y); it is called from `threads` workers at
    /// once, each working through whole rows.  Returns the pass index
    /// that was run.
    ///
    /// A finished accumulator refuses with `AllPassesRun`.  If a worker
    /// panics the accumulator moves to `Failed` and every later call
    /// returns `WorkerPanicked`.
    pub fn run_pass<F>(&mut self, threads: usize, sample: F) -> Result<u32, RenderError>
    where
        F: Fn(u32, usize, usize) -> Color + Sync,
    {
        let pass = match self.state {
            RenderState::Pending => 0,
            RenderState::Running(pass) => pass,
            RenderState::Done => return Err(RenderError::AllPassesRun(self.total)),
            RenderState::Failed(pass) => return Err(RenderError::WorkerPanicked(pass)),
        };
        let width = self.width;
        let workers = threads.max(1).min(self.height);
        let outcome = {
            let rows = Mutex::new(self.sums.chunks_mut(width).enumerate());
            let rows = &rows;
            let sample = &sample;
            let scoped = crossbeam::scope(|spawner| {
                for _ in 0..workers {
                    spawner.spawn(move |_| loop {
                        let row = match rows.lock() {
                            Ok(mut rows) => rows.next(),
                            Err(_) => None,
                        };
                        match row {
                            Some((y, row)) => {
                                for (x, slot) in row.iter_mut().enumerate() {
                                    *slot += sample(pass, x, y);
                                }
                            }
                            None => break,
                        }
                    });
                }
            });
            scoped
        };
        if outcome.is_err() {
            self.state = RenderState::Failed(pass);
            return Err(RenderError::WorkerPanicked(pass));
        }
        self.state = if pass + 1 >= self.total {
            RenderState::Done
        } else {
            RenderState::Running(pass + 1)
        };
        Ok(pass)
    }

    /// Average what has been accumulated and encode it.  Works on a
    /// partial render too, averaging over the passes that did run, but
    /// not on one where a pass failed.
    pub fn finish(self) -> Result<Image, RenderError> {
        if let RenderState::Failed(pass) = self.state {
            return Err(RenderError::WorkerPanicked(pass));
        }
        let passes = f64::from(self.completed().max(1));
        Ok(Image {
            width: self.width,
            height: self.height,
            pixels: self
                .sums
                .into_iter()
                .map(|sum| (sum / passes).to_encoded())
                .collect(),
        })
    }
}

/// The finished picture: encoded colors, row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// `width * height` encoded colors.
    pub pixels: Vec<Color>,
}

impl Image {
    /// The color at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.width + x]
    }

    /// Interleaved 8-bit RGB, ready for an image encoder.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.to_rgb8());
        }
        bytes
    }
}

/// Everything needed to render, validated and ready to go.
pub struct Renderer<G> {
    config: RenderConfig,
    plane: PlaneMapper,
    jitter: Jitter,
    fractal: Fractal,
    colors: ColorMapper<G>,
    threads: usize,
}

impl<G: Gradient> Renderer<G> {
    /// Fails if the configuration can't be rendered.  Uses one worker
    /// per CPU.
    pub fn new(
        config: RenderConfig,
        fractal: Fractal,
        colors: ColorMapper<G>,
    ) -> Result<Self, RenderError> {
        let plane = PlaneMapper::new(&config)?;
        Ok(Renderer {
            config,
            plane,
            jitter: Jitter::new(config.passes),
            fractal,
            colors,
            threads: num_cpus::get(),
        })
    }

    /// Use `threads` workers per pass; zero means one per CPU.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = if threads == 0 { num_cpus::get() } else { threads };
        self
    }

    /// The configuration being rendered.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The formula being rendered.
    pub fn fractal(&self) -> &Fractal {
        &self.fractal
    }

    /// Render every pass.
    pub fn render(&self) -> Result<Image, RenderError> {
        self.render_cancellable(&AtomicBool::new(false))
    }

    /// Render every pass, checking `cancel` before each one.  A raised
    /// flag ends the render with `RenderError::Cancelled`.
    pub fn render_cancellable(&self, cancel: &AtomicBool) -> Result<Image, RenderError> {
        let mut acc = self.accumulator()?;
        let started = Instant::now();
        while acc.state() != RenderState::Done {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    "cancelled after {} of {} passes",
                    acc.completed(),
                    self.config.passes
                );
                return Err(RenderError::Cancelled {
                    completed: acc.completed(),
                    total: self.config.passes,
                });
            }
            self.pass(&mut acc)?;
        }
        info!(
            "{} passes of {}x{} {} in {:.2}s",
            self.config.passes,
            self.config.width,
            self.config.height,
            self.fractal.name(),
            seconds(started)
        );
        acc.finish()
    }

    /// A fresh accumulator sized for this render.
    pub fn accumulator(&self) -> Result<Accumulator, RenderError> {
        Accumulator::new(self.config.width, self.config.height, self.config.passes)
    }

    /// Run the next pass of `acc`.
    pub fn pass(&self, acc: &mut Accumulator) -> Result<u32, RenderError> {
        let started = Instant::now();
        let anomalies = AtomicUsize::new(0);
        let pass = acc.run_pass(self.threads, |pass, x, y| {
            let (color, anomaly) = self.sample(pass, x, y);
            if anomaly {
                anomalies.fetch_add(1, Ordering::Relaxed);
            }
            color
        })?;
        let anomalies = anomalies.load(Ordering::Relaxed);
        if anomalies > 0 {
            warn!(
                "pass {}: {} samples produced a non-finite iterate",
                pass, anomalies
            );
        }
        debug!("pass {} done in {:.3}s", pass, seconds(started));
        Ok(pass)
    }

    /// The linear-light color of one sample, and whether the orbit blew
    /// up into NaN or infinity on the way.
    pub fn sample(&self, pass: u32, x: usize, y: usize) -> (Color, bool) {
        let index = y * self.config.width + x;
        let (dx, dy) = self.jitter.offset(index as u32, pass);
        let z0 = self.plane.pixel_to_point(x as f64 + dx, y as f64 + dy);
        let mut formula = self.fractal;
        let result = escape(&mut formula, z0);
        (self.colors.color_for(&result), result.anomaly)
    }
}

fn seconds(since: Instant) -> f64 {
    let elapsed = since.elapsed();
    elapsed.as_secs() as f64 + f64::from(elapsed.subsec_nanos()) * 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use color::{linear_to_encoded, Solid, StopGradient};
    use complex::{Complex64, Power};
    use fractal::Mandelbrot;
    use itertools::iproduct;

    fn mandelbrot(max_iter: u32, bailout: f64) -> Fractal {
        Fractal::Mandelbrot(Mandelbrot {
            max_iter,
            exponent: Power::Integer(2),
            bailout,
        })
    }

    fn tiny(passes: u32) -> RenderConfig {
        RenderConfig {
            width: 4,
            height: 4,
            center: Complex64::new(0.0, 0.0),
            span: 2.0,
            passes,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn four_by_four_mandelbrot() {
        let white = Color::gray(1.0);
        let renderer = Renderer::new(
            tiny(1),
            mandelbrot(50, 4.0),
            ColorMapper::new(Solid(white)),
        )
        .unwrap()
        .with_threads(2);
        for &(x, y) in &[(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert_eq!(renderer.sample(0, x, y).0, white.to_linear(), "corner {},{}", x, y);
        }
        assert_eq!(renderer.sample(0, 2, 2).0, Color::black());

        let image = renderer.render().unwrap();
        assert_eq!(image.pixels.len(), 16);
        assert_eq!(image.pixel(2, 2), Color::black());
        for &(x, y) in &[(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert!((image.pixel(x, y).r - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn averaging_identical_passes_changes_nothing() {
        // Far enough from the set that every jittered sample escapes on
        // the first step, so every pass adds the same color.
        let far = |passes| RenderConfig {
            center: Complex64::new(10.0, 10.0),
            span: 1.0,
            ..tiny(passes)
        };
        let colors = || ColorMapper::new(Solid(Color::new(0.2, 0.5, 0.9)));
        let one = Renderer::new(far(1), mandelbrot(50, 4.0), colors())
            .unwrap()
            .render()
            .unwrap();
        let many = Renderer::new(far(37), mandelbrot(50, 4.0), colors())
            .unwrap()
            .render()
            .unwrap();
        for (a, b) in one.pixels.iter().zip(many.pixels.iter()) {
            assert!((a.r - b.r).abs() < 1e-9 && (a.g - b.g).abs() < 1e-9 && (a.b - b.b).abs() < 1e-9);
        }
        assert!((one.pixel(0, 0).g - 0.5).abs() < 1e-9);
    }

    #[test]
    fn thread_count_does_not_change_the_result() {
        let config = RenderConfig {
            width: 24,
            height: 17,
            passes: 5,
            ..RenderConfig::default()
        };
        let render = |threads| {
            Renderer::new(
                config,
                mandelbrot(100, 128.0),
                ColorMapper::new(StopGradient::preset("standard").unwrap()),
            )
            .unwrap()
            .with_threads(threads)
            .render()
            .unwrap()
        };
        let single = render(1);
        assert_eq!(single, render(3));
        assert_eq!(single, render(64));
    }

    #[test]
    fn accumulator_walks_through_its_states() {
        let mut acc = Accumulator::new(3, 2, 2).unwrap();
        assert_eq!(acc.state(), RenderState::Pending);
        assert_eq!(acc.run_pass(2, |pass, x, y| Color::new(x as f64, y as f64, f64::from(pass))), Ok(0));
        assert_eq!(acc.state(), RenderState::Running(1));
        assert_eq!(acc.completed(), 1);
        assert_eq!(acc.run_pass(2, |pass, x, y| Color::new(x as f64, y as f64, f64::from(pass))), Ok(1));
        assert_eq!(acc.state(), RenderState::Done);
        for (y, x) in iproduct!(0..2, 0..3) {
            assert_eq!(acc.sums()[y * 3 + x], Color::new(2.0 * x as f64, 2.0 * y as f64, 1.0));
        }
        // A finished accumulator refuses to run and keeps its sums.
        assert_eq!(
            acc.run_pass(1, |_, _, _| Color::gray(100.0)),
            Err(RenderError::AllPassesRun(2))
        );
        assert_eq!(acc.state(), RenderState::Done);
        assert_eq!(acc.sums()[0], Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn finishing_averages_and_encodes() {
        let mut acc = Accumulator::new(2, 2, 4).unwrap();
        for _ in 0..4 {
            acc.run_pass(1, |pass, _, _| Color::gray(f64::from(pass) * 0.1)).unwrap();
        }
        let image = acc.finish().unwrap();
        // (0 + 0.1 + 0.2 + 0.3) / 4
        let expected = linear_to_encoded(0.15);
        assert!((image.pixel(1, 1).r - expected).abs() < 1e-12);
        assert_eq!(image.to_rgb8().len(), 12);
    }

    #[test]
    fn accumulator_rejects_degenerate_sizes() {
        assert!(Accumulator::new(0, 5, 1).is_err());
        assert_eq!(Accumulator::new(5, 5, 0).err(), Some(RenderError::InvalidPassCount));
    }

    #[test]
    fn a_raised_flag_cancels_before_the_first_pass() {
        let renderer = Renderer::new(tiny(8), mandelbrot(50, 4.0), ColorMapper::new(Solid(Color::black())))
            .unwrap();
        let cancel = AtomicBool::new(true);
        assert_eq!(
            renderer.render_cancellable(&cancel),
            Err(RenderError::Cancelled {
                completed: 0,
                total: 8,
            })
        );
    }

    #[test]
    fn a_flag_raised_mid_render_stops_at_the_next_pass() {
        // Every sample escapes, so the gradient sees exactly one call per
        // pixel per pass; it raises the flag once three passes are in.
        let cancel = AtomicBool::new(false);
        let calls = AtomicUsize::new(0);
        let gradient = |_: f64| {
            if calls.fetch_add(1, Ordering::SeqCst) + 1 == 3 * 16 {
                cancel.store(true, Ordering::SeqCst);
            }
            Color::gray(0.5)
        };
        let far = RenderConfig {
            center: Complex64::new(10.0, 10.0),
            span: 1.0,
            ..tiny(8)
        };
        let renderer = Renderer::new(far, mandelbrot(50, 4.0), ColorMapper::new(gradient))
            .unwrap()
            .with_threads(2);
        assert_eq!(
            renderer.render_cancellable(&cancel),
            Err(RenderError::Cancelled {
                completed: 3,
                total: 8,
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3 * 16);
    }

    #[test]
    fn a_panicking_sampler_poisons_the_accumulator() {
        let mut acc = Accumulator::new(2, 2, 1).unwrap();
        let result = acc.run_pass(2, |_, x, y| {
            if (x, y) == (1, 1) {
                panic!("boom");
            }
            Color::gray(1.0)
        });
        assert_eq!(result, Err(RenderError::WorkerPanicked(0)));
        assert_eq!(acc.state(), RenderState::Failed(0));
        assert_eq!(acc.completed(), 0);

        // A retry must not add a second helping to the rows that made
        // it through the first attempt.
        let before = acc.sums().to_vec();
        assert_eq!(
            acc.run_pass(2, |_, _, _| Color::gray(1.0)),
            Err(RenderError::WorkerPanicked(0))
        );
        assert_eq!(acc.sums(), &before[..]);
        assert_eq!(acc.state(), RenderState::Failed(0));
        assert_eq!(acc.finish(), Err(RenderError::WorkerPanicked(0)));
    }

    #[test]
    fn bad_configuration_is_rejected_up_front() {
        let mut config = tiny(1);
        config.height = 0;
        assert!(Renderer::new(config, mandelbrot(5, 4.0), ColorMapper::new(Solid(Color::black()))).is_err());
    }
}
