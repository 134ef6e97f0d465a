use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct UnsafePointer<T> {
    ptr: usize,
    phantom: PhantomData<T>,
}
unsafe impl<T> Sync for UnsafePointer<T> {}
unsafe impl<T> Send for UnsafePointer<T> {}
impl<T> UnsafePointer<T> {
    pub fn new(p: *mut T) -> Self {
        Self {
            ptr: p as usize,
            phantom: PhantomData,
        }
    }
    pub fn as_ptr(&self) -> *mut T {
        self.ptr as *mut T
    }
}

pub fn parallel_for<F: Fn(usize) + Sync>(count: usize, chunk_size: usize, f: F) {
    let nthreads = rayon::current_num_threads();
    let work_counter = AtomicUsize::new(0);
    rayon::scope(|s| {
        for _ in 0..nthreads {
            s.spawn(|_| loop {
                let work = work_counter.fetch_add(chunk_size, Ordering::Relaxed);
                if work >= count {
                    return;
                }
                for i in work..(work + chunk_size).min(count) {
                    f(i);
                }
            });
        }
    });
}

static PB_ENABLE: AtomicBool = AtomicBool::new(true);
pub fn enable_progress_bar(enable: bool) {
    PB_ENABLE.store(enable, Ordering::Relaxed);
}

pub struct ProgressBarWrapper {
    inner: Option<ProgressBar>,
}
impl ProgressBarWrapper {
    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.inner {
            pb.inc(delta);
        }
    }
    pub fn finish(&self) {
        if let Some(pb) = &self.inner {
            pb.finish();
        }
    }
}

pub fn create_progress_bar(count: usize, what: &str) -> ProgressBarWrapper {
    if !PB_ENABLE.load(Ordering::Relaxed) {
        return ProgressBarWrapper { inner: None };
    }
    let template = format!(
        "[{{elapsed_precise}} - {{eta_precise}}] [{{bar:40.cyan/blue}}] {{pos:>5}}/{{len:5}} {what} {{msg}}"
    );
    let progress = ProgressBar::new(count as u64);
    progress.set_draw_target(ProgressDrawTarget::stdout_with_hz(2));
    progress.set_style(
        ProgressStyle::with_template(&template)
            .unwrap()
            .progress_chars("=>-"),
    );
    ProgressBarWrapper {
        inner: Some(progress),
    }
}

const ERF_INV_P_LO: [f32; 9] = [
    2.810_226_36e-08,
    3.432_739_39e-07,
    -3.523_387_7e-06,
    -4.391_506_54e-06,
    0.000_218_580_87,
    -0.001_253_725_03,
    -0.004_177_681_640,
    0.246_640_727,
    1.501_409_41,
];
const ERF_INV_P_HI: [f32; 9] = [
    -0.000_200_214_257,
    0.000_100_950_558,
    0.001_349_343_22,
    -0.003_673_428_44,
    0.005_739_507_73,
    -0.007_622_461_3,
    0.009_438_870_47,
    1.001_674_06,
    2.832_976_82,
];

fn poly(c: &[f32; 9], x: f32) -> f32 {
    c[1..].iter().fold(c[0], |p, k| p * x + k)
}

pub fn erf_inv(x: f32) -> f32 {
    let x = x.clamp(-0.99999, 0.99999);
    let w = -((1.0 - x) * (1.0 + x)).ln();
    let p = if w < 5.0 {
        poly(&ERF_INV_P_LO, w - 2.5)
    } else {
        poly(&ERF_INV_P_HI, w.sqrt() - 3.0)
    };
    p * x
}
