use std::time::{Duration, Instant};

/// Monotonic clock the trial runner reads and sleeps on.
///
/// Timestamps are nanoseconds since the timer was created. Input events are
/// stamped with the same clock so reaction times can be computed as a plain
/// difference.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn frame_stats(&self) -> FrameTimeStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTimeStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl FrameTimeStats {
    pub fn from_durations(frame_times: &[Duration]) -> Self {
        if frame_times.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = frame_times.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

/// Rolling window of recorded frame durations.
#[derive(Debug, Clone)]
pub(crate) struct FrameWindow {
    times: Vec<Duration>,
    max_samples: usize,
}

impl FrameWindow {
    pub(crate) fn new(max_samples: usize) -> Self {
        Self {
            times: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    pub(crate) fn push(&mut self, d: Duration) {
        if self.times.len() >= self.max_samples {
            self.times.remove(0);
        }
        self.times.push(d);
    }

    pub(crate) fn stats(&self) -> FrameTimeStats {
        FrameTimeStats::from_durations(&self.times)
    }
}

/// Wall clock backed by `Instant`, with platform sleeps tighter than
/// `std::thread::sleep` where the OS offers them.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    frames: FrameWindow,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        self.frames.push(d);
    }
    fn frame_stats(&self) -> FrameTimeStats {
        self.frames.stats()
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frames: FrameWindow::new(1000),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "windows")]
        self.windows_sleep(duration);
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "windows")]
    fn windows_sleep(&self, duration: Duration) {
        use windows::core::PCWSTR;
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, SetWaitableTimer, WaitForSingleObject, INFINITE,
        };

        // Relative due time in 100ns intervals.
        let due_time = -((duration.as_nanos() / 100) as i64);

        unsafe {
            let Ok(timer) = CreateWaitableTimerW(None, true, PCWSTR::null()) else {
                std::thread::sleep(duration);
                return;
            };
            if SetWaitableTimer(timer, &due_time, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, INFINITE);
            } else {
                std::thread::sleep(duration);
            }
            let _ = CloseHandle(timer);
        }
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        // Spin for sub-100us waits, the scheduler cannot do better.
        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_reports_zeroes() {
        let timer = HighPrecisionTimer::new();
        assert_eq!(timer.frame_stats(), FrameTimeStats::default());
    }

    #[test]
    fn stats_over_constant_frames() {
        let mut timer = HighPrecisionTimer::new();
        for _ in 0..10 {
            timer.record_frame(Duration::from_millis(10));
        }
        let stats = timer.frame_stats();
        assert_eq!(stats.samples, 10);
        assert!((stats.average_frame_time_ns - 10_000_000.0).abs() < 1e-6);
        assert!(stats.jitter_ns.abs() < 1e-6);
        assert!((stats.effective_fps - 100.0).abs() < 1e-6);
    }

    #[test]
    fn window_drops_oldest_sample() {
        let mut window = FrameWindow::new(2);
        window.push(Duration::from_millis(100));
        window.push(Duration::from_millis(2));
        window.push(Duration::from_millis(4));
        let stats = window.stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.max_frame_time_ns, 4_000_000.0);
        assert_eq!(stats.min_frame_time_ns, 2_000_000.0);
    }

    #[test]
    fn clock_is_monotonic_across_sleep() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.now() >= before + 1_000_000);
        assert!(timer.elapsed(before) >= Duration::from_millis(1));
    }
}
