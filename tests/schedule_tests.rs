use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_slideshow::schedule::{TimingConfig, next_delay, period_for_rate};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn sin_peaks_at_quarter_period() {
    let cfg = TimingConfig::Sin {
        min: ms(100),
        max: ms(500),
        period: Duration::from_secs(10),
    };
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(next_delay(&cfg, ms(2500), &mut rng), ms(500));
    assert_eq!(next_delay(&cfg, ms(7500), &mut rng), ms(100));
    assert_eq!(next_delay(&cfg, Duration::ZERO, &mut rng), ms(300));
}

#[test]
fn random_stays_in_half_open_range_and_is_roughly_uniform() {
    let cfg = TimingConfig::random_millis(200, 1200);
    let mut rng = StdRng::seed_from_u64(42);
    let mut buckets = [0u32; 10];
    let samples = 20_000;
    for _ in 0..samples {
        let d = next_delay(&cfg, Duration::ZERO, &mut rng);
        assert!(d >= ms(200) && d < ms(1200), "{d:?} out of range");
        let bucket = ((d.as_millis() as u64 - 200) / 100) as usize;
        buckets[bucket] += 1;
    }
    let expected = samples / 10;
    for (idx, count) in buckets.iter().enumerate() {
        let deviation = (*count as i64 - expected as i64).abs();
        assert!(
            deviation < (expected as i64) / 10,
            "bucket {idx} has {count}, expected about {expected}"
        );
    }
}

#[test]
fn random_resamples_each_call() {
    let cfg = TimingConfig::random_millis(0, 10_000);
    let mut rng = StdRng::seed_from_u64(7);
    let first = next_delay(&cfg, Duration::ZERO, &mut rng);
    let differs = (0..10).any(|_| next_delay(&cfg, Duration::ZERO, &mut rng) != first);
    assert!(differs);
}

#[test]
fn sin_stays_in_bounds_and_moves_continuously() {
    let cfg = TimingConfig::sin_with_rate(ms(3000), ms(5000), 80);
    let mut rng = StdRng::seed_from_u64(1);
    let period = period_for_rate(80);
    // Largest slope is (max - min) * pi / period per unit of elapsed time.
    let max_step_ms = 2000.0 * std::f64::consts::PI * 0.05 / period.as_secs_f64() + 1.0;
    let mut previous = next_delay(&cfg, Duration::ZERO, &mut rng);
    for step in 1..4000 {
        let elapsed = ms(step * 50);
        let d = next_delay(&cfg, elapsed, &mut rng);
        assert!(d >= ms(3000) && d <= ms(5000), "{d:?} out of range");
        let jump = (d.as_millis() as f64 - previous.as_millis() as f64).abs();
        assert!(jump <= max_step_ms, "jump of {jump}ms at {elapsed:?}");
        previous = d;
    }
}

#[test]
fn higher_rate_means_shorter_period() {
    let mut last = period_for_rate(1);
    for rate in 2..=100 {
        let period = period_for_rate(rate);
        assert!(period < last);
        last = period;
    }
}
