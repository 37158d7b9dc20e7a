//! Day/night and weather signals pushed into the simulation each tick.

use farm_core::{Environment, SimTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use tracing::info;

/// Salt so weather rolls do not mirror the world's own random stream
const WEATHER_SALT: u64 = 0xC10D_5EED;

/// Cosine daylight curve. Time zero is dawn.
#[derive(Debug, Clone, Copy)]
pub struct DayCycle {
    day_length_ms: SimTime,
}

impl DayCycle {
    pub fn new(day_length_ms: SimTime) -> Self {
        Self {
            day_length_ms: day_length_ms.max(1),
        }
    }

    /// Fraction of the day since midnight, in 0..1
    pub fn phase(&self, now: SimTime) -> f32 {
        let shifted = now + self.day_length_ms / 4;
        (shifted % self.day_length_ms) as f32 / self.day_length_ms as f32
    }

    /// 0 at midnight, 1 at noon
    pub fn light_intensity(&self, now: SimTime) -> f32 {
        (0.5 - 0.5 * (TAU * self.phase(now)).cos()).clamp(0.0, 1.0)
    }

    pub fn day(&self, now: SimTime) -> u64 {
        (now + self.day_length_ms / 4) / self.day_length_ms
    }
}

/// Rain that is re-rolled every period with a fixed chance
pub struct Weather {
    period_ms: SimTime,
    rain_chance: f64,
    rng: ChaCha8Rng,
    raining: bool,
    next_roll_at: SimTime,
}

impl Weather {
    pub fn new(period_ms: SimTime, rain_chance: f64, seed: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            rain_chance,
            rng: ChaCha8Rng::seed_from_u64(seed ^ WEATHER_SALT),
            raining: false,
            next_roll_at: 0,
        }
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    pub fn update(&mut self, now: SimTime) -> bool {
        while now >= self.next_roll_at {
            let raining = self.rng.gen_bool(self.rain_chance);
            if raining != self.raining {
                info!(event = "weather_changed", raining, now, "Weather changed");
            }
            self.raining = raining;
            self.next_roll_at += self.period_ms;
        }
        self.raining
    }
}

/// Both signals together
pub struct Sky {
    pub day: DayCycle,
    pub weather: Weather,
}

impl Sky {
    pub fn new(day_length_ms: SimTime, weather_period_ms: SimTime, rain_chance: f64, seed: u64) -> Self {
        Self {
            day: DayCycle::new(day_length_ms),
            weather: Weather::new(weather_period_ms, rain_chance, seed),
        }
    }

    pub fn environment(&mut self, now: SimTime) -> Environment {
        Environment {
            raining: self.weather.update(now),
            light_intensity: self.day.light_intensity(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_cycle() {
        let day = DayCycle::new(1_000);
        assert!((day.light_intensity(0) - 0.5).abs() < 1e-4);
        assert!((day.light_intensity(250) - 1.0).abs() < 1e-4);
        assert!(day.light_intensity(750) < 1e-4);
        assert_eq!(day.day(0), 0);
        assert_eq!(day.day(800), 1);
    }

    #[test]
    fn test_weather_extremes() {
        let mut dry = Weather::new(100, 0.0, 1);
        let mut wet = Weather::new(100, 1.0, 1);
        for now in (0..1_000).step_by(50) {
            assert!(!dry.update(now));
            assert!(wet.update(now));
        }
    }

    #[test]
    fn test_weather_is_seeded() {
        let mut a = Weather::new(10, 0.5, 9);
        let mut b = Weather::new(10, 0.5, 9);
        for now in (0..2_000).step_by(10) {
            assert_eq!(a.update(now), b.update(now));
        }
    }
}
