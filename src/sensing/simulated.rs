use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::SensorLayout;

use super::transport::LineTransport;

const DROPOUT_PROBABILITY: f64 = 0.05;
const GARBLE_PROBABILITY: f64 = 0.02;
const LINE_PERIOD: Duration = Duration::from_millis(250);

/// Stand-in board producing plausible values for dry runs without hardware.
///
/// Humidity boards alternate absolute humidity and temperature lines. Now and
/// then a line goes missing (after waiting out the read timeout) or arrives
/// garbled, so the rejection paths get exercised too. Lines come out no
/// faster than one per `LINE_PERIOD`, like a board printing at its own rate.
pub struct SimulatedBoard {
    label: String,
    layout: SensorLayout,
    rng: StdRng,
    read_timeout: Duration,
    line_period: Duration,
    temperature: f64,
    absolute_humidity: f64,
    next_is_humidity: bool,
}

impl SimulatedBoard {
    pub fn new(label: &str, layout: SensorLayout, read_timeout: Duration) -> Self {
        let mut rng = StdRng::from_entropy();
        let temperature = rng.gen_range(20.0..25.0);
        let absolute_humidity = rng.gen_range(8.0..14.0);
        Self {
            label: format!("simulated:{label}"),
            layout,
            rng,
            read_timeout,
            line_period: LINE_PERIOD,
            temperature,
            absolute_humidity,
            next_is_humidity: true,
        }
    }

    pub fn with_line_period(mut self, line_period: Duration) -> Self {
        self.line_period = line_period;
        self
    }

    fn next_value(&mut self) -> f64 {
        match self.layout {
            SensorLayout::Humidity if self.next_is_humidity => {
                self.next_is_humidity = false;
                self.absolute_humidity += self.rng.gen_range(-0.2..0.2);
                self.absolute_humidity = self.absolute_humidity.clamp(0.5, 30.0);
                self.absolute_humidity
            }
            _ => {
                self.next_is_humidity = true;
                self.temperature += self.rng.gen_range(-0.1..0.1);
                self.temperature
            }
        }
    }
}

impl LineTransport for SimulatedBoard {
    fn read_line(&mut self) -> Result<String> {
        if self.rng.gen_bool(DROPOUT_PROBABILITY) {
            thread::sleep(self.read_timeout);
            // The dropped line still advances the board's output sequence.
            self.next_value();
            return Ok(String::new());
        }

        thread::sleep(self.line_period);
        let value = self.next_value();
        if self.rng.gen_bool(GARBLE_PROBABILITY) {
            return Ok(format!("{value:.2}?#"));
        }
        Ok(format!("{value:.2}"))
    }

    fn describe(&self) -> &str {
        &self.label
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humidity_board_alternates_plausible_values() {
        let mut board = SimulatedBoard::new("inflow", SensorLayout::Humidity, Duration::ZERO)
            .with_line_period(Duration::ZERO);
        board.rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let line = board.read_line().unwrap();
            if let Ok(value) = line.parse::<f64>() {
                assert!((-10.0..60.0).contains(&value), "{value} out of range");
            }
        }
    }

    #[test]
    fn lines_come_no_faster_than_the_line_period() {
        let period = Duration::from_millis(20);
        let mut board = SimulatedBoard::new("temperature", SensorLayout::Temperature, period)
            .with_line_period(period);

        let started = std::time::Instant::now();
        for _ in 0..3 {
            board.read_line().unwrap();
        }
        assert!(started.elapsed() >= period * 3);
    }
}
