use std::time::Duration;
use web_time::Instant;

use crate::car::CarEvent;
use crate::config::FINISH_DISPLAY_SECONDS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceState {
    Idle,
    Running { start: Instant },
    Finished { final_ms: u64, since: Instant },
}

/// Notifications for collaborators outside the core: the shell reacts to
/// `Started` (engine audio cue), the score sink to `Finished`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceNotice {
    Started,
    Finished { millis: u64 },
}

/// Race lifecycle: Idle -> Running on first movement, Running -> Finished on
/// the finish event, back to Idle after the display window. Falls and
/// obstacle hits never touch the state; the timer keeps running through them.
pub struct RaceStateMachine {
    state: RaceState,
}

impl RaceStateMachine {
    pub fn new() -> Self {
        Self {
            state: RaceState::Idle,
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn on_event(&mut self, event: CarEvent, now: Instant) -> Option<RaceNotice> {
        match (self.state, event) {
            (RaceState::Idle, CarEvent::Movement) => {
                self.state = RaceState::Running { start: now };
                log::info!("Race started");
                Some(RaceNotice::Started)
            }
            (RaceState::Running { start }, CarEvent::Finish) => {
                let millis = now.duration_since(start).as_millis() as u64;
                self.state = RaceState::Finished {
                    final_ms: millis,
                    since: now,
                };
                log::info!("Race finished in {:.2}s", millis as f64 / 1000.0);
                Some(RaceNotice::Finished { millis })
            }
            _ => None,
        }
    }

    /// Leave the finish banner up for the display window, then clear.
    pub fn tick(&mut self, now: Instant) {
        if let RaceState::Finished { since, .. } = self.state {
            if now.duration_since(since) >= Duration::from_secs(FINISH_DISPLAY_SECONDS) {
                self.state = RaceState::Idle;
                log::info!("Race state reset, ready for another run");
            }
        }
    }

    pub fn elapsed_ms(&self, now: Instant) -> Option<u64> {
        match self.state {
            RaceState::Running { start } => Some(now.duration_since(start).as_millis() as u64),
            _ => None,
        }
    }

    pub fn hud_line(&self, now: Instant) -> String {
        match self.state {
            RaceState::Idle => "Press arrow keys to start!".to_string(),
            RaceState::Running { start } => {
                let elapsed = now.duration_since(start).as_millis();
                format!("Time: {:.2}s", elapsed as f64 / 1000.0)
            }
            RaceState::Finished { final_ms, .. } => {
                format!("Finished! {:.2}s", final_ms as f64 / 1000.0)
            }
        }
    }
}

impl Default for RaceStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    #[test]
    fn full_race_sequence() {
        let t0 = Instant::now();
        let mut race = RaceStateMachine::new();
        assert_eq!(race.state(), RaceState::Idle);

        assert_eq!(
            race.on_event(CarEvent::Movement, t0),
            Some(RaceNotice::Started)
        );
        assert!(matches!(race.state(), RaceState::Running { .. }));

        assert_eq!(race.elapsed_ms(at(t0, 5000)), Some(5000));

        let notice = race.on_event(CarEvent::Finish, at(t0, 5000));
        assert_eq!(notice, Some(RaceNotice::Finished { millis: 5000 }));
        assert!(matches!(
            race.state(),
            RaceState::Finished { final_ms: 5000, .. }
        ));

        // Banner stays up inside the display window.
        race.tick(at(t0, 5000 + 9999));
        assert!(matches!(race.state(), RaceState::Finished { .. }));

        race.tick(at(t0, 5000 + 10_000));
        assert_eq!(race.state(), RaceState::Idle);
        assert_eq!(race.elapsed_ms(at(t0, 16_000)), None);
    }

    #[test]
    fn falls_and_hits_keep_the_timer_running() {
        let t0 = Instant::now();
        let mut race = RaceStateMachine::new();
        race.on_event(CarEvent::Movement, t0);

        assert_eq!(race.on_event(CarEvent::Fall, at(t0, 1000)), None);
        assert_eq!(race.on_event(CarEvent::ObstacleHit, at(t0, 2000)), None);
        assert!(matches!(race.state(), RaceState::Running { .. }));
        assert_eq!(race.elapsed_ms(at(t0, 3000)), Some(3000));
    }

    #[test]
    fn finish_before_start_is_ignored() {
        let t0 = Instant::now();
        let mut race = RaceStateMachine::new();
        assert_eq!(race.on_event(CarEvent::Finish, t0), None);
        assert_eq!(race.state(), RaceState::Idle);
    }

    #[test]
    fn finish_notifies_exactly_once() {
        let t0 = Instant::now();
        let mut race = RaceStateMachine::new();
        race.on_event(CarEvent::Movement, t0);
        assert!(race.on_event(CarEvent::Finish, at(t0, 2000)).is_some());
        assert_eq!(race.on_event(CarEvent::Finish, at(t0, 2100)), None);
    }

    #[test]
    fn movement_during_finish_banner_does_not_restart() {
        let t0 = Instant::now();
        let mut race = RaceStateMachine::new();
        race.on_event(CarEvent::Movement, t0);
        race.on_event(CarEvent::Finish, at(t0, 1000));
        assert_eq!(race.on_event(CarEvent::Movement, at(t0, 2000)), None);
        assert!(matches!(race.state(), RaceState::Finished { .. }));
    }

    #[test]
    fn hud_lines_follow_the_state() {
        let t0 = Instant::now();
        let mut race = RaceStateMachine::new();
        assert!(race.hud_line(t0).contains("start"));
        race.on_event(CarEvent::Movement, t0);
        assert_eq!(race.hud_line(at(t0, 1230)), "Time: 1.23s");
        race.on_event(CarEvent::Finish, at(t0, 4560));
        assert_eq!(race.hud_line(at(t0, 5000)), "Finished! 4.56s");
    }
}
