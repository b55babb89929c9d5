use std::fmt::Display;

/// Wraps a fallible per-frame subsystem. The first error is logged and the
/// subsystem is disabled for the rest of the session so a broken microphone
/// or full disk cannot spam the log at frame rate.
pub struct Supervised {
    name: &'static str,
    enabled: bool,
}

impl Supervised {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Runs `f` unless the subsystem was already disabled. Returns the value
    /// on success, `None` once disabled.
    pub fn run<T, E: Display>(&mut self, f: impl FnOnce() -> Result<T, E>) -> Option<T> {
        if !self.enabled {
            return None;
        }
        match f() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{} disabled after error: {e}", self.name);
                self.enabled = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_values_through_while_healthy() {
        let mut unit = Supervised::new("test");
        assert_eq!(unit.run(|| Ok::<_, String>(7)), Some(7));
        assert_eq!(unit.run(|| Ok::<_, String>(8)), Some(8));
        assert!(unit.is_enabled());
    }

    #[test]
    fn first_error_disables_for_the_session() {
        let mut unit = Supervised::new("test");
        assert_eq!(unit.run(|| Err::<i32, _>("boom".to_string())), None);
        assert!(!unit.is_enabled());

        // Later healthy closures never run again.
        let mut ran = false;
        assert_eq!(
            unit.run(|| {
                ran = true;
                Ok::<_, String>(1)
            }),
            None
        );
        assert!(!ran);
    }
}
