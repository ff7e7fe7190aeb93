// src/client/form.rs
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long a failure message stays up before the form resets.
pub const FAILURE_DISPLAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Submitting,
    Success,
    Failed { message: String, since: Instant },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("form is busy or already completed")]
    NotIdle,
    #[error("no submission in flight")]
    NotSubmitting,
}

/// Login and register screens: one submission at a time, no retries.
#[derive(Debug)]
pub struct SubmitForm {
    state: FormState,
}

impl Default for SubmitForm {
    fn default() -> Self {
        Self {
            state: FormState::Idle,
        }
    }
}

impl SubmitForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn submit(&mut self) -> Result<(), FormError> {
        if self.state != FormState::Idle {
            return Err(FormError::NotIdle);
        }
        self.state = FormState::Submitting;
        Ok(())
    }

    pub fn resolve(&mut self, outcome: Result<(), String>, now: Instant) -> Result<(), FormError> {
        if self.state != FormState::Submitting {
            return Err(FormError::NotSubmitting);
        }
        self.state = match outcome {
            Ok(()) => FormState::Success,
            Err(message) => FormState::Failed { message, since: now },
        };
        Ok(())
    }

    /// Clears an expired failure message.
    pub fn tick(&mut self, now: Instant) {
        if let FormState::Failed { since, .. } = &self.state {
            if now.saturating_duration_since(*since) >= FAILURE_DISPLAY {
                self.state = FormState::Idle;
            }
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.state {
            FormState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_shows_for_three_seconds() {
        let start = Instant::now();
        let mut form = SubmitForm::new();
        form.submit().unwrap();
        assert_eq!(form.submit(), Err(FormError::NotIdle));

        form.resolve(Err("Login failed".into()), start).unwrap();
        assert_eq!(form.failure_message(), Some("Login failed"));
        assert_eq!(form.submit(), Err(FormError::NotIdle));

        form.tick(start + Duration::from_millis(2999));
        assert!(matches!(form.state(), FormState::Failed { .. }));

        form.tick(start + FAILURE_DISPLAY);
        assert_eq!(form.state(), &FormState::Idle);
        form.submit().unwrap();
    }

    #[test]
    fn test_success_is_terminal() {
        let mut form = SubmitForm::new();
        assert_eq!(
            form.resolve(Ok(()), Instant::now()),
            Err(FormError::NotSubmitting)
        );
        form.submit().unwrap();
        form.resolve(Ok(()), Instant::now()).unwrap();
        assert_eq!(form.state(), &FormState::Success);
        form.tick(Instant::now() + Duration::from_secs(10));
        assert_eq!(form.state(), &FormState::Success);
        assert_eq!(form.submit(), Err(FormError::NotIdle));
    }
}
