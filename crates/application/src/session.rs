/// Gates auto-play for the lifetime of one tour.
///
/// Starting is one-way; ending the tour means dropping the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TourSession {
    started: bool,
}

impl TourSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Returns true only on the call that actually started the tour.
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_is_one_way() {
        let mut session = TourSession::new();
        assert!(!session.is_started());

        assert!(session.start());
        assert!(session.is_started());

        assert!(!session.start());
        assert!(session.is_started());
    }
}
