use std::collections::HashSet;

/// Remembers which (subject, reason) diagnostics were already emitted.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<(String, &'static str)>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a warning the first time this pair is seen. Returns whether it logged.
    pub fn warn(&mut self, subject: &str, reason: &'static str) -> bool {
        if !self.seen.insert((subject.to_string(), reason)) {
            return false;
        }
        log::warn!("{} for {}", reason, subject);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warns_once_per_pair() {
        let mut warn = WarnOnce::new();
        assert!(warn.warn("Guard", "Missing animator"));
        assert!(!warn.warn("Guard", "Missing animator"));
        assert!(warn.warn("Guard", "Missing anchors"));
        assert!(warn.warn("Scout", "Missing animator"));
    }
}
