//! Needle state and signal quality definitions

use colored::Color;
use serde::{Deserialize, Serialize};

/// The six discrete needle behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeedleState {
    /// No meaningful deflection or trend
    Stuck,
    /// Needle climbing
    Rising,
    /// Needle dropping
    Falling,
    /// Flat and coherent, the target condition
    Floating,
    /// Heavy, erratic swings
    Rockslam,
    /// Regular rhythmic oscillation
    ThetaBop,
}

impl NeedleState {
    /// Every state, in classification-report order
    pub const ALL: [NeedleState; 6] = [
        NeedleState::Stuck,
        NeedleState::Rising,
        NeedleState::Falling,
        NeedleState::Floating,
        NeedleState::Rockslam,
        NeedleState::ThetaBop,
    ];

    /// Terminal color for the state
    pub fn color(&self) -> Color {
        match self {
            NeedleState::Stuck => Color::BrightBlack,
            NeedleState::Rising => Color::Yellow,
            NeedleState::Falling => Color::Blue,
            NeedleState::Floating => Color::Green,
            NeedleState::Rockslam => Color::Red,
            NeedleState::ThetaBop => Color::Magenta,
        }
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            NeedleState::Stuck => "⏸",
            NeedleState::Rising => "↗",
            NeedleState::Falling => "↘",
            NeedleState::Floating => "〰",
            NeedleState::Rockslam => "⚡",
            NeedleState::ThetaBop => "♒",
        }
    }
}

impl std::fmt::Display for NeedleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NeedleState::Stuck => "STUCK",
            NeedleState::Rising => "RISING",
            NeedleState::Falling => "FALLING",
            NeedleState::Floating => "FLOATING",
            NeedleState::Rockslam => "ROCKSLAM",
            NeedleState::ThetaBop => "THETA_BOP",
        };
        write!(f, "{}", name)
    }
}

/// Signal quality, a banding of coherence into five ordered tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalQuality {
    Disrupted,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SignalQuality {
    /// Band a coherence value: EXCELLENT ≥ 0.9, GOOD ≥ 0.7, FAIR ≥ 0.5, POOR ≥ 0.3
    pub fn from_coherence(coherence: f64) -> Self {
        if coherence >= 0.9 {
            SignalQuality::Excellent
        } else if coherence >= 0.7 {
            SignalQuality::Good
        } else if coherence >= 0.5 {
            SignalQuality::Fair
        } else if coherence >= 0.3 {
            SignalQuality::Poor
        } else {
            SignalQuality::Disrupted
        }
    }
}

impl std::fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalQuality::Excellent => "EXCELLENT",
            SignalQuality::Good => "GOOD",
            SignalQuality::Fair => "FAIR",
            SignalQuality::Poor => "POOR",
            SignalQuality::Disrupted => "DISRUPTED",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_bands() {
        assert_eq!(SignalQuality::from_coherence(1.0), SignalQuality::Excellent);
        assert_eq!(SignalQuality::from_coherence(0.9), SignalQuality::Excellent);
        assert_eq!(SignalQuality::from_coherence(0.89), SignalQuality::Good);
        assert_eq!(SignalQuality::from_coherence(0.7), SignalQuality::Good);
        assert_eq!(SignalQuality::from_coherence(0.5), SignalQuality::Fair);
        assert_eq!(SignalQuality::from_coherence(0.3), SignalQuality::Poor);
        assert_eq!(SignalQuality::from_coherence(0.29), SignalQuality::Disrupted);
        assert_eq!(SignalQuality::from_coherence(0.0), SignalQuality::Disrupted);
    }

    #[test]
    fn test_state_serializes_screaming_snake() {
        let json = serde_json::to_string(&NeedleState::ThetaBop).unwrap();
        assert_eq!(json, "\"THETA_BOP\"");
        let json = serde_json::to_string(&SignalQuality::Excellent).unwrap();
        assert_eq!(json, "\"EXCELLENT\"");
    }

    #[test]
    fn test_unknown_state_rejected() {
        let parsed: Result<NeedleState, _> = serde_json::from_str("\"UNKNOWN\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_display_matches_wire_name() {
        for state in NeedleState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }
}
