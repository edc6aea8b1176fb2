use crate::analyzers::types::{Grade, ImpactLevel};

/// Converts a composite performance score (0–100) into a service grade.
///
/// | Range    | Grade      |
/// |----------|------------|
/// | >= 90    | Excellent  |
/// | >= 75    | Good       |
/// | >= 60    | Acceptable |
/// | < 60     | Poor       |
///
/// Boundaries are inclusive upward: a score exactly at a threshold takes
/// the higher grade.
pub fn grade(score: f64) -> Grade {
    match score {
        s if s >= 90.0 => Grade::Excellent,
        s if s >= 75.0 => Grade::Good,
        s if s >= 60.0 => Grade::Acceptable,
        _ => Grade::Poor,
    }
}

/// Converts a passenger impact score (roughly 0–5) into a disruption band.
pub fn impact_level(score: f64) -> ImpactLevel {
    match score {
        s if s < 1.0 => ImpactLevel::Low,
        s if s < 2.0 => ImpactLevel::Moderate,
        s if s < 3.0 => ImpactLevel::High,
        _ => ImpactLevel::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade(100.0), Grade::Excellent);
        assert_eq!(grade(90.0), Grade::Excellent);
        assert_eq!(grade(89.9), Grade::Good);
        assert_eq!(grade(75.0), Grade::Good);
        assert_eq!(grade(74.9), Grade::Acceptable);
        assert_eq!(grade(60.0), Grade::Acceptable);
        assert_eq!(grade(59.9), Grade::Poor);
        assert_eq!(grade(0.0), Grade::Poor);
    }

    #[test]
    fn test_impact_level_boundaries() {
        assert_eq!(impact_level(0.0), ImpactLevel::Low);
        assert_eq!(impact_level(0.9), ImpactLevel::Low);
        assert_eq!(impact_level(1.0), ImpactLevel::Moderate);
        assert_eq!(impact_level(1.9), ImpactLevel::Moderate);
        assert_eq!(impact_level(2.0), ImpactLevel::High);
        assert_eq!(impact_level(2.9), ImpactLevel::High);
        assert_eq!(impact_level(3.0), ImpactLevel::Critical);
        assert_eq!(impact_level(4.5), ImpactLevel::Critical);
    }
}
