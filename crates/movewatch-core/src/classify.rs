// Move classification: maps the evaluation swing across one ply to a label.

use crate::types::{Classification, Color, Score};

/// Lower bounds (inclusive) of each band, best band first. Anything below the
/// last bound is a blunder.
const BANDS: [(i64, Classification); 6] = [
    (150, Classification::Brilliant),
    (80, Classification::VeryGood),
    (20, Classification::Good),
    (-20, Classification::Neutral),
    (-80, Classification::Inaccurate),
    (-150, Classification::Mistake),
];

/// Evaluation swing from the mover's point of view, in centipawns.
///
/// The evaluator reports white-relative scores, so a black move is good when
/// it lowers the score.
pub fn mover_delta(before: Score, after: Score, mover: Color) -> i64 {
    let before = i64::from(before.centipawns());
    let after = i64::from(after.centipawns());
    match mover {
        Color::White => after - before,
        Color::Black => before - after,
    }
}

/// Classify a move given the scores bracketing it and the side that moved.
pub fn classify(before: Score, after: Score, mover: Color) -> Classification {
    classify_delta(mover_delta(before, after, mover))
}

/// Map a mover-relative delta onto the label bands.
pub fn classify_delta(delta: i64) -> Classification {
    BANDS
        .iter()
        .find(|(lower, _)| delta >= *lower)
        .map(|(_, label)| *label)
        .unwrap_or(Classification::Blunder)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use Classification::*;

    fn white(before: i32, after: i32) -> Classification {
        classify(Score(before), Score(after), Color::White)
    }

    #[test]
    fn banding_edges_for_white() {
        assert_eq!(white(0, 150), Brilliant);
        assert_eq!(white(0, 149), VeryGood);
        assert_eq!(white(0, 80), VeryGood);
        assert_eq!(white(0, 79), Good);
        assert_eq!(white(0, 20), Good);
        assert_eq!(white(0, 19), Neutral);
        assert_eq!(white(0, 0), Neutral);
        assert_eq!(white(0, -20), Neutral);
        assert_eq!(white(0, -21), Inaccurate);
        assert_eq!(white(0, -80), Inaccurate);
        assert_eq!(white(0, -81), Mistake);
        assert_eq!(white(0, -150), Mistake);
        assert_eq!(white(0, -151), Blunder);
    }

    #[test]
    fn black_delta_is_sign_flipped() {
        assert_eq!(mover_delta(Score(20), Score(400), Color::Black), -380);
        assert_eq!(classify(Score(20), Score(400), Color::Black), Blunder);
        assert_eq!(classify(Score(100), Score(-60), Color::Black), Brilliant);
        assert_eq!(classify(Score(30), Score(35), Color::Black), Neutral);
    }

    #[test]
    fn neutral_opening_move() {
        assert_eq!(white(30, 35), Neutral);
    }

    #[test]
    fn antisymmetric_under_role_swap() {
        let scores = [-100_000, -500, -151, -150, -80, -20, 0, 19, 20, 80, 150, 730, 100_000];
        for &s1 in &scores {
            for &s2 in &scores {
                for color in [Color::White, Color::Black] {
                    assert_eq!(
                        classify(Score(s1), Score(s2), color),
                        classify(Score(s2), Score(s1), color.opposite()),
                        "s1={s1} s2={s2} color={color}"
                    );
                }
            }
        }
    }

    #[test]
    fn monotone_in_score_after_for_white() {
        for s1 in [-300, 0, 45, 1200] {
            let mut previous = white(s1, s1 - 400);
            for s2 in (s1 - 400)..=(s1 + 400) {
                let current = white(s1, s2);
                // Lower ordinal is a better label.
                assert!(current <= previous, "s1={s1} s2={s2}: {current} worse than {previous}");
                previous = current;
            }
        }
    }

    #[test]
    fn extreme_scores_saturate_without_overflow() {
        assert_eq!(white(-Score::MATE, Score::MATE), Brilliant);
        assert_eq!(white(i32::MIN, i32::MAX), Brilliant);
        assert_eq!(classify(Score(i32::MIN), Score(i32::MAX), Color::Black), Blunder);
    }
}
