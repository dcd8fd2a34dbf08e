//! Decision extraction: collapse a generation to one (location, heading).

use super::types::{Decision, Generation};

/// Pick the location with the highest confidence, then the highest heading
/// bin within it. Ties resolve to the lowest index.
pub fn decide(generation: &Generation) -> Decision {
    let location = first_max_index(generation.iter().map(|b| b.confidence()));
    let heading = generation
        .belief(location)
        .map(|b| first_max_index(b.headings().iter().copied()))
        .unwrap_or(0);
    Decision { location, heading }
}

/// Index of the first maximum. Later equal values never replace an earlier one.
fn first_max_index(values: impl Iterator<Item = f64>) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, value) in values.enumerate() {
        if value > best {
            best = value;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::types::Belief;

    fn generation(entries: &[(f64, &[f64])]) -> Generation {
        Generation::new(
            entries
                .iter()
                .map(|(c, h)| Belief::from_slice(*c, h).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_decide_picks_max_confidence_then_heading() {
        let g = generation(&[
            (3.0, &[0.9, 0.1, 0.0]),
            (8.0, &[0.1, 0.2, 0.7]),
            (5.0, &[0.0, 1.0, 0.0]),
        ]);
        assert_eq!(
            decide(&g),
            Decision {
                location: 1,
                heading: 2
            }
        );
    }

    #[test]
    fn test_location_tie_breaks_to_lower_index() {
        let g = generation(&[
            (2.0, &[1.0, 0.0]),
            (9.0, &[0.0, 1.0]),
            (9.0, &[1.0, 0.0]),
        ]);
        assert_eq!(decide(&g).location, 1);
        assert_eq!(decide(&g).heading, 1);
    }

    #[test]
    fn test_heading_tie_breaks_to_lower_index() {
        let g = generation(&[(1.0, &[0.1, 0.4, 0.1, 0.4])]);
        assert_eq!(decide(&g).heading, 1);
    }

    #[test]
    fn test_all_zero_generation_decides_origin() {
        let g = generation(&[(0.0, &[0.0, 0.0]), (0.0, &[0.0, 0.0])]);
        assert_eq!(
            decide(&g),
            Decision {
                location: 0,
                heading: 0
            }
        );
    }
}
