//! Needleman-Wunsch placement of observed residues onto a full sequence.

const MATCH: i32 = 1;
const MISMATCH: i32 = -1;
const GAP: i32 = -5;

/// Maps every element of `observed` to a position in `full`.
///
/// Gaps are only ever opened in `observed`, so the result has one strictly
/// increasing index per observed element. When `observed` is longer than
/// `full` it is treated as its own full sequence and the identity mapping is
/// returned.
pub fn align<T: PartialEq>(full: &[T], observed: &[T]) -> Vec<usize> {
    let (n, m) = (full.len(), observed.len());
    if m > n {
        return (0..m).collect();
    }
    if m == 0 {
        return Vec::new();
    }

    // Row i only reaches columns i..=i + slack; cell (i, k) scores the
    // prefix pair observed[..i], full[..i + k].
    let slack = n - m;
    let width = slack + 1;
    let mut scores = vec![0i32; (m + 1) * width];
    for (k, score) in scores[..width].iter_mut().enumerate() {
        *score = GAP * k as i32;
    }
    for i in 1..=m {
        for k in 0..width {
            let pair = if observed[i - 1] == full[i + k - 1] {
                MATCH
            } else {
                MISMATCH
            };
            let diagonal = scores[(i - 1) * width + k] + pair;
            scores[i * width + k] = if k > 0 {
                diagonal.max(scores[i * width + k - 1] + GAP)
            } else {
                diagonal
            };
        }
    }

    let mut indices = vec![0; m];
    let (mut i, mut k) = (m, slack);
    while i > 0 {
        let here = scores[i * width + k];
        if k > 0 && scores[i * width + k - 1] + GAP == here {
            k -= 1;
        } else {
            indices[i - 1] = i + k - 1;
            i -= 1;
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn finds_the_observed_stretch() {
        assert_eq!(align(&chars("MKVGAL"), &chars("VGA")), vec![2, 3, 4]);
        assert_eq!(align(&chars("ABCDEF"), &chars("ABEF")), vec![0, 1, 4, 5]);
    }

    #[test]
    fn mismatches_still_map_every_residue() {
        assert_eq!(align(&chars("ABC"), &chars("AXC")), vec![0, 1, 2]);
        assert_eq!(align(&chars("AAAA"), &chars("A")), vec![0]);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(align(&chars("ABC"), &[]), Vec::<usize>::new());
        assert_eq!(align(&chars("AB"), &chars("ABC")), vec![0, 1, 2]);
    }

    #[test]
    fn long_chains_with_a_missing_loop() {
        let full: Vec<u16> = (0..3000).collect();
        let observed: Vec<u16> = full[..1400].iter().chain(&full[1460..]).copied().collect();
        let indices = align(&full, &observed);
        assert_eq!(indices.len(), 2940);
        assert_eq!(indices[1399], 1399);
        assert_eq!(indices[1400], 1460);
        assert_eq!(indices[2939], 2999);
    }

    proptest! {
        #[test]
        fn indices_are_increasing_and_in_range(
            full in proptest::collection::vec(0u8..4, 0..30),
            observed in proptest::collection::vec(0u8..4, 0..30),
        ) {
            let indices = align(&full, &observed);
            prop_assert_eq!(indices.len(), observed.len());
            prop_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
            if observed.len() <= full.len() {
                prop_assert!(indices.iter().all(|&index| index < full.len()));
            }
        }

        #[test]
        fn subsequences_align_exactly(
            full in proptest::collection::vec(0u8..20, 1..25),
            mask in proptest::collection::vec(any::<bool>(), 25),
        ) {
            let picked: Vec<usize> = (0..full.len()).filter(|&i| mask[i]).collect();
            let observed: Vec<u8> = picked.iter().map(|&i| full[i]).collect();
            let indices = align(&full, &observed);
            let mapped: Vec<u8> = indices.iter().map(|&i| full[i]).collect();
            prop_assert_eq!(mapped, observed);
        }
    }
}
