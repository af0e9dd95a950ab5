use rand::Rng;

/// Unbiased in-place Fisher-Yates shuffle
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Sattolo's variant: uniform over permutations made of a single cycle
pub fn sattolo<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..i);
        items.swap(i, j);
    }
}

/// Position `i` maps to `perm[i]`; true if any position maps to itself
pub fn has_fixed_point(perm: &[usize]) -> bool {
    perm.iter().enumerate().any(|(i, &p)| i == p)
}

/// Number of disjoint cycles in a permutation of `0..perm.len()`
pub fn count_cycles(perm: &[usize]) -> usize {
    let mut seen = vec![false; perm.len()];
    let mut cycles = 0;
    for start in 0..perm.len() {
        if seen[start] {
            continue;
        }
        cycles += 1;
        let mut cur = start;
        while !seen[cur] {
            seen[cur] = true;
            cur = perm[cur];
        }
    }
    cycles
}
