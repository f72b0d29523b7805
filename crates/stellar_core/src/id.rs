use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::StarId;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable per-star seed: FNV-1a over the star id, mixed with the world seed.
/// Independent of process, platform, and hasher randomisation.
pub fn star_seed(world_seed: u64, star_id: &StarId) -> u64 {
    let hash = star_id
        .0
        .bytes()
        .fold(FNV_OFFSET, |acc, byte| (acc ^ u64::from(byte)).wrapping_mul(FNV_PRIME));
    hash ^ world_seed.rotate_left(29)
}

/// RNG used for everything generated about one star.
pub fn star_rng(world_seed: u64, star_id: &StarId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(star_seed(world_seed, star_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sid(id: &str) -> StarId {
        StarId(id.to_string())
    }

    #[test]
    fn same_star_same_stream() {
        let mut rng1 = star_rng(42, &sid("sol"));
        let mut rng2 = star_rng(42, &sid("sol"));
        let a: u64 = rng1.gen();
        let b: u64 = rng2.gen();
        assert_eq!(a, b);
    }

    #[test]
    fn different_stars_produce_different_seeds() {
        assert_ne!(star_seed(42, &sid("sol")), star_seed(42, &sid("alpha_centauri")));
    }

    #[test]
    fn world_seed_changes_star_seed() {
        assert_ne!(star_seed(42, &sid("sol")), star_seed(99, &sid("sol")));
    }
}
