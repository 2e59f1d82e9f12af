const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `s`.
#[inline]
pub fn fnv1a32(s: &str) -> u32 {
    fnv1a32_bytes(FNV_OFFSET, s.as_bytes())
}

/// Continue an FNV-1a hash from `seed`; lets callers fold several strings into one value.
#[inline]
pub fn fnv1a32_bytes(seed: u32, bytes: &[u8]) -> u32 {
    let mut h = seed;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

pub fn hash_lines(lines: &[&str]) -> Vec<u32> {
    lines.iter().map(|l| fnv1a32(l)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(fnv1a32(""), 0x811c9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9cf968);
    }
}
