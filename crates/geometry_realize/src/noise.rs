//! Stable integer hashes (Jenkins lookup3 final mix).
//!
//! Used to derive element ids. Results must never change between releases,
//! realized ids depend on them.

#[inline]
fn rot(x: u32, k: u32) -> u32 {
  x.rotate_left(k)
}

#[inline]
fn hash_bit_final(mut a: u32, mut b: u32, mut c: u32) -> u32 {
  c ^= b;
  c = c.wrapping_sub(rot(b, 14));
  a ^= c;
  a = a.wrapping_sub(rot(c, 11));
  b ^= a;
  b = b.wrapping_sub(rot(a, 25));
  c ^= b;
  c = c.wrapping_sub(rot(b, 16));
  a ^= c;
  a = a.wrapping_sub(rot(c, 4));
  b ^= a;
  b = b.wrapping_sub(rot(a, 14));
  c ^= b;
  c = c.wrapping_sub(rot(b, 24));
  c
}

#[inline]
const fn seed(n: u32) -> u32 {
  0xdeadbeef_u32.wrapping_add(n << 2).wrapping_add(13)
}

pub fn hash(kx: u32) -> u32 {
  let (mut a, b, c) = (seed(1), seed(1), seed(1));
  a = a.wrapping_add(kx);
  hash_bit_final(a, b, c)
}

/// Two-argument hash, used to combine a parent id with a local id.
pub fn hash2(kx: u32, ky: u32) -> u32 {
  let (mut a, mut b, c) = (seed(2), seed(2), seed(2));
  b = b.wrapping_add(ky);
  a = a.wrapping_add(kx);
  hash_bit_final(a, b, c)
}

pub fn hash3(kx: u32, ky: u32, kz: u32) -> u32 {
  let (mut a, mut b, mut c) = (seed(3), seed(3), seed(3));
  c = c.wrapping_add(kz);
  b = b.wrapping_add(ky);
  a = a.wrapping_add(kx);
  hash_bit_final(a, b, c)
}

/// [`hash2`] over signed ids, reinterpreting the bits.
#[inline]
pub fn hash2_i32(kx: i32, ky: i32) -> i32 {
  hash2(kx as u32, ky as u32) as i32
}
