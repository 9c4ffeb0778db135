// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Additive checksum utilities for record and header integrity.
//!
//! Every record carries a single trailing byte: the sum of its payload bytes
//! modulo 256. The header carries the same sum over its preceding bytes. The
//! checksum is part of the on-disk format and must stay byte-stable across
//! platforms, hence plain wrapping arithmetic rather than a CRC.

/// Calculates the additive checksum of a byte slice.
#[inline]
pub(crate) fn sum_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Verifies a stored checksum against the recomputed one.
#[inline]
pub(crate) fn verify_checksum(data: &[u8], expected: u8) -> bool {
    sum_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_checksum() {
        assert_eq!(sum_checksum(&[]), 0);
        assert_eq!(sum_checksum(&[1, 2, 3]), 6);
        // Wraps modulo 256.
        assert_eq!(sum_checksum(&[200, 100]), 44);
        assert_eq!(sum_checksum(&[0xFF, 0x01]), 0);
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"queue payload";
        let sum = sum_checksum(data);

        assert!(verify_checksum(data, sum));
        assert!(!verify_checksum(data, sum.wrapping_add(1)));
        assert!(!verify_checksum(b"other payload", sum));
    }
}
