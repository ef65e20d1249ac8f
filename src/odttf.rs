/*! Deobfuscation of ODTTF font parts.

XPS obfuscates embedded fonts by XOR-ing the first 32 bytes of the TrueType
program with a key derived from the GUID in the part's file name. The XOR is
an involution, so applying it twice restores the original buffer.
*/

/// Offsets of the key bytes within the hyphen-separated UUID groups, in key
/// order.
const KEY_LAYOUT: [(usize, usize); 16] = [
    (0, 6),
    (0, 4),
    (0, 2),
    (0, 0),
    (1, 2),
    (1, 0),
    (2, 2),
    (2, 0),
    (3, 0),
    (3, 2),
    (4, 0),
    (4, 2),
    (4, 4),
    (4, 6),
    (4, 8),
    (4, 10),
];

/// Deobfuscate a font part in place. Parts whose file name carries no UUID
/// are left unchanged.
pub fn deobfuscate(path: &str, data: &mut [u8]) {
    let name = path.rsplit('/').next().unwrap_or(path);
    let Some(key) = key_from_name(name) else { return };
    for (i, byte) in data.iter_mut().take(32).enumerate() {
        *byte ^= key[i % 16];
    }
}

fn key_from_name(name: &str) -> Option<[u8; 16]> {
    let uuid = find_uuid(name)?;
    let groups: Vec<&str> = uuid.split('-').collect();

    let mut key = [0u8; 16];
    for (slot, &(group, offset)) in KEY_LAYOUT.iter().enumerate() {
        key[slot] = u8::from_str_radix(&groups[group][offset..offset + 2], 16).ok()?;
    }
    Some(key)
}

/// Find a `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` hex UUID within a file name.
fn find_uuid(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    'candidates: for start in 0..bytes.len().saturating_sub(35) {
        for (i, &b) in bytes[start..start + 36].iter().enumerate() {
            let expect_dash = matches!(i, 8 | 13 | 18 | 23);
            if expect_dash {
                if b != b'-' {
                    continue 'candidates;
                }
            } else if !b.is_ascii_hexdigit() {
                continue 'candidates;
            }
        }
        return Some(&name[start..start + 36]);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "ABCDEF01-2345-6789-ABCD-EF0123456789.odttf";

    #[test]
    fn key_reads_uuid_groups_back_to_front() {
        let key = key_from_name(NAME).unwrap();
        assert_eq!(
            key,
            [
                0x01, 0xEF, 0xCD, 0xAB, 0x45, 0x23, 0x89, 0x67, 0xAB, 0xCD, 0xEF,
                0x01, 0x23, 0x45, 0x67, 0x89,
            ]
        );
    }

    #[test]
    fn xor_is_an_involution() {
        let original: Vec<u8> = (0u8..64).collect();
        let mut data = original.clone();
        deobfuscate(NAME, &mut data);
        assert_ne!(data, original);
        deobfuscate(NAME, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn names_without_uuid_pass_through() {
        let original: Vec<u8> = (0u8..64).collect();
        let mut data = original.clone();
        deobfuscate("Fonts/arial.ttf", &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn uuid_is_found_inside_longer_names() {
        assert_eq!(
            find_uuid("prefix_ABCDEF01-2345-6789-ABCD-EF0123456789_suffix.odttf"),
            Some("ABCDEF01-2345-6789-ABCD-EF0123456789")
        );
        assert_eq!(find_uuid("no-uuid-here.odttf"), None);
    }
}
