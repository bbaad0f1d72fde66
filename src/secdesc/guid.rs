//! On-wire GUID: mixed-endian 16-byte layout used by directory attributes
//! (`objectGUID`, `schemaIDGUID`) and object ACEs.

use std::{fmt::Display, io::Cursor, str::FromStr};

use binrw::prelude::*;

#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Default)]
#[brw(little)]
pub struct Guid(u32, u16, u16, [u8; 8]);

impl Guid {
    /// Renders in the braced form the dump uses for `objectGUID`:
    /// `{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}`.
    pub fn braced(&self) -> String {
        format!("{{{self}}}")
    }

    pub fn parse_bytes(data: &[u8]) -> crate::Result<Guid> {
        let mut cursor = Cursor::new(data);
        Ok(Guid::read(&mut cursor)?)
    }
}

impl TryFrom<&[u8; 16]> for Guid {
    type Error = binrw::Error;

    fn try_from(value: &[u8; 16]) -> Result<Self, Self::Error> {
        let mut cursor = Cursor::new(value);
        Guid::read(&mut cursor)
    }
}

impl FromStr for Guid {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches('{').trim_end_matches('}');
        let components = s.split('-').collect::<Vec<&str>>();
        if components.len() != 5 {
            return Err(());
        }

        let mut result = Self::default();
        result.0 = u32::from_str_radix(components[0], 16).map_err(|_| ())?;
        result.1 = u16::from_str_radix(components[1], 16).map_err(|_| ())?;
        result.2 = u16::from_str_radix(components[2], 16).map_err(|_| ())?;
        // The remaining ten bytes are big endian: 2 from the fourth
        // component, 6 from the fifth.
        result.3[..2].copy_from_slice(
            &u16::from_str_radix(components[3], 16)
                .map_err(|_| ())?
                .to_be_bytes(),
        );
        if components[4].len() != 12 {
            return Err(());
        }
        for i in 0..6 {
            result.3[i + 2] =
                u8::from_str_radix(&components[4][i * 2..i * 2 + 2], 16).map_err(|_| ())?;
        }
        Ok(result)
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:012x}",
            self.0,
            self.1,
            self.2,
            self.3[0],
            self.3[1],
            self.3[2..]
                .iter()
                .fold(0u64, |acc, &x| (acc << 8) + x as u64)
        )
    }
}

impl std::fmt::Debug for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_GUID_STR: &str = "1131f6aa-9c07-11d1-f79f-00c04fc2dcd2";
    const TEST_GUID_BYTES: [u8; 16] = [
        0xaa, 0xf6, 0x31, 0x11, 0x07, 0x9c, 0xd1, 0x11, 0xf7, 0x9f, 0x00, 0xc0, 0x4f, 0xc2, 0xdc,
        0xd2,
    ];

    #[test]
    fn test_guid_parse_string() {
        let guid = TEST_GUID_STR.parse::<Guid>().unwrap();
        assert_eq!(guid.to_string(), TEST_GUID_STR);
        assert_eq!(Guid::try_from(&TEST_GUID_BYTES).unwrap(), guid);
    }

    #[test]
    fn test_guid_braced() {
        let guid = TEST_GUID_STR.parse::<Guid>().unwrap();
        assert_eq!(guid.braced(), format!("{{{}}}", TEST_GUID_STR));
        assert_eq!(guid.braced().parse::<Guid>().unwrap(), guid);
    }
}
